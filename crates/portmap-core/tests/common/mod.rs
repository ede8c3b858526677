//! Test doubles and common utilities for mapping contract tests
//!
//! `FakeCloud` keeps zones, tunnels, ingress configurations and DNS records
//! in memory, logs every capability call and can be told to fail any of
//! them.

#![allow(dead_code)]

use async_trait::async_trait;
use portmap_core::error::{Error, Result};
use portmap_core::traits::{
    AliasRecord, DnsRecord, DnsRecords, IngressRule, TunnelAdmin, TunnelSummary, ZoneLookup,
};
use portmap_core::{Backend, LabelSet, MapperConfig, PortBindingRequest, PortMapper, Protocol};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ACCOUNT: &str = "acct-1";

/// One logged capability call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FindZone { domain: String },
    ListTunnels { name: String },
    UpdateIngress { tunnel_id: String, rules: Vec<IngressRule> },
    CreateRecord { zone_id: String, record: AliasRecord },
    ListRecords { zone_id: String, name: String },
    UpdateRecord { zone_id: String, record_id: String },
    DeleteRecord { zone_id: String, record_id: String },
}

#[derive(Debug, Clone)]
struct StoredRecord {
    zone_id: String,
    record_type: String,
    record: DnsRecord,
}

/// In-memory stand-in for the tunnel and DNS APIs
#[derive(Default)]
pub struct FakeCloud {
    zones: Mutex<HashMap<String, String>>,
    tunnels: Mutex<Vec<TunnelSummary>>,
    ingress: Mutex<HashMap<String, Vec<IngressRule>>>,
    records: Mutex<Vec<StoredRecord>>,
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<&'static str>>,
    deletes_before_failure: Mutex<Option<usize>>,
    confirmed_tunnel: Mutex<Option<String>>,
    next_id: AtomicUsize,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_zone(self: Arc<Self>, domain: &str, zone_id: &str) -> Arc<Self> {
        self.zones
            .lock()
            .unwrap()
            .insert(domain.to_string(), zone_id.to_string());
        self
    }

    pub fn with_tunnel(self: Arc<Self>, id: &str, name: &str) -> Arc<Self> {
        self.tunnels.lock().unwrap().push(TunnelSummary {
            id: id.to_string(),
            name: name.to_string(),
        });
        self
    }

    /// Seed a CNAME record directly, bypassing the call log
    pub fn with_record(self: Arc<Self>, zone_id: &str, name: &str, content: &str) -> Arc<Self> {
        let id = self.new_id();
        self.records.lock().unwrap().push(StoredRecord {
            zone_id: zone_id.to_string(),
            record_type: "CNAME".to_string(),
            record: DnsRecord {
                id,
                name: name.to_string(),
                content: content.to_string(),
                proxied: true,
            },
        });
        self
    }

    /// Make every call to `op` fail ("update_ingress", "delete_record", ...)
    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    /// Let `n` deletions succeed, then fail every further one
    pub fn fail_deletes_after(&self, n: usize) {
        *self.deletes_before_failure.lock().unwrap() = Some(n);
    }

    /// Make update_ingress confirm a different tunnel ID than requested
    pub fn confirm_tunnel_as(&self, id: &str) {
        *self.confirmed_tunnel.lock().unwrap() = Some(id.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn ingress_of(&self, tunnel_id: &str) -> Option<Vec<IngressRule>> {
        self.ingress.lock().unwrap().get(tunnel_id).cloned()
    }

    pub fn records_named(&self, name: &str) -> Vec<DnsRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.record.name == name)
            .map(|r| r.record.clone())
            .collect()
    }

    fn new_id(&self) -> String {
        format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn record(&self, call: Call, op: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(op) {
            return Err(Error::provider("fake", format!("{} failed", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl ZoneLookup for FakeCloud {
    async fn find_zone(&self, account_id: &str, domain: &str) -> Result<Option<String>> {
        assert_eq!(account_id, ACCOUNT);
        self.record(
            Call::FindZone {
                domain: domain.to_string(),
            },
            "find_zone",
        )?;
        Ok(self.zones.lock().unwrap().get(domain).cloned())
    }
}

#[async_trait]
impl DnsRecords for FakeCloud {
    async fn create_record(&self, zone_id: &str, record: &AliasRecord) -> Result<String> {
        self.record(
            Call::CreateRecord {
                zone_id: zone_id.to_string(),
                record: record.clone(),
            },
            "create_record",
        )?;
        let id = self.new_id();
        self.records.lock().unwrap().push(StoredRecord {
            zone_id: zone_id.to_string(),
            record_type: record.record_type.to_string(),
            record: DnsRecord {
                id: id.clone(),
                name: record.name.clone(),
                content: record.content.clone(),
                proxied: record.proxied,
            },
        });
        Ok(id)
    }

    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<DnsRecord>> {
        self.record(
            Call::ListRecords {
                zone_id: zone_id.to_string(),
                name: name.to_string(),
            },
            "list_records",
        )?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.zone_id == zone_id && r.record.name == name && r.record_type == record_type)
            .map(|r| r.record.clone())
            .collect())
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, record: &AliasRecord) -> Result<()> {
        self.record(
            Call::UpdateRecord {
                zone_id: zone_id.to_string(),
                record_id: record_id.to_string(),
            },
            "update_record",
        )?;
        let mut records = self.records.lock().unwrap();
        let stored = records
            .iter_mut()
            .find(|r| r.zone_id == zone_id && r.record.id == record_id)
            .ok_or_else(|| Error::provider("fake", "no such record"))?;
        stored.record.content = record.content.clone();
        stored.record.proxied = record.proxied;
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        self.record(
            Call::DeleteRecord {
                zone_id: zone_id.to_string(),
                record_id: record_id.to_string(),
            },
            "delete_record",
        )?;
        {
            let mut budget = self.deletes_before_failure.lock().unwrap();
            if let Some(left) = budget.as_mut() {
                if *left == 0 {
                    return Err(Error::provider("fake", "delete_record failed"));
                }
                *left -= 1;
            }
        }
        self.records
            .lock()
            .unwrap()
            .retain(|r| !(r.zone_id == zone_id && r.record.id == record_id));
        Ok(())
    }
}

#[async_trait]
impl TunnelAdmin for FakeCloud {
    async fn list_tunnels(&self, account_id: &str, name: &str) -> Result<Vec<TunnelSummary>> {
        assert_eq!(account_id, ACCOUNT);
        self.record(
            Call::ListTunnels {
                name: name.to_string(),
            },
            "list_tunnels",
        )?;
        Ok(self
            .tunnels
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.name == name)
            .cloned()
            .collect())
    }

    async fn update_ingress(
        &self,
        account_id: &str,
        tunnel_id: &str,
        rules: &[IngressRule],
    ) -> Result<String> {
        assert_eq!(account_id, ACCOUNT);
        self.record(
            Call::UpdateIngress {
                tunnel_id: tunnel_id.to_string(),
                rules: rules.to_vec(),
            },
            "update_ingress",
        )?;
        self.ingress
            .lock()
            .unwrap()
            .insert(tunnel_id.to_string(), rules.to_vec());
        Ok(self
            .confirmed_tunnel
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| tunnel_id.to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }
}

/// Mapper over `cloud` reading unprefixed labels
pub fn mapper(cloud: &Arc<FakeCloud>, config: MapperConfig) -> PortMapper {
    PortMapper::new(Backend::from_provider(cloud.clone()), config.with_label_prefix(""))
        .expect("valid config")
}

pub fn config() -> MapperConfig {
    MapperConfig::new(ACCOUNT)
}

pub fn labels(pairs: &[(&str, &str)]) -> LabelSet {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn tcp(frontend: IpAddr, backend: &str, port: u16) -> PortBindingRequest {
    PortBindingRequest {
        protocol: Protocol::Tcp,
        frontend_ip: frontend,
        frontend_port: 0,
        frontend_port_end: 0,
        backend_ip: backend.parse().expect("valid backend IP"),
        backend_port: port,
    }
}

pub fn v4_any() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

pub fn v6_any() -> IpAddr {
    IpAddr::V6(Ipv6Addr::UNSPECIFIED)
}
