//! CNAME synchronization
//!
//! Points a hostname at its tunnel with a proxied CNAME and removes it
//! again. The zone is looked up on every call and record IDs are never
//! kept between calls.
//!
//! ## Insert
//!
//! With [`CnamePolicy::Upsert`] the existing records carrying the name are
//! listed first. A record already targeting the tunnel is left alone,
//! otherwise the first record is rewritten, and a new one is only created
//! when none exists. [`CnamePolicy::Append`] always creates, so repeated
//! calls accumulate duplicates.
//!
//! ## Remove
//!
//! Every CNAME with the exact name is deleted. No match is not an error. A
//! failed deletion stops the loop: earlier records are gone, later ones
//! remain, and the error says which record failed.

use crate::config::CnamePolicy;
use crate::context::CallContext;
use crate::domain::record_name;
use crate::error::{Error, RemoteStep, Result};
use crate::traits::{AliasRecord, DnsRecords, ZoneLookup, CNAME};
use std::sync::Arc;
use tracing::{debug, info};

/// Suffix of every tunnel's canonical routing name
pub const TUNNEL_DOMAIN_SUFFIX: &str = "cfargotunnel.com";

/// CNAME target routing to `tunnel_id`
pub fn tunnel_target(tunnel_id: &str) -> String {
    format!("{}.{}", tunnel_id, TUNNEL_DOMAIN_SUFFIX)
}

/// Outcome of a CNAME insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CnameOutcome {
    /// A new record was created
    Created {
        /// The new record's ID
        record_id: String,
    },
    /// An existing record was rewritten to target the tunnel
    Updated {
        /// The rewritten record's ID
        record_id: String,
    },
    /// A record already targeted the tunnel
    Unchanged {
        /// The matching record's ID
        record_id: String,
    },
}

/// Creates and removes the CNAME for a hostname
#[derive(Clone)]
pub struct DnsSynchronizer {
    zones: Arc<dyn ZoneLookup>,
    records: Arc<dyn DnsRecords>,
    account_id: String,
    policy: CnamePolicy,
}

impl DnsSynchronizer {
    /// Create a synchronizer for `account_id`
    pub fn new(
        zones: Arc<dyn ZoneLookup>,
        records: Arc<dyn DnsRecords>,
        account_id: impl Into<String>,
        policy: CnamePolicy,
    ) -> Self {
        Self {
            zones,
            records,
            account_id: account_id.into(),
            policy,
        }
    }

    /// Resolve the zone for `domain`
    ///
    /// # Errors
    ///
    /// [`Error::ZoneNotFound`] when no zone carries that exact name.
    pub async fn zone_id(&self, ctx: &CallContext, domain: &str) -> Result<String> {
        ctx.run(
            RemoteStep::ZoneLookup,
            self.zones.find_zone(&self.account_id, domain),
        )
        .await?
        .ok_or_else(|| Error::ZoneNotFound(domain.to_string()))
    }

    /// Point `hostname` at `tunnel_id` inside the zone for `domain`
    pub async fn insert(
        &self,
        ctx: &CallContext,
        tunnel_id: &str,
        domain: &str,
        hostname: &str,
    ) -> Result<CnameOutcome> {
        let zone_id = self.zone_id(ctx, domain).await?;
        let name = record_name(hostname, domain);
        let record = AliasRecord::cname(name, tunnel_target(tunnel_id));

        if self.policy == CnamePolicy::Upsert {
            let existing = ctx
                .run(
                    RemoteStep::CnameList,
                    self.records.list_records(&zone_id, name, CNAME),
                )
                .await?;

            if let Some(current) = existing
                .iter()
                .find(|r| r.content == record.content && r.proxied == record.proxied)
            {
                debug!("CNAME {} already targets {}", name, record.content);
                return Ok(CnameOutcome::Unchanged {
                    record_id: current.id.clone(),
                });
            }

            if let Some(stale) = existing.first() {
                ctx.run(
                    RemoteStep::CnameUpdate,
                    self.records.update_record(&zone_id, &stale.id, &record),
                )
                .await?;
                info!("Updated CNAME {} -> {} (was {})", name, record.content, stale.content);
                return Ok(CnameOutcome::Updated {
                    record_id: stale.id.clone(),
                });
            }
        }

        let record_id = ctx
            .run(
                RemoteStep::CnameInsert,
                self.records.create_record(&zone_id, &record),
            )
            .await?;
        info!("Created CNAME {} -> {} in zone {}", name, record.content, domain);
        Ok(CnameOutcome::Created { record_id })
    }

    /// Delete every CNAME named `hostname` inside the zone for `domain`
    ///
    /// # Returns
    ///
    /// The number of records deleted.
    pub async fn remove(&self, ctx: &CallContext, domain: &str, hostname: &str) -> Result<usize> {
        let zone_id = self.zone_id(ctx, domain).await?;
        let name = record_name(hostname, domain);

        let records = ctx
            .run(
                RemoteStep::CnameList,
                self.records.list_records(&zone_id, name, CNAME),
            )
            .await?;

        for (deleted, record) in records.iter().enumerate() {
            ctx.run(
                RemoteStep::CnameDelete,
                self.records.delete_record(&zone_id, &record.id),
            )
            .await
            .map_err(|e| match e {
                Error::Remote { step, source } => Error::remote(
                    step,
                    Error::PartialDelete {
                        record_id: record.id.clone(),
                        deleted,
                        total: records.len(),
                        source,
                    },
                ),
                other => other,
            })?;
            debug!("Deleted CNAME {} ({})", name, record.id);
        }

        if !records.is_empty() {
            info!("Removed {} CNAME record(s) for {}", records.len(), name);
        }
        Ok(records.len())
    }
}
