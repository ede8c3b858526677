//! Mapping orchestrator
//!
//! The PortMapper turns a port publish request into tunnel ingress and a
//! DNS alias, and tears both down again.
//!
//! ## Architecture
//!
//! ```text
//!                     ┌──────────────┐
//!   MapPorts ────────▶│  PortMapper  │◀──────── UnmapPorts
//!                     └──────────────┘
//!                            │
//!         ┌──────────────────┼──────────────────┐
//!         │                  │                  │
//!         ▼                  ▼                  ▼
//! ┌───────────────┐  ┌───────────────┐  ┌───────────────┐
//! │ TunnelAdmin   │  │ ZoneLookup    │  │ DnsRecords    │
//! │ (list/ingress)│  │ (zone id)     │  │ (CNAME)       │
//! └───────────────┘  └───────────────┘  └───────────────┘
//! ```
//!
//! ## MapPorts flow
//!
//! 1. Validate bindings (no remote call on failure)
//! 2. Parse labels, derive the zone domain
//! 3. Resolve the tunnel name if no ID was given
//! 4. Coalesce bindings and build ingress rules
//! 5. Replace the tunnel's ingress; keep the tunnel ID the remote confirms
//! 6. Write the CNAME against the confirmed tunnel ID
//!
//! Any error aborts the call with no partial result. Remote changes made
//! before the failing step are not rolled back.
//!
//! ## UnmapPorts flow
//!
//! 1. Parse hostname and tunnel selector, derive the zone domain
//! 2. Resolve the tunnel name if no ID was given
//! 3. Reset the tunnel's ingress to the catch-all alone. This drops the
//!    rules of every hostname served by that tunnel.
//! 4. Delete the matching CNAMEs, even if step 3 failed
//!
//! ## Concurrency
//!
//! Calls share no mutable state. Concurrent calls on the same tunnel or
//! hostname are not coordinated: the last ingress write wins.

use crate::config::{MapperConfig, TeardownPolicy};
use crate::context::CallContext;
use crate::dns::{CnameOutcome, DnsSynchronizer};
use crate::domain::extract_domain;
use crate::error::{Error, RemoteStep, Result};
use crate::ingress::{build_rules, reset_rules};
use crate::labels::{LabelSchema, LabelSet, ResolvedIntent};
use crate::ports::{self, PortBinding, PortBindingRequest};
use crate::registry::Backend;
use crate::traits::TunnelAdmin;
use crate::tunnel::TunnelResolver;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates MapPorts and UnmapPorts
///
/// Holds no per-call state; one instance serves every request.
#[derive(Clone)]
pub struct PortMapper {
    schema: LabelSchema,
    tunnels: TunnelResolver,
    admin: Arc<dyn TunnelAdmin>,
    dns: DnsSynchronizer,
    account_id: String,
    teardown_policy: TeardownPolicy,
}

impl PortMapper {
    /// Create a mapper over `backend`
    ///
    /// # Errors
    ///
    /// A configuration error if `config` does not validate.
    pub fn new(backend: Backend, config: MapperConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            schema: LabelSchema::new(config.label_prefix.clone()),
            tunnels: TunnelResolver::new(backend.tunnels.clone(), config.account_id.clone()),
            admin: backend.tunnels,
            dns: DnsSynchronizer::new(
                backend.zones,
                backend.records,
                config.account_id.clone(),
                config.cname_policy,
            ),
            account_id: config.account_id,
            teardown_policy: config.teardown_policy,
        })
    }

    /// The label schema requests are parsed with
    pub fn schema(&self) -> &LabelSchema {
        &self.schema
    }

    /// Publish `reqs` under the hostname named in `labels`
    ///
    /// # Returns
    ///
    /// The coalesced bindings, reduced to protocol and backend address.
    pub async fn map_ports(
        &self,
        ctx: &CallContext,
        reqs: Vec<PortBindingRequest>,
        labels: &LabelSet,
    ) -> Result<Vec<PortBinding>> {
        ports::validate(&reqs)?;

        let parsed = self.schema.parse(labels)?;
        let domain = extract_domain(&parsed.hostname)?;
        let tunnel_id = self.tunnels.resolve(ctx, &parsed.tunnel).await?;

        let intent = ResolvedIntent {
            hostname: parsed.hostname,
            domain,
            tunnel_id,
            service_scheme: parsed.service_scheme,
            path_prefix: parsed.path_prefix,
        };

        let bindings = ports::coalesce(reqs);
        let rules = build_rules(&intent, &bindings);
        debug!(
            "Replacing ingress of tunnel {} with {} rule(s)",
            intent.tunnel_id,
            rules.len()
        );

        let confirmed_id = ctx
            .run(
                RemoteStep::IngressUpdate,
                self.admin
                    .update_ingress(&self.account_id, &intent.tunnel_id, &rules),
            )
            .await?;

        let outcome = self
            .dns
            .insert(ctx, &confirmed_id, &intent.domain, &intent.hostname)
            .await?;
        if let CnameOutcome::Unchanged { .. } = outcome {
            debug!("CNAME for {} was already in place", intent.hostname);
        }

        info!(
            "Mapped {} binding(s) for {} through tunnel {}",
            bindings.len(),
            intent.hostname,
            confirmed_id
        );

        Ok(bindings.iter().map(PortBinding::from).collect())
    }

    /// Withdraw the ingress and CNAME for the hostname named in `labels`
    pub async fn unmap_ports(&self, ctx: &CallContext, labels: &LabelSet) -> Result<()> {
        let (hostname, selector) = self.schema.parse_target(labels)?;
        let domain = extract_domain(&hostname)?;
        let tunnel_id = self.tunnels.resolve(ctx, &selector).await?;

        // TODO: remove only this hostname's rules once the remote config can be read back.
        let reset = ctx
            .run(
                RemoteStep::IngressReset,
                self.admin
                    .update_ingress(&self.account_id, &tunnel_id, &reset_rules()),
            )
            .await;

        if matches!(reset, Err(Error::Cancelled { .. })) {
            return reset.map(|_| ());
        }

        let removed = self.dns.remove(ctx, &domain, &hostname).await;

        match (reset, removed, self.teardown_policy) {
            (Ok(_), Ok(count), _) => {
                info!(
                    "Unmapped {} from tunnel {} ({} CNAME record(s) removed)",
                    hostname, tunnel_id, count
                );
                Ok(())
            }
            (Ok(_), Err(dns), _) => Err(dns),
            (Err(ingress), Ok(_), TeardownPolicy::Strict) => Err(ingress),
            (Err(ingress), Err(dns), TeardownPolicy::Strict) => Err(Error::Teardown {
                ingress: Box::new(ingress),
                dns: Box::new(dns),
            }),
            (Err(ingress), removed, TeardownPolicy::Lenient) => {
                warn!(
                    "Ignoring failed ingress reset of tunnel {}: {}",
                    tunnel_id, ingress
                );
                removed.map(|_| ())
            }
        }
    }
}

impl std::fmt::Debug for PortMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortMapper")
            .field("schema", &self.schema)
            .field("provider", &self.admin.provider_name())
            .field("teardown_policy", &self.teardown_policy)
            .finish()
    }
}
