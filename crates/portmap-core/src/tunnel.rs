//! Tunnel name resolution
//!
//! Tunnel names are not unique. The first live tunnel in the remote's
//! listing order wins; no recency or other tiebreak is applied. Nothing is
//! cached, so every call lists again.

use crate::context::CallContext;
use crate::error::{Error, RemoteStep, Result};
use crate::labels::TunnelSelector;
use crate::traits::TunnelAdmin;
use std::sync::Arc;
use tracing::{debug, warn};

/// Resolves a [`TunnelSelector`] to a tunnel ID
#[derive(Clone)]
pub struct TunnelResolver {
    admin: Arc<dyn TunnelAdmin>,
    account_id: String,
}

impl TunnelResolver {
    /// Create a resolver for `account_id`
    pub fn new(admin: Arc<dyn TunnelAdmin>, account_id: impl Into<String>) -> Self {
        Self {
            admin,
            account_id: account_id.into(),
        }
    }

    /// Return the tunnel ID designated by `selector`
    ///
    /// An explicit ID is returned without any remote call.
    pub async fn resolve(&self, ctx: &CallContext, selector: &TunnelSelector) -> Result<String> {
        match selector {
            TunnelSelector::Id(id) => Ok(id.clone()),
            TunnelSelector::Name(name) => self.find_by_name(ctx, name).await,
        }
    }

    /// Look up a live tunnel by name
    ///
    /// # Errors
    ///
    /// [`Error::TunnelNotFound`] when the listing is empty.
    pub async fn find_by_name(&self, ctx: &CallContext, name: &str) -> Result<String> {
        debug!("Looking up tunnel {:?} via {}", name, self.admin.provider_name());

        let tunnels = ctx
            .run(
                RemoteStep::TunnelLookup,
                self.admin.list_tunnels(&self.account_id, name),
            )
            .await?;

        let first = tunnels
            .first()
            .ok_or_else(|| Error::TunnelNotFound(name.to_string()))?;

        if tunnels.len() > 1 {
            warn!(
                "{} tunnels are named {:?}; using the first listed ({})",
                tunnels.len(),
                name,
                first.id
            );
        }

        debug!("Resolved tunnel {:?} to {}", name, first.id);
        Ok(first.id.clone())
    }
}
