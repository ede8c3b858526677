// # Tunnel Admin Trait
//
// Lists tunnels by name and replaces a tunnel's ingress configuration.
//
// The ingress update is a full replace: the remote keeps exactly the rules
// sent, in order.

use async_trait::async_trait;

/// Single ingress rule. An empty hostname matches every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressRule {
    /// Hostname matched by the rule, empty for the catch-all
    pub hostname: String,
    /// Origin service URL or `http_status:<code>`
    pub service: String,
}

impl IngressRule {
    /// Rule routing `hostname` to `service`
    pub fn new(hostname: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            service: service.into(),
        }
    }

    /// Whether this rule matches every hostname
    pub fn is_catch_all(&self) -> bool {
        self.hostname.is_empty()
    }
}

/// Tunnel as returned by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSummary {
    /// Tunnel ID
    pub id: String,
    /// Human-readable name (not guaranteed unique)
    pub name: String,
}

/// Trait for tunnel administration
#[async_trait]
pub trait TunnelAdmin: Send + Sync {
    /// List non-deleted tunnels named `name`, in the remote's listing order
    async fn list_tunnels(
        &self,
        account_id: &str,
        name: &str,
    ) -> Result<Vec<TunnelSummary>, crate::Error>;

    /// Replace the ingress rules of `tunnel_id`
    ///
    /// # Returns
    ///
    /// The tunnel ID confirmed by the remote. Callers use it, not their
    /// input, for every later step.
    async fn update_ingress(
        &self,
        account_id: &str,
        tunnel_id: &str,
        rules: &[IngressRule],
    ) -> Result<String, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
