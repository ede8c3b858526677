// # Cloudflare Backend
//
// Implements the three capabilities the port mapper consumes against
// Cloudflare API v4:
//
// - `ZoneLookup`: zone ID for a registrable domain
// - `DnsRecords`: CNAME create, list, overwrite and delete
// - `TunnelAdmin`: tunnel listing by name and ingress replacement
//
// Every capability call is exactly one HTTP request. There is no retry, no
// backoff and no caching; the mapper decides what to do with a failure.
//
// ## Security
//
// - The API token never appears in logs or `Debug` output
// - An empty token is rejected at construction
//
// ## API Reference
//
// - List zones: GET `/zones?name=...&account.id=...`
// - List records: GET `/zones/:zone_id/dns_records?name.exact=...&type=CNAME`
// - Create record: POST `/zones/:zone_id/dns_records`
// - Overwrite record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete record: DELETE `/zones/:zone_id/dns_records/:record_id`
// - List tunnels: GET `/accounts/:account_id/cfd_tunnel?name=...&is_deleted=false`
// - Replace ingress: PUT `/accounts/:account_id/cfd_tunnel/:tunnel_id/configurations`

mod api;

use api::{ApiError, ConfigurationBody, Envelope, RecordBody, PROVIDER};
use async_trait::async_trait;
use portmap_core::config::ProviderConfig;
use portmap_core::registry::{Backend, BackendFactory, ProviderRegistry};
use portmap_core::traits::{
    AliasRecord, DnsRecord, DnsRecords, IngressRule, TunnelAdmin, TunnelSummary, ZoneLookup,
};
use portmap_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare tunnel and DNS backend
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zones, records, tunnels)
/// - Log the intended POST/PUT/DELETE payload
/// - **NOT** change anything remotely
///
/// A skipped ingress update confirms the requested tunnel ID and a skipped
/// record create returns the ID `dry-run`.
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Account the token operates on
    account_id: String,

    /// API root, overridable for tests
    api_base: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip mutations
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("account_id", &self.account_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: token with Zone:DNS:Edit and Account:Cloudflare Tunnel:Edit
    /// - `account_id`: account owning the tunnels and zones
    /// - `dry_run`: if true, perform GET requests but skip mutations
    ///
    /// # Errors
    ///
    /// A configuration error if the token is empty or the HTTP client
    /// cannot be built.
    pub fn new(
        api_token: impl Into<String>,
        account_id: impl Into<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            account_id: account_id.into(),
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
        })
    }

    /// Send requests to `api_base` instead of the public API
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Whether mutations are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn check_account(&self, account_id: &str) {
        if account_id != self.account_id {
            tracing::warn!(
                "Request for account {} on a provider configured for {}",
                account_id,
                self.account_id
            );
        }
    }

    /// Send one request and unwrap the response envelope
    async fn call<T: DeserializeOwned>(
        &self,
        what: &str,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<Option<T>, ApiError> {
        let response = request
            .bearer_auth(&self.api_token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(what, status, body));
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&body).map_err(|source| ApiError::Decode {
                what: what.to_string(),
                source,
            })?;

        if !envelope.success {
            return Err(ApiError::rejected(what, &envelope.errors));
        }

        Ok(envelope.result)
    }

    /// Like [`call`](Self::call) for endpoints that always return a result
    async fn call_result<T: DeserializeOwned>(
        &self,
        what: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        self.call(what, request).await?.ok_or_else(|| {
            Error::provider(PROVIDER, format!("invalid response for {}: result missing", what))
        })
    }

    fn skip_mutation(&self, method: &str, url: &str, payload: Option<serde_json::Value>) -> bool {
        if !self.dry_run {
            return false;
        }
        match payload {
            Some(payload) => tracing::info!(
                "[DRY-RUN] Would send {} request to {} with payload: {}",
                method,
                url,
                payload
            ),
            None => tracing::info!("[DRY-RUN] Would send {} request to {}", method, url),
        }
        true
    }
}

#[async_trait]
impl ZoneLookup for CloudflareProvider {
    async fn find_zone(&self, account_id: &str, domain: &str) -> Result<Option<String>> {
        self.check_account(account_id);
        tracing::debug!("Looking up zone ID for domain: {}", domain);

        let request = self
            .client
            .get(self.url("/zones"))
            .query(&[("name", domain), ("account.id", account_id)]);
        let zones: Vec<api::Zone> = self.call_result("zone lookup", request).await?;

        let zone_id = zones.into_iter().next().map(|z| z.id);
        match &zone_id {
            Some(id) => tracing::debug!("Found zone ID: {}", id),
            None => tracing::debug!("No zone named {}", domain),
        }
        Ok(zone_id)
    }
}

#[async_trait]
impl DnsRecords for CloudflareProvider {
    async fn create_record(&self, zone_id: &str, record: &AliasRecord) -> Result<String> {
        let url = self.url(&format!("/zones/{}/dns_records", zone_id));
        let body = RecordBody::from(record);

        if self.skip_mutation("POST", &url, Some(serde_json::to_value(&body)?)) {
            return Ok("dry-run".to_string());
        }

        let created: api::Record = self
            .call_result("record create", self.client.post(&url).json(&body))
            .await?;
        tracing::debug!("Created {} record {} ({})", record.record_type, record.name, created.id);
        Ok(created.id)
    }

    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<DnsRecord>> {
        tracing::debug!("Listing {} records named {}", record_type, name);

        let request = self
            .client
            .get(self.url(&format!("/zones/{}/dns_records", zone_id)))
            .query(&[("name.exact", name), ("type", record_type)]);
        let records: Vec<api::Record> = self.call_result("record list", request).await?;

        Ok(records.into_iter().map(DnsRecord::from).collect())
    }

    async fn update_record(&self, zone_id: &str, record_id: &str, record: &AliasRecord) -> Result<()> {
        let url = self.url(&format!("/zones/{}/dns_records/{}", zone_id, record_id));
        let body = RecordBody::from(record);

        if self.skip_mutation("PUT", &url, Some(serde_json::to_value(&body)?)) {
            return Ok(());
        }

        self.call::<serde_json::Value>("record update", self.client.put(&url).json(&body))
            .await?;
        tracing::debug!("Overwrote record {} ({})", record.name, record_id);
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<()> {
        let url = self.url(&format!("/zones/{}/dns_records/{}", zone_id, record_id));

        if self.skip_mutation("DELETE", &url, None) {
            return Ok(());
        }

        self.call::<serde_json::Value>("record delete", self.client.delete(&url))
            .await?;
        tracing::debug!("Deleted record {}", record_id);
        Ok(())
    }
}

#[async_trait]
impl TunnelAdmin for CloudflareProvider {
    async fn list_tunnels(&self, account_id: &str, name: &str) -> Result<Vec<TunnelSummary>> {
        self.check_account(account_id);
        tracing::debug!("Listing live tunnels named {:?}", name);

        let request = self
            .client
            .get(self.url(&format!("/accounts/{}/cfd_tunnel", account_id)))
            .query(&[("name", name), ("is_deleted", "false")]);
        let tunnels: Vec<api::Tunnel> = self.call_result("tunnel list", request).await?;

        Ok(tunnels.into_iter().map(TunnelSummary::from).collect())
    }

    async fn update_ingress(
        &self,
        account_id: &str,
        tunnel_id: &str,
        rules: &[IngressRule],
    ) -> Result<String> {
        self.check_account(account_id);
        let url = self.url(&format!(
            "/accounts/{}/cfd_tunnel/{}/configurations",
            account_id, tunnel_id
        ));
        let body = ConfigurationBody::new(rules);

        if self.skip_mutation("PUT", &url, Some(serde_json::to_value(&body)?)) {
            return Ok(tunnel_id.to_string());
        }

        let confirmed: api::TunnelConfiguration = self
            .call_result("tunnel configuration update", self.client.put(&url).json(&body))
            .await?;
        tracing::debug!(
            "Tunnel {} now has {} ingress rule(s)",
            confirmed.tunnel_id,
            rules.len()
        );
        Ok(confirmed.tunnel_id)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for creating Cloudflare backends
pub struct CloudflareFactory;

impl BackendFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Backend> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                account_id,
                dry_run,
            } => {
                if *dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                let provider = CloudflareProvider::new(api_token.clone(), account_id.clone(), *dry_run)?;
                Ok(Backend::from_provider(Arc::new(provider)))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare backend with a registry
///
/// # Example
///
/// ```rust
/// use portmap_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// portmap_provider_cloudflare::register(&registry);
/// assert!(registry.has_backend("cloudflare"));
/// ```
pub fn register(registry: &ProviderRegistry) {
    registry.register_backend(PROVIDER, Box::new(CloudflareFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_creation() {
        let config = ProviderConfig::Cloudflare {
            api_token: "test_token".to_string(),
            account_id: "acct".to_string(),
            dry_run: false,
        };

        let backend = CloudflareFactory.create(&config).unwrap();
        assert_eq!(backend.tunnels.provider_name(), "cloudflare");
    }

    #[test]
    fn test_factory_rejects_custom_config() {
        let config = ProviderConfig::Custom {
            factory: "cloudflare".to_string(),
            config: serde_json::json!({}),
        };
        assert!(matches!(CloudflareFactory.create(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_token_rejected() {
        let err = CloudflareProvider::new("", "acct", false).unwrap_err();
        assert!(err.to_string().contains("API token cannot be empty"));
    }

    #[test]
    fn test_api_token_not_exposed_in_debug() {
        let provider = CloudflareProvider::new("secret_token_12345", "acct", false).unwrap();

        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_token"));
        assert!(debug_str.contains("CloudflareProvider"));
    }

    #[test]
    fn test_api_base_override() {
        let provider = CloudflareProvider::new("t", "acct", true)
            .unwrap()
            .with_api_base("http://127.0.0.1:9999/");
        assert_eq!(provider.url("/zones"), "http://127.0.0.1:9999/zones");
        assert!(provider.is_dry_run());
    }

    #[test]
    fn test_register() {
        let registry = ProviderRegistry::new();
        register(&registry);
        assert!(registry.has_backend("cloudflare"));
    }
}
