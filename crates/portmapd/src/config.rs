//! Daemon configuration
//!
//! Read from environment variables only:
//!
//! - `CLOUDFLARE_ACCOUNT_ID`: account owning the tunnels and zones (required)
//! - `CLOUDFLARE_API_TOKEN`: API token (required)
//! - `PORTMAPD_DRIVER_NAME`: plugin name, socket is `<name>.sock` (default `cloudflared`)
//! - `PORTMAPD_PLUGIN_DIR`: socket directory (default `/run/docker/plugins`)
//! - `PORTMAPD_LABEL_PREFIX`: container label prefix (default `com.cloudflare.portmapper.`)
//! - `PORTMAPD_CNAME_POLICY`: `upsert` or `append` (default `upsert`)
//! - `PORTMAPD_TEARDOWN_POLICY`: `strict` or `lenient` (default `strict`)
//! - `PORTMAPD_MODE`: `dry-run` to log Cloudflare mutations instead of sending them
//! - `PORTMAPD_LOG_LEVEL`: trace, debug, info, warn, error (default `info`)

use anyhow::{Context, Result};
use portmap_core::config::DEFAULT_LABEL_PREFIX;
use portmap_core::{CnamePolicy, MapperConfig, ProviderConfig, TeardownPolicy};
use std::path::PathBuf;
use tracing::Level;

pub const DEFAULT_DRIVER_NAME: &str = "cloudflared";
pub const DEFAULT_PLUGIN_DIR: &str = "/run/docker/plugins";

/// Application configuration
pub struct Config {
    pub account_id: String,
    api_token: String,
    pub driver_name: String,
    pub plugin_dir: PathBuf,
    pub label_prefix: String,
    pub cname_policy: CnamePolicy,
    pub teardown_policy: TeardownPolicy,
    pub dry_run: bool,
    pub log_level: String,
}

// Hides the API token
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("account_id", &self.account_id)
            .field("api_token", &"<REDACTED>")
            .field("driver_name", &self.driver_name)
            .field("plugin_dir", &self.plugin_dir)
            .field("label_prefix", &self.label_prefix)
            .field("cname_policy", &self.cname_policy)
            .field("teardown_policy", &self.teardown_policy)
            .field("dry_run", &self.dry_run)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).with_context(|| format!("{} is required. Set it via: export {}=...", key, key))
        };

        Ok(Self {
            account_id: required("CLOUDFLARE_ACCOUNT_ID")?,
            api_token: required("CLOUDFLARE_API_TOKEN")?,
            driver_name: lookup("PORTMAPD_DRIVER_NAME")
                .unwrap_or_else(|| DEFAULT_DRIVER_NAME.to_string()),
            plugin_dir: lookup("PORTMAPD_PLUGIN_DIR")
                .unwrap_or_else(|| DEFAULT_PLUGIN_DIR.to_string())
                .into(),
            label_prefix: lookup("PORTMAPD_LABEL_PREFIX")
                .unwrap_or_else(|| DEFAULT_LABEL_PREFIX.to_string()),
            cname_policy: lookup("PORTMAPD_CNAME_POLICY")
                .map(|s| s.parse::<CnamePolicy>())
                .transpose()
                .context("PORTMAPD_CNAME_POLICY")?
                .unwrap_or_default(),
            teardown_policy: lookup("PORTMAPD_TEARDOWN_POLICY")
                .map(|s| s.parse::<TeardownPolicy>())
                .transpose()
                .context("PORTMAPD_TEARDOWN_POLICY")?
                .unwrap_or_default(),
            dry_run: lookup("PORTMAPD_MODE").is_some_and(|m| m.eq_ignore_ascii_case("dry-run")),
            log_level: lookup("PORTMAPD_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            anyhow::bail!("CLOUDFLARE_ACCOUNT_ID cannot be empty");
        }

        if self.api_token.is_empty() {
            anyhow::bail!(
                "CLOUDFLARE_API_TOKEN cannot be empty. \
                Set it via: export CLOUDFLARE_API_TOKEN=your_token"
            );
        }

        if self.driver_name.is_empty() || self.driver_name.contains('/') {
            anyhow::bail!(
                "PORTMAPD_DRIVER_NAME '{}' is not a valid socket name",
                self.driver_name
            );
        }

        if !self.plugin_dir.is_absolute() {
            anyhow::bail!(
                "PORTMAPD_PLUGIN_DIR must be an absolute path. Got: {}",
                self.plugin_dir.display()
            );
        }

        self.level()?;
        Ok(())
    }

    /// Tracing level named by `log_level`
    pub fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "PORTMAPD_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }

    /// Path of the plugin socket
    pub fn socket_path(&self) -> PathBuf {
        self.plugin_dir.join(format!("{}.sock", self.driver_name))
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::Cloudflare {
            api_token: self.api_token.clone(),
            account_id: self.account_id.clone(),
            dry_run: self.dry_run,
        }
    }

    pub fn mapper_config(&self) -> MapperConfig {
        MapperConfig::new(self.account_id.clone())
            .with_label_prefix(self.label_prefix.clone())
            .with_cname_policy(self.cname_policy)
            .with_teardown_policy(self.teardown_policy)
    }
}
