//! Configuration types for the port mapper
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Label prefix used by the Docker plugin
pub const DEFAULT_LABEL_PREFIX: &str = "com.cloudflare.portmapper.";

/// Main mapper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Account owning the tunnels and zones
    pub account_id: String,

    /// Prefix prepended to every recognized label key
    #[serde(default = "default_label_prefix")]
    pub label_prefix: String,

    /// How MapPorts writes the CNAME record
    #[serde(default)]
    pub cname_policy: CnamePolicy,

    /// How UnmapPorts treats a failed ingress reset
    #[serde(default)]
    pub teardown_policy: TeardownPolicy,
}

impl MapperConfig {
    /// Create a new configuration with defaults for the given account
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            label_prefix: default_label_prefix(),
            cname_policy: CnamePolicy::default(),
            teardown_policy: TeardownPolicy::default(),
        }
    }

    /// Set the label prefix
    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }

    /// Set the CNAME policy
    pub fn with_cname_policy(mut self, policy: CnamePolicy) -> Self {
        self.cname_policy = policy;
        self
    }

    /// Set the teardown policy
    pub fn with_teardown_policy(mut self, policy: TeardownPolicy) -> Self {
        self.teardown_policy = policy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.account_id.trim().is_empty() {
            return Err(crate::Error::config("Account ID cannot be empty"));
        }
        Ok(())
    }
}

fn default_label_prefix() -> String {
    DEFAULT_LABEL_PREFIX.to_string()
}

/// CNAME write policy for MapPorts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CnamePolicy {
    /// Reuse or rewrite an existing record with the same name
    #[default]
    Upsert,
    /// Always create a new record; repeated calls accumulate duplicates
    Append,
}

impl std::str::FromStr for CnamePolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "upsert" => Ok(CnamePolicy::Upsert),
            "append" => Ok(CnamePolicy::Append),
            other => Err(crate::Error::config(format!(
                "Unknown CNAME policy '{}'. Valid: upsert, append",
                other
            ))),
        }
    }
}

/// Ingress reset failure policy for UnmapPorts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeardownPolicy {
    /// Report the failure after CNAME removal has been attempted
    #[default]
    Strict,
    /// Log the failure and report success if CNAME removal succeeds
    Lenient,
}

impl std::str::FromStr for TeardownPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(TeardownPolicy::Strict),
            "lenient" => Ok(TeardownPolicy::Lenient),
            other => Err(crate::Error::config(format!(
                "Unknown teardown policy '{}'. Valid: strict, lenient",
                other
            ))),
        }
    }
}

/// Remote backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare API v4
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Account ID the token operates on
        account_id: String,
        /// Log mutations instead of sending them
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom backend
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                account_id,
                ..
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                if account_id.is_empty() {
                    return Err(crate::Error::config("Cloudflare account ID cannot be empty"));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom provider factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom provider config cannot be null"));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}
