//! Plugin-based backend registry
//!
//! The registry lets remote backends be registered at runtime by type
//! name, so the daemon never hardcodes a provider.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portmap_core::registry::ProviderRegistry;
//! use portmap_core::config::ProviderConfig;
//!
//! let registry = ProviderRegistry::new();
//! portmap_provider_cloudflare::register(&registry);
//!
//! let config = ProviderConfig::Cloudflare { ... };
//! let backend = registry.create_backend(&config)?;
//! ```

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{DnsRecords, TunnelAdmin, ZoneLookup};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// The three capabilities the mapper consumes
///
/// A single provider object usually implements all three; the handles are
/// separate so tests can substitute one at a time.
#[derive(Clone)]
pub struct Backend {
    pub zones: Arc<dyn ZoneLookup>,
    pub records: Arc<dyn DnsRecords>,
    pub tunnels: Arc<dyn TunnelAdmin>,
}

impl Backend {
    /// Backend whose capabilities all come from `provider`
    pub fn from_provider<P>(provider: Arc<P>) -> Self
    where
        P: ZoneLookup + DnsRecords + TunnelAdmin + 'static,
    {
        Self {
            zones: provider.clone(),
            records: provider.clone(),
            tunnels: provider,
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("provider", &self.tunnels.provider_name())
            .finish()
    }
}

/// Helper trait for constructing backends from configuration
pub trait BackendFactory: Send + Sync {
    /// Create a backend from configuration
    fn create(&self, config: &ProviderConfig) -> Result<Backend>;
}

/// Backend registry
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct ProviderRegistry {
    backends: RwLock<HashMap<String, Box<dyn BackendFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend factory under `name` (e.g. "cloudflare")
    pub fn register_backend(&self, name: impl Into<String>, factory: Box<dyn BackendFactory>) {
        let mut backends = self
            .backends
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        backends.insert(name.into(), factory);
    }

    /// Create a backend from configuration
    ///
    /// # Errors
    ///
    /// A configuration error if the provider type is not registered or the
    /// factory rejects the configuration.
    pub fn create_backend(&self, config: &ProviderConfig) -> Result<Backend> {
        config.validate()?;
        let provider_type = config.type_name();
        let backends = self
            .backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let factory = backends
            .get(provider_type)
            .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?;

        factory.create(config)
    }

    /// List all registered provider types
    pub fn list_backends(&self) -> Vec<String> {
        let backends = self
            .backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        backends.keys().cloned().collect()
    }

    /// Check if a provider type is registered
    pub fn has_backend(&self, name: &str) -> bool {
        let backends = self
            .backends
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        backends.contains_key(name)
    }
}
