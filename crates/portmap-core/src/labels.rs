//! Label schema
//!
//! Container labels arrive as an unordered map. [`LabelSchema::parse`] reads
//! them once into a typed [`MappingLabels`]; nothing downstream looks at the
//! raw map again.
//!
//! | Key | Required | Default |
//! |---|---|---|
//! | `hostname` | yes | |
//! | `tunnel_id` | one of `tunnel_id` / `tunnel_name` | |
//! | `tunnel_name` | one of `tunnel_id` / `tunnel_name` | |
//! | `proto` | no | `http` |
//! | `path` | no | none |
//!
//! Every key is looked up with the schema's prefix prepended.

use crate::config::DEFAULT_LABEL_PREFIX;
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Unordered label mapping as delivered with each request
pub type LabelSet = HashMap<String, String>;

/// Recognized label keys, without prefix
pub mod keys {
    pub const HOSTNAME: &str = "hostname";
    pub const TUNNEL_ID: &str = "tunnel_id";
    pub const TUNNEL_NAME: &str = "tunnel_name";
    pub const PROTO: &str = "proto";
    pub const PATH: &str = "path";
}

/// Service scheme used when the `proto` label is absent or empty
pub const DEFAULT_SERVICE_SCHEME: &str = "http";

/// How the target tunnel is designated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TunnelSelector {
    /// Explicit tunnel ID, used as-is
    Id(String),
    /// Tunnel name, resolved remotely on every call
    Name(String),
}

/// Intent read from the labels, before any remote resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingLabels {
    /// Public hostname
    pub hostname: String,
    /// Target tunnel
    pub tunnel: TunnelSelector,
    /// Scheme of the origin service URL
    pub service_scheme: String,
    /// Path appended to the origin service URL; empty or starting with "/"
    pub path_prefix: String,
}

/// Fully resolved intent for one MapPorts/UnmapPorts call. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIntent {
    /// Public hostname
    pub hostname: String,
    /// Registrable domain derived from the hostname
    pub domain: String,
    /// Resolved tunnel ID
    pub tunnel_id: String,
    /// Scheme of the origin service URL
    pub service_scheme: String,
    /// Path appended to the origin service URL
    pub path_prefix: String,
}

/// Typed reader for the recognized label keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSchema {
    prefix: String,
}

impl Default for LabelSchema {
    fn default() -> Self {
        Self::new(DEFAULT_LABEL_PREFIX)
    }
}

impl LabelSchema {
    /// Schema whose keys are all prefixed with `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Schema reading bare keys (`hostname`, `tunnel_id`, ...)
    pub fn unprefixed() -> Self {
        Self::new("")
    }

    /// Full label key for a recognized key
    pub fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn lookup<'a>(&self, labels: &'a LabelSet, key: &str) -> Option<&'a str> {
        labels.get(&self.key(key)).map(String::as_str)
    }

    fn non_empty<'a>(&self, labels: &'a LabelSet, key: &str) -> Option<&'a str> {
        self.lookup(labels, key).filter(|v| !v.is_empty())
    }

    /// Read hostname and tunnel selector, the part shared by map and unmap
    pub fn parse_target(&self, labels: &LabelSet) -> Result<(String, TunnelSelector)> {
        let hostname = self
            .non_empty(labels, keys::HOSTNAME)
            .ok_or_else(|| Error::label(format!("hostname missing: label '{}' not found", self.key(keys::HOSTNAME))))?;

        let tunnel = if let Some(id) = self.non_empty(labels, keys::TUNNEL_ID) {
            TunnelSelector::Id(id.to_string())
        } else if let Some(name) = self.non_empty(labels, keys::TUNNEL_NAME) {
            TunnelSelector::Name(name.to_string())
        } else {
            return Err(Error::label(format!(
                "label '{}' is empty or not found, and label '{}' is empty or not found. Specify either one of them",
                self.key(keys::TUNNEL_ID),
                self.key(keys::TUNNEL_NAME)
            )));
        };

        Ok((hostname.to_string(), tunnel))
    }

    /// Read the full mapping intent
    pub fn parse(&self, labels: &LabelSet) -> Result<MappingLabels> {
        let (hostname, tunnel) = self.parse_target(labels)?;

        let service_scheme = self
            .non_empty(labels, keys::PROTO)
            .unwrap_or(DEFAULT_SERVICE_SCHEME)
            .to_string();

        let path_prefix = self
            .non_empty(labels, keys::PATH)
            .map(normalize_path)
            .unwrap_or_default();

        Ok(MappingLabels {
            hostname,
            tunnel,
            service_scheme,
            path_prefix,
        })
    }
}

/// Re-prefix `path` with exactly one "/"
fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}
