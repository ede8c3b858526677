//! Error types for the port mapper
//!
//! This module defines all error types used throughout the crate.

use std::fmt;
use thiserror::Error;

/// Result type alias for port mapper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Remote step that was in flight when an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteStep {
    /// Zone lookup by exact domain name
    ZoneLookup,
    /// Tunnel lookup by name
    TunnelLookup,
    /// Replacing the tunnel's ingress rules during MapPorts
    IngressUpdate,
    /// Resetting the tunnel's ingress rules during UnmapPorts
    IngressReset,
    /// Listing CNAME records by exact name
    CnameList,
    /// Creating a CNAME record
    CnameInsert,
    /// Rewriting an existing CNAME record
    CnameUpdate,
    /// Deleting a CNAME record
    CnameDelete,
}

impl RemoteStep {
    /// Short identifier used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            RemoteStep::ZoneLookup => "zone lookup",
            RemoteStep::TunnelLookup => "tunnel lookup",
            RemoteStep::IngressUpdate => "ingress update",
            RemoteStep::IngressReset => "ingress reset",
            RemoteStep::CnameList => "CNAME list",
            RemoteStep::CnameInsert => "CNAME insert",
            RemoteStep::CnameUpdate => "CNAME update",
            RemoteStep::CnameDelete => "CNAME delete",
        }
    }
}

impl fmt::Display for RemoteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core error type for the port mapper
#[derive(Error, Debug)]
pub enum Error {
    /// Port binding request has an unsupported shape
    #[error("Invalid port binding: {0}")]
    Validation(String),

    /// Required label missing or empty
    #[error("Label error: {0}")]
    Label(String),

    /// Hostname has fewer than two labels
    #[error("Invalid hostname: {0}")]
    InvalidHostname(String),

    /// No zone matches the derived domain
    #[error("No zone found for {0}")]
    ZoneNotFound(String),

    /// No live tunnel carries the requested name
    #[error("Tunnel {0:?} not found")]
    TunnelNotFound(String),

    /// A capability call failed
    #[error("{step} failed: {source}")]
    Remote {
        /// Which step failed
        step: RemoteStep,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// The caller cancelled the operation while a remote call was in flight
    #[error("{step} cancelled")]
    Cancelled {
        /// Which step was aborted
        step: RemoteStep,
    },

    /// A CNAME deletion failed after earlier records were already removed
    #[error("record {record_id} ({deleted} of {total} already deleted): {source}")]
    PartialDelete {
        /// Record whose deletion failed
        record_id: String,
        /// Records removed before the failure
        deleted: usize,
        /// Records that matched the name
        total: usize,
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// Both halves of a teardown failed
    #[error("teardown failed: {ingress}; {dns}")]
    Teardown {
        /// Ingress reset failure
        ingress: Box<Error>,
        /// CNAME removal failure
        dns: Box<Error>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors (from provider APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Provider-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a label error
    pub fn label(msg: impl Into<String>) -> Self {
        Self::Label(msg.into())
    }

    /// Create an invalid hostname error
    pub fn invalid_hostname(hostname: impl Into<String>) -> Self {
        Self::InvalidHostname(hostname.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Wrap a capability failure with the step it happened in
    pub fn remote(step: RemoteStep, source: Error) -> Self {
        Self::Remote {
            step,
            source: Box::new(source),
        }
    }

    /// The remote step this error is attributed to, if any
    pub fn step(&self) -> Option<RemoteStep> {
        match self {
            Error::Remote { step, .. } | Error::Cancelled { step } => Some(*step),
            _ => None,
        }
    }

    /// Whether the error was raised before any remote call could be made
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::Label(_) | Error::InvalidHostname(_) | Error::Config(_)
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
