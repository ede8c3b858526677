// # Cloudflare API v4 wire format
//
// Every response is wrapped in the same envelope:
//
// ```json
// { "success": true, "errors": [], "messages": [], "result": ... }
// ```
//
// A 2xx status with `success: false` is still a failure.

use portmap_core::Error;
use portmap_core::traits::{AliasRecord, DnsRecord, IngressRule, TunnelSummary};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub(crate) const PROVIDER: &str = "cloudflare";

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Zone {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Record {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub proxied: bool,
}

impl From<Record> for DnsRecord {
    fn from(r: Record) -> Self {
        DnsRecord {
            id: r.id,
            name: r.name,
            content: r.content,
            proxied: r.proxied,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Tunnel {
    pub id: String,
    pub name: String,
}

impl From<Tunnel> for TunnelSummary {
    fn from(t: Tunnel) -> Self {
        TunnelSummary {
            id: t.id,
            name: t.name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TunnelConfiguration {
    pub tunnel_id: String,
}

/// Body of record create and overwrite
#[derive(Debug, Serialize)]
pub(crate) struct RecordBody<'a> {
    #[serde(rename = "type")]
    pub record_type: &'a str,
    pub name: &'a str,
    pub content: &'a str,
    pub proxied: bool,
    pub ttl: u32,
}

impl<'a> From<&'a AliasRecord> for RecordBody<'a> {
    fn from(r: &'a AliasRecord) -> Self {
        RecordBody {
            record_type: r.record_type,
            name: &r.name,
            content: &r.content,
            proxied: r.proxied,
            ttl: r.ttl,
        }
    }
}

/// Body of a tunnel configuration update
#[derive(Debug, Serialize)]
pub(crate) struct ConfigurationBody<'a> {
    pub config: TunnelConfig<'a>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TunnelConfig<'a> {
    pub ingress: Vec<IngressEntry<'a>>,
    #[serde(rename = "originRequest")]
    pub origin_request: serde_json::Map<String, serde_json::Value>,
}

/// The catch-all rule is sent without a hostname
#[derive(Debug, Serialize)]
pub(crate) struct IngressEntry<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<&'a str>,
    pub service: &'a str,
}

impl<'a> ConfigurationBody<'a> {
    pub fn new(rules: &'a [IngressRule]) -> Self {
        ConfigurationBody {
            config: TunnelConfig {
                ingress: rules
                    .iter()
                    .map(|r| IngressEntry {
                        hostname: (!r.is_catch_all()).then_some(r.hostname.as_str()),
                        service: &r.service,
                    })
                    .collect(),
                origin_request: serde_json::Map::new(),
            },
        }
    }
}

/// Failure talking to the API
#[derive(Debug, thiserror::Error)]
pub(crate) enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("authentication failed: invalid API token or insufficient permissions (status {0})")]
    Auth(StatusCode),

    #[error("{what} not found (status 404)")]
    NotFound { what: String },

    #[error("conflict while updating {what} (status 409)")]
    Conflict { what: String },

    #[error("rate limit exceeded, retry later (status 429)")]
    RateLimited,

    #[error("server error (transient): {status} - {body}")]
    Server { status: StatusCode, body: String },

    #[error("{what} failed: {status} - {body}")]
    Unexpected {
        what: String,
        status: StatusCode,
        body: String,
    },

    #[error("{what} rejected: {messages}")]
    Rejected { what: String, messages: String },

    #[error("invalid response for {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// Map a non-2xx status to an error
    pub fn from_status(what: &str, status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => ApiError::Auth(status),
            404 => ApiError::NotFound { what: what.into() },
            409 => ApiError::Conflict { what: what.into() },
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server { status, body },
            _ => ApiError::Unexpected {
                what: what.into(),
                status,
                body,
            },
        }
    }

    pub fn rejected(what: &str, errors: &[ApiMessage]) -> Self {
        let messages = if errors.is_empty() {
            "success=false without error details".to_string()
        } else {
            errors
                .iter()
                .map(|e| format!("[{}] {}", e.code, e.message))
                .collect::<Vec<_>>()
                .join("; ")
        };
        ApiError::Rejected {
            what: what.into(),
            messages,
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(e) => Error::http(e.to_string()),
            other => Error::provider(PROVIDER, other.to_string()),
        }
    }
}
