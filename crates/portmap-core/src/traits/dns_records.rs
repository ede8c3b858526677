// # DNS Records Trait
//
// Create, list, rewrite and delete records inside a zone.
//
// Only CNAME records are written by the mapper, but the record type is
// passed explicitly so that implementations stay generic over the API.

use async_trait::async_trait;

/// Record type written by the mapper
pub const CNAME: &str = "CNAME";

/// TTL value meaning "let the provider decide"
pub const AUTOMATIC_TTL: u32 = 1;

/// Record to be created or written over an existing one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRecord {
    /// Record name relative to the zone, or "@" for the apex
    pub name: String,
    /// Record type (always [`CNAME`] for the mapper)
    pub record_type: &'static str,
    /// Alias target
    pub content: String,
    /// Whether traffic is proxied through the provider edge
    pub proxied: bool,
    /// Time-to-live, [`AUTOMATIC_TTL`] for automatic
    pub ttl: u32,
}

impl AliasRecord {
    /// Proxied CNAME with automatic TTL
    pub fn cname(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: CNAME,
            content: content.into(),
            proxied: true,
            ttl: AUTOMATIC_TTL,
        }
    }
}

/// Record as returned by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    /// Provider-specific record ID
    pub id: String,
    /// Fully qualified record name
    pub name: String,
    /// Record content (the alias target for CNAMEs)
    pub content: String,
    /// Whether the record is proxied
    pub proxied: bool,
}

/// Trait for DNS record stores
///
/// Record identifiers are never cached by callers; every teardown lists
/// records again.
#[async_trait]
pub trait DnsRecords: Send + Sync {
    /// Create a record and return its ID
    async fn create_record(
        &self,
        zone_id: &str,
        record: &AliasRecord,
    ) -> Result<String, crate::Error>;

    /// List records whose name matches `name` exactly and whose type is `record_type`
    async fn list_records(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<Vec<DnsRecord>, crate::Error>;

    /// Overwrite an existing record
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &AliasRecord,
    ) -> Result<(), crate::Error>;

    /// Delete a record
    async fn delete_record(&self, zone_id: &str, record_id: &str) -> Result<(), crate::Error>;
}
