// # Zone Lookup Trait
//
// Resolves the zone that owns a registrable domain.
//
// ## Implementations
//
// - Cloudflare: `portmap-provider-cloudflare` crate

use async_trait::async_trait;

/// Trait for zone lookup implementations
///
/// # Trust Level: Untrusted
///
/// Implementations perform exactly one API call per invocation, never
/// retry and never cache the zone identifier between calls.
#[async_trait]
pub trait ZoneLookup: Send + Sync {
    /// Find the zone whose name is exactly `domain`, scoped to `account_id`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(zone_id))`: The first matching zone
    /// - `Ok(None)`: No zone carries that name
    /// - `Err(Error)`: The lookup itself failed
    async fn find_zone(
        &self,
        account_id: &str,
        domain: &str,
    ) -> Result<Option<String>, crate::Error>;
}
