//! Zone derivation from hostnames
//!
//! The registrable domain is taken to be the last two labels of the
//! hostname. There is no public suffix list: `app.example.co.uk` yields
//! `co.uk`, which will then fail the zone lookup.

use crate::error::{Error, Result};

/// Zone apex as written in record-name fields
pub const APEX: &str = "@";

/// Derive the zone domain from `hostname`
///
/// A single trailing dot is ignored.
///
/// # Errors
///
/// [`Error::InvalidHostname`] when fewer than two labels remain.
pub fn extract_domain(hostname: &str) -> Result<String> {
    let unsuffixed = hostname.strip_suffix('.').unwrap_or(hostname);
    let parts: Vec<&str> = unsuffixed.split('.').collect();
    if parts.len() < 2 {
        return Err(Error::invalid_hostname(hostname));
    }
    Ok(parts[parts.len() - 2..].join("."))
}

/// Record name for `hostname` inside the zone `domain`: "@" at the apex,
/// the hostname unchanged otherwise
///
/// The full hostname is kept so that listing by exact name finds the record
/// again.
pub fn record_name<'a>(hostname: &'a str, domain: &str) -> &'a str {
    if hostname == domain { APEX } else { hostname }
}
