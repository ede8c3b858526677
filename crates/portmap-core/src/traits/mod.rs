//! Capability traits consumed by the mapper
//!
//! This module defines the abstract interfaces the remote backend must provide.
//!
//! - [`ZoneLookup`]: Resolve a registrable domain to a zone identifier
//! - [`DnsRecords`]: CRUD on DNS records inside a zone
//! - [`TunnelAdmin`]: List tunnels and replace their ingress rules

pub mod zone_lookup;
pub mod dns_records;
pub mod tunnel_admin;

pub use zone_lookup::ZoneLookup;
pub use dns_records::{DnsRecords, DnsRecord, AliasRecord, CNAME, AUTOMATIC_TTL};
pub use tunnel_admin::{TunnelAdmin, TunnelSummary, IngressRule};
