//! Port binding requests
//!
//! Validation and dual-stack coalescing of the bindings the container
//! runtime asks us to publish.
//!
//! A dual-stack publish arrives as two requests that differ only in the
//! address family of the unspecified frontend address (`0.0.0.0` and `::`).
//! Both describe one logical endpoint, so [`coalesce`] keeps a single
//! entry for them.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::net::IpAddr;

/// Transport protocol of a binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    Sctp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Sctp => "sctp",
        })
    }
}

/// One port publish request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBindingRequest {
    pub protocol: Protocol,
    pub frontend_ip: IpAddr,
    pub frontend_port: u16,
    pub frontend_port_end: u16,
    pub backend_ip: IpAddr,
    pub backend_port: u16,
}

/// What MapPorts reports back for each coalesced binding.
///
/// Frontend fields are left out: the frontend is always unspecified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortBinding {
    pub protocol: Protocol,
    pub backend_ip: IpAddr,
    pub backend_port: u16,
}

impl From<&PortBindingRequest> for PortBinding {
    fn from(req: &PortBindingRequest) -> Self {
        Self {
            protocol: req.protocol,
            backend_ip: req.backend_ip,
            backend_port: req.backend_port,
        }
    }
}

/// Reject any binding the tunnel cannot express
///
/// Every request must have an unspecified frontend address, a zero frontend
/// port and the TCP protocol.
pub fn validate(reqs: &[PortBindingRequest]) -> Result<()> {
    for req in reqs {
        if !req.frontend_ip.is_unspecified() {
            return Err(Error::validation(format!(
                "frontend IP should not be specified (got {})",
                req.frontend_ip
            )));
        }
        if req.frontend_port != 0 {
            return Err(Error::validation(format!(
                "frontend port should be 0 (got {})",
                req.frontend_port
            )));
        }
        if req.protocol != Protocol::Tcp {
            return Err(Error::validation(format!(
                "only TCP is supported (got {})",
                req.protocol
            )));
        }
    }
    Ok(())
}

fn compare(a: &PortBindingRequest, b: &PortBindingRequest) -> Ordering {
    a.protocol
        .cmp(&b.protocol)
        .then_with(|| a.frontend_ip.to_canonical().cmp(&b.frontend_ip.to_canonical()))
}

fn is_unspecified_v4(ip: &IpAddr) -> bool {
    matches!(ip, IpAddr::V4(v4) if v4.is_unspecified())
}

fn is_unspecified_v6(ip: &IpAddr) -> bool {
    matches!(ip, IpAddr::V6(v6) if v6.is_unspecified())
}

/// Whether two backends can be the halves of one dual-stack publish
///
/// Backends of the same address family must be equal. Across families the
/// runtime may hand out one address per family, so they always match.
fn same_backend(a: &IpAddr, b: &IpAddr) -> bool {
    a.is_ipv4() != b.is_ipv4() || a.to_canonical() == b.to_canonical()
}

/// Whether `v4` is the IPv4 half of the dual-stack pair completed by `v6`
fn is_dual_stack_pair(v4: &PortBindingRequest, v6: &PortBindingRequest) -> bool {
    is_unspecified_v4(&v4.frontend_ip)
        && is_unspecified_v6(&v6.frontend_ip)
        && v4.protocol == v6.protocol
        && v4.frontend_port == v6.frontend_port
        && v4.frontend_port_end == v6.frontend_port_end
        && v4.backend_port == v6.backend_port
        && same_backend(&v4.backend_ip, &v6.backend_ip)
}

/// Sort bindings and collapse dual-stack pairs
///
/// Bindings are ordered by protocol, then by frontend address (IPv4-mapped
/// addresses compare as IPv4). Every `0.0.0.0` binding that has a `::`
/// partner with the same protocol, frontend port range, backend port and
/// backend is dropped, and the `::` entries are all kept. Nothing else is
/// merged and survivors keep their sorted order.
///
/// `::` entries are never removed, so whatever survives one pass has no
/// partner in the next: the result is a fixed point.
pub fn coalesce(mut reqs: Vec<PortBindingRequest>) -> Vec<PortBindingRequest> {
    reqs.sort_by(compare);

    let paired: Vec<bool> = reqs
        .iter()
        .map(|req| reqs.iter().any(|v6| is_dual_stack_pair(req, v6)))
        .collect();

    reqs.into_iter()
        .zip(paired)
        .filter_map(|(req, dropped)| (!dropped).then_some(req))
        .collect()
}
