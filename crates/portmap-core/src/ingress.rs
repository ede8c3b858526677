//! Ingress rule construction
//!
//! The remote ingress engine evaluates rules in order and requires a final
//! rule without hostname, so every list built here ends with
//! [`catch_all`]. That holds even for non-HTTP services.

use crate::labels::ResolvedIntent;
use crate::ports::PortBindingRequest;
use crate::traits::IngressRule;
use std::net::SocketAddr;

/// Service answering requests no other rule matched
pub const NOT_FOUND_SERVICE: &str = "http_status:404";

/// The terminal rule
pub fn catch_all() -> IngressRule {
    IngressRule::new("", NOT_FOUND_SERVICE)
}

/// Origin URL for one binding: `<scheme>://<backend>:<port><path>`
///
/// IPv6 backends are bracketed.
pub fn service_url(intent: &ResolvedIntent, binding: &PortBindingRequest) -> String {
    format!(
        "{}://{}{}",
        intent.service_scheme,
        SocketAddr::new(binding.backend_ip, binding.backend_port),
        intent.path_prefix
    )
}

/// One rule per binding, in order, followed by the catch-all
pub fn build_rules(intent: &ResolvedIntent, bindings: &[PortBindingRequest]) -> Vec<IngressRule> {
    bindings
        .iter()
        .map(|binding| IngressRule::new(intent.hostname.clone(), service_url(intent, binding)))
        .chain(std::iter::once(catch_all()))
        .collect()
}

/// Rules installed by UnmapPorts: the catch-all alone
pub fn reset_rules() -> Vec<IngressRule> {
    vec![catch_all()]
}
