// # portmap-core
//
// Core library exposing published container ports through a tunnel.
//
// ## Architecture Overview
//
// Given port binding requests and container labels, the mapper:
// - **LabelSchema**: Reads hostname, tunnel selector, scheme and path from labels
// - **extract_domain**: Derives the zone domain from the hostname
// - **coalesce**: Collapses dual-stack binding pairs into one binding
// - **TunnelResolver**: Resolves a tunnel name to its ID
// - **build_rules**: Builds the ordered ingress rule list
// - **DnsSynchronizer**: Creates or deletes the CNAME pointing at the tunnel
// - **PortMapper**: Sequences all of the above into MapPorts / UnmapPorts
//
// The remote side is reached only through three capability traits
// (`ZoneLookup`, `DnsRecords`, `TunnelAdmin`), implemented by provider crates.
//
// ## Design Principles
//
// 1. **Stateless calls**: Nothing is cached between MapPorts/UnmapPorts calls
// 2. **No retries**: Every remote failure is returned with the step that failed
// 3. **Plugin-Based**: Backends are registered by name, no hard-coded if-else
// 4. **Library-First**: The daemon is a thin transport around `PortMapper`

pub mod traits;
pub mod engine;
pub mod registry;
pub mod config;
pub mod error;
pub mod context;
pub mod labels;
pub mod domain;
pub mod ports;
pub mod tunnel;
pub mod ingress;
pub mod dns;

// Re-export core types for convenience
pub use traits::{ZoneLookup, DnsRecords, TunnelAdmin};
pub use engine::PortMapper;
pub use registry::{Backend, BackendFactory, ProviderRegistry};
pub use config::{MapperConfig, ProviderConfig, CnamePolicy, TeardownPolicy};
pub use error::{Error, RemoteStep, Result};
pub use context::CallContext;
pub use labels::{LabelSchema, LabelSet};
pub use ports::{PortBinding, PortBindingRequest, Protocol};
