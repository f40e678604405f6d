//! Rate-limited DNS resolution and capability probing.
//!
//! Every query this crate sends passes through an [`AdmissionGate`], so the
//! number of queries in flight never exceeds the configured limit no matter
//! how many hosts are discovered at once. Failures are soft: a host that
//! cannot be resolved yields no addresses, an address that cannot be probed
//! yields a result with every capability absent.

#![doc(html_root_url = "https://docs.rs/zonestats-resolver/0.3.0")]

mod error;
mod exchange;
mod gate;
pub mod probe;
mod resolver;
mod servers;

pub use error::{ResolverError, ResolverResult};
pub use exchange::{DnsExchange, UdpExchange};
pub use gate::AdmissionGate;
pub use probe::CapabilityProbeResult;
pub use resolver::{Resolver, ResolverBuilder};
pub use servers::{parse_server, system_resolvers, DNS_PORT};
