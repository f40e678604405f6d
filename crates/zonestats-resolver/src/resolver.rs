//! Resolver: randomized server selection behind admission gates.

use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};
use rand::seq::SliceRandom;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::error::{ResolverError, ResolverResult};
use crate::exchange::{DnsExchange, UdpExchange, DEFAULT_TIMEOUT};
use crate::gate::{pacer, AdmissionGate};
use crate::probe::{self, CapabilityProbeResult, ClientCookie};
use crate::servers::DNS_PORT;

/// Default concurrent nameserver address queries
pub const DEFAULT_RESOLVE_LIMIT: usize = 200;

/// Default concurrent capability probes
pub const DEFAULT_PROBE_LIMIT: usize = 100;

/// DNS query client shared by all tasks of a run
#[derive(Clone)]
pub struct Resolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    servers: Vec<SocketAddr>,
    exchange: Arc<dyn DnsExchange>,
    resolve_gate: AdmissionGate,
    probe_gate: AdmissionGate,
    probe_port: u16,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("servers", &self.inner.servers)
            .field("resolve_gate", &self.inner.resolve_gate)
            .field("probe_gate", &self.inner.probe_gate)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a builder for the given resolver pool
    #[must_use]
    pub fn builder(servers: Vec<SocketAddr>) -> ResolverBuilder {
        ResolverBuilder::new(servers)
    }

    /// Configured resolver pool
    #[must_use]
    pub fn servers(&self) -> &[SocketAddr] {
        &self.inner.servers
    }

    /// Gate in front of address queries
    #[must_use]
    pub fn resolve_gate(&self) -> &AdmissionGate {
        &self.inner.resolve_gate
    }

    /// Gate in front of capability probes
    #[must_use]
    pub fn probe_gate(&self) -> &AdmissionGate {
        &self.inner.probe_gate
    }

    /// Resolve `hostname` to its IPv4 and IPv6 addresses.
    ///
    /// Both queries go to the same randomly chosen server. Any failure of a
    /// query contributes no addresses; the result may be empty.
    pub async fn resolve(&self, hostname: &str) -> Vec<IpAddr> {
        let Some(server) = self.pick_server() else {
            return Vec::new();
        };

        let name = match Name::from_ascii(hostname) {
            Ok(name) => name,
            Err(e) => {
                debug!(host = hostname, error = %e, "unparseable hostname");
                return Vec::new();
            }
        };

        let (v4, v6) = tokio::join!(
            self.query_addresses(server, &name, RecordType::A),
            self.query_addresses(server, &name, RecordType::AAAA),
        );

        let mut addresses = v4;
        for address in v6 {
            if !addresses.contains(&address) {
                addresses.push(address);
            }
        }

        debug!(host = hostname, server = %server, count = addresses.len(), "resolved");
        addresses
    }

    /// Probe the protocol capabilities of the nameserver at `address`.
    pub async fn probe_capabilities(&self, address: IpAddr) -> CapabilityProbeResult {
        let cookie = ClientCookie::random();
        let query = match probe::probe_query(rand::random(), cookie) {
            Ok(query) => query,
            Err(e) => {
                debug!(address = %address, error = %e, "cannot build probe query");
                return CapabilityProbeResult::unsupported(address);
            }
        };

        let server = SocketAddr::new(address, self.inner.probe_port);
        debug!(address = %address, cookie = %cookie, "probing capabilities");

        let response = self
            .inner
            .probe_gate
            .run(self.inner.exchange.exchange(server, &query))
            .await
            .and_then(|answer| answer);

        match response {
            Ok(response) => probe::parse_probe_response(address, &response),
            Err(e) => {
                debug!(address = %address, error = %e, "capability probe failed");
                CapabilityProbeResult::unsupported(address)
            }
        }
    }

    fn pick_server(&self) -> Option<SocketAddr> {
        self.inner
            .servers
            .choose(&mut rand::thread_rng())
            .copied()
    }

    async fn query_addresses(
        &self,
        server: SocketAddr,
        name: &Name,
        rtype: RecordType,
    ) -> Vec<IpAddr> {
        let query = address_query(rand::random(), name.clone(), rtype);

        let response = self
            .inner
            .resolve_gate
            .run(self.inner.exchange.exchange(server, &query))
            .await
            .and_then(|answer| answer);

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                debug!(host = %name, rtype = %rtype, server = %server, error = %e, "query failed");
                return Vec::new();
            }
        };

        if response.response_code() != ResponseCode::NoError {
            debug!(
                host = %name,
                rtype = %rtype,
                rcode = %response.response_code(),
                "unsuccessful response"
            );
            return Vec::new();
        }

        response
            .answers()
            .iter()
            .filter_map(|record| match record.data() {
                RData::A(a) => Some(IpAddr::V4(a.0)),
                RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
                _ => None,
            })
            .collect()
    }
}

/// Recursive A/AAAA query
fn address_query(id: u16, name: Name, rtype: RecordType) -> Message {
    let mut message = Message::new();
    message
        .set_id(id)
        .set_message_type(MessageType::Query)
        .set_op_code(OpCode::Query)
        .set_recursion_desired(true)
        .add_query(Query::query(name, rtype));
    message
}

/// Builder for configuring a [`Resolver`]
pub struct ResolverBuilder {
    servers: Vec<SocketAddr>,
    timeout: Duration,
    resolve_limit: usize,
    probe_limit: usize,
    queries_per_second: Option<NonZeroU32>,
    probe_port: u16,
    exchange: Option<Arc<dyn DnsExchange>>,
}

impl ResolverBuilder {
    /// Create a builder with default limits for the given resolver pool
    #[must_use]
    pub fn new(servers: Vec<SocketAddr>) -> Self {
        Self {
            servers,
            timeout: DEFAULT_TIMEOUT,
            resolve_limit: DEFAULT_RESOLVE_LIMIT,
            probe_limit: DEFAULT_PROBE_LIMIT,
            queries_per_second: None,
            probe_port: DNS_PORT,
            exchange: None,
        }
    }

    /// Set the per-query timeout of the default UDP transport
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of address queries allowed in flight
    #[must_use]
    pub const fn resolve_limit(mut self, limit: usize) -> Self {
        self.resolve_limit = limit;
        self
    }

    /// Set the number of capability probes allowed in flight
    #[must_use]
    pub const fn probe_limit(mut self, limit: usize) -> Self {
        self.probe_limit = limit;
        self
    }

    /// Pace all queries to at most this many per second
    #[must_use]
    pub const fn queries_per_second(mut self, rate: Option<NonZeroU32>) -> Self {
        self.queries_per_second = rate;
        self
    }

    /// Port capability probes are sent to (useful for testing)
    #[must_use]
    pub const fn probe_port(mut self, port: u16) -> Self {
        self.probe_port = port;
        self
    }

    /// Replace the UDP transport
    #[must_use]
    pub fn exchange(mut self, exchange: Arc<dyn DnsExchange>) -> Self {
        self.exchange = Some(exchange);
        self
    }

    /// Build the resolver
    pub fn build(self) -> ResolverResult<Resolver> {
        if self.servers.is_empty() {
            return Err(ResolverError::Config("no resolvers configured".into()));
        }

        let mut resolve_gate = AdmissionGate::new("resolve", self.resolve_limit)?;
        let mut probe_gate = AdmissionGate::new("probe", self.probe_limit)?;
        if let Some(rate) = self.queries_per_second {
            let shared = pacer(rate);
            resolve_gate = resolve_gate.with_pacer(Arc::clone(&shared));
            probe_gate = probe_gate.with_pacer(shared);
        }

        let exchange = self
            .exchange
            .unwrap_or_else(|| Arc::new(UdpExchange::new(self.timeout)));

        Ok(Resolver {
            inner: Arc::new(ResolverInner {
                servers: self.servers,
                exchange,
                resolve_gate,
                probe_gate,
                probe_port: self.probe_port,
            }),
        })
    }
}
