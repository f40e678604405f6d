//! Single query/response exchange with one DNS server.

use async_trait::async_trait;
use hickory_proto::op::Message;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::UdpSocket;
use tracing::trace;

use crate::error::{ResolverError, ResolverResult};

/// Largest UDP response we accept (EDNS payloads are capped well below this).
const MAX_RESPONSE: usize = 65_535;

/// Default per-query timeout
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends one DNS message to one server and returns the matching response.
///
/// Implementations make exactly one attempt; callers treat every error as
/// "no answer".
#[async_trait]
pub trait DnsExchange: Send + Sync {
    /// Exchange `query` with `server`
    async fn exchange(&self, server: SocketAddr, query: &Message) -> ResolverResult<Message>;
}

/// Plain UDP transport with a fixed per-query timeout.
#[derive(Debug, Clone)]
pub struct UdpExchange {
    timeout: Duration,
}

impl Default for UdpExchange {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl UdpExchange {
    /// Create a transport with the given per-query timeout
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl DnsExchange for UdpExchange {
    async fn exchange(&self, server: SocketAddr, query: &Message) -> ResolverResult<Message> {
        let wire = query.to_vec()?;

        let local: SocketAddr = if server.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        // Connected, so ICMP unreachable surfaces as an error instead of a timeout.
        socket.connect(server).await?;

        tokio::time::timeout(self.timeout, send_and_receive(&socket, &wire, query.id()))
            .await
            .map_err(|_| ResolverError::Timeout(self.timeout))?
    }
}

async fn send_and_receive(socket: &UdpSocket, wire: &[u8], id: u16) -> ResolverResult<Message> {
    socket.send(wire).await?;

    let mut buf = vec![0_u8; MAX_RESPONSE];
    loop {
        let len = socket.recv(&mut buf).await?;
        let response = Message::from_vec(&buf[..len])?;
        if response.id() == id {
            return Ok(response);
        }
        trace!(expected = id, got = response.id(), "discarding stray response");
    }
}
