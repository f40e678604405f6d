//! Resolver address handling.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use tracing::debug;

use crate::error::{ResolverError, ResolverResult};

/// Port used when a resolver is given without one
pub const DNS_PORT: u16 = 53;

/// Parse a resolver given as `ip`, `ip:port`, `[v6]` or `[v6]:port`.
pub fn parse_server(spec: &str) -> ResolverResult<SocketAddr> {
    let spec = spec.trim();

    if let Ok(addr) = spec.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = spec.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DNS_PORT));
    }
    if let Some(inner) = spec.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
        if let Ok(ip) = inner.parse::<Ipv6Addr>() {
            return Ok(SocketAddr::new(IpAddr::V6(ip), DNS_PORT));
        }
    }

    Err(ResolverError::InvalidServer(spec.to_string()))
}

/// Resolvers from the operating system configuration (`/etc/resolv.conf`
/// on Unix), deduplicated and in configured order.
pub fn system_resolvers() -> ResolverResult<Vec<SocketAddr>> {
    let (config, _opts) = hickory_resolver::system_conf::read_system_conf()
        .map_err(|e| ResolverError::Config(format!("cannot read system resolvers: {e}")))?;

    let mut servers: Vec<SocketAddr> = Vec::new();
    for name_server in config.name_servers() {
        if !servers.contains(&name_server.socket_addr) {
            servers.push(name_server.socket_addr);
        }
    }

    debug!(count = servers.len(), "loaded system resolvers");
    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_forms() {
        assert_eq!(
            parse_server("192.0.2.1").unwrap(),
            "192.0.2.1:53".parse().unwrap()
        );
        assert_eq!(
            parse_server("192.0.2.1:5353").unwrap(),
            "192.0.2.1:5353".parse().unwrap()
        );
        assert_eq!(
            parse_server("2001:db8::1").unwrap(),
            "[2001:db8::1]:53".parse().unwrap()
        );
        assert_eq!(
            parse_server("[2001:db8::1]").unwrap(),
            "[2001:db8::1]:53".parse().unwrap()
        );
        assert_eq!(
            parse_server(" [2001:db8::1]:853 ").unwrap(),
            "[2001:db8::1]:853".parse().unwrap()
        );
    }

    #[test]
    fn test_parse_server_rejects_names() {
        assert!(matches!(
            parse_server("resolver.example"),
            Err(ResolverError::InvalidServer(_))
        ));
    }
}
