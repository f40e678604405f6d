//! Run configuration.
//!
//! [`RawConfig`] is one layer as read from a file or the command line,
//! every key optional. Layers are merged with [`RawConfig::merge`] and the
//! result checked once by [`RawConfig::validate`], which yields the
//! [`RunConfig`] a run is started with.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use zonestats_core::{Result, ZoneStatsError};
use zonestats_resolver::{
    parse_server, system_resolvers, Resolver, ResolverResult, DNS_PORT,
};

use crate::emit::{Credentials, Emitter, InfluxTarget};
use crate::source::ZoneSource;

/// Default per-query timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default concurrent address queries
const DEFAULT_RESOLVE_LIMIT: usize = 200;

/// Default concurrent capability probes
const DEFAULT_PROBE_LIMIT: usize = 100;

/// Record deliveries allowed in flight per available CPU
const WORKERS_PER_CPU: usize = 64;

/// One configuration layer.
///
/// Besides the snake-case keys, the lower-case names written by earlier
/// zonestats releases (`filename`, `influxserver`, `influxdb`, `influxuser`,
/// `influxpasswd`) are accepted. Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Zone name
    pub zone: Option<String>,
    /// Zone file to read
    #[serde(alias = "filename")]
    pub infile: Option<PathBuf>,
    /// Server to transfer the zone from
    pub axfr: Option<String>,
    /// Transfer server port
    pub port: Option<u16>,
    /// Resolver addresses, `ip` or `ip:port`
    pub resolvers: Vec<String>,
    /// InfluxDB `host[:port]`
    #[serde(alias = "influxserver")]
    pub influx_server: Option<String>,
    /// InfluxDB database
    #[serde(alias = "influxdb")]
    pub influx_db: Option<String>,
    /// InfluxDB user
    #[serde(alias = "influxuser")]
    pub influx_user: Option<String>,
    /// InfluxDB password
    #[serde(alias = "influxpasswd")]
    pub influx_password: Option<String>,
    /// Talk https to InfluxDB
    pub influx_tls: Option<bool>,
    /// Print the request instead of sending it
    pub dryrun: bool,
    /// Per-query timeout in seconds
    pub timeout_secs: Option<u64>,
    /// Concurrent address queries
    pub resolve_limit: Option<usize>,
    /// Concurrent capability probes
    pub probe_limit: Option<usize>,
    /// Overall query rate cap
    pub queries_per_second: Option<u32>,
    /// Concurrent record deliveries
    pub workers: Option<usize>,
    /// Probe nameserver capabilities
    pub probe: Option<bool>,
}

impl RawConfig {
    /// Overlay `over` on `self`.
    ///
    /// Keys set in `over` win. A non-empty resolver list replaces the
    /// previous one. `dryrun` stays on once any layer sets it.
    #[must_use]
    pub fn merge(self, over: Self) -> Self {
        Self {
            zone: over.zone.or(self.zone),
            infile: over.infile.or(self.infile),
            axfr: over.axfr.or(self.axfr),
            port: over.port.or(self.port),
            resolvers: if over.resolvers.is_empty() {
                self.resolvers
            } else {
                over.resolvers
            },
            influx_server: over.influx_server.or(self.influx_server),
            influx_db: over.influx_db.or(self.influx_db),
            influx_user: over.influx_user.or(self.influx_user),
            influx_password: over.influx_password.or(self.influx_password),
            influx_tls: over.influx_tls.or(self.influx_tls),
            dryrun: self.dryrun || over.dryrun,
            timeout_secs: over.timeout_secs.or(self.timeout_secs),
            resolve_limit: over.resolve_limit.or(self.resolve_limit),
            probe_limit: over.probe_limit.or(self.probe_limit),
            queries_per_second: over.queries_per_second.or(self.queries_per_second),
            workers: over.workers.or(self.workers),
            probe: over.probe.or(self.probe),
        }
    }

    /// Check the merged configuration, falling back to the system resolvers.
    pub fn validate(self) -> Result<RunConfig> {
        self.validate_with(system_resolvers)
    }

    /// Check the merged configuration, asking `system` for resolvers when
    /// none are configured.
    pub fn validate_with<F>(self, system: F) -> Result<RunConfig>
    where
        F: FnOnce() -> ResolverResult<Vec<SocketAddr>>,
    {
        let zone = non_empty(self.zone)
            .ok_or_else(|| ZoneStatsError::Config("zone must be given".into()))?;

        let port = self.port.unwrap_or(DNS_PORT);
        if port == 0 {
            return Err(ZoneStatsError::Config("port must not be 0".into()));
        }

        let infile = self.infile.filter(|p| !p.as_os_str().is_empty());
        let source = match (infile, non_empty(self.axfr)) {
            (Some(_), Some(_)) => {
                return Err(ZoneStatsError::Config(
                    "only one of infile and axfr can be given".into(),
                ))
            }
            (None, None) => {
                return Err(ZoneStatsError::Config(
                    "one of infile and axfr must be given".into(),
                ))
            }
            (Some(path), None) => ZoneSource::File {
                path,
                origin: zone.clone(),
            },
            (None, Some(server)) => ZoneSource::Axfr {
                server: parse_transfer_server(&server)?,
                port,
                zone: zone.clone(),
            },
        };

        let resolvers = if self.resolvers.is_empty() {
            let found = system()
                .map_err(|e| ZoneStatsError::Config(format!("no resolvers configured: {e}")))?;
            debug!(count = found.len(), "using system resolvers");
            found
        } else {
            self.resolvers
                .iter()
                .map(|r| parse_server(r).map_err(|e| ZoneStatsError::Config(e.to_string())))
                .collect::<Result<Vec<_>>>()?
        };
        if resolvers.is_empty() {
            return Err(ZoneStatsError::Config("no resolver(s) found".into()));
        }

        let credentials = match (non_empty(self.influx_user), non_empty(self.influx_password)) {
            (Some(user), Some(password)) => Some(Credentials { user, password }),
            (None, None) => None,
            _ => {
                return Err(ZoneStatsError::Config(
                    "influx user and password must be given together".into(),
                ))
            }
        };
        let influx = InfluxTarget {
            server: non_empty(self.influx_server).unwrap_or_default(),
            database: non_empty(self.influx_db).unwrap_or_default(),
            credentials,
            tls: self.influx_tls.unwrap_or(false),
        };
        if !self.dryrun {
            if influx.server.is_empty() {
                return Err(ZoneStatsError::Config("influx server must be given".into()));
            }
            if influx.database.is_empty() {
                return Err(ZoneStatsError::Config("influx database must be given".into()));
            }
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ZoneStatsError::Config("timeout must be at least 1 second".into()));
        }

        Ok(RunConfig {
            zone,
            source,
            resolvers,
            influx,
            dry_run: self.dryrun,
            timeout: Duration::from_secs(timeout_secs),
            resolve_limit: positive("resolve_limit", self.resolve_limit, DEFAULT_RESOLVE_LIMIT)?,
            probe_limit: positive("probe_limit", self.probe_limit, DEFAULT_PROBE_LIMIT)?,
            queries_per_second: match self.queries_per_second {
                None => None,
                Some(rate) => Some(NonZeroU32::new(rate).ok_or_else(|| {
                    ZoneStatsError::Config("queries_per_second must be at least 1".into())
                })?),
            },
            workers: positive("workers", self.workers, default_workers())?,
            probe: self.probe.unwrap_or(true),
        })
    }
}

/// Validated settings of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Zone name as configured
    pub zone: String,
    /// Where records come from
    pub source: ZoneSource,
    /// Resolver pool
    pub resolvers: Vec<SocketAddr>,
    /// Metrics destination
    pub influx: InfluxTarget,
    /// Render instead of deliver
    pub dry_run: bool,
    /// Per-query timeout
    pub timeout: Duration,
    /// Concurrent address queries
    pub resolve_limit: usize,
    /// Concurrent capability probes
    pub probe_limit: usize,
    /// Optional query pacing
    pub queries_per_second: Option<NonZeroU32>,
    /// Concurrent record deliveries
    pub workers: usize,
    /// Probe nameserver capabilities
    pub probe: bool,
}

impl RunConfig {
    /// Resolver for this run
    pub fn resolver(&self) -> Result<Resolver> {
        Ok(Resolver::builder(self.resolvers.clone())
            .timeout(self.timeout)
            .resolve_limit(self.resolve_limit)
            .probe_limit(self.probe_limit)
            .queries_per_second(self.queries_per_second)
            .build()?)
    }

    /// Emitter for this run; never builds an HTTP client in dry-run mode
    pub fn emitter(&self) -> Result<Emitter> {
        if self.dry_run {
            Ok(Emitter::dry_run(self.influx.clone()))
        } else {
            Emitter::influx(self.influx.clone())
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive(key: &str, value: Option<usize>, default: usize) -> Result<usize> {
    match value {
        Some(0) => Err(ZoneStatsError::Config(format!("{key} must be at least 1"))),
        Some(n) => Ok(n),
        None => Ok(default),
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get) * WORKERS_PER_CPU
}

fn parse_transfer_server(server: &str) -> Result<IpAddr> {
    server
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|_| ZoneStatsError::Config(format!("invalid axfr server address: {server}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonestats_resolver::ResolverError;

    fn system() -> ResolverResult<Vec<SocketAddr>> {
        Ok(vec!["192.0.2.53:53".parse().unwrap()])
    }

    fn no_system() -> ResolverResult<Vec<SocketAddr>> {
        Err(ResolverError::Config("no resolv.conf".into()))
    }

    fn base() -> RawConfig {
        RawConfig {
            zone: Some("se".into()),
            infile: Some(PathBuf::from("se.zone")),
            influx_server: Some("influx.example:8086".into()),
            influx_db: Some("zones".into()),
            ..RawConfig::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = base().validate_with(system).unwrap();
        assert_eq!(config.zone, "se");
        assert_eq!(
            config.source,
            ZoneSource::File {
                path: PathBuf::from("se.zone"),
                origin: "se".into()
            }
        );
        assert_eq!(config.resolvers, system().unwrap());
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.resolve_limit, 200);
        assert_eq!(config.probe_limit, 100);
        assert!(config.workers >= WORKERS_PER_CPU);
        assert!(config.probe);
        assert!(!config.dry_run);
        assert_eq!(config.queries_per_second, None);
    }

    #[test]
    fn test_merge_precedence() {
        let home = RawConfig {
            zone: Some("nu".into()),
            resolvers: vec!["192.0.2.1".into()],
            dryrun: true,
            influx_db: Some("home".into()),
            ..RawConfig::default()
        };
        let cwd = RawConfig {
            zone: Some("se".into()),
            influx_db: Some("cwd".into()),
            ..RawConfig::default()
        };
        let cmdline = RawConfig {
            influx_db: Some("cli".into()),
            ..RawConfig::default()
        };

        let merged = home.merge(cwd).merge(cmdline);
        assert_eq!(merged.zone.as_deref(), Some("se"));
        assert_eq!(merged.influx_db.as_deref(), Some("cli"));
        // Empty list does not wipe out an earlier one.
        assert_eq!(merged.resolvers, vec!["192.0.2.1".to_string()]);
        // Once on, always on.
        assert!(merged.dryrun);
    }

    #[test]
    fn test_source_must_be_exactly_one() {
        let both = RawConfig {
            axfr: Some("192.0.2.1".into()),
            ..base()
        };
        assert!(both.validate_with(system).unwrap_err().is_config_error());

        let neither = RawConfig {
            infile: None,
            ..base()
        };
        assert!(neither.validate_with(system).unwrap_err().is_config_error());
    }

    #[test]
    fn test_axfr_source() {
        let config = RawConfig {
            infile: None,
            axfr: Some("[2001:db8::53]".into()),
            port: Some(5353),
            ..base()
        }
        .validate_with(system)
        .unwrap();

        assert_eq!(
            config.source,
            ZoneSource::Axfr {
                server: "2001:db8::53".parse().unwrap(),
                port: 5353,
                zone: "se".into()
            }
        );
    }

    #[test]
    fn test_missing_zone_and_port_zero() {
        let no_zone = RawConfig {
            zone: Some("  ".into()),
            ..base()
        };
        assert!(no_zone.validate_with(system).is_err());

        let port_zero = RawConfig {
            port: Some(0),
            ..base()
        };
        assert!(port_zero.validate_with(system).is_err());
    }

    #[test]
    fn test_resolver_fallback() {
        let explicit = RawConfig {
            resolvers: vec!["198.51.100.1:5300".into()],
            ..base()
        }
        .validate_with(no_system)
        .unwrap();
        assert_eq!(explicit.resolvers, vec!["198.51.100.1:5300".parse().unwrap()]);

        assert!(base().validate_with(no_system).is_err());
        assert!(base().validate_with(|| Ok(Vec::new())).is_err());

        let bad = RawConfig {
            resolvers: vec!["resolver.example".into()],
            ..base()
        };
        assert!(bad.validate_with(system).is_err());
    }

    #[test]
    fn test_influx_requirements() {
        let no_server = RawConfig {
            influx_server: None,
            ..base()
        };
        assert!(no_server.clone().validate_with(system).is_err());

        // Dry run does not need a destination.
        let dry = RawConfig {
            dryrun: true,
            ..no_server
        };
        assert!(dry.validate_with(system).is_ok());

        let half_auth = RawConfig {
            influx_user: Some("stats".into()),
            ..base()
        };
        assert!(half_auth.validate_with(system).is_err());

        let auth = RawConfig {
            influx_user: Some("stats".into()),
            influx_password: Some("s3cret".into()),
            ..base()
        }
        .validate_with(system)
        .unwrap();
        assert_eq!(
            auth.influx.credentials,
            Some(Credentials {
                user: "stats".into(),
                password: "s3cret".into()
            })
        );
    }

    #[test]
    fn test_zero_limits_rejected() {
        for config in [
            RawConfig {
                workers: Some(0),
                ..base()
            },
            RawConfig {
                resolve_limit: Some(0),
                ..base()
            },
            RawConfig {
                queries_per_second: Some(0),
                ..base()
            },
            RawConfig {
                timeout_secs: Some(0),
                ..base()
            },
        ] {
            assert!(config.validate_with(system).is_err());
        }
    }

    #[test]
    fn test_dry_run_emitter_has_no_client() {
        let config = RawConfig {
            dryrun: true,
            ..base()
        }
        .validate_with(system)
        .unwrap();
        assert!(matches!(config.emitter().unwrap(), Emitter::DryRun { .. }));
        assert_eq!(config.resolver().unwrap().servers(), system().unwrap());
    }
}
