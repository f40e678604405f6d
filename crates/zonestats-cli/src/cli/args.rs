//! Command-line argument definitions using clap.

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use zonestats::RawConfig;

/// Statistics over a complete DNS zone
///
/// Reads every record of a zone by transfer (--axfr) or from a zone file
/// (--infile), resolves and probes the nameservers it delegates to and
/// writes the results to InfluxDB.
#[derive(Parser, Debug)]
#[command(name = "zonestats")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file, read after ~/.zonestats and ./.zonestats
    #[arg(long, value_name = "FILE")]
    pub conf: Option<PathBuf>,

    /// Zone to analyze
    #[arg(long, env = "ZONESTATS_ZONE")]
    pub zone: Option<String>,

    /// Zone file to read
    #[arg(long, env = "ZONESTATS_INFILE", value_name = "FILE")]
    pub infile: Option<PathBuf>,

    /// Server to request the zone transfer from
    #[arg(long, env = "ZONESTATS_AXFR", value_name = "ADDRESS")]
    pub axfr: Option<String>,

    /// Port of the transfer server [default: 53]
    #[arg(long, env = "ZONESTATS_PORT")]
    pub port: Option<u16>,

    /// Resolver to use, `ip` or `ip:port` (repeatable; default: system resolvers)
    #[arg(
        long = "resolver",
        env = "ZONESTATS_RESOLVERS",
        value_name = "ADDRESS",
        value_delimiter = ','
    )]
    pub resolvers: Vec<String>,

    /// InfluxDB server, `host` or `host:port`
    #[arg(long, alias = "influxServer", env = "ZONESTATS_INFLUX_SERVER")]
    pub influx_server: Option<String>,

    /// InfluxDB database
    #[arg(long, alias = "influxDB", env = "ZONESTATS_INFLUX_DB")]
    pub influx_db: Option<String>,

    /// InfluxDB user
    #[arg(long, alias = "influxUser", env = "ZONESTATS_INFLUX_USER")]
    pub influx_user: Option<String>,

    /// InfluxDB password
    #[arg(
        long,
        alias = "influxPasswd",
        env = "ZONESTATS_INFLUX_PASSWORD",
        hide_env_values = true
    )]
    pub influx_password: Option<String>,

    /// Use https for InfluxDB
    #[arg(long)]
    pub influx_tls: bool,

    /// Print the InfluxDB request instead of sending it
    #[arg(long)]
    pub dryrun: bool,

    /// Per-query timeout in seconds [default: 5]
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Concurrent nameserver address queries [default: 200]
    #[arg(long, value_name = "N")]
    pub resolve_limit: Option<usize>,

    /// Concurrent capability probes [default: 100]
    #[arg(long, value_name = "N")]
    pub probe_limit: Option<usize>,

    /// Cap on DNS queries per second across resolution and probing
    #[arg(long, value_name = "N")]
    pub queries_per_second: Option<u32>,

    /// Concurrent record deliveries [default: 64 per CPU]
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Skip nameserver capability probing
    #[arg(long)]
    pub no_probe: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// The configuration layer given on the command line
    #[must_use]
    pub fn to_raw(&self) -> RawConfig {
        RawConfig {
            zone: self.zone.clone(),
            infile: self.infile.clone(),
            axfr: self.axfr.clone(),
            port: self.port,
            resolvers: self.resolvers.clone(),
            influx_server: self.influx_server.clone(),
            influx_db: self.influx_db.clone(),
            influx_user: self.influx_user.clone(),
            influx_password: self.influx_password.clone(),
            influx_tls: self.influx_tls.then_some(true),
            dryrun: self.dryrun,
            timeout_secs: self.timeout,
            resolve_limit: self.resolve_limit,
            probe_limit: self.probe_limit,
            queries_per_second: self.queries_per_second,
            workers: self.workers,
            probe: self.no_probe.then_some(false),
        }
    }
}
