use std::sync::Arc;
use tracing::info;
use zonestats_core::Result;

use crate::aggregator::{self, Aggregator};
use crate::config::RunConfig;
use crate::dispatcher::{Dispatcher, RunSummary};
use crate::emit::Emission;

/// What a completed run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Dispatch counts
    pub summary: RunSummary,
    /// Line protocol body
    pub metrics: String,
    /// What happened to the body
    pub emission: Emission,
}

/// Read the zone, compute every statistic and emit the metrics.
///
/// Nothing is emitted unless the whole zone was processed.
pub async fn run(config: RunConfig) -> Result<RunOutcome> {
    let resolver = config.resolver()?;
    let emitter = config.emitter()?;
    let aggregators: Vec<Arc<dyn Aggregator>> =
        aggregator::standard_set(&config.zone, resolver, config.probe);

    let records = config.source.records().await?;
    let dispatcher = Dispatcher::new(aggregators, config.workers)?;
    let summary = dispatcher.process(records).await?;
    info!(
        zone = %config.zone,
        records = summary.records,
        "zone processed"
    );

    let kind = config.source.kind();
    let metrics: String = dispatcher
        .aggregators()
        .iter()
        .map(|a| a.report(&config.zone, kind))
        .collect();

    let emission = emitter.emit(&metrics).await?;
    Ok(RunOutcome {
        summary,
        metrics,
        emission,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfig;
    use std::io::Write;
    use std::net::SocketAddr;
    use tokio::net::UdpSocket;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ZONE: &str = "\
$TTL 3600
@           IN SOA  a.ns.se. hostmaster.se. 1 1800 600 864000 300
@           IN NS   a.ns.se.
example     IN NS   ns1.example
ns1.example IN A    192.0.2.1
example     IN DS   12345 8 2 E2D3C916F6DEEAC73294E8268FB5885044A833FC5459588F4A9184CFC41A5766
";

    const SIGNED_ZONE: &str = "\
$TTL 3600
@           IN SOA    a.ns.se. hostmaster.se. 1 1800 600 864000 300
@           IN RRSIG  SOA 13 1 3600 20261101000000 20261018000000 59407 se. SjVow9OHLMSY6qynAviCR/xwFN//RwZrZIpXMPbq6FDOHIEuMFq28sixH7MqolpEB2y4/ngKdzdBgBWmKXxq1Q==
@           IN NS     a.ns.se.
@           IN RRSIG  NS 13 1 3600 20261101000000 20261018000000 59407 se. 8u6ZU6PSFTLZB6IX8axKxyWPFl0a38PRHLx+PjiMz7vREJ0cb1GZbbzX0xBki5jjQNwvC/T7vzw2i8GOZzNuiA==
@           IN DNSKEY 257 3 13 lI6h0Q+iMvPCepAcqgTbVlIE0Fd0vykAirYW1WaINSaVI5+bmuaWNWj9+XSkYJusPnHplB07Br1GBqLz9si39Q==
@           IN NSEC   example.se. NS SOA RRSIG NSEC DNSKEY
example     IN NS     ns1.example
ns1.example IN A      192.0.2.1
example     IN DS     12345 13 2 E2D3C916F6DEEAC73294E8268FB5885044A833FC5459588F4A9184CFC41A5766
example     IN RRSIG  DS 13 2 3600 20261101000000 20261018000000 59407 se. SjVow9OHLMSY6qynAviCR/xwFN//RwZrZIpXMPbq6FDOHIEuMFq28sixH7MqolpEB2y4/ngKdzdBgBWmKXxq1Q==
";

    /// A resolver address that never answers, so lookups time out quickly.
    async fn silent_resolver() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        (socket, addr)
    }

    fn config(file: &tempfile::NamedTempFile, resolver: SocketAddr, server: Option<String>) -> RunConfig {
        RawConfig {
            zone: Some("se".into()),
            infile: Some(file.path().to_path_buf()),
            resolvers: vec![resolver.to_string()],
            dryrun: server.is_none(),
            influx_server: server,
            influx_db: Some("zones".into()),
            timeout_secs: Some(1),
            probe: Some(false),
            ..RawConfig::default()
        }
        .validate()
        .unwrap()
    }

    fn zone_file() -> tempfile::NamedTempFile {
        write_zone(ZONE)
    }

    fn write_zone(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_dry_run_end_to_end() {
        let file = zone_file();
        let (_socket, resolver) = silent_resolver().await;

        let outcome = run(config(&file, resolver, None)).await.unwrap();

        assert_eq!(outcome.summary.records, 5);
        assert_eq!(outcome.summary.deliveries, 20);
        assert!(outcome
            .metrics
            .contains("CountDom,tld=se,source=file value=3i\n"));
        assert!(outcome
            .metrics
            .contains("CountRR,tld=se,source=file A=1i,DS=1i,NS=2i,SOA=1i\n"));
        assert!(outcome.metrics.contains(
            "CountDS,tld=se,source=file,algorithm=RSASHA256,digesttype=SHA256 count=1i\n"
        ));
        assert!(outcome.metrics.contains(
            "Hosts,tld=se,source=file InTld=2i,InTldNoGlue=1i,InTldNoGlueNoIp=1i,InTldGlue=1i,\
             InTldGlueNoIp=1i,InTldGlueIp=0i,InTldGlueIpMismatch=0i,ExTld=0i,ExTldNoIp=0i\n"
        ));
        let Emission::DryRun(text) = outcome.emission else {
            panic!("expected dry run");
        };
        assert!(text.ends_with(&outcome.metrics));
    }

    #[tokio::test]
    async fn test_signed_zone_file_counts_dnssec_records() {
        let file = write_zone(SIGNED_ZONE);
        let (_socket, resolver) = silent_resolver().await;

        let outcome = run(config(&file, resolver, None)).await.unwrap();

        assert_eq!(outcome.summary.records, 10);
        assert!(outcome.metrics.contains(
            "CountRR,tld=se,source=file A=1i,DNSKEY=1i,DS=1i,NS=2i,NSEC=1i,RRSIG=3i,SOA=1i\n"
        ));
        assert!(outcome
            .metrics
            .contains("CountDom,tld=se,source=file value=3i\n"));
        assert!(outcome.metrics.contains(
            "CountDS,tld=se,source=file,algorithm=ECDSAP256SHA256,digesttype=SHA256 count=1i\n"
        ));
    }

    #[tokio::test]
    async fn test_delivers_metrics() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/write"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let file = zone_file();
        let (_socket, resolver) = silent_resolver().await;
        let host = server.uri().trim_start_matches("http://").to_string();

        let outcome = run(config(&file, resolver, Some(host))).await.unwrap();
        assert_eq!(outcome.emission, Emission::Delivered { status: 204 });
    }

    #[tokio::test]
    async fn test_broken_zone_emits_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"@ IN NS\n").unwrap();
        let (_socket, resolver) = silent_resolver().await;
        let host = server.uri().trim_start_matches("http://").to_string();

        let err = run(config(&file, resolver, Some(host))).await.unwrap_err();
        assert!(err.is_acquisition_error());
    }
}
