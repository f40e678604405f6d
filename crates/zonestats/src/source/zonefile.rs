//! Zone file source.
//!
//! Parsing uses the in-place scanner of `domain`, which takes DNSSEC
//! records (RRSIG, DNSKEY, NSEC, NSEC3) as ordinary zone data.

use domain::base::name::{Name, ToName};
use domain::rdata::ZoneRecordData;
use domain::zonefile::inplace::{Entry, ScannedRecord, Zonefile};
use futures_util::stream::{self, StreamExt};
use hickory_proto::rr::RecordType;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zonestats_core::{canonical_name, ResourceRecord, Result, ZoneStatsError};

use super::RecordStream;

/// Nesting limit for `$INCLUDE`
const MAX_INCLUDE_DEPTH: usize = 7;

/// Parse the file off the runtime and stream its records.
pub(super) async fn read(path: PathBuf, origin: String) -> Result<RecordStream> {
    let records = tokio::task::spawn_blocking(move || read_file(&path, &origin, 0))
        .await
        .map_err(|e| ZoneStatsError::Task(e.to_string()))??;

    info!(records = records.len(), "zone file parsed");
    Ok(stream::iter(records.into_iter().map(Ok)).boxed())
}

fn read_file(path: &Path, origin: &str, depth: usize) -> Result<Vec<ResourceRecord>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ZoneStatsError::ZoneFile(format!("{}: {e}", path.display())))?;
    parse_at_depth(&text, Some(path), origin, depth)
}

/// Parse zone file text with `origin` as the default `$ORIGIN`.
///
/// Every record is returned, signatures included. `$INCLUDE` paths are
/// taken relative to the directory of `path`. Any syntax error fails the
/// whole file.
pub fn parse_zone(text: &str, path: Option<&Path>, origin: &str) -> Result<Vec<ResourceRecord>> {
    parse_at_depth(text, path, origin, 0)
}

fn parse_at_depth(
    text: &str,
    path: Option<&Path>,
    origin: &str,
    depth: usize,
) -> Result<Vec<ResourceRecord>> {
    let at = |e: &dyn std::fmt::Display| match path {
        Some(path) => ZoneStatsError::ZoneFile(format!("{}:{e}", path.display())),
        None => ZoneStatsError::ZoneFile(e.to_string()),
    };

    let origin_name = Name::bytes_from_str(&canonical_name(origin))
        .map_err(|e| ZoneStatsError::ZoneFile(format!("invalid origin {origin}: {e}")))?;

    let mut zone = Zonefile::with_capacity(text.len());
    zone.extend_from_slice(text.as_bytes());
    zone.set_origin(origin_name);

    let mut records = Vec::new();
    while let Some(entry) = zone.next_entry().map_err(|e| at(&e))? {
        match entry {
            Entry::Record(record) => records.push(convert(&record)),
            Entry::Include {
                path: included,
                origin: included_origin,
            } => {
                if depth >= MAX_INCLUDE_DEPTH {
                    return Err(at(&format!("$INCLUDE nested deeper than {MAX_INCLUDE_DEPTH}")));
                }
                let included = include_path(path, &included.to_string());
                let included_origin = included_origin
                    .map_or_else(|| origin.to_string(), |name| name_text(&name));
                debug!(path = %included.display(), origin = %included_origin, "following $INCLUDE");
                records.extend(read_file(&included, &included_origin, depth + 1)?);
            }
        }
    }
    debug!(origin, records = records.len(), "parsed zone text");
    Ok(records)
}

fn include_path(parent: Option<&Path>, included: &str) -> PathBuf {
    let included = Path::new(included);
    match parent.and_then(Path::parent) {
        Some(dir) if included.is_relative() => dir.join(included),
        _ => included.to_path_buf(),
    }
}

/// Canonical text of a scanned name.
fn name_text(name: &impl ToName) -> String {
    let text: String = name
        .iter_labels()
        .filter(|label| !label.is_root())
        .map(|label| format!("{label}."))
        .collect();
    canonical_name(&text)
}

fn convert(record: &ScannedRecord) -> ResourceRecord {
    let owner = name_text(record.owner());
    match record.data() {
        ZoneRecordData::Ns(ns) => ResourceRecord::ns(&owner, &name_text(ns.nsdname())),
        ZoneRecordData::A(a) => ResourceRecord::address(&owner, IpAddr::V4(a.addr())),
        ZoneRecordData::Aaaa(aaaa) => ResourceRecord::address(&owner, IpAddr::V6(aaaa.addr())),
        ZoneRecordData::Ds(ds) => ResourceRecord::ds(
            &owner,
            ds.key_tag(),
            ds.algorithm().to_int(),
            ds.digest_type().to_int(),
        ),
        _ => ResourceRecord::other(&owner, RecordType::from(record.rtype().to_int())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zonestats_core::RecordData;

    const ZONE: &str = "\
$TTL 3600
@           IN SOA  a.ns.se. hostmaster.se. 1 1800 600 864000 300
@           IN NS   a.ns.se.
example     IN NS   ns1.example
example     IN NS   ns.provider.net.
ns1.example IN A    192.0.2.1
ns1.example IN AAAA 2001:db8::1
example     IN DS   12345 13 2 E2D3C916F6DEEAC73294E8268FB5885044A833FC5459588F4A9184CFC41A5766
";

    const SIGNED: &str = "\
$TTL 3600
@        IN SOA    a.ns.se. hostmaster.se. 1 1800 600 864000 300
@        IN RRSIG  SOA 13 1 3600 20261101000000 20261018000000 59407 se. SjVow9OHLMSY6qynAviCR/xwFN//RwZrZIpXMPbq6FDOHIEuMFq28sixH7MqolpEB2y4/ngKdzdBgBWmKXxq1Q==
@        IN NS     a.ns.se.
@        IN RRSIG  NS 13 1 3600 20261101000000 20261018000000 59407 se. 8u6ZU6PSFTLZB6IX8axKxyWPFl0a38PRHLx+PjiMz7vREJ0cb1GZbbzX0xBki5jjQNwvC/T7vzw2i8GOZzNuiA==
@        IN DNSKEY 257 3 13 lI6h0Q+iMvPCepAcqgTbVlIE0Fd0vykAirYW1WaINSaVI5+bmuaWNWj9+XSkYJusPnHplB07Br1GBqLz9si39Q==
@        IN NSEC   example.se. NS SOA RRSIG NSEC DNSKEY
@        IN NSEC3PARAM 1 0 0 -
example  IN NS     ns1.example
example  IN DS     12345 13 2 E2D3C916F6DEEAC73294E8268FB5885044A833FC5459588F4A9184CFC41A5766
example  IN NSEC   se. NS DS RRSIG NSEC
";

    #[test]
    fn test_parse_zone_records() {
        let records = parse_zone(ZONE, None, "se").unwrap();
        assert_eq!(records.len(), 7);

        assert!(records.contains(&ResourceRecord::ns("example.se.", "ns1.example.se.")));
        assert!(records.contains(&ResourceRecord::ns("example.se.", "ns.provider.net.")));
        assert!(records.contains(&ResourceRecord::address(
            "ns1.example.se.",
            "2001:db8::1".parse().unwrap()
        )));
        assert!(records.contains(&ResourceRecord::other("se.", RecordType::SOA)));

        let ds = records
            .iter()
            .find(|r| r.record_type == RecordType::DS)
            .unwrap();
        assert_eq!(
            ds.data,
            RecordData::Ds {
                key_tag: 12345,
                algorithm: 13,
                digest_type: 2
            }
        );
    }

    #[test]
    fn test_signed_zone_keeps_dnssec_records() {
        let records = parse_zone(SIGNED, None, "se.").unwrap();
        assert_eq!(records.len(), 10);

        let count = |rtype: RecordType| records.iter().filter(|r| r.record_type == rtype).count();
        assert_eq!(count(RecordType::RRSIG), 2);
        assert_eq!(count(RecordType::DNSKEY), 1);
        assert_eq!(count(RecordType::NSEC), 2);
        assert_eq!(count(RecordType::NSEC3PARAM), 1);
        assert_eq!(count(RecordType::DS), 1);
        assert!(records.contains(&ResourceRecord::other("se.", RecordType::RRSIG)));
    }

    #[test]
    fn test_parse_error_is_fatal() {
        let err = parse_zone("@ IN NS\n", None, "se").unwrap_err();
        assert!(err.is_acquisition_error());
    }

    #[test]
    fn test_owner_names_are_canonical() {
        let records = parse_zone("$TTL 60\nExample.SE. IN NS NS1.Example.SE.\n", None, "se").unwrap();
        assert_eq!(records, vec![ResourceRecord::ns("example.se.", "ns1.example.se.")]);
    }

    #[tokio::test]
    async fn test_read_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ZONE.as_bytes()).unwrap();

        let stream = read(file.path().to_path_buf(), "se.".into()).await.unwrap();
        let records: Vec<_> = stream.collect().await;
        assert_eq!(records.len(), 7);
        assert!(records.iter().all(std::result::Result::is_ok));
    }

    #[tokio::test]
    async fn test_include_is_relative_to_parent() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("glue.inc"),
            "$TTL 3600\nns1.example IN A 192.0.2.1\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("se.zone"),
            "$TTL 3600\nexample IN NS ns1.example\n$INCLUDE glue.inc\n",
        )
        .unwrap();

        let stream = read(dir.path().join("se.zone"), "se".into()).await.unwrap();
        let records: Vec<_> = stream.map(std::result::Result::unwrap).collect().await;
        assert_eq!(
            records,
            vec![
                ResourceRecord::ns("example.se.", "ns1.example.se."),
                ResourceRecord::address("ns1.example.se.", "192.0.2.1".parse().unwrap()),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = read(PathBuf::from("/nonexistent/se.zone"), "se".into()).await;
        assert!(matches!(result, Err(ZoneStatsError::ZoneFile(_))));
    }
}
