//! DS algorithm and digest type tally.

use async_trait::async_trait;
use hickory_proto::dnssec::{Algorithm, DigestType};
use parking_lot::Mutex;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;
use zonestats_core::{RecordData, ResourceRecord, Result, SourceKind};

use super::Aggregator;
use crate::emit::LineBuilder;

/// DNSSEC algorithm mnemonic, number when `hickory-proto` has no name for it.
#[must_use]
pub fn algorithm_name(algorithm: u8) -> Cow<'static, str> {
    match Algorithm::from_u8(algorithm) {
        Algorithm::Unknown(number) => Cow::Owned(number.to_string()),
        known => Cow::Borrowed(known.as_str()),
    }
}

/// DS digest type mnemonic, number when unassigned.
#[must_use]
pub fn digest_type_name(digest_type: u8) -> Cow<'static, str> {
    match DigestType::from(digest_type) {
        DigestType::SHA1 => Cow::Borrowed("SHA1"),
        DigestType::SHA256 => Cow::Borrowed("SHA256"),
        DigestType::SHA384 => Cow::Borrowed("SHA384"),
        _ => Cow::Owned(digest_type.to_string()),
    }
}

#[derive(Debug, Default)]
struct Summary {
    per_pair: BTreeMap<(u8, u8), u64>,
    signed_domains: usize,
}

/// Tallies DS records by (algorithm, digest type) and counts signed
/// delegations.
#[derive(Debug, Default)]
pub struct DnssecTally {
    seen: Mutex<HashMap<(String, u8, u8), u64>>,
    summary: Mutex<Summary>,
}

impl DnssecTally {
    /// Create an empty tally
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// DS records with this algorithm and digest type (after finalize)
    #[must_use]
    pub fn count(&self, algorithm: u8, digest_type: u8) -> u64 {
        self.summary
            .lock()
            .per_pair
            .get(&(algorithm, digest_type))
            .copied()
            .unwrap_or(0)
    }

    /// Distinct owners with at least one DS record (after finalize)
    #[must_use]
    pub fn signed_domains(&self) -> usize {
        self.summary.lock().signed_domains
    }
}

#[async_trait]
impl Aggregator for DnssecTally {
    fn name(&self) -> &'static str {
        "DNSSEC"
    }

    fn receive(&self, record: &ResourceRecord) -> Result<()> {
        if let RecordData::Ds {
            algorithm,
            digest_type,
            ..
        } = record.data
        {
            *self
                .seen
                .lock()
                .entry((record.owner.clone(), algorithm, digest_type))
                .or_insert(0) += 1;
        }
        Ok(())
    }

    async fn finalize(&self) -> Result<()> {
        let seen = self.seen.lock();

        let mut summary = Summary::default();
        let mut owners = HashSet::new();
        for ((owner, algorithm, digest_type), count) in seen.iter() {
            *summary.per_pair.entry((*algorithm, *digest_type)).or_insert(0) += count;
            owners.insert(owner.as_str());
        }
        summary.signed_domains = owners.len();

        debug!(
            pairs = summary.per_pair.len(),
            signed = summary.signed_domains,
            "DS tally finalized"
        );
        *self.summary.lock() = summary;
        Ok(())
    }

    fn report(&self, zone: &str, source: SourceKind) -> String {
        let summary = self.summary.lock();

        let mut out: String = summary
            .per_pair
            .iter()
            .map(|((algorithm, digest_type), count)| {
                LineBuilder::zone("CountDS", zone, source)
                    .tag("algorithm", &algorithm_name(*algorithm))
                    .tag("digesttype", &digest_type_name(*digest_type))
                    .int("count", *count)
                    .build()
            })
            .collect();
        out.push_str(
            &LineBuilder::zone("CountDomSigned", zone, source)
                .int("value", summary.signed_domains as u64)
                .build(),
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tally_by_algorithm_and_digest() {
        let tally = DnssecTally::new();
        for owner in ["a.se.", "b.se.", "c.se."] {
            tally.receive(&ResourceRecord::ds(owner, 1, 8, 2)).unwrap();
        }
        tally.receive(&ResourceRecord::ds("d.se.", 2, 13, 4)).unwrap();
        tally
            .receive(&ResourceRecord::ns("e.se.", "ns.e.se."))
            .unwrap();
        tally.finalize().await.unwrap();

        assert_eq!(tally.count(8, 2), 3);
        assert_eq!(tally.count(13, 4), 1);
        assert_eq!(tally.signed_domains(), 4);
        assert_eq!(
            tally.report("se", SourceKind::File),
            "CountDS,tld=se,source=file,algorithm=RSASHA256,digesttype=SHA256 count=3i\n\
             CountDS,tld=se,source=file,algorithm=ECDSAP256SHA256,digesttype=SHA384 count=1i\n\
             CountDomSigned,tld=se,source=file value=4i\n"
        );
    }

    #[tokio::test]
    async fn test_records_counted_owners_deduplicated() {
        let tally = DnssecTally::new();
        // Key rollover: two DS records of the same kind on one delegation.
        tally.receive(&ResourceRecord::ds("a.se.", 1, 13, 2)).unwrap();
        tally.receive(&ResourceRecord::ds("a.se.", 2, 13, 2)).unwrap();
        tally.receive(&ResourceRecord::ds("a.se.", 3, 8, 2)).unwrap();
        tally.finalize().await.unwrap();

        assert_eq!(tally.count(13, 2), 2);
        assert_eq!(tally.count(8, 2), 1);
        assert_eq!(tally.signed_domains(), 1);
    }

    #[test]
    fn test_unassigned_numbers_fall_back() {
        assert_eq!(algorithm_name(13), "ECDSAP256SHA256");
        assert_eq!(algorithm_name(7), "RSASHA1-NSEC3-SHA1");
        assert_eq!(algorithm_name(15), "ED25519");
        assert_eq!(algorithm_name(99), "99");
        assert_eq!(digest_type_name(1), "SHA1");
        assert_eq!(digest_type_name(2), "SHA256");
        assert_eq!(digest_type_name(4), "SHA384");
        assert_eq!(digest_type_name(7), "7");
    }

    #[test]
    fn test_report_before_any_ds() {
        assert_eq!(
            DnssecTally::new().report("se", SourceKind::Axfr),
            "CountDomSigned,tld=se,source=axfr value=0i\n"
        );
    }
}
