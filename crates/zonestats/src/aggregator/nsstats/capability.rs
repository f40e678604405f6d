//! Capability probe bookkeeping.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::net::IpAddr;
use zonestats_core::SourceKind;
use zonestats_resolver::CapabilityProbeResult;

use crate::emit::LineBuilder;

/// Which addresses were probed and what they answered.
#[derive(Debug, Default)]
pub struct ProbeLedger {
    claimed: Mutex<HashSet<IpAddr>>,
    results: Mutex<Vec<CapabilityProbeResult>>,
}

impl ProbeLedger {
    /// Keep the addresses nobody has claimed yet and claim them.
    pub fn claim(&self, addresses: &[IpAddr]) -> Vec<IpAddr> {
        let mut claimed = self.claimed.lock();
        addresses
            .iter()
            .copied()
            .filter(|address| claimed.insert(*address))
            .collect()
    }

    /// Append probe results
    pub fn record(&self, results: impl IntoIterator<Item = CapabilityProbeResult>) {
        self.results.lock().extend(results);
    }

    /// Results ordered by address
    #[must_use]
    pub fn results(&self) -> Vec<CapabilityProbeResult> {
        let mut results = self.results.lock().clone();
        results.sort_by_key(|result| result.address);
        results
    }

    /// One `Capability` line per probed address
    #[must_use]
    pub fn report(&self, zone: &str, source: SourceKind) -> String {
        self.results()
            .iter()
            .map(|result| capability_line(result, zone, source))
            .collect()
    }
}

fn capability_line(result: &CapabilityProbeResult, zone: &str, source: SourceKind) -> String {
    let mut line = LineBuilder::zone("Capability", zone, source)
        .tag("address", &result.address.to_string())
        .flag("edns0", result.edns0)
        .flag("cookies", result.cookies);
    if let Some(nsid) = &result.nsid {
        line = line.string("nsid", nsid);
    }
    if let Some(version) = &result.version_bind {
        line = line.string("version", version);
    }
    line.build()
}
