use parking_lot::Mutex;
use std::collections::BTreeMap;
use zonestats_core::{ResourceRecord, Result, SourceKind, ZoneStatsError};

use super::Aggregator;
use crate::emit::LineBuilder;

/// Counts records per type mnemonic.
///
/// A type code without a mnemonic means the record decoder produced
/// something it should not have, so it fails the run.
#[derive(Debug, Default)]
pub struct CountRr {
    counts: Mutex<BTreeMap<String, u64>>,
}

impl CountRr {
    /// Create an empty counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records of type `name` seen so far
    #[must_use]
    pub fn count(&self, name: &str) -> u64 {
        self.counts.lock().get(name).copied().unwrap_or(0)
    }
}

impl Aggregator for CountRr {
    fn name(&self) -> &'static str {
        "CountRR"
    }

    fn receive(&self, record: &ResourceRecord) -> Result<()> {
        let name = record
            .type_name()
            .ok_or_else(|| ZoneStatsError::UnknownRecordType {
                owner: record.owner.clone(),
                code: u16::from(record.record_type),
            })?;

        *self.counts.lock().entry(name).or_insert(0) += 1;
        Ok(())
    }

    fn report(&self, zone: &str, source: SourceKind) -> String {
        let counts = self.counts.lock();
        let line = counts
            .iter()
            .fold(LineBuilder::zone("CountRR", zone, source), |line, (name, count)| {
                line.int(name, *count)
            });

        if line.has_fields() {
            line.build()
        } else {
            String::new()
        }
    }
}
