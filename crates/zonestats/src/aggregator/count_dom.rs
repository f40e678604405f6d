use parking_lot::Mutex;
use std::collections::HashSet;
use zonestats_core::{ResourceRecord, Result, SourceKind};

use super::Aggregator;
use crate::emit::LineBuilder;

/// Counts distinct owner names.
#[derive(Debug, Default)]
pub struct CountDom {
    owners: Mutex<HashSet<String>>,
}

impl CountDom {
    /// Create an empty counter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct owner names seen so far
    #[must_use]
    pub fn count(&self) -> usize {
        self.owners.lock().len()
    }
}

impl Aggregator for CountDom {
    fn name(&self) -> &'static str {
        "CountDom"
    }

    fn receive(&self, record: &ResourceRecord) -> Result<()> {
        let mut owners = self.owners.lock();
        if !owners.contains(&record.owner) {
            owners.insert(record.owner.clone());
        }
        Ok(())
    }

    fn report(&self, zone: &str, source: SourceKind) -> String {
        LineBuilder::zone("CountDom", zone, source)
            .int("value", self.count() as u64)
            .build()
    }
}
