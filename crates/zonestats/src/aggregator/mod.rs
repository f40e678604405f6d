//! Aggregators: independent consumers of the record stream.
//!
//! The dispatcher calls [`Aggregator::receive`] concurrently from many tasks
//! and in no particular order, then [`Aggregator::finalize`] exactly once,
//! then [`Aggregator::report`]. Each aggregator guards its own state; none
//! looks at another.

mod count_dom;
mod count_rr;
mod dnssec;
pub mod nsstats;

use async_trait::async_trait;
use std::sync::Arc;
use zonestats_core::{ResourceRecord, Result, SourceKind};
use zonestats_resolver::Resolver;

pub use count_dom::CountDom;
pub use count_rr::CountRr;
pub use dnssec::{algorithm_name, digest_type_name, DnssecTally};
pub use nsstats::NsStats;

/// A stateful consumer of zone records.
#[async_trait]
pub trait Aggregator: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Take one record into account. Safe to call concurrently.
    fn receive(&self, record: &ResourceRecord) -> Result<()>;

    /// Compute statistics that need the whole zone. Called once, after
    /// every `receive` has returned.
    async fn finalize(&self) -> Result<()> {
        Ok(())
    }

    /// Line protocol text for this aggregator, empty when there is nothing
    /// to report.
    fn report(&self, zone: &str, source: SourceKind) -> String;
}

/// The full aggregator set of a run.
#[must_use]
pub fn standard_set(zone: &str, resolver: Resolver, probe: bool) -> Vec<Arc<dyn Aggregator>> {
    vec![
        Arc::new(CountDom::new()),
        Arc::new(CountRr::new()),
        Arc::new(DnssecTally::new()),
        Arc::new(NsStats::new(zone, resolver, probe)),
    ]
}
