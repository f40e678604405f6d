//! Record fan-out to the aggregator set.

use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info};
use zonestats_core::{Result, ZoneStatsError};

use crate::aggregator::Aggregator;
use crate::source::RecordStream;

/// Counts of one dispatch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records read from the source
    pub records: usize,
    /// Record deliveries to aggregators
    pub deliveries: usize,
}

/// Delivers every record to every aggregator, then finalizes them.
///
/// Each delivery is its own task. At most `workers` deliveries are in
/// flight; reading from the source pauses while all are busy. The first
/// failed delivery or source error ends the run and the remaining tasks are
/// dropped.
pub struct Dispatcher {
    aggregators: Vec<Arc<dyn Aggregator>>,
    workers: usize,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.aggregators.iter().map(|a| a.name()).collect();
        f.debug_struct("Dispatcher")
            .field("aggregators", &names)
            .field("workers", &self.workers)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher with at most `workers` concurrent deliveries
    pub fn new(aggregators: Vec<Arc<dyn Aggregator>>, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(ZoneStatsError::Config("workers must be at least 1".into()));
        }
        Ok(Self {
            aggregators,
            workers,
        })
    }

    /// Registered aggregators
    #[must_use]
    pub fn aggregators(&self) -> &[Arc<dyn Aggregator>] {
        &self.aggregators
    }

    /// Drain `records` into the aggregators and finalize them.
    pub async fn process(&self, mut records: RecordStream) -> Result<RunSummary> {
        let permits = Arc::new(Semaphore::new(self.workers));
        let mut deliveries = JoinSet::new();
        let mut summary = RunSummary::default();

        while let Some(record) = records.next().await {
            let record = Arc::new(record?);
            summary.records += 1;

            for aggregator in &self.aggregators {
                let permit = Arc::clone(&permits)
                    .acquire_owned()
                    .await
                    .map_err(|e| ZoneStatsError::Task(e.to_string()))?;
                let aggregator = Arc::clone(aggregator);
                let record = Arc::clone(&record);
                deliveries.spawn(async move {
                    let _permit = permit;
                    aggregator.receive(&record)
                });
                summary.deliveries += 1;
            }

            // Reap what already finished so failures surface early.
            while let Some(done) = deliveries.try_join_next() {
                delivered(done)?;
            }
        }

        while let Some(done) = deliveries.join_next().await {
            delivered(done)?;
        }
        info!(
            records = summary.records,
            deliveries = summary.deliveries,
            "all records delivered"
        );

        for aggregator in &self.aggregators {
            aggregator.finalize().await?;
            debug!(aggregator = aggregator.name(), "finalized");
        }

        Ok(summary)
    }
}

fn delivered(done: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    done.map_err(|e| ZoneStatsError::Task(format!("record delivery: {e}")))?
}
