//! zonestats: statistics over a complete DNS zone.
//!
//! A run reads every record of one zone from a [`ZoneSource`], hands each
//! record to every registered [`Aggregator`] through the [`Dispatcher`],
//! finalizes the aggregators once the source is exhausted and ships their
//! reports to InfluxDB through an [`Emitter`].
//!
//! # Aggregators
//!
//! - `CountDom` - distinct owner names
//! - `CountRR` - records per type
//! - `CountDS` / `CountDomSigned` - DS algorithm and digest tallies
//! - `Hosts` / `Capability` - nameserver glue consistency and protocol support
//!
//! # Failure model
//!
//! Configuration, acquisition, aggregator and delivery errors abort the run.
//! Resolution and probe failures never do; they show up as hosts without
//! addresses and addresses without capabilities.

pub mod aggregator;
pub mod config;
pub mod dispatcher;
pub mod emit;
mod run;
pub mod source;

// Re-exports for convenience.
pub use aggregator::Aggregator;
pub use config::{RawConfig, RunConfig};
pub use dispatcher::{Dispatcher, RunSummary};
pub use emit::{Emission, Emitter, InfluxTarget};
pub use run::{run, RunOutcome};
pub use source::{RecordStream, ZoneSource};
pub use zonestats_core::{Result, ZoneStatsError};
