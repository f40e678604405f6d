//! Core types and errors for zonestats.
//!
//! This crate provides the foundational types shared by the zonestats crates:
//!
//! - **Types**: the [`ResourceRecord`] model every aggregator consumes, the
//!   [`SourceKind`] a record stream came from, and hostname helpers
//! - **Errors**: the run-wide [`ZoneStatsError`]
//!
//! # Example
//!
//! ```rust,ignore
//! use zonestats_core::{RecordData, ResourceRecord, Result};
//!
//! fn nameserver_of(record: &ResourceRecord) -> Option<&str> {
//!     match &record.data {
//!         RecordData::Ns { target } => Some(target),
//!         _ => None,
//!     }
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/zonestats-core/0.3.0")]

mod error;
pub mod types;

pub use error::{Result, ZoneStatsError};
pub use types::*;
