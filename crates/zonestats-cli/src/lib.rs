//! # zonestats-cli
//!
//! Command-line front end of the zonestats pipeline.
//!
//! ## Configuration
//!
//! Settings are read, later sources winning, from:
//!
//! - `$HOME/.zonestats`
//! - `./.zonestats`
//! - the file given with `--conf`
//! - command-line flags and `ZONESTATS_*` environment variables
//!
//! All files are YAML with the keys of [`zonestats::RawConfig`].

pub mod cli;
pub mod config;
pub mod logging;

pub use cli::run;
