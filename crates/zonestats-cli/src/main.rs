//! zonestats - DNS zone statistics
//!
//! Reads a zone by transfer or from a file and writes its statistics to
//! InfluxDB.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    zonestats_cli::run().await
}
