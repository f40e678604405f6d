use thiserror::Error;

/// Result type alias for zonestats operations
pub type Result<T> = std::result::Result<T, ZoneStatsError>;

/// Errors that abort a zonestats run
///
/// Resolution and probe failures never show up here: they are recorded as
/// "no answer" by the resolver crate and only surface as counters.
#[derive(Error, Debug)]
pub enum ZoneStatsError {
    /// Missing or contradictory settings
    #[error("configuration error: {0}")]
    Config(String),

    /// Zone file could not be read or parsed
    #[error("zone file error: {0}")]
    ZoneFile(String),

    /// Zone transfer failed or returned malformed data
    #[error("zone transfer failed: {0}")]
    Transfer(String),

    /// A record carried a type code with no known mnemonic
    #[error("unknown record type {code} at {owner}")]
    UnknownRecordType {
        /// Owner name of the offending record
        owner: String,
        /// Raw type code
        code: u16,
    },

    /// Record data could not be decoded
    #[error("malformed {rtype} record at {owner}: {reason}")]
    MalformedRecord {
        /// Owner name of the offending record
        owner: String,
        /// Record type mnemonic
        rtype: String,
        /// What was wrong with it
        reason: String,
    },

    /// DNS resolver setup failed
    #[error("resolver error: {0}")]
    Resolver(String),

    /// Metrics could not be delivered
    #[error("metrics delivery failed: {0}")]
    Delivery(String),

    /// A spawned task panicked or was cancelled
    #[error("task failed: {0}")]
    Task(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZoneStatsError {
    /// Returns true if the error was raised before any record was read
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Resolver(_))
    }

    /// Returns true if the error comes from reading the zone
    #[must_use]
    pub const fn is_acquisition_error(&self) -> bool {
        matches!(self, Self::ZoneFile(_) | Self::Transfer(_))
    }
}
