use std::time::Duration;
use thiserror::Error;

/// Result type alias for resolver operations
pub type ResolverResult<T> = std::result::Result<T, ResolverError>;

/// Errors from the resolver subsystem
#[derive(Error, Debug)]
pub enum ResolverError {
    /// No answer within the query timeout
    #[error("query timed out after {0:?}")]
    Timeout(Duration),

    /// Message could not be encoded or decoded
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Network I/O error
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// Resolver address could not be parsed
    #[error("invalid resolver address: {0}")]
    InvalidServer(String),

    /// Resolver pool or limits are unusable
    #[error("resolver configuration error: {0}")]
    Config(String),

    /// Admission gate no longer hands out slots
    #[error("{0} admission gate closed")]
    GateClosed(&'static str),
}

impl From<hickory_proto::ProtoError> for ResolverError {
    fn from(err: hickory_proto::ProtoError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<ResolverError> for zonestats_core::ZoneStatsError {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::Network(e) => Self::Io(e),
            other => Self::Resolver(other.to_string()),
        }
    }
}
