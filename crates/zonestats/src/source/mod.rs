//! Record sources.
//!
//! A source yields every record of one zone exactly once, in no particular
//! order. An error item ends the stream and aborts the run: statistics over
//! half a zone are worse than none.

mod axfr;
mod zonefile;

use futures_util::stream::BoxStream;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::info;
use zonestats_core::{ResourceRecord, Result, SourceKind};

pub use zonefile::parse_zone;

/// Single-pass stream of zone records
pub type RecordStream = BoxStream<'static, Result<ResourceRecord>>;

/// Where the zone is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneSource {
    /// Zone file on disk, `origin` is the default `$ORIGIN`
    File {
        /// Zone file path
        path: PathBuf,
        /// Zone name
        origin: String,
    },
    /// Full zone transfer over TCP
    Axfr {
        /// Primary or transfer server
        server: IpAddr,
        /// Server port
        port: u16,
        /// Zone name
        zone: String,
    },
}

impl ZoneSource {
    /// Source kind, reported as the `source` tag
    #[must_use]
    pub const fn kind(&self) -> SourceKind {
        match self {
            Self::File { .. } => SourceKind::File,
            Self::Axfr { .. } => SourceKind::Axfr,
        }
    }

    /// Open the source and stream its records.
    ///
    /// Failing to open the source is reported here; failures while reading
    /// arrive as the last item of the stream.
    pub async fn records(&self) -> Result<RecordStream> {
        info!(source = %self, "opening record source");
        match self {
            Self::File { path, origin } => zonefile::read(path.clone(), origin.clone()).await,
            Self::Axfr { server, port, zone } => {
                axfr::transfer(SocketAddr::new(*server, *port), zone.clone()).await
            }
        }
    }
}

impl fmt::Display for ZoneSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File { path, origin } => write!(f, "file {} ({origin})", path.display()),
            Self::Axfr { server, port, zone } => {
                write!(f, "axfr {zone} from {}", SocketAddr::new(*server, *port))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind() {
        let file = ZoneSource::File {
            path: PathBuf::from("se.zone"),
            origin: "se".into(),
        };
        let axfr = ZoneSource::Axfr {
            server: "2001:db8::53".parse().unwrap(),
            port: 53,
            zone: "se".into(),
        };
        assert_eq!(file.kind(), SourceKind::File);
        assert_eq!(axfr.kind(), SourceKind::Axfr);
        assert_eq!(axfr.to_string(), "axfr se from [2001:db8::53]:53");
    }
}
