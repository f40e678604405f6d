use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the records of a run came from; rendered as the `source=` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Zone file on disk
    File,
    /// Full zone transfer
    Axfr,
}

impl SourceKind {
    /// Tag value used in metrics lines
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Axfr => "axfr",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
