//! Discovered, not-yet-instantiated plugins

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Where a candidate was found
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceLocation {
    /// A whole file or directory
    Path {
        /// Resource path
        path: PathBuf,
    },

    /// A byte range inside a file (e.g. one entry of an archive)
    Range {
        /// Containing file
        path: PathBuf,
        /// First byte
        start: u64,
        /// One past the last byte
        end: u64,
    },
}

impl SourceLocation {
    /// A whole-resource location
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path { path: path.into() }
    }

    /// A byte range inside a resource
    pub fn range(path: impl Into<PathBuf>, start: u64, end: u64) -> Self {
        Self::Range {
            path: path.into(),
            start,
            end,
        }
    }

    /// The file this location points into
    pub fn file(&self) -> &Path {
        match self {
            Self::Path { path } | Self::Range { path, .. } => path,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path { path } => write!(f, "{}", path.display()),
            Self::Range { path, start, end } => {
                write!(f, "{}[{}..{}]", path.display(), start, end)
            }
        }
    }
}

/// Descriptor of one discovered plugin.
///
/// Pure data produced without running plugin code. Immutable once created;
/// the metadata is dialect-specific and opaque to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    id: String,
    dialect: String,
    source: SourceLocation,
    #[serde(default)]
    metadata: Value,
}

impl Candidate {
    /// Create a candidate without metadata
    pub fn new(id: impl Into<String>, dialect: impl Into<String>, source: SourceLocation) -> Self {
        Self {
            id: id.into(),
            dialect: dialect.into(),
            source,
            metadata: Value::Null,
        }
    }

    /// Attach dialect-specific metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Identity, unique within one discovery pass of one service
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Name of the language service that produced this candidate
    pub fn dialect(&self) -> &str {
        &self.dialect
    }

    /// Where the candidate was found
    pub fn source(&self) -> &SourceLocation {
        &self.source
    }

    /// Raw dialect-specific metadata
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }
}
