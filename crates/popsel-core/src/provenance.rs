//! Where a persisted artefact came from and which layout it uses.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// `major.minor.patch` layout version of a persisted document.
///
/// Readers accept any document with their own major version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SchemaVersion {
    /// Bumped when a reader of the previous layout would misread the document.
    pub major: u32,
    /// Bumped when fields are added.
    pub minor: u32,
    /// Bumped for clarifications that do not touch the layout.
    pub patch: u32,
}

impl SchemaVersion {
    /// Layout written by this build.
    pub const CURRENT: SchemaVersion = SchemaVersion::new(1, 0, 0);

    /// Builds a version triple.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Whether a reader at `self` can load a document written at `written`.
    pub fn can_read(&self, written: SchemaVersion) -> bool {
        self.major == written.major
    }
}

impl Default for SchemaVersion {
    fn default() -> Self {
        Self::CURRENT
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Inputs and tooling behind a result container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunProvenance {
    /// SHA-256 of the serialized run arguments and sampler configuration.
    pub input_hash: String,
    /// Fingerprint of the observations every cache was frozen against.
    pub observation_hash: String,
    /// Master seed of the run.
    pub seed: u64,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// Crate name to version.
    pub tool_versions: BTreeMap<String, String>,
}

impl RunProvenance {
    /// Records a tool and its version.
    pub fn with_tool(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.tool_versions.insert(name.into(), version.into());
        self
    }
}

/// Lowercase hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
