//! JSON artefact files.
//!
//! Every persisted document (manifest, checkpoint, result container, model
//! and observation inputs) goes through these two functions. Failures are
//! `PopError::Serde` with codes `<kind>-read`, `<kind>-parse`, `<kind>-mkdir`,
//! `<kind>-serialize` and `<kind>-write`, each carrying the offending path.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::{ErrorInfo, PopError};

/// Output layout of [`store_json`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStyle {
    /// Single line; used for large machine-only files.
    Compact,
    /// Indented; used for documents people open.
    Pretty,
}

fn failure(kind: &str, step: &str, err: impl ToString, path: &Path) -> PopError {
    PopError::Serde(
        ErrorInfo::new(format!("{kind}-{step}"), err.to_string())
            .with_context("path", path.display().to_string()),
    )
}

/// Reads and parses a JSON document of artefact `kind`.
pub fn load_json<T: DeserializeOwned>(kind: &str, path: &Path) -> Result<T, PopError> {
    let contents = fs::read_to_string(path).map_err(|err| failure(kind, "read", err, path))?;
    serde_json::from_str(&contents).map_err(|err| failure(kind, "parse", err, path))
}

/// Serializes `value` to `path`, creating parent directories as needed.
pub fn store_json<T: Serialize + ?Sized>(
    kind: &str,
    path: &Path,
    value: &T,
    style: JsonStyle,
) -> Result<(), PopError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|err| failure(kind, "mkdir", err, parent))?;
    }
    let json = match style {
        JsonStyle::Compact => serde_json::to_string(value),
        JsonStyle::Pretty => serde_json::to_string_pretty(value),
    }
    .map_err(|err| failure(kind, "serialize", err, path))?;
    fs::write(path, json).map_err(|err| failure(kind, "write", err, path))
}
