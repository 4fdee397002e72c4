use std::path::{Path, PathBuf};

use popsel_core::{load_json, store_json, JsonStyle, PopError};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;

/// Index of the files a selection run left in its run directory.
///
/// Every path is relative to the run directory so the directory can be moved
/// as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Sampler configuration in effect.
    pub config: RunConfig,
    /// Seed every stream path hangs off.
    pub master_seed: u64,
    /// Free-form label from the seed policy.
    pub seed_label: Option<String>,
    /// Observations the density caches were frozen against.
    pub observation_hash: String,
    /// Iterations finished before the run ended.
    pub iterations_completed: usize,
    /// Set when the run stopped early on request.
    pub cancelled: bool,
    /// Result container, when one was written.
    pub results_file: Option<PathBuf>,
    /// Per-iteration metrics CSV, when enabled.
    pub metrics_file: Option<PathBuf>,
    /// Checkpoints in the order they were written.
    pub checkpoints: Vec<PathBuf>,
}

impl RunManifest {
    /// Writes the manifest as indented JSON.
    pub fn write(&self, path: &Path) -> Result<(), PopError> {
        store_json("manifest", path, self, JsonStyle::Pretty)
    }

    /// Reads a manifest written by [`RunManifest::write`].
    pub fn load(path: &Path) -> Result<Self, PopError> {
        load_json("manifest", path)
    }

    /// Checkpoint paths joined onto `run_dir`, oldest first.
    pub fn checkpoint_paths(&self, run_dir: &Path) -> Vec<PathBuf> {
        self.checkpoints.iter().map(|rel| run_dir.join(rel)).collect()
    }
}

/// `path` relative to `run_dir`, or `None` when it lives elsewhere.
pub(crate) fn relative_to(run_dir: &Path, path: &Path) -> Option<PathBuf> {
    path.strip_prefix(run_dir).ok().map(Path::to_path_buf)
}
