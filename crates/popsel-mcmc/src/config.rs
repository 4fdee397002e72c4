use std::fs;
use std::path::{Path, PathBuf};

use popsel_core::errors::{ConfigurationError, ErrorInfo};
use popsel_core::PopError;
use serde::{Deserialize, Serialize};

/// Sampler settings, usually read from a YAML file.
///
/// Every key is optional. Command line arguments are applied on top by
/// [`RunArgs::apply_to`](crate::args::RunArgs::apply_to).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Iterations per level, burn-in included.
    pub iterations: usize,
    /// Leading iterations the decoder drops.
    pub burn_in: usize,
    /// Walkers per level; even and at least twice the dimension.
    pub walkers: usize,
    /// Temperature ladder.
    pub ladder: LadderConfig,
    /// Exchanges are attempted after every `swap_interval`-th iteration.
    pub swap_interval: usize,
    /// Stretch-move scale `a`.
    pub stretch_scale: f64,
    /// Every `metrics_thinning`-th iteration gets a metrics row.
    pub metrics_thinning: usize,
    /// Snapshot schedule.
    pub checkpoint: CheckpointConfig,
    /// Master seed and its label.
    pub seed_policy: SeedPolicy,
    /// Where artefacts go.
    pub output: OutputConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: 1000,
            burn_in: 500,
            walkers: 32,
            ladder: LadderConfig::default(),
            swap_interval: 1,
            stretch_scale: 2.0,
            metrics_thinning: 1,
            checkpoint: CheckpointConfig::default(),
            seed_policy: SeedPolicy::default(),
            output: OutputConfig::default(),
        }
    }
}

impl RunConfig {
    /// Reads a YAML configuration; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, PopError> {
        let failure = |code: &str, err: &dyn std::fmt::Display| {
            PopError::Serde(
                ErrorInfo::new(code, err.to_string()).with_context("path", path.display().to_string()),
            )
        };
        let contents = fs::read_to_string(path).map_err(|err| failure("config-read", &err))?;
        serde_yaml::from_str(&contents).map_err(|err| failure("config-parse", &err))
    }

    /// Checks every sampler setting against a target of dimension `dim`.
    ///
    /// Runs before any sampling work is scheduled.
    pub fn validate(&self, dim: usize) -> Result<(), ConfigurationError> {
        if self.iterations == 0 {
            return Err(ConfigurationError::invalid(
                "iterations",
                "at least one iteration is required",
            ));
        }
        if self.burn_in >= self.iterations {
            return Err(ConfigurationError::invalid(
                "burn-in",
                format!(
                    "burn-in ({}) must be smaller than the iteration count ({})",
                    self.burn_in, self.iterations
                ),
            ));
        }
        if self.walkers < 4 || self.walkers % 2 != 0 {
            return Err(ConfigurationError::invalid(
                "walkers",
                format!("walker count must be even and at least 4, got {}", self.walkers),
            ));
        }
        if self.walkers < 2 * dim {
            return Err(ConfigurationError::invalid(
                "walkers",
                format!(
                    "walker count ({}) must be at least twice the parameter dimension ({dim})",
                    self.walkers
                ),
            ));
        }
        if self.swap_interval == 0 {
            return Err(ConfigurationError::invalid("swap-interval", "must be positive"));
        }
        if !(self.stretch_scale.is_finite() && self.stretch_scale > 1.0) {
            return Err(ConfigurationError::invalid(
                "stretch-scale",
                format!("must be greater than 1, got {}", self.stretch_scale),
            ));
        }
        if self.metrics_thinning == 0 {
            return Err(ConfigurationError::invalid("metrics-thinning", "must be positive"));
        }
        if self.checkpoint.max_to_keep == 0 {
            return Err(ConfigurationError::invalid(
                "checkpoint.max-to-keep",
                "must retain at least one checkpoint",
            ));
        }
        self.ladder.validate()
    }
}

/// How many tempered levels to run and how hot they get.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderConfig {
    /// Level count for a geometric ladder; a manual ladder brings its own.
    pub levels: usize,
    /// Spacing of the levels.
    pub policy: LadderPolicy,
}

impl Default for LadderConfig {
    fn default() -> Self {
        Self {
            levels: 4,
            policy: LadderPolicy::default(),
        }
    }
}

impl LadderConfig {
    fn validate(&self) -> Result<(), ConfigurationError> {
        match &self.policy {
            LadderPolicy::Geometric { ratio } => {
                if self.levels == 0 {
                    return Err(ConfigurationError::invalid(
                        "temps",
                        "at least one temperature level is required",
                    ));
                }
                if !(ratio.is_finite() && *ratio > 1.0) {
                    return Err(ConfigurationError::invalid(
                        "ladder.ratio",
                        format!("geometric ratio must exceed 1, got {ratio}"),
                    ));
                }
            }
            LadderPolicy::Manual { temperatures } => {
                if temperatures.first() != Some(&1.0) {
                    return Err(ConfigurationError::invalid(
                        "ladder.temperatures",
                        "manual ladders must start at temperature 1.0",
                    ));
                }
                let increasing = temperatures
                    .windows(2)
                    .all(|pair| pair[1].is_finite() && pair[1] > pair[0]);
                if !increasing {
                    return Err(ConfigurationError::invalid(
                        "ladder.temperatures",
                        "temperatures must be finite and strictly increasing",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Temperature spacing above the cold level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LadderPolicy {
    /// `T_k = ratio^k`.
    Geometric {
        /// Spacing between neighbouring levels; above 1.
        #[serde(default = "LadderPolicy::default_ratio")]
        ratio: f64,
    },
    /// Fixed temperatures, coldest first, starting at exactly 1.
    Manual {
        /// One entry per level.
        temperatures: Vec<f64>,
    },
}

impl LadderPolicy {
    fn default_ratio() -> f64 {
        2.0
    }
}

impl Default for LadderPolicy {
    fn default() -> Self {
        LadderPolicy::Geometric {
            ratio: Self::default_ratio(),
        }
    }
}

/// Periodic snapshots of the full sampler state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Completed iterations between snapshots; 0 turns them off.
    pub interval: usize,
    /// Older snapshots beyond this count are deleted.
    pub max_to_keep: usize,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            interval: 0,
            max_to_keep: 4,
        }
    }
}

/// Master seed of a run. The `--seed` argument overwrites it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedPolicy {
    /// Root of every derived stream.
    pub master_seed: u64,
    /// Copied into the manifest verbatim.
    pub label: Option<String>,
}

/// File names inside the run directory.
///
/// Nothing is written when `run_directory` is unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Created on demand.
    pub run_directory: Option<PathBuf>,
    /// Per-iteration level metrics (CSV).
    pub metrics_file: PathBuf,
    /// [`RunManifest`](crate::manifest::RunManifest) location.
    pub manifest_file: PathBuf,
    /// [`ResultContainer`](crate::output::ResultContainer) location.
    pub results_file: PathBuf,
    /// Checkpoints land in this subdirectory.
    pub checkpoint_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            run_directory: None,
            metrics_file: "metrics.csv".into(),
            manifest_file: "manifest.json".into(),
            results_file: "results.json".into(),
            checkpoint_dir: "checkpoints".into(),
        }
    }
}
