use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ensemble::EnsembleState;

/// Per-level metrics row recorded during a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSample {
    /// Completed iteration count when the row was recorded.
    pub iteration: usize,
    /// Level index within the ladder.
    pub level: usize,
    /// Temperature of the level.
    pub temperature: f64,
    /// Cumulative stretch-move acceptance rate of the level.
    pub acceptance_rate: f64,
    /// Mean finite log-posterior across the walkers.
    #[serde(with = "crate::serde_log")]
    pub mean_log_posterior: f64,
    /// Largest log-posterior across the walkers.
    #[serde(with = "crate::serde_log")]
    pub max_log_posterior: f64,
}

/// Collects metrics rows for CSV export.
#[derive(Debug, Default)]
pub struct MetricsRecorder {
    samples: Vec<MetricSample>,
}

impl MetricsRecorder {
    /// Creates a new recorder instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one row per level of `state`.
    pub fn record(&mut self, iteration: usize, state: &EnsembleState) {
        for (level_index, level) in state.levels.iter().enumerate() {
            self.samples.push(MetricSample {
                iteration,
                level: level_index,
                temperature: level.temperature,
                acceptance_rate: level.acceptance_rate(),
                mean_log_posterior: level.mean_log_posterior(),
                max_log_posterior: level.max_log_posterior(),
            });
        }
    }

    /// Returns an immutable view over the recorded samples.
    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    /// Writes the recorded samples to a CSV file.
    pub fn write_csv(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;
        writeln!(
            file,
            "iteration,level,temperature,acceptance_rate,mean_log_posterior,max_log_posterior"
        )?;
        for sample in &self.samples {
            writeln!(
                file,
                "{},{},{:.6},{:.6},{:.6},{:.6}",
                sample.iteration,
                sample.level,
                sample.temperature,
                sample.acceptance_rate,
                sample.mean_log_posterior,
                sample.max_log_posterior
            )?;
        }
        Ok(())
    }
}
