use std::path::{Path, PathBuf};

use popsel_core::errors::ErrorInfo;
use popsel_core::{load_json, store_json, JsonStyle, PopError};
use serde::{Deserialize, Serialize};

use crate::config::RunConfig;
use crate::ensemble::EnsembleState;
use crate::history::ChainHistory;
use crate::tempering::build_ladder;

/// Everything needed to continue a run exactly where it stopped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointPayload {
    /// Completed iterations when the checkpoint was written.
    pub iteration: usize,
    /// Configuration snapshot associated with the run.
    pub config: RunConfig,
    /// Master seed used to derive every substream.
    pub master_seed: u64,
    /// Sampler state after `iteration` iterations.
    pub state: EnsembleState,
    /// Chain history up to `iteration`.
    pub history: ChainHistory,
    /// Exchange attempts per adjacent level pair.
    pub exchange_attempted: Vec<usize>,
    /// Accepted exchanges per adjacent level pair.
    pub exchange_accepted: Vec<usize>,
    /// Summed exchange acceptance probabilities per adjacent level pair.
    pub exchange_probability: Vec<f64>,
}

impl CheckpointPayload {
    /// Restores the payload from disk.
    pub fn load(path: &Path) -> Result<Self, PopError> {
        load_json("checkpoint", path)
    }

    /// Writes the payload as single-line JSON.
    pub fn store(&self, path: &Path) -> Result<(), PopError> {
        store_json("checkpoint", path, self, JsonStyle::Compact)
    }

    /// Checks that the stored state, history and tallies agree with each
    /// other, with the stored configuration and with a target of dimension `dim`.
    pub fn validate(&self, dim: usize) -> Result<(), PopError> {
        let mismatch = |what: &str, expected: usize, found: usize| {
            PopError::Serde(
                ErrorInfo::new("checkpoint-inconsistent", format!("checkpoint {what} mismatch"))
                    .with_context("expected", expected.to_string())
                    .with_context("found", found.to_string()),
            )
        };
        let ladder = build_ladder(&self.config.ladder);
        if self.state.n_levels() != ladder.len() {
            return Err(mismatch("level count", ladder.len(), self.state.n_levels()));
        }
        if self.state.temperatures() != ladder {
            return Err(PopError::Serde(
                ErrorInfo::new("checkpoint-inconsistent", "checkpoint temperature ladder mismatch")
                    .with_context("expected", format!("{ladder:?}"))
                    .with_context("found", format!("{:?}", self.state.temperatures())),
            ));
        }
        if self.history.n_levels() != ladder.len() {
            return Err(mismatch("history level count", ladder.len(), self.history.n_levels()));
        }
        for level in &self.state.levels {
            if level.walkers.len() != self.config.walkers {
                return Err(mismatch("walker count", self.config.walkers, level.walkers.len()));
            }
            if let Some(walker) = level.walkers.iter().find(|w| w.position.len() != dim) {
                return Err(mismatch("walker dimension", dim, walker.position.len()));
            }
        }
        if self.history.n_walkers() != self.config.walkers {
            return Err(mismatch("history walker count", self.config.walkers, self.history.n_walkers()));
        }
        if self.history.dim() != dim {
            return Err(mismatch("dimension", dim, self.history.dim()));
        }
        if self.history.len() != self.iteration {
            return Err(mismatch("history length", self.iteration, self.history.len()));
        }
        let pairs = ladder.len() - 1;
        for tally in [
            self.exchange_attempted.len(),
            self.exchange_accepted.len(),
            self.exchange_probability.len(),
        ] {
            if tally != pairs {
                return Err(mismatch("exchange pair count", pairs, tally));
            }
        }
        Ok(())
    }
}

/// Path of the checkpoint written after `iteration` completed iterations.
pub fn checkpoint_path(root: &Path, iteration: usize) -> PathBuf {
    root.join(format!("ckpt_{iteration:05}.json"))
}
