use serde::{Deserialize, Serialize};

use crate::ensemble::EnsembleState;

/// Recorded positions and log-posteriors, one snapshot per completed iteration.
///
/// Storage is iteration-major: a snapshot holds every level, every walker of
/// that level and then the `dim` coordinates of the walker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainHistory {
    n_levels: usize,
    n_walkers: usize,
    dim: usize,
    iterations: usize,
    positions: Vec<f64>,
    #[serde(with = "crate::serde_log::vec")]
    log_posteriors: Vec<f64>,
}

impl ChainHistory {
    /// Empty history for the given ensemble shape.
    pub fn new(n_levels: usize, n_walkers: usize, dim: usize) -> Self {
        Self {
            n_levels,
            n_walkers,
            dim,
            iterations: 0,
            positions: Vec::new(),
            log_posteriors: Vec::new(),
        }
    }

    /// Empty history with room for `iterations` snapshots.
    pub fn with_capacity(n_levels: usize, n_walkers: usize, dim: usize, iterations: usize) -> Self {
        let mut history = Self::new(n_levels, n_walkers, dim);
        let per_iteration = n_levels * n_walkers;
        history.positions.reserve(per_iteration * dim * iterations);
        history.log_posteriors.reserve(per_iteration * iterations);
        history
    }

    /// Appends a snapshot of `state`.
    ///
    /// # Panics
    ///
    /// If `state` does not have the shape the history was created with.
    pub fn push(&mut self, state: &EnsembleState) {
        assert_eq!(state.n_levels(), self.n_levels, "level count changed mid-run");
        for level in &state.levels {
            assert_eq!(level.walkers.len(), self.n_walkers, "walker count changed mid-run");
            for walker in &level.walkers {
                self.positions.extend_from_slice(&walker.position);
                self.log_posteriors.push(walker.log_posterior);
            }
        }
        self.iterations += 1;
    }

    /// Drops every snapshot after the first `iterations`.
    pub fn truncate(&mut self, iterations: usize) {
        if iterations >= self.iterations {
            return;
        }
        self.iterations = iterations;
        self.log_posteriors.truncate(iterations * self.n_levels * self.n_walkers);
        self.positions
            .truncate(iterations * self.n_levels * self.n_walkers * self.dim);
    }

    /// Number of recorded iterations.
    pub fn len(&self) -> usize {
        self.iterations
    }

    /// Whether no iteration has been recorded.
    pub fn is_empty(&self) -> bool {
        self.iterations == 0
    }

    /// Number of temperature levels.
    pub fn n_levels(&self) -> usize {
        self.n_levels
    }

    /// Walkers per level.
    pub fn n_walkers(&self) -> usize {
        self.n_walkers
    }

    /// Parameter dimension.
    pub fn dim(&self) -> usize {
        self.dim
    }

    fn slot(&self, iteration: usize, level: usize, walker: usize) -> usize {
        (iteration * self.n_levels + level) * self.n_walkers + walker
    }

    /// Position of `walker` at `level` after `iteration + 1` iterations.
    pub fn position(&self, iteration: usize, level: usize, walker: usize) -> &[f64] {
        let start = self.slot(iteration, level, walker) * self.dim;
        &self.positions[start..start + self.dim]
    }

    /// Log-posterior matching [`ChainHistory::position`].
    pub fn log_posterior(&self, iteration: usize, level: usize, walker: usize) -> f64 {
        self.log_posteriors[self.slot(iteration, level, walker)]
    }
}
