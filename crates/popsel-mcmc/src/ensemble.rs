use std::ops::Range;

use popsel_core::errors::{ConfigurationError, ErrorInfo};
use popsel_core::{PopError, RngHandle};
use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::determinism;
use crate::likelihood::LogDensity;

/// Affine-invariant stretch move of Goodman & Weare (2010).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StretchMove {
    a: f64,
}

impl Default for StretchMove {
    fn default() -> Self {
        Self { a: 2.0 }
    }
}

impl StretchMove {
    /// Creates a stretch move with scale `a > 1`.
    pub fn new(a: f64) -> Result<Self, ConfigurationError> {
        if !(a.is_finite() && a > 1.0) {
            return Err(ConfigurationError::invalid(
                "stretch-scale",
                format!("must be greater than 1, got {a}"),
            ));
        }
        Ok(Self { a })
    }

    /// Scale parameter.
    pub fn scale(&self) -> f64 {
        self.a
    }

    /// Draws `z` from `g(z) ∝ 1/sqrt(z)` on `[1/a, a]`.
    pub fn sample_z(&self, rng: &mut RngHandle) -> f64 {
        let u = rng.uniform();
        ((self.a - 1.0) * u + 1.0).powi(2) / self.a
    }

    /// Proposes `c + z (x - c)` with `c` drawn uniformly from `complement`.
    pub fn propose(
        &self,
        rng: &mut RngHandle,
        current: &[f64],
        complement: &[Walker],
    ) -> (Vec<f64>, f64) {
        let z = self.sample_z(rng);
        let partner = &complement[rng.gen_range(0..complement.len())].position;
        let proposal = partner
            .iter()
            .zip(current)
            .map(|(c, x)| c + z * (x - c))
            .collect();
        (proposal, z)
    }

    /// Tempered acceptance probability `min(1, z^(dim-1) exp(beta (L' - L)))`.
    ///
    /// A non-finite proposal is always rejected; a finite proposal from a
    /// walker stuck at `-inf` is always accepted.
    pub fn acceptance_probability(
        &self,
        z: f64,
        dim: usize,
        inverse_temperature: f64,
        log_old: f64,
        log_new: f64,
    ) -> f64 {
        if !log_new.is_finite() {
            return 0.0;
        }
        if !log_old.is_finite() {
            return 1.0;
        }
        let log_ratio = (dim as f64 - 1.0) * z.ln() + inverse_temperature * (log_new - log_old);
        log_ratio.min(0.0).exp()
    }
}

/// Position and untempered log-posterior of one walker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Walker {
    /// Parameter vector.
    pub position: Vec<f64>,
    /// Log-posterior at `position`.
    #[serde(with = "crate::serde_log")]
    pub log_posterior: f64,
}

/// Walkers of one temperature level plus their acceptance counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Temperature `T`; the density is tempered by `1/T`.
    pub temperature: f64,
    /// Walkers in index order.
    pub walkers: Vec<Walker>,
    /// Accepted stretch proposals so far.
    pub accepted: usize,
    /// Issued stretch proposals so far.
    pub proposed: usize,
}

impl Level {
    /// Inverse temperature applied to the log-posterior.
    pub fn inverse_temperature(&self) -> f64 {
        1.0 / self.temperature
    }

    /// Fraction of accepted proposals, 0 before the first update.
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }

    /// Mean log-posterior over walkers with a finite value.
    pub fn mean_log_posterior(&self) -> f64 {
        let finite: Vec<f64> = self
            .walkers
            .iter()
            .map(|w| w.log_posterior)
            .filter(|v| v.is_finite())
            .collect();
        if finite.is_empty() {
            f64::NEG_INFINITY
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        }
    }

    /// Largest log-posterior across the walkers.
    pub fn max_log_posterior(&self) -> f64 {
        self.walkers
            .iter()
            .map(|w| w.log_posterior)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

/// Every temperature level of the sampler, coldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleState {
    /// Levels ordered by increasing temperature.
    pub levels: Vec<Level>,
}

impl EnsembleState {
    /// Draws `walkers` starting points per level from `target`.
    ///
    /// Each level uses its own substream of `seed`; log-posteriors of the
    /// drawn points are evaluated in parallel.
    pub fn initialize<T: LogDensity + ?Sized>(
        target: &T,
        temperatures: &[f64],
        walkers: usize,
        seed: u64,
    ) -> Result<Self, PopError> {
        let mut levels = Vec::with_capacity(temperatures.len());
        for (index, &temperature) in temperatures.iter().enumerate() {
            let mut rng = RngHandle::from_seed(determinism::init_seed(seed, index));
            let positions = (0..walkers)
                .map(|_| target.initial_point(&mut rng))
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(bad) = positions.iter().find(|p| p.len() != target.dim()) {
                return Err(PopError::Sampler(
                    ErrorInfo::new("init-dimension", "initial point has the wrong dimension")
                        .with_context("expected", target.dim().to_string())
                        .with_context("found", bad.len().to_string()),
                ));
            }
            let log_posteriors: Vec<f64> = positions
                .par_iter()
                .map(|p| evaluate(target, p))
                .collect();
            levels.push(Level {
                temperature,
                walkers: positions
                    .into_iter()
                    .zip(log_posteriors)
                    .map(|(position, log_posterior)| Walker {
                        position,
                        log_posterior,
                    })
                    .collect(),
                accepted: 0,
                proposed: 0,
            });
        }
        Ok(Self { levels })
    }

    /// Number of temperature levels.
    pub fn n_levels(&self) -> usize {
        self.levels.len()
    }

    /// Walkers per level.
    pub fn n_walkers(&self) -> usize {
        self.levels.first().map_or(0, |level| level.walkers.len())
    }

    /// The `T = 1` level.
    pub fn cold(&self) -> &Level {
        &self.levels[0]
    }

    /// Temperatures in level order.
    pub fn temperatures(&self) -> Vec<f64> {
        self.levels.iter().map(|level| level.temperature).collect()
    }
}

/// Advances every walker of `level` by one stretch move.
///
/// The first half moves against the second, then the second against the
/// updated first half.
pub fn update_level<T: LogDensity + ?Sized>(
    target: &T,
    stretch: &StretchMove,
    level: &mut Level,
    rng: &mut RngHandle,
) {
    let n = level.walkers.len();
    let half = n / 2;
    update_half(target, stretch, level, 0..half, half..n, rng);
    update_half(target, stretch, level, half..n, 0..half, rng);
}

fn update_half<T: LogDensity + ?Sized>(
    target: &T,
    stretch: &StretchMove,
    level: &mut Level,
    active: Range<usize>,
    complement: Range<usize>,
    rng: &mut RngHandle,
) {
    let proposals: Vec<(Vec<f64>, f64)> = active
        .clone()
        .map(|i| {
            stretch.propose(
                rng,
                &level.walkers[i].position,
                &level.walkers[complement.clone()],
            )
        })
        .collect();

    let log_posteriors: Vec<f64> = proposals
        .par_iter()
        .map(|(position, _)| evaluate(target, position))
        .collect();

    let dim = target.dim();
    let inverse_temperature = level.inverse_temperature();
    for (index, ((position, z), log_new)) in active.zip(proposals.into_iter().zip(log_posteriors)) {
        let walker = &mut level.walkers[index];
        let probability =
            stretch.acceptance_probability(z, dim, inverse_temperature, walker.log_posterior, log_new);
        level.proposed += 1;
        if rng.uniform() < probability {
            *walker = Walker {
                position,
                log_posterior: log_new,
            };
            level.accepted += 1;
        }
    }
}

fn evaluate<T: LogDensity + ?Sized>(target: &T, x: &[f64]) -> f64 {
    let value = target.log_density(x);
    if value.is_nan() {
        f64::NEG_INFINITY
    } else {
        value
    }
}
