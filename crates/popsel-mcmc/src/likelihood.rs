use std::sync::Arc;

use popsel_core::{PopError, RngHandle};

use crate::cache::FrozenEvaluation;
use crate::prior::MixturePrior;

/// Target density driven by the ensemble sampler.
pub trait LogDensity: Send + Sync {
    /// Length of the parameter vector.
    fn dim(&self) -> usize;

    /// Unnormalised log density; `-inf` outside the support, never NaN.
    fn log_density(&self, x: &[f64]) -> f64;

    /// Draws a starting position for a walker.
    fn initial_point(&self, rng: &mut RngHandle) -> Result<Vec<f64>, PopError>;
}

/// Joint log-posterior over `(model index, branching fractions)`.
///
/// Closes over the frozen log-density table, so every call is one
/// log-sum-exp of `ln β_c + ln p_c` per observation. The table is shared
/// read-only across all concurrent evaluations.
#[derive(Debug, Clone)]
pub struct MixtureLikelihood {
    prior: MixturePrior,
    frozen: Arc<FrozenEvaluation>,
}

impl MixtureLikelihood {
    /// Builds the likelihood from a prior and a frozen table.
    pub fn new(prior: MixturePrior, frozen: Arc<FrozenEvaluation>) -> Self {
        Self { prior, frozen }
    }

    /// The prior component.
    pub fn prior(&self) -> &MixturePrior {
        &self.prior
    }

    /// The frozen density table.
    pub fn frozen(&self) -> &FrozenEvaluation {
        &self.frozen
    }

    /// Log prior of `x`.
    pub fn log_prior(&self, x: &[f64]) -> f64 {
        self.prior.log_prior(x)
    }

    /// Data log-likelihood plus log prior.
    ///
    /// Returns the prior unchanged when it is not finite. A mixture density
    /// that is zero, negative or non-finite for any observation yields `-inf`.
    pub fn log_likelihood(&self, x: &[f64]) -> f64 {
        let log_prior = self.prior.log_prior(x);
        if !log_prior.is_finite() {
            return log_prior;
        }
        let Some(model) = self.prior.model_index(x) else {
            return f64::NEG_INFINITY;
        };
        let log_betas: Vec<f64> = self.prior.complete_betas(x).iter().map(|b| b.ln()).collect();
        let rows = self.frozen.model_rows(model.0);
        let mut total = 0.0;
        for log_densities in rows.chunks_exact(log_betas.len()) {
            let log_mixture = log_sum_exp(log_betas.iter().zip(log_densities).map(|(b, d)| b + d));
            if !log_mixture.is_finite() {
                return f64::NEG_INFINITY;
            }
            total += log_mixture;
        }
        total + log_prior
    }
}

/// `ln Σ exp(t)`; `-inf` when every term is `-inf`.
fn log_sum_exp(terms: impl Iterator<Item = f64> + Clone) -> f64 {
    let max = terms.clone().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return max;
    }
    max + terms.map(|t| (t - max).exp()).sum::<f64>().ln()
}

impl LogDensity for MixtureLikelihood {
    fn dim(&self) -> usize {
        self.prior.dim()
    }

    fn log_density(&self, x: &[f64]) -> f64 {
        self.log_likelihood(x)
    }

    fn initial_point(&self, rng: &mut RngHandle) -> Result<Vec<f64>, PopError> {
        self.prior.sample(rng)
    }
}
