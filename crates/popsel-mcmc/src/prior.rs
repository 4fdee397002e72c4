use popsel_core::errors::ErrorInfo;
use popsel_core::{PopError, RngHandle};
use rand_distr::{Dirichlet, Distribution};
use serde::{Deserialize, Serialize};

const MAX_INIT_ATTEMPTS: usize = 64;

/// Discrete population-model index decoded from `floor(x[0])`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelIndex(pub usize);

/// Complete branching-fraction vector, one entry per channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetaVector(Vec<f64>);

impl BetaVector {
    /// Fractions in channel order.
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Tagged view of a parameter vector that lies inside the prior support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixturePoint {
    /// Selected model.
    pub model: ModelIndex,
    /// All `C` branching fractions, the implied last one included.
    pub betas: BetaVector,
}

/// Joint prior over the model index and the branching-fraction simplex.
///
/// The parameter vector is `[x0, beta_1, .., beta_{C-1}]`: `floor(x0)` picks
/// the model and the last fraction is the complement of the others. Inside
/// the support the density is the flat Dirichlet over the `C`-simplex, `ln Γ(C)`,
/// which does not depend on the model index.
///
/// The floor encoding is not symmetric across models: models `0` and `M - 1`
/// border the support wall (`x0 < 0` or `x0 >= M`) on one side, while every
/// interior model borders a neighbouring model on both sides. Stretch moves
/// that cross a wall are rejected, so walkers leave the end bins less freely
/// than interior ones. This is accepted, not corrected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixturePrior {
    n_models: usize,
    n_channels: usize,
    log_norm: f64,
}

impl MixturePrior {
    /// Prior over `n_models` models with `n_channels` channels each.
    pub fn new(n_models: usize, n_channels: usize) -> Self {
        Self {
            n_models,
            n_channels,
            log_norm: log_gamma_integer(n_channels),
        }
    }

    /// Number of models `M`.
    pub fn n_models(&self) -> usize {
        self.n_models
    }

    /// Number of channels `C`.
    pub fn n_channels(&self) -> usize {
        self.n_channels
    }

    /// Length of the sampler-facing parameter vector, `1 + (C - 1)`.
    pub fn dim(&self) -> usize {
        self.n_channels.max(1)
    }

    /// Model index encoded in `x`, if `x[0]` lands in `[0, M)`.
    pub fn model_index(&self, x: &[f64]) -> Option<ModelIndex> {
        let x0 = *x.first()?;
        if !x0.is_finite() || x0 < 0.0 {
            return None;
        }
        let idx = x0.floor();
        if idx >= self.n_models as f64 {
            return None;
        }
        Some(ModelIndex(idx as usize))
    }

    /// Appends the implied final fraction `1 - sum(x[1..])`.
    pub fn complete_betas(&self, x: &[f64]) -> Vec<f64> {
        let free = x.get(1..).unwrap_or_default();
        let mut betas = Vec::with_capacity(free.len() + 1);
        betas.extend_from_slice(free);
        betas.push(1.0 - free.iter().sum::<f64>());
        betas
    }

    /// Log prior of `x`; `-inf` outside the support.
    pub fn log_prior(&self, x: &[f64]) -> f64 {
        if x.len() != self.dim() || self.model_index(x).is_none() {
            return f64::NEG_INFINITY;
        }
        let free = &x[1..];
        if free.iter().any(|b| !b.is_finite() || *b < 0.0) {
            return f64::NEG_INFINITY;
        }
        if free.iter().sum::<f64>() > 1.0 {
            return f64::NEG_INFINITY;
        }
        self.log_norm
    }

    /// Tagged decode of `x`; `None` outside the support.
    pub fn decode(&self, x: &[f64]) -> Option<MixturePoint> {
        if !self.log_prior(x).is_finite() {
            return None;
        }
        Some(MixturePoint {
            model: self.model_index(x)?,
            betas: BetaVector(self.complete_betas(x)),
        })
    }

    /// Draws a starting point: `x0` uniform on `[0, M)`, fractions from the flat Dirichlet.
    pub fn sample(&self, rng: &mut RngHandle) -> Result<Vec<f64>, PopError> {
        let dirichlet = if self.n_channels >= 2 {
            Some(Dirichlet::new_with_size(1.0, self.n_channels).map_err(|err| {
                PopError::Rng(
                    ErrorInfo::new("dirichlet-init", err.to_string())
                        .with_context("channels", self.n_channels.to_string()),
                )
            })?)
        } else {
            None
        };
        for _ in 0..MAX_INIT_ATTEMPTS {
            let mut x = Vec::with_capacity(self.dim());
            x.push(rng.uniform() * self.n_models as f64);
            if let Some(dirichlet) = &dirichlet {
                let betas: Vec<f64> = dirichlet.sample(rng.inner_mut());
                x.extend_from_slice(&betas[..self.n_channels - 1]);
            }
            if self.log_prior(&x).is_finite() {
                return Ok(x);
            }
        }
        Err(PopError::Rng(
            ErrorInfo::new("prior-sample", "could not draw a point inside the prior support")
                .with_context("models", self.n_models.to_string())
                .with_context("channels", self.n_channels.to_string()),
        ))
    }
}

// ln Γ(n) = ln (n - 1)!
fn log_gamma_integer(n: usize) -> f64 {
    (1..n).map(|k| (k as f64).ln()).sum()
}
