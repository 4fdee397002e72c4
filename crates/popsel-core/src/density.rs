//! Channel density capability and the Gaussian kernel-density implementation.

use std::f64::consts::PI;

use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::errors::{ErrorInfo, PopError};
use crate::observations::ObservationSet;
use crate::rng::RngHandle;

/// Capability implemented by every per-channel density model.
///
/// Density caches depend only on this trait, never on a concrete model type.
pub trait DensityModel: Send + Sync {
    /// Number of inference parameters the model is defined over.
    fn dimension(&self) -> usize;

    /// Returns one non-negative density per observation, in order.
    fn evaluate(&self, observations: &ObservationSet) -> Result<Vec<f64>, PopError>;

    /// Natural log of [`evaluate`](Self::evaluate). Models whose densities can
    /// underflow in the tails override this with a direct log-space evaluation.
    fn log_evaluate(&self, observations: &ObservationSet) -> Result<Vec<f64>, PopError> {
        Ok(self.evaluate(observations)?.into_iter().map(f64::ln).collect())
    }

    /// Draws a single point from the model, if the model supports sampling.
    fn draw(&self, _rng: &mut RngHandle) -> Result<Vec<f64>, PopError> {
        Err(PopError::Model(ErrorInfo::new(
            "draw-unsupported",
            "density model does not support drawing samples",
        )))
    }
}

/// Product-kernel Gaussian KDE over a set of population-synthesis samples.
///
/// Each sample may carry a non-negative weight (for example a detection
/// probability); the density is `Σ w_i K_h(x - x_i) / Σ w_i`. Evaluation runs
/// in log space so observations far out in the tails keep a finite log density.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianKde {
    points: Vec<Vec<f64>>,
    bandwidths: Vec<f64>,
    /// `ln w_i`, `-inf` for zero-weight samples.
    log_weights: Option<Vec<f64>>,
    /// Kernel normalisation plus `-ln Σ w_i`.
    log_norm: f64,
}

impl GaussianKde {
    /// Builds an unweighted KDE from sample points.
    ///
    /// When `bandwidths` is `None` each dimension uses Scott's rule,
    /// `sigma_d * n^(-1 / (d + 4))`.
    pub fn new(points: Vec<Vec<f64>>, bandwidths: Option<Vec<f64>>) -> Result<Self, PopError> {
        Self::weighted(points, None, bandwidths)
    }

    /// Builds a KDE whose samples carry one non-negative weight each.
    ///
    /// Scott's rule then uses the weighted spread and the effective sample
    /// size `(Σ w)² / Σ w²`.
    pub fn weighted(
        points: Vec<Vec<f64>>,
        weights: Option<Vec<f64>>,
        bandwidths: Option<Vec<f64>>,
    ) -> Result<Self, PopError> {
        let Some(first) = points.first() else {
            return Err(PopError::Model(ErrorInfo::new(
                "kde-empty",
                "kernel density estimate needs at least one sample",
            )));
        };
        let dim = first.len();
        if dim == 0 {
            return Err(PopError::Model(ErrorInfo::new(
                "kde-dimension",
                "kernel density samples must have at least one parameter",
            )));
        }
        if let Some(idx) = points
            .iter()
            .position(|p| p.len() != dim || p.iter().any(|v| !v.is_finite()))
        {
            return Err(PopError::Model(
                ErrorInfo::new("kde-sample", "malformed kernel density sample")
                    .with_context("index", idx.to_string())
                    .with_context("dimension", dim.to_string()),
            ));
        }

        if let Some(w) = &weights {
            if w.len() != points.len() || w.iter().any(|v| !(v.is_finite() && *v >= 0.0)) {
                return Err(PopError::Model(
                    ErrorInfo::new("kde-weights", "weights must be finite, non-negative, one per sample")
                        .with_context("samples", points.len().to_string())
                        .with_context("weights", w.len().to_string()),
                ));
            }
        }
        let weight = |i: usize| weights.as_ref().map_or(1.0, |w| w[i]);
        let sum_w: f64 = (0..points.len()).map(weight).sum();
        if !(sum_w.is_finite() && sum_w > 0.0) {
            return Err(PopError::Model(
                ErrorInfo::new("kde-weights", "weights must have a positive sum")
                    .with_context("sum", sum_w.to_string()),
            ));
        }

        let bandwidths = match bandwidths {
            Some(h) => {
                if h.len() != dim || h.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
                    return Err(PopError::Model(
                        ErrorInfo::new("kde-bandwidth", "bandwidths must be positive, one per dimension")
                            .with_context("dimension", dim.to_string()),
                    ));
                }
                h
            }
            None => scott_bandwidths(&points, &weight, dim),
        };

        let log_norm = -sum_w.ln()
            - bandwidths
                .iter()
                .map(|h| h.ln() + 0.5 * (2.0 * PI).ln())
                .sum::<f64>();
        let log_weights = weights.map(|w| {
            w.into_iter()
                .map(|v| if v > 0.0 { v.ln() } else { f64::NEG_INFINITY })
                .collect()
        });

        Ok(Self {
            points,
            bandwidths,
            log_weights,
            log_norm,
        })
    }

    /// Kernel bandwidth per dimension.
    pub fn bandwidths(&self) -> &[f64] {
        &self.bandwidths
    }

    /// Number of kernel centres.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the estimate has no kernel centres. Always false for a built KDE.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Density at a single point.
    pub fn density_at(&self, x: &[f64]) -> f64 {
        self.log_density_at(x).exp()
    }

    /// Log density at a single point. Stays finite arbitrarily far from
    /// every kernel centre.
    pub fn log_density_at(&self, x: &[f64]) -> f64 {
        // running logsumexp: the sum is exp(m) * s
        let mut m = f64::NEG_INFINITY;
        let mut s = 0.0f64;
        for (i, p) in self.points.iter().enumerate() {
            let log_w = self.log_weights.as_ref().map_or(0.0, |w| w[i]);
            if log_w == f64::NEG_INFINITY {
                continue;
            }
            let q: f64 = p
                .iter()
                .zip(x)
                .zip(&self.bandwidths)
                .map(|((c, v), h)| {
                    let z = (v - c) / h;
                    z * z
                })
                .sum();
            let t = log_w - 0.5 * q;
            if t > m {
                s = if m.is_finite() { s * (m - t).exp() + 1.0 } else { 1.0 };
                m = t;
            } else {
                s += (t - m).exp();
            }
        }
        if !m.is_finite() {
            return f64::NEG_INFINITY;
        }
        m + s.ln() + self.log_norm
    }
}

fn scott_bandwidths(points: &[Vec<f64>], weight: &dyn Fn(usize) -> f64, dim: usize) -> Vec<f64> {
    let sum_w: f64 = (0..points.len()).map(weight).sum();
    let sum_w2: f64 = (0..points.len()).map(|i| weight(i).powi(2)).sum();
    let n_eff = sum_w * sum_w / sum_w2;
    let factor = n_eff.powf(-1.0 / (dim as f64 + 4.0));
    (0..dim)
        .map(|d| {
            let mean = points.iter().enumerate().map(|(i, p)| weight(i) * p[d]).sum::<f64>() / sum_w;
            let var = if n_eff > 1.0 {
                let spread: f64 = points
                    .iter()
                    .enumerate()
                    .map(|(i, p)| weight(i) * (p[d] - mean).powi(2))
                    .sum();
                // reliability weights; reduces to n - 1 when every weight is equal
                spread / (sum_w - sum_w2 / sum_w)
            } else {
                0.0
            };
            let sigma = var.sqrt();
            // degenerate columns still need a usable kernel width
            let sigma = if sigma > 0.0 {
                sigma
            } else {
                1e-3 * mean.abs().max(1.0)
            };
            sigma * factor
        })
        .collect()
}

impl GaussianKde {
    fn check_dimension(&self, observations: &ObservationSet) -> Result<(), PopError> {
        if observations.dimension() != self.dimension() {
            return Err(PopError::Model(
                ErrorInfo::new("kde-observation-dimension", "observation dimension mismatch")
                    .with_context("expected", self.dimension().to_string())
                    .with_context("found", observations.dimension().to_string()),
            ));
        }
        Ok(())
    }
}

impl DensityModel for GaussianKde {
    fn dimension(&self) -> usize {
        self.bandwidths.len()
    }

    fn evaluate(&self, observations: &ObservationSet) -> Result<Vec<f64>, PopError> {
        self.check_dimension(observations)?;
        Ok(observations.iter().map(|x| self.density_at(x)).collect())
    }

    fn log_evaluate(&self, observations: &ObservationSet) -> Result<Vec<f64>, PopError> {
        self.check_dimension(observations)?;
        Ok(observations.iter().map(|x| self.log_density_at(x)).collect())
    }

    fn draw(&self, rng: &mut RngHandle) -> Result<Vec<f64>, PopError> {
        let index = match &self.log_weights {
            Some(log_w) => {
                let weights = WeightedIndex::new(log_w.iter().map(|l| l.exp())).map_err(|err| {
                    PopError::Model(ErrorInfo::new("kde-weights", err.to_string()))
                })?;
                weights.sample(rng)
            }
            None => rng.gen_range(0..self.points.len()),
        };
        Ok(self.points[index]
            .iter()
            .zip(&self.bandwidths)
            .map(|(c, h)| {
                let z: f64 = rng.sample(StandardNormal);
                c + h * z
            })
            .collect())
    }
}
