use std::fmt;
use std::sync::Arc;

use popsel_core::errors::ErrorInfo;
use popsel_core::{DensityModel, ObservationSet, PopError};

use crate::population::PopulationModel;

/// Frozen per-observation densities of a single channel model.
///
/// `freeze` evaluates the wrapped model once over an observation set, in log
/// space; afterwards `evaluate` and `log_evaluate` hand out the cached vectors
/// without touching the model again. The cached vectors are never recomputed.
pub struct DensityCache {
    model: Arc<dyn DensityModel>,
    frozen: Option<FrozenDensities>,
}

struct FrozenDensities {
    values: Box<[f64]>,
    log_values: Box<[f64]>,
    fingerprint: String,
}

impl fmt::Debug for DensityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DensityCache")
            .field("dimension", &self.model.dimension())
            .field("frozen", &self.is_frozen())
            .field("len", &self.frozen.as_ref().map(|frozen| frozen.values.len()))
            .finish_non_exhaustive()
    }
}

impl DensityCache {
    /// Wraps a density model; the cache starts unfrozen.
    pub fn new(model: Arc<dyn DensityModel>) -> Self {
        Self {
            model,
            frozen: None,
        }
    }

    /// The wrapped density model.
    pub fn model(&self) -> &Arc<dyn DensityModel> {
        &self.model
    }

    /// Whether `freeze` has completed.
    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// Fingerprint of the observation set the cache was frozen against.
    pub fn fingerprint(&self) -> Option<&str> {
        self.frozen.as_ref().map(|frozen| frozen.fingerprint.as_str())
    }

    /// Evaluates the model's log densities over `observations` and stores them.
    ///
    /// Fails if the cache is already frozen, or if the model returns a vector
    /// of the wrong length, a NaN (a negative density included) or an
    /// infinite density.
    pub fn freeze(&mut self, observations: &ObservationSet) -> Result<(), PopError> {
        if let Some(frozen) = &self.frozen {
            return Err(PopError::Cache(
                ErrorInfo::new("cache-already-frozen", "density cache is already frozen")
                    .with_context("fingerprint", frozen.fingerprint.clone()),
            ));
        }
        let log_values = self.model.log_evaluate(observations)?;
        if log_values.len() != observations.len() {
            return Err(PopError::Model(
                ErrorInfo::new("density-length", "density model returned the wrong number of values")
                    .with_context("expected", observations.len().to_string())
                    .with_context("found", log_values.len().to_string()),
            ));
        }
        if let Some(idx) = log_values
            .iter()
            .position(|v| v.is_nan() || *v == f64::INFINITY)
        {
            return Err(PopError::Model(
                ErrorInfo::new("density-invalid", "density model returned a negative, NaN or infinite value")
                    .with_context("observation", idx.to_string())
                    .with_context("log_value", log_values[idx].to_string()),
            ));
        }
        self.frozen = Some(FrozenDensities {
            values: log_values.iter().map(|v| v.exp()).collect(),
            log_values: log_values.into(),
            fingerprint: observations.fingerprint(),
        });
        Ok(())
    }

    /// Returns the cached densities. Calling this before `freeze` is a contract violation.
    pub fn evaluate(&self) -> Result<&[f64], PopError> {
        self.frozen
            .as_ref()
            .map(|frozen| &frozen.values[..])
            .ok_or_else(unfrozen)
    }

    /// Returns the cached log densities; `-inf` where the density vanishes.
    pub fn log_evaluate(&self) -> Result<&[f64], PopError> {
        self.frozen
            .as_ref()
            .map(|frozen| &frozen.log_values[..])
            .ok_or_else(unfrozen)
    }
}

fn unfrozen() -> PopError {
    PopError::Cache(
        ErrorInfo::new("unfrozen-cache", "density cache evaluated before freeze")
            .with_hint("call freeze(observations) during setup"),
    )
}

/// Read-only table of frozen log densities for every (model, channel) pair.
///
/// Stored observation-major per model so the likelihood reads one contiguous
/// row of channel log densities per observation.
#[derive(Debug, Clone, PartialEq)]
pub struct FrozenEvaluation {
    model_names: Vec<String>,
    channel_names: Vec<String>,
    n_observations: usize,
    rows: Vec<Box<[f64]>>,
}

impl FrozenEvaluation {
    /// Collects the frozen caches of every model.
    ///
    /// Models must already share one channel order and be frozen against the
    /// observation set with fingerprint `fingerprint`.
    pub fn from_models(models: &[PopulationModel], fingerprint: &str) -> Result<Self, PopError> {
        let Some(first) = models.first() else {
            return Err(PopError::Sampler(ErrorInfo::new(
                "frozen-empty",
                "frozen evaluation needs at least one model",
            )));
        };
        let channel_names = first.channel_names();
        let n_channels = channel_names.len();
        let mut n_observations = None;
        let mut rows = Vec::with_capacity(models.len());

        for model in models {
            let mut columns = Vec::with_capacity(n_channels);
            for name in &channel_names {
                let channel = model.channel(name).ok_or_else(|| {
                    PopError::Sampler(
                        ErrorInfo::new("frozen-channel", "channel missing from model")
                            .with_context("model", model.name())
                            .with_context("channel", name.as_str()),
                    )
                })?;
                let values = channel.cache().log_evaluate()?;
                let expected = *n_observations.get_or_insert(values.len());
                let frozen_against = channel.cache().fingerprint().unwrap_or_default();
                if values.len() != expected || frozen_against != fingerprint {
                    return Err(PopError::Cache(
                        ErrorInfo::new(
                            "frozen-observation-mismatch",
                            "cache was frozen against a different observation set",
                        )
                        .with_context("model", model.name())
                        .with_context("channel", name.as_str())
                        .with_context("expected", fingerprint)
                        .with_context("found", frozen_against),
                    ));
                }
                columns.push(values);
            }
            let n_obs = n_observations.unwrap_or(0);
            let mut row = Vec::with_capacity(n_obs * n_channels);
            for obs in 0..n_obs {
                row.extend(columns.iter().map(|column| column[obs]));
            }
            rows.push(row.into_boxed_slice());
        }

        Ok(Self {
            model_names: models.iter().map(|m| m.name().to_string()).collect(),
            channel_names,
            n_observations: n_observations.unwrap_or(0),
            rows,
        })
    }

    /// Model labels in index order.
    pub fn model_names(&self) -> &[String] {
        &self.model_names
    }

    /// Channel names in column order.
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    /// Number of models `M`.
    pub fn n_models(&self) -> usize {
        self.model_names.len()
    }

    /// Number of channels `C`.
    pub fn n_channels(&self) -> usize {
        self.channel_names.len()
    }

    /// Number of observations the caches were frozen against.
    pub fn n_observations(&self) -> usize {
        self.n_observations
    }

    /// Channel log densities of `model` at observation `obs`, in channel order.
    pub fn log_densities_at(&self, model: usize, obs: usize) -> &[f64] {
        let c = self.n_channels();
        &self.rows[model][obs * c..(obs + 1) * c]
    }

    /// All observation rows of one model, flattened observation-major.
    pub fn model_rows(&self, model: usize) -> &[f64] {
        &self.rows[model]
    }

    /// Observations whose log density is `-inf` in every channel of every model.
    pub fn unsupported_observations(&self) -> Vec<usize> {
        let c = self.n_channels();
        (0..self.n_observations)
            .filter(|&obs| {
                self.rows
                    .iter()
                    .all(|row| row[obs * c..(obs + 1) * c].iter().all(|v| *v == f64::NEG_INFINITY))
            })
            .collect()
    }
}
