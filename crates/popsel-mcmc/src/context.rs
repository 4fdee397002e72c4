use std::sync::Arc;

use popsel_core::errors::ConfigurationError;
use popsel_core::{ObservationSet, PopError};

use crate::cache::FrozenEvaluation;
use crate::likelihood::MixtureLikelihood;
use crate::population::PopulationModel;
use crate::prior::MixturePrior;

/// Shared, read-only state of a run: observations and frozen densities.
///
/// Built once during setup. Channel sets are validated and every model is
/// re-ordered to the channel order of the first model before freezing.
/// Models handed over already frozen must have been frozen against the same
/// observations.
#[derive(Debug)]
pub struct InferenceContext {
    observations: ObservationSet,
    frozen: Arc<FrozenEvaluation>,
}

impl InferenceContext {
    /// Validates, orders and freezes `models` against `observations`.
    pub fn build(
        mut models: Vec<PopulationModel>,
        observations: ObservationSet,
    ) -> Result<Self, PopError> {
        let order = validate_channel_sets(&models)?;
        for model in &mut models {
            model.reorder(&order)?;
            if !model.is_frozen() {
                model.freeze(&observations)?;
            }
        }
        let fingerprint = observations.fingerprint();
        let frozen = FrozenEvaluation::from_models(&models, &fingerprint)?;
        let unsupported = frozen.unsupported_observations();
        if !unsupported.is_empty() {
            tracing::warn!(
                count = unsupported.len(),
                first = unsupported[0],
                "observations have zero density under every model; every posterior value will be -inf"
            );
        }
        tracing::info!(
            n_models = frozen.n_models(),
            n_channels = frozen.n_channels(),
            n_observations = frozen.n_observations(),
            fingerprint = %fingerprint,
            "froze channel densities"
        );
        Ok(Self {
            observations,
            frozen: Arc::new(frozen),
        })
    }

    /// Model labels in index order.
    pub fn model_names(&self) -> &[String] {
        self.frozen.model_names()
    }

    /// Shared channel order.
    pub fn channel_names(&self) -> &[String] {
        self.frozen.channel_names()
    }

    /// Index of the model called `name`.
    pub fn model_index(&self, name: &str) -> Option<usize> {
        self.model_names().iter().position(|m| m == name)
    }

    /// The observation set every cache was frozen against.
    pub fn observations(&self) -> &ObservationSet {
        &self.observations
    }

    /// Frozen density table shared with the likelihood.
    pub fn frozen(&self) -> &Arc<FrozenEvaluation> {
        &self.frozen
    }

    /// Prior over `(model index, branching fractions)` for this context.
    pub fn prior(&self) -> MixturePrior {
        MixturePrior::new(self.frozen.n_models(), self.frozen.n_channels())
    }

    /// Joint log-posterior closing over the frozen table.
    pub fn likelihood(&self) -> MixtureLikelihood {
        MixtureLikelihood::new(self.prior(), Arc::clone(&self.frozen))
    }
}

/// Checks that every model carries the channel set of the first one and
/// returns the first model's channel order.
pub fn validate_channel_sets(models: &[PopulationModel]) -> Result<Vec<String>, ConfigurationError> {
    let Some(first) = models.first() else {
        return Err(ConfigurationError::invalid(
            "models",
            "at least one population model is required",
        ));
    };
    if first.n_channels() == 0 {
        return Err(ConfigurationError::invalid(
            "models",
            format!("model '{}' has no channels", first.name()),
        ));
    }
    let expected = first.channel_set();
    for model in &models[1..] {
        if model.channel_set() != expected {
            return Err(ConfigurationError::MismatchedChannels {
                model: model.name().to_string(),
                expected: first.channel_names(),
                found: model.channel_names(),
            });
        }
    }
    Ok(first.channel_names())
}
