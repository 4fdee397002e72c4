use std::path::PathBuf;

use popsel_core::errors::ConfigurationError;
use serde::{Deserialize, Serialize};

use crate::config::{LadderPolicy, RunConfig};
use crate::population::{complete_branching_fractions, PopulationModel};
use crate::sources::Smearing;

/// Validated inputs of a selection run, recorded verbatim in the result container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunArgs {
    /// Directory holding one `<model>.json` per population model.
    pub model_dir: PathBuf,
    /// Inference parameters, in column order.
    pub parameters: Vec<String>,
    /// Reference model used to draw mock observations.
    #[serde(default)]
    pub true_model: Option<String>,
    /// Branching fractions of the reference model (`C` or `C - 1` values).
    #[serde(default)]
    pub betas: Option<Vec<f64>>,
    /// Number of mock observations to draw.
    #[serde(default)]
    pub n_obs: Option<usize>,
    /// Noise applied to mock observations.
    #[serde(default)]
    pub smearing: Smearing,
    /// Real observation file; replaces mock observations when present.
    #[serde(default)]
    pub observations: Option<PathBuf>,
    /// Iterations discarded before summarising.
    pub burn_in: usize,
    /// Total sampler iterations.
    pub iterations: usize,
    /// Number of temperature levels.
    pub temperatures: usize,
    /// Walkers per level.
    pub walkers: usize,
    /// Master seed.
    pub seed: u64,
    /// Directory receiving the result container and run artefacts.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Continue from the newest checkpoint listed in the output directory's manifest.
    #[serde(default)]
    pub resume: bool,
}

/// Reference model resolved against the loaded models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceModel {
    /// Model label.
    pub name: String,
    /// Completed branching fractions, one per channel.
    pub betas: Option<Vec<f64>>,
}

impl RunArgs {
    /// Checks the inputs that do not depend on the loaded models.
    pub fn validate_inputs(&self) -> Result<(), ConfigurationError> {
        if self.parameters.is_empty() {
            return Err(ConfigurationError::invalid(
                "params",
                "at least one inference parameter is required",
            ));
        }
        if self.observations.is_none() {
            if self.true_model.is_none() {
                return Err(ConfigurationError::invalid(
                    "true-model",
                    "a reference model is required when no real observations are supplied",
                ));
            }
            match self.n_obs {
                None | Some(0) => return Err(ConfigurationError::MissingObservationCount),
                Some(_) => {}
            }
            if self.betas.is_none() {
                return Err(ConfigurationError::MissingBranchingFractions);
            }
        }
        if self.iterations == 0 {
            return Err(ConfigurationError::invalid(
                "iterations",
                "at least one iteration is required",
            ));
        }
        if self.burn_in >= self.iterations {
            return Err(ConfigurationError::invalid(
                "burnin",
                format!(
                    "burn-in ({}) must be smaller than the iteration count ({})",
                    self.burn_in, self.iterations
                ),
            ));
        }
        if self.temperatures == 0 {
            return Err(ConfigurationError::invalid(
                "temps",
                "at least one temperature level is required",
            ));
        }
        if self.walkers < 4 || self.walkers % 2 != 0 {
            return Err(ConfigurationError::invalid(
                "walkers",
                format!("walker count must be even and at least 4, got {}", self.walkers),
            ));
        }
        Ok(())
    }

    /// Resolves the reference model and completes its branching fractions.
    pub fn resolve_reference(
        &self,
        models: &[PopulationModel],
    ) -> Result<Option<ReferenceModel>, ConfigurationError> {
        let Some(name) = &self.true_model else {
            return Ok(None);
        };
        let model = models
            .iter()
            .find(|m| m.name() == name)
            .ok_or_else(|| ConfigurationError::UnknownModel {
                name: name.clone(),
                available: models.iter().map(|m| m.name().to_string()).collect(),
            })?;
        let betas = self
            .betas
            .as_deref()
            .map(|values| complete_branching_fractions(values, model.n_channels()))
            .transpose()?;
        Ok(Some(ReferenceModel {
            name: name.clone(),
            betas,
        }))
    }

    /// Overrides the sampler settings of `config` with these arguments.
    pub fn apply_to(&self, config: &mut RunConfig) {
        config.iterations = self.iterations;
        config.burn_in = self.burn_in;
        config.walkers = self.walkers;
        config.seed_policy.master_seed = self.seed;
        if !matches!(config.ladder.policy, LadderPolicy::Manual { .. }) {
            config.ladder.levels = self.temperatures;
        }
        if self.output_dir.is_some() {
            config.output.run_directory = self.output_dir.clone();
        }
    }
}
