use std::fmt;
use std::path::Path;
use std::str::FromStr;

use popsel_core::errors::ConfigurationError;
use popsel_core::{load_json, ObservationRecord, ObservationSet, PopError, RngHandle};
use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::loader::select_columns;
use crate::population::PopulationModel;

/// Measurement noise applied to mock observations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Smearing {
    /// Observations are exact draws from the reference model.
    #[default]
    None,
    /// Independent normal noise with `sigma = fraction * |value|` per parameter.
    Gaussian {
        /// Relative noise level.
        fraction: f64,
    },
}

impl Smearing {
    /// Applies the noise to one drawn point.
    pub fn apply(&self, point: &mut [f64], rng: &mut RngHandle) {
        if let Smearing::Gaussian { fraction } = *self {
            for value in point.iter_mut() {
                let z: f64 = rng.sample(StandardNormal);
                *value += fraction * value.abs() * z;
            }
        }
    }
}

impl fmt::Display for Smearing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Smearing::None => write!(f, "none"),
            Smearing::Gaussian { fraction } => write!(f, "gaussian:{fraction}"),
        }
    }
}

impl FromStr for Smearing {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ConfigurationError::invalid(
                "smear",
                format!("expected 'none' or 'gaussian:<fraction>', got '{s}'"),
            )
        };
        match s.trim() {
            "none" => Ok(Smearing::None),
            other => {
                let fraction = other
                    .strip_prefix("gaussian:")
                    .ok_or_else(invalid)?
                    .parse::<f64>()
                    .map_err(|_| invalid())?;
                if !(fraction.is_finite() && fraction >= 0.0) {
                    return Err(invalid());
                }
                Ok(Smearing::Gaussian { fraction })
            }
        }
    }
}

/// Draws `count` observations from `model` using its assigned branching fractions.
///
/// Each draw picks a channel with probability `beta_c`, samples a point from
/// the channel density and then applies `smearing`.
pub fn mock_observations(
    model: &PopulationModel,
    parameters: &[String],
    count: usize,
    smearing: Smearing,
    rng: &mut RngHandle,
) -> Result<ObservationSet, PopError> {
    if count == 0 {
        return Err(ConfigurationError::MissingObservationCount.into());
    }
    let betas = model
        .branching_fractions()
        .ok_or(ConfigurationError::MissingBranchingFractions)?;
    let chooser = WeightedIndex::new(&betas).map_err(|err| {
        PopError::Configuration(ConfigurationError::invalid("betas", err.to_string()))
    })?;
    let channels: Vec<_> = model.channels().collect();
    let mut rows = Vec::with_capacity(count);
    for _ in 0..count {
        let channel = channels[chooser.sample(rng.inner_mut())];
        let mut point = channel.cache().model().draw(rng)?;
        smearing.apply(&mut point, rng);
        rows.push(point);
    }
    tracing::info!(
        model = model.name(),
        count,
        smearing = %smearing,
        "drew mock observations"
    );
    ObservationSet::new(parameters.to_vec(), rows)
}

/// Loads real observations and keeps the requested parameter columns, in order.
pub fn load_observations(path: &Path, parameters: &[String]) -> Result<ObservationSet, PopError> {
    let record: ObservationRecord = load_json("observations", path)?;
    let columns = select_columns(&record.parameters, parameters, &path.display().to_string())?;
    let full = ObservationSet::try_from(record)?;
    let rows = full
        .iter()
        .map(|row| columns.iter().map(|&c| row[c]).collect())
        .collect();
    ObservationSet::new(parameters.to_vec(), rows)
}
