use std::collections::BTreeSet;
use std::sync::Arc;

use indexmap::IndexMap;
use popsel_core::errors::{ConfigurationError, ErrorInfo};
use popsel_core::{DensityModel, ObservationSet, PopError};

use crate::cache::DensityCache;

/// Tolerance applied when checking that a full branching vector sums to one.
pub const BRANCHING_SUM_TOLERANCE: f64 = 1e-6;

/// One formation channel of a population model.
#[derive(Debug)]
pub struct Channel {
    name: String,
    cache: DensityCache,
    beta: Option<f64>,
}

impl Channel {
    /// Creates an unfrozen channel without a branching fraction.
    pub fn new(name: impl Into<String>, model: Arc<dyn DensityModel>) -> Self {
        Self {
            name: name.into(),
            cache: DensityCache::new(model),
            beta: None,
        }
    }

    /// Channel name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Density cache owned by the channel.
    pub fn cache(&self) -> &DensityCache {
        &self.cache
    }

    /// Branching fraction, once assigned.
    pub fn beta(&self) -> Option<f64> {
        self.beta
    }

    /// Assigns the branching fraction. Allowed once, and only before freezing.
    pub fn assign_beta(&mut self, beta: f64) -> Result<(), PopError> {
        if self.cache.is_frozen() || self.beta.is_some() {
            return Err(PopError::Model(
                ErrorInfo::new("beta-reassigned", "branching fraction can only be assigned once, before freezing")
                    .with_context("channel", self.name.clone()),
            ));
        }
        if !(0.0..=1.0).contains(&beta) {
            return Err(ConfigurationError::invalid(
                format!("betas.{}", self.name),
                format!("branching fraction must lie in [0, 1], got {beta}"),
            )
            .into());
        }
        self.beta = Some(beta);
        Ok(())
    }
}

/// Named, ordered collection of channels.
#[derive(Debug)]
pub struct PopulationModel {
    name: String,
    channels: IndexMap<String, Channel>,
}

impl PopulationModel {
    /// Creates an empty model.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            channels: IndexMap::new(),
        }
    }

    /// Model label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a channel backed by `model`. Channel names must be unique.
    pub fn insert_channel(
        &mut self,
        name: impl Into<String>,
        model: Arc<dyn DensityModel>,
    ) -> Result<(), PopError> {
        let name = name.into();
        if self.channels.contains_key(&name) {
            return Err(PopError::Model(
                ErrorInfo::new("duplicate-channel", "channel name already present in model")
                    .with_context("model", self.name.clone())
                    .with_context("channel", name),
            ));
        }
        self.channels.insert(name.clone(), Channel::new(name, model));
        Ok(())
    }

    /// Looks up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    /// Channels in their current order.
    pub fn channels(&self) -> impl ExactSizeIterator<Item = &Channel> + '_ {
        self.channels.values()
    }

    /// Channel names in their current order.
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.keys().cloned().collect()
    }

    /// Channel names as an unordered set, for cross-model comparison.
    pub fn channel_set(&self) -> BTreeSet<&str> {
        self.channels.keys().map(String::as_str).collect()
    }

    /// Number of channels.
    pub fn n_channels(&self) -> usize {
        self.channels.len()
    }

    /// Assigns one branching fraction per channel, in channel order.
    ///
    /// The vector must have exactly one entry per channel and sum to one.
    pub fn assign_branching_fractions(&mut self, betas: &[f64]) -> Result<(), PopError> {
        let n = self.channels.len();
        if betas.len() != n {
            return Err(ConfigurationError::BranchingLength {
                expected: n,
                expected_min: n.saturating_sub(1),
                found: betas.len(),
            }
            .into());
        }
        let sum: f64 = betas.iter().sum();
        if (sum - 1.0).abs() > BRANCHING_SUM_TOLERANCE {
            return Err(ConfigurationError::BranchingSum { sum }.into());
        }
        for (channel, &beta) in self.channels.values_mut().zip(betas) {
            channel.assign_beta(beta)?;
        }
        Ok(())
    }

    /// Branching fractions in channel order, if every channel has one.
    pub fn branching_fractions(&self) -> Option<Vec<f64>> {
        self.channels.values().map(Channel::beta).collect()
    }

    /// Whether every channel cache is frozen.
    pub fn is_frozen(&self) -> bool {
        !self.channels.is_empty() && self.channels.values().all(|c| c.cache.is_frozen())
    }

    /// Freezes every channel against `observations`.
    pub fn freeze(&mut self, observations: &ObservationSet) -> Result<(), PopError> {
        for channel in self.channels.values_mut() {
            channel.cache.freeze(observations)?;
        }
        Ok(())
    }

    /// Reorders the channels to `order`, which must name exactly the current channel set.
    pub fn reorder(&mut self, order: &[String]) -> Result<(), ConfigurationError> {
        let wanted: BTreeSet<&str> = order.iter().map(String::as_str).collect();
        if wanted != self.channel_set() || wanted.len() != order.len() {
            return Err(ConfigurationError::MismatchedChannels {
                model: self.name.clone(),
                expected: order.to_vec(),
                found: self.channel_names(),
            });
        }
        let mut reordered = IndexMap::with_capacity(order.len());
        for name in order {
            if let Some((key, channel)) = self.channels.swap_remove_entry(name) {
                reordered.insert(key, channel);
            }
        }
        self.channels = reordered;
        Ok(())
    }
}

/// Completes a user-supplied branching vector to one entry per channel.
///
/// `C` values must sum to one within [`BRANCHING_SUM_TOLERANCE`]. `C - 1`
/// values must sum into `(0, 1]` and receive the complement as the last
/// entry. Every entry must lie in `[0, 1]`.
pub fn complete_branching_fractions(
    values: &[f64],
    n_channels: usize,
) -> Result<Vec<f64>, ConfigurationError> {
    if let Some(bad) = values.iter().find(|v| !(v.is_finite() && (0.0..=1.0).contains(*v))) {
        return Err(ConfigurationError::invalid(
            "betas",
            format!("branching fractions must lie in [0, 1], got {bad}"),
        ));
    }
    let sum: f64 = values.iter().sum();
    if values.len() == n_channels && n_channels > 0 {
        if (sum - 1.0).abs() > BRANCHING_SUM_TOLERANCE {
            return Err(ConfigurationError::BranchingSum { sum });
        }
        return Ok(values.to_vec());
    }
    if n_channels > 1 && values.len() == n_channels - 1 {
        if !(sum > 0.0 && sum <= 1.0 + BRANCHING_SUM_TOLERANCE) {
            return Err(ConfigurationError::BranchingSum { sum });
        }
        let mut full = values.to_vec();
        full.push((1.0 - sum).max(0.0));
        return Ok(full);
    }
    Err(ConfigurationError::BranchingLength {
        expected: n_channels,
        expected_min: n_channels.saturating_sub(1),
        found: values.len(),
    })
}
