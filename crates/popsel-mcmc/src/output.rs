use std::path::Path;

use indexmap::IndexMap;
use popsel_core::errors::ErrorInfo;
use popsel_core::{
    load_json, store_json, JsonStyle, ObservationRecord, PopError, RunProvenance, SchemaVersion,
};
use serde::{Deserialize, Serialize};

use crate::args::{ReferenceModel, RunArgs};
use crate::config::RunConfig;
use crate::decode::{PosteriorDecoder, PosteriorSample, PosteriorSummary};

/// Name of the sample column holding the model index.
pub const MODEL_INDEX_COLUMN: &str = "model_idx";

/// Sampler diagnostics stored next to the samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerDiagnostics {
    /// Temperatures of the ladder, coldest first.
    pub temperatures: Vec<f64>,
    /// Stretch-move acceptance rate per level.
    pub acceptance_rates: Vec<f64>,
    /// Mean exchange acceptance probability per adjacent level pair.
    pub exchange_acceptance: Vec<f64>,
    /// Iterations actually completed.
    pub iterations_completed: usize,
    /// Whether the run stopped on a cancellation request.
    pub cancelled: bool,
}

/// Persisted outcome of a selection run.
///
/// Samples hold `model_idx` and `beta_<c>` for the first `C - 1` channels
/// only; the last fraction is rebuilt on load by [`ResultContainer::posterior_samples`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultContainer {
    /// Schema of this document.
    pub schema: SchemaVersion,
    /// Seed, input hash, observation fingerprint and timestamp.
    pub provenance: RunProvenance,
    /// Reference model, when one was given.
    pub reference: Option<ReferenceModel>,
    /// Run arguments.
    pub arguments: RunArgs,
    /// Effective sampler configuration.
    pub config: RunConfig,
    /// Observations the run was conditioned on.
    pub observations: ObservationRecord,
    /// Model labels in index order.
    pub model_labels: Vec<String>,
    /// Channel names in column order.
    pub channel_names: Vec<String>,
    /// Cold-chain samples after burn-in, one column per key.
    pub samples: IndexMap<String, Vec<f64>>,
    /// Log-posterior of each sample.
    #[serde(with = "crate::serde_log::vec")]
    pub log_posterior: Vec<f64>,
    /// Decoded per-model summary.
    pub summary: PosteriorSummary,
    /// Sampler diagnostics.
    pub diagnostics: SamplerDiagnostics,
}

/// Column name of the fraction of `channel`.
pub fn beta_column(channel: &str) -> String {
    format!("beta_{channel}")
}

/// Lays decoded samples out as named columns, dropping the implied last fraction.
pub fn sample_columns(
    samples: &[PosteriorSample],
    channel_names: &[String],
) -> (IndexMap<String, Vec<f64>>, Vec<f64>) {
    let free = channel_names.len().saturating_sub(1);
    let mut columns = IndexMap::with_capacity(free + 1);
    columns.insert(
        MODEL_INDEX_COLUMN.to_string(),
        samples.iter().map(|s| s.model_index as f64).collect(),
    );
    for (c, name) in channel_names.iter().take(free).enumerate() {
        columns.insert(beta_column(name), samples.iter().map(|s| s.betas[c]).collect());
    }
    (columns, samples.iter().map(|s| s.log_posterior).collect())
}

impl ResultContainer {
    /// Rebuilds full samples, the implied last fraction included.
    pub fn posterior_samples(&self) -> Result<Vec<PosteriorSample>, PopError> {
        let missing = |column: String| {
            PopError::Serde(
                ErrorInfo::new("results-column", "sample column missing from result container")
                    .with_context("column", column),
            )
        };
        let model_idx = self
            .samples
            .get(MODEL_INDEX_COLUMN)
            .ok_or_else(|| missing(MODEL_INDEX_COLUMN.to_string()))?;
        let free = self.channel_names.len().saturating_sub(1);
        let betas = self
            .channel_names
            .iter()
            .take(free)
            .map(|name| {
                let column = beta_column(name);
                self.samples.get(&column).ok_or_else(|| missing(column))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if betas.iter().any(|b| b.len() != model_idx.len()) || self.log_posterior.len() != model_idx.len() {
            return Err(PopError::Serde(ErrorInfo::new(
                "results-shape",
                "sample columns have different lengths",
            )));
        }

        let decoder = PosteriorDecoder::new(self.model_labels.clone(), self.channel_names.clone());
        let mut samples = Vec::with_capacity(model_idx.len());
        for (i, &x0) in model_idx.iter().enumerate() {
            let mut row = Vec::with_capacity(free + 2);
            row.push(x0);
            row.extend(betas.iter().map(|column| column[i]));
            row.push(1.0 - row[1..].iter().sum::<f64>());
            if let Some(sample) = decoder.sample_from_row(&row, self.log_posterior[i]) {
                samples.push(sample);
            }
        }
        Ok(samples)
    }

    /// Writes the container as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<(), PopError> {
        store_json("results", path, self, JsonStyle::Pretty)
    }

    /// Loads a container, rejecting layouts from another major schema version.
    pub fn load(path: &Path) -> Result<Self, PopError> {
        let container: Self = load_json("results", path)?;
        if !SchemaVersion::CURRENT.can_read(container.schema) {
            return Err(PopError::Serde(
                ErrorInfo::new("results-schema", "result container schema is not readable")
                    .with_context("path", path.display().to_string())
                    .with_context("found", container.schema.to_string())
                    .with_context("supported", SchemaVersion::CURRENT.to_string()),
            ));
        }
        Ok(container)
    }
}
