use popsel_core::errors::ConfigurationError;
use popsel_core::PopError;
use serde::{Deserialize, Serialize};

use crate::history::ChainHistory;

/// Flattened post-burn-in samples of one temperature level.
///
/// Rows are `(x0, beta_1, .., beta_C)`, the implied final fraction included,
/// ordered walker-major: every retained iteration of walker 0, then walker 1.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatLevel {
    /// Completed parameter rows.
    pub rows: Vec<Vec<f64>>,
    /// Log-posterior of each row.
    pub log_posteriors: Vec<f64>,
}

impl FlatLevel {
    /// Number of rows, `W * (N - B)`.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether no sample survived burn-in.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// One decoded cold-chain sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSample {
    /// Model index `floor(x0)`.
    pub model_index: usize,
    /// Label of the selected model.
    pub model_label: String,
    /// All `C` branching fractions.
    pub betas: Vec<f64>,
    /// Log-posterior of the sample.
    #[serde(with = "crate::serde_log")]
    pub log_posterior: f64,
}

/// Posterior statistics of one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    /// Index of the model.
    pub model_index: usize,
    /// Model label.
    pub label: String,
    /// Cold-chain samples that selected the model.
    pub sample_count: usize,
    /// `sample_count` over all decoded samples.
    pub fraction: f64,
    /// Mean branching fractions, absent when no sample selected the model.
    pub mean_betas: Option<Vec<f64>>,
    /// Per-channel standard deviation of the branching fractions.
    pub std_betas: Option<Vec<f64>>,
}

/// Per-model statistics of a decoded cold chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PosteriorSummary {
    /// Channel order of the beta statistics.
    pub channel_names: Vec<String>,
    /// Number of decoded cold-chain samples.
    pub total_samples: usize,
    /// One entry per model, in index order.
    pub models: Vec<ModelSummary>,
}

impl PosteriorSummary {
    /// Model that collected the most samples; ties go to the lower index.
    pub fn plurality(&self) -> Option<&ModelSummary> {
        self.models
            .iter()
            .filter(|m| m.sample_count > 0)
            .fold(None, |best: Option<&ModelSummary>, m| match best {
                Some(b) if b.sample_count >= m.sample_count => Some(b),
                _ => Some(m),
            })
    }

    /// Summary of the model called `label`.
    pub fn model(&self, label: &str) -> Option<&ModelSummary> {
        self.models.iter().find(|m| m.label == label)
    }
}

/// Turns raw chain history into per-model posterior summaries. Read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct PosteriorDecoder {
    model_labels: Vec<String>,
    channel_names: Vec<String>,
}

impl PosteriorDecoder {
    /// Decoder for the given model labels and channel order.
    pub fn new(model_labels: Vec<String>, channel_names: Vec<String>) -> Self {
        Self {
            model_labels,
            channel_names,
        }
    }

    /// Model labels in index order.
    pub fn model_labels(&self) -> &[String] {
        &self.model_labels
    }

    /// Channel names in column order.
    pub fn channel_names(&self) -> &[String] {
        &self.channel_names
    }

    /// Strips `burn_in` iterations and flattens every level.
    pub fn decode(&self, history: &ChainHistory, burn_in: usize) -> Result<Vec<FlatLevel>, PopError> {
        check_burn_in(history, burn_in)?;
        Ok((0..history.n_levels())
            .map(|level| flatten_level(history, level, burn_in))
            .collect())
    }

    /// Decoded samples of the cold level.
    ///
    /// Rows outside `[0, M)` cannot be accepted by the sampler and are skipped.
    pub fn cold_samples(
        &self,
        history: &ChainHistory,
        burn_in: usize,
    ) -> Result<Vec<PosteriorSample>, PopError> {
        check_burn_in(history, burn_in)?;
        let cold = flatten_level(history, 0, burn_in);
        Ok(cold
            .rows
            .into_iter()
            .zip(cold.log_posteriors)
            .filter_map(|(row, log_posterior)| self.sample_from_row(&row, log_posterior))
            .collect())
    }

    /// Builds a sample from a completed row `(x0, beta_1, .., beta_C)`.
    pub fn sample_from_row(&self, row: &[f64], log_posterior: f64) -> Option<PosteriorSample> {
        let x0 = *row.first()?;
        if !(x0.is_finite() && x0 >= 0.0) {
            return None;
        }
        let model_index = x0.floor() as usize;
        let model_label = self.model_labels.get(model_index)?.clone();
        Some(PosteriorSample {
            model_index,
            model_label,
            betas: row[1..].to_vec(),
            log_posterior,
        })
    }

    /// Per-model statistics of the cold chain after burn-in.
    pub fn summarize(&self, history: &ChainHistory, burn_in: usize) -> Result<PosteriorSummary, PopError> {
        Ok(self.summarize_samples(&self.cold_samples(history, burn_in)?))
    }

    /// Per-model statistics of already decoded samples.
    pub fn summarize_samples(&self, samples: &[PosteriorSample]) -> PosteriorSummary {
        let total = samples.len();
        let models = self
            .model_labels
            .iter()
            .enumerate()
            .map(|(index, label)| {
                let selected: Vec<&PosteriorSample> =
                    samples.iter().filter(|s| s.model_index == index).collect();
                let (mean_betas, std_betas) = beta_moments(&selected, self.channel_names.len());
                ModelSummary {
                    model_index: index,
                    label: label.clone(),
                    sample_count: selected.len(),
                    fraction: if total == 0 {
                        0.0
                    } else {
                        selected.len() as f64 / total as f64
                    },
                    mean_betas,
                    std_betas,
                }
            })
            .collect();
        PosteriorSummary {
            channel_names: self.channel_names.clone(),
            total_samples: total,
            models,
        }
    }
}

fn check_burn_in(history: &ChainHistory, burn_in: usize) -> Result<(), PopError> {
    if burn_in > history.len() {
        return Err(ConfigurationError::invalid(
            "burn-in",
            format!(
                "burn-in ({burn_in}) exceeds the recorded iterations ({})",
                history.len()
            ),
        )
        .into());
    }
    Ok(())
}

/// Flattens one level after dropping `burn_in` iterations, walker-major.
pub fn flatten_level(history: &ChainHistory, level: usize, burn_in: usize) -> FlatLevel {
    let retained = history.len().saturating_sub(burn_in);
    let capacity = history.n_walkers() * retained;
    let mut rows = Vec::with_capacity(capacity);
    let mut log_posteriors = Vec::with_capacity(capacity);
    for walker in 0..history.n_walkers() {
        for iteration in burn_in..history.len() {
            let x = history.position(iteration, level, walker);
            let mut row = Vec::with_capacity(x.len() + 1);
            row.extend_from_slice(x);
            row.push(1.0 - x[1..].iter().sum::<f64>());
            rows.push(row);
            log_posteriors.push(history.log_posterior(iteration, level, walker));
        }
    }
    FlatLevel {
        rows,
        log_posteriors,
    }
}

fn beta_moments(
    samples: &[&PosteriorSample],
    n_channels: usize,
) -> (Option<Vec<f64>>, Option<Vec<f64>>) {
    if samples.is_empty() {
        return (None, None);
    }
    let n = samples.len() as f64;
    let mut mean = vec![0.0; n_channels];
    for sample in samples {
        for (m, b) in mean.iter_mut().zip(&sample.betas) {
            *m += b / n;
        }
    }
    let mut var = vec![0.0; n_channels];
    for sample in samples {
        for ((v, b), m) in var.iter_mut().zip(&sample.betas).zip(&mean) {
            *v += (b - m).powi(2) / n;
        }
    }
    (Some(mean), Some(var.into_iter().map(f64::sqrt).collect()))
}
