use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use popsel_core::errors::{ConfigurationError, ErrorInfo};
use popsel_core::{load_json, GaussianKde, PopError};
use serde::{Deserialize, Serialize};

use crate::population::PopulationModel;

/// On-disk layout of one population model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelFile {
    /// Column names of every channel's samples.
    pub parameters: Vec<String>,
    /// Channels keyed by name, in file order.
    pub channels: IndexMap<String, ChannelFile>,
}

/// Population-synthesis samples of one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFile {
    /// One row per synthetic system, columns as in [`ModelFile::parameters`].
    pub samples: Vec<Vec<f64>>,
    /// Optional kernel bandwidth per file column; Scott's rule when absent.
    #[serde(default)]
    pub bandwidth: Option<Vec<f64>>,
    /// Optional weight per sample row, e.g. a detection probability.
    /// Every row counts equally when absent.
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

impl ModelFile {
    /// Reads a model file from JSON.
    pub fn load(path: &Path) -> Result<Self, PopError> {
        load_json("model", path)
    }

    /// Builds a population model over the requested inference `parameters`.
    ///
    /// Each channel becomes a Gaussian KDE over the selected columns,
    /// weighted by the channel's per-row weights when present.
    pub fn into_model(
        self,
        name: &str,
        parameters: &[String],
    ) -> Result<PopulationModel, PopError> {
        let columns = select_columns(&self.parameters, parameters, name)?;
        let mut model = PopulationModel::new(name);
        for (channel_name, channel) in self.channels {
            if let Some(idx) = channel.samples.iter().position(|row| row.len() != self.parameters.len()) {
                return Err(PopError::Model(
                    ErrorInfo::new("model-sample-shape", "sample row does not match the parameter list")
                        .with_context("model", name)
                        .with_context("channel", channel_name.as_str())
                        .with_context("row", idx.to_string()),
                ));
            }
            let points = channel
                .samples
                .iter()
                .map(|row| columns.iter().map(|&c| row[c]).collect())
                .collect();
            let bandwidths = match channel.bandwidth {
                Some(h) if h.len() == self.parameters.len() => {
                    Some(columns.iter().map(|&c| h[c]).collect())
                }
                Some(h) => {
                    return Err(PopError::Model(
                        ErrorInfo::new("model-bandwidth", "one bandwidth per file parameter is required")
                            .with_context("model", name)
                            .with_context("channel", channel_name.as_str())
                            .with_context("found", h.len().to_string()),
                    ))
                }
                None => None,
            };
            if let Some(w) = channel.weights.as_ref().filter(|w| w.len() != channel.samples.len()) {
                return Err(PopError::Model(
                    ErrorInfo::new("model-weights", "one weight per sample row is required")
                        .with_context("model", name)
                        .with_context("channel", channel_name.as_str())
                        .with_context("rows", channel.samples.len().to_string())
                        .with_context("found", w.len().to_string()),
                ));
            }
            let kde = GaussianKde::weighted(points, channel.weights, bandwidths)?;
            model.insert_channel(channel_name, Arc::new(kde))?;
        }
        Ok(model)
    }
}

/// Maps requested parameter names to column indices of `available`.
pub fn select_columns(
    available: &[String],
    requested: &[String],
    source_label: &str,
) -> Result<Vec<usize>, ConfigurationError> {
    requested
        .iter()
        .map(|name| {
            available
                .iter()
                .position(|p| p == name)
                .ok_or_else(|| ConfigurationError::UnknownParameter {
                    name: name.clone(),
                    source_label: source_label.to_string(),
                })
        })
        .collect()
}

/// Loads one model; its label is the file stem.
pub fn load_model_file(path: &Path, parameters: &[String]) -> Result<PopulationModel, PopError> {
    let name = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            PopError::Serde(
                ErrorInfo::new("model-name", "model file name is not valid UTF-8")
                    .with_context("path", path.display().to_string()),
            )
        })?
        .to_string();
    ModelFile::load(path)?.into_model(&name, parameters)
}

/// Loads every `*.json` model of a directory, sorted by file name.
pub fn load_model_directory(dir: &Path, parameters: &[String]) -> Result<Vec<PopulationModel>, PopError> {
    let entries = fs::read_dir(dir).map_err(|err| {
        PopError::Serde(
            ErrorInfo::new("model-dir-read", err.to_string())
                .with_context("path", dir.display().to_string()),
        )
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            PopError::Serde(
                ErrorInfo::new("model-dir-read", err.to_string())
                    .with_context("path", dir.display().to_string()),
            )
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    if paths.is_empty() {
        return Err(ConfigurationError::invalid(
            "models",
            format!("no *.json model files in {}", dir.display()),
        )
        .into());
    }
    let models = paths
        .iter()
        .map(|path| load_model_file(path, parameters))
        .collect::<Result<Vec<_>, _>>()?;
    tracing::info!(
        directory = %dir.display(),
        n_models = models.len(),
        "loaded population models"
    );
    Ok(models)
}
