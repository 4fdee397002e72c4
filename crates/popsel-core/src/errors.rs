//! Structured error types shared across popsel crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to the non-configuration [`PopError`] families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (identifiers, sizes, etc.).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

/// Invalid or missing run inputs, always detected before sampling starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ConfigurationError {
    /// A population model does not carry the same channel set as the first model.
    #[error("model '{model}' has channels {found:?}, expected {expected:?}")]
    MismatchedChannels {
        /// Offending model name.
        model: String,
        /// Channel names of the first model.
        expected: Vec<String>,
        /// Channel names of the offending model.
        found: Vec<String>,
    },
    /// The requested reference model is not among the loaded models.
    #[error("unknown model '{name}' (available: {available:?})")]
    UnknownModel {
        /// Requested name.
        name: String,
        /// Names of the loaded models.
        available: Vec<String>,
    },
    /// An inference parameter is not provided by a model or observation file.
    #[error("unknown inference parameter '{name}' in {source_label}")]
    UnknownParameter {
        /// Requested parameter.
        name: String,
        /// File or model that lacks the parameter.
        source_label: String,
    },
    /// The branching-fraction vector has the wrong number of entries.
    #[error("expected {expected} branching fractions (or {expected_min} with implied complement), got {found}")]
    BranchingLength {
        /// Full channel count.
        expected: usize,
        /// Channel count minus one.
        expected_min: usize,
        /// Number of supplied values.
        found: usize,
    },
    /// The branching fractions do not sum into the admissible range.
    #[error("branching fractions sum to {sum}, outside (0, 1]")]
    BranchingSum {
        /// Observed sum.
        sum: f64,
    },
    /// Mock observations were requested without an observation count.
    #[error("an observation count is required when no real observations are supplied")]
    MissingObservationCount,
    /// Mock observations were requested without branching fractions.
    #[error("branching fractions are required when no real observations are supplied")]
    MissingBranchingFractions,
    /// A numeric sampler or run setting is out of range.
    #[error("invalid setting '{field}': {reason}")]
    InvalidSetting {
        /// Setting name as exposed to the user.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ConfigurationError {
    /// Stable machine readable code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            ConfigurationError::MismatchedChannels { .. } => "mismatched-channels",
            ConfigurationError::UnknownModel { .. } => "unknown-model",
            ConfigurationError::UnknownParameter { .. } => "unknown-parameter",
            ConfigurationError::BranchingLength { .. } => "branching-length",
            ConfigurationError::BranchingSum { .. } => "branching-sum",
            ConfigurationError::MissingObservationCount => "missing-observation-count",
            ConfigurationError::MissingBranchingFractions => "missing-branching-fractions",
            ConfigurationError::InvalidSetting { .. } => "invalid-setting",
        }
    }

    /// Convenience constructor for [`ConfigurationError::InvalidSetting`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigurationError::InvalidSetting {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Canonical error type for the popsel engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum PopError {
    /// Invalid run inputs; fatal and reported before any sampling work.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
    /// Density cache contract violations (e.g. evaluation before freezing).
    #[error("cache error: {0}")]
    Cache(ErrorInfo),
    /// Density model and observation data errors.
    #[error("model error: {0}")]
    Model(ErrorInfo),
    /// Sampler state and kernel errors.
    #[error("sampler error: {0}")]
    Sampler(ErrorInfo),
    /// Randomness and seeding errors.
    #[error("rng error: {0}")]
    Rng(ErrorInfo),
    /// Serialization, schema and file errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl PopError {
    /// Returns the structured payload, if the family carries one.
    pub fn info(&self) -> Option<&ErrorInfo> {
        match self {
            PopError::Configuration(_) => None,
            PopError::Cache(info)
            | PopError::Model(info)
            | PopError::Sampler(info)
            | PopError::Rng(info)
            | PopError::Serde(info) => Some(info),
        }
    }

    /// Stable machine readable code regardless of family.
    pub fn code(&self) -> &str {
        match self {
            PopError::Configuration(err) => err.code(),
            PopError::Cache(info)
            | PopError::Model(info)
            | PopError::Sampler(info)
            | PopError::Rng(info)
            | PopError::Serde(info) => &info.code,
        }
    }

    /// Whether the error belongs to the configuration family.
    pub fn is_configuration(&self) -> bool {
        matches!(self, PopError::Configuration(_))
    }
}
