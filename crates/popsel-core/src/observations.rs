//! Immutable observation sets shared by every frozen cache and likelihood call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, PopError};
use crate::provenance::sha256_hex;

/// Ordered, immutable sequence of observation vectors over named parameters.
///
/// Cloning is cheap: rows live behind an `Arc` and are never mutated once the
/// set is built.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    parameters: Arc<[String]>,
    rows: Arc<[Box<[f64]>]>,
}

impl ObservationSet {
    /// Builds a set from parameter names and row vectors.
    ///
    /// Every row must carry one finite value per parameter.
    pub fn new(parameters: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, PopError> {
        if parameters.is_empty() {
            return Err(PopError::Model(ErrorInfo::new(
                "observation-parameters",
                "observation set needs at least one inference parameter",
            )));
        }
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != parameters.len() {
                return Err(PopError::Model(
                    ErrorInfo::new("observation-shape", "observation length mismatch")
                        .with_context("row", idx.to_string())
                        .with_context("expected", parameters.len().to_string())
                        .with_context("found", row.len().to_string()),
                ));
            }
            if row.iter().any(|value| !value.is_finite()) {
                return Err(PopError::Model(
                    ErrorInfo::new("observation-non-finite", "observation holds a non-finite value")
                        .with_context("row", idx.to_string()),
                ));
            }
        }
        Ok(Self {
            parameters: parameters.into(),
            rows: rows.into_iter().map(Vec::into_boxed_slice).collect(),
        })
    }

    /// Names of the inference parameters, in column order.
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Number of inference parameters per observation.
    pub fn dimension(&self) -> usize {
        self.parameters.len()
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set holds no observations.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns a single observation.
    pub fn get(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(|row| &row[..])
    }

    /// Iterates over the observations in order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        self.rows.iter().map(|row| &row[..])
    }

    /// SHA-256 fingerprint over parameter names and the bit patterns of every value.
    pub fn fingerprint(&self) -> String {
        let mut bytes = Vec::with_capacity(self.rows.len() * self.dimension() * 8 + 64);
        for name in self.parameters.iter() {
            bytes.extend_from_slice(name.as_bytes());
            bytes.push(0);
        }
        for row in self.rows.iter() {
            for value in row.iter() {
                bytes.extend_from_slice(&value.to_bits().to_le_bytes());
            }
        }
        sha256_hex(&bytes)
    }

    /// Converts the set into its serializable record form.
    pub fn to_record(&self) -> ObservationRecord {
        ObservationRecord {
            parameters: self.parameters.to_vec(),
            observations: self.rows.iter().map(|row| row.to_vec()).collect(),
        }
    }
}

/// Serializable form of an [`ObservationSet`], used for persistence and real-data input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Parameter names in column order.
    pub parameters: Vec<String>,
    /// One vector per observation.
    pub observations: Vec<Vec<f64>>,
}

impl TryFrom<ObservationRecord> for ObservationSet {
    type Error = PopError;

    fn try_from(record: ObservationRecord) -> Result<Self, Self::Error> {
        ObservationSet::new(record.parameters, record.observations)
    }
}
