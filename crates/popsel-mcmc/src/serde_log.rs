//! JSON cannot carry `-inf`; log-posteriors are written as `null` instead.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn encode(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn decode(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NEG_INFINITY)
}

/// Serializes a single log value.
pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    encode(*value).serialize(serializer)
}

/// Deserializes a single log value.
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Option::<f64>::deserialize(deserializer).map(decode)
}

/// Same encoding for vectors of log values.
pub mod vec {
    use super::*;

    /// Serializes a vector of log values.
    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| encode(*v)))
    }

    /// Deserializes a vector of log values.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        Vec::<Option<f64>>::deserialize(deserializer)
            .map(|values| values.into_iter().map(decode).collect())
    }
}
