#![deny(missing_docs)]

//! Core traits and data types for the population model selection engine.
//!
//! This crate owns the pieces every other popsel crate agrees on: the error
//! taxonomy, the deterministic RNG handle, provenance descriptors, the
//! immutable [`ObservationSet`] and the [`DensityModel`] capability that
//! per-channel density estimators implement.

pub mod artifact;
pub mod density;
pub mod errors;
pub mod observations;
pub mod provenance;
pub mod rng;

pub use artifact::{load_json, store_json, JsonStyle};
pub use density::{DensityModel, GaussianKde};
pub use errors::{ConfigurationError, ErrorInfo, PopError};
pub use observations::{ObservationRecord, ObservationSet};
pub use provenance::{sha256_hex, RunProvenance, SchemaVersion};
pub use rng::{derive_path_seed, RngHandle};
