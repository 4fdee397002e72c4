#![deny(missing_docs)]

//! Parallel-tempered ensemble sampler for population model selection.
//!
//! The sampler explores a joint space of a discrete model index and the
//! branching fractions of that model's formation channels. Channel densities
//! are frozen once against the observations; every likelihood call afterwards
//! is a weighted sum over the frozen table.

/// Analysis helpers for inspecting run artefacts.
pub mod analysis;
/// Validated run arguments and reference-model resolution.
pub mod args;
/// Frozen per-channel densities.
pub mod cache;
/// Checkpoint serialization helpers and payload structures.
pub mod checkpoint;
/// YAML configuration schema and defaults.
pub mod config;
/// Shared inference state built once per run.
pub mod context;
/// Posterior decoding of raw chain history.
pub mod decode;
/// Deterministic seed derivation helpers.
pub mod determinism;
/// Stretch move and walker ensembles.
pub mod ensemble;
/// Iteration-major chain storage.
pub mod history;
/// Sampling kernel and public `run`/`resume` entry points.
pub mod kernel;
/// Mixture likelihood and the sampler target trait.
pub mod likelihood;
/// Model directory loader.
pub mod loader;
/// Run manifest serialization helpers.
pub mod manifest;
/// Metrics collection and CSV export.
pub mod metrics;
/// End-to-end selection runs.
pub mod pipeline;
/// Population models and channels.
pub mod population;
/// Joint prior over model index and branching fractions.
pub mod prior;
/// Result container.
pub mod output;
/// Mock and real observation sources.
pub mod sources;
/// Parallel tempering ladder helpers.
pub mod tempering;

mod serde_log;

pub use args::{ReferenceModel, RunArgs};
pub use cache::{DensityCache, FrozenEvaluation};
pub use config::{CheckpointConfig, LadderConfig, LadderPolicy, OutputConfig, RunConfig, SeedPolicy};
pub use context::InferenceContext;
pub use decode::{ModelSummary, PosteriorDecoder, PosteriorSample, PosteriorSummary};
pub use ensemble::{EnsembleState, StretchMove, Walker};
pub use history::ChainHistory;
pub use kernel::{resume, run, ProgressInfo, RunControl, RunSummary};
pub use likelihood::{LogDensity, MixtureLikelihood};
pub use output::ResultContainer;
pub use pipeline::{run_selection, SelectionOutcome};
pub use population::{Channel, PopulationModel};
pub use prior::{BetaVector, MixturePoint, MixturePrior, ModelIndex};
pub use sources::Smearing;
