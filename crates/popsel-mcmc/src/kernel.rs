use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use popsel_core::errors::ErrorInfo;
use popsel_core::{PopError, RngHandle};
use serde::{Deserialize, Serialize};

use crate::checkpoint::{self, CheckpointPayload};
use crate::config::RunConfig;
use crate::determinism;
use crate::ensemble::{self, EnsembleState, StretchMove};
use crate::history::ChainHistory;
use crate::likelihood::LogDensity;
use crate::metrics::{MetricSample, MetricsRecorder};
use crate::tempering;

/// Snapshot handed to the progress callback after each iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressInfo {
    /// Completed iterations, this one included.
    pub iteration: usize,
    /// Total iterations of the run.
    pub total: usize,
    /// Cumulative stretch-move acceptance rate per level.
    pub acceptance_rates: Vec<f64>,
    /// Mean finite log-posterior of the cold level.
    pub cold_mean_log_posterior: f64,
}

/// Optional hooks a caller can attach to a run.
#[derive(Default)]
pub struct RunControl<'a> {
    /// Checked after every completed iteration; `true` stops the run.
    pub cancel: Option<&'a AtomicBool>,
    /// Invoked after every completed iteration.
    pub progress: Option<&'a mut dyn FnMut(&ProgressInfo)>,
}

impl RunControl<'_> {
    fn cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Summary returned to callers after a run completes or is cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Temperatures of the ladder, coldest first.
    pub temperatures: Vec<f64>,
    /// Stretch-move acceptance rate per level.
    pub acceptance_rates: Vec<f64>,
    /// Mean exchange acceptance probability per adjacent level pair.
    pub exchange_acceptance: Vec<f64>,
    /// Fraction of accepted exchanges per adjacent level pair.
    pub exchange_rates: Vec<f64>,
    /// Iterations actually completed.
    pub iterations_completed: usize,
    /// Whether the run stopped on a cancellation request.
    pub cancelled: bool,
    /// Chain history of every level.
    pub history: ChainHistory,
    /// Sampler state after the last completed iteration.
    pub final_state: EnsembleState,
    /// Metrics CSV written during the run.
    pub metrics_path: Option<PathBuf>,
    /// Checkpoint files retained at the end of the run.
    pub checkpoints: Vec<PathBuf>,
    /// Metrics samples collected by this invocation.
    pub samples: Vec<MetricSample>,
}

struct ExchangeTotals {
    attempted: Vec<usize>,
    accepted: Vec<usize>,
    probability: Vec<f64>,
}

impl ExchangeTotals {
    fn new(pairs: usize) -> Self {
        Self {
            attempted: vec![0; pairs],
            accepted: vec![0; pairs],
            probability: vec![0.0; pairs],
        }
    }
}

/// Runs the parallel-tempered ensemble sampler from scratch.
///
/// The configuration is validated against `target` before any walker is drawn.
pub fn run<T: LogDensity + ?Sized>(
    config: &RunConfig,
    seed: u64,
    target: &T,
    control: RunControl<'_>,
) -> Result<RunSummary, PopError> {
    config.validate(target.dim())?;
    let ladder = tempering::build_ladder(&config.ladder);
    tracing::info!(
        iterations = config.iterations,
        walkers = config.walkers,
        levels = ladder.len(),
        dim = target.dim(),
        seed,
        "starting ensemble run"
    );
    let state = EnsembleState::initialize(target, &ladder, config.walkers, seed)?;
    let history =
        ChainHistory::with_capacity(ladder.len(), config.walkers, target.dim(), config.iterations);
    let exchanges = ExchangeTotals::new(ladder.len().saturating_sub(1));
    run_from_state(config, seed, target, state, history, exchanges, control)
}

/// Resumes a run from a checkpoint file.
///
/// The resumed run reproduces the history an uninterrupted run would have
/// produced with the same configuration and seed.
pub fn resume<T: LogDensity + ?Sized>(
    path: &Path,
    target: &T,
    control: RunControl<'_>,
) -> Result<RunSummary, PopError> {
    let payload = CheckpointPayload::load(path)?;
    payload.config.validate(target.dim())?;
    payload.validate(target.dim())?;
    if payload.iteration > payload.config.iterations {
        return Err(PopError::Serde(
            ErrorInfo::new("checkpoint-inconsistent", "checkpoint is past the configured iteration count")
                .with_context("path", path.display().to_string())
                .with_context("iteration", payload.iteration.to_string()),
        ));
    }
    tracing::info!(
        path = %path.display(),
        iteration = payload.iteration,
        "resuming ensemble run from checkpoint"
    );
    let exchanges = ExchangeTotals {
        attempted: payload.exchange_attempted,
        accepted: payload.exchange_accepted,
        probability: payload.exchange_probability,
    };
    run_from_state(
        &payload.config,
        payload.master_seed,
        target,
        payload.state,
        payload.history,
        exchanges,
        control,
    )
}

fn run_from_state<T: LogDensity + ?Sized>(
    config: &RunConfig,
    seed: u64,
    target: &T,
    mut state: EnsembleState,
    mut history: ChainHistory,
    mut exchanges: ExchangeTotals,
    mut control: RunControl<'_>,
) -> Result<RunSummary, PopError> {
    let stretch = StretchMove::new(config.stretch_scale)?;
    let mut recorder = MetricsRecorder::new();
    let mut checkpoints = Vec::new();
    let mut cancelled = false;
    let start = history.len();

    for iteration in start..config.iterations {
        for (index, level) in state.levels.iter_mut().enumerate() {
            let mut rng = RngHandle::from_seed(determinism::level_seed(seed, index, iteration));
            ensemble::update_level(target, &stretch, level, &mut rng);
        }

        if (iteration + 1) % config.swap_interval == 0 {
            perform_exchanges(seed, iteration, &mut state, &mut exchanges);
        }

        history.push(&state);
        let completed = iteration + 1;

        if (completed - start) % config.metrics_thinning == 0 {
            recorder.record(completed, &state);
        }

        if config.checkpoint.interval > 0 && completed % config.checkpoint.interval == 0 {
            if let Some(root) = &config.output.run_directory {
                let path = checkpoint::checkpoint_path(&root.join(&config.output.checkpoint_dir), completed);
                write_checkpoint(config, seed, completed, &state, &history, &exchanges, &path)?;
                checkpoints.push(path);
                enforce_checkpoint_retention(&mut checkpoints, config.checkpoint.max_to_keep)?;
            }
        }

        let acceptance_rates: Vec<f64> = state.levels.iter().map(|l| l.acceptance_rate()).collect();
        tracing::debug!(
            iteration = completed,
            cold_acceptance = acceptance_rates[0],
            "iteration complete"
        );
        if let Some(progress) = control.progress.as_mut() {
            progress(&ProgressInfo {
                iteration: completed,
                total: config.iterations,
                acceptance_rates,
                cold_mean_log_posterior: state.cold().mean_log_posterior(),
            });
        }

        if control.cancelled() {
            tracing::warn!(
                iteration = completed,
                total = config.iterations,
                "run cancelled, returning truncated history"
            );
            cancelled = true;
            break;
        }
    }

    let metrics_path = match &config.output.run_directory {
        Some(root) => {
            let path = root.join(&config.output.metrics_file);
            recorder.write_csv(&path).map_err(|err| {
                PopError::Serde(
                    ErrorInfo::new("metrics-write", err.to_string())
                        .with_context("path", path.display().to_string()),
                )
            })?;
            Some(path)
        }
        None => None,
    };

    let summary = RunSummary {
        temperatures: state.temperatures(),
        acceptance_rates: state.levels.iter().map(|l| l.acceptance_rate()).collect(),
        exchange_acceptance: ratios(&exchanges.probability, &exchanges.attempted),
        exchange_rates: ratios(
            &exchanges.accepted.iter().map(|&n| n as f64).collect::<Vec<_>>(),
            &exchanges.attempted,
        ),
        iterations_completed: history.len(),
        cancelled,
        history,
        final_state: state,
        metrics_path,
        checkpoints,
        samples: recorder.samples().to_vec(),
    };
    tracing::info!(
        iterations = summary.iterations_completed,
        cold_acceptance = summary.acceptance_rates.first().copied().unwrap_or(0.0),
        cancelled = summary.cancelled,
        "ensemble run finished"
    );
    Ok(summary)
}

fn perform_exchanges(
    seed: u64,
    iteration: usize,
    state: &mut EnsembleState,
    totals: &mut ExchangeTotals,
) {
    for pair in 0..state.levels.len().saturating_sub(1) {
        let mut rng = RngHandle::from_seed(determinism::exchange_seed(seed, iteration, pair));
        let (colder, hotter) = state.levels.split_at_mut(pair + 1);
        let tally = tempering::swap_levels(&mut colder[pair], &mut hotter[0], &mut rng);
        totals.attempted[pair] += tally.attempted;
        totals.accepted[pair] += tally.accepted;
        totals.probability[pair] += tally.probability_sum;
    }
}

fn ratios(numerators: &[f64], counts: &[usize]) -> Vec<f64> {
    numerators
        .iter()
        .zip(counts)
        .map(|(total, &count)| if count == 0 { 0.0 } else { total / count as f64 })
        .collect()
}

fn write_checkpoint(
    config: &RunConfig,
    seed: u64,
    completed: usize,
    state: &EnsembleState,
    history: &ChainHistory,
    exchanges: &ExchangeTotals,
    path: &Path,
) -> Result<(), PopError> {
    let payload = CheckpointPayload {
        iteration: completed,
        config: config.clone(),
        master_seed: seed,
        state: state.clone(),
        history: history.clone(),
        exchange_attempted: exchanges.attempted.clone(),
        exchange_accepted: exchanges.accepted.clone(),
        exchange_probability: exchanges.probability.clone(),
    };
    payload.store(path)?;
    tracing::debug!(path = %path.display(), iteration = completed, "checkpoint written");
    Ok(())
}

fn enforce_checkpoint_retention(paths: &mut Vec<PathBuf>, max_to_keep: usize) -> Result<(), PopError> {
    while paths.len() > max_to_keep {
        let path = paths.remove(0);
        std::fs::remove_file(&path).map_err(|err| {
            PopError::Serde(
                ErrorInfo::new("checkpoint-remove", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
    }
    Ok(())
}
