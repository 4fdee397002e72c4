use std::path::PathBuf;

use popsel_core::errors::ErrorInfo;
use popsel_core::{sha256_hex, PopError, RngHandle, RunProvenance, SchemaVersion};

use crate::args::RunArgs;
use crate::config::RunConfig;
use crate::context::InferenceContext;
use crate::decode::PosteriorDecoder;
use crate::determinism;
use crate::kernel::{self, RunControl, RunSummary};
use crate::loader;
use crate::manifest::{relative_to, RunManifest};
use crate::output::{sample_columns, ResultContainer, SamplerDiagnostics};
use crate::sources;

/// Everything produced by [`run_selection`].
#[derive(Debug)]
pub struct SelectionOutcome {
    /// The result container (also written to disk when an output directory is set).
    pub container: ResultContainer,
    /// Raw sampler summary, full chain history included.
    pub run: RunSummary,
    /// Where the container was written.
    pub results_path: Option<PathBuf>,
    /// Where the manifest was written.
    pub manifest_path: Option<PathBuf>,
}

/// Runs a complete model-selection pass.
///
/// Loads the models, resolves the reference model, obtains observations
/// (real or mock), freezes every channel, samples, decodes the cold chain
/// and persists the result container plus manifest. Every configuration
/// problem surfaces before the first sampler iteration.
pub fn run_selection(
    args: &RunArgs,
    mut config: RunConfig,
    control: RunControl<'_>,
) -> Result<SelectionOutcome, PopError> {
    args.validate_inputs()?;
    args.apply_to(&mut config);

    let mut models = loader::load_model_directory(&args.model_dir, &args.parameters)?;
    let reference = args.resolve_reference(&models)?;
    if let Some(reference) = &reference {
        if let (Some(betas), Some(model)) = (
            &reference.betas,
            models.iter_mut().find(|m| m.name() == reference.name),
        ) {
            model.assign_branching_fractions(betas)?;
        }
    }

    let observations = match &args.observations {
        Some(path) => sources::load_observations(path, &args.parameters)?,
        None => {
            let reference = reference
                .as_ref()
                .and_then(|r| models.iter().find(|m| m.name() == r.name))
                .ok_or_else(|| {
                    PopError::Sampler(ErrorInfo::new(
                        "reference-missing",
                        "mock observations need a resolved reference model",
                    ))
                })?;
            let count = args.n_obs.unwrap_or_default();
            let mut rng = RngHandle::from_seed(determinism::observation_seed(args.seed));
            sources::mock_observations(reference, &args.parameters, count, args.smearing, &mut rng)?
        }
    };

    let context = InferenceContext::build(models, observations)?;
    let likelihood = context.likelihood();
    config.validate(context.prior().dim())?;

    let input_hash = input_hash(args, &config)?;
    let run = match resume_point(args, &config, &context.observations().fingerprint())? {
        Some(checkpoint) => kernel::resume(&checkpoint, &likelihood, control)?,
        None => kernel::run(&config, args.seed, &likelihood, control)?,
    };

    // a cancelled run may stop before the burn-in ends
    let burn_in = config.burn_in.min(run.iterations_completed);
    let decoder = PosteriorDecoder::new(
        context.model_names().to_vec(),
        context.channel_names().to_vec(),
    );
    let samples = decoder.cold_samples(&run.history, burn_in)?;
    let summary = decoder.summarize_samples(&samples);
    let (columns, log_posterior) = sample_columns(&samples, context.channel_names());
    if let Some(best) = summary.plurality() {
        tracing::info!(
            model = %best.label,
            fraction = best.fraction,
            samples = summary.total_samples,
            "posterior plurality"
        );
    }

    let observation_hash = context.observations().fingerprint();
    let container = ResultContainer {
        schema: SchemaVersion::CURRENT,
        provenance: RunProvenance {
            input_hash,
            observation_hash: observation_hash.clone(),
            seed: args.seed,
            created_at: chrono::Utc::now().to_rfc3339(),
            ..RunProvenance::default()
        }
        .with_tool(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        reference,
        arguments: args.clone(),
        config: config.clone(),
        observations: context.observations().to_record(),
        model_labels: context.model_names().to_vec(),
        channel_names: context.channel_names().to_vec(),
        samples: columns,
        log_posterior,
        summary,
        diagnostics: SamplerDiagnostics {
            temperatures: run.temperatures.clone(),
            acceptance_rates: run.acceptance_rates.clone(),
            exchange_acceptance: run.exchange_acceptance.clone(),
            iterations_completed: run.iterations_completed,
            cancelled: run.cancelled,
        },
    };

    let (results_path, manifest_path) = match &config.output.run_directory {
        Some(root) => {
            let results_path = root.join(&config.output.results_file);
            container.write(&results_path)?;
            let manifest = RunManifest {
                config: config.clone(),
                master_seed: args.seed,
                seed_label: config.seed_policy.label.clone(),
                observation_hash,
                iterations_completed: run.iterations_completed,
                cancelled: run.cancelled,
                results_file: Some(config.output.results_file.clone()),
                metrics_file: run
                    .metrics_path
                    .as_deref()
                    .and_then(|path| relative_to(root, path)),
                checkpoints: run
                    .checkpoints
                    .iter()
                    .filter_map(|path| relative_to(root, path))
                    .collect(),
            };
            let manifest_path = root.join(&config.output.manifest_file);
            manifest.write(&manifest_path)?;
            tracing::info!(results = %results_path.display(), "wrote result container");
            (Some(results_path), Some(manifest_path))
        }
        None => (None, None),
    };

    Ok(SelectionOutcome {
        container,
        run,
        results_path,
        manifest_path,
    })
}

/// Newest checkpoint of an earlier run in the same output directory, when
/// `--resume` was requested and that run is compatible with this one.
fn resume_point(
    args: &RunArgs,
    config: &RunConfig,
    fingerprint: &str,
) -> Result<Option<PathBuf>, PopError> {
    let Some(root) = config.output.run_directory.as_deref().filter(|_| args.resume) else {
        return Ok(None);
    };
    let manifest_path = root.join(&config.output.manifest_file);
    if !manifest_path.exists() {
        tracing::info!(manifest = %manifest_path.display(), "nothing to resume, starting a fresh run");
        return Ok(None);
    }
    let manifest = RunManifest::load(&manifest_path)?;
    let mismatch = |what: &str| {
        PopError::Sampler(
            ErrorInfo::new("resume-mismatch", format!("earlier run used a different {what}"))
                .with_context("manifest", manifest_path.display().to_string())
                .with_hint("drop --resume or pick a fresh output directory"),
        )
    };
    if manifest.observation_hash != fingerprint {
        return Err(mismatch("observation set"));
    }
    if manifest.master_seed != args.seed || manifest.config != *config {
        return Err(mismatch("seed or sampler configuration"));
    }
    let latest = manifest.checkpoint_paths(root).pop();
    if latest.is_none() {
        tracing::info!(manifest = %manifest_path.display(), "earlier run left no checkpoint, starting a fresh run");
    }
    Ok(latest)
}

fn input_hash(args: &RunArgs, config: &RunConfig) -> Result<String, PopError> {
    let json = serde_json::to_vec(&(args, config)).map_err(|err| {
        PopError::Serde(ErrorInfo::new("input-hash", err.to_string()))
    })?;
    Ok(sha256_hex(&json))
}
