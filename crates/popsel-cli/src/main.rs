//! `popsel` command line: population model selection runs and result summaries.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand};
use popsel_mcmc::analysis::summarize_results_file;
use popsel_mcmc::output::SamplerDiagnostics;
use popsel_mcmc::{
    run_selection, PosteriorSummary, ProgressInfo, RunArgs, RunConfig, RunControl, Smearing,
};

#[derive(Parser, Debug)]
#[command(name = "popsel", about = "Population model selection with a tempered ensemble sampler")]
#[command(version)]
struct Cli {
    /// Log verbosity level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: tracing::Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sample the joint model/branching-fraction posterior and write a result container.
    Select(SelectArgs),
    /// Print the per-model summary of an existing result container.
    Summarize(SummarizeArgs),
}

#[derive(ClapArgs, Debug)]
struct SelectArgs {
    /// Directory holding one `<model>.json` file per population model.
    #[arg(long)]
    models: PathBuf,
    /// Comma-separated inference parameters, in column order.
    #[arg(long, value_delimiter = ',', required = true)]
    params: Vec<String>,
    /// Reference model used to draw mock observations.
    #[arg(long)]
    true_model: Option<String>,
    /// Comma-separated branching fractions of the reference model.
    #[arg(long, value_delimiter = ',')]
    betas: Option<Vec<f64>>,
    /// Number of mock observations.
    #[arg(long)]
    n_obs: Option<usize>,
    /// Measurement noise on mock observations: `none` or `gaussian:<fraction>`.
    #[arg(long, default_value = "none")]
    smear: Smearing,
    /// Real observation file; replaces mock observations.
    #[arg(long)]
    observations: Option<PathBuf>,
    /// Iterations discarded before summarising.
    #[arg(long, default_value_t = 500)]
    burnin: usize,
    /// Total sampler iterations.
    #[arg(long, default_value_t = 2000)]
    iterations: usize,
    /// Number of temperature levels.
    #[arg(long, default_value_t = 4)]
    temps: usize,
    /// Walkers per temperature level (even, at least 4).
    #[arg(long, default_value_t = 32)]
    walkers: usize,
    /// Master seed.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Output directory for the result container and run artefacts.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Optional YAML sampler configuration; command line values take precedence.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Continue from the newest checkpoint an earlier run left in `--out`.
    #[arg(long, requires = "out")]
    resume: bool,
}

#[derive(ClapArgs, Debug)]
struct SummarizeArgs {
    /// Result container written by `popsel select`.
    #[arg(long)]
    results: PathBuf,
    /// Emit the summary as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

impl SelectArgs {
    fn to_run_args(&self) -> RunArgs {
        RunArgs {
            model_dir: self.models.clone(),
            parameters: self.params.clone(),
            true_model: self.true_model.clone(),
            betas: self.betas.clone(),
            n_obs: self.n_obs,
            smearing: self.smear,
            observations: self.observations.clone(),
            burn_in: self.burnin,
            iterations: self.iterations,
            temperatures: self.temps,
            walkers: self.walkers,
            seed: self.seed,
            output_dir: self.out.clone(),
            resume: self.resume,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Select(args) => cmd_select(&args),
        Command::Summarize(args) => cmd_summarize(&args),
    }
}

fn cmd_select(args: &SelectArgs) -> Result<(), Box<dyn Error>> {
    let config = load_config(args.config.as_deref())?;
    let run_args = args.to_run_args();

    let step = (run_args.iterations / 10).max(1);
    let mut progress = |info: &ProgressInfo| {
        if info.iteration % step == 0 || info.iteration == info.total {
            tracing::info!(
                iteration = info.iteration,
                total = info.total,
                cold_mean_log_posterior = info.cold_mean_log_posterior,
                "sampling"
            );
        }
    };
    let control = RunControl {
        cancel: None,
        progress: Some(&mut progress),
    };

    let outcome = run_selection(&run_args, config, control)?;
    print_diagnostics(&outcome.container.diagnostics);
    print_summary(&outcome.container.summary);
    if let Some(path) = &outcome.results_path {
        println!("results: {}", path.display());
    }
    Ok(())
}

fn cmd_summarize(args: &SummarizeArgs) -> Result<(), Box<dyn Error>> {
    let (container, summary) = summarize_results_file(&args.results)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if let Some(reference) = &container.reference {
        println!("reference model: {}", reference.name);
    }
    print_diagnostics(&container.diagnostics);
    print_summary(&summary);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RunConfig, Box<dyn Error>> {
    match path {
        Some(path) => Ok(RunConfig::load(path)?),
        None => Ok(RunConfig::default()),
    }
}

fn print_diagnostics(diagnostics: &SamplerDiagnostics) {
    println!(
        "iterations: {}{}",
        diagnostics.iterations_completed,
        if diagnostics.cancelled { " (cancelled)" } else { "" }
    );
    for (level, (temperature, rate)) in diagnostics
        .temperatures
        .iter()
        .zip(&diagnostics.acceptance_rates)
        .enumerate()
    {
        println!("  level {level}: T = {temperature:.3}, acceptance = {rate:.3}");
    }
}

fn print_summary(summary: &PosteriorSummary) {
    println!("posterior samples: {}", summary.total_samples);
    let header: Vec<String> = summary
        .channel_names
        .iter()
        .map(|name| format!("{:>18}", format!("beta_{name}")))
        .collect();
    println!("{:<16} {:>8} {:>9} {}", "model", "samples", "fraction", header.join(" "));
    for model in &summary.models {
        let betas: Vec<String> = match (&model.mean_betas, &model.std_betas) {
            (Some(mean), Some(std)) => mean
                .iter()
                .zip(std)
                .map(|(m, s)| format!("{:>18}", format!("{m:.3} +/- {s:.3}")))
                .collect(),
            _ => summary.channel_names.iter().map(|_| format!("{:>18}", "-")).collect(),
        };
        println!(
            "{:<16} {:>8} {:>9.4} {}",
            model.label,
            model.sample_count,
            model.fraction,
            betas.join(" ")
        );
    }
    if let Some(best) = summary.plurality() {
        println!("preferred model: {} ({:.1}%)", best.label, 100.0 * best.fraction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_parses_comma_lists_and_smearing() {
        let cli = Cli::try_parse_from([
            "popsel",
            "select",
            "--models",
            "models",
            "--params",
            "mchirp,chieff",
            "--true-model",
            "A",
            "--betas",
            "0.7,0.3",
            "--n-obs",
            "100",
            "--smear",
            "gaussian:0.1",
            "--walkers",
            "16",
        ])
        .unwrap();
        let Command::Select(args) = cli.command else {
            panic!("expected select");
        };
        let run_args = args.to_run_args();
        assert_eq!(run_args.parameters, vec!["mchirp", "chieff"]);
        assert_eq!(run_args.betas, Some(vec![0.7, 0.3]));
        assert_eq!(run_args.n_obs, Some(100));
        assert_eq!(run_args.smearing, Smearing::Gaussian { fraction: 0.1 });
        assert_eq!(run_args.walkers, 16);
        assert_eq!(run_args.iterations, 2000);
        assert_eq!(cli.log_level, tracing::Level::INFO);
    }

    #[test]
    fn malformed_values_are_rejected_by_the_parser() {
        let base = ["popsel", "select", "--models", "m", "--params", "x"];
        let with = |extra: &[&str]| {
            let argv: Vec<&str> = base.iter().chain(extra).copied().collect();
            Cli::try_parse_from(argv)
        };
        assert!(with(&["--smear", "uniform"]).is_err());
        assert!(with(&["--betas", "0.5,abc"]).is_err());
        assert!(with(&["--walkers", "-4"]).is_err());
        assert!(with(&[]).is_ok());
        assert!(with(&["--resume"]).is_err());
        assert!(with(&["--resume", "--out", "run"]).is_ok());
        assert!(Cli::try_parse_from(["popsel", "select", "--models", "m"]).is_err());
    }

    #[test]
    fn summarize_and_log_level_are_global() {
        let cli = Cli::try_parse_from([
            "popsel",
            "summarize",
            "--results",
            "out/results.json",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
        let Command::Summarize(args) = cli.command else {
            panic!("expected summarize");
        };
        assert_eq!(args.results, PathBuf::from("out/results.json"));
        assert!(!args.json);
    }
}
