use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use popsel_mcmc::loader::{ChannelFile, ModelFile};
use popsel_mcmc::ResultContainer;
use tempfile::tempdir;

fn popsel(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_popsel"))
        .args(args)
        .arg("--log-level")
        .arg("warn")
        .output()
        .expect("failed to launch popsel")
}

/// Evenly spread points over `centre +/- 2`.
fn channel(centre: f64) -> ChannelFile {
    ChannelFile {
        samples: (0..200)
            .map(|i| vec![centre - 2.0 + 4.0 * i as f64 / 199.0])
            .collect(),
        bandwidth: None,
        weights: None,
    }
}

fn write_models(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    for (name, x, y) in [("A", 0.0, 6.0), ("B", 3.0, 9.0)] {
        let file = ModelFile {
            parameters: vec!["mchirp".into()],
            channels: [("X".to_string(), channel(x)), ("Y".to_string(), channel(y))]
                .into_iter()
                .collect(),
        };
        fs::write(
            dir.join(format!("{name}.json")),
            serde_json::to_string(&file).unwrap(),
        )
        .unwrap();
    }
}

#[test]
fn select_then_summarize_round_trip() {
    let dir = tempdir().unwrap();
    let models = dir.path().join("models");
    let out = dir.path().join("run");
    write_models(&models);

    let output = popsel(&[
        "select",
        "--models",
        models.to_str().unwrap(),
        "--params",
        "mchirp",
        "--true-model",
        "A",
        "--betas",
        "0.75",
        "--n-obs",
        "40",
        "--burnin",
        "20",
        "--iterations",
        "60",
        "--temps",
        "2",
        "--walkers",
        "8",
        "--seed",
        "11",
        "--out",
        out.to_str().unwrap(),
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("posterior samples: 320"), "{stdout}");

    let results = out.join("results.json");
    let container = ResultContainer::load(&results).unwrap();
    assert_eq!(container.arguments.seed, 11);
    assert_eq!(container.reference.as_ref().unwrap().betas, Some(vec![0.75, 0.25]));
    assert!(out.join("manifest.json").exists());

    let summary = popsel(&["summarize", "--results", results.to_str().unwrap(), "--json"]);
    assert!(summary.status.success());
    let parsed: serde_json::Value = serde_json::from_slice(&summary.stdout).unwrap();
    assert_eq!(parsed["total_samples"], 320);
}

#[test]
fn invalid_inputs_exit_non_zero() {
    let dir = tempdir().unwrap();
    let models = dir.path().join("models");
    write_models(&models);
    let models = models.to_str().unwrap();

    // no observation count for the mock draw
    let output = popsel(&[
        "select", "--models", models, "--params", "mchirp", "--true-model", "A", "--betas", "0.5",
    ]);
    assert!(!output.status.success());

    let output = popsel(&[
        "select", "--models", models, "--params", "mchirp", "--true-model", "Z", "--betas", "0.5",
        "--n-obs", "10",
    ]);
    assert!(!output.status.success());

    let output = popsel(&["select", "--models", models, "--params", "mchirp", "--smear", "uniform"]);
    assert!(!output.status.success());

    let missing = dir.path().join("missing.json");
    let output = popsel(&["summarize", "--results", missing.to_str().unwrap()]);
    assert!(!output.status.success());
}
