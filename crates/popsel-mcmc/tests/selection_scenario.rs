mod support;

use popsel_mcmc::decode::flatten_level;
use popsel_mcmc::{run, InferenceContext, PosteriorDecoder, RunControl};

use support::{sample_models, sample_observations, small_config, standard_normal_draws};

fn scenario_context() -> InferenceContext {
    let values = standard_normal_draws(100, 2024);
    InferenceContext::build(sample_models(), sample_observations(&values)).unwrap()
}

#[test]
fn data_from_channel_x_of_a_selects_model_a() {
    let context = scenario_context();
    let likelihood = context.likelihood();
    let config = small_config(500, 250, 20, 3);

    let summary = run(&config, 17, &likelihood, RunControl::default()).unwrap();
    assert_eq!(summary.iterations_completed, 500);
    assert!(!summary.cancelled);

    let decoder = PosteriorDecoder::new(
        context.model_names().to_vec(),
        context.channel_names().to_vec(),
    );
    let posterior = decoder.summarize(&summary.history, config.burn_in).unwrap();
    let best = posterior.plurality().unwrap();
    assert_eq!(best.label, "A");

    let mean_betas = best.mean_betas.as_ref().unwrap();
    assert!((mean_betas[0] - 1.0).abs() < 0.1, "mean beta_X = {}", mean_betas[0]);
    assert_eq!(posterior.total_samples, 20 * 250);
}

#[test]
fn burn_in_removal_keeps_walkers_times_retained_iterations() {
    let context = scenario_context();
    let likelihood = context.likelihood();
    let config = small_config(30, 10, 8, 2);
    let summary = run(&config, 5, &likelihood, RunControl::default()).unwrap();

    let decoder = PosteriorDecoder::new(
        context.model_names().to_vec(),
        context.channel_names().to_vec(),
    );
    let levels = decoder.decode(&summary.history, 10).unwrap();
    assert_eq!(levels.len(), 2);
    for level in &levels {
        assert_eq!(level.len(), 8 * (30 - 10));
        assert_eq!(level.log_posteriors.len(), 8 * (30 - 10));
    }

    // walker-major: the first retained rows all come from walker 0
    let cold = flatten_level(&summary.history, 0, 10);
    for (i, row) in cold.rows.iter().take(20).enumerate() {
        assert_eq!(&row[..2], summary.history.position(10 + i, 0, 0));
    }

    assert_eq!(decoder.decode(&summary.history, 30).unwrap()[0].len(), 0);
    let err = decoder.decode(&summary.history, 31).unwrap_err();
    assert!(err.is_configuration());
    assert_eq!(err.code(), "invalid-setting");
}

#[test]
fn decoded_fractions_sum_to_one() {
    let context = scenario_context();
    let likelihood = context.likelihood();
    let config = small_config(60, 20, 8, 2);
    let summary = run(&config, 99, &likelihood, RunControl::default()).unwrap();

    let decoder = PosteriorDecoder::new(
        context.model_names().to_vec(),
        context.channel_names().to_vec(),
    );
    let samples = decoder.cold_samples(&summary.history, 20).unwrap();
    assert_eq!(samples.len(), 8 * 40);
    for sample in &samples {
        assert_eq!(sample.betas.len(), 2);
        let total: f64 = sample.betas.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(sample.betas.iter().all(|b| *b >= 0.0));
        assert_eq!(sample.model_label, context.model_names()[sample.model_index]);
    }
}
