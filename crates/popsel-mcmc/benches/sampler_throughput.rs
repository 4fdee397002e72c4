use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use popsel_core::{GaussianKde, ObservationSet, RngHandle};
use rand::Rng;
use rand_distr::StandardNormal;

use popsel_mcmc::{run, InferenceContext, PopulationModel, RunConfig, RunControl};

fn sample_kde(rng: &mut RngHandle, centre: f64) -> Arc<GaussianKde> {
    let points = (0..500)
        .map(|_| {
            let z: f64 = rng.sample(StandardNormal);
            vec![centre + z]
        })
        .collect();
    Arc::new(GaussianKde::new(points, None).unwrap())
}

fn sample_context() -> InferenceContext {
    let mut rng = RngHandle::from_seed(42);
    let models = [("A", 0.0, 5.0), ("B", 2.0, 8.0), ("C", -1.0, 3.0)]
        .into_iter()
        .map(|(name, x, y)| {
            let mut model = PopulationModel::new(name);
            model.insert_channel("X", sample_kde(&mut rng, x)).unwrap();
            model.insert_channel("Y", sample_kde(&mut rng, y)).unwrap();
            model
        })
        .collect();
    let rows = (0..200)
        .map(|_| {
            let z: f64 = rng.sample(StandardNormal);
            vec![z]
        })
        .collect();
    let observations = ObservationSet::new(vec!["x".into()], rows).unwrap();
    InferenceContext::build(models, observations).unwrap()
}

fn bench_sampler(c: &mut Criterion) {
    let context = sample_context();
    let likelihood = context.likelihood();
    let mut config = RunConfig::default();
    config.iterations = 50;
    config.burn_in = 10;
    config.walkers = 32;
    config.ladder.levels = 4;

    c.bench_function("likelihood_eval", |b| {
        b.iter(|| likelihood.log_likelihood(&[0.5, 0.7]))
    });

    c.bench_function("ensemble_run", |b| {
        b.iter(|| {
            let _ = run(&config, 42, &likelihood, RunControl::default()).unwrap();
        })
    });
}

criterion_group!(benches, bench_sampler);
criterion_main!(benches);
