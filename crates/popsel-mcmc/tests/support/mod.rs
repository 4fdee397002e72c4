#![allow(dead_code)]

use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use popsel_core::{DensityModel, ObservationSet, PopError, RngHandle};
use popsel_mcmc::{PopulationModel, RunConfig};
use rand::Rng;
use rand_distr::StandardNormal;

/// Exact one-dimensional normal density, counting its evaluations.
#[derive(Debug, Default)]
pub struct NormalDensity {
    pub mean: f64,
    pub sigma: f64,
    pub calls: AtomicUsize,
}

impl NormalDensity {
    pub fn new(mean: f64, sigma: f64) -> Self {
        Self {
            mean,
            sigma,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn pdf(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.sigma;
        (-0.5 * z * z).exp() / (self.sigma * (2.0 * PI).sqrt())
    }
}

impl DensityModel for NormalDensity {
    fn dimension(&self) -> usize {
        1
    }

    fn evaluate(&self, observations: &ObservationSet) -> Result<Vec<f64>, PopError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(observations.iter().map(|row| self.pdf(row[0])).collect())
    }

    fn draw(&self, rng: &mut RngHandle) -> Result<Vec<f64>, PopError> {
        let z: f64 = rng.sample(StandardNormal);
        Ok(vec![self.mean + self.sigma * z])
    }
}

pub fn normal(mean: f64) -> Arc<dyn DensityModel> {
    Arc::new(NormalDensity::new(mean, 1.0))
}

/// Model with unit-width normal channels centred on the given means.
pub fn sample_model(name: &str, channels: &[(&str, f64)]) -> PopulationModel {
    let mut model = PopulationModel::new(name);
    for (channel, mean) in channels {
        model.insert_channel(*channel, normal(*mean)).unwrap();
    }
    model
}

/// The A/B scenario: A has X=N(0,1), Y=N(5,1); B has X=N(2,1), Y=N(8,1).
pub fn sample_models() -> Vec<PopulationModel> {
    vec![
        sample_model("A", &[("X", 0.0), ("Y", 5.0)]),
        sample_model("B", &[("X", 2.0), ("Y", 8.0)]),
    ]
}

pub fn sample_observations(values: &[f64]) -> ObservationSet {
    ObservationSet::new(
        vec!["x".into()],
        values.iter().map(|v| vec![*v]).collect(),
    )
    .unwrap()
}

/// `n` standard-normal draws from a fixed seed.
pub fn standard_normal_draws(n: usize, seed: u64) -> Vec<f64> {
    let mut rng = RngHandle::from_seed(seed);
    (0..n).map(|_| rng.sample(StandardNormal)).collect()
}

pub fn small_config(iterations: usize, burn_in: usize, walkers: usize, levels: usize) -> RunConfig {
    let mut config = RunConfig::default();
    config.iterations = iterations;
    config.burn_in = burn_in;
    config.walkers = walkers;
    config.ladder.levels = levels;
    config
}
