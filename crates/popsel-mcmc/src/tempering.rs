use popsel_core::RngHandle;
use rand::seq::SliceRandom;

use crate::config::{LadderConfig, LadderPolicy};
use crate::ensemble::Level;

/// Builds the temperature ladder, coldest (`T = 1`) first.
pub fn build_ladder(config: &LadderConfig) -> Vec<f64> {
    match &config.policy {
        LadderPolicy::Geometric { ratio } => {
            let mut ladder = Vec::with_capacity(config.levels.max(1));
            let mut temp = 1.0;
            for _ in 0..config.levels.max(1) {
                ladder.push(temp);
                temp *= ratio;
            }
            ladder
        }
        LadderPolicy::Manual { temperatures } => {
            if temperatures.is_empty() {
                vec![1.0]
            } else {
                temperatures.clone()
            }
        }
    }
}

/// Log acceptance ratio `(beta_a - beta_b)(L_b - L_a)` for swapping two walkers.
pub fn exchange_log_ratio(beta_a: f64, log_a: f64, beta_b: f64, log_b: f64) -> f64 {
    (beta_a - beta_b) * (log_b - log_a)
}

/// Metropolis acceptance probability for exchanging two walker states.
///
/// Equal inverse temperatures always swap. An undefined ratio (both states
/// at `-inf`) never swaps.
pub fn exchange_acceptance(beta_a: f64, log_a: f64, beta_b: f64, log_b: f64) -> f64 {
    if beta_a == beta_b {
        return 1.0;
    }
    let log_ratio = exchange_log_ratio(beta_a, log_a, beta_b, log_b);
    if log_ratio.is_nan() {
        0.0
    } else {
        log_ratio.min(0.0).exp()
    }
}

/// Attempts one exchange, returning `(accepted, probability)`.
pub fn attempt_exchange(
    beta_a: f64,
    log_a: f64,
    beta_b: f64,
    log_b: f64,
    rng: &mut RngHandle,
) -> (bool, f64) {
    let acceptance = exchange_acceptance(beta_a, log_a, beta_b, log_b);
    (rng.uniform() < acceptance, acceptance)
}

/// Totals accumulated while exchanging walkers between two adjacent levels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExchangeTally {
    /// Exchange attempts.
    pub attempted: usize,
    /// Accepted exchanges.
    pub accepted: usize,
    /// Sum of acceptance probabilities over the attempts.
    pub probability_sum: f64,
}

/// Exchanges walker states between `colder` and `hotter`.
///
/// Walker `i` of the colder level is paired with walker `perm[i]` of the
/// hotter one, `perm` being a fresh random permutation. Pairs are visited in
/// ascending `i`; accepted pairs trade position and log-posterior together.
pub fn swap_levels(colder: &mut Level, hotter: &mut Level, rng: &mut RngHandle) -> ExchangeTally {
    let mut partners: Vec<usize> = (0..hotter.walkers.len()).collect();
    partners.shuffle(rng.inner_mut());
    let beta_cold = colder.inverse_temperature();
    let beta_hot = hotter.inverse_temperature();

    let mut tally = ExchangeTally::default();
    for (i, &j) in partners.iter().enumerate().take(colder.walkers.len()) {
        let (accept, probability) = attempt_exchange(
            beta_cold,
            colder.walkers[i].log_posterior,
            beta_hot,
            hotter.walkers[j].log_posterior,
            rng,
        );
        tally.attempted += 1;
        tally.probability_sum += probability;
        if accept {
            std::mem::swap(&mut colder.walkers[i], &mut hotter.walkers[j]);
            tally.accepted += 1;
        }
    }
    tally
}
