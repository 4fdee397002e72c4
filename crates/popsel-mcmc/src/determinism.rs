use popsel_core::rng::derive_path_seed;

// stream tags keep the path spaces of different consumers apart
const INIT_STREAM: u64 = 1;
const LEVEL_STREAM: u64 = 2;
const EXCHANGE_STREAM: u64 = 3;
const OBSERVATION_STREAM: u64 = 4;

/// Seed for drawing the starting walkers of a level.
pub fn init_seed(master_seed: u64, level: usize) -> u64 {
    derive_path_seed(master_seed, &[INIT_STREAM, level as u64])
}

/// Seed for the stretch updates of one level during one iteration.
pub fn level_seed(master_seed: u64, level: usize, iteration: usize) -> u64 {
    derive_path_seed(master_seed, &[LEVEL_STREAM, level as u64, iteration as u64])
}

/// Seed for the exchange between levels `pair` and `pair + 1` at an iteration.
pub fn exchange_seed(master_seed: u64, iteration: usize, pair: usize) -> u64 {
    derive_path_seed(master_seed, &[EXCHANGE_STREAM, iteration as u64, pair as u64])
}

/// Seed for drawing mock observations from the reference model.
pub fn observation_seed(master_seed: u64) -> u64 {
    derive_path_seed(master_seed, &[OBSERVATION_STREAM])
}
