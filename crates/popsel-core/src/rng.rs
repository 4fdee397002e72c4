//! Seeded random streams.
//!
//! A run never carries RNG state between iterations. Every draw comes from a
//! fresh `StdRng` whose seed is a SipHash-1-3 digest (zero keys) of the master
//! seed followed by a short stream path such as `[tag, level, iteration]`.
//! Replaying or resuming a run only needs the master seed.

use std::hash::Hasher;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use siphasher::sip::SipHasher13;

/// Random source handed to samplers, priors and density draws.
#[derive(Debug, Clone)]
pub struct RngHandle {
    inner: StdRng,
}

impl RngHandle {
    /// Seeds the handle directly.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Stream addressed by a path of identifiers under `master_seed`.
    pub fn for_path(master_seed: u64, path: &[u64]) -> Self {
        Self::from_seed(derive_path_seed(master_seed, path))
    }

    /// The wrapped generator, for distributions that want a concrete `Rng`.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.inner
    }

    /// Uniform draw on `[0, 1)` with 53 bits of precision.
    pub fn uniform(&mut self) -> f64 {
        const SCALE: f64 = 1.0 / (1u64 << 53) as f64;
        (self.inner.next_u64() >> 11) as f64 * SCALE
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

/// Seed of the stream at `path` under `master_seed`.
pub fn derive_path_seed(master_seed: u64, path: &[u64]) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    path.iter().for_each(|id| hasher.write_u64(*id));
    hasher.finish()
}
