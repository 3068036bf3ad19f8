//! The 64-bit uniform generator used by the dictionary's sampling
//! operations (`random_key`, `some_keys`, `fair_random_key`).
//!
//! The C original reaches for a process-global Mersenne Twister
//! (`genrand64_int64`) gated behind `ULONG_MAX`. Rather than carry a
//! global, each `Dict` owns a `Box<dyn Prng>`, defaulted to a
//! `rand`-backed generator seeded from entropy at construction.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A source of uniformly distributed 64-bit integers.
pub trait Prng {
    fn next_u64(&mut self) -> u64;

    #[inline]
    fn gen_range_usize(&mut self, upper_exclusive: usize) -> usize {
        if upper_exclusive == 0 {
            return 0;
        }
        (self.next_u64() % upper_exclusive as u64) as usize
    }
}

/// Default [`Prng`] implementation, backed by `rand`'s small, fast,
/// non-cryptographic generator (the dictionary only needs uniformity for
/// sampling, never unpredictability against an adversary).
pub struct DefaultPrng(SmallRng);

impl DefaultPrng {
    pub fn from_entropy() -> Self {
        Self(SmallRng::from_entropy())
    }

    pub fn from_seed_u64(seed: u64) -> Self {
        Self(SmallRng::seed_from_u64(seed))
    }
}

impl Default for DefaultPrng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl Prng for DefaultPrng {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.0.gen::<u64>()
    }
}
