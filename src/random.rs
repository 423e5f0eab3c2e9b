//! Random number generation, and the probability gates that drive mutation.

use core::cmp::min;
use rand::{Rng, RngCore, SeedableRng};
use rand_distr::{Distribution, Uniform};
use std::{
    fs::File,
    io::{self, Read},
};

/// Something with a chance of happening. Every mutation and reproduction decision in the crate
/// goes through this, with its probability pulled from [crate::config::Probs] or
/// [crate::config::Hyper].
pub trait Happens: RngCore {
    fn happens(&mut self, p: f64) -> bool;
}

impl<T: RngCore> Happens for T {
    #[inline]
    fn happens(&mut self, p: f64) -> bool {
        p > 0. && self.random::<f64>() < p
    }
}

/// A uniform draw from `[lo, hi]`. A degenerate or inverted range yields `lo`.
pub fn random_between(rng: &mut impl RngCore, lo: f64, hi: f64) -> f64 {
    Uniform::new_inclusive(lo, hi)
        .map(|dist| dist.sample(rng))
        .unwrap_or(lo)
}

/// A roughly normal draw bounded to [-1, 1], built as the rescaled mean of six uniform draws
pub fn random_std0(rng: &mut impl RngCore) -> f64 {
    const SAMPLES: usize = 6;
    let mean = (0..SAMPLES).map(|_| rng.random::<f64>()).sum::<f64>() / SAMPLES as f64;
    (mean - 0.5) * 2.
}

/// wyrand, small and fast enough to be owned by every engine
#[derive(Debug, Clone)]
pub struct WyRng {
    state: u64,
}

impl WyRng {
    pub fn seeded(state: u64) -> Self {
        Self { state }
    }
}

impl RngCore for WyRng {
    fn next_u32(&mut self) -> u32 {
        self.next_u64() as u32
    }

    fn next_u64(&mut self) -> u64 {
        const WY_CONST_0: u64 = 0x2d35_8dcc_aa6c_78a5;
        const WY_CONST_1: u64 = 0x8bb8_4b93_962e_acc9;
        self.state = self.state.wrapping_add(WY_CONST_0);
        let t = u128::from(self.state) * u128::from(self.state ^ WY_CONST_1);
        (t as u64) ^ (t >> 64) as u64
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        let mut idx = 0;
        while idx < dst.len() {
            let lim = min(8, dst.len() - idx);
            dst[idx..idx + lim].copy_from_slice(&self.next_u64().to_ne_bytes()[..lim]);
            idx += lim;
        }
    }
}

impl SeedableRng for WyRng {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Self::seeded(u64::from_le_bytes(seed))
    }

    fn seed_from_u64(state: u64) -> Self {
        Self::seeded(state)
    }
}

pub fn seed_urandom() -> io::Result<u64> {
    let mut file = File::open("/dev/urandom")?;
    let mut buffer = [0u8; 8];
    file.read_exact(&mut buffer)?;
    Ok(u64::from_le_bytes(buffer))
}

/// A [WyRng] seeded from the OS, or from the thread rng where there is no `/dev/urandom`
pub fn default_rng() -> WyRng {
    WyRng::seeded(seed_urandom().unwrap_or_else(|_| rand::random()))
}
