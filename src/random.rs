use rand::{Rng, RngCore, SeedableRng};
use tracing::trace;

/// The classic 48-bit linear congruential generator of the `drand48` family:
///
/// ```ascii
/// x(n+1) = (0x5DEECE66D * x(n) + 0xB) mod 2^48
/// ```
///
/// It is statistically weak, but it is fully specified, so a given seed produces the same
///  sequence on every platform and in every release. Loss injection relies on that: tests assert
///  exact survivor counts for a given seed, and changing the algorithm invalidates them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Drand48 {
    state: u64,
}

impl Drand48 {
    const MULTIPLIER: u64 = 0x5_DEEC_E66D;
    const ADDEND: u64 = 0xB;
    const MASK: u64 = (1 << 48) - 1;

    /// The seed's three low 16-bit words are mapped to the state in reverse order, i.e. the
    ///  lowest word of the seed becomes the highest word of the state.
    pub fn new(seed: u64) -> Drand48 {
        let state = ((seed & 0xFFFF) << 32)
            | (((seed >> 16) & 0xFFFF) << 16)
            | ((seed >> 32) & 0xFFFF);
        Drand48 { state }
    }

    fn step(&mut self) -> u64 {
        self.state = Self::MULTIPLIER
            .wrapping_mul(self.state)
            .wrapping_add(Self::ADDEND)
            & Self::MASK;
        self.state
    }
}

impl RngCore for Drand48 {
    fn next_u32(&mut self) -> u32 {
        (self.step() >> 16) as u32
    }

    /// One step per value, the 48 bits of state in the high bits. `rand` builds an `f64` from the
    ///  high 53 bits of a `u64`, so `random::<f64>()` is exactly `state / 2^48`.
    fn next_u64(&mut self) -> u64 {
        self.step() << 16
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for chunk in dst.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
}

impl SeedableRng for Drand48 {
    type Seed = [u8; 8];

    fn from_seed(seed: Self::Seed) -> Self {
        Drand48::new(u64::from_le_bytes(seed))
    }

    /// The default implementation scrambles the seed, which would make seeds incompatible with
    ///  [Drand48::new]
    fn seed_from_u64(state: u64) -> Self {
        Drand48::new(state)
    }
}


/// Decides for each loss candidate whether it is dropped. A new instance starts a new sequence,
///  so re-initializing with the same seed replays the same decisions.
#[derive(Clone, Debug)]
pub struct DropGenerator {
    rate: f64,
    rng: Drand48,
    num_draws: u64,
}

impl DropGenerator {
    /// `rate` is expected to be validated, see [crate::config::LossParams::validate]
    pub fn new(rate: f64, seed: u64) -> DropGenerator {
        DropGenerator {
            rate,
            rng: Drand48::seed_from_u64(seed),
            num_draws: 0,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// number of random values consumed so far - rates of 0 and 1 never consume any
    pub fn num_draws(&self) -> u64 {
        self.num_draws
    }

    pub fn should_drop(&mut self) -> bool {
        if self.rate <= 0.0 {
            return false;
        }
        if self.rate >= 1.0 {
            return true;
        }

        self.num_draws += 1;
        let draw = self.rng.random::<f64>();
        trace!("draw #{}: {}", self.num_draws, draw);
        draw <= self.rate
    }
}
