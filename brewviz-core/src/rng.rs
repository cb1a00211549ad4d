//! Deterministic random numbers for procedural scene content.
//!
//! Stars and vapor particles only need "looks random" placement, so a seeded
//! xorshift64 keeps sessions reproducible and tests exact.

use std::f32::consts::TAU;

/// Seed used when the configuration does not provide one
pub const DEFAULT_SEED: u64 = 42;

/// xorshift64 generator
#[derive(Clone, Debug)]
pub struct SeededRng {
    state: u64,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    /// Uniform in `[0, 1)`
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform in `[low, high)`
    pub fn range(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32()
    }

    /// Uniform angle in `[0, 2π)`
    pub fn angle(&mut self) -> f32 {
        self.next_f32() * TAU
    }
}

impl Default for SeededRng {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}
