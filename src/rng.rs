//! Provably-fair seeded random streams
//!
//! The payout-determining stream must be reproducible bit-for-bit across
//! platforms, so this is a hand-ported Mulberry32 integer mixer rather than a
//! library-default float RNG. Two independent streams are split from one base
//! seed with fixed salts: cosmetic draws (sprite picks, layout jitter,
//! visibility thinning) come from the *visual* stream and can never perturb
//! the payout stream.

use rand_core::{RngCore, impls};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::GameError;

/// Salt for the payout-determining stream
const PAYOUT_STREAM_SALT: u32 = 0xA5A5_A5A5;
/// Salt for the cosmetic/layout stream
const VISUAL_STREAM_SALT: u32 = 0x5A5A_5A5A;

/// Immutable per-round seed material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTriple {
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
}

impl SeedTriple {
    pub fn new(server_seed: impl Into<String>, client_seed: impl Into<String>, nonce: u64) -> Self {
        Self {
            server_seed: server_seed.into(),
            client_seed: client_seed.into(),
            nonce,
        }
    }

    /// Derive the 32-bit base seed by hashing the triple
    pub fn base_seed(&self) -> Result<u32, GameError> {
        if self.server_seed.is_empty() || self.client_seed.is_empty() {
            return Err(GameError::InvalidSeed);
        }
        let mut hasher = Sha256::new();
        hasher.update(self.server_seed.as_bytes());
        hasher.update(b":");
        hasher.update(self.client_seed.as_bytes());
        hasher.update(b":");
        hasher.update(self.nonce.to_string().as_bytes());
        let digest = hasher.finalize();
        Ok(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }
}

/// Mulberry32 PRNG - deterministic 32-bit state mixer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Advance the state and mix out one 32-bit word
    pub fn next_word(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut x = self.state;
        x = (x ^ (x >> 15)).wrapping_mul(x | 1);
        x ^= x.wrapping_add((x ^ (x >> 7)).wrapping_mul(x | 61));
        x ^ (x >> 14)
    }

    /// Uniform draw in [0, 1)
    pub fn next_f64(&mut self) -> f64 {
        self.next_word() as f64 / 4_294_967_296.0
    }

    /// Uniform draw in [min, max)
    pub fn range(&mut self, min: f64, max: f64) -> f64 {
        min + self.next_f64() * (max - min)
    }

    /// Uniform f32 draw in [min, max), for geometry jitter
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        self.range(min as f64, max as f64) as f32
    }

    /// Bernoulli draw
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }
}

impl RngCore for Mulberry32 {
    fn next_u32(&mut self) -> u32 {
        self.next_word()
    }

    fn next_u64(&mut self) -> u64 {
        let lo = self.next_word() as u64;
        let hi = self.next_word() as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest)
    }
}

/// The two split streams of a round
#[derive(Debug, Clone)]
pub struct GameRng {
    /// Consumed only by the outcome resolver
    pub payout: Mulberry32,
    /// Layout variety, thinning, cosmetics
    pub visual: Mulberry32,
}

impl GameRng {
    pub fn from_triple(triple: &SeedTriple) -> Result<Self, GameError> {
        let base = triple.base_seed()?;
        Ok(Self::from_base_seed(base))
    }

    /// Split streams directly from a base seed (verification tooling)
    pub fn from_base_seed(base: u32) -> Self {
        Self {
            payout: Mulberry32::new(base ^ PAYOUT_STREAM_SALT),
            visual: Mulberry32::new(base ^ VISUAL_STREAM_SALT),
        }
    }
}
