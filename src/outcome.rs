//! Outcome resolver: one payout-stream draw selects a bucket, a second draw
//! picks the multiplier inside that bucket's range.
//!
//! The draw order is load-bearing: bucket first, then multiplier, both from
//! the payout stream. Swapping it silently changes the theoretical
//! return-to-player. The designed RTP of this table is exactly 0.96 and is
//! pinned by a regression test, not exposed as a runtime tunable.

use serde::{Deserialize, Serialize};

use crate::rng::Mulberry32;

/// Cumulative bucket thresholds, a partition of [0, 1)
pub const THRESHOLD_DEAD: f64 = 0.349230769;
pub const THRESHOLD_TEASE: f64 = 0.609230769;
pub const THRESHOLD_NORMAL: f64 = 0.829230769;
pub const THRESHOLD_BIG: f64 = 0.959230769;

/// Designed long-run return-to-player (sum of P(bucket) x mean multiplier)
pub const DESIGNED_RTP: f64 = 0.96;

/// Payout tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeBucket {
    Dead,
    Tease,
    Normal,
    Big,
    Insane,
}

impl OutcomeBucket {
    /// Fixed multiplier range for the bucket: [min, max)
    pub fn multiplier_range(&self) -> (f64, f64) {
        match self {
            OutcomeBucket::Dead => (0.0, 0.0),
            OutcomeBucket::Tease => (0.2, 0.6),
            OutcomeBucket::Normal => (0.9, 1.4),
            OutcomeBucket::Big => (2.0, 3.2),
            OutcomeBucket::Insane => (5.0, 8.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeBucket::Dead => "dead",
            OutcomeBucket::Tease => "tease",
            OutcomeBucket::Normal => "normal",
            OutcomeBucket::Big => "big",
            OutcomeBucket::Insane => "insane",
        }
    }
}

/// A resolved round outcome
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub bucket: OutcomeBucket,
    pub multiplier: f64,
}

/// Map a unit-interval draw to its bucket
pub fn bucket_for(r: f64) -> OutcomeBucket {
    if r < THRESHOLD_DEAD {
        OutcomeBucket::Dead
    } else if r < THRESHOLD_TEASE {
        OutcomeBucket::Tease
    } else if r < THRESHOLD_NORMAL {
        OutcomeBucket::Normal
    } else if r < THRESHOLD_BIG {
        OutcomeBucket::Big
    } else {
        OutcomeBucket::Insane
    }
}

/// Resolve one outcome from the payout stream.
///
/// Consumes exactly one draw for the bucket and, for non-dead buckets, one
/// more for the multiplier.
pub fn roll_outcome(payout: &mut Mulberry32) -> Outcome {
    let bucket = bucket_for(payout.next_f64());
    let (min, max) = bucket.multiplier_range();
    let multiplier = if max > min { payout.range(min, max) } else { min };
    Outcome { bucket, multiplier }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{GameRng, SeedTriple};
    use proptest::prelude::*;

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(bucket_for(0.0), OutcomeBucket::Dead);
        assert_eq!(bucket_for(THRESHOLD_DEAD - 1e-12), OutcomeBucket::Dead);
        assert_eq!(bucket_for(THRESHOLD_DEAD), OutcomeBucket::Tease);
        assert_eq!(bucket_for(THRESHOLD_TEASE), OutcomeBucket::Normal);
        assert_eq!(bucket_for(THRESHOLD_NORMAL), OutcomeBucket::Big);
        assert_eq!(bucket_for(THRESHOLD_BIG), OutcomeBucket::Insane);
        assert_eq!(bucket_for(0.999999999), OutcomeBucket::Insane);
    }

    proptest! {
        /// Every draw in [0,1) lands in exactly one bucket (no gaps/overlaps)
        #[test]
        fn prop_partition_total(r in 0.0f64..1.0) {
            let _ = bucket_for(r);
        }

        /// Multipliers stay inside their bucket's range
        #[test]
        fn prop_multiplier_in_range(seed in any::<u32>()) {
            let mut rng = Mulberry32::new(seed);
            let outcome = roll_outcome(&mut rng);
            let (min, max) = outcome.bucket.multiplier_range();
            if max > min {
                prop_assert!(outcome.multiplier >= min && outcome.multiplier < max);
            } else {
                prop_assert_eq!(outcome.multiplier, 0.0);
            }
        }
    }

    #[test]
    fn test_dead_multiplier_is_zero() {
        // Scan seeds until a dead bucket shows up
        for seed in 0..200u32 {
            let mut rng = Mulberry32::new(seed);
            let outcome = roll_outcome(&mut rng);
            if outcome.bucket == OutcomeBucket::Dead {
                assert_eq!(outcome.multiplier, 0.0);
                return;
            }
        }
        panic!("no dead outcome in 200 seeds");
    }

    /// RTP regression: the sampled mean multiplier over many nonces must
    /// converge on the designed 0.96 return.
    #[test]
    fn test_rtp_converges() {
        const RUNS: u64 = 200_000;
        let mut sum = 0.0;
        for nonce in 0..RUNS {
            let triple = SeedTriple::new("s", "c", nonce);
            let mut rng = GameRng::from_triple(&triple).unwrap();
            sum += roll_outcome(&mut rng.payout).multiplier;
        }
        let rtp = sum / RUNS as f64;
        assert!(
            (rtp - DESIGNED_RTP).abs() < 0.02,
            "sampled RTP {rtp} too far from {DESIGNED_RTP}"
        );
    }

    #[test]
    fn test_draw_order_fixed() {
        // The bucket draw happens before the multiplier draw: replaying the
        // stream manually must reproduce roll_outcome exactly.
        let mut a = Mulberry32::new(12345);
        let mut b = Mulberry32::new(12345);
        let outcome = roll_outcome(&mut a);
        let bucket = bucket_for(b.next_f64());
        assert_eq!(outcome.bucket, bucket);
        let (min, max) = bucket.multiplier_range();
        if max > min {
            assert_eq!(outcome.multiplier, b.range(min, max));
        }
    }
}
