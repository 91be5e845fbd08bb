//! Declarative round scripts
//!
//! A script is the pre-committed description of a round: where obstacles go,
//! which of them secretly steer, where the body is guaranteed to stop, and
//! the score curve that walks the displayed number from zero to the committed
//! payout. Built once per round from the outcome plus the *visual* stream, so
//! layout variety can never shift the payout math. The document is plain
//! serde data and must round-trip losslessly through JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::GameError;
use crate::outcome::{Outcome, OutcomeBucket};
use crate::rng::Mulberry32;
use crate::{round_payout, smoothstep};

/// What an obstacle looks like / collides as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleKind {
    Cloud,
    DarkCloud,
    BlackHole,
    Tank,
    Camp,
}

/// How an obstacle responds to contact.
///
/// `Guide` and `Redirect` are the steering roles: they may be materialized
/// invisibly, physics intact, which is how the body is herded toward the
/// committed stop without visible manipulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObstacleRole {
    Normal,
    Stopper,
    Redirect,
    Guide,
    Ambient,
}

/// Per-spawn physics overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Influence {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bounce: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub friction: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vx_delta: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub vy_delta: Option<f32>,
}

/// One scripted obstacle placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnEntry {
    pub kind: ObstacleKind,
    pub x: f32,
    pub y: f32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub radius: Option<f32>,
    pub role: ObstacleRole,
    #[serde(default)]
    pub influence: Influence,
    /// Showcase multiplier (black holes only)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub multiplier: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectibleKind {
    Nuke,
    Note,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectibleEntry {
    pub kind: CollectibleKind,
    pub x: f32,
    pub y: f32,
}

/// Named progress marker along the descent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Fraction of the spawn band, [0, 1]
    pub progress: f64,
}

/// Optional black-hole bonus event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BonusEvent {
    pub min_multiplier: f64,
    pub max_multiplier: f64,
}

/// One milestone of the committed score curve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePoint {
    pub y: f32,
    pub score: f64,
}

/// How the round is guaranteed to end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopMethod {
    /// Settle on the ground plane
    Ground,
    /// Pinned by a stopper-cloud bowl mid-air
    Trap,
    /// Black-hole showcase ends the round
    Bonus,
    /// Immediate cosmetic death, payout zero
    Death,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopCondition {
    pub x: f32,
    pub y: f32,
    pub method: StopMethod,
}

/// The complete pre-committed round description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub checkpoints: BTreeMap<String, Checkpoint>,
    pub spawns: Vec<SpawnEntry>,
    pub collectibles: Vec<CollectibleEntry>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bonus_event: Option<BonusEvent>,
    pub score_progression: Vec<ScorePoint>,
    pub stop: StopCondition,
}

impl Script {
    /// The committed payout is the final milestone of the score curve
    pub fn committed_payout(&self) -> f64 {
        self.score_progression.last().map(|p| p.score).unwrap_or(0.0)
    }

    /// Enforce the progression invariants: starts at zero, ends exactly at
    /// the committed payout, non-decreasing in both axes, stop bounded.
    pub fn validate(&self, expected_payout: f64) -> Result<(), GameError> {
        let first = self
            .score_progression
            .first()
            .ok_or_else(|| GameError::ScriptInconsistency("empty progression".into()))?;
        if first.score != 0.0 {
            return Err(GameError::ScriptInconsistency(format!(
                "progression starts at {} not 0",
                first.score
            )));
        }
        let last = self.score_progression.last().unwrap();
        if last.score != expected_payout {
            return Err(GameError::ScriptInconsistency(format!(
                "progression ends at {} not {}",
                last.score, expected_payout
            )));
        }
        for pair in self.score_progression.windows(2) {
            if pair[1].y < pair[0].y || pair[1].score < pair[0].score {
                return Err(GameError::ScriptInconsistency(format!(
                    "progression not monotonic at y={}",
                    pair[1].y
                )));
            }
        }
        if !(0.0..=WORLD_HEIGHT).contains(&self.stop.y) {
            return Err(GameError::ScriptInconsistency(format!(
                "stop y {} outside world",
                self.stop.y
            )));
        }
        Ok(())
    }
}

/// World-space y for a spawn-band progress fraction
#[inline]
fn progress_to_y(p: f64) -> f32 {
    SPAWN_START_Y + (GROUND_COLLISION_Y - SPAWN_START_Y) * p as f32
}

/// Per-bucket layout recipe
struct Recipe {
    checkpoints: &'static [(&'static str, f64)],
    /// (count, min progress, max progress)
    collectibles: (usize, f64, f64),
    control_clouds: usize,
    ambient_clouds: usize,
    bonus: Option<(f64, BonusEvent)>,
}

fn recipe_for(bucket: OutcomeBucket) -> Recipe {
    match bucket {
        OutcomeBucket::Dead => Recipe {
            checkpoints: &[("pickup", 0.15), ("dark_cloud", 0.30)],
            collectibles: (40, 0.05, 0.30),
            control_clouds: 6,
            ambient_clouds: 40,
            bonus: None,
        },
        OutcomeBucket::Tease => Recipe {
            checkpoints: &[("pickup", 0.35), ("tank", 0.50), ("dark_cloud", 0.65)],
            collectibles: (80, 0.10, 0.70),
            control_clouds: 10,
            ambient_clouds: 60,
            bonus: None,
        },
        OutcomeBucket::Normal => Recipe {
            checkpoints: &[("pickup", 0.40), ("tank", 0.60), ("camp", 0.75)],
            collectibles: (120, 0.15, 0.85),
            control_clouds: 14,
            ambient_clouds: 70,
            bonus: None,
        },
        OutcomeBucket::Big => Recipe {
            checkpoints: &[("pickup", 0.45), ("tank", 0.65), ("camp", 0.80)],
            collectibles: (200, 0.10, 0.90),
            control_clouds: 18,
            ambient_clouds: 80,
            bonus: Some((
                0.80,
                BonusEvent {
                    min_multiplier: 4.0,
                    max_multiplier: 6.0,
                },
            )),
        },
        OutcomeBucket::Insane => Recipe {
            checkpoints: &[("pickup", 0.50), ("tank", 0.70), ("camp", 0.85)],
            collectibles: (300, 0.05, 0.95),
            control_clouds: 22,
            ambient_clouds: 90,
            bonus: Some((
                0.90,
                BonusEvent {
                    min_multiplier: 8.0,
                    max_multiplier: 12.0,
                },
            )),
        },
    }
}

/// Build the full round script for a resolved outcome.
///
/// Consumes only the visual stream. Guarantees a reachable stop and a valid
/// score progression ending exactly at `floor(bet x multiplier x 100) / 100`.
pub fn build_script(outcome: &Outcome, bet: f64, rng: &mut Mulberry32) -> Script {
    let payout = round_payout(bet * outcome.multiplier);
    let recipe = recipe_for(outcome.bucket);

    let stop = determine_stop(outcome.bucket, rng);

    let mut checkpoints = BTreeMap::new();
    for &(name, progress) in recipe.checkpoints {
        checkpoints.insert(name.to_string(), Checkpoint { progress });
    }

    let mut spawns = Vec::new();

    place_control_clouds(&mut spawns, recipe.control_clouds, &stop, rng);
    place_ambient_clouds(&mut spawns, recipe.ambient_clouds, rng);

    if stop.method == StopMethod::Trap {
        build_stopper_trap(&mut spawns, stop.x, stop.y, rng);
    }

    if let Some(cp) = checkpoints.get("dark_cloud") {
        let y = progress_to_y(cp.progress);
        let x = SCREEN_CENTER + rng.range_f32(-1.0, 1.0) * CORE_WIDTH * 0.6;
        spawns.push(SpawnEntry {
            kind: ObstacleKind::DarkCloud,
            x: x.clamp(CORRECTION_INNER + DARK_CLOUD_W / 2.0, CORRECTION_OUTER - DARK_CLOUD_W / 2.0),
            y,
            radius: None,
            role: ObstacleRole::Normal,
            influence: Influence::default(),
            multiplier: None,
        });
    }

    let bonus_event = recipe.bonus.map(|(progress, event)| {
        let showcase = rng.range(event.min_multiplier, event.max_multiplier);
        // A bonus ending puts the hole exactly on the committed stop;
        // otherwise it is a mid-fall detour
        let (x, y) = if stop.method == StopMethod::Bonus {
            (stop.x, stop.y)
        } else {
            (
                SCREEN_CENTER + rng.range_f32(-200.0, 200.0),
                progress_to_y(progress),
            )
        };
        spawns.push(SpawnEntry {
            kind: ObstacleKind::BlackHole,
            x,
            y,
            radius: Some(BLACK_HOLE_RADIUS),
            role: ObstacleRole::Normal,
            influence: Influence::default(),
            multiplier: Some(showcase),
        });
        event
    });

    place_ground_objects(&mut spawns, outcome.bucket, stop.x, rng);

    let collectibles = place_collectibles(recipe.collectibles, rng);
    let score_progression = build_progression(stop.y, payout);

    Script {
        checkpoints,
        spawns,
        collectibles,
        bonus_event,
        score_progression,
        stop,
    }
}

fn determine_stop(bucket: OutcomeBucket, rng: &mut Mulberry32) -> StopCondition {
    let center_x = |spread: f32, rng: &mut Mulberry32| {
        SCREEN_CENTER + rng.range_f32(-0.5, 0.5) * spread
    };
    match bucket {
        OutcomeBucket::Dead => {
            if rng.chance(0.35) {
                StopCondition {
                    x: SCREEN_CENTER,
                    y: SPAWN_START_Y,
                    method: StopMethod::Death,
                }
            } else {
                StopCondition {
                    x: center_x(400.0, rng),
                    y: progress_to_y(rng.range(0.25, 0.35)),
                    method: StopMethod::Trap,
                }
            }
        }
        OutcomeBucket::Tease => StopCondition {
            x: center_x(400.0, rng),
            y: progress_to_y(rng.range(0.50, 0.65)),
            method: StopMethod::Trap,
        },
        OutcomeBucket::Normal => StopCondition {
            x: center_x(600.0, rng),
            y: GROUND_COLLISION_Y,
            method: StopMethod::Ground,
        },
        OutcomeBucket::Big => StopCondition {
            x: center_x(500.0, rng),
            y: GROUND_COLLISION_Y,
            method: StopMethod::Ground,
        },
        OutcomeBucket::Insane => StopCondition {
            x: center_x(400.0, rng),
            y: progress_to_y(rng.range(0.85, 0.93)),
            method: StopMethod::Bonus,
        },
    }
}

/// Guide/redirect clouds strung down the envelope toward the stop. Each one
/// nudges horizontally back to center; the deeper ones push harder.
fn place_control_clouds(
    spawns: &mut Vec<SpawnEntry>,
    count: usize,
    stop: &StopCondition,
    rng: &mut Mulberry32,
) {
    let span = (stop.y - SPAWN_START_Y - 400.0).max(0.0);
    for i in 0..count {
        let t = (i as f32 + 0.5) / count as f32;
        let y = SPAWN_START_Y + 300.0 + span * t + rng.range_f32(-150.0, 150.0);
        if y > SPAWN_END_Y {
            continue;
        }
        // Drift the ideal line toward the stop column as the fall deepens
        let ideal_x = SCREEN_CENTER + (stop.x - SCREEN_CENTER) * t;
        let offset = rng.range_f32(70.0, 120.0) * if rng.chance(0.5) { 1.0 } else { -1.0 };
        let x = (ideal_x + offset).clamp(CORRECTION_INNER + 50.0, CORRECTION_OUTER - 50.0);

        let strength = (offset.abs() / 200.0).min(1.0);
        let role = if strength > 0.7 {
            ObstacleRole::Redirect
        } else {
            ObstacleRole::Guide
        };
        spawns.push(SpawnEntry {
            kind: ObstacleKind::Cloud,
            x,
            y,
            radius: Some(rng.range_f32(95.0, 130.0)),
            role,
            influence: Influence {
                bounce: Some(0.5 + strength * 0.25),
                friction: Some(0.85),
                vx_delta: Some(-offset.signum() * (strength * 5.0).min(4.0)),
                vy_delta: None,
            },
            multiplier: None,
        });
    }
}

/// Visual-filler clouds, biased to the envelope edges, sparse in the middle
fn place_ambient_clouds(spawns: &mut Vec<SpawnEntry>, count: usize, rng: &mut Mulberry32) {
    for _ in 0..count {
        let y = rng.range_f32(SPAWN_START_Y + 500.0, SPAWN_END_Y - 500.0);
        let zone = rng.next_f64();
        let x = if zone < 0.35 {
            CORRECTION_INNER - 100.0 + rng.range_f32(0.0, 250.0)
        } else if zone < 0.70 {
            CORRECTION_OUTER - 150.0 + rng.range_f32(0.0, 250.0)
        } else {
            rng.range_f32(ENVELOPE_INNER, ENVELOPE_OUTER)
        };
        spawns.push(SpawnEntry {
            kind: ObstacleKind::Cloud,
            x,
            y,
            radius: Some(rng.range_f32(90.0, 135.0)),
            role: ObstacleRole::Ambient,
            influence: Influence::default(),
            multiplier: None,
        });
    }
}

/// Bowl of stopper clouds that pins the body at a mid-air stop
fn build_stopper_trap(spawns: &mut Vec<SpawnEntry>, x: f32, y: f32, rng: &mut Mulberry32) {
    const BOWL: [(f32, f32, f32); 6] = [
        (0.0, 0.0, 130.0),
        (-150.0, 25.0, 110.0),
        (150.0, 25.0, 110.0),
        (-75.0, 90.0, 100.0),
        (75.0, 90.0, 100.0),
        (0.0, 130.0, 120.0),
    ];
    for (dx, dy, radius) in BOWL {
        let cx = (x + dx + rng.range_f32(-12.5, 12.5))
            .clamp(CORRECTION_INNER + radius, CORRECTION_OUTER - radius);
        let cy = y + dy;
        if cy > SPAWN_END_Y {
            continue;
        }
        spawns.push(SpawnEntry {
            kind: ObstacleKind::Cloud,
            x: cx,
            y: cy,
            radius: Some(radius),
            role: ObstacleRole::Stopper,
            influence: Influence {
                bounce: Some(0.05),
                friction: Some(0.95),
                vx_delta: None,
                vy_delta: None,
            },
            multiplier: None,
        });
    }
}

/// Tank/camp on the ground: the landing target pays, the opposite is a decoy
fn place_ground_objects(
    spawns: &mut Vec<SpawnEntry>,
    bucket: OutcomeBucket,
    target_x: f32,
    rng: &mut Mulberry32,
) {
    let opposite_x = |x: f32, rng: &mut Mulberry32| {
        if x < SCREEN_CENTER {
            ENVELOPE_OUTER - 100.0 - rng.range_f32(0.0, 200.0)
        } else {
            ENVELOPE_INNER + 100.0 + rng.range_f32(0.0, 200.0)
        }
    };
    let ground_entry = |kind: ObstacleKind, x: f32| SpawnEntry {
        kind,
        x,
        y: GROUND_Y,
        radius: None,
        role: ObstacleRole::Normal,
        influence: Influence::default(),
        multiplier: None,
    };
    match bucket {
        OutcomeBucket::Normal => {
            spawns.push(ground_entry(ObstacleKind::Tank, target_x));
            let decoy = opposite_x(target_x, rng);
            spawns.push(ground_entry(ObstacleKind::Camp, decoy));
        }
        OutcomeBucket::Big => {
            spawns.push(ground_entry(ObstacleKind::Camp, target_x));
            let decoy = opposite_x(target_x, rng);
            spawns.push(ground_entry(ObstacleKind::Tank, decoy));
        }
        _ => {
            if rng.chance(0.7) {
                let x = rng.range_f32(ENVELOPE_INNER, ENVELOPE_OUTER);
                spawns.push(ground_entry(ObstacleKind::Tank, x));
            }
            if rng.chance(0.7) {
                let x = rng.range_f32(ENVELOPE_INNER, ENVELOPE_OUTER);
                spawns.push(ground_entry(ObstacleKind::Camp, x));
            }
        }
    }
}

fn place_collectibles(
    (count, min_p, max_p): (usize, f64, f64),
    rng: &mut Mulberry32,
) -> Vec<CollectibleEntry> {
    (0..count)
        .map(|_| {
            let kind = if rng.chance(0.5) {
                CollectibleKind::Nuke
            } else {
                CollectibleKind::Note
            };
            let y = progress_to_y(rng.range(min_p, max_p));
            let x = rng.range_f32(CORRECTION_INNER - 100.0, CORRECTION_OUTER + 100.0);
            CollectibleEntry { kind, x, y }
        })
        .collect()
}

/// Smoothstep-eased milestones from (start, 0) to (stop, payout).
///
/// The last point is pinned to the committed payout exactly so float drift
/// can never violate the endpoint invariant.
fn build_progression(stop_y: f32, payout: f64) -> Vec<ScorePoint> {
    const STEPS: usize = 30;
    let start_y = SPAWN_START_Y.min(stop_y);
    let mut points: Vec<ScorePoint> = (0..=STEPS)
        .map(|i| {
            let t = i as f64 / STEPS as f64;
            ScorePoint {
                y: start_y + (stop_y - start_y) * t as f32,
                score: round_payout(payout * smoothstep(t)),
            }
        })
        .collect();
    points.last_mut().unwrap().score = payout;
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::roll_outcome;
    use proptest::prelude::*;

    fn script_for(bucket: OutcomeBucket, multiplier: f64, bet: f64, seed: u32) -> Script {
        let outcome = Outcome { bucket, multiplier };
        let mut rng = Mulberry32::new(seed);
        build_script(&outcome, bet, &mut rng)
    }

    #[test]
    fn test_progression_invariants_all_buckets() {
        for seed in 0..50u32 {
            let mut rng = Mulberry32::new(seed);
            let outcome = roll_outcome(&mut rng);
            let bet = 10.0;
            let script = build_script(&outcome, bet, &mut Mulberry32::new(seed ^ 0x55));
            let payout = round_payout(bet * outcome.multiplier);
            script.validate(payout).unwrap();
            assert_eq!(script.score_progression[0].score, 0.0);
            assert_eq!(script.committed_payout(), payout);
        }
    }

    #[test]
    fn test_insane_commits_exact_payout() {
        // bet 100 at x7.3 must commit exactly 730.00
        let script = script_for(OutcomeBucket::Insane, 7.3, 100.0, 7);
        assert_eq!(script.committed_payout(), 730.0);
        script.validate(730.0).unwrap();
        assert!(script.bonus_event.is_some());
        assert_eq!(script.stop.method, StopMethod::Bonus);
    }

    #[test]
    fn test_dead_is_flat_zero_and_early() {
        for seed in 0..30u32 {
            let script = script_for(OutcomeBucket::Dead, 0.0, 50.0, seed);
            assert_eq!(script.committed_payout(), 0.0);
            for p in &script.score_progression {
                assert_eq!(p.score, 0.0);
            }
            match script.stop.method {
                StopMethod::Death => assert_eq!(script.stop.y, SPAWN_START_Y),
                StopMethod::Trap => {
                    // Early stop: no deeper than ~35% of the spawn band
                    assert!(script.stop.y < progress_to_y(0.36));
                }
                other => panic!("dead bucket produced {other:?}"),
            }
        }
    }

    #[test]
    fn test_trap_stop_has_stoppers() {
        let script = script_for(OutcomeBucket::Tease, 0.4, 10.0, 3);
        assert_eq!(script.stop.method, StopMethod::Trap);
        let stoppers = script
            .spawns
            .iter()
            .filter(|s| s.role == ObstacleRole::Stopper)
            .count();
        assert!(stoppers >= 4, "trap needs a stopper bowl, got {stoppers}");
    }

    #[test]
    fn test_normal_has_tank_target_and_decoy() {
        let script = script_for(OutcomeBucket::Normal, 1.1, 10.0, 11);
        assert_eq!(script.stop.method, StopMethod::Ground);
        let tank = script
            .spawns
            .iter()
            .find(|s| s.kind == ObstacleKind::Tank)
            .expect("tank landing target");
        assert_eq!(tank.x, script.stop.x);
        assert!(script.spawns.iter().any(|s| s.kind == ObstacleKind::Camp));
    }

    #[test]
    fn test_json_roundtrip_lossless() {
        let script = script_for(OutcomeBucket::Big, 2.5, 25.0, 99);
        let json = serde_json::to_string(&script).unwrap();
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(back, script);
    }

    #[test]
    fn test_collectible_counts_scale_with_bucket() {
        let dead = script_for(OutcomeBucket::Dead, 0.0, 10.0, 1);
        let insane = script_for(OutcomeBucket::Insane, 6.0, 10.0, 1);
        assert_eq!(dead.collectibles.len(), 40);
        assert_eq!(insane.collectibles.len(), 300);
    }

    #[test]
    fn test_builder_deterministic() {
        let a = script_for(OutcomeBucket::Big, 2.2, 15.0, 1234);
        let b = script_for(OutcomeBucket::Big, 2.2, 15.0, 1234);
        assert_eq!(a, b);
    }

    proptest! {
        /// Progression invariants hold for arbitrary bets and multipliers
        #[test]
        fn prop_progression_monotonic(
            bet in 0.01f64..10_000.0,
            mult in 0.0f64..8.0,
            seed in any::<u32>(),
        ) {
            let bucket = if mult == 0.0 { OutcomeBucket::Dead } else { OutcomeBucket::Normal };
            let outcome = Outcome { bucket, multiplier: if bucket == OutcomeBucket::Dead { 0.0 } else { mult } };
            let mut rng = Mulberry32::new(seed);
            let script = build_script(&outcome, bet, &mut rng);
            let payout = round_payout(bet * outcome.multiplier);
            prop_assert!(script.validate(payout).is_ok());
        }
    }
}
