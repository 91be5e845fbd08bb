//! Round state: the falling body, the status machine, and construction of a
//! full round from seed material.
//!
//! Everything a round will ever do is fixed at construction: outcome rolled,
//! script built and validated, world materialized. The tick loop only plays
//! it out.

use glam::Vec2;

use crate::consts::*;
use crate::error::GameError;
use crate::outcome::{self, Outcome};
use crate::rng::{GameRng, Mulberry32, SeedTriple};
use crate::round_payout;
use crate::script::{self, CollectibleKind, Script, StopMethod};
use crate::sim::score::ScoreCurve;
use crate::sim::world::World;

/// Downward seed velocity when the fall begins
pub const FALL_SEED_VY: f32 = 5.0;

/// The falling body
#[derive(Debug, Clone)]
pub struct BodyState {
    pub pos: Vec2,
    pub vel: Vec2,
    pub angle: f32,
    pub ang_vel: f32,
    pub radius: f32,
    /// Settled on the ground plane or a ground prop; gravity is suspended
    /// and ground friction applies while set
    pub on_ground: bool,
}

impl BodyState {
    fn at_start() -> Self {
        Self {
            pos: Vec2::new(BODY_START_X, BODY_START_Y),
            vel: Vec2::ZERO,
            angle: 0.0,
            ang_vel: 0.0,
            radius: BODY_RADIUS,
            on_ground: false,
        }
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.vel.length()
    }
}

/// Round status machine.
///
/// `Grabbed`, `Bonus` and `Dying` are interludes that suspend normal falling
/// physics; `Landed` means the committed payout is on screen and the round
/// waits for resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundStatus {
    /// Wager debited, fall not yet started
    BetPlaced,
    Falling,
    /// Held by a dark cloud, frozen in place
    Grabbed { ticks_left: u32 },
    /// Black-hole showcase: rising through the void toward `target_y`
    Bonus { target_y: f32, return_pos: Vec2 },
    /// Cosmetic death animation (dead bucket only)
    Dying { ticks_left: u32 },
    /// Settled at the committed stop, payout displayed
    Landed,
    /// Ledger credited, terminal
    Resolved,
}

/// Observable things that happened during a tick, in order
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    Bounced { speed: f32 },
    Grabbed,
    Released,
    BonusEntered { multiplier: f64 },
    BonusExited,
    CollectiblePicked { kind: CollectibleKind },
    Landed { payout: f64 },
    Died,
}

/// One complete round
#[derive(Debug, Clone)]
pub struct Round {
    pub seed: SeedTriple,
    pub bet: f64,
    pub outcome: Outcome,
    pub script: Script,
    pub world: World,
    pub curve: ScoreCurve,
    pub body: BodyState,
    pub status: RoundStatus,
    /// Ticks elapsed since the fall began
    pub tick: u64,
    /// Continued visual stream for in-flight cosmetic draws
    pub visual: Mulberry32,
    /// Display factor on the score curve: 1.0 normally, halved on a
    /// dark-cloud grab, multiplied by a mid-fall bonus exit; eases back
    /// toward 1.0 from either side while falling
    pub grab_factor: f64,
    pub displayed_score: f64,
    /// Consecutive settled ticks near the committed stop
    pub debounce: u32,
}

impl Round {
    /// Build a round from seed material. Rolls the outcome from the payout
    /// stream, builds and validates the script from the visual stream, and
    /// materializes the world.
    pub fn new(seed: SeedTriple, bet: f64) -> Result<Self, GameError> {
        let mut rng = GameRng::from_triple(&seed)?;
        let outcome = outcome::roll_outcome(&mut rng.payout);
        let script = script::build_script(&outcome, bet, &mut rng.visual);
        script.validate(round_payout(bet * outcome.multiplier))?;
        let world = World::materialize(&script, &mut rng.visual);
        let curve = ScoreCurve::new(script.score_progression.clone());
        Ok(Self {
            seed,
            bet,
            outcome,
            script,
            world,
            curve,
            body: BodyState::at_start(),
            status: RoundStatus::BetPlaced,
            tick: 0,
            visual: rng.visual,
            grab_factor: 1.0,
            displayed_score: 0.0,
            debounce: 0,
        })
    }

    /// Committed payout (the progression endpoint)
    pub fn committed_payout(&self) -> f64 {
        self.curve.payout()
    }

    /// Begin the fall. A scripted immediate death skips straight to the
    /// dying interlude; otherwise the body leaves with a small downward
    /// seed velocity.
    pub fn start_fall(&mut self, death_ticks: u32) {
        if self.status != RoundStatus::BetPlaced {
            return;
        }
        if self.script.stop.method == StopMethod::Death {
            self.status = RoundStatus::Dying {
                ticks_left: death_ticks,
            };
        } else {
            self.body.vel = Vec2::new(0.0, FALL_SEED_VY);
            self.status = RoundStatus::Falling;
        }
    }

    /// True once the body has settled and the payout is final
    pub fn is_settled(&self) -> bool {
        matches!(self.status, RoundStatus::Landed | RoundStatus::Resolved)
    }
}
