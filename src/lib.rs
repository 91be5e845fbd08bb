//! Skydrop - a vertical-descent wagering mini-game
//!
//! A player stakes an amount, a body falls through a procedurally scripted
//! sky, and its terminal position pays out a sum that was cryptographically
//! committed before the fall began. The fall only *appears* to discover the
//! result: the world script steers the body to the pre-committed stop.
//!
//! Core modules:
//! - `rng`: provably-fair seeded streams (payout / visual split)
//! - `outcome`: bucketed outcome resolver
//! - `script`: declarative round script builder
//! - `sim`: deterministic physics, collisions, round state
//! - `session`: bet -> fall -> resolution state machine
//! - `ledger`: balance/wallet collaborator interface
//! - `tuning`: data-driven physics balance

pub mod error;
pub mod ledger;
pub mod outcome;
pub mod rng;
pub mod script;
pub mod session;
pub mod sim;
pub mod tuning;

pub use error::GameError;
pub use ledger::{BetReceipt, InMemoryLedger, Ledger};
pub use outcome::{Outcome, OutcomeBucket};
pub use rng::{GameRng, SeedTriple};
pub use script::Script;
pub use session::Session;
pub use tuning::Tuning;

/// World geometry constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz, matches the scripted per-tick physics)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per host frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Viewport dimensions (world units)
    pub const SCREEN_W: f32 = 1920.0;
    pub const SCREEN_H: f32 = 1200.0;
    pub const SCREEN_CENTER: f32 = SCREEN_W / 2.0;

    /// Vertical extent of a round's world
    pub const WORLD_HEIGHT: f32 = 20_000.0;
    pub const GROUND_Y: f32 = 19_300.0;
    pub const GROUND_COLLISION_Y: f32 = 19_280.0;
    /// Bonus-zone camera origin (above the normal world)
    pub const VOID_START_Y: f32 = -1_000.0;

    /// Dead zones: nothing spawns right at the plane or right at the ground
    pub const PLANE_DEAD_ZONE: f32 = 200.0;
    pub const GROUND_DEAD_ZONE: f32 = 200.0;
    pub const SPAWN_START_Y: f32 = SCREEN_H / 2.0 + PLANE_DEAD_ZONE;
    pub const SPAWN_END_Y: f32 = GROUND_Y - GROUND_DEAD_ZONE;

    /// Soft horizontal envelope that keeps the fall near screen center
    pub const CORE_WIDTH: f32 = 600.0;
    pub const SOFT_ZONE_WIDTH: f32 = 300.0;
    pub const ENVELOPE_INNER: f32 = SCREEN_CENTER - CORE_WIDTH;
    pub const ENVELOPE_OUTER: f32 = SCREEN_CENTER + CORE_WIDTH;
    pub const CORRECTION_INNER: f32 = ENVELOPE_INNER - SOFT_ZONE_WIDTH;
    pub const CORRECTION_OUTER: f32 = ENVELOPE_OUTER + SOFT_ZONE_WIDTH;

    /// Falling body
    pub const BODY_RADIUS: f32 = 65.0;
    pub const BODY_START_X: f32 = SCREEN_CENTER;
    pub const BODY_START_Y: f32 = SCREEN_H / 2.0;

    /// Obstacle geometry defaults
    pub const DEFAULT_CLOUD_RADIUS: f32 = 110.0;
    pub const BLACK_HOLE_SIZE: f32 = 300.0;
    pub const BLACK_HOLE_RADIUS: f32 = 100.0;
    pub const DARK_CLOUD_W: f32 = 420.0;
    pub const DARK_CLOUD_H: f32 = 280.0;
    pub const TANK_W: f32 = 400.0;
    pub const TANK_H: f32 = 300.0;
    pub const CAMP_W: f32 = 800.0;
    pub const CAMP_H: f32 = 600.0;

    /// Obstacles further above the body than this are retired
    pub const RECYCLE_DISTANCE: f32 = 2_000.0;
}

/// Smooth (Hermite) easing on [0, 1]
#[inline]
pub fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Fractional vertical progress of a world-space y through the spawn band
#[inline]
pub fn fall_progress(y: f32) -> f32 {
    ((y - consts::SPAWN_START_Y) / (consts::GROUND_COLLISION_Y - consts::SPAWN_START_Y))
        .clamp(0.0, 1.0)
}

/// Round a payout down to two decimals (house never rounds up)
#[inline]
pub fn round_payout(amount: f64) -> f64 {
    (amount * 100.0).floor() / 100.0
}
