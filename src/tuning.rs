//! Data-driven physics and pacing balance
//!
//! Every feel constant the simulation reads lives here so a balance pass is
//! a data change, not a code change. Values are the reconciled tuning of the
//! shipped variant; the RTP target and progression invariants are what must
//! hold, these numbers are free to move.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tuning {
    // === Integration ===
    /// Downward acceleration per tick
    pub gravity: f32,
    /// Terminal fall speed cap
    pub max_fall: f32,
    /// Horizontal drag per tick while airborne
    pub air_friction: f32,
    /// Horizontal drag per tick while grounded
    pub ground_friction: f32,
    /// Angular velocity decay (air / ground)
    pub spin_decay_air: f32,
    pub spin_decay_ground: f32,
    /// Angular velocity clamp
    pub max_spin: f32,

    // === Collision response ===
    /// Kinetic friction coefficient on tangential impulses
    pub mu_kinetic: f32,
    /// Default cloud restitution when the spawn carries no override
    pub default_bounce: f32,
    /// Default tangential friction retention
    pub default_friction: f32,
    /// Post-bounce velocity damping
    pub post_bounce_damping: f32,
    /// Penetration below this is tolerated without correction
    pub correction_slop: f32,
    /// Fraction of remaining penetration corrected per tick
    pub correction_percent: f32,
    /// Positional correction cap per tick
    pub max_correction: f32,
    /// Stopper rebound factor (near-total velocity kill)
    pub stopper_rebound: f32,
    /// Ambient clouds respond at this fraction of a normal bounce
    pub ambient_response_scale: f32,
    pub ambient_bounce: f32,
    pub ambient_friction: f32,

    // === Steering ===
    /// Soft envelope spring gain outside the correction band
    pub envelope_correction: f32,
    /// Center-seeking gain applied to fast airborne bodies
    pub steer_gain: f32,

    // === Sub-states ===
    /// Dark-cloud grab duration (ticks)
    pub grab_ticks: u32,
    /// Ejection speed when the grab releases
    pub grab_eject_speed: f32,
    /// Half-angle of the randomized ejection cone (radians)
    pub grab_eject_spread: f32,
    /// Bonus-zone rise per tick
    pub bonus_rise_speed: f32,
    /// Rise distance per +1.0 of showcased multiplier
    pub bonus_rise_per_mult: f32,
    /// Showcased multiplier cap
    pub bonus_mult_cap: f64,
    /// Cosmetic death animation duration (ticks)
    pub death_ticks: u32,

    // === Stop detection ===
    /// Sustained-low-speed ticks required before a landing is declared
    pub stop_debounce_ticks: u32,
    /// Speed below which the body counts as settled
    pub stop_speed_threshold: f32,
    /// Vertical window around the committed stop that arms the debounce
    pub stop_window: f32,
    /// Anti-stuck nudge threshold (speed) and minimum depth
    pub stuck_speed: f32,
    pub stuck_min_y: f32,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            gravity: 0.55,
            max_fall: 28.0,
            air_friction: 0.995,
            ground_friction: 0.85,
            spin_decay_air: 0.992,
            spin_decay_ground: 0.4,
            max_spin: 0.05,

            mu_kinetic: 0.08,
            default_bounce: 0.65,
            default_friction: 0.85,
            post_bounce_damping: 0.92,
            correction_slop: 1.5,
            correction_percent: 0.45,
            max_correction: 8.0,
            stopper_rebound: 0.05,
            ambient_response_scale: 0.3,
            ambient_bounce: 0.15,
            ambient_friction: 0.98,

            envelope_correction: 0.008,
            steer_gain: 0.035,

            grab_ticks: 90,
            grab_eject_speed: 28.0,
            grab_eject_spread: std::f32::consts::PI / 4.4,
            bonus_rise_speed: 7.0,
            bonus_rise_per_mult: 120.0,
            bonus_mult_cap: 15.0,
            death_ticks: 48,

            stop_debounce_ticks: 60,
            stop_speed_threshold: 2.0,
            stop_window: 400.0,
            stuck_speed: 0.15,
            stuck_min_y: 1_500.0,
        }
    }
}

impl Tuning {
    /// Impact restitution as a function of approach speed.
    ///
    /// Slow contacts deaden (prevents jitter at rest), mid-speed contacts
    /// are lively, very fast contacts lose a little energy again.
    pub fn restitution_for_speed(&self, speed: f32) -> f32 {
        let s = speed.abs().min(40.0);
        if s < 2.0 {
            0.1
        } else if s < 8.0 {
            0.3
        } else if s < 14.0 {
            0.5
        } else if s < 30.0 {
            0.6
        } else {
            0.5
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restitution_monotonic_regions() {
        let t = Tuning::default();
        assert_eq!(t.restitution_for_speed(0.5), 0.1);
        assert_eq!(t.restitution_for_speed(5.0), 0.3);
        assert_eq!(t.restitution_for_speed(10.0), 0.5);
        assert_eq!(t.restitution_for_speed(20.0), 0.6);
        assert_eq!(t.restitution_for_speed(100.0), 0.5);
    }

    #[test]
    fn test_tuning_roundtrip() {
        let t = Tuning::default();
        let json = serde_json::to_string(&t).unwrap();
        let back: Tuning = serde_json::from_str(&json).unwrap();
        assert_eq!(back.gravity, t.gravity);
        assert_eq!(back.grab_ticks, t.grab_ticks);
    }
}
