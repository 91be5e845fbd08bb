//! Fixed-timestep round simulation
//!
//! One tick advances the round status machine: falling physics, collision
//! response by obstacle role, sensor interludes (grab, bonus), stop
//! detection with a settle debounce. The host calls `advance` with wall
//! time; substeps are capped so a stalled frame can never spiral.

use glam::Vec2;

use crate::consts::*;
use crate::fall_progress;
use crate::round_payout;
use crate::script::{ObstacleKind, ObstacleRole, StopMethod};
use crate::sim::collision::{Contact, reflect_velocity};
use crate::sim::state::{GameEvent, Round, RoundStatus};
use crate::tuning::Tuning;

/// How far the display factor recovers per tick after a grab (3 s to full)
const GRAB_RECOVERY_PER_TICK: f64 = 1.0 / 180.0;
/// How fast a bonus boost on the display factor decays back toward 1.0
const BONUS_DECAY_PER_TICK: f64 = 1.0 / 90.0;
/// Broadphase half-height around the body
const BROADPHASE_Y: f32 = 800.0;

/// Accumulate wall time and run fixed substeps. The accumulator is clamped
/// to `MAX_SUBSTEPS` worth of work per call.
pub fn advance(
    round: &mut Round,
    tuning: &Tuning,
    elapsed: f32,
    accumulator: &mut f32,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    *accumulator = (*accumulator + elapsed).min(SIM_DT * MAX_SUBSTEPS as f32);
    while *accumulator >= SIM_DT {
        events.extend(tick(round, tuning));
        *accumulator -= SIM_DT;
    }
    events
}

/// Advance the round by exactly one tick
pub fn tick(round: &mut Round, tuning: &Tuning) -> Vec<GameEvent> {
    let mut events = Vec::new();
    match round.status.clone() {
        RoundStatus::BetPlaced | RoundStatus::Landed | RoundStatus::Resolved => return events,
        RoundStatus::Dying { ticks_left } => dying_tick(round, tuning, ticks_left, &mut events),
        RoundStatus::Grabbed { ticks_left } => grabbed_tick(round, tuning, ticks_left, &mut events),
        RoundStatus::Bonus {
            target_y,
            return_pos,
        } => bonus_tick(round, tuning, target_y, return_pos, &mut events),
        RoundStatus::Falling => falling_tick(round, tuning, &mut events),
    }
    round.tick += 1;
    events
}

fn falling_tick(round: &mut Round, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    // Grounded state is re-earned every tick by an actual contact
    let was_grounded = round.body.on_ground;
    round.body.on_ground = false;

    integrate(round, tuning, was_grounded);
    steer(round, tuning);
    round.body.pos += round.body.vel;
    round.body.angle += round.body.ang_vel;

    resolve_solid_contacts(round, tuning, events);
    check_sensors(round, tuning, events);
    if !matches!(round.status, RoundStatus::Falling) {
        // A sensor suspended the fall mid-tick
        return;
    }
    resolve_ground(round, tuning, events);
    nudge_if_stuck(round, tuning);

    // Ease the display factor back toward neutral from either side
    round.grab_factor = if round.grab_factor < 1.0 {
        (round.grab_factor + GRAB_RECOVERY_PER_TICK).min(1.0)
    } else {
        (round.grab_factor - BONUS_DECAY_PER_TICK).max(1.0)
    };
    round.displayed_score = round.curve.displayed(round.body.pos.y, round.grab_factor);

    round.world.retire_above(round.body.pos.y);
    detect_stop(round, tuning, events);
}

/// Gravity, drag, terminal velocity, spin decay. Gravity is suspended while
/// grounded; ground friction applies instead of air drag.
fn integrate(round: &mut Round, tuning: &Tuning, grounded: bool) {
    let body = &mut round.body;
    if grounded {
        body.vel.x *= tuning.ground_friction;
    } else {
        body.vel.y = (body.vel.y + tuning.gravity).min(tuning.max_fall);
        body.vel.x *= tuning.air_friction;
    }
    body.ang_vel = (body.ang_vel * tuning.spin_decay_air).clamp(-tuning.max_spin, tuning.max_spin);
}

/// Soft envelope spring plus a gentle center-of-stop bias.
///
/// The spring only engages outside the correction band; the stop bias
/// scales with fall speed so a slow drift never telegraphs the target.
fn steer(round: &mut Round, tuning: &Tuning) {
    let body = &mut round.body;
    if body.pos.x < CORRECTION_INNER || body.pos.x > CORRECTION_OUTER {
        body.vel.x += (SCREEN_CENTER - body.pos.x) * tuning.envelope_correction;
    }
    let error = (round.script.stop.x - body.pos.x) / SCREEN_CENTER;
    body.vel.x += error * tuning.steer_gain * body.vel.y.max(0.0);
}

fn resolve_solid_contacts(round: &mut Round, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    let body_pos = round.body.pos;
    let body_radius = round.body.radius;
    let mut hits: Vec<(usize, Contact)> = Vec::new();
    for (i, obstacle) in round.world.obstacles.iter().enumerate() {
        if obstacle.retired || !obstacle.is_solid() {
            continue;
        }
        if (obstacle.pos.y - body_pos.y).abs() > BROADPHASE_Y {
            continue;
        }
        if let Some(contact) = obstacle.contact(body_pos, body_radius) {
            hits.push((i, contact));
        }
    }
    for (i, contact) in hits {
        let obstacle = &round.world.obstacles[i];
        let (kind, role, influence) = (obstacle.kind, obstacle.role, obstacle.influence);
        if matches!(kind, ObstacleKind::Tank | ObstacleKind::Camp) {
            prop_response(round, tuning, &contact, events);
            continue;
        }
        match role {
            ObstacleRole::Stopper => {
                // Near-total kill: the bowl swallows momentum
                let body = &mut round.body;
                body.vel.y = -body.vel.y * tuning.stopper_rebound;
                body.vel.x *= 0.5;
                body.ang_vel *= 0.5;
                correct_position(round, tuning, &contact);
            }
            ObstacleRole::Ambient => {
                let approach = -round.body.vel.dot(contact.normal);
                if approach > 0.0 {
                    // Weak response: blend a fraction of the deadened
                    // reflection into the incoming velocity
                    let reflected =
                        reflect_velocity(round.body.vel, contact.normal) * tuning.ambient_bounce;
                    round.body.vel = round
                        .body
                        .vel
                        .lerp(reflected, tuning.ambient_response_scale);
                    round.body.vel.x *= tuning.ambient_friction;
                }
                correct_position(round, tuning, &contact);
            }
            ObstacleRole::Normal | ObstacleRole::Guide | ObstacleRole::Redirect => {
                bounce_response(round, tuning, &contact, influence, events);
            }
        }
    }
}

/// Ground props (tank, camp): a slow hit on the roof settles like ground,
/// anything else glances off.
fn prop_response(round: &mut Round, tuning: &Tuning, contact: &Contact, events: &mut Vec<GameEvent>) {
    let approach = -round.body.vel.dot(contact.normal);
    if approach > 0.0 {
        if contact.hit_from_above() && approach <= 2.0 {
            round.body.vel.y = 0.0;
            round.body.vel.x *= tuning.ground_friction;
            round.body.on_ground = true;
        } else {
            round.body.vel =
                reflect_velocity(round.body.vel, contact.normal) * tuning.restitution_for_speed(approach);
            events.push(GameEvent::Bounced { speed: approach });
        }
    }
    round.body.ang_vel *= tuning.spin_decay_ground;
    correct_position(round, tuning, contact);
}

/// Full impulse response for a regular cloud contact
fn bounce_response(
    round: &mut Round,
    tuning: &Tuning,
    contact: &Contact,
    influence: crate::script::Influence,
    events: &mut Vec<GameEvent>,
) {
    let approach = -round.body.vel.dot(contact.normal);
    if approach <= 0.0 {
        // Separating already, just de-penetrate
        correct_position(round, tuning, contact);
        return;
    }
    let progress = fall_progress(round.body.pos.y);
    let px_norm = ((round.body.pos.x - SCREEN_CENTER) / CORE_WIDTH).clamp(-1.0, 1.0);
    let (bounce_mul, slide_bias) = phase_bias(progress, contact.normal.x, px_norm);

    let mut restitution = tuning.restitution_for_speed(approach) * bounce_mul;
    if let Some(bounce) = influence.bounce {
        restitution = (restitution * bounce / tuning.default_bounce).min(0.95);
    }

    // Split into normal and tangential parts, restitute one, retain the other
    let tangent = Vec2::new(-contact.normal.y, contact.normal.x);
    let vt = round.body.vel.dot(tangent);
    let retain = influence.friction.unwrap_or(tuning.default_friction);
    round.body.vel =
        contact.normal * (approach * restitution) + tangent * (vt * retain * (1.0 - tuning.mu_kinetic));

    round.body.vel.x += slide_bias * approach.min(12.0) * 0.25;
    if let Some(dvx) = influence.vx_delta {
        round.body.vel.x += dvx;
    }
    if let Some(dvy) = influence.vy_delta {
        round.body.vel.y += dvy;
    }
    round.body.vel *= tuning.post_bounce_damping;
    round.body.ang_vel =
        (round.body.ang_vel + vt * 0.002).clamp(-tuning.max_spin, tuning.max_spin);

    correct_position(round, tuning, contact);
    events.push(GameEvent::Bounced { speed: approach });
}

/// Phase-dependent bounce shaping: lively in the middle of the fall where
/// steering has room to work, damped near the top and the bottom.
fn phase_bias(progress: f32, nx: f32, px_norm: f32) -> (f32, f32) {
    if progress < 0.35 {
        (0.85, -nx * 0.3)
    } else if progress < 0.75 {
        (1.1, nx * 0.6 * px_norm)
    } else {
        (0.95, nx * 0.9)
    }
}

/// Positional correction with slop tolerance and a per-tick cap
fn correct_position(round: &mut Round, tuning: &Tuning, contact: &Contact) {
    let depth = (contact.penetration - tuning.correction_slop).max(0.0);
    let correction = (depth * tuning.correction_percent).min(tuning.max_correction);
    round.body.pos += contact.normal * correction;
}

/// Dark clouds, black holes and collectibles are sensors: no push-back,
/// they trigger status changes or pickups.
fn check_sensors(round: &mut Round, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    let body_pos = round.body.pos;
    let body_radius = round.body.radius;

    for c in &mut round.world.collectibles {
        if !c.collected && (c.pos - body_pos).length() < c.radius + body_radius {
            c.collected = true;
            events.push(GameEvent::CollectiblePicked { kind: c.kind });
        }
    }

    let mut triggered: Option<(usize, ObstacleKind, Option<f64>)> = None;
    for (i, obstacle) in round.world.obstacles.iter().enumerate() {
        if obstacle.retired || obstacle.is_solid() {
            continue;
        }
        if !matches!(obstacle.kind, ObstacleKind::DarkCloud | ObstacleKind::BlackHole) {
            continue;
        }
        if (obstacle.pos.y - body_pos.y).abs() > BROADPHASE_Y {
            continue;
        }
        if obstacle.contact(body_pos, body_radius).is_some() {
            triggered = Some((i, obstacle.kind, obstacle.multiplier));
            break;
        }
    }
    let Some((i, kind, multiplier)) = triggered else {
        return;
    };
    // One-shot: a sensor never fires twice
    round.world.obstacles[i].retired = true;
    match kind {
        ObstacleKind::DarkCloud => {
            round.body.vel = Vec2::ZERO;
            round.body.ang_vel = 0.0;
            // Contact halves the displayed score on the spot
            round.grab_factor *= 0.5;
            round.displayed_score = round.curve.displayed(body_pos.y, round.grab_factor);
            round.status = RoundStatus::Grabbed {
                ticks_left: tuning.grab_ticks,
            };
            events.push(GameEvent::Grabbed);
        }
        ObstacleKind::BlackHole => {
            let showcase = multiplier.unwrap_or(1.0).min(tuning.bonus_mult_cap);
            let rise = ((showcase - 1.0).max(0.0) * tuning.bonus_rise_per_mult as f64) as f32;
            round.status = RoundStatus::Bonus {
                target_y: body_pos.y - rise,
                return_pos: body_pos,
            };
            events.push(GameEvent::BonusEntered {
                multiplier: showcase,
            });
        }
        _ => {}
    }
}

fn resolve_ground(round: &mut Round, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    let body = &mut round.body;
    let floor = GROUND_COLLISION_Y - body.radius;
    if body.pos.y < floor {
        return;
    }
    body.pos.y = floor;
    if body.vel.y > 2.0 {
        let speed = body.vel.y;
        body.vel.y = -speed * tuning.restitution_for_speed(speed);
        body.vel.x *= tuning.ground_friction;
        events.push(GameEvent::Bounced { speed });
    } else {
        body.vel.y = 0.0;
        body.vel.x *= tuning.ground_friction;
        body.on_ground = true;
    }
    body.ang_vel *= tuning.spin_decay_ground;
}

/// Dead-slow far above the committed stop means the body is wedged; give it
/// a push rather than letting the round hang.
fn nudge_if_stuck(round: &mut Round, tuning: &Tuning) {
    let above_stop = round.body.pos.y < round.script.stop.y - tuning.stop_window;
    if above_stop
        && round.body.pos.y > tuning.stuck_min_y
        && round.body.speed() < tuning.stuck_speed
    {
        round.body.vel.y += 1.0;
        round.body.vel.x += (SCREEN_CENTER - round.body.pos.x).signum() * 0.5;
        // Lateral jitter walks the body off a cloud apex it balanced on
        round.body.vel.x += round.visual.range_f32(-0.6, 0.6);
    }
}

/// Settle debounce: sustained low speed near the committed stop (or on the
/// ground) for a full window before the landing is declared.
fn detect_stop(round: &mut Round, tuning: &Tuning, events: &mut Vec<GameEvent>) {
    let near_stop = (round.body.pos.y - round.script.stop.y).abs() < tuning.stop_window
        || round.body.pos.y >= GROUND_COLLISION_Y - round.body.radius - 1.0;
    if near_stop && round.body.speed() < tuning.stop_speed_threshold {
        round.debounce += 1;
    } else {
        round.debounce = 0;
    }
    if round.debounce >= tuning.stop_debounce_ticks {
        land(round, events);
    }
}

/// Terminal settle: snap the display to the committed payout
fn land(round: &mut Round, events: &mut Vec<GameEvent>) {
    round.grab_factor = 1.0;
    round.displayed_score = round.committed_payout();
    round.status = RoundStatus::Landed;
    events.push(GameEvent::Landed {
        payout: round.displayed_score,
    });
}

fn grabbed_tick(round: &mut Round, tuning: &Tuning, ticks_left: u32, events: &mut Vec<GameEvent>) {
    // Frozen in place, halved display held until release
    round.displayed_score = round.curve.displayed(round.body.pos.y, round.grab_factor);

    if ticks_left > 1 {
        round.status = RoundStatus::Grabbed {
            ticks_left: ticks_left - 1,
        };
        return;
    }
    // Eject upward in a randomized cone, spinning
    let angle = -std::f32::consts::FRAC_PI_2
        + round.visual.range_f32(-tuning.grab_eject_spread, tuning.grab_eject_spread);
    round.body.vel = Vec2::new(angle.cos(), angle.sin()) * tuning.grab_eject_speed;
    round.body.ang_vel = round.visual.range_f32(-0.04, 0.04);
    round.status = RoundStatus::Falling;
    events.push(GameEvent::Released);
}

fn bonus_tick(
    round: &mut Round,
    tuning: &Tuning,
    target_y: f32,
    return_pos: Vec2,
    events: &mut Vec<GameEvent>,
) {
    round.body.pos.y -= tuning.bonus_rise_speed;

    // Showcase number: base score climbing with the rise
    let risen = (return_pos.y - round.body.pos.y).max(0.0) as f64;
    let showcase = (1.0 + risen / tuning.bonus_rise_per_mult as f64).min(tuning.bonus_mult_cap);
    let base = round.curve.value_at(return_pos.y).max(round.bet);
    round.displayed_score = round_payout(base * showcase);

    if round.body.pos.y > target_y {
        return;
    }
    events.push(GameEvent::BonusExited);
    if round.script.stop.method == StopMethod::Bonus {
        // The showcase IS the ending: commit
        land(round, events);
    } else {
        // Mid-fall detour: commit the showcased multiplier into the display
        // factor; it decays back to neutral as the fall resumes
        round.grab_factor = (round.grab_factor * showcase).min(tuning.bonus_mult_cap);
        round.body.pos = return_pos;
        round.body.vel = Vec2::new(0.0, 2.0);
        round.status = RoundStatus::Falling;
        round.displayed_score = round.curve.displayed(return_pos.y, round.grab_factor);
    }
}

fn dying_tick(round: &mut Round, _tuning: &Tuning, ticks_left: u32, events: &mut Vec<GameEvent>) {
    round.displayed_score = 0.0;
    if ticks_left > 1 {
        round.status = RoundStatus::Dying {
            ticks_left: ticks_left - 1,
        };
        return;
    }
    events.push(GameEvent::Died);
    land(round, events);
}
