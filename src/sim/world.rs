//! Script-to-world materializer
//!
//! Turns the declarative spawn list into concrete collision geometry. Puffy
//! clouds are unions of circles traced from two sprite silhouettes; dark
//! clouds are unions of rects. Visibility thinning happens here: a steering
//! cloud may be materialized invisible (sprite suppressed, physics intact),
//! drawn from the visual stream only.

use glam::Vec2;

use crate::consts::*;
use crate::rng::Mulberry32;
use crate::script::{
    CollectibleKind, Influence, ObstacleKind, ObstacleRole, Script, SpawnEntry,
};
use crate::sim::collision::{self, Contact};

/// Circle lobes of the two cloud silhouettes, normalized to sprite extents
const CLOUD1_EXTENTS: (f32, f32) = (544.0, 272.0);
const CLOUD1: [(f32, f32, f32); 10] = [
    (0.1329, 0.6750, 0.0922),
    (0.2251, 0.5125, 0.1094),
    (0.2689, 0.6750, 0.0594),
    (0.3986, 0.3781, 0.1266),
    (0.3830, 0.7219, 0.0797),
    (0.5189, 0.7219, 0.0750),
    (0.6237, 0.5312, 0.1141),
    (0.7331, 0.7031, 0.0891),
    (0.7862, 0.5844, 0.0610),
    (0.8581, 0.6531, 0.0703),
];

const CLOUD2_EXTENTS: (f32, f32) = (487.5, 325.5);
const CLOUD2: [(f32, f32, f32); 10] = [
    (0.1508, 0.7857, 0.0892),
    (0.2169, 0.6912, 0.0692),
    (0.3646, 0.5622, 0.1308),
    (0.2338, 0.7926, 0.0862),
    (0.3862, 0.8641, 0.0877),
    (0.5277, 0.6336, 0.0477),
    (0.5138, 0.8433, 0.0738),
    (0.6385, 0.6935, 0.1092),
    (0.6062, 0.8525, 0.0462),
    (0.7108, 0.8088, 0.1015),
];

/// Rect slabs of the dark-cloud silhouette, normalized (x, y, w, h)
const DARK_RECTS: [(f32, f32, f32, f32); 4] = [
    (0.4178571, 0.1925134, 0.1892857, 0.0855615),
    (0.2964286, 0.2780749, 0.4321429, 0.1176471),
    (0.2071429, 0.3957219, 0.5857143, 0.0802139),
    (0.1250000, 0.4759358, 0.7714286, 0.2139037),
];

#[derive(Debug, Clone, Copy)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Rect {
    pub center: Vec2,
    pub half: Vec2,
}

#[derive(Debug, Clone)]
pub enum Shape {
    Circles(Vec<Circle>),
    Rects(Vec<Rect>),
}

/// A materialized obstacle
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub role: ObstacleRole,
    /// Anchor (sprite center)
    pub pos: Vec2,
    pub shape: Shape,
    pub influence: Influence,
    /// Thinned steering clouds keep physics but suppress the sprite
    pub visible: bool,
    /// Showcase multiplier (black holes only)
    pub multiplier: Option<f64>,
    /// Passed far above the body, excluded from collision
    pub retired: bool,
}

impl Obstacle {
    /// Solid obstacles push the body; sensors only trigger events.
    /// Clouds and ground props are solid, dark clouds and black holes
    /// are sensors.
    pub fn is_solid(&self) -> bool {
        matches!(
            self.kind,
            ObstacleKind::Cloud | ObstacleKind::Tank | ObstacleKind::Camp
        )
    }

    /// Merged contact of the body circle against this obstacle's shape
    pub fn contact(&self, pos: Vec2, radius: f32) -> Option<Contact> {
        let mut contacts = Vec::new();
        match &self.shape {
            Shape::Circles(circles) => {
                for c in circles {
                    if let Some(hit) = collision::circle_contact(pos, radius, c.center, c.radius) {
                        contacts.push(hit);
                    }
                }
            }
            Shape::Rects(rects) => {
                for r in rects {
                    if let Some(hit) = collision::rect_contact(pos, radius, r.center, r.half) {
                        contacts.push(hit);
                    }
                }
            }
        }
        collision::merge_contacts(&contacts)
    }
}

#[derive(Debug, Clone)]
pub struct Collectible {
    pub kind: CollectibleKind,
    pub pos: Vec2,
    pub radius: f32,
    pub collected: bool,
}

/// The materialized round world
#[derive(Debug, Clone)]
pub struct World {
    pub obstacles: Vec<Obstacle>,
    pub collectibles: Vec<Collectible>,
}

impl World {
    /// Materialize a script. Consumes visual-stream draws for silhouette
    /// picks and thinning, so the same script + visual state reproduces the
    /// same world bit-for-bit.
    pub fn materialize(script: &Script, visual: &mut Mulberry32) -> Self {
        let obstacles = script
            .spawns
            .iter()
            .map(|entry| materialize_spawn(entry, visual))
            .collect();
        let collectibles = script
            .collectibles
            .iter()
            .map(|c| Collectible {
                kind: c.kind,
                pos: Vec2::new(c.x, c.y),
                radius: 45.0,
                collected: false,
            })
            .collect();
        Self {
            obstacles,
            collectibles,
        }
    }

    /// Retire everything far above the body so collision stays O(live set)
    pub fn retire_above(&mut self, body_y: f32) {
        for obstacle in &mut self.obstacles {
            if !obstacle.retired && obstacle.pos.y < body_y - RECYCLE_DISTANCE {
                obstacle.retired = true;
            }
        }
    }
}

fn materialize_spawn(entry: &SpawnEntry, visual: &mut Mulberry32) -> Obstacle {
    let pos = Vec2::new(entry.x, entry.y);
    let shape = match entry.kind {
        ObstacleKind::Cloud => cloud_shape(entry, pos, visual),
        ObstacleKind::DarkCloud => dark_cloud_shape(pos),
        ObstacleKind::BlackHole => Shape::Circles(vec![Circle {
            center: pos,
            radius: entry.radius.unwrap_or(BLACK_HOLE_RADIUS),
        }]),
        ObstacleKind::Tank => Shape::Rects(vec![Rect {
            center: pos,
            half: Vec2::new(TANK_W / 2.0, TANK_H / 2.0),
        }]),
        ObstacleKind::Camp => Shape::Rects(vec![Rect {
            center: pos,
            half: Vec2::new(CAMP_W / 2.0, CAMP_H / 2.0),
        }]),
    };
    let visible = thinning_keep(entry, visual);
    Obstacle {
        kind: entry.kind,
        role: entry.role,
        pos,
        shape,
        influence: entry.influence,
        visible,
        multiplier: entry.multiplier,
        retired: false,
    }
}

fn cloud_shape(entry: &SpawnEntry, pos: Vec2, visual: &mut Mulberry32) -> Shape {
    let (template, (w, h)) = if visual.chance(0.5) {
        (&CLOUD1, CLOUD1_EXTENTS)
    } else {
        (&CLOUD2, CLOUD2_EXTENTS)
    };
    let scale = entry.radius.unwrap_or(DEFAULT_CLOUD_RADIUS) / DEFAULT_CLOUD_RADIUS;
    let (w, h) = (w * scale, h * scale);
    let top_left = pos - Vec2::new(w / 2.0, h / 2.0);
    Shape::Circles(
        template
            .iter()
            .map(|&(fx, fy, fr)| Circle {
                center: top_left + Vec2::new(fx * w, fy * h),
                radius: fr * w,
            })
            .collect(),
    )
}

fn dark_cloud_shape(pos: Vec2) -> Shape {
    let top_left = pos - Vec2::new(DARK_CLOUD_W / 2.0, DARK_CLOUD_H / 2.0);
    Shape::Rects(
        DARK_RECTS
            .iter()
            .map(|&(fx, fy, fw, fh)| {
                let half = Vec2::new(fw * DARK_CLOUD_W / 2.0, fh * DARK_CLOUD_H / 2.0);
                Rect {
                    center: top_left + Vec2::new(fx * DARK_CLOUD_W, fy * DARK_CLOUD_H) + half,
                    half,
                }
            })
            .collect(),
    )
}

/// Keep-visible probability for steering clouds. Clouds near screen center
/// are thinned harder: an invisible mid-air course change reads as wind, a
/// visible cloud the body ignores reads as a bug.
fn thinning_keep(entry: &SpawnEntry, visual: &mut Mulberry32) -> bool {
    let near_center = (entry.x - SCREEN_CENTER).abs() < CORE_WIDTH;
    let keep = match entry.role {
        ObstacleRole::Redirect => {
            if near_center {
                0.55
            } else {
                0.75
            }
        }
        ObstacleRole::Guide => {
            if near_center {
                0.35
            } else {
                0.55
            }
        }
        _ => return true,
    };
    visual.chance(keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Outcome, OutcomeBucket};
    use crate::script::build_script;

    fn test_world(bucket: OutcomeBucket, multiplier: f64, seed: u32) -> (Script, World) {
        let outcome = Outcome { bucket, multiplier };
        let mut rng = Mulberry32::new(seed);
        let script = build_script(&outcome, 10.0, &mut rng);
        let world = World::materialize(&script, &mut rng);
        (script, world)
    }

    #[test]
    fn test_materialize_preserves_spawn_order() {
        let (script, world) = test_world(OutcomeBucket::Normal, 1.2, 42);
        assert_eq!(world.obstacles.len(), script.spawns.len());
        for (entry, obstacle) in script.spawns.iter().zip(&world.obstacles) {
            assert_eq!(entry.role, obstacle.role);
            assert_eq!(entry.x, obstacle.pos.x);
        }
    }

    #[test]
    fn test_thinning_keeps_physics() {
        // Invisible steering clouds must still carry collision shapes
        let mut found_hidden = false;
        for seed in 0..20 {
            let (_, world) = test_world(OutcomeBucket::Insane, 6.5, seed);
            for o in world.obstacles.iter().filter(|o| !o.visible) {
                found_hidden = true;
                assert!(o.is_solid());
                match &o.shape {
                    Shape::Circles(c) => assert!(!c.is_empty()),
                    Shape::Rects(r) => assert!(!r.is_empty()),
                }
            }
        }
        assert!(found_hidden, "no thinned clouds across 20 insane layouts");
    }

    #[test]
    fn test_non_steering_roles_never_thinned() {
        let (_, world) = test_world(OutcomeBucket::Tease, 0.4, 3);
        for o in &world.obstacles {
            if matches!(
                o.role,
                ObstacleRole::Normal | ObstacleRole::Stopper | ObstacleRole::Ambient
            ) {
                assert!(o.visible);
            }
        }
    }

    #[test]
    fn test_cloud_contact_hits_lobe() {
        let entry = SpawnEntry {
            kind: ObstacleKind::Cloud,
            x: 1000.0,
            y: 5000.0,
            radius: Some(DEFAULT_CLOUD_RADIUS),
            role: ObstacleRole::Normal,
            influence: Influence::default(),
            multiplier: None,
        };
        let mut visual = Mulberry32::new(1);
        let obstacle = materialize_spawn(&entry, &mut visual);
        // A body dropped straight onto the anchor overlaps some lobe
        let hit = obstacle.contact(Vec2::new(1000.0, 5000.0), BODY_RADIUS);
        assert!(hit.is_some());
        // Far away misses
        assert!(obstacle.contact(Vec2::new(0.0, 0.0), BODY_RADIUS).is_none());
    }

    #[test]
    fn test_dark_cloud_shape_spans_sprite() {
        let shape = dark_cloud_shape(Vec2::new(960.0, 3000.0));
        let Shape::Rects(rects) = shape else {
            panic!("dark cloud must be rects");
        };
        assert_eq!(rects.len(), 4);
        // Widest slab stays inside the sprite box
        for r in &rects {
            assert!(r.center.x - r.half.x >= 960.0 - DARK_CLOUD_W / 2.0 - 1.0);
            assert!(r.center.x + r.half.x <= 960.0 + DARK_CLOUD_W / 2.0 + 1.0);
        }
    }

    #[test]
    fn test_retire_above() {
        let (_, mut world) = test_world(OutcomeBucket::Normal, 1.0, 9);
        world.retire_above(WORLD_HEIGHT);
        let live = world.obstacles.iter().filter(|o| !o.retired).count();
        let retired = world.obstacles.iter().filter(|o| o.retired).count();
        assert!(retired > 0, "deep body should retire high clouds");
        // Ground props sit near the bottom and must survive
        assert!(live > 0);
    }

    #[test]
    fn test_ground_props_are_solid() {
        let (script, world) = test_world(OutcomeBucket::Normal, 1.1, 11);
        let tank = world
            .obstacles
            .iter()
            .find(|o| o.kind == ObstacleKind::Tank)
            .expect("normal layout has a tank");
        assert!(tank.is_solid());
        assert_eq!(tank.pos.x, script.stop.x);
        // A body dropped onto the roof resolves a contact
        let roof = tank.pos.y - TANK_H / 2.0;
        let hit = tank
            .contact(Vec2::new(tank.pos.x, roof - 50.0), BODY_RADIUS)
            .expect("roof contact");
        assert!(hit.hit_from_above());
    }

    #[test]
    fn test_black_hole_is_sensor() {
        let (_, world) = test_world(OutcomeBucket::Insane, 7.0, 11);
        let bh = world
            .obstacles
            .iter()
            .find(|o| o.kind == ObstacleKind::BlackHole)
            .expect("insane layout has a black hole");
        assert!(!bh.is_solid());
        assert!(bh.multiplier.is_some());
    }
}
