//! Collision primitives for the falling body
//!
//! Obstacles are unions of circles (puffy clouds) or axis-aligned rects
//! (dark clouds, ground props). The body is a single circle, so everything
//! reduces to circle-vs-circle and circle-vs-rect with a contact-averaging
//! pass for multi-part shapes.

use glam::Vec2;

/// One resolved contact
#[derive(Debug, Clone, Copy)]
pub struct Contact {
    /// Contact point on the obstacle surface
    pub point: Vec2,
    /// Surface normal pointing toward the body center
    pub normal: Vec2,
    /// Penetration depth (for position correction)
    pub penetration: f32,
}

/// Circle-vs-circle overlap test
pub fn circle_contact(pos: Vec2, radius: f32, center: Vec2, circle_radius: f32) -> Option<Contact> {
    let delta = pos - center;
    let dist_sq = delta.length_squared();
    let reach = radius + circle_radius;
    if dist_sq >= reach * reach {
        return None;
    }
    let dist = dist_sq.sqrt();
    // Concentric centers have no meaningful normal, push straight up
    let normal = if dist > 1e-4 { delta / dist } else { Vec2::NEG_Y };
    Some(Contact {
        point: center + normal * circle_radius,
        normal,
        penetration: reach - dist,
    })
}

/// Circle-vs-axis-aligned-rect via the clamped nearest point
pub fn rect_contact(pos: Vec2, radius: f32, rect_center: Vec2, half: Vec2) -> Option<Contact> {
    let rel = pos - rect_center;
    let closest = rel.clamp(-half, half);
    let delta = rel - closest;
    let dist_sq = delta.length_squared();
    if dist_sq > 1e-8 {
        // Body center is outside the rect
        if dist_sq >= radius * radius {
            return None;
        }
        let dist = dist_sq.sqrt();
        let normal = delta / dist;
        return Some(Contact {
            point: rect_center + closest,
            normal,
            penetration: radius - dist,
        });
    }
    // Center inside the rect: push out along the shallowest face
    let overlap_x = half.x - rel.x.abs();
    let overlap_y = half.y - rel.y.abs();
    let (normal, penetration) = if overlap_x < overlap_y {
        (Vec2::new(rel.x.signum(), 0.0), overlap_x + radius)
    } else {
        (Vec2::new(0.0, rel.y.signum()), overlap_y + radius)
    };
    Some(Contact {
        point: pos - normal * radius,
        normal,
        penetration,
    })
}

/// Merge the contacts of a multi-part shape into one response contact.
///
/// Normals are penetration-weighted so the deepest lobe dominates; the
/// penetration reported is the deepest single part, not the sum.
pub fn merge_contacts(contacts: &[Contact]) -> Option<Contact> {
    if contacts.is_empty() {
        return None;
    }
    let mut normal_sum = Vec2::ZERO;
    let mut point_sum = Vec2::ZERO;
    let mut deepest = 0.0f32;
    for c in contacts {
        normal_sum += c.normal * c.penetration.max(1e-3);
        point_sum += c.point;
        deepest = deepest.max(c.penetration);
    }
    let normal = normal_sum.normalize_or_zero();
    // Opposing lobes can cancel out, fall back to the deepest contact
    let normal = if normal.length_squared() < 0.5 {
        contacts
            .iter()
            .cloned()
            .fold(contacts[0], |a, b| if b.penetration > a.penetration { b } else { a })
            .normal
    } else {
        normal
    };
    Some(Contact {
        point: point_sum / contacts.len() as f32,
        normal,
        penetration: deepest,
    })
}

/// Standard reflection: v' = v - 2(v.n)n
#[inline]
pub fn reflect_velocity(velocity: Vec2, normal: Vec2) -> Vec2 {
    velocity - 2.0 * velocity.dot(normal) * normal
}

impl Contact {
    /// True when the body struck the obstacle's top surface
    #[inline]
    pub fn hit_from_above(&self) -> bool {
        self.normal.y < -0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_contact_overlap() {
        // Body directly above a cloud circle, slightly overlapping
        let contact = circle_contact(Vec2::new(0.0, -60.0), 20.0, Vec2::ZERO, 50.0).unwrap();
        assert!(contact.normal.y < -0.99);
        assert!((contact.penetration - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_circle_contact_miss() {
        assert!(circle_contact(Vec2::new(0.0, -200.0), 20.0, Vec2::ZERO, 50.0).is_none());
    }

    #[test]
    fn test_circle_contact_concentric_fallback() {
        let contact = circle_contact(Vec2::ZERO, 20.0, Vec2::ZERO, 50.0).unwrap();
        assert_eq!(contact.normal, Vec2::NEG_Y);
    }

    #[test]
    fn test_rect_contact_from_above() {
        let contact =
            rect_contact(Vec2::new(0.0, -55.0), 10.0, Vec2::ZERO, Vec2::new(100.0, 50.0)).unwrap();
        assert!(contact.hit_from_above());
        assert!((contact.penetration - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_rect_contact_center_inside() {
        // Body center buried in the rect resolves along the shallow axis
        let contact =
            rect_contact(Vec2::new(90.0, 0.0), 10.0, Vec2::ZERO, Vec2::new(100.0, 50.0)).unwrap();
        assert!(contact.normal.x > 0.99);
    }

    #[test]
    fn test_rect_contact_corner_normal() {
        let contact =
            rect_contact(Vec2::new(105.0, -55.0), 10.0, Vec2::ZERO, Vec2::new(100.0, 50.0))
                .unwrap();
        assert!(contact.normal.x > 0.0 && contact.normal.y < 0.0);
    }

    #[test]
    fn test_merge_prefers_deepest() {
        let a = Contact {
            point: Vec2::ZERO,
            normal: Vec2::NEG_Y,
            penetration: 8.0,
        };
        let b = Contact {
            point: Vec2::new(10.0, 0.0),
            normal: Vec2::X,
            penetration: 1.0,
        };
        let merged = merge_contacts(&[a, b]).unwrap();
        assert_eq!(merged.penetration, 8.0);
        assert!(merged.normal.y < -0.5);
    }

    #[test]
    fn test_merge_opposing_lobes_falls_back() {
        let a = Contact {
            point: Vec2::ZERO,
            normal: Vec2::X,
            penetration: 5.0,
        };
        let b = Contact {
            point: Vec2::ZERO,
            normal: Vec2::NEG_X,
            penetration: 5.0,
        };
        let merged = merge_contacts(&[a, b]).unwrap();
        assert!(merged.normal.length_squared() > 0.5);
    }

    #[test]
    fn test_reflect_velocity() {
        let v = reflect_velocity(Vec2::new(0.0, 10.0), Vec2::NEG_Y);
        assert!((v.y - (-10.0)).abs() < 1e-4);
        assert!(v.x.abs() < 1e-4);
    }
}
