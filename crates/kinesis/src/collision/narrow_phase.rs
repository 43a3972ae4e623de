use super::{Aabb, Manifold};
use glam::Vec2;

/// Collider geometry placed in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldShape {
    Aabb(Aabb),
    Circle { center: Vec2, radius: f32 },
}

impl WorldShape {
    pub fn bounds(&self) -> Aabb {
        match *self {
            WorldShape::Aabb(aabb) => aabb,
            WorldShape::Circle { center, radius } => Aabb::from_center(center, Vec2::splat(radius)),
        }
    }

    pub fn center(&self) -> Vec2 {
        match *self {
            WorldShape::Aabb(aabb) => aabb.center(),
            WorldShape::Circle { center, .. } => center,
        }
    }
}

/// Exact overlap test. The returned manifold is seen from `a`: its normal points from `b` toward
/// `a`. Shapes that only touch don't collide.
pub fn collide(a: &WorldShape, b: &WorldShape) -> Option<Manifold> {
    match (*a, *b) {
        (WorldShape::Aabb(a), WorldShape::Aabb(b)) => aabb_aabb(&a, &b),
        (
            WorldShape::Circle {
                center: ca,
                radius: ra,
            },
            WorldShape::Circle {
                center: cb,
                radius: rb,
            },
        ) => circle_circle(ca, ra, cb, rb),
        (WorldShape::Circle { center, radius }, WorldShape::Aabb(aabb)) => {
            circle_aabb(center, radius, &aabb)
        }
        (WorldShape::Aabb(aabb), WorldShape::Circle { center, radius }) => {
            circle_aabb(center, radius, &aabb).map(|manifold| manifold.flipped())
        }
    }
}

fn aabb_aabb(a: &Aabb, b: &Aabb) -> Option<Manifold> {
    let overlap_min = a.min.max(b.min);
    let overlap_max = a.max.min(b.max);
    let overlap = overlap_max - overlap_min;
    if overlap.x <= 0.0 || overlap.y <= 0.0 {
        return None;
    }

    let delta = a.center() - b.center();
    let (normal, penetration) = if overlap.x < overlap.y {
        (Vec2::new(sign(delta.x), 0.0), overlap.x)
    } else {
        (Vec2::new(0.0, sign(delta.y)), overlap.y)
    };

    Some(Manifold {
        normal,
        penetration,
        contact_point: (overlap_min + overlap_max) * 0.5,
    })
}

fn circle_circle(ca: Vec2, ra: f32, cb: Vec2, rb: f32) -> Option<Manifold> {
    let delta = ca - cb;
    let distance = delta.length();
    let reach = ra + rb;
    if distance >= reach {
        return None;
    }

    // Concentric circles get an arbitrary, but stable, normal
    let normal = if distance > f32::EPSILON {
        delta / distance
    } else {
        Vec2::Y
    };

    Some(Manifold {
        normal,
        penetration: reach - distance,
        contact_point: cb + normal * rb,
    })
}

/// Circle `a` against box `b`.
fn circle_aabb(center: Vec2, radius: f32, aabb: &Aabb) -> Option<Manifold> {
    let closest = center.clamp(aabb.min, aabb.max);
    let delta = center - closest;
    let distance_squared = delta.length_squared();

    if distance_squared > f32::EPSILON * f32::EPSILON {
        let distance = distance_squared.sqrt();
        if distance >= radius {
            return None;
        }
        return Some(Manifold {
            normal: delta / distance,
            penetration: radius - distance,
            contact_point: closest,
        });
    }

    // The center is inside the box, push out through the nearest face
    let faces = [
        (center.x - aabb.min.x, Vec2::NEG_X),
        (aabb.max.x - center.x, Vec2::X),
        (center.y - aabb.min.y, Vec2::NEG_Y),
        (aabb.max.y - center.y, Vec2::Y),
    ];
    let (depth, normal) = faces
        .into_iter()
        .min_by(|(a, _), (b, _)| a.total_cmp(b))
        .unwrap_or((0.0, Vec2::Y));

    Some(Manifold {
        normal,
        penetration: radius + depth,
        contact_point: center + normal * depth,
    })
}

fn sign(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle(x: f32, y: f32, radius: f32) -> WorldShape {
        WorldShape::Circle {
            center: Vec2::new(x, y),
            radius,
        }
    }

    fn boxed(x: f32, y: f32, hx: f32, hy: f32) -> WorldShape {
        WorldShape::Aabb(Aabb::from_center(Vec2::new(x, y), Vec2::new(hx, hy)))
    }

    fn assert_faces_a(a: &WorldShape, b: &WorldShape) -> Manifold {
        let manifold = collide(a, b).expect("shapes should overlap");
        assert!(manifold.normal.dot(a.center() - b.center()) > 0.0);
        assert!((manifold.normal.length() - 1.0).abs() < 1e-5);
        assert!(manifold.penetration > 0.0);

        let reverse = collide(b, a).expect("overlap is symmetric");
        assert!(reverse.normal.dot(b.center() - a.center()) > 0.0);
        manifold
    }

    #[test]
    fn circles() {
        let manifold = assert_faces_a(&circle(1.5, 0.0, 1.0), &circle(0.0, 0.0, 1.0));
        assert_eq!(manifold.normal, Vec2::X);
        assert!((manifold.penetration - 0.5).abs() < 1e-6);
        assert_eq!(manifold.contact_point, Vec2::X);

        assert!(collide(&circle(2.0, 0.0, 1.0), &circle(0.0, 0.0, 1.0)).is_none());
    }

    #[test]
    fn boxes_separate_along_the_shallow_axis() {
        let manifold = assert_faces_a(&boxed(0.0, 1.8, 1.0, 1.0), &boxed(0.5, 0.0, 1.0, 1.0));
        assert_eq!(manifold.normal, Vec2::Y);
        assert!((manifold.penetration - 0.2).abs() < 1e-5);

        assert!(collide(&boxed(0.0, 2.0, 1.0, 1.0), &boxed(0.0, 0.0, 1.0, 1.0)).is_none());
    }

    #[test]
    fn circle_against_box() {
        // Resting on top of a floor
        let ball = circle(0.0, 1.4, 0.5);
        let floor = boxed(0.0, 0.0, 10.0, 1.0);
        let manifold = assert_faces_a(&ball, &floor);
        assert_eq!(manifold.normal, Vec2::Y);
        assert!((manifold.penetration - 0.1).abs() < 1e-5);
        assert_eq!(manifold.contact_point, Vec2::new(0.0, 1.0));

        // Center sunk into the box
        let sunk = circle(9.5, 0.0, 1.0);
        let manifold = assert_faces_a(&sunk, &floor);
        assert_eq!(manifold.normal, Vec2::X);
        assert!((manifold.penetration - 1.5).abs() < 1e-5);

        // Near a corner, but out of reach
        assert!(collide(&circle(11.0, 2.0, 1.0), &floor).is_none());
    }

    #[test]
    fn box_against_circle_is_flipped() {
        let ceiling = boxed(0.0, 5.0, 10.0, 1.0);
        let ball = circle(0.0, 3.5, 1.0);
        let manifold = collide(&ceiling, &ball).unwrap();
        assert_eq!(manifold.normal, Vec2::Y);

        let manifold = collide(&ball, &ceiling).unwrap();
        assert_eq!(manifold.normal, Vec2::NEG_Y);
    }
}
