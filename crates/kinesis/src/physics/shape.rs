use super::PhysicsError;
use glam::Vec2;

/// Physical surface properties of a collision shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Sensors report overlaps, but never generate contact forces.
    pub sensor: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
            sensor: false,
        }
    }
}

/// Shape geometry, in body local space and scene units.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Circle {
        radius: f32,
        offset: Vec2,
    },
    Box {
        half_extents: Vec2,
        offset: Vec2,
        rotation: f32,
    },
    /// Convex polygon. Points don't have to be in any particular order, the solver computes
    /// their convex hull.
    Polygon { points: Vec<Vec2> },
    Edge { a: Vec2, b: Vec2 },
}

/// A shape descriptor attached to rigid bodies. Bodies keep their own copy, so a single shape
/// can be reused for any number of bodies.
///
/// ```
/// # use kinesis::physics::CollisionShape;
/// # use glam::Vec2;
/// let wheel = CollisionShape::circle(0.5)
///     .with_offset(Vec2::new(1.0, 0.0))
///     .with_friction(0.9);
///
/// assert!(wheel.validate().is_ok());
/// assert!(CollisionShape::circle(-1.0).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionShape {
    pub kind: ShapeKind,
    pub material: Material,
}

impl CollisionShape {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            material: Material::default(),
        }
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(ShapeKind::Circle {
            radius,
            offset: Vec2::ZERO,
        })
    }

    pub fn rectangle(half_extents: Vec2) -> Self {
        Self::new(ShapeKind::Box {
            half_extents,
            offset: Vec2::ZERO,
            rotation: 0.0,
        })
    }

    pub fn polygon(points: impl Into<Vec<Vec2>>) -> Self {
        Self::new(ShapeKind::Polygon {
            points: points.into(),
        })
    }

    pub fn edge(a: Vec2, b: Vec2) -> Self {
        Self::new(ShapeKind::Edge { a, b })
    }

    /// Moves the shape away from the body origin. Polygons and edges have their points shifted.
    pub fn with_offset(mut self, by: Vec2) -> Self {
        match &mut self.kind {
            ShapeKind::Circle { offset, .. } | ShapeKind::Box { offset, .. } => *offset += by,
            ShapeKind::Polygon { points } => points.iter_mut().for_each(|point| *point += by),
            ShapeKind::Edge { a, b } => {
                *a += by;
                *b += by;
            }
        }
        self
    }

    /// Rotates a box around its own center. Other shapes are left unchanged.
    pub fn with_rotation(mut self, angle: f32) -> Self {
        if let ShapeKind::Box { rotation, .. } = &mut self.kind {
            *rotation = angle;
        }
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.material.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.material.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.material.restitution = restitution;
        self
    }

    pub fn sensor(mut self, sensor: bool) -> Self {
        self.material.sensor = sensor;
        self
    }

    /// Rejects shapes no solver can work with.
    pub fn validate(&self) -> Result<(), PhysicsError> {
        let valid = match &self.kind {
            ShapeKind::Circle { radius, offset } => {
                radius.is_finite() && *radius > 0.0 && offset.is_finite()
            }
            ShapeKind::Box {
                half_extents,
                offset,
                rotation,
            } => {
                half_extents.is_finite()
                    && half_extents.min_element() > 0.0
                    && offset.is_finite()
                    && rotation.is_finite()
            }
            ShapeKind::Polygon { points } => {
                points.len() >= 3 && points.iter().all(|point| point.is_finite())
            }
            ShapeKind::Edge { a, b } => a.is_finite() && b.is_finite() && a != b,
        };

        let material = &self.material;
        if !valid {
            Err(PhysicsError::InvalidShape("degenerate geometry"))
        } else if !(material.density.is_finite() && material.density >= 0.0) {
            Err(PhysicsError::InvalidShape("density must be a non-negative number"))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_move_every_kind() {
        let shifted = CollisionShape::edge(Vec2::ZERO, Vec2::X).with_offset(Vec2::Y);
        assert_eq!(
            shifted.kind,
            ShapeKind::Edge {
                a: Vec2::Y,
                b: Vec2::new(1.0, 1.0)
            }
        );

        let boxed = CollisionShape::rectangle(Vec2::ONE)
            .with_offset(Vec2::X)
            .with_rotation(0.5);
        assert_eq!(
            boxed.kind,
            ShapeKind::Box {
                half_extents: Vec2::ONE,
                offset: Vec2::X,
                rotation: 0.5
            }
        );
    }

    #[test]
    fn degenerate_shapes_are_rejected() {
        assert!(CollisionShape::rectangle(Vec2::new(1.0, 0.0))
            .validate()
            .is_err());
        assert!(CollisionShape::polygon(vec![Vec2::ZERO, Vec2::X])
            .validate()
            .is_err());
        assert!(CollisionShape::edge(Vec2::ONE, Vec2::ONE).validate().is_err());
        assert!(CollisionShape::circle(1.0)
            .with_density(-2.0)
            .validate()
            .is_err());
        assert!(CollisionShape::polygon(vec![Vec2::ZERO, Vec2::X, Vec2::Y])
            .sensor(true)
            .validate()
            .is_ok());
    }
}
