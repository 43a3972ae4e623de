use crate::ecs::Component;
use glam::{Affine2, Vec2};

/// 2D placement of an entity: translation, rotation in radians and scale.
///
/// Entities with a [`crate::physics::RigidBody`] have their position and rotation overwritten by
/// the solver on every physics step, so writes made here are lost on the next step. Move such
/// entities through the rigid body instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec2,
    pub rotation: f32,
    pub scale: Vec2,
}

impl Component for Transform {}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Adds the provided vector to this transform's translation.
    #[inline]
    pub fn translate(&mut self, v: Vec2) {
        self.position += v;
    }

    #[inline]
    pub fn rotate(&mut self, radians: f32) {
        self.rotation += radians;
    }

    /// Converts the transform into an affine matrix, applying scale, then rotation, then
    /// translation.
    #[inline]
    pub fn as_affine(&self) -> Affine2 {
        Affine2::from_scale_angle_translation(self.scale, self.rotation, self.position)
    }

    /// Transforms a point from entity local space into world space.
    #[inline]
    pub fn transform_point(&self, local: Vec2) -> Vec2 {
        self.as_affine().transform_point2(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_to_world() {
        let mut transform = Transform::from_position(Vec2::new(10.0, 0.0));
        transform.rotate(std::f32::consts::FRAC_PI_2);
        transform.scale = Vec2::splat(2.0);

        let world = transform.transform_point(Vec2::X);
        assert!((world - Vec2::new(10.0, 2.0)).length() < 1e-5);
    }
}
