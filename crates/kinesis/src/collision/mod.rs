//! # Collision detection and response
//! A lightweight contact layer independent of the physics solver. Entities with a [`Collider`]
//! and a [`Transform`] are tracked by the [`CollisionSystem`], which finds overlapping pairs with
//! a [`BroadPhase`] index, confirms them with exact geometry tests and hands the resulting
//! [`Manifold`] to each entity's response callback.
//!
//! Colliders are axis-aligned: only the entity's position is taken into account, rotation and
//! scale are ignored.

use crate::{
    ecs::{components::Transform, Component, Entity},
    scene::SystemContext,
};
use glam::Vec2;
use std::{fmt, rc::Rc};

mod broad_phase;
pub use broad_phase::*;

mod narrow_phase;
pub use narrow_phase::*;

mod system;
pub use system::*;

/// Called with `(ctx, self, other, manifold)`, where the manifold's normal points from `other`
/// toward `self`.
pub type CollisionCallback =
    Rc<dyn Fn(&mut SystemContext<'_>, Entity, Entity, &Manifold) -> crate::Result>;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    /// Checks for overlap. Boxes that merely touch overlap too.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }
}

/// Collider geometry, relative to the entity's position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Aabb { half_extents: Vec2, offset: Vec2 },
    Circle { radius: f32, offset: Vec2 },
}

impl ColliderShape {
    /// Places the shape in the world, at the given entity position.
    pub fn at(&self, position: Vec2) -> WorldShape {
        match *self {
            ColliderShape::Aabb {
                half_extents,
                offset,
            } => WorldShape::Aabb(Aabb::from_center(position + offset, half_extents)),
            ColliderShape::Circle { radius, offset } => WorldShape::Circle {
                center: position + offset,
                radius,
            },
        }
    }
}

/// Collider component.
#[derive(Clone)]
pub struct Collider {
    pub shape: ColliderShape,
    /// Pairs where neither collider is dynamic are never tested.
    pub dynamic: bool,
    callback: Option<CollisionCallback>,
}

impl Component for Collider {}

impl Collider {
    pub fn new(shape: ColliderShape) -> Self {
        Self {
            shape,
            dynamic: false,
            callback: None,
        }
    }

    pub fn aabb(half_extents: Vec2) -> Self {
        Self::new(ColliderShape::Aabb {
            half_extents,
            offset: Vec2::ZERO,
        })
    }

    pub fn circle(radius: f32) -> Self {
        Self::new(ColliderShape::Circle {
            radius,
            offset: Vec2::ZERO,
        })
    }

    pub fn with_offset(mut self, by: Vec2) -> Self {
        match &mut self.shape {
            ColliderShape::Aabb { offset, .. } | ColliderShape::Circle { offset, .. } => {
                *offset += by
            }
        }
        self
    }

    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Sets the response callback, replacing any previous one.
    pub fn on_collision<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut SystemContext<'_>, Entity, Entity, &Manifold) -> crate::Result + 'static,
    {
        self.callback = Some(Rc::new(callback));
        self
    }

    pub fn callback(&self) -> Option<CollisionCallback> {
        self.callback.clone()
    }

    pub fn world_shape(&self, transform: &Transform) -> WorldShape {
        self.shape.at(transform.position)
    }
}

impl fmt::Debug for Collider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collider")
            .field("shape", &self.shape)
            .field("dynamic", &self.dynamic)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Contact between two colliders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Manifold {
    /// Unit vector pointing from the other entity toward the receiving one.
    pub normal: Vec2,
    /// How deep the shapes overlap along the normal.
    pub penetration: f32,
    pub contact_point: Vec2,
}

impl Manifold {
    /// The same contact, seen from the other entity.
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            ..*self
        }
    }
}

/// Payload of [`crate::message_id::CONTACT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub a: Entity,
    pub b: Entity,
}
