//! # Rigid body physics
//! Kinesis doesn't simulate anything on its own. Bodies live inside an external solver hidden
//! behind the [`PhysicsWorld`] trait, and entities get tied to them through the [`RigidBody`]
//! component.
//!
//! ## Body lifecycle
//! A [`RigidBody`] starts out *pending*: it only records its definition and shapes. The
//! [`PhysicsSystem`] starts it at the beginning of the next frame, creating the solver body at the
//! entity's [`Transform`](crate::ecs::components::Transform) and one fixture per shape, in the
//! order they were added. From then on the body is *live* and every setter goes straight to the
//! solver. Destroying the body (explicitly, or by dropping the component) removes it from the
//! solver together with all of its fixtures.
//!
//! The shipped solver is [`rapier::RapierWorld`].

use glam::Vec2;
use kinesis_utils::PoolHandle;
use std::{
    cell::{Ref, RefCell, RefMut},
    fmt,
    rc::Rc,
};
use thiserror::Error;

pub mod rapier;

mod rigid_body;
pub use rigid_body::*;

mod shape;
pub use shape::*;

mod system;
pub use system::*;

#[cfg(test)]
pub(crate) mod testing;

/// Solver-side body, as handed out by a [`PhysicsWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub PoolHandle);

/// Solver-side fixture, a shape attached to a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixtureHandle(pub PoolHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BodyType {
    /// Never moves.
    Static,
    /// Fully simulated.
    #[default]
    Dynamic,
    /// Moved only by its velocity, unaffected by forces and contacts.
    Kinematic,
}

/// A single tunable property of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyProperty {
    LinearVelocity(Vec2),
    AngularVelocity(f32),
    LinearDamping(f32),
    AngularDamping(f32),
    /// Whether the solver may put the body to sleep once it comes to rest.
    AllowSleep(bool),
    /// Whether the body is awake. For pending bodies, whether it spawns awake.
    Awake(bool),
    FixedRotation(bool),
    /// Enables continuous collision detection, for fast moving bodies.
    Bullet(bool),
    /// Whether the body takes part in the simulation. For pending bodies, whether it spawns
    /// active.
    Active(bool),
    GravityScale(f32),
    /// Teleports the body.
    Placement { position: Vec2, rotation: f32 },
}

/// Everything needed to create a solver body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDef {
    pub body_type: BodyType,
    pub position: Vec2,
    pub rotation: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub allow_sleep: bool,
    pub awake: bool,
    pub fixed_rotation: bool,
    pub bullet: bool,
    pub active: bool,
    pub gravity_scale: f32,
}

impl BodyDef {
    pub fn new(body_type: BodyType) -> Self {
        Self {
            body_type,
            position: Vec2::ZERO,
            rotation: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            allow_sleep: true,
            awake: true,
            fixed_rotation: false,
            bullet: false,
            active: true,
            gravity_scale: 1.0,
        }
    }

    /// Records a property into the definition.
    pub fn apply(&mut self, property: BodyProperty) {
        match property {
            BodyProperty::LinearVelocity(v) => self.linear_velocity = v,
            BodyProperty::AngularVelocity(w) => self.angular_velocity = w,
            BodyProperty::LinearDamping(d) => self.linear_damping = d,
            BodyProperty::AngularDamping(d) => self.angular_damping = d,
            BodyProperty::AllowSleep(b) => self.allow_sleep = b,
            BodyProperty::Awake(b) => self.awake = b,
            BodyProperty::FixedRotation(b) => self.fixed_rotation = b,
            BodyProperty::Bullet(b) => self.bullet = b,
            BodyProperty::Active(b) => self.active = b,
            BodyProperty::GravityScale(s) => self.gravity_scale = s,
            BodyProperty::Placement { position, rotation } => {
                self.position = position;
                self.rotation = rotation;
            }
        }
    }
}

impl Default for BodyDef {
    fn default() -> Self {
        Self::new(BodyType::default())
    }
}

/// Post-step state of a solver body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub position: Vec2,
    pub rotation: f32,
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub awake: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PhysicsError {
    #[error("the scene has no active physics world")]
    NoActiveWorld,
    #[error("rigid body was already started")]
    AlreadyStarted,
    #[error("rigid body was destroyed")]
    Destroyed,
    #[error("the physics world doesn't know body {0:?}")]
    UnknownBody(BodyHandle),
    #[error("invalid collision shape: {0}")]
    InvalidShape(&'static str),
    #[error("the physics world is already in use")]
    WorldBusy,
}

/// Interface of the external rigid-body solver.
///
/// All positions, velocities and sizes are in scene units. Implementations are free to rescale
/// them internally.
pub trait PhysicsWorld {
    /// Advances the simulation by `dt` seconds.
    fn step(&mut self, dt: f32);

    fn create_body(&mut self, def: &BodyDef) -> BodyHandle;

    /// Removes a body along with all of its fixtures.
    fn destroy_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError>;

    fn create_fixture(
        &mut self,
        body: BodyHandle,
        shape: &CollisionShape,
    ) -> Result<FixtureHandle, PhysicsError>;

    fn set_body_property(
        &mut self,
        body: BodyHandle,
        property: BodyProperty,
    ) -> Result<(), PhysicsError>;

    fn body_state(&self, body: BodyHandle) -> Option<BodySnapshot>;

    fn body_count(&self) -> usize;

    fn set_gravity(&mut self, gravity: Vec2);
}

/// Shared handle to a scene's [`PhysicsWorld`]. Cloning it is cheap, and every clone refers to
/// the same world.
#[derive(Clone)]
pub struct PhysicsHandle(Rc<RefCell<dyn PhysicsWorld>>);

impl PhysicsHandle {
    pub fn new(world: impl PhysicsWorld + 'static) -> Self {
        Self(Rc::new(RefCell::new(world)))
    }

    /// Wraps a world the caller keeps a typed reference to.
    pub fn from_shared<W: PhysicsWorld + 'static>(world: Rc<RefCell<W>>) -> Self {
        Self(world)
    }

    pub fn world(&self) -> Result<Ref<'_, dyn PhysicsWorld + 'static>, PhysicsError> {
        self.0.try_borrow().map_err(|_| PhysicsError::WorldBusy)
    }

    pub fn world_mut(&self) -> Result<RefMut<'_, dyn PhysicsWorld + 'static>, PhysicsError> {
        self.0.try_borrow_mut().map_err(|_| PhysicsError::WorldBusy)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PhysicsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PhysicsHandle")
            .field(&Rc::as_ptr(&self.0))
            .finish()
    }
}

/// Payload of [`crate::message_id::PHYSICS_STEPPED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsEvent {
    Stepped { steps: u32 },
}
