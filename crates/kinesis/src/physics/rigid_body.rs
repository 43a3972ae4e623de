use super::{
    BodyDef, BodyHandle, BodyProperty, BodyType, CollisionShape, FixtureHandle, PhysicsError,
    PhysicsHandle,
};
use crate::ecs::Component;
use glam::Vec2;
use log::*;

/// Lifecycle stage of a [`RigidBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    /// Waiting for the physics system to create the solver body.
    Pending,
    Live,
    Destroyed,
}

#[derive(Debug)]
enum Lifecycle {
    Pending(BodyDef),
    Live(BodyHandle),
    Destroyed,
}

/// Component tying an entity to a solver body.
///
/// Construction only records the body's definition, see the [module docs](super) for how the
/// body comes to life. Every setter is safe to call at any point before destruction: pending
/// bodies record the value into their definition, live bodies forward it to the solver.
///
/// The entity's [`Transform`](crate::ecs::components::Transform) is overwritten with the solver's
/// results on every physics step.
#[derive(Debug)]
pub struct RigidBody {
    world: PhysicsHandle,
    body_type: BodyType,
    lifecycle: Lifecycle,
    shapes: Vec<CollisionShape>,
    fixtures: Vec<FixtureHandle>,
}

impl Component for RigidBody {}

impl RigidBody {
    pub fn new(world: PhysicsHandle, body_type: BodyType) -> Self {
        Self {
            world,
            body_type,
            lifecycle: Lifecycle::Pending(BodyDef::new(body_type)),
            shapes: vec![],
            fixtures: vec![],
        }
    }

    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    pub fn state(&self) -> BodyState {
        match self.lifecycle {
            Lifecycle::Pending(_) => BodyState::Pending,
            Lifecycle::Live(_) => BodyState::Live,
            Lifecycle::Destroyed => BodyState::Destroyed,
        }
    }

    /// The solver body, once live.
    pub fn handle(&self) -> Option<BodyHandle> {
        match self.lifecycle {
            Lifecycle::Live(handle) => Some(handle),
            _ => None,
        }
    }

    /// The recorded definition, while pending.
    pub fn definition(&self) -> Option<&BodyDef> {
        match &self.lifecycle {
            Lifecycle::Pending(def) => Some(def),
            _ => None,
        }
    }

    pub fn world(&self) -> &PhysicsHandle {
        &self.world
    }

    /// Shapes attached so far, in addition order.
    pub fn shapes(&self) -> &[CollisionShape] {
        &self.shapes
    }

    /// Number of fixtures created in the solver. Stays at zero while pending.
    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    /// Creates the solver body at the given placement, followed by a fixture for each pending
    /// shape.
    pub fn start(&mut self, position: Vec2, rotation: f32) -> Result<(), PhysicsError> {
        let mut def = match &self.lifecycle {
            Lifecycle::Pending(def) => def.clone(),
            Lifecycle::Live(_) => return Err(PhysicsError::AlreadyStarted),
            Lifecycle::Destroyed => return Err(PhysicsError::Destroyed),
        };
        def.position = position;
        def.rotation = rotation;

        let mut world = self.world.world_mut()?;
        let handle = world.create_body(&def);

        // All or nothing, a failed start leaves the body pending
        let mut fixtures = Vec::with_capacity(self.shapes.len());
        for shape in &self.shapes {
            match world.create_fixture(handle, shape) {
                Ok(fixture) => fixtures.push(fixture),
                Err(error) => {
                    if let Err(cleanup) = world.destroy_body(handle) {
                        warn!("Couldn't roll back body {handle:?}: {cleanup}");
                    }
                    return Err(error);
                }
            }
        }

        self.fixtures = fixtures;
        self.lifecycle = Lifecycle::Live(handle);
        trace!("Created {:?} body {handle:?} at {position}", self.body_type);
        Ok(())
    }

    /// Attaches a copy of `shape` to the body.
    pub fn add_collision_shape(&mut self, shape: &CollisionShape) -> Result<(), PhysicsError> {
        match self.lifecycle {
            Lifecycle::Pending(_) => {
                shape.validate()?;
                self.shapes.push(shape.clone());
            }
            Lifecycle::Live(handle) => {
                let fixture = self.world.world_mut()?.create_fixture(handle, shape)?;
                self.shapes.push(shape.clone());
                self.fixtures.push(fixture);
            }
            Lifecycle::Destroyed => return Err(PhysicsError::Destroyed),
        }
        Ok(())
    }

    /// Applies a property, either to the pending definition or to the live solver body.
    pub fn set(&mut self, property: BodyProperty) -> Result<(), PhysicsError> {
        match &mut self.lifecycle {
            Lifecycle::Pending(def) => {
                def.apply(property);
                Ok(())
            }
            Lifecycle::Live(handle) => self.world.world_mut()?.set_body_property(*handle, property),
            Lifecycle::Destroyed => Err(PhysicsError::Destroyed),
        }
    }

    pub fn set_linear_velocity(&mut self, velocity: Vec2) -> Result<(), PhysicsError> {
        self.set(BodyProperty::LinearVelocity(velocity))
    }

    pub fn set_angular_velocity(&mut self, velocity: f32) -> Result<(), PhysicsError> {
        self.set(BodyProperty::AngularVelocity(velocity))
    }

    pub fn set_linear_damping(&mut self, damping: f32) -> Result<(), PhysicsError> {
        self.set(BodyProperty::LinearDamping(damping))
    }

    pub fn set_angular_damping(&mut self, damping: f32) -> Result<(), PhysicsError> {
        self.set(BodyProperty::AngularDamping(damping))
    }

    pub fn set_allow_sleep(&mut self, allow: bool) -> Result<(), PhysicsError> {
        self.set(BodyProperty::AllowSleep(allow))
    }

    pub fn set_awake(&mut self, awake: bool) -> Result<(), PhysicsError> {
        self.set(BodyProperty::Awake(awake))
    }

    pub fn set_fixed_rotation(&mut self, fixed: bool) -> Result<(), PhysicsError> {
        self.set(BodyProperty::FixedRotation(fixed))
    }

    pub fn set_bullet(&mut self, bullet: bool) -> Result<(), PhysicsError> {
        self.set(BodyProperty::Bullet(bullet))
    }

    pub fn set_active(&mut self, active: bool) -> Result<(), PhysicsError> {
        self.set(BodyProperty::Active(active))
    }

    pub fn set_gravity_scale(&mut self, scale: f32) -> Result<(), PhysicsError> {
        self.set(BodyProperty::GravityScale(scale))
    }

    /// Teleports a live body. Pending bodies are placed at their entity's transform when they
    /// start, so this has no lasting effect on them.
    pub fn set_placement(&mut self, position: Vec2, rotation: f32) -> Result<(), PhysicsError> {
        self.set(BodyProperty::Placement { position, rotation })
    }

    pub fn linear_velocity(&self) -> Result<Vec2, PhysicsError> {
        match &self.lifecycle {
            Lifecycle::Pending(def) => Ok(def.linear_velocity),
            Lifecycle::Live(handle) => self
                .world
                .world()?
                .body_state(*handle)
                .map(|state| state.linear_velocity)
                .ok_or(PhysicsError::UnknownBody(*handle)),
            Lifecycle::Destroyed => Err(PhysicsError::Destroyed),
        }
    }

    pub fn angular_velocity(&self) -> Result<f32, PhysicsError> {
        match &self.lifecycle {
            Lifecycle::Pending(def) => Ok(def.angular_velocity),
            Lifecycle::Live(handle) => self
                .world
                .world()?
                .body_state(*handle)
                .map(|state| state.angular_velocity)
                .ok_or(PhysicsError::UnknownBody(*handle)),
            Lifecycle::Destroyed => Err(PhysicsError::Destroyed),
        }
    }

    /// Removes the solver body and all of its fixtures. Calling this more than once is fine.
    pub fn destroy(&mut self) -> Result<(), PhysicsError> {
        if let Lifecycle::Live(handle) = self.lifecycle {
            self.world.world_mut()?.destroy_body(handle)?;
            trace!("Destroyed body {handle:?}");
        }

        self.lifecycle = Lifecycle::Destroyed;
        self.shapes.clear();
        self.fixtures.clear();
        Ok(())
    }
}

impl Drop for RigidBody {
    fn drop(&mut self) {
        if let Err(error) = self.destroy() {
            warn!("Rigid body leaked from its physics world: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::{
        rapier::RapierWorld,
        testing::{RecordingWorld, WorldCall},
        PhysicsWorld,
    };

    #[test]
    fn pending_shapes_flush_in_order() {
        let (world, handle) = RecordingWorld::shared();
        let mut body = RigidBody::new(handle, BodyType::Dynamic);

        let shapes = [
            CollisionShape::circle(1.0),
            CollisionShape::rectangle(Vec2::ONE),
            CollisionShape::edge(Vec2::ZERO, Vec2::X),
        ];
        for shape in &shapes {
            body.add_collision_shape(shape).unwrap();
        }

        assert_eq!(body.state(), BodyState::Pending);
        assert_eq!(body.fixture_count(), 0);
        assert!(world.borrow().calls.is_empty());

        body.start(Vec2::new(3.0, 4.0), 0.0).unwrap();
        assert_eq!(body.state(), BodyState::Live);
        assert_eq!(body.fixture_count(), 3);

        let world = world.borrow();
        assert!(matches!(
            &world.calls[0],
            WorldCall::CreateBody(_, def) if def.position == Vec2::new(3.0, 4.0)
        ));
        let created: Vec<_> = world.fixture_shapes().into_iter().cloned().collect();
        assert_eq!(created, shapes);
    }

    #[test]
    fn starting_twice_is_rejected() {
        let (_world, handle) = RecordingWorld::shared();
        let mut body = RigidBody::new(handle, BodyType::Static);

        body.start(Vec2::ZERO, 0.0).unwrap();
        assert_eq!(
            body.start(Vec2::ZERO, 0.0),
            Err(PhysicsError::AlreadyStarted)
        );

        body.destroy().unwrap();
        assert_eq!(body.start(Vec2::ZERO, 0.0), Err(PhysicsError::Destroyed));
    }

    #[test]
    fn pending_setters_are_not_lost() {
        let (world, handle) = RecordingWorld::shared();
        let mut body = RigidBody::new(handle, BodyType::Dynamic);

        body.set_linear_velocity(Vec2::new(2.0, 3.0)).unwrap();
        body.set_fixed_rotation(true).unwrap();
        body.set_bullet(true).unwrap();
        body.set_awake(false).unwrap();
        body.set_gravity_scale(0.5).unwrap();
        assert_eq!(body.linear_velocity(), Ok(Vec2::new(2.0, 3.0)));

        body.start(Vec2::ZERO, 0.0).unwrap();
        let world_ref = world.borrow();
        let WorldCall::CreateBody(_, def) = &world_ref.calls[0] else {
            panic!("expected body creation, got {:?}", world_ref.calls[0]);
        };
        assert_eq!(def.linear_velocity, Vec2::new(2.0, 3.0));
        assert!(def.fixed_rotation);
        assert!(def.bullet);
        assert!(!def.awake);
        assert_eq!(def.gravity_scale, 0.5);
    }

    #[test]
    fn live_setters_go_to_the_solver() {
        let (world, handle) = RecordingWorld::shared();
        let mut body = RigidBody::new(handle, BodyType::Kinematic);
        body.start(Vec2::ZERO, 0.0).unwrap();

        body.set_angular_velocity(1.5).unwrap();
        body.add_collision_shape(&CollisionShape::circle(2.0)).unwrap();
        assert_eq!(body.fixture_count(), 1);
        assert_eq!(body.angular_velocity(), Ok(1.5));

        let body_handle = body.handle().unwrap();
        assert!(world.borrow().calls.contains(&WorldCall::SetProperty(
            body_handle,
            BodyProperty::AngularVelocity(1.5)
        )));
    }

    #[test]
    fn destruction_is_idempotent() {
        let (world, handle) = RecordingWorld::shared();
        let mut body = RigidBody::new(handle, BodyType::Dynamic);
        body.add_collision_shape(&CollisionShape::circle(1.0)).unwrap();
        body.start(Vec2::ZERO, 0.0).unwrap();
        assert_eq!(world.borrow().body_count(), 1);

        body.destroy().unwrap();
        body.destroy().unwrap();
        assert_eq!(body.state(), BodyState::Destroyed);
        assert!(body.shapes().is_empty());
        assert_eq!(world.borrow().body_count(), 0);

        assert_eq!(
            body.add_collision_shape(&CollisionShape::circle(1.0)),
            Err(PhysicsError::Destroyed)
        );
        assert_eq!(body.set_bullet(true), Err(PhysicsError::Destroyed));

        drop(body);
        let destroys = world
            .borrow()
            .calls
            .iter()
            .filter(|call| matches!(call, WorldCall::DestroyBody(_)))
            .count();
        assert_eq!(destroys, 1);
    }

    #[test]
    fn dropping_a_live_body_removes_it() {
        let (world, handle) = RecordingWorld::shared();
        let mut body = RigidBody::new(handle, BodyType::Dynamic);
        body.start(Vec2::ZERO, 0.0).unwrap();

        drop(body);
        assert_eq!(world.borrow().body_count(), 0);
    }

    #[test]
    fn invalid_shapes_fail_on_a_live_body() {
        let (_world, handle) = RecordingWorld::shared();
        let mut body = RigidBody::new(handle, BodyType::Dynamic);
        body.start(Vec2::ZERO, 0.0).unwrap();

        assert!(matches!(
            body.add_collision_shape(&CollisionShape::circle(0.0)),
            Err(PhysicsError::InvalidShape(_))
        ));
        assert_eq!(body.fixture_count(), 0);
        assert!(body.shapes().is_empty());
    }

    #[test]
    fn invalid_shapes_fail_on_a_pending_body() {
        let (world, handle) = RecordingWorld::shared();
        let mut body = RigidBody::new(handle, BodyType::Dynamic);

        assert!(matches!(
            body.add_collision_shape(&CollisionShape::circle(0.0)),
            Err(PhysicsError::InvalidShape(_))
        ));
        assert!(body.shapes().is_empty());

        body.start(Vec2::ZERO, 0.0).unwrap();
        assert_eq!(body.fixture_count(), 0);
        assert!(world.borrow().fixture_shapes().is_empty());
    }

    #[test]
    fn failed_start_stays_pending() {
        let handle = PhysicsHandle::new(RapierWorld::new(Vec2::ZERO, 1.0));
        let mut body = RigidBody::new(handle.clone(), BodyType::Dynamic);

        // Passes the geometry checks, but has no area for the solver to work with
        let collinear = CollisionShape::polygon(vec![
            Vec2::ZERO,
            Vec2::new(1.0, 0.0),
            Vec2::new(2.0, 0.0),
        ]);
        body.add_collision_shape(&CollisionShape::circle(1.0)).unwrap();
        body.add_collision_shape(&collinear).unwrap();
        body.add_collision_shape(&CollisionShape::circle(2.0)).unwrap();

        for _ in 0..2 {
            assert!(matches!(
                body.start(Vec2::ZERO, 0.0),
                Err(PhysicsError::InvalidShape(_))
            ));
            assert_eq!(body.state(), BodyState::Pending);
            assert_eq!(body.fixture_count(), 0);
            assert_eq!(body.shapes().len(), 3);
            assert_eq!(handle.world().unwrap().body_count(), 0);
        }
    }
}
