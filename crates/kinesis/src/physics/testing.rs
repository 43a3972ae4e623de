//! A solver double that records every call it receives.

use super::*;
use kinesis_utils::Pool;

#[derive(Debug, Clone, PartialEq)]
pub enum WorldCall {
    Step(f32),
    CreateBody(BodyHandle, BodyDef),
    DestroyBody(BodyHandle),
    CreateFixture(BodyHandle, CollisionShape),
    SetProperty(BodyHandle, BodyProperty),
}

/// Bodies just drift along their linear velocity, there's no gravity and no contacts.
#[derive(Default)]
pub struct RecordingWorld {
    pub calls: Vec<WorldCall>,
    bodies: Pool<BodyDef>,
    fixtures: Pool<BodyHandle>,
}

impl RecordingWorld {
    pub fn new() -> Self {
        Self {
            calls: vec![],
            bodies: Pool::new(),
            fixtures: Pool::new(),
        }
    }

    pub fn shared() -> (Rc<RefCell<Self>>, PhysicsHandle) {
        let world = Rc::new(RefCell::new(Self::new()));
        let handle = PhysicsHandle::from_shared(world.clone());
        (world, handle)
    }

    /// Shapes given to `create_fixture`, in call order.
    pub fn fixture_shapes(&self) -> Vec<&CollisionShape> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                WorldCall::CreateFixture(_, shape) => Some(shape),
                _ => None,
            })
            .collect()
    }

    pub fn step_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, WorldCall::Step(_)))
            .count()
    }
}

impl PhysicsWorld for RecordingWorld {
    fn step(&mut self, dt: f32) {
        self.calls.push(WorldCall::Step(dt));
        for (_, def) in self.bodies.iter_mut() {
            if def.body_type != BodyType::Static && def.active {
                def.position += def.linear_velocity * dt;
                def.rotation += def.angular_velocity * dt;
            }
        }
    }

    fn create_body(&mut self, def: &BodyDef) -> BodyHandle {
        let handle = BodyHandle(self.bodies.allocate(def.clone()));
        self.calls.push(WorldCall::CreateBody(handle, def.clone()));
        handle
    }

    fn destroy_body(&mut self, body: BodyHandle) -> Result<(), PhysicsError> {
        self.bodies
            .deallocate(body.0)
            .ok_or(PhysicsError::UnknownBody(body))?;
        self.calls.push(WorldCall::DestroyBody(body));
        Ok(())
    }

    fn create_fixture(
        &mut self,
        body: BodyHandle,
        shape: &CollisionShape,
    ) -> Result<FixtureHandle, PhysicsError> {
        if !self.bodies.is_valid(body.0) {
            return Err(PhysicsError::UnknownBody(body));
        }
        shape.validate()?;
        self.calls.push(WorldCall::CreateFixture(body, shape.clone()));
        Ok(FixtureHandle(self.fixtures.allocate(body)))
    }

    fn set_body_property(
        &mut self,
        body: BodyHandle,
        property: BodyProperty,
    ) -> Result<(), PhysicsError> {
        self.bodies
            .try_get_mut(body.0)
            .ok_or(PhysicsError::UnknownBody(body))?
            .apply(property);
        self.calls.push(WorldCall::SetProperty(body, property));
        Ok(())
    }

    fn body_state(&self, body: BodyHandle) -> Option<BodySnapshot> {
        self.bodies.try_get(body.0).map(|def| BodySnapshot {
            position: def.position,
            rotation: def.rotation,
            linear_velocity: def.linear_velocity,
            angular_velocity: def.angular_velocity,
            awake: def.awake,
        })
    }

    fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn set_gravity(&mut self, _gravity: Vec2) {}
}
