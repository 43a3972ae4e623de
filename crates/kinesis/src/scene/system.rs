use super::{Command, CommandQueue, InputEvent, Message, MessageBus, MessageId};
use crate::{
    ecs::{Component, EcsError, Entity, Requirements, Universe},
    physics::{PhysicsError, PhysicsHandle},
};
use kinesis_utils::AsAny;
use std::any::Any;

/// Trait implemented by scene systems.
///
/// Systems don't own entities. Each frame they look up whatever entities currently satisfy their
/// [`System::requirements`] through [`SystemContext::entities`].
///
/// Every hook may fail, in which case the scene aborts the frame and hands the error to the
/// caller of [`crate::Scene::update`].
pub trait System: AsAny {
    /// The system's label, used for logging and profiling. It must be a constant.
    fn label(&self) -> &'static str;

    /// Component kinds this system operates on. Queried once, when the system is added.
    fn requirements(&self) -> Requirements {
        Requirements::new()
    }

    /// Called at the very beginning of every frame, before message delivery. This is where
    /// components added since the last frame get started.
    fn frame_start(&mut self, ctx: &mut SystemContext) -> crate::Result {
        let _ = ctx;
        Ok(())
    }

    /// Called synchronously for every forwarded input event.
    fn handle_event(&mut self, event: &InputEvent, ctx: &mut SystemContext) -> crate::Result {
        let _ = (event, ctx);
        Ok(())
    }

    /// Called for every message posted since the previous frame.
    fn handle_message(&mut self, message: &Message, ctx: &mut SystemContext) -> crate::Result {
        let _ = (message, ctx);
        Ok(())
    }

    /// Main per-frame processing.
    fn process(&mut self, ctx: &mut SystemContext) -> crate::Result;
}

/// Everything a system, a command action or a collision callback gets to work with.
pub struct SystemContext<'a> {
    pub universe: &'a mut Universe,
    pub bus: &'a mut MessageBus,
    pub commands: &'a mut CommandQueue,
    /// Frame time in seconds. Zero during event dispatch.
    pub dt: f32,
    physics: Option<&'a PhysicsHandle>,
    requirements: &'a Requirements,
}

impl<'a> SystemContext<'a> {
    pub(crate) fn new(
        universe: &'a mut Universe,
        bus: &'a mut MessageBus,
        commands: &'a mut CommandQueue,
        physics: Option<&'a PhysicsHandle>,
        requirements: &'a Requirements,
        dt: f32,
    ) -> Self {
        Self {
            universe,
            bus,
            commands,
            dt,
            physics,
            requirements,
        }
    }

    /// Live entities satisfying the requirements of whoever got this context, in slot order.
    /// Contexts handed to command actions and collision callbacks carry no requirements, and
    /// list every live entity.
    pub fn entities(&self) -> Vec<Entity> {
        self.universe.query(self.requirements)
    }

    pub fn requirements(&self) -> &Requirements {
        self.requirements
    }

    /// Returns the scene's physics world handle.
    pub fn physics(&self) -> Result<PhysicsHandle, PhysicsError> {
        self.physics.cloned().ok_or(PhysicsError::NoActiveWorld)
    }

    /// Posts a message, to be delivered next frame.
    pub fn post_message<T: Any>(&mut self, id: MessageId, data: T) {
        self.bus.post_data(id, data);
    }

    pub fn post(&mut self, message: Message) {
        self.bus.post(message);
    }

    pub fn send_command(&mut self, command: Command) {
        self.commands.send(command);
    }

    pub fn create_entity(&mut self) -> Entity {
        self.universe.create_entity()
    }

    /// Schedules the entity for destruction at the scene's next flush point.
    pub fn destroy_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.universe.queue_destroy(entity)
    }

    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        component: T,
    ) -> Result<&mut T, EcsError> {
        self.universe.add_component(entity, component)
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.universe.get_component(entity)
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.universe.get_component_mut(entity)
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.universe.has_component::<T>(entity)
    }

    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<T, EcsError> {
        self.universe.remove_component(entity)
    }
}
