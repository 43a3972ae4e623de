//! # Scenes
//! A [`Scene`] is one gameplay session: it owns the [`Universe`] with every entity and component,
//! the ordered list of [`System`]s, the [`MessageBus`] and the [`CommandQueue`], and drives all of
//! them through [`Scene::update`]. See the [crate docs](crate) for the exact frame order.

use crate::{
    ecs::{
        components::CommandTarget, Component, EcsError, Entity, Requirements, Universe,
    },
    physics::{PhysicsError, PhysicsHandle, PhysicsWorld},
    profiler::{FrameProfiler, FrameStage, FrameTiming},
};
use log::*;
use std::any::Any;

mod bus;
pub use bus::*;

mod command;
pub use command::*;

pub mod config;
pub use config::{ConfigError, SceneConfig};

mod event;
pub use event::*;

mod system;
pub use system::*;


struct SystemEntry {
    system: Box<dyn System>,
    requirements: Requirements,
}

pub struct Scene {
    universe: Universe,
    systems: Vec<SystemEntry>,
    bus: MessageBus,
    commands: CommandQueue,
    physics: Option<PhysicsHandle>,
    profiler: FrameProfiler,
    config: SceneConfig,
    /// Requirements handed to command actions and event-free contexts.
    no_requirements: Requirements,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self::with_config(SceneConfig::default())
    }

    pub fn with_config(config: SceneConfig) -> Self {
        debug!("Creating a new scene");
        Self {
            universe: Universe::with_growth(config.entity_growth),
            systems: vec![],
            bus: MessageBus::with_capacity(config.message_capacity),
            commands: CommandQueue::new(),
            physics: None,
            profiler: FrameProfiler::new(config.profiler_history),
            config,
            no_requirements: Requirements::new(),
        }
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    pub fn bus(&self) -> &MessageBus {
        &self.bus
    }

    /// Installs the scene's physics world and returns a handle to it. Any previous world is
    /// released once nothing refers to it anymore.
    pub fn enable_physics(&mut self, world: impl PhysicsWorld + 'static) -> PhysicsHandle {
        self.enable_physics_shared(PhysicsHandle::new(world))
    }

    /// Like [`Scene::enable_physics`], for a world that's already behind a handle.
    pub fn enable_physics_shared(&mut self, handle: PhysicsHandle) -> PhysicsHandle {
        if self.physics.is_some() {
            warn!("Replacing the scene's physics world");
        }
        self.physics = Some(handle.clone());
        handle
    }

    /// Returns a handle to the scene's physics world.
    pub fn physics(&self) -> Result<PhysicsHandle, PhysicsError> {
        self.physics.clone().ok_or(PhysicsError::NoActiveWorld)
    }

    /// Appends a system. Systems run in the order they were added.
    pub fn add_system(&mut self, system: impl System) {
        trace!("Adding system `{}`", system.label());
        self.systems.push(SystemEntry {
            requirements: system.requirements(),
            system: Box::new(system),
        });
    }

    pub fn get_system<T: System>(&self) -> Option<&T> {
        self.systems
            .iter()
            .find_map(|entry| (*entry.system).as_any().downcast_ref())
    }

    pub fn get_system_mut<T: System>(&mut self) -> Option<&mut T> {
        self.systems
            .iter_mut()
            .find_map(|entry| (*entry.system).as_any_mut().downcast_mut())
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    pub fn create_entity(&mut self) -> Entity {
        self.universe.create_entity()
    }

    /// Schedules an entity for destruction at the next flush point of the frame.
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

    /// Posts a message from outside the scene, delivered during the next update.
    pub fn forward_message(&mut self, message: Message) {
        self.bus.post(message);
    }

    pub fn post_message<T: Any>(&mut self, id: MessageId, data: T) {
        self.bus.post_data(id, data);
    }

    pub fn send_command(&mut self, command: Command) {
        self.commands.send(command);
    }

    /// Hands an input event to every system right away, in registration order.
    pub fn forward_event(&mut self, event: &InputEvent) -> crate::Result {
        for entry in &mut self.systems {
            let mut ctx = SystemContext::new(
                &mut self.universe,
                &mut self.bus,
                &mut self.commands,
                self.physics.as_ref(),
                &entry.requirements,
                0.0,
            );
            entry.system.handle_event(event, &mut ctx)?;
        }
        Ok(())
    }

    /// Runs a single frame. `dt` is the frame time in seconds.
    ///
    /// The first error raised by a system, command or callback aborts the frame and is returned
    /// here. Whatever was already done in the frame stays done, while messages and commands
    /// still waiting for their turn in the aborted frame are discarded.
    pub fn update(&mut self, dt: f32) -> crate::Result {
        self.profiler.begin_frame();

        self.profiler.next_stage(FrameStage::Start);
        self.start_frame(dt)?;

        self.profiler.next_stage(FrameStage::Messages);
        self.deliver_messages(dt)?;

        self.profiler.next_stage(FrameStage::Systems);
        self.process_systems(dt)?;

        self.profiler.next_stage(FrameStage::Commands);
        self.drain_commands(dt)?;
        self.universe.flush_destroyed();

        self.profiler.finish_frame();
        Ok(())
    }

    /// Timing of the last fully finished frame.
    pub fn last_frame(&self) -> Option<&FrameTiming> {
        self.profiler.last_frame()
    }

    /// Timings of recent frames, oldest first.
    pub fn frame_history(&self) -> impl Iterator<Item = &FrameTiming> {
        self.profiler.history()
    }

    fn start_frame(&mut self, dt: f32) -> crate::Result {
        for entry in &mut self.systems {
            let mut ctx = SystemContext::new(
                &mut self.universe,
                &mut self.bus,
                &mut self.commands,
                self.physics.as_ref(),
                &entry.requirements,
                dt,
            );
            entry.system.frame_start(&mut ctx)?;
        }

        self.universe.flush_destroyed();
        Ok(())
    }

    fn deliver_messages(&mut self, dt: f32) -> crate::Result {
        let messages = self.bus.next_frame();
        for (i, message) in messages.iter().enumerate() {
            let remaining = messages.len() - i - 1;
            for entry in &mut self.systems {
                let mut ctx = SystemContext::new(
                    &mut self.universe,
                    &mut self.bus,
                    &mut self.commands,
                    self.physics.as_ref(),
                    &entry.requirements,
                    dt,
                );
                entry
                    .system
                    .handle_message(message, &mut ctx)
                    .map_err(|error| {
                        if remaining > 0 {
                            warn!("Frame aborted, discarding {remaining} undelivered message(s)");
                        }
                        error
                    })?;
            }
        }
        Ok(())
    }

    fn process_systems(&mut self, dt: f32) -> crate::Result {
        for entry in &mut self.systems {
            let mut ctx = SystemContext::new(
                &mut self.universe,
                &mut self.bus,
                &mut self.commands,
                self.physics.as_ref(),
                &entry.requirements,
                dt,
            );

            let system = &mut entry.system;
            self.profiler
                .time_system(system.label(), || system.process(&mut ctx))?;

            self.universe.flush_destroyed();
        }
        Ok(())
    }

    fn drain_commands(&mut self, dt: f32) -> crate::Result {
        let mut pending = self.commands.take();
        while let Some(mut command) = pending.pop_front() {
            let targets: Vec<Entity> = self
                .universe
                .get_components::<CommandTarget>()
                .filter(|(_, target)| target.matches(command.targets()))
                .map(|(entity, _)| entity)
                .collect();

            for entity in targets {
                // An earlier action may have deleted it outright
                if !self.universe.validate_entity(entity) {
                    continue;
                }

                let mut ctx = SystemContext::new(
                    &mut self.universe,
                    &mut self.bus,
                    &mut self.commands,
                    self.physics.as_ref(),
                    &self.no_requirements,
                    dt,
                );
                command.execute(&mut ctx, entity, dt).map_err(|error| {
                    if !pending.is_empty() {
                        warn!("Frame aborted, discarding {} queued command(s)", pending.len());
                    }
                    error
                })?;
            }
        }
        Ok(())
    }
}

impl Drop for Scene {
    fn drop(&mut self) {
        debug!(
            "Tearing down scene with {} entities and {} systems",
            self.universe.entity_count(),
            self.systems.len()
        );
    }
}
