//! # Kinesis
//! A single threaded, frame-stepped entity/component runtime for 2D games.
//!
//! A [`Scene`] owns the entity table, the systems that run over it every frame, a message bus
//! and a command queue. Physics is provided by an external rigid-body solver plugged in through
//! [`physics::PhysicsWorld`], and [`collision`] adds a light contact layer with per-entity
//! response callbacks.
//!
//! ## Frame order
//! Every [`Scene::update`] call runs through the same stages:
//!  * systems' start hooks (rigid bodies go live here), then queued destructions are flushed
//!  * messages published before this frame are delivered to every system, message by message
//!  * every system's `process`, in registration order, flushing destructions after each one
//!  * queued commands are drained in FIFO order, then destructions are flushed once more
//!
//! Input events forwarded with [`Scene::forward_event`] skip the queue and reach systems right
//! away. Messages published at any point of a frame are delivered during the next one.

use thiserror::Error;

pub mod collision;
pub mod ecs;
pub mod physics;
pub mod profiler;
pub mod scene;

#[doc(inline)]
pub use scene::{
    Command, CommandQueue, ConfigError, InputEvent, Message, MessageBus, MessageId, Scene,
    SceneConfig, System, SystemContext,
};

/// Ids of the messages posted by the built-in systems.
pub mod message_id {
    use crate::MessageId;

    /// Posted by [`crate::physics::PhysicsSystem`] after the solver advanced.
    pub const PHYSICS_STEPPED: MessageId = MessageId(0);
    /// Posted by [`crate::collision::CollisionSystem`] for every confirmed contact.
    pub const CONTACT: MessageId = MessageId(1);

    /// First id free for game use.
    pub const USER: MessageId = MessageId(64);
}

/// Any error that can abort a frame.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ecs(#[from] ecs::EcsError),
    #[error(transparent)]
    Physics(#[from] physics::PhysicsError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Raised by game code, with a description of what went wrong.
    #[error("{0}")]
    Game(String),
}

impl Error {
    pub fn game(message: impl ToString) -> Self {
        Self::Game(message.to_string())
    }
}

pub type Result<T = (), E = Error> = std::result::Result<T, E>;
