//! The Kinesis entity component storage
//!
//! ## Implementation details
//! Every component kind gets its own `Vec<Option<T>>`, indexed by entity slot. The stores live in
//! a `TypeId` keyed map behind a type-erased store trait, so games can
//! register their own component types without touching this crate.
//!
//! Entity handles are a slot index plus a generation. Generations come from a single counter
//! shared by the whole universe, so a slot that gets reused never hands out a generation an old
//! handle could still match.

use smallvec::SmallVec;
use std::{
    any::{self, Any, TypeId},
    fmt,
    num::NonZeroU32,
};
use thiserror::Error;

pub mod accessor;
pub mod components;

mod universe;
pub use universe::*;

/// An entity handle. It's very cheap to copy (2x32-bit values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub index: u32,
    pub generation: NonZeroU32,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

/// Marker trait for components.
///
/// An entity holds at most one instance of each component type. Components are dropped together
/// with their entity.
pub trait Component: Any {}

/// Misuse of the component storage. These are programming errors: the operation that caused
/// one is aborted and the error is handed to the caller, who is not expected to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EcsError {
    #[error("{0} is not a live entity (stale or invalid handle)")]
    StaleEntity(Entity),
    #[error("{entity} has no `{component}` component")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },
    #[error("{entity} already has a `{component}` component")]
    DuplicateComponent {
        entity: Entity,
        component: &'static str,
    },
}

impl EcsError {
    pub(crate) fn missing<T: Component>(entity: Entity) -> Self {
        Self::MissingComponent {
            entity,
            component: any::type_name::<T>(),
        }
    }

    pub(crate) fn duplicate<T: Component>(entity: Entity) -> Self {
        Self::DuplicateComponent {
            entity,
            component: any::type_name::<T>(),
        }
    }
}

/// A set of component types an entity must hold to be picked up by a query, used by systems to
/// declare what they operate on.
///
/// ```
/// # use kinesis::ecs::{Component, Requirements};
/// struct Health(u32);
/// impl Component for Health {}
///
/// let requirements = Requirements::new().with::<Health>();
/// assert_eq!(requirements.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    types: SmallVec<[TypeId; 4]>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Component>(mut self) -> Self {
        let type_id = TypeId::of::<T>();
        if !self.types.contains(&type_id) {
            self.types.push(type_id);
        }
        self
    }

    pub fn types(&self) -> &[TypeId] {
        &self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
