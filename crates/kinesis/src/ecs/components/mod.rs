//! Components shared by the core systems.

use crate::ecs::Component;

mod transform;
pub use transform::Transform;

/// Marks an entity as a recipient of commands. A command reaches the entity when its target
/// flags share at least one bit with `id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandTarget {
    pub id: u64,
}

impl Component for CommandTarget {}

impl CommandTarget {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    #[inline]
    pub fn matches(&self, flags: u64) -> bool {
        self.id & flags != 0
    }
}
