use super::SystemContext;
use crate::ecs::Entity;
use std::{collections::VecDeque, fmt, mem};

type CommandAction = Box<dyn FnMut(&mut SystemContext<'_>, Entity, f32) -> crate::Result>;

/// A deferred action, run once for every live entity whose
/// [`CommandTarget`](crate::ecs::components::CommandTarget) id shares a bit with the command's
/// target flags.
pub struct Command {
    targets: u64,
    action: CommandAction,
}

impl Command {
    pub fn new<F>(targets: u64, action: F) -> Self
    where
        F: FnMut(&mut SystemContext<'_>, Entity, f32) -> crate::Result + 'static,
    {
        Self {
            targets,
            action: Box::new(action),
        }
    }

    #[inline]
    pub fn targets(&self) -> u64 {
        self.targets
    }

    pub(crate) fn execute(
        &mut self,
        ctx: &mut SystemContext<'_>,
        entity: Entity,
        dt: f32,
    ) -> crate::Result {
        (self.action)(ctx, entity, dt)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("targets", &format_args!("{:#x}", self.targets))
            .finish_non_exhaustive()
    }
}

/// FIFO of commands waiting for the scene's next drain.
#[derive(Debug, Default)]
pub struct CommandQueue {
    queue: VecDeque<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Takes every queued command, leaving the queue empty for commands sent during the drain.
    pub(crate) fn take(&mut self) -> VecDeque<Command> {
        mem::take(&mut self.queue)
    }
}
