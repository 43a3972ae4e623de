use std::{any::Any, fmt, mem};

/// Numeric message identifier. Built-in ids live in [`crate::message_id`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub u32);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A bus message: an id plus an arbitrary payload. Messages are read-only once posted.
pub struct Message {
    id: MessageId,
    data: Box<dyn Any>,
}

impl Message {
    pub fn new<T: Any>(id: MessageId, data: T) -> Self {
        Self {
            id,
            data: Box::new(data),
        }
    }

    /// A message with no payload.
    pub fn signal(id: MessageId) -> Self {
        Self::new(id, ())
    }

    #[inline]
    pub fn id(&self) -> MessageId {
        self.id
    }

    /// Downcasts the payload, returning [`None`] if it's not a `T`.
    pub fn data<T: Any>(&self) -> Option<&T> {
        self.data.downcast_ref()
    }

    /// Checks the id and downcasts the payload in one go.
    pub fn data_if<T: Any>(&self, id: MessageId) -> Option<&T> {
        if self.id == id {
            self.data()
        } else {
            None
        }
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// The [`MessageBus`] is a frame-buffered message queue shared by all systems of a scene.
///
/// Anything can post a message at any time, and it'll be delivered to every system during the
/// next frame's delivery pass. Nothing outlives its delivery pass, and messages are only ever
/// dropped when an error aborts the frame delivering them.
pub struct MessageBus {
    /// Messages waiting for the next delivery pass.
    queued_messages: Vec<Message>,
    capacity: usize,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus {
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queued_messages: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Enqueues a message for the next delivery pass.
    pub fn post(&mut self, message: Message) {
        self.queued_messages.push(message);
    }

    pub fn post_data<T: Any>(&mut self, id: MessageId, data: T) {
        self.post(Message::new(id, data));
    }

    /// Moves all queued messages out for delivery, in publish order. Messages posted after this
    /// call wait for the next one.
    pub fn next_frame(&mut self) -> Vec<Message> {
        mem::replace(
            &mut self.queued_messages,
            Vec::with_capacity(self.capacity),
        )
    }

    pub fn queued_count(&self) -> usize {
        self.queued_messages.len()
    }
}
