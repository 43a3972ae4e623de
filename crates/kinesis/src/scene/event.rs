use super::MessageId;
use glam::Vec2;

/// External input routed into a scene with [`crate::Scene::forward_event`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Cursor moved, in scene coordinates.
    MouseMoved(Vec2),
    MouseButtonPressed(MouseButton),
    MouseButtonReleased(MouseButton),
    KeyPressed(Key),
    KeyReleased(Key),
    /// Game-defined event, identified the same way bus messages are.
    Custom(MessageId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Enter,
    Escape,
    Char(char),
}
