// src/engine_lib/input.rs

/// Keys the scenes and the host shell care about. Everything else is dropped
/// at the winit boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    LeftControl,
    F,
    T,
    I,
    J,
    K,
    L,
    Digit1,
    Digit2,
    Escape,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Movement {
    Forward,
    Backward,
    Right,
    Left,
    Upward,
    Downward,
}

/// Held-key bindings polled once per update.
pub const MOVEMENT_BINDINGS: [(Key, Movement); 6] = [
    (Key::W, Movement::Forward),
    (Key::S, Movement::Backward),
    (Key::A, Movement::Left),
    (Key::D, Movement::Right),
    (Key::Space, Movement::Upward),
    (Key::LeftControl, Movement::Downward),
];

/// What the scenes need from the window: key polling and cursor capture.
/// Handed to a scene when it is constructed.
pub trait HostInput {
    fn is_key_down(&self, key: Key) -> bool;
    fn set_cursor_captured(&self, captured: bool);
    /// Last state requested through `set_cursor_captured`.
    fn is_cursor_captured(&self) -> bool;
}
