/// Window collaborator interface
///
/// The engine does not own a window. Whoever does (a winit application, a
/// headless test harness) implements `WindowSource` and hands it to
/// `Engine::run`, or pushes `InputState` snapshots into `Engine::frame`.

use glam::Vec2;

/// Input snapshot consumed once per frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InputState {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub escape: bool,
    /// Right mouse button held (mouse look)
    pub right_mouse: bool,
    /// Cursor movement since the previous snapshot, in pixels
    pub cursor_delta: Vec2,
    /// The framebuffer changed size since the previous snapshot
    pub resized: bool,
    pub close_requested: bool,
}

impl InputState {
    /// The user asked to leave the frame loop
    pub fn wants_exit(&self) -> bool {
        self.close_requested || self.escape
    }
}

pub trait WindowSource {
    /// Pump pending window events and return the resulting input snapshot
    fn poll_input(&mut self) -> InputState;

    /// Current framebuffer size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// The window was closed by the user or the platform
    fn should_close(&self) -> bool;

    /// A zero-sized framebuffer cannot be presented to
    fn is_minimized(&self) -> bool {
        let (w, h) = self.framebuffer_size();
        w == 0 || h == 0
    }
}
