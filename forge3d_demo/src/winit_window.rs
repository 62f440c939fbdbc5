/// winit-backed WindowSource
///
/// Events are pumped on demand from `poll_input`, so the engine keeps
/// control of the frame loop (`Engine::run`).

use std::time::Duration;

use forge_3d_engine::forge3d::{Error, InputState, Result, WindowSource};
use forge_3d_engine::glam::Vec2;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, DeviceId, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

/// Event handler state: the window and the input gathered since the last poll
struct WindowState {
    attributes: WindowAttributes,
    window: Option<Window>,
    input: InputState,
    creation_error: Option<String>,
    closed: bool,
}

impl WindowState {
    fn set_key(&mut self, code: KeyCode, pressed: bool) {
        match code {
            KeyCode::KeyW => self.input.forward = pressed,
            KeyCode::KeyS => self.input.backward = pressed,
            KeyCode::KeyA => self.input.left = pressed,
            KeyCode::KeyD => self.input.right = pressed,
            KeyCode::Escape => self.input.escape = pressed,
            _ => {}
        }
    }
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attributes.clone()) {
            Ok(window) => self.window = Some(window),
            Err(e) => {
                self.creation_error = Some(e.to_string());
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.closed = true;
                self.input.close_requested = true;
                event_loop.exit();
            }
            WindowEvent::Resized(_) => self.input.resized = true,
            WindowEvent::KeyboardInput {
                event: KeyEvent { physical_key: PhysicalKey::Code(code), state, .. },
                ..
            } => self.set_key(code, state == ElementState::Pressed),
            WindowEvent::MouseInput { state, button: MouseButton::Right, .. } => {
                self.input.right_mouse = state == ElementState::Pressed;
            }
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.cursor_delta += Vec2::new(delta.0 as f32, delta.1 as f32);
        }
    }
}

pub struct WinitWindowSource {
    event_loop: EventLoop<()>,
    state: WindowState,
}

impl WinitWindowSource {
    /// Open a window and pump events until it exists
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self> {
        let event_loop = EventLoop::new()
            .map_err(|e| Error::InitializationFailed(format!("Failed to create event loop: {}", e)))?;
        let attributes = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height));

        let mut source = Self {
            event_loop,
            state: WindowState {
                attributes,
                window: None,
                input: InputState::default(),
                creation_error: None,
                closed: false,
            },
        };

        while source.state.window.is_none() {
            source.pump();
            if let Some(error) = source.state.creation_error.take() {
                return Err(Error::InitializationFailed(format!("Failed to create window: {}", error)));
            }
            if source.state.closed {
                return Err(Error::InitializationFailed("event loop exited before the window opened".to_string()));
            }
        }
        Ok(source)
    }

    pub fn window(&self) -> Result<&Window> {
        self.state
            .window
            .as_ref()
            .ok_or_else(|| Error::InvalidResource("window already closed".to_string()))
    }

    fn pump(&mut self) {
        if let PumpStatus::Exit(_) = self.event_loop.pump_app_events(Some(Duration::ZERO), &mut self.state) {
            self.state.closed = true;
        }
    }
}

impl WindowSource for WinitWindowSource {
    fn poll_input(&mut self) -> InputState {
        self.pump();
        let snapshot = self.state.input;
        // Edge-triggered fields are consumed by the snapshot
        self.state.input.cursor_delta = Vec2::ZERO;
        self.state.input.resized = false;
        snapshot
    }

    fn framebuffer_size(&self) -> (u32, u32) {
        self.state
            .window
            .as_ref()
            .map(|window| {
                let size = window.inner_size();
                (size.width, size.height)
            })
            .unwrap_or((0, 0))
    }

    fn should_close(&self) -> bool {
        self.state.closed
    }
}
