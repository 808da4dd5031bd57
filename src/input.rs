//! Translates raw window input into core events.
//!
//! The core wants absolute screen coordinates; winit reports window-local
//! ones, so every position is offset by the window's current top-left
//! corner (which the core owns). Consecutive duplicate global samples are
//! dropped here before they reach the core.

use glam::Vec2;
use winit::event::{ElementState, MouseButton};

use crate::pet::Event;

pub struct InputRouter {
    left_down: bool,
    /// Last cursor position inside the window, window-local px.
    cursor: Vec2,
    /// Last global position forwarded, screen px.
    last_global: Option<Vec2>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self {
            left_down: false,
            cursor: Vec2::ZERO,
            last_global: None,
        }
    }

    /// Window-local pointer motion. Dragging pointers report as
    /// [`Event::PointerMove`], everything else as a global sample.
    pub fn cursor_moved(&mut self, local: Vec2, window_pos: Vec2, out: &mut Vec<Event>) {
        self.cursor = local;
        let screen = window_pos + local;
        if self.left_down {
            out.push(Event::PointerMove(screen));
        } else {
            self.push_global(screen, out);
        }
    }

    /// Button press or release over the window. Returns true when the event
    /// asks for the context menu.
    pub fn mouse_input(
        &mut self,
        button: MouseButton,
        state: ElementState,
        window_pos: Vec2,
        out: &mut Vec<Event>,
    ) -> bool {
        let screen = window_pos + self.cursor;
        match (button, state) {
            (MouseButton::Left, ElementState::Pressed) => {
                self.left_down = true;
                out.push(Event::PointerDown(screen));
            }
            (MouseButton::Left, ElementState::Released) => {
                self.left_down = false;
                out.push(Event::PointerUp(screen));
            }
            (MouseButton::Right, ElementState::Pressed) => return true,
            _ => {}
        }
        false
    }

    /// One global cursor sample per tick (the Win32 poll). Covers pointer
    /// motion away from the window.
    pub fn global_sample(&mut self, screen: Vec2, out: &mut Vec<Event>) {
        self.push_global(screen, out);
    }

    fn push_global(&mut self, screen: Vec2, out: &mut Vec<Event>) {
        if self.last_global == Some(screen) {
            return;
        }
        self.last_global = Some(screen);
        out.push(Event::GlobalPointerMove(screen));
    }
}
