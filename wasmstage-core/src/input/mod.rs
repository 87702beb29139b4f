//! Input module for wasmstage-core.
//!
//! Responsibilities:
//! - Hold the host's view of the input actions the ABI exposes ([`InputAction`]) and
//!   the pointer position.
//! - Turn raw "is down" levels into "just pressed" edges once per tick, so every
//!   `InputPressed` query within one `frame` sees the same answer.
//!
//! Frontends push raw state with [`InputState::set_down`] / [`InputState::set_cursor`]
//! whenever they poll their devices; the session calls [`InputState::snapshot`] at
//! every tick boundary.

use crate::abi::InputAction;

const ACTIONS: usize = InputAction::ALL.len();

#[derive(Clone, Debug, Default)]
pub struct InputState {
    /// Raw level reported by the frontend.
    down: [bool; ACTIONS],
    /// Level at the previous snapshot.
    prev_down: [bool; ACTIONS],
    /// Edges computed by the latest snapshot.
    just_pressed: [bool; ACTIONS],
    cursor: (f32, f32),
}

impl InputState {
    pub fn set_down(&mut self, action: InputAction, down: bool) {
        self.down[action.index()] = down;
    }

    pub fn set_cursor(&mut self, x: f32, y: f32) {
        self.cursor = (x, y);
    }

    /// Latch edges for the coming tick: an action is "just pressed" if it is down
    /// now and was not down at the previous snapshot.
    pub fn snapshot(&mut self) {
        for i in 0..ACTIONS {
            self.just_pressed[i] = self.down[i] && !self.prev_down[i];
        }
        self.prev_down = self.down;
    }

    /// Whether `action` transitioned to pressed at the latest snapshot.
    pub fn just_pressed(&self, action: InputAction) -> bool {
        self.just_pressed[action.index()]
    }

    /// `InputPressed` semantics: unknown codes are never pressed.
    pub fn just_pressed_code(&self, code: i32) -> bool {
        InputAction::from_code(code).is_some_and(|a| self.just_pressed(a))
    }

    pub fn cursor(&self) -> (f32, f32) {
        self.cursor
    }
}
