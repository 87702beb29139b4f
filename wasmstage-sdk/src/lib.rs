#![cfg_attr(not(feature = "std"), no_std)]

//! wasmstage-sdk
//!
//! This crate is used by **guest** WASM modules that run inside the wasmstage host.
//!
//! ABI model (immediate mode):
//! - The host owns the render surface, the clock, the input snapshot and the log.
//! - The guest issues drawing commands every `frame`.
//! - The guest may export `setup`, `frame` and `teardown`, all `() -> ()`.
//!
//! Strings are passed to the host as `(offset, length)` pairs into the guest's own
//! memory, so the safe wrappers below only need a `&str`.

/// Input actions the host can report, by ABI code.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Action {
    /// Escape key / Start button.
    Escape = 1,
    /// Left mouse button / A button.
    PrimaryClick = 2,
}

/// A color with normalized channels. The host clamps each channel to `[0, 1]`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// From 8-bit channels, e.g. `Color::from_u8(20, 20, 40, 255)`.
    pub fn from_u8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Low-level raw ABI imports (module `"env"`).
pub mod sys {
    unsafe extern "C" {
        // Engine
        #[link_name = "EngineLog"]
        pub fn engine_log(ptr: i32, len: i32);
        #[link_name = "EngineFps"]
        pub fn engine_fps() -> f32;
        #[link_name = "EngineTps"]
        pub fn engine_tps() -> f32;
        #[link_name = "EngineExit"]
        pub fn engine_exit();
        #[link_name = "EngineRandomInt"]
        pub fn engine_random_int(exclusive_max: i32) -> i32;
        #[link_name = "EngineRandomFloat"]
        pub fn engine_random_float() -> f32;

        // Graphics
        #[link_name = "GfxClear"]
        pub fn gfx_clear(r: f32, g: f32, b: f32, a: f32);
        #[link_name = "GfxImage"]
        pub fn gfx_image(x: f32, y: f32, r: f32, g: f32, b: f32, a: f32);
        #[link_name = "GfxRectangle"]
        pub fn gfx_rectangle(x: f32, y: f32, w: f32, h: f32, r: f32, g: f32, b: f32, a: f32);
        #[link_name = "GfxText"]
        pub fn gfx_text(ptr: i32, len: i32, x: f32, y: f32);

        // Input
        #[link_name = "InputPressed"]
        pub fn input_pressed(code: i32) -> i32;
        #[link_name = "InputCursorX"]
        pub fn input_cursor_x() -> f32;
        #[link_name = "InputCursorY"]
        pub fn input_cursor_y() -> f32;
    }
}

/// Engine API: logging, timing, randomness, exit.
pub mod engine {
    use super::sys;

    /// Log a line through the host's log sink.
    pub fn log(message: &str) {
        unsafe { sys::engine_log(message.as_ptr() as i32, message.len() as i32) }
    }

    /// Frames per second the host presented over the last second.
    pub fn fps() -> f32 {
        unsafe { sys::engine_fps() }
    }

    /// Ticks per second the host ran over the last second.
    pub fn tps() -> f32 {
        unsafe { sys::engine_tps() }
    }

    /// Ask the host to stop. The current `frame` still runs to the end; `teardown`
    /// follows on the next tick.
    pub fn exit() {
        unsafe { sys::engine_exit() }
    }

    /// Uniform integer in `[0, exclusive_max)`; `0` when `exclusive_max <= 0`.
    pub fn random_int(exclusive_max: i32) -> i32 {
        unsafe { sys::engine_random_int(exclusive_max) }
    }

    /// Uniform float in `[0, 1)`.
    pub fn random_float() -> f32 {
        unsafe { sys::engine_random_float() }
    }
}

/// Graphics API.
pub mod gfx {
    use super::{Color, sys};

    /// Size of the built-in sprite drawn by [`image`].
    pub const SPRITE_WIDTH: f32 = 27.0;
    pub const SPRITE_HEIGHT: f32 = 29.0;

    pub fn clear(color: Color) {
        unsafe { sys::gfx_clear(color.r, color.g, color.b, color.a) }
    }

    /// Draw the built-in sprite at `(x, y)`, multiplied by `tint`.
    pub fn image(x: f32, y: f32, tint: Color) {
        unsafe { sys::gfx_image(x, y, tint.r, tint.g, tint.b, tint.a) }
    }

    pub fn rectangle(x: f32, y: f32, w: f32, h: f32, color: Color) {
        unsafe { sys::gfx_rectangle(x, y, w, h, color.r, color.g, color.b, color.a) }
    }

    /// Debug text at `(x, y)`.
    pub fn text(text: &str, x: f32, y: f32) {
        unsafe { sys::gfx_text(text.as_ptr() as i32, text.len() as i32, x, y) }
    }
}

/// Input API.
pub mod input {
    use super::{Action, sys};

    /// True only on the tick the action went down.
    pub fn pressed(action: Action) -> bool {
        unsafe { sys::input_pressed(action as i32) != 0 }
    }

    pub fn cursor() -> (f32, f32) {
        unsafe { (sys::input_cursor_x(), sys::input_cursor_y()) }
    }
}

/// Convenience prelude for guest modules.
pub mod prelude {
    pub use crate::Action;
    pub use crate::Color;
    pub use crate::engine;
    pub use crate::gfx;
    pub use crate::input;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_codes_are_stable() {
        assert_eq!(Action::Escape as i32, 1);
        assert_eq!(Action::PrimaryClick as i32, 2);
    }

    #[test]
    fn colors_are_normalized() {
        assert_eq!(Color::from_u8(255, 0, 51, 255), Color::rgba(1.0, 0.0, 0.2, 1.0));
        assert_eq!(Color::WHITE.with_alpha(0.5).a, 0.5);
        assert_eq!(Color::BLACK.a, 1.0);
    }
}
