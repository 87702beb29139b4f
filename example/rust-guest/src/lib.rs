#![cfg_attr(target_arch = "wasm32", no_std)]

// Minimal wasmstage Rust guest: a sprite bouncing around the screen.
//
// Build with `cargo build -p rust_guest --target wasm32-unknown-unknown --release`
// and run the resulting `.wasm` with `wasmstage-headless --module <path>`.
//
// The host calls:
// - `setup()` once, right before the first frame.
// - `frame()` once per tick.
// - `teardown()` once at the end.

use core::cell::Cell;

use wasmstage_sdk::prelude::*;

const SCREEN_W: f32 = 640.0;
const SCREEN_H: f32 = 480.0;
const SPEED: f32 = 3.0;

struct Ball {
    x: Cell<f32>,
    y: Cell<f32>,
    vx: Cell<f32>,
    vy: Cell<f32>,
    tint: Cell<Color>,
}

// SAFETY: wasm32-unknown-unknown guests are single-threaded.
unsafe impl Sync for Ball {}

static BALL: Ball = Ball {
    x: Cell::new(100.0),
    y: Cell::new(100.0),
    vx: Cell::new(SPEED),
    vy: Cell::new(SPEED),
    tint: Cell::new(Color::WHITE),
};

fn random_tint() -> Color {
    Color::rgb(
        0.5 + engine::random_float() * 0.5,
        0.5 + engine::random_float() * 0.5,
        0.5 + engine::random_float() * 0.5,
    )
}

#[unsafe(no_mangle)]
pub extern "C" fn setup() {
    engine::log("rust guest: setup");
    BALL.x.set(engine::random_int((SCREEN_W - gfx::SPRITE_WIDTH) as i32) as f32);
    BALL.y.set(engine::random_int((SCREEN_H - gfx::SPRITE_HEIGHT) as i32) as f32);
}

#[unsafe(no_mangle)]
pub extern "C" fn frame() {
    if input::pressed(Action::Escape) {
        engine::exit();
    }

    let (mut x, mut y) = (BALL.x.get() + BALL.vx.get(), BALL.y.get() + BALL.vy.get());
    if x <= 0.0 || x >= SCREEN_W - gfx::SPRITE_WIDTH {
        BALL.vx.set(-BALL.vx.get());
        BALL.tint.set(random_tint());
        x = x.clamp(0.0, SCREEN_W - gfx::SPRITE_WIDTH);
    }
    if y <= 0.0 || y >= SCREEN_H - gfx::SPRITE_HEIGHT {
        BALL.vy.set(-BALL.vy.get());
        BALL.tint.set(random_tint());
        y = y.clamp(0.0, SCREEN_H - gfx::SPRITE_HEIGHT);
    }
    if input::pressed(Action::PrimaryClick) {
        let (cx, cy) = input::cursor();
        x = cx;
        y = cy;
    }
    BALL.x.set(x);
    BALL.y.set(y);

    gfx::clear(Color::from_u8(20, 20, 40, 255));
    gfx::rectangle(0.0, SCREEN_H - 24.0, SCREEN_W, 24.0, Color::BLACK.with_alpha(0.6));
    gfx::text("ESC quits, click to teleport", 8.0, SCREEN_H - 18.0);
    gfx::image(x, y, BALL.tint.get());
}

#[unsafe(no_mangle)]
pub extern "C" fn teardown() {
    engine::log("rust guest: teardown");
}

#[cfg(target_arch = "wasm32")]
#[panic_handler]
fn panic(_: &core::panic::PanicInfo) -> ! {
    core::arch::wasm32::unreachable()
}
