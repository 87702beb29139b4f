//! Host-side state reachable from every capability handler.
//!
//! State model:
//! - One [`HostState`] per session, stored as the wasmtime `Store` data. There is no
//!   global: handlers reach it through the `Caller` they are invoked with.
//! - [`CapabilityContext`] holds everything the capability table acts on (exit flag,
//!   clock, input snapshot, render surface, log sink, RNG).
//! - Single-threaded by construction: the guest only runs inside a host call, so
//!   there is exactly one writer at a time and nothing here is locked.
//!
//! Handlers never fail because a collaborator is missing. Drawing without a surface
//! is a silent no-op. The only failure a handler can report is a [`MemoryFault`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wasmtime::{StoreLimits, StoreLimitsBuilder};
use wasmtime_wasi::WasiCtxBuilder;
use wasmtime_wasi::p1::WasiP1Ctx;

use crate::abi::encode_bool;
use crate::clock::TickClock;
use crate::config::HostConfig;
use crate::input::InputState;
use crate::memory::{MemoryFault, MemoryView};
use crate::render::{RenderSurface, Rgba};

/// Destination for guest `EngineLog` lines.
pub trait LogSink: Send {
    fn log(&mut self, message: &str);
}

/// Default sink: one `tracing` event per line under the `wasmstage::guest` target.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&mut self, message: &str) {
        tracing::info!(target: "wasmstage::guest", "{message}");
    }
}

/// Wasmtime store data.
pub struct HostState {
    pub caps: CapabilityContext,
    pub(crate) wasi: WasiP1Ctx,
    pub(crate) limits: StoreLimits,
}

impl HostState {
    pub fn new(caps: CapabilityContext, config: &HostConfig) -> Self {
        let wasi = WasiCtxBuilder::new().inherit_stdio().build_p1();
        let limits = StoreLimitsBuilder::new()
            .memory_size(config.max_memory_bytes())
            .build();
        Self { caps, wasi, limits }
    }
}

/// Mutable host state the capability table acts on.
pub struct CapabilityContext {
    exit_requested: bool,
    clock: TickClock,
    input: InputState,
    surface: Option<Box<dyn RenderSurface>>,
    log_sink: Box<dyn LogSink>,
    rng: StdRng,
    fault: Option<MemoryFault>,
    /// A draw reached the surface since the last presented frame.
    drawn: bool,
}

impl CapabilityContext {
    /// A context with no render surface, logging through `tracing`.
    pub fn new(config: &HostConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            exit_requested: false,
            clock: TickClock::new(),
            input: InputState::default(),
            surface: None,
            log_sink: Box::new(TracingSink),
            rng,
            fault: None,
            drawn: false,
        }
    }

    pub fn with_surface(mut self, surface: impl RenderSurface + 'static) -> Self {
        self.surface = Some(Box::new(surface));
        self
    }

    pub fn with_log_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.log_sink = Box::new(sink);
        self
    }

    /// Install (or replace) the surface once it becomes ready.
    pub fn set_surface(&mut self, surface: Box<dyn RenderSurface>) {
        self.surface = Some(surface);
    }

    pub fn surface(&self) -> Option<&dyn RenderSurface> {
        self.surface.as_deref()
    }

    pub fn surface_mut(&mut self) -> Option<&mut (dyn RenderSurface + 'static)> {
        self.surface.as_deref_mut()
    }

    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn clock_mut(&mut self) -> &mut TickClock {
        &mut self.clock
    }

    pub fn exit_requested(&self) -> bool {
        self.exit_requested
    }

    /// Keep the first fault; later ones add nothing the operator needs.
    pub(crate) fn record_fault(&mut self, fault: MemoryFault) {
        self.fault.get_or_insert(fault);
    }

    pub(crate) fn take_fault(&mut self) -> Option<MemoryFault> {
        self.fault.take()
    }

    /// Whether anything was drawn since the last call, resetting the flag.
    pub fn take_drawn(&mut self) -> bool {
        std::mem::take(&mut self.drawn)
    }

    // --- Engine ---

    /// `EngineLog(offset, len)`.
    pub fn log(&mut self, view: MemoryView<'_>, offset: u32, len: u32) -> Result<(), MemoryFault> {
        let text = view.read_text(offset, len)?;
        self.log_sink.log(&text);
        Ok(())
    }

    /// `EngineRandomInt(exclusive_max)`: uniform in `[0, exclusive_max)`.
    /// A non-positive bound has no valid answer; it yields `0`.
    pub fn random_int(&mut self, exclusive_max: i32) -> i32 {
        if exclusive_max <= 0 {
            return 0;
        }
        self.rng.gen_range(0..exclusive_max)
    }

    /// `EngineRandomFloat()`: uniform in `[0, 1)`.
    pub fn random_float(&mut self) -> f32 {
        self.rng.gen_range(0.0f32..1.0)
    }

    pub fn fps(&self) -> f32 {
        self.clock.fps()
    }

    pub fn tps(&self) -> f32 {
        self.clock.tps()
    }

    /// `EngineExit()`: only raises the flag. The session checks it at the next tick.
    pub fn request_exit(&mut self) {
        if !self.exit_requested {
            tracing::info!("guest requested exit");
        }
        self.exit_requested = true;
    }

    // --- Input ---

    /// `InputPressed(code)` encoded as `0` / `1`.
    pub fn input_pressed(&self, code: i32) -> i32 {
        encode_bool(self.input.just_pressed_code(code))
    }

    pub fn cursor_x(&self) -> f32 {
        self.input.cursor().0
    }

    pub fn cursor_y(&self) -> f32 {
        self.input.cursor().1
    }

    // --- Graphics ---

    fn with_surface_or_skip(&mut self, what: &str, draw: impl FnOnce(&mut dyn RenderSurface)) {
        match self.surface.as_deref_mut() {
            Some(surface) => {
                draw(surface);
                self.drawn = true;
            }
            None => tracing::trace!(call = what, "no render surface yet; draw skipped"),
        }
    }

    pub fn draw_clear(&mut self, color: Rgba) {
        self.with_surface_or_skip("GfxClear", |s| s.clear(color));
    }

    pub fn draw_image(&mut self, x: f32, y: f32, tint: Rgba) {
        self.with_surface_or_skip("GfxImage", |s| s.image(x, y, tint));
    }

    pub fn draw_rectangle(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        self.with_surface_or_skip("GfxRectangle", |s| s.rectangle(x, y, w, h, color));
    }

    /// `GfxText(offset, len, x, y)`. The address is checked even when there is no
    /// surface to draw on.
    pub fn draw_text(
        &mut self,
        view: MemoryView<'_>,
        offset: u32,
        len: u32,
        x: f32,
        y: f32,
    ) -> Result<(), MemoryFault> {
        let text = view.read_text(offset, len)?;
        self.with_surface_or_skip("GfxText", |s| s.text(&text, x, y));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Lines(Arc<Mutex<Vec<String>>>);

    impl LogSink for Lines {
        fn log(&mut self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn seeded() -> CapabilityContext {
        CapabilityContext::new(&HostConfig {
            rng_seed: Some(7),
            ..HostConfig::default()
        })
    }

    #[test]
    fn log_delivers_exact_text() {
        let lines = Lines::default();
        let mut ctx = seeded().with_log_sink(lines.clone());

        let mut mem = vec![0u8; 64];
        mem[10..15].copy_from_slice(b"hello");
        ctx.log(MemoryView::new(&mem), 10, 5).unwrap();

        assert_eq!(*lines.0.lock().unwrap(), vec!["hello".to_string()]);
    }

    #[test]
    fn log_out_of_bounds_faults_and_logs_nothing() {
        let lines = Lines::default();
        let mut ctx = seeded().with_log_sink(lines.clone());
        let mem = vec![0u8; 1024];
        assert!(ctx.log(MemoryView::new(&mem), 1020, 10).is_err());
        assert!(lines.0.lock().unwrap().is_empty());
    }

    #[test]
    fn random_int_non_positive_bound_is_zero() {
        let mut ctx = seeded();
        assert_eq!(ctx.random_int(0), 0);
        assert_eq!(ctx.random_int(-5), 0);
        assert_eq!(ctx.random_int(i32::MIN), 0);
    }

    #[test]
    fn random_values_stay_in_range() {
        let mut ctx = seeded();
        for _ in 0..1000 {
            let i = ctx.random_int(3);
            assert!((0..3).contains(&i));
            let f = ctx.random_float();
            assert!((0.0..1.0).contains(&f));
        }
        assert_eq!(ctx.random_int(1), 0);
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = seeded();
        let mut b = seeded();
        let xs: Vec<i32> = (0..16).map(|_| a.random_int(1000)).collect();
        let ys: Vec<i32> = (0..16).map(|_| b.random_int(1000)).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn drawing_without_surface_is_a_no_op() {
        let mut ctx = seeded();
        ctx.draw_clear(Rgba::BLACK);
        ctx.draw_rectangle(0.0, 0.0, 10.0, 10.0, Rgba::WHITE);
        ctx.draw_image(1.0, 2.0, Rgba::WHITE);
        let mem = b"text".to_vec();
        assert!(ctx.draw_text(MemoryView::new(&mem), 0, 4, 0.0, 0.0).is_ok());
        assert!(ctx.surface().is_none());
        assert!(!ctx.take_drawn(), "nothing reached a surface");
    }

    #[test]
    fn draws_mark_the_frame_until_taken() {
        let mut ctx = seeded().with_surface(crate::render::Framebuffer::new(4, 4));
        assert!(!ctx.take_drawn());
        ctx.draw_rectangle(0.0, 0.0, 2.0, 2.0, Rgba::WHITE);
        assert!(ctx.take_drawn());
        assert!(!ctx.take_drawn());
    }

    #[test]
    fn draw_text_still_checks_bounds_without_surface() {
        let mut ctx = seeded();
        let mem = vec![0u8; 8];
        assert!(ctx.draw_text(MemoryView::new(&mem), 4, 8, 0.0, 0.0).is_err());
    }

    #[test]
    fn exit_is_a_flag() {
        let mut ctx = seeded();
        assert!(!ctx.exit_requested());
        ctx.request_exit();
        ctx.request_exit();
        assert!(ctx.exit_requested());
    }

    #[test]
    fn first_fault_is_kept() {
        let mut ctx = seeded();
        let first = MemoryFault { offset: 1, len: 2, memory_size: 0 };
        let second = MemoryFault { offset: 3, len: 4, memory_size: 0 };
        ctx.record_fault(first);
        ctx.record_fault(second);
        assert_eq!(ctx.take_fault(), Some(first));
        assert_eq!(ctx.take_fault(), None);
    }
}
