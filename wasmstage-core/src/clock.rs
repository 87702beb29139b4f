//! Frame and tick rate measurement for `EngineFps` / `EngineTps`.
//!
//! Rates are averaged over a window of about one second and only change when a
//! window closes, so the guest sees a steady value between updates.

use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(1);

#[derive(Clone, Debug)]
struct RateMeter {
    window_start: Option<Instant>,
    count: u32,
    rate: f32,
}

impl RateMeter {
    const fn new() -> Self {
        Self {
            window_start: None,
            count: 0,
            rate: 0.0,
        }
    }

    fn record(&mut self, now: Instant) {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return;
        };
        self.count += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed >= WINDOW {
            self.rate = self.count as f32 / elapsed.as_secs_f32();
            self.count = 0;
            self.window_start = Some(now);
        }
    }
}

/// Measures ticks (guest `frame` calls) and presented frames separately.
#[derive(Clone, Debug)]
pub struct TickClock {
    ticks: RateMeter,
    frames: RateMeter,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TickClock {
    pub const fn new() -> Self {
        Self {
            ticks: RateMeter::new(),
            frames: RateMeter::new(),
        }
    }

    /// Record the start of a host tick.
    pub fn record_tick(&mut self, now: Instant) {
        self.ticks.record(now);
    }

    /// Record that a frame was presented to the screen.
    pub fn record_frame(&mut self, now: Instant) {
        self.frames.record(now);
    }

    /// Most recently measured ticks per second; 0 until a full window elapsed.
    pub fn tps(&self) -> f32 {
        self.ticks.rate
    }

    /// Most recently measured frames per second; 0 until a full window elapsed.
    pub fn fps(&self) -> f32 {
        self.frames.rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_zero_until_window_closes() {
        let mut clock = TickClock::new();
        let t0 = Instant::now();
        for i in 0..30 {
            clock.record_tick(t0 + Duration::from_millis(i * 16));
        }
        assert_eq!(clock.tps(), 0.0);
    }

    #[test]
    fn measures_sixty_ticks_per_second() {
        let mut clock = TickClock::new();
        let t0 = Instant::now();
        let step = Duration::from_secs(1) / 60;
        for i in 0..=61 {
            clock.record_tick(t0 + step * i);
        }
        assert!((clock.tps() - 60.0).abs() < 0.5, "tps = {}", clock.tps());
        assert_eq!(clock.fps(), 0.0, "frames are measured separately");
    }

    #[test]
    fn frames_and_ticks_are_independent() {
        let mut clock = TickClock::new();
        let t0 = Instant::now();
        for i in 0..=30u32 {
            clock.record_frame(t0 + Duration::from_millis(i as u64 * 1000 / 30));
        }
        assert!((clock.fps() - 30.0).abs() < 0.5, "fps = {}", clock.fps());
        assert_eq!(clock.tps(), 0.0);
    }
}
