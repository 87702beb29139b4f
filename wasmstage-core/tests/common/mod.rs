//! Shared helpers: build sessions from inline WAT and record what the guest did.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use wasmstage_core::{
    CapabilityContext, HostConfig, LoadError, LogSink, RenderSurface, Rgba, Session,
    SessionError,
};

#[derive(Clone, Debug, PartialEq)]
pub enum Draw {
    Clear(Rgba),
    Image { x: f32, y: f32, tint: Rgba },
    Rectangle { x: f32, y: f32, w: f32, h: f32, color: Rgba },
    Text { text: String, x: f32, y: f32 },
}

#[derive(Clone, Default)]
pub struct Recorder {
    lines: Arc<Mutex<Vec<String>>>,
    draws: Arc<Mutex<Vec<Draw>>>,
}

impl Recorder {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn draws(&self) -> Vec<Draw> {
        self.draws.lock().unwrap().clone()
    }
}

struct RecordingSink(Arc<Mutex<Vec<String>>>);

impl LogSink for RecordingSink {
    fn log(&mut self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

struct RecordingSurface(Arc<Mutex<Vec<Draw>>>);

impl RecordingSurface {
    fn push(&self, draw: Draw) {
        self.0.lock().unwrap().push(draw);
    }
}

impl RenderSurface for RecordingSurface {
    fn clear(&mut self, color: Rgba) {
        self.push(Draw::Clear(color));
    }

    fn image(&mut self, x: f32, y: f32, tint: Rgba) {
        self.push(Draw::Image { x, y, tint });
    }

    fn rectangle(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgba) {
        self.push(Draw::Rectangle { x, y, w, h, color });
    }

    fn text(&mut self, text: &str, x: f32, y: f32) {
        self.push(Draw::Text {
            text: text.to_string(),
            x,
            y,
        });
    }
}

/// Deterministic config without WASI.
pub fn config() -> HostConfig {
    HostConfig {
        rng_seed: Some(1),
        enable_wasi: false,
        ..HostConfig::default()
    }
}

pub fn recording_context(config: &HostConfig, recorder: &Recorder) -> CapabilityContext {
    CapabilityContext::new(config)
        .with_log_sink(RecordingSink(recorder.lines.clone()))
        .with_surface(RecordingSurface(recorder.draws.clone()))
}

pub fn try_session_with(wat: &str, config: &HostConfig) -> Result<(Session, Recorder), SessionError> {
    let recorder = Recorder::default();
    let caps = recording_context(config, &recorder);
    let session = Session::start(wat.as_bytes(), config, caps)?;
    Ok((session, recorder))
}

pub fn session(wat: &str) -> (Session, Recorder) {
    match try_session_with(wat, &config()) {
        Ok(pair) => pair,
        Err(err) => panic!("guest failed to load: {err}"),
    }
}

pub fn load_error(wat: &str) -> LoadError {
    load_error_with(wat, &config())
}

pub fn load_error_with(wat: &str, config: &HostConfig) -> LoadError {
    match try_session_with(wat, config) {
        Ok(_) => panic!("guest loaded but should have been rejected"),
        Err(SessionError::Load(err)) => err,
        Err(other) => panic!("expected a load error, got {other}"),
    }
}

/// Guest that logs the name of each lifecycle export as it runs.
pub const LIFECYCLE_LOGGER: &str = r#"
(module
  (import "env" "EngineLog" (func $log (param i32 i32)))
  (memory (export "memory") 1)
  (data (i32.const 0) "setup")
  (data (i32.const 8) "frame")
  (data (i32.const 16) "teardown")
  (func (export "setup") (call $log (i32.const 0) (i32.const 5)))
  (func (export "frame") (call $log (i32.const 8) (i32.const 5)))
  (func (export "teardown") (call $log (i32.const 16) (i32.const 8))))
"#;
