//! libretro frontend: one [`Session`] per loaded game.
//!
//! The game file is the guest module (`.wasm` or `.wat`). Video is the software
//! [`Framebuffer`] uploaded as ARGB8888 once per run. Joypad Start maps to
//! [`InputAction::Escape`] and A to [`InputAction::PrimaryClick`].
//!
//! After the guest exits or faults the core keeps presenting the last frame and
//! never calls into the guest again.

use std::path::Path;
use std::time::Instant;

use libretro_backend::{
    AudioVideoInfo, Core, CoreInfo, GameData, JoypadButton, LoadGameResult, PixelFormat,
    RuntimeHandle, libretro_core,
};

use crate::abi::InputAction;
use crate::config::HostConfig;
use crate::lifecycle::{Session, Tick};
use crate::render::Framebuffer;
use crate::state::CapabilityContext;

const FRAMES_PER_SECOND: f64 = 60.0;

/// The libretro core instance.
#[derive(Default)]
pub struct WasmstageCore {
    session: Option<Session>,
    game_data: Option<GameData>,
    video: Vec<u8>,
}

impl WasmstageCore {
    fn start_session(&self, game_data: &GameData, config: &HostConfig) -> Option<Session> {
        let caps = CapabilityContext::new(config).with_surface(Framebuffer::new(
            config.surface_width,
            config.surface_height,
        ));

        let result = match (game_data.data(), game_data.path()) {
            (Some(bytes), _) => Session::start(bytes, config, caps),
            (None, Some(path)) => Session::from_path(Path::new(path), config, caps),
            (None, None) => {
                tracing::error!("frontend provided neither game data nor a path");
                return None;
            }
        };

        match result {
            Ok(session) => Some(session),
            Err(err) => {
                tracing::error!(%err, "failed to load guest module");
                None
            }
        }
    }

    fn poll_input(session: &mut Session, handle: &mut RuntimeHandle) {
        let input = session.context_mut().input_mut();
        input.set_down(
            InputAction::Escape,
            handle.is_joypad_button_pressed(0, JoypadButton::Start),
        );
        input.set_down(
            InputAction::PrimaryClick,
            handle.is_joypad_button_pressed(0, JoypadButton::A),
        );
    }

    /// Copy the current surface into the upload buffer, if there is one.
    fn capture_frame(&mut self) {
        let Some(frame) = self
            .session
            .as_ref()
            .and_then(|s| s.context().surface())
            .and_then(|surface| surface.frame())
        else {
            return;
        };
        frame.write_ne_bytes(&mut self.video);
    }
}

impl Core for WasmstageCore {
    fn save_memory(&mut self) -> Option<&mut [u8]> {
        None
    }

    fn rtc_memory(&mut self) -> Option<&mut [u8]> {
        None
    }

    fn system_memory(&mut self) -> Option<&mut [u8]> {
        None
    }

    fn video_memory(&mut self) -> Option<&mut [u8]> {
        None
    }

    fn info() -> CoreInfo {
        CoreInfo::new("wasmstage", env!("CARGO_PKG_VERSION"))
            .supports_roms_with_extension("wasm")
            .supports_roms_with_extension("wat")
    }

    fn on_load_game(&mut self, game_data: GameData) -> LoadGameResult {
        let config = HostConfig::from_env();

        let Some(session) = self.start_session(&game_data, &config) else {
            return LoadGameResult::Failed(game_data);
        };

        self.session = Some(session);
        self.game_data = Some(game_data);
        self.video = vec![0; config.surface_width as usize * config.surface_height as usize * 4];

        LoadGameResult::Success(AudioVideoInfo::new().video(
            config.surface_width,
            config.surface_height,
            FRAMES_PER_SECOND,
            PixelFormat::ARGB8888,
        ))
    }

    fn on_unload_game(&mut self) -> GameData {
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.shutdown() {
                tracing::error!(%err, "session terminated during unload");
            }
        }
        self.video.clear();
        // libretro only unloads a game it successfully loaded.
        self.game_data
            .take()
            .expect("on_unload_game called without a loaded game")
    }

    fn on_run(&mut self, handle: &mut RuntimeHandle) {
        let now = Instant::now();

        if let Some(session) = self.session.as_mut().filter(|s| !s.is_closed()) {
            Self::poll_input(session, handle);
            match session.tick_at(now) {
                Ok(Tick::Continue) => {}
                Ok(Tick::Exited) => tracing::info!("guest exited; presenting last frame"),
                Err(err) => tracing::error!(%err, "session terminated"),
            }
            session.frame_presented(now);
        }

        self.capture_frame();
        if !self.video.is_empty() {
            handle.upload_video_frame(&self.video);
        }
    }

    /// A reset is a fresh run of the game: the old session is torn down and the
    /// module is instantiated again, so `setup` runs once more.
    fn on_reset(&mut self) {
        let Some(game_data) = self.game_data.take() else {
            return;
        };
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.shutdown() {
                tracing::error!(%err, "session terminated during reset");
            }
        }
        let config = HostConfig::from_env();
        self.session = self.start_session(&game_data, &config);
        self.game_data = Some(game_data);
    }
}

libretro_core!(WasmstageCore);
