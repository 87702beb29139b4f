//! Host configuration.

use std::path::PathBuf;

use crate::bridge::CALL_STACK_WORDS;

/// Default guest artifact location, relative to the working directory.
pub const DEFAULT_MODULE_PATH: &str = "game.wasm";

/// Size of one WebAssembly page.
pub const WASM_PAGE_SIZE: u64 = 65536;

/// Configuration for one host session.
///
/// | Variable | Field | Default |
/// |---|---|---|
/// | `WASMSTAGE_MODULE` | `module_path` | `game.wasm` |
/// | `WASMSTAGE_WIDTH` | `surface_width` | `640` |
/// | `WASMSTAGE_HEIGHT` | `surface_height` | `480` |
/// | `WASMSTAGE_SEED` | `rng_seed` | entropy |
/// | `WASMSTAGE_WASI` | `enable_wasi` | `true` |
/// | `WASMSTAGE_MAX_MEMORY_PAGES` | `max_memory_pages` | `256` |
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Where the guest artifact is loaded from.
    pub module_path: PathBuf,

    /// Render surface size in pixels.
    pub surface_width: u32,
    pub surface_height: u32,

    /// Slots in the reusable call buffer.
    pub call_stack_words: usize,

    /// Seed for `EngineRandomInt` / `EngineRandomFloat`. `None` seeds from entropy.
    pub rng_seed: Option<u64>,

    /// Link `wasi_snapshot_preview1` (stdio inherited, no filesystem access).
    pub enable_wasi: bool,

    /// Maximum guest linear memory in pages (1 page = 64 KiB).
    /// Default: 256 pages = 16 MiB.
    pub max_memory_pages: u32,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            module_path: PathBuf::from(DEFAULT_MODULE_PATH),
            surface_width: 640,
            surface_height: 480,
            call_stack_words: CALL_STACK_WORDS,
            rng_seed: None,
            enable_wasi: true,
            max_memory_pages: 256,
        }
    }
}

impl HostConfig {
    /// Defaults overridden by `WASMSTAGE_*` environment variables. Unparsable
    /// values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("WASMSTAGE_MODULE") {
            config.module_path = PathBuf::from(path);
        }
        if let Some(w) = parse(&lookup, "WASMSTAGE_WIDTH") {
            config.surface_width = w;
        }
        if let Some(h) = parse(&lookup, "WASMSTAGE_HEIGHT") {
            config.surface_height = h;
        }
        if let Some(seed) = parse(&lookup, "WASMSTAGE_SEED") {
            config.rng_seed = Some(seed);
        }
        if let Some(wasi) = parse(&lookup, "WASMSTAGE_WASI") {
            config.enable_wasi = wasi;
        }
        if let Some(pages) = parse(&lookup, "WASMSTAGE_MAX_MEMORY_PAGES") {
            config.max_memory_pages = pages;
        }
        config
    }

    /// Memory cap in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        (self.max_memory_pages as u64 * WASM_PAGE_SIZE) as usize
    }
}

fn parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}
