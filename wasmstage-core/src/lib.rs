//! wasmstage-core: a host that loads and runs a sandboxed guest WASM/WAT module.
//!
//! The guest imports a small, frozen capability table from module `"env"` (logging,
//! randomness, timing, input queries, drawing primitives) and may export three
//! `() -> ()` lifecycle entrypoints:
//! - `setup()`: once, right before the first `frame`
//! - `frame()`: once per host tick
//! - `teardown()`: once, when the session closes
//!
//! The ABI surface is defined in [`abi`] and mirrored by `wasmstage-sdk`.
//!
//! ```no_run
//! use wasmstage_core::{CapabilityContext, Framebuffer, HostConfig, Session, Tick};
//!
//! # fn main() -> Result<(), wasmstage_core::SessionError> {
//! let config = HostConfig::from_env();
//! let caps = CapabilityContext::new(&config)
//!     .with_surface(Framebuffer::new(config.surface_width, config.surface_height));
//! let mut session = Session::from_file(&config, caps)?;
//! while session.tick()? == Tick::Continue {}
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod bridge;
pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod lifecycle;
pub mod loader;
pub mod memory;
pub mod render;
pub mod runtime;
pub mod state;

#[cfg(feature = "libretro")]
pub mod libretro;

pub use abi::{CAPABILITIES, InputAction};
pub use bridge::CallBuffer;
pub use config::HostConfig;
pub use error::{CallError, LoadError, MemoryFault, SessionError};
pub use lifecycle::{Phase, Session, Tick};
pub use memory::MemoryView;
pub use render::{Framebuffer, RenderSurface, Rgba};
pub use runtime::{GuestModule, GuestRuntime, LifecycleExport};
pub use state::{CapabilityContext, LogSink, TracingSink};
