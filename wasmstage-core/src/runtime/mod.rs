//! Wasmtime-backed runtime glue for wasmstage-core.
//!
//! Responsibilities:
//! - Create a wasmtime `Engine`/`Store` with the proposals guests rely on.
//! - Define host imports under module `"env"` matching the capability table.
//! - Validate a compiled module's imports, instantiate it and resolve the
//!   lifecycle exports into a [`GuestModule`].

pub mod imports;
#[allow(clippy::module_inception)]
pub mod runtime;

pub use runtime::{GuestModule, GuestRuntime, LifecycleExport};
