//! wasmstage-core ABI module
//!
//! This module defines the ABI contract between:
//! - **Host**: `wasmstage-core`
//! - **Guest**: the loaded WASM module ("game/app")
//!
//! ## High-level model (immediate mode)
//! The host owns the render surface, the clock, the input snapshot and the log sink.
//! The guest owns its own linear memory and passes strings to the host as
//! `(offset, length)` pairs into that memory. Every other value crosses as a plain
//! `i32` or `f32`.
//!
//! ## Imports (guest -> host)
//! Imported from module `"env"`.
//!
//! ### Engine
//! - `EngineLog(offset: i32, len: i32)`
//! - `EngineFps() -> f32`
//! - `EngineTps() -> f32`
//! - `EngineExit()`
//!     - Sets a flag only. The running `frame` finishes; the host stops at the next tick.
//! - `EngineRandomInt(exclusive_max: i32) -> i32`
//!     - `exclusive_max <= 0` returns `0`.
//! - `EngineRandomFloat() -> f32`
//!
//! ### Graphics
//! Colors are four normalized `f32` channels (`r, g, b, a`), clamped to `[0, 1]`.
//! - `GfxClear(r, g, b, a)`
//! - `GfxImage(x, y, r, g, b, a)`: built-in sprite, tint multiplied per channel.
//! - `GfxRectangle(x, y, w, h, r, g, b, a)`
//! - `GfxText(offset: i32, len: i32, x: f32, y: f32)`
//!
//! ### Input
//! - `InputPressed(code: i32) -> i32`: `1` if the action became pressed this tick, else `0`.
//! - `InputCursorX() -> f32`
//! - `InputCursorY() -> f32`
//!
//! ## Exports (host -> guest)
//! All optional, all `() -> ()`:
//! - `setup()`: once, right before the first `frame`.
//! - `frame()`: once per host tick.
//! - `teardown()`: once, when the session closes.
//!
//! ## Booleans
//! Every boolean crossing the boundary is an `i32`: [`FALSE`] or [`TRUE`].

use wasmtime::{FuncType, ValType};

/// Import module name used by the guest.
pub const IMPORT_MODULE: &str = "env";

/// Import module name of WASI preview1, accepted when WASI is enabled.
pub const WASI_MODULE: &str = "wasi_snapshot_preview1";

/// Export name of guest linear memory.
pub const MEMORY_EXPORT: &str = "memory";

/// Boolean encoding on the boundary.
pub const FALSE: i32 = 0;
pub const TRUE: i32 = 1;

/// Encode a host boolean for the guest.
#[inline]
pub const fn encode_bool(value: bool) -> i32 {
    if value { TRUE } else { FALSE }
}

/// Guest export names (entrypoints).
pub mod guest_exports {
    /// Called once, immediately before the first `frame` (optional).
    pub const SETUP: &str = "setup";
    /// Called once per host tick (optional).
    pub const FRAME: &str = "frame";
    /// Called once when the session closes (optional).
    pub const TEARDOWN: &str = "teardown";
    /// WASI reactor initializer, called once after instantiation if present.
    pub const INITIALIZE: &str = "_initialize";
}

/// Host import names provided to the guest.
///
/// These are the string names under module [`IMPORT_MODULE`].
pub mod host_imports {
    // Engine
    pub const ENGINE_LOG: &str = "EngineLog";
    pub const ENGINE_FPS: &str = "EngineFps";
    pub const ENGINE_TPS: &str = "EngineTps";
    pub const ENGINE_EXIT: &str = "EngineExit";
    pub const ENGINE_RANDOM_INT: &str = "EngineRandomInt";
    pub const ENGINE_RANDOM_FLOAT: &str = "EngineRandomFloat";

    // Graphics
    pub const GFX_CLEAR: &str = "GfxClear";
    pub const GFX_IMAGE: &str = "GfxImage";
    pub const GFX_RECTANGLE: &str = "GfxRectangle";
    pub const GFX_TEXT: &str = "GfxText";

    // Input
    pub const INPUT_PRESSED: &str = "InputPressed";
    pub const INPUT_CURSOR_X: &str = "InputCursorX";
    pub const INPUT_CURSOR_Y: &str = "InputCursorY";
}

/// Value types that may appear in a capability or lifecycle signature.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AbiType {
    I32,
    I64,
    F32,
    F64,
}

impl AbiType {
    /// Map an engine value type onto the ABI, if it is one we marshal.
    pub fn from_val_type(ty: &ValType) -> Option<Self> {
        match ty {
            ValType::I32 => Some(AbiType::I32),
            ValType::I64 => Some(AbiType::I64),
            ValType::F32 => Some(AbiType::F32),
            ValType::F64 => Some(AbiType::F64),
            _ => None,
        }
    }

    pub fn matches(self, ty: &ValType) -> bool {
        Self::from_val_type(ty) == Some(self)
    }
}

impl core::fmt::Display for AbiType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            AbiType::I32 => "i32",
            AbiType::I64 => "i64",
            AbiType::F32 => "f32",
            AbiType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A fixed positional signature.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Signature {
    pub params: &'static [AbiType],
    pub results: &'static [AbiType],
}

impl Signature {
    /// The lifecycle export signature.
    pub const UNIT: Signature = Signature {
        params: &[],
        results: &[],
    };

    /// True if an engine function type has exactly this shape.
    pub fn matches(&self, ty: &FuncType) -> bool {
        ty.params().len() == self.params.len()
            && ty.results().len() == self.results.len()
            && ty.params().zip(self.params).all(|(p, a)| a.matches(&p))
            && ty.results().zip(self.results).all(|(r, a)| a.matches(&r))
    }

    /// Render an engine function type for diagnostics.
    pub fn describe(ty: &FuncType) -> String {
        let list = |tys: &mut dyn Iterator<Item = ValType>| {
            tys.map(|t| match AbiType::from_val_type(&t) {
                Some(a) => a.to_string(),
                None => format!("{t}"),
            })
            .collect::<Vec<_>>()
            .join(", ")
        };
        format!("({}) -> ({})", list(&mut ty.params()), list(&mut ty.results()))
    }
}

impl core::fmt::Display for Signature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let join = |tys: &[AbiType]| {
            tys.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "({}) -> ({})", join(self.params), join(self.results))
    }
}

/// One entry of the host capability table.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Capability {
    pub name: &'static str,
    pub signature: Signature,
}

const fn capability(
    name: &'static str,
    params: &'static [AbiType],
    results: &'static [AbiType],
) -> Capability {
    Capability {
        name,
        signature: Signature { params, results },
    }
}

use AbiType::{F32, I32};

/// The frozen capability table. Registration in `runtime::imports` follows this list
/// one-to-one; guest imports are validated against it before instantiation.
pub const CAPABILITIES: &[Capability] = &[
    capability(host_imports::ENGINE_LOG, &[I32, I32], &[]),
    capability(host_imports::ENGINE_FPS, &[], &[F32]),
    capability(host_imports::ENGINE_TPS, &[], &[F32]),
    capability(host_imports::ENGINE_EXIT, &[], &[]),
    capability(host_imports::ENGINE_RANDOM_INT, &[I32], &[I32]),
    capability(host_imports::ENGINE_RANDOM_FLOAT, &[], &[F32]),
    capability(host_imports::GFX_CLEAR, &[F32, F32, F32, F32], &[]),
    capability(host_imports::GFX_IMAGE, &[F32, F32, F32, F32, F32, F32], &[]),
    capability(
        host_imports::GFX_RECTANGLE,
        &[F32, F32, F32, F32, F32, F32, F32, F32],
        &[],
    ),
    capability(host_imports::GFX_TEXT, &[I32, I32, F32, F32], &[]),
    capability(host_imports::INPUT_PRESSED, &[I32], &[I32]),
    capability(host_imports::INPUT_CURSOR_X, &[], &[F32]),
    capability(host_imports::INPUT_CURSOR_Y, &[], &[F32]),
];

/// Look up a capability by import name.
pub fn capability_named(name: &str) -> Option<&'static Capability> {
    CAPABILITIES.iter().find(|c| c.name == name)
}

/// Host input actions addressable by `InputPressed(code)`.
///
/// Keep these stable; they are part of the ABI.
#[repr(i32)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum InputAction {
    /// Cancel / quit key (Escape on desktop, Start on a pad).
    Escape = 1,
    /// Primary pointer button (left mouse, A on a pad).
    PrimaryClick = 2,
}

impl InputAction {
    pub const ALL: [InputAction; 2] = [InputAction::Escape, InputAction::PrimaryClick];

    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(InputAction::Escape),
            2 => Some(InputAction::PrimaryClick),
            _ => None,
        }
    }

    pub const fn index(self) -> usize {
        self as usize - 1
    }
}

/// Helpers for validating guest modules against the ABI before instantiation.
pub mod validate {
    use super::{CAPABILITIES, IMPORT_MODULE, Signature, WASI_MODULE, capability_named};
    use crate::error::LoadError;
    use wasmtime::{ExternType, Module};

    /// Check every import of `module` against the capability table.
    ///
    /// - `env` imports must name a capability and match its signature exactly.
    /// - `wasi_snapshot_preview1` imports are accepted only when `allow_wasi` is set;
    ///   the WASI linker resolves their signatures.
    /// - Anything else is rejected.
    pub fn imports(module: &Module, allow_wasi: bool) -> Result<(), LoadError> {
        for import in module.imports() {
            let (module_name, name) = (import.module(), import.name());

            if module_name == WASI_MODULE && allow_wasi {
                continue;
            }

            if module_name != IMPORT_MODULE {
                return Err(LoadError::UnknownImport {
                    module: module_name.to_string(),
                    name: name.to_string(),
                });
            }

            let Some(capability) = capability_named(name) else {
                return Err(LoadError::UnknownImport {
                    module: module_name.to_string(),
                    name: name.to_string(),
                });
            };

            let ExternType::Func(ty) = import.ty() else {
                return Err(LoadError::ImportKind {
                    name: name.to_string(),
                });
            };

            if !capability.signature.matches(&ty) {
                return Err(LoadError::ImportSignature {
                    name: name.to_string(),
                    expected: capability.signature.to_string(),
                    found: Signature::describe(&ty),
                });
            }
        }
        Ok(())
    }

    /// Names in the table, in registration order.
    pub fn capability_names() -> impl Iterator<Item = &'static str> {
        CAPABILITIES.iter().map(|c| c.name)
    }
}
