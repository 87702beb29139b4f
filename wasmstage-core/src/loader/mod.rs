//! Loader utilities for wasmstage-core.
//!
//! Responsibilities:
//! - Read the guest artifact from disk, or take bytes from the frontend.
//! - Detect whether those bytes are a `.wasm` binary or `.wat` text.
//! - If it looks like WAT, convert it to WASM bytes (via the `wat` crate).
//! - Compile a wasmtime `Module` from the resulting WASM bytes.
//!
//! Frontends do not always preserve the file extension, so we sniff the bytes
//! themselves. Leading whitespace and a UTF-8 BOM are accepted in front of WAT.

use std::path::Path;

use wasmtime::{Engine, Module};

use crate::error::LoadError;

/// What kind of module the loader inferred from the bytes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DetectedFormat {
    Wasm,
    Wat,
}

/// Result of normalizing (detecting + possibly converting) the input.
#[derive(Clone, Debug)]
pub struct Detected {
    pub format: DetectedFormat,
    /// Always valid WASM bytes (for WASM/WAT inputs).
    pub wasm_bytes: Vec<u8>,
}

/// Read a guest artifact from `path`.
pub fn read_artifact(path: &Path) -> Result<Vec<u8>, LoadError> {
    std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Load: detect -> (optional) wat->wasm -> compile.
pub fn compile_module(engine: &Engine, bytes: &[u8]) -> Result<Module, LoadError> {
    let Detected { format, wasm_bytes } = normalize_to_wasm(bytes)?;
    tracing::debug!(?format, size = wasm_bytes.len(), "compiling guest module");
    Module::new(engine, &wasm_bytes).map_err(LoadError::Compile)
}

/// Detect format and normalize to valid WASM bytes.
pub fn normalize_to_wasm(bytes: &[u8]) -> Result<Detected, LoadError> {
    let format = detect_format(bytes).ok_or(LoadError::UnrecognizedFormat)?;

    let wasm_bytes = match format {
        DetectedFormat::Wasm => bytes.to_vec(),
        DetectedFormat::Wat => wat::parse_bytes(bytes)?.into_owned(),
    };
    Ok(Detected { format, wasm_bytes })
}

/// Best-effort detection.
///
/// Rules:
/// - If the first 4 bytes are `\0asm`, treat as WASM.
/// - Else, after stripping UTF-8 BOM / leading whitespace, if the first non-ws byte is `(`,
///   treat as WAT (common WAT starts with `(module ...)`).
pub fn detect_format(bytes: &[u8]) -> Option<DetectedFormat> {
    if bytes.starts_with(b"\0asm") {
        return Some(DetectedFormat::Wasm);
    }

    let i = skip_bom_and_leading_ws(bytes);
    match bytes.get(i) {
        Some(b'(') => Some(DetectedFormat::Wat),
        _ => None,
    }
}

fn skip_bom_and_leading_ws(bytes: &[u8]) -> usize {
    let start = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) { 3 } else { 0 };
    bytes[start..]
        .iter()
        .position(|b| !matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .map_or(bytes.len(), |n| start + n)
}
