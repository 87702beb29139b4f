//! Host error types.
//!
//! | Error | Severity |
//! |---|---|
//! | [`LoadError`] | fatal, aborts startup |
//! | [`MemoryFault`] | fatal, closes the session |
//! | [`CallError`] | recoverable, logged, the tick continues |
//!
//! Drawing before a surface exists is not an error at all; see `state`.

use std::path::PathBuf;

pub use crate::memory::MemoryFault;

/// Startup failure: the host cannot run without a valid module.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The module artifact could not be read.
    #[error("failed to read guest module {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input was empty or otherwise not recognized as WASM/WAT.
    #[error("unrecognized module format (expected wasm or wat)")]
    UnrecognizedFormat,

    /// WAT parsing failed.
    #[error("failed to parse WAT: {0}")]
    WatParse(#[from] wat::Error),

    /// Wasmtime engine creation failed.
    #[error("failed to create engine: {0}")]
    Engine(#[source] anyhow::Error),

    /// Module compilation failed (malformed bytecode).
    #[error("failed to compile WASM module: {0}")]
    Compile(#[source] anyhow::Error),

    /// The guest imports something outside the capability table.
    #[error("guest imports undeclared capability {module}::{name}")]
    UnknownImport { module: String, name: String },

    /// The guest imports a capability name as something other than a function.
    #[error("guest import env::{name} is not a function")]
    ImportKind { name: String },

    /// The guest declared a different signature for a known capability.
    #[error("guest import env::{name} has signature {found}, host provides {expected}")]
    ImportSignature {
        name: String,
        expected: String,
        found: String,
    },

    /// A lifecycle export exists but is not `() -> ()`.
    #[error("guest export {name} must be () -> (), found {found}")]
    LifecycleSignature { name: &'static str, found: String },

    /// Linking or instantiation failed (including a trapping start function).
    #[error("failed to instantiate guest: {0}")]
    Instantiate(#[source] anyhow::Error),
}

/// A single cross-boundary invocation failed. Contained: the call is abandoned for
/// this tick and the session continues.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The guest trapped (unreachable, out-of-bounds guest access, stack exhaustion...).
    #[error("guest export {export} trapped: {message}")]
    Trap {
        export: String,
        message: String,
    },

    /// A capability called during this invocation faulted on guest memory.
    /// The session escalates this one.
    #[error("guest export {export} broke memory trust: {fault}")]
    Fault {
        export: String,
        fault: MemoryFault,
    },

    /// The arguments plus result slots do not fit the call buffer.
    #[error("call to {export} needs {needed} slots, call buffer holds {capacity}")]
    StackOverflow {
        export: String,
        needed: usize,
        capacity: usize,
    },

    /// An argument or result type the ABI does not marshal.
    #[error("call to {export}: {reason}")]
    Signature { export: String, reason: String },

    /// No export with that name.
    #[error("guest has no function export {0}")]
    MissingExport(String),
}

impl CallError {
    /// The memory fault behind this failure, if any.
    pub fn fault(&self) -> Option<&MemoryFault> {
        match self {
            CallError::Fault { fault, .. } => Some(fault),
            _ => None,
        }
    }
}

/// Fatal session failure surfaced to the operator.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),

    /// The guest handed the host an address outside its memory; the session was closed.
    #[error("session terminated: {0}")]
    MemoryFault(#[from] MemoryFault),
}
