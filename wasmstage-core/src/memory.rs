//! Bounds-checked reads from guest linear memory.
//!
//! A [`MemoryView`] is a transient window over the guest's current memory. It is
//! derived again on every capability call, because the guest may grow its memory
//! between calls and any cached length would be stale.

use std::borrow::Cow;

use wasmtime::{Caller, Extern};

use crate::abi::MEMORY_EXPORT;

/// The guest passed an `(offset, length)` pair outside its own memory.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("invalid guest memory read at offset {offset}, length {len} (memory size {memory_size})")]
pub struct MemoryFault {
    pub offset: u32,
    pub len: u32,
    pub memory_size: usize,
}

/// Read-only view into guest memory.
#[derive(Clone, Copy, Debug)]
pub struct MemoryView<'a> {
    bytes: &'a [u8],
}

impl<'a> MemoryView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// A view for guests that export no memory: every non-empty read faults.
    pub fn empty() -> Self {
        Self { bytes: &[] }
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// Returns `Err` if `[offset, offset + len)` is not entirely inside memory.
    /// Never returns a truncated slice.
    pub fn read(&self, offset: u32, len: u32) -> Result<&'a [u8], MemoryFault> {
        let fault = MemoryFault {
            offset,
            len,
            memory_size: self.bytes.len(),
        };
        let start = offset as usize;
        let end = start.checked_add(len as usize).ok_or(fault)?;
        self.bytes.get(start..end).ok_or(fault)
    }

    /// Read and decode text. Invalid UTF-8 is replaced, not rejected; only the
    /// bounds check can fail.
    pub fn read_text(&self, offset: u32, len: u32) -> Result<Cow<'a, str>, MemoryFault> {
        self.read(offset, len).map(String::from_utf8_lossy)
    }
}

/// Split a caller into a fresh view of guest memory and the host state.
///
/// Guests without a `memory` export get an empty view.
pub fn view_and_state<'a, T: 'static>(caller: &'a mut Caller<'_, T>) -> (MemoryView<'a>, &'a mut T) {
    match caller.get_export(MEMORY_EXPORT).and_then(Extern::into_memory) {
        Some(memory) => {
            let (bytes, state) = memory.data_and_store_mut(caller);
            (MemoryView::new(bytes), state)
        }
        None => (MemoryView::empty(), caller.data_mut()),
    }
}
