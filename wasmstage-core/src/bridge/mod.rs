//! The host -> guest calling convention.
//!
//! Every invocation goes through one [`CallBuffer`] owned by the guest module:
//! 1. the buffer is cleared,
//! 2. arguments are written positionally,
//! 3. one zeroed slot per declared result is appended,
//! 4. the engine reads the argument slots and writes the result slots.
//!
//! The buffer is allocated once with a fixed capacity and never grows, so a
//! steady-state call allocates nothing on the host side. Guest -> host calls are
//! marshaled by the engine's typed trampolines against the signatures in
//! [`crate::abi::CAPABILITIES`].

use wasmtime::{AsContextMut, Func, Val};

use crate::abi::AbiType;
use crate::error::CallError;
use crate::state::HostState;

/// Default number of slots: enough for the widest capability signature (8 params)
/// with room to spare.
pub const CALL_STACK_WORDS: usize = 16;

/// Reusable argument/result buffer.
#[derive(Debug)]
pub struct CallBuffer {
    words: Vec<Val>,
    params: usize,
    capacity: usize,
}

impl CallBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: Vec::with_capacity(capacity),
            params: 0,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of occupied slots (arguments + result slots) of the current call.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn clear(&mut self) {
        self.words.clear();
        self.params = 0;
    }

    /// Clear, then lay out `args` followed by zeroed slots for `results`.
    ///
    /// Fails without touching capacity if the call does not fit.
    pub fn prepare(
        &mut self,
        export: &str,
        args: &[Val],
        results: &[AbiType],
    ) -> Result<(), CallError> {
        self.clear();

        let needed = args.len() + results.len();
        if needed > self.capacity {
            return Err(CallError::StackOverflow {
                export: export.to_string(),
                needed,
                capacity: self.capacity,
            });
        }

        self.words.extend_from_slice(args);
        self.words.extend(results.iter().map(|ty| zero(*ty)));
        self.params = args.len();
        Ok(())
    }

    /// The argument slots.
    pub fn params(&self) -> &[Val] {
        &self.words[..self.params]
    }

    /// The result slots of the most recent call.
    pub fn results(&self) -> &[Val] {
        &self.words[self.params..]
    }

    fn split_mut(&mut self) -> (&[Val], &mut [Val]) {
        let (params, results) = self.words.split_at_mut(self.params);
        (params, results)
    }
}

impl Default for CallBuffer {
    fn default() -> Self {
        Self::with_capacity(CALL_STACK_WORDS)
    }
}

/// The zero value of an ABI type.
pub fn zero(ty: AbiType) -> Val {
    match ty {
        AbiType::I32 => Val::I32(0),
        AbiType::I64 => Val::I64(0),
        AbiType::F32 => Val::F32(0f32.to_bits()),
        AbiType::F64 => Val::F64(0f64.to_bits()),
    }
}

/// A guest function export resolved once, with its result types cached so calls
/// need no type queries.
#[derive(Clone, Debug)]
pub struct GuestExport {
    pub name: String,
    pub func: Func,
    pub params: Vec<AbiType>,
    pub results: Vec<AbiType>,
}

impl GuestExport {
    /// Resolve the ABI shape of `func`. Fails on reference/vector types.
    pub fn new(
        name: impl Into<String>,
        func: Func,
        store: impl AsContextMut<Data = HostState>,
    ) -> Result<Self, CallError> {
        let name = name.into();
        let ty = func.ty(&store);

        let map = |tys: &mut dyn Iterator<Item = wasmtime::ValType>| {
            tys.map(|t| {
                AbiType::from_val_type(&t).ok_or_else(|| CallError::Signature {
                    export: name.clone(),
                    reason: format!("unsupported value type {t}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()
        };

        let params = map(&mut ty.params())?;
        let results = map(&mut ty.results())?;

        Ok(Self {
            name,
            func,
            params,
            results,
        })
    }

    pub fn is_unit(&self) -> bool {
        self.params.is_empty() && self.results.is_empty()
    }
}

/// Invoke `export` through `stack`.
///
/// On success the results are left in `stack.results()`. A trap becomes
/// [`CallError::Trap`]; a memory fault raised by a capability during the call
/// becomes [`CallError::Fault`] regardless of how the trap was reported.
pub fn invoke(
    mut store: impl AsContextMut<Data = HostState>,
    stack: &mut CallBuffer,
    export: &GuestExport,
    args: &[Val],
) -> Result<(), CallError> {
    check_args(export, args)?;
    stack.prepare(&export.name, args, &export.results)?;

    let outcome = {
        let (params, results) = stack.split_mut();
        export.func.call(&mut store, params, results)
    };

    // A fault recorded by a capability wins over whatever error the engine reports.
    if let Some(fault) = store.as_context_mut().data_mut().caps.take_fault() {
        stack.clear();
        return Err(CallError::Fault {
            export: export.name.clone(),
            fault,
        });
    }

    outcome.map_err(|err| {
        stack.clear();
        CallError::Trap {
            export: export.name.clone(),
            message: trap_message(&err),
        }
    })
}

fn check_args(export: &GuestExport, args: &[Val]) -> Result<(), CallError> {
    if args.len() != export.params.len() {
        return Err(CallError::Signature {
            export: export.name.clone(),
            reason: format!(
                "expected {} arguments, got {}",
                export.params.len(),
                args.len()
            ),
        });
    }
    for (i, (arg, ty)) in args.iter().zip(&export.params).enumerate() {
        let ok = matches!(
            (arg, ty),
            (Val::I32(_), AbiType::I32)
                | (Val::I64(_), AbiType::I64)
                | (Val::F32(_), AbiType::F32)
                | (Val::F64(_), AbiType::F64)
        );
        if !ok {
            return Err(CallError::Signature {
                export: export.name.clone(),
                reason: format!("argument {i} is not {ty}"),
            });
        }
    }
    Ok(())
}

/// Render an engine error, preferring the trap code when there is one.
fn trap_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<wasmtime::Trap>() {
        Some(trap) => format!("{trap}: {err:#}"),
        None => format!("{err:#}"),
    }
}
