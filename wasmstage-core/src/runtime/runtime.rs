//! Engine setup, linking, instantiation and export resolution.

use std::path::Path;

use wasmtime::{Engine, Instance, Linker, Store, Val};

use crate::abi::{self, Signature, guest_exports};
use crate::bridge::{self, CallBuffer, GuestExport};
use crate::config::HostConfig;
use crate::error::{CallError, LoadError};
use crate::loader;
use crate::state::{CapabilityContext, HostState};

/// The three optional lifecycle entrypoints.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LifecycleExport {
    Setup,
    Frame,
    Teardown,
}

impl LifecycleExport {
    pub const fn name(self) -> &'static str {
        match self {
            LifecycleExport::Setup => guest_exports::SETUP,
            LifecycleExport::Frame => guest_exports::FRAME,
            LifecycleExport::Teardown => guest_exports::TEARDOWN,
        }
    }
}

/// Host-side runtime container: one engine and a linker with the capability table
/// (and optionally WASI) already bound.
pub struct GuestRuntime {
    engine: Engine,
    linker: Linker<HostState>,
    config: HostConfig,
}

impl GuestRuntime {
    /// Create the engine and bind every host import.
    pub fn new(config: HostConfig) -> Result<Self, LoadError> {
        let mut cfg = wasmtime::Config::new();
        cfg.wasm_multi_value(true);
        cfg.wasm_bulk_memory(true);
        cfg.wasm_reference_types(true);
        cfg.wasm_simd(true);

        let engine = Engine::new(&cfg).map_err(LoadError::Engine)?;

        let mut linker = Linker::new(&engine);
        super::imports::define_imports(&mut linker).map_err(LoadError::Instantiate)?;
        if config.enable_wasi {
            wasmtime_wasi::p1::add_to_linker_sync(&mut linker, |s: &mut HostState| &mut s.wasi)
                .map_err(LoadError::Instantiate)?;
        }

        Ok(Self {
            engine,
            linker,
            config,
        })
    }

    /// Load `bytecode` (binary wasm or WAT) with a fresh runtime.
    pub fn load(
        bytecode: &[u8],
        config: &HostConfig,
        caps: CapabilityContext,
    ) -> Result<GuestModule, LoadError> {
        Self::new(config.clone())?.instantiate(bytecode, caps)
    }

    /// Read the artifact at `path` and load it.
    pub fn load_file(
        path: &Path,
        config: &HostConfig,
        caps: CapabilityContext,
    ) -> Result<GuestModule, LoadError> {
        let bytecode = loader::read_artifact(path)?;
        Self::load(&bytecode, config, caps)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Compile, validate, instantiate and resolve the lifecycle exports.
    pub fn instantiate(
        &self,
        bytecode: &[u8],
        caps: CapabilityContext,
    ) -> Result<GuestModule, LoadError> {
        let module = loader::compile_module(&self.engine, bytecode)?;
        abi::validate::imports(&module, self.config.enable_wasi)?;

        let mut store = Store::new(&self.engine, HostState::new(caps, &self.config));
        store.limiter(|s| &mut s.limits);

        let instance = self
            .linker
            .instantiate(&mut store, &module)
            .map_err(LoadError::Instantiate)?;

        let mut stack = CallBuffer::with_capacity(self.config.call_stack_words);

        if let Some(init) = resolve_unit(&instance, &mut store, guest_exports::INITIALIZE)? {
            bridge::invoke(&mut store, &mut stack, &init, &[])
                .map_err(|e| LoadError::Instantiate(anyhow::Error::new(e)))?;
        }

        let setup = resolve_unit(&instance, &mut store, guest_exports::SETUP)?;
        let frame = resolve_unit(&instance, &mut store, guest_exports::FRAME)?;
        let teardown = resolve_unit(&instance, &mut store, guest_exports::TEARDOWN)?;

        tracing::info!(
            setup = setup.is_some(),
            frame = frame.is_some(),
            teardown = teardown.is_some(),
            "guest module instantiated"
        );

        Ok(GuestModule {
            store,
            instance,
            stack,
            setup,
            frame,
            teardown,
        })
    }
}

/// Look up an optional `() -> ()` export.
fn resolve_unit(
    instance: &Instance,
    store: &mut Store<HostState>,
    name: &'static str,
) -> Result<Option<GuestExport>, LoadError> {
    let Some(func) = instance.get_func(&mut *store, name) else {
        return Ok(None);
    };
    let ty = func.ty(&*store);
    if !Signature::UNIT.matches(&ty) {
        return Err(LoadError::LifecycleSignature {
            name,
            found: Signature::describe(&ty),
        });
    }
    Ok(Some(GuestExport {
        name: name.to_string(),
        func,
        params: Vec::new(),
        results: Vec::new(),
    }))
}

/// One instantiated guest: its store, its exports and its call buffer.
pub struct GuestModule {
    store: Store<HostState>,
    instance: Instance,
    stack: CallBuffer,
    setup: Option<GuestExport>,
    frame: Option<GuestExport>,
    teardown: Option<GuestExport>,
}

impl GuestModule {
    fn lifecycle(&self, which: LifecycleExport) -> Option<&GuestExport> {
        match which {
            LifecycleExport::Setup => self.setup.as_ref(),
            LifecycleExport::Frame => self.frame.as_ref(),
            LifecycleExport::Teardown => self.teardown.as_ref(),
        }
    }

    pub fn has_export(&self, which: LifecycleExport) -> bool {
        self.lifecycle(which).is_some()
    }

    /// Call a lifecycle export. An absent export is a successful no-op.
    pub fn invoke_lifecycle(&mut self, which: LifecycleExport) -> Result<(), CallError> {
        let export = match which {
            LifecycleExport::Setup => self.setup.as_ref(),
            LifecycleExport::Frame => self.frame.as_ref(),
            LifecycleExport::Teardown => self.teardown.as_ref(),
        };
        match export {
            Some(export) => bridge::invoke(&mut self.store, &mut self.stack, export, &[]),
            None => Ok(()),
        }
    }

    /// Call any function export by name. Results live in the call buffer until the
    /// next call.
    pub fn call(&mut self, name: &str, args: &[Val]) -> Result<&[Val], CallError> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| CallError::MissingExport(name.to_string()))?;
        let export = GuestExport::new(name, func, &mut self.store)?;
        bridge::invoke(&mut self.store, &mut self.stack, &export, args)?;
        Ok(self.stack.results())
    }

    pub fn context(&self) -> &CapabilityContext {
        &self.store.data().caps
    }

    pub fn context_mut(&mut self) -> &mut CapabilityContext {
        &mut self.store.data_mut().caps
    }

    pub fn call_buffer(&self) -> &CallBuffer {
        &self.stack
    }

    /// Current size of the guest's `memory` export in bytes, 0 without one.
    pub fn memory_size(&mut self) -> usize {
        self.instance
            .get_memory(&mut self.store, abi::MEMORY_EXPORT)
            .map_or(0, |m| m.data_size(&self.store))
    }
}
