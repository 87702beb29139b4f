//! Host import definitions for the wasmtime runtime.
//!
//! One `func_wrap` per entry of [`crate::abi::CAPABILITIES`], all under module `"env"`.
//! Handlers that read guest memory build a fresh [`crate::memory::MemoryView`] per
//! call. On a bad address they record the fault in the context and trap the guest.

use wasmtime::{Caller, Linker};

use crate::abi::{IMPORT_MODULE, host_imports};
use crate::memory::{self, MemoryFault};
use crate::render::Rgba;
use crate::state::HostState;

type Ctx<'a> = Caller<'a, HostState>;

/// Turn a fault into a guest trap, keeping it for the session to escalate.
fn fault(caller: &mut Ctx<'_>, fault: MemoryFault) -> anyhow::Error {
    tracing::error!(%fault, "guest passed an out-of-bounds memory range");
    caller.data_mut().caps.record_fault(fault);
    anyhow::Error::new(fault)
}

/// Define all host imports expected by guests under module `"env"`.
///
/// Must be called before instantiating the module.
pub fn define_imports(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    // --- Engine ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::ENGINE_LOG,
        |mut caller: Ctx<'_>, offset: i32, len: i32| -> anyhow::Result<()> {
            let (view, state) = memory::view_and_state(&mut caller);
            match state.caps.log(view, offset as u32, len as u32) {
                Ok(()) => Ok(()),
                Err(f) => Err(fault(&mut caller, f)),
            }
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::ENGINE_FPS,
        |caller: Ctx<'_>| -> f32 { caller.data().caps.fps() },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::ENGINE_TPS,
        |caller: Ctx<'_>| -> f32 { caller.data().caps.tps() },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::ENGINE_EXIT,
        |mut caller: Ctx<'_>| caller.data_mut().caps.request_exit(),
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::ENGINE_RANDOM_INT,
        |mut caller: Ctx<'_>, exclusive_max: i32| -> i32 {
            caller.data_mut().caps.random_int(exclusive_max)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::ENGINE_RANDOM_FLOAT,
        |mut caller: Ctx<'_>| -> f32 { caller.data_mut().caps.random_float() },
    )?;

    // --- Graphics ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::GFX_CLEAR,
        |mut caller: Ctx<'_>, r: f32, g: f32, b: f32, a: f32| {
            caller.data_mut().caps.draw_clear(Rgba::from_unit(r, g, b, a));
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::GFX_IMAGE,
        |mut caller: Ctx<'_>, x: f32, y: f32, r: f32, g: f32, b: f32, a: f32| {
            caller
                .data_mut()
                .caps
                .draw_image(x, y, Rgba::from_unit(r, g, b, a));
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::GFX_RECTANGLE,
        |mut caller: Ctx<'_>,
         x: f32,
         y: f32,
         w: f32,
         h: f32,
         r: f32,
         g: f32,
         b: f32,
         a: f32| {
            caller
                .data_mut()
                .caps
                .draw_rectangle(x, y, w, h, Rgba::from_unit(r, g, b, a));
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::GFX_TEXT,
        |mut caller: Ctx<'_>, offset: i32, len: i32, x: f32, y: f32| -> anyhow::Result<()> {
            let (view, state) = memory::view_and_state(&mut caller);
            match state.caps.draw_text(view, offset as u32, len as u32, x, y) {
                Ok(()) => Ok(()),
                Err(f) => Err(fault(&mut caller, f)),
            }
        },
    )?;

    // --- Input ---
    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::INPUT_PRESSED,
        |caller: Ctx<'_>, code: i32| -> i32 { caller.data().caps.input_pressed(code) },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::INPUT_CURSOR_X,
        |caller: Ctx<'_>| -> f32 { caller.data().caps.cursor_x() },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        host_imports::INPUT_CURSOR_Y,
        |caller: Ctx<'_>| -> f32 { caller.data().caps.cursor_y() },
    )?;

    Ok(())
}
