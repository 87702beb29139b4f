//! Session lifecycle: `Loaded -> Running -> Closed`.
//!
//! A [`Session`] only exists once loading succeeded, so the "uninitialized" state is
//! the absence of a session. Guarantees:
//! - `setup` runs at most once, at the start of the first tick, before that tick's
//!   `frame`.
//! - `frame` runs once per tick while running.
//! - `teardown` runs exactly once when the session closes, whatever happened before.
//! - `Closed` is terminal: no guest code runs after it.
//!
//! The exit flag raised by `EngineExit` is only looked at on the tick boundary, so
//! the `frame` that raised it runs to completion.
//!
//! A memory fault is fatal wherever it happens, `teardown` included: the call that
//! closed the session reports it as [`SessionError::MemoryFault`].

use std::path::Path;
use std::time::Instant;

use crate::config::HostConfig;
use crate::error::{CallError, MemoryFault, SessionError};
use crate::runtime::{GuestModule, GuestRuntime, LifecycleExport};
use crate::state::CapabilityContext;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    Loaded,
    Running,
    Closed,
}

/// Outcome of one tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Tick {
    /// The guest ran; tick again.
    Continue,
    /// The session is closed; stop ticking.
    Exited,
}

pub struct Session {
    guest: GuestModule,
    phase: Phase,
}

impl Session {
    pub fn new(guest: GuestModule) -> Self {
        Self {
            guest,
            phase: Phase::Loaded,
        }
    }

    /// Load `bytecode` and wrap it in a session.
    pub fn start(
        bytecode: &[u8],
        config: &HostConfig,
        caps: CapabilityContext,
    ) -> Result<Self, SessionError> {
        Ok(Self::new(GuestRuntime::load(bytecode, config, caps)?))
    }

    /// Load the artifact at `config.module_path`.
    pub fn from_file(config: &HostConfig, caps: CapabilityContext) -> Result<Self, SessionError> {
        Self::from_path(&config.module_path, config, caps)
    }

    pub fn from_path(
        path: &Path,
        config: &HostConfig,
        caps: CapabilityContext,
    ) -> Result<Self, SessionError> {
        tracing::info!(path = %path.display(), "loading guest module");
        Ok(Self::new(GuestRuntime::load_file(path, config, caps)?))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    pub fn guest(&self) -> &GuestModule {
        &self.guest
    }

    pub fn guest_mut(&mut self) -> &mut GuestModule {
        &mut self.guest
    }

    pub fn context(&self) -> &CapabilityContext {
        self.guest.context()
    }

    pub fn context_mut(&mut self) -> &mut CapabilityContext {
        self.guest.context_mut()
    }

    pub fn tick(&mut self) -> Result<Tick, SessionError> {
        self.tick_at(Instant::now())
    }

    /// Run one host tick that started at `now`.
    pub fn tick_at(&mut self, now: Instant) -> Result<Tick, SessionError> {
        if self.phase == Phase::Closed {
            return Ok(Tick::Exited);
        }

        if self.context().exit_requested() {
            return match self.close() {
                Some(fault) => Err(SessionError::MemoryFault(fault)),
                None => Ok(Tick::Exited),
            };
        }

        let caps = self.context_mut();
        caps.input_mut().snapshot();
        caps.clock_mut().record_tick(now);

        if self.phase == Phase::Loaded {
            self.phase = Phase::Running;
            tracing::info!("session running");
            self.run(LifecycleExport::Setup)?;
        }
        self.run(LifecycleExport::Frame)?;

        Ok(Tick::Continue)
    }

    /// The frontend presented the surface. Counts toward `EngineFps` only if the
    /// guest drew something since the previous presentation, so ticks that leave
    /// the surface untouched lower the frame rate but not the tick rate.
    pub fn frame_presented(&mut self, now: Instant) {
        let caps = self.context_mut();
        if caps.take_drawn() {
            caps.clock_mut().record_frame(now);
        }
    }

    /// Close the session, running `teardown` if it has not run yet.
    ///
    /// Fails only if this call ran `teardown` and it broke memory trust.
    pub fn shutdown(&mut self) -> Result<(), SessionError> {
        match self.close() {
            Some(fault) => Err(SessionError::MemoryFault(fault)),
            None => Ok(()),
        }
    }

    fn run(&mut self, which: LifecycleExport) -> Result<(), SessionError> {
        match self.guest.invoke_lifecycle(which) {
            Ok(()) => Ok(()),
            Err(CallError::Fault { export, fault }) => {
                tracing::error!(%export, %fault, "memory trust violated; closing session");
                // The first fault is the one reported; a second one in teardown is only logged.
                let _ = self.close();
                Err(SessionError::MemoryFault(fault))
            }
            Err(err) => {
                tracing::warn!(%err, "guest call abandoned for this tick");
                Ok(())
            }
        }
    }

    /// Run `teardown` once and enter `Closed`. Returns the fault if `teardown`
    /// broke memory trust.
    fn close(&mut self) -> Option<MemoryFault> {
        if self.phase == Phase::Closed {
            return None;
        }
        self.phase = Phase::Closed;

        let fault = match self.guest.invoke_lifecycle(LifecycleExport::Teardown) {
            Ok(()) => None,
            Err(CallError::Fault { fault, .. }) => {
                tracing::error!(%fault, "teardown violated memory trust");
                Some(fault)
            }
            Err(err) => {
                tracing::warn!(%err, "teardown failed");
                None
            }
        };
        tracing::info!("session closed");
        fault
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Already logged; there is no caller left to report it to.
        let _ = self.close();
    }
}
