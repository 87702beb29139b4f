//! wasmstage-headless: drive a guest module at a fixed tick rate without a window.
//!
//! Draw calls land in an off-screen framebuffer; guest log lines go to stderr through
//! `tracing` (filter with `RUST_LOG`, default `info`).
//!
//! Exit status is 0 when the guest exits or the tick budget runs out, 1 when the
//! module fails to load or breaks memory trust.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing_subscriber::EnvFilter;
use wasmstage_core::{CapabilityContext, Framebuffer, HostConfig, Session, Tick};

#[derive(Debug, Parser)]
#[command(name = "wasmstage-headless", version, about)]
struct Args {
    /// Guest module (.wasm or .wat).
    #[arg(long, env = "WASMSTAGE_MODULE")]
    module: Option<PathBuf>,

    /// Stop after this many ticks. Runs until the guest exits if omitted.
    #[arg(long)]
    ticks: Option<u64>,

    /// Target ticks per second; 0 runs as fast as possible.
    #[arg(long, default_value_t = 60.0, value_parser = parse_tps)]
    tps: f64,

    /// Seed for the guest-visible RNG.
    #[arg(long, env = "WASMSTAGE_SEED")]
    seed: Option<u64>,

    #[arg(long, env = "WASMSTAGE_WIDTH")]
    width: Option<u32>,

    #[arg(long, env = "WASMSTAGE_HEIGHT")]
    height: Option<u32>,

    /// Do not link WASI preview1.
    #[arg(long)]
    no_wasi: bool,
}

impl Args {
    fn into_config(self) -> (HostConfig, Option<u64>, f64) {
        let mut config = HostConfig::from_env();
        if let Some(module) = self.module {
            config.module_path = module;
        }
        if let Some(seed) = self.seed {
            config.rng_seed = Some(seed);
        }
        if let Some(width) = self.width {
            config.surface_width = width;
        }
        if let Some(height) = self.height {
            config.surface_height = height;
        }
        if self.no_wasi {
            config.enable_wasi = false;
        }
        (config, self.ticks, self.tps)
    }
}

/// A finite, non-negative rate whose period fits in a `Duration`.
fn parse_tps(raw: &str) -> Result<f64, String> {
    let tps: f64 = raw.parse().map_err(|err| format!("{err}"))?;
    if !tps.is_finite() || tps < 0.0 {
        return Err(format!("{tps} is not a tick rate (expected a finite number >= 0)"));
    }
    if tps > 0.0 {
        tick_period(tps)?;
    }
    Ok(tps)
}

fn tick_period(tps: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(1.0 / tps).map_err(|err| format!("tick rate {tps}: {err}"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let (config, ticks, tps) = Args::parse().into_config();

    match run(&config, ticks, tps) {
        Ok(ran) => {
            tracing::info!(ticks = ran, "done");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &HostConfig, budget: Option<u64>, tps: f64) -> anyhow::Result<u64> {
    let caps = CapabilityContext::new(config)
        .with_surface(Framebuffer::new(config.surface_width, config.surface_height));
    let mut session = Session::from_file(config, caps)?;

    let period = if tps > 0.0 {
        Some(tick_period(tps).map_err(anyhow::Error::msg)?)
    } else {
        None
    };
    let mut ran = 0u64;
    let mut next = Instant::now();

    while budget.is_none_or(|b| ran < b) {
        let now = Instant::now();
        if session.tick_at(now)? == Tick::Exited {
            return Ok(ran);
        }
        session.frame_presented(now);
        ran += 1;

        if let Some(period) = period {
            next += period;
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            } else {
                next = now;
            }
        }
    }

    session.shutdown()?;
    Ok(ran)
}
