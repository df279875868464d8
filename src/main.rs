//! Trellis runtime demo
//!
//! Starts the worker threads, streams a couple of demo trunks in and ticks
//! until the window closes. `--headless` swaps in the headless window
//! backend and null renderer and stops after `--ticks` ticks.

use std::path::PathBuf;
use std::thread;

use trellis::core::{logging, Error, RuntimeConfig};
use trellis::engine::Engine;
use trellis::render::{GpuContext, GpuRenderer, IndirectDrawBuffer, NullRenderer};
use trellis::scene::{MeshEntry, TrunkTable};
use trellis::streaming::{CpuDrawCommands, DrawCommandGenerator};
use trellis::window::{HeadlessBackend, WinitBackend};

/// Upper bound on draw commands the demo's indirect buffer can hold
const MAX_DRAW_COMMANDS: u32 = 4096;

const DEFAULT_HEADLESS_TICKS: u64 = 600;

fn main() {
    logging::init();
    log::info!("Trellis starting...");

    let args: Vec<String> = std::env::args().collect();
    let headless = args.iter().any(|arg| arg == "--headless");

    let result = load_config(parse_config_arg(&args)).and_then(|config| {
        if headless {
            let ticks = parse_ticks_arg(&args).unwrap_or(DEFAULT_HEADLESS_TICKS);
            run_headless(config, ticks)
        } else {
            run_windowed(config)
        }
    });

    if let Err(e) = result {
        log::error!("Trellis failed: {}", e);
        std::process::exit(1);
    }
    log::info!("Trellis exited cleanly");
}

fn load_config(path: Option<PathBuf>) -> Result<RuntimeConfig, Error> {
    match path {
        Some(path) => {
            log::info!("Loading config from: {}", path.display());
            RuntimeConfig::load_sync(&path)
        }
        None => Ok(RuntimeConfig::default()),
    }
}

fn run_windowed(config: RuntimeConfig) -> Result<(), Error> {
    let gpu = GpuContext::new_blocking()?;
    let renderer = GpuRenderer::new(&gpu, config.window.width, config.window.height);
    let draw_commands = IndirectDrawBuffer::new(&gpu.device, gpu.queue.clone(), MAX_DRAW_COMMANDS)?;

    let mut engine = Engine::start(config, WinitBackend::new, Box::new(renderer), None, draw_commands)?;
    stream_demo_trunks(&engine);
    engine.run()
}

fn run_headless(config: RuntimeConfig, ticks: u64) -> Result<(), Error> {
    let (backend, _events) = HeadlessBackend::new();
    let interval = config.tick_interval();

    let mut engine = Engine::start(
        config,
        move || Ok(backend),
        Box::new(NullRenderer::new()),
        None,
        CpuDrawCommands::new(),
    )?;
    stream_demo_trunks(&engine);

    for _ in 0..ticks {
        if !engine.tick()? {
            break;
        }
        thread::sleep(interval);
    }
    log::info!(
        "Headless run finished: {} frames, {} draw commands published",
        engine.render().stats().frames(),
        engine.streaming().generator().command_count()
    );
    engine.shutdown();
    Ok(())
}

/// Register a small grid of unit-cube trunks and ask for all of them
fn stream_demo_trunks<G: DrawCommandGenerator>(engine: &Engine<G>) {
    for i in 0..4u32 {
        let id = format!("demo_{}", i);
        engine
            .scene()
            .register_trunk(TrunkTable::new(id.clone(), vec![MeshEntry::new(i * 24, 24, i * 36, 36)]));
        engine
            .streaming()
            .request_load_with(id.clone(), move || log::info!("Trunk '{}' is drawable", id));
    }
}

/// Parse --config argument from command line
fn parse_config_arg(args: &[String]) -> Option<PathBuf> {
    for i in 0..args.len() {
        if args[i] == "--config" || args[i] == "-c" {
            if let Some(path) = args.get(i + 1) {
                return Some(PathBuf::from(path));
            }
        }
    }
    None
}

/// Parse --ticks argument from command line (headless run length)
fn parse_ticks_arg(args: &[String]) -> Option<u64> {
    for i in 0..args.len() {
        if args[i] == "--ticks" || args[i] == "-t" {
            if let Some(ticks) = args.get(i + 1) {
                return ticks.parse().ok();
            }
        }
    }
    None
}
