mod cli;
mod config;
mod config_file;
mod driver;
mod engine;
mod error;
mod frame;
mod hidraw;
mod keycodes;
mod layer;
mod motion;
mod report;
mod session;
mod state;
mod virtual_pad;

use clap::Parser;
use cli::Args;
use driver::{pump_once, Stats};
use engine::RemapEngine;
use error::{Error, Result};
use frame::OutputSink;
use hidraw::{find_hidraw_device, Hidraw, Readiness, PRODUCT_ID, VENDOR_ID};
use session::DeviceSession;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use virtual_pad::VirtualPad;

static QUIT: AtomicBool = AtomicBool::new(false);

const POLL_TIMEOUT: Duration = Duration::from_millis(100);
const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const RUMBLE_STRENGTH: u8 = 0x80;

fn main() {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();

    let config = match config_file::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    println!("vader5d - Flydigi Vader 5 Pro driver");
    println!("  Config:  {}", args.config.display());
    println!("  Layers:  {}", config.layers.len());
    println!("  Remaps:  {}", config.remap.len());
    println!();

    for (button, target) in &config.remap {
        log::debug!("remap {} -> {:?}", config.button_name(*button), target);
    }
    for (name, layer) in &config.layers {
        log::debug!(
            "layer {} on {} ({:?})",
            name,
            config.button_name(layer.trigger),
            layer.activation
        );
    }

    signal_setup();

    let mut pad = match VirtualPad::new(config.emulate_elite) {
        Ok(p) => p,
        Err(e) => {
            log::error!("Failed to create virtual devices: {}", e);
            log::error!("Do you have /dev/uinput access? Try: sudo modprobe uinput");
            std::process::exit(1);
        }
    };
    let mut engine = RemapEngine::new(config);

    log::info!(
        "Waiting for Vader 5 Pro ({:04x}:{:04x})...",
        VENDOR_ID,
        PRODUCT_ID
    );

    while !QUIT.load(Ordering::Relaxed) {
        match run_connected(&args, &mut engine, &mut pad) {
            Ok(()) => break,
            Err(Error::NotFound { .. }) => {}
            Err(Error::DeviceGone(e)) => log::info!("Device disconnected ({})", e),
            Err(e) => log::warn!("{}", e),
        }
        centre(&mut engine, &mut pad);
        wait_for_retry();
    }

    centre(&mut engine, &mut pad);
    log::info!("Shutting down");
}

/// Let go of every key and centre the pad.
fn centre(engine: &mut RemapEngine, pad: &mut VirtualPad) {
    let frame = engine.release_all();
    if frame.is_idle() {
        return;
    }
    if let Err(e) = pad.emit(&frame) {
        log::warn!("Failed to reset virtual devices: {}", e);
    }
}

fn wait_for_retry() {
    let until = Instant::now() + RECONNECT_DELAY;
    while !QUIT.load(Ordering::Relaxed) && Instant::now() < until {
        std::thread::sleep(POLL_TIMEOUT);
    }
}

fn open_device(args: &Args) -> Result<DeviceSession<Hidraw>> {
    let path = match &args.device {
        Some(path) => path.clone(),
        None => find_hidraw_device(VENDOR_ID, PRODUCT_ID, args.interface)?,
    };
    let hidraw = Hidraw::open(&path).map_err(Error::from_device_io)?;
    DeviceSession::open(hidraw)
}

/// Serve one connection until it drops (`Err`) or a shutdown is requested (`Ok`).
fn run_connected(args: &Args, engine: &mut RemapEngine, pad: &mut VirtualPad) -> Result<()> {
    let mut session = open_device(args)?;
    log::info!(
        "Device connected at {}, running...",
        session.handle().path().display()
    );

    let mut rumble_until = args.rumble_on_connect.and_then(|ms| {
        session
            .send_rumble(RUMBLE_STRENGTH, RUMBLE_STRENGTH)
            .then(|| Instant::now() + Duration::from_millis(ms))
    });
    let mut stats = args.debug.then(|| Stats::new(Instant::now()));
    let mut last_layer: Option<String> = None;

    while !QUIT.load(Ordering::Relaxed) {
        if let Readiness::Readable = session.handle().wait_readable(POLL_TIMEOUT)? {
            while let Some(frame) = pump_once(&mut session, engine, pad, Instant::now())? {
                if let Some(stats) = stats.as_mut() {
                    stats.record(&frame);
                }
            }
        }

        let layer = engine.active_layer();
        if layer != last_layer.as_deref() {
            log::debug!(
                "layer {}: gyro {:?}, sticks {:?}/{:?}, dpad {:?}",
                layer.unwrap_or("-"),
                engine.effective_gyro().mode,
                engine.effective_left_stick().mode,
                engine.effective_right_stick().mode,
                engine.effective_dpad(),
            );
            last_layer = layer.map(str::to_string);
        }

        let now = Instant::now();
        if rumble_until.is_some_and(|deadline| now >= deadline) {
            session.send_rumble(0, 0);
            rumble_until = None;
        }
        if let Some(line) = stats
            .as_mut()
            .and_then(|s| s.take_summary(now, engine.active_layer()))
        {
            log::info!("[dbg] {}", line);
        }
    }

    if rumble_until.is_some() {
        session.send_rumble(0, 0);
    }
    Ok(())
}

fn signal_setup() {
    unsafe {
        libc::signal(libc::SIGINT, signal_handler as libc::sighandler_t);
        libc::signal(libc::SIGTERM, signal_handler as libc::sighandler_t);
    }
}

extern "C" fn signal_handler(_sig: libc::c_int) {
    QUIT.store(true, Ordering::Relaxed);
}
