use clap::Parser;
use std::path::PathBuf;

/// Userspace driver for the Flydigi Vader 5 Pro.
/// Puts the controller in extended-report mode and exposes it as a virtual
/// gamepad plus a mouse/keyboard for remaps, gyro and layers.
#[derive(Parser, Debug)]
#[command(name = "vader5d")]
pub struct Args {
    /// TOML remap configuration (missing file = defaults)
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Specific hidraw node (e.g. /dev/hidraw3) instead of sysfs lookup
    #[arg(short, long)]
    pub device: Option<PathBuf>,

    /// USB interface carrying the vendor reports
    #[arg(long, default_value_t = 1)]
    pub interface: u8,

    /// Short rumble pulse after connecting, in milliseconds
    #[arg(long, value_name = "MS")]
    pub rumble_on_connect: Option<u64>,

    /// Log a once-per-second summary of reports and output
    #[arg(long, default_value_t = false)]
    pub debug: bool,
}
