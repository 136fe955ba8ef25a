use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

use clap::Parser;
use rand::Rng;
use speedometer::{parse_value, GaugeConfig, Speedometer, SpeedometerCommand, ViewConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Animated speedometer. Type a value per line on stdin to move the needle,
/// or `sweep` to replay the startup sweep.
#[derive(Parser, Debug)]
#[command(name = "speedometer", version, about)]
struct Args {
    /// Value at which the needle pins to full scale
    #[arg(long, default_value_t = 100_000.0)]
    max_value: f64,

    /// Length of each value transition, in milliseconds
    #[arg(long, default_value_t = 1500)]
    duration_ms: u64,

    /// Skip the calibration sweep at startup
    #[arg(long)]
    no_sweep: bool,

    /// Value to show once the window is up
    #[arg(long)]
    value: Option<f64>,

    /// Feed random values instead of reading stdin
    #[arg(long)]
    random: bool,

    /// Pause between random values, in milliseconds
    #[arg(long, default_value_t = 2500)]
    random_interval_ms: u64,

    /// Font file for the scale labels and readout
    #[arg(long)]
    font: Option<PathBuf>,

    /// Window edge length in logical pixels
    #[arg(long, default_value_t = 360)]
    size: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let gauge = GaugeConfig::builder()
        .max_value(args.max_value)
        .animation_duration(Duration::from_millis(args.duration_ms))
        .build();
    let view = ViewConfig::builder()
        .window_width(args.size)
        .window_height(args.size)
        .maybe_font_path(args.font)
        .build();

    let mut speedometer = Speedometer::new(gauge, view)?;
    speedometer.set_startup_sweep(!args.no_sweep);
    if let Some(value) = args.value {
        speedometer.set_value(value);
    }

    let (sender, receiver) = mpsc::channel();
    if args.random {
        let interval = Duration::from_millis(args.random_interval_ms);
        let ceiling = args.max_value * 1.2;
        thread::spawn(move || feed_random(sender, interval, ceiling));
        info!("feeding random values");
    } else {
        thread::spawn(move || feed_stdin(sender));
        info!("reading values from stdin");
    }

    speedometer.show_with_commands(receiver)
}

fn feed_stdin(sender: Sender<SpeedometerCommand>) {
    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let command = if line.trim().eq_ignore_ascii_case("sweep") {
            SpeedometerCommand::StartupSweep
        } else {
            match parse_value(&line) {
                Ok(value) => SpeedometerCommand::SetValue(value),
                Err(err) => {
                    warn!(%err, "rejected input");
                    continue;
                }
            }
        };
        if sender.send(command).is_err() {
            break;
        }
    }
}

fn feed_random(sender: Sender<SpeedometerCommand>, interval: Duration, ceiling: f64) {
    let mut rng = rand::rng();
    loop {
        thread::sleep(interval);
        let value = rng.random_range(0.0..ceiling);
        if sender.send(SpeedometerCommand::SetValue(value)).is_err() {
            break;
        }
    }
}
