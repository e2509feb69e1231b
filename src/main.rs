//! # ISS Bridge
//!
//! Follow a Davis ISS weather transmitter and report its telemetry as JSON.
//!
//! The binary replays a frame capture through the acquisition loop and writes
//! one JSON line per good packet to stdout, the report serial port and an
//! optional rotating log.

use anyhow::{bail, Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use iss_bridge::acquisition::AcquisitionLoop;
use iss_bridge::config::Config;
use iss_bridge::radio::capture::{CaptureWriter, CapturingReceiver};
use iss_bridge::radio::hopping::HopTable;
use iss_bridge::radio::receiver::Receiver;
use iss_bridge::radio::replay::ReplayReceiver;
use iss_bridge::radio::timer::MonotonicTimer;
use iss_bridge::serial::SerialReportPort;
use iss_bridge::telemetry::logger::JsonlLogger;
use iss_bridge::telemetry::sink::{FanoutSink, LineSink};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for ISS Bridge
///
/// # Control Flow
///
/// 1. Set up logging and load the configuration
/// 2. Build the frame source, hop table and report sinks
/// 3. Poll the acquisition loop until Ctrl+C
///
/// # Errors
///
/// Returns error if the configuration is invalid or the frame source,
/// hop table or report log cannot be set up. A missing serial port only
/// disables that sink.
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml
/// ```
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("ISS Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let path = config_path(std::env::args());
    let config = Config::load(&path).with_context(|| format!("Failed to load configuration from {}", path))?;
    info!("Configuration loaded from {}", path);

    let receiver = build_receiver(&config)?;
    let hops = HopTable::from_config(&config.hopping).context("Invalid hop table")?;
    info!("Hop table has {} channels", hops.len());

    let mut sink = build_sinks(&config)?;
    if sink.is_empty() {
        warn!("No report sinks enabled, reports will be discarded");
    }

    let mut acquisition = AcquisitionLoop::new(receiver, hops, MonotonicTimer::new(), (), config.sync);
    let poll_interval = Duration::from_millis(config.receiver.poll_interval_ms);

    info!("Press Ctrl+C to exit");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
        }
        info!("Received Ctrl+C, shutting down...");
    };

    let reports = acquisition.run_until(&mut sink, poll_interval, shutdown).await;

    let snapshot = acquisition.snapshot();
    info!(
        "Sent {} reports (received {}, lost {}, bad CRC {})",
        reports, snapshot.recv_packets, snapshot.lost_packets, snapshot.bad_crc
    );

    Ok(())
}

/// First command line argument, or the default configuration path
fn config_path<I: IntoIterator<Item = String>>(args: I) -> String {
    args.into_iter()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// Replay receiver, optionally teeing frames into a capture file
fn build_receiver(config: &Config) -> Result<Box<dyn Receiver>> {
    let settings = &config.receiver;
    if settings.replay_path.is_empty() {
        bail!("receiver.replay_path must name a frame capture to replay");
    }

    let replay = ReplayReceiver::open(&settings.replay_path, settings.replay_speed)
        .with_context(|| format!("Failed to open capture {}", settings.replay_path))?;
    info!(
        "Replaying {} frames from {} at {}x",
        replay.remaining(),
        settings.replay_path,
        settings.replay_speed
    );

    if settings.capture_path.is_empty() {
        return Ok(Box::new(replay));
    }

    let capture = CaptureWriter::open(&settings.capture_path)
        .with_context(|| format!("Failed to open capture output {}", settings.capture_path))?;
    info!("Recording frames to {}", settings.capture_path);

    Ok(Box::new(CapturingReceiver::new(replay, capture)))
}

fn build_sinks(config: &Config) -> Result<FanoutSink> {
    let mut sinks = FanoutSink::new();

    if config.telemetry.stdout {
        sinks.push(Box::new(LineSink::stdout()));
    }

    if config.serial.enabled {
        match SerialReportPort::from_config(&config.serial) {
            Ok(port) => sinks.push(Box::new(port)),
            Err(e) => warn!("Serial reports disabled: {}", e),
        }
    }

    if config.telemetry.log_enabled {
        let logger = JsonlLogger::from_config(&config.telemetry).context("Failed to open report log")?;
        info!("Logging reports to {}", config.telemetry.log_dir);
        sinks.push(Box::new(logger));
    }

    Ok(sinks)
}
