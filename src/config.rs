//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::{IssBridgeError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub receiver: ReceiverConfig,

    #[serde(default)]
    pub hopping: HoppingConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Serial port the JSON reports are written to
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_enabled")]
    pub enabled: bool,

    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Frame source configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverConfig {
    /// Capture file to replay as the receiver
    #[serde(default)]
    pub replay_path: String,

    /// Playback speed relative to the recorded timestamps
    #[serde(default = "default_replay_speed")]
    pub replay_speed: f64,

    /// Append every received frame to this capture file (empty = off)
    #[serde(default)]
    pub capture_path: String,

    /// How often the acquisition loop polls its collaborators
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Hop sequence layout
#[derive(Debug, Deserialize, Clone)]
pub struct HoppingConfig {
    #[serde(default = "default_base_frequency_hz")]
    pub base_frequency_hz: u32,

    #[serde(default = "default_channel_spacing_hz")]
    pub channel_spacing_hz: u32,

    #[serde(default = "default_num_channels")]
    pub num_channels: usize,

    /// Explicit channel frequencies in hop order; overrides the linear layout
    #[serde(default)]
    pub channels: Vec<u32>,
}

/// Link synchronizer tuning
///
/// These are protocol-tuning constants; the defaults match the ISS hop
/// cadence and should only be changed for experiments.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Seconds per channel while searching: hop back once the counter exceeds this
    #[serde(default = "default_search_hop_threshold_s")]
    pub search_hop_threshold_s: u32,

    /// Seconds per channel while synced
    #[serde(default = "default_synced_hop_interval_s")]
    pub synced_hop_interval_s: u32,

    /// Silence after which the link counts as lost
    #[serde(default = "default_sync_timeout_s")]
    pub sync_timeout_s: u32,

    /// Timer ticks in one housekeeping second
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u16,
}

/// Report output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    /// Print reports and status lines on stdout
    #[serde(default = "default_stdout")]
    pub stdout: bool,

    /// Append reports to a rotating JSONL log
    #[serde(default)]
    pub log_enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_serial_enabled() -> bool { true }
fn default_serial_port() -> String { "/dev/ttyAMA0".to_string() }
fn default_baud_rate() -> u32 { 57600 }

fn default_replay_speed() -> f64 { 1.0 }
fn default_poll_interval_ms() -> u64 { 10 }

fn default_base_frequency_hz() -> u32 { 902_355_835 }
fn default_channel_spacing_hz() -> u32 { 512_000 }
fn default_num_channels() -> usize { 51 }

fn default_search_hop_threshold_s() -> u32 { 51 }
fn default_synced_hop_interval_s() -> u32 { 3 }
fn default_sync_timeout_s() -> u32 { 10 }
fn default_ticks_per_second() -> u16 { 100 }

fn default_stdout() -> bool { true }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_log_prefix() -> String { "iss.jsonl".to_string() }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            enabled: default_serial_enabled(),
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            replay_path: String::new(),
            replay_speed: default_replay_speed(),
            capture_path: String::new(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for HoppingConfig {
    fn default() -> Self {
        Self {
            base_frequency_hz: default_base_frequency_hz(),
            channel_spacing_hz: default_channel_spacing_hz(),
            num_channels: default_num_channels(),
            channels: Vec::new(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            search_hop_threshold_s: default_search_hop_threshold_s(),
            synced_hop_interval_s: default_synced_hop_interval_s(),
            sync_timeout_s: default_sync_timeout_s(),
            ticks_per_second: default_ticks_per_second(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            stdout: default_stdout(),
            log_enabled: false,
            log_dir: default_log_dir(),
            log_prefix: default_log_prefix(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

fn invalid(msg: impl std::fmt::Display) -> IssBridgeError {
    IssBridgeError::Config(toml::de::Error::custom(msg))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use iss_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Serial report port
        if self.serial.enabled && self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty when enabled"));
        }

        if ![9600, 19200, 38400, 57600, 115200].contains(&self.serial.baud_rate) {
            return Err(invalid("baud_rate must be one of: 9600, 19200, 38400, 57600, 115200"));
        }

        // Receiver
        if !(self.receiver.replay_speed > 0.0 && self.receiver.replay_speed <= 100.0) {
            return Err(invalid("replay_speed must be greater than 0.0 and at most 100.0"));
        }

        if self.receiver.poll_interval_ms == 0 || self.receiver.poll_interval_ms > 1000 {
            return Err(invalid("poll_interval_ms must be between 1 and 1000"));
        }

        // Hop sequence
        if self.hopping.channels.is_empty() {
            if self.hopping.num_channels == 0 || self.hopping.num_channels > 255 {
                return Err(invalid("num_channels must be between 1 and 255"));
            }

            let span = (self.hopping.num_channels as u64 - 1) * self.hopping.channel_spacing_hz as u64;
            if self.hopping.base_frequency_hz as u64 + span > u32::MAX as u64 {
                return Err(invalid("hop channels exceed the u32 frequency range"));
            }
        } else if self.hopping.channels.len() > 255 {
            return Err(invalid("channels may list at most 255 frequencies"));
        }

        if self.hopping.channels.contains(&0) {
            return Err(invalid("channel frequencies must be greater than 0"));
        }

        // Synchronizer
        for (name, value) in [
            ("search_hop_threshold_s", self.sync.search_hop_threshold_s),
            ("synced_hop_interval_s", self.sync.synced_hop_interval_s),
            ("sync_timeout_s", self.sync.sync_timeout_s),
        ] {
            if value == 0 {
                return Err(invalid(format!("{} must be greater than 0", name)));
            }
        }

        if self.sync.ticks_per_second == 0 {
            return Err(invalid("ticks_per_second must be greater than 0"));
        }

        // Telemetry log
        if self.telemetry.log_enabled {
            if self.telemetry.log_dir.is_empty() {
                return Err(invalid("telemetry log_dir cannot be empty when log is enabled"));
            }
            if self.telemetry.log_prefix.is_empty() {
                return Err(invalid("telemetry log_prefix cannot be empty when log is enabled"));
            }
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        Ok(())
    }
}
