//! # Serial Report Port
//!
//! Writes telemetry reports to the host serial line.
//!
//! This module handles:
//! - Opening the report port (8N1, 57600 baud by default)
//! - Writing one JSON report per line
//! - Forwarding `Searching` status lines the same way

pub mod port_trait;

use async_trait::async_trait;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::config::SerialConfig;
use crate::error::{IssBridgeError, Result};
use crate::telemetry::sink::ReportSink;
use port_trait::{SerialPortIO, TokioSerialPort};

/// Baud rate the weather station driver expects
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Device paths tried when no port is configured (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyAMA0", // On-board UART
    "/dev/ttyUSB0", // USB-to-serial adapters
];

/// Report writer on a serial line
///
/// Generic over [`SerialPortIO`] so tests can swap in a mock port.
pub struct SerialReportPort<P: SerialPortIO = TokioSerialPort> {
    port: P,
    device_path: String,
    lines_sent: u64,
}

impl<P: SerialPortIO> std::fmt::Debug for SerialReportPort<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialReportPort")
            .field("device_path", &self.device_path)
            .field("lines_sent", &self.lines_sent)
            .finish_non_exhaustive()
    }
}

impl SerialReportPort {
    /// Open the port described by the `[serial]` configuration section
    ///
    /// An empty `port` falls back to the default device paths.
    ///
    /// # Errors
    ///
    /// Returns error if no device could be opened
    pub fn from_config(config: &SerialConfig) -> Result<Self> {
        if config.port.is_empty() {
            Self::open_with_paths(DEFAULT_DEVICE_PATHS, config.baud_rate)
        } else {
            Self::open_with_paths(&[config.port.as_str()], config.baud_rate)
        }
    }

    /// Open the first device in `paths` that accepts the settings
    ///
    /// # Arguments
    ///
    /// * `paths` - Device paths to try (e.g., &["/dev/ttyAMA0"])
    /// * `baud_rate` - Line speed
    ///
    /// # Returns
    ///
    /// * `Result<SerialReportPort>` - Connected port or error
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened report port {} at {} baud", path, baud_rate);
                    return Ok(Self::with_port(TokioSerialPort::new(port), path));
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(IssBridgeError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with 8N1 settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| IssBridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }
}

impl<P: SerialPortIO> SerialReportPort<P> {
    /// Wrap an already opened port
    pub fn with_port(port: P, device_path: &str) -> Self {
        Self {
            port,
            device_path: device_path.to_string(),
            lines_sent: 0,
        }
    }

    /// Write one line followed by `\n` and flush
    ///
    /// # Errors
    ///
    /// Returns `Serial` error if the write or flush fails
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        self.port
            .write_all(&buf)
            .await
            .map_err(|e| IssBridgeError::Serial(format!("Failed to write line: {}", e)))?;

        self.port
            .flush()
            .await
            .map_err(|e| IssBridgeError::Serial(format!("Failed to flush serial port: {}", e)))?;

        self.lines_sent += 1;
        debug!("Sent {} bytes to {}", buf.len(), self.device_path);
        Ok(())
    }

    /// Path of the opened device (e.g. "/dev/ttyAMA0")
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    pub fn lines_sent(&self) -> u64 {
        self.lines_sent
    }
}

#[async_trait]
impl<P: SerialPortIO> ReportSink for SerialReportPort<P> {
    async fn emit_report(&mut self, line: &str) -> Result<()> {
        self.send_line(line).await
    }

    async fn emit_status(&mut self, line: &str) -> Result<()> {
        self.send_line(line).await
    }
}

#[cfg(test)]
mod tests {
    use super::port_trait::mocks::MockSerialPort;
    use super::*;
    use std::io;

    #[test]
    fn test_constants() {
        assert_eq!(DEFAULT_BAUD_RATE, 57_600);
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 2);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyAMA0");
        assert_eq!(DEFAULT_DEVICE_PATHS[1], "/dev/ttyUSB0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = SerialReportPort::open_with_paths(invalid_paths, DEFAULT_BAUD_RATE);

        match result.unwrap_err() {
            IssBridgeError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result = SerialReportPort::open_with_paths(empty_paths, DEFAULT_BAUD_RATE);

        assert!(matches!(result, Err(IssBridgeError::SerialPortNotFound(_))));
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = SerialReportPort::open_port("/dev/nonexistent_serial_device_12345", DEFAULT_BAUD_RATE);

        match result.unwrap_err() {
            IssBridgeError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    #[test]
    fn test_from_config_uses_configured_port() {
        let config = SerialConfig {
            port: "/dev/nonexistent_report_port".to_string(),
            ..SerialConfig::default()
        };

        match SerialReportPort::from_config(&config).unwrap_err() {
            IssBridgeError::SerialPortNotFound(msg) => assert_eq!(msg, "/dev/nonexistent_report_port"),
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_send_line_appends_newline() {
        let mock = MockSerialPort::new();
        let mut port = SerialReportPort::with_port(mock.clone(), "/dev/mock0");

        port.send_line("{ \"version\": \"1.0\" }").await.unwrap();

        assert_eq!(mock.written_text(), "{ \"version\": \"1.0\" }\n");
        assert_eq!(mock.flush_count(), 1);
        assert_eq!(port.lines_sent(), 1);
        assert_eq!(port.device_path(), "/dev/mock0");
    }

    #[tokio::test]
    async fn test_report_sink_forwards_both_kinds() {
        let mock = MockSerialPort::new();
        let mut port = SerialReportPort::with_port(mock.clone(), "/dev/mock0");

        port.emit_status("Searching 3 at 902355835 Hz").await.unwrap();
        port.emit_report("{ \"recv_packets\": 1 }").await.unwrap();

        let written = mock.get_written_data();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0], b"Searching 3 at 902355835 Hz\n".to_vec());
        assert_eq!(written[1], b"{ \"recv_packets\": 1 }\n".to_vec());
    }

    #[tokio::test]
    async fn test_write_error_maps_to_serial_error() {
        let mock = MockSerialPort::new();
        mock.set_write_error(io::ErrorKind::BrokenPipe);
        let mut port = SerialReportPort::with_port(mock, "/dev/mock0");

        match port.send_line("line").await.unwrap_err() {
            IssBridgeError::Serial(msg) => assert!(msg.contains("Failed to write line")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
        assert_eq!(port.lines_sent(), 0);
    }

    #[tokio::test]
    async fn test_flush_error_maps_to_serial_error() {
        let mock = MockSerialPort::new();
        mock.set_flush_error(io::ErrorKind::TimedOut);
        let mut port = SerialReportPort::with_port(mock.clone(), "/dev/mock0");

        match port.send_line("line").await.unwrap_err() {
            IssBridgeError::Serial(msg) => assert!(msg.contains("Failed to flush")),
            other => panic!("Expected Serial error, got: {:?}", other),
        }
        assert_eq!(mock.get_written_data().len(), 1, "Data was written before the flush failed");
    }

    #[test]
    fn test_debug_hides_port() {
        let port = SerialReportPort::with_port(MockSerialPort::new(), "/dev/mock0");
        let text = format!("{:?}", port);
        assert!(text.contains("/dev/mock0"));
    }

    // Only runs with real hardware attached
    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_send_line_with_real_hardware() {
        if let Ok(mut port) = SerialReportPort::open_with_paths(DEFAULT_DEVICE_PATHS, DEFAULT_BAUD_RATE) {
            let result = port.send_line("{ \"version\": \"1.0\" }").await;
            assert!(result.is_ok(), "Failed to send line: {:?}", result);
        } else {
            println!("No serial hardware detected (skipping send test)");
        }
    }
}
