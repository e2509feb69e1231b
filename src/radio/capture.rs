//! # Frame Capture
//!
//! Records received ISS frames in the format read by
//! [`ReplayReceiver`](super::replay::ReplayReceiver).

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::warn;

use super::receiver::{RawFrame, Receiver};
use crate::davis::protocol::ISS_PACKET_LENGTH;
use crate::error::Result;

/// Appends frames to a capture log
pub struct CaptureWriter<W: Write = BufWriter<File>> {
    writer: W,
    frames_written: u64,
}

impl CaptureWriter {
    /// Open (or create) a capture file for appending
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> CaptureWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, frames_written: 0 }
    }

    /// Record a frame received now
    pub fn record(&mut self, frame: &[u8], rssi: u8) -> Result<()> {
        self.record_at(frame, rssi, Utc::now())
    }

    /// Record a frame with an explicit reception time
    pub fn record_at(&mut self, frame: &[u8], rssi: u8, at: DateTime<Utc>) -> Result<()> {
        let hex: Vec<String> = frame.iter().map(|b| format!("{:02x}", b)).collect();
        let seconds = at.timestamp_millis() as f64 / 1000.0;

        writeln!(self.writer, "{} {:.3} {}", hex.join(" "), seconds, rssi)?;
        self.writer.flush()?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Receiver wrapper that tees every ISS-sized frame into a capture log
pub struct CapturingReceiver<R, W: Write = BufWriter<File>> {
    inner: R,
    capture: CaptureWriter<W>,
}

impl<R: Receiver, W: Write> CapturingReceiver<R, W> {
    pub fn new(inner: R, capture: CaptureWriter<W>) -> Self {
        Self { inner, capture }
    }

    pub fn capture(&self) -> &CaptureWriter<W> {
        &self.capture
    }

    pub fn into_parts(self) -> (R, CaptureWriter<W>) {
        (self.inner, self.capture)
    }
}

impl<R: Receiver, W: Write> Receiver for CapturingReceiver<R, W> {
    fn set_frequency(&mut self, frequency_hz: u32) {
        self.inner.set_frequency(frequency_hz);
    }

    fn last_rssi(&self) -> u8 {
        self.inner.last_rssi()
    }

    fn start_receiving(&mut self) {
        self.inner.start_receiving();
    }

    fn receive_frame(&mut self) -> Option<RawFrame> {
        let frame = self.inner.receive_frame()?;

        if frame.len() == ISS_PACKET_LENGTH {
            let rssi = self.inner.last_rssi();
            if let Err(e) = self.capture.record(frame.as_bytes(), rssi) {
                warn!("Failed to capture frame: {}", e);
            }
        }

        Some(frame)
    }
}
