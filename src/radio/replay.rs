//! # Capture Replay
//!
//! Plays back a capture file as if the frames were arriving over the air.
//!
//! Capture format, one frame per line:
//!
//! ```text
//! <10 hex bytes, over-the-air order> <unix time, seconds> [rssi]
//! 05 a0 02 26 00 00 c3 87 ff ff 1700000000.250 142
//! ```
//!
//! Blank lines, `#` comments and `Searching ...` status lines are skipped, and
//! leading `.` characters are stripped, so a raw console log can be replayed
//! as well.

use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use super::receiver::{RawFrame, Receiver};
use crate::davis::protocol::ISS_PACKET_LENGTH;
use crate::error::{IssBridgeError, Result};

/// One frame read from a capture file
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    /// Bytes in over-the-air (LSB first) order
    pub bytes: [u8; ISS_PACKET_LENGTH],
    /// Reception time, unix seconds
    pub timestamp: f64,
    pub rssi: u8,
}

/// Parse one capture line
///
/// Returns `Ok(None)` for lines that carry no frame.
pub fn parse_capture_line(line_no: usize, line: &str) -> Result<Option<CapturedFrame>> {
    let line = line.trim_start_matches('.').trim();
    if line.is_empty() || line.starts_with('#') || line.starts_with("Search") {
        return Ok(None);
    }

    let capture_err = |reason: String| IssBridgeError::Capture { line: line_no, reason };
    let fields: Vec<&str> = line.split_whitespace().collect();

    if fields.len() < ISS_PACKET_LENGTH + 1 {
        return Err(capture_err(format!(
            "expected {} hex bytes and a timestamp, got {} fields",
            ISS_PACKET_LENGTH,
            fields.len()
        )));
    }

    let mut bytes = [0u8; ISS_PACKET_LENGTH];
    for (slot, field) in bytes.iter_mut().zip(&fields[..ISS_PACKET_LENGTH]) {
        *slot = u8::from_str_radix(field, 16).map_err(|e| capture_err(format!("bad byte '{}': {}", field, e)))?;
    }

    let timestamp = fields[ISS_PACKET_LENGTH]
        .parse::<f64>()
        .map_err(|e| capture_err(format!("bad timestamp '{}': {}", fields[ISS_PACKET_LENGTH], e)))?;

    let rssi = match fields.get(ISS_PACKET_LENGTH + 1) {
        Some(field) => field.parse::<u8>().map_err(|e| capture_err(format!("bad rssi '{}': {}", field, e)))?,
        None => 0,
    };

    Ok(Some(CapturedFrame { bytes, timestamp, rssi }))
}

/// Parse a whole capture file body
pub fn parse_capture(contents: &str) -> Result<Vec<CapturedFrame>> {
    let mut frames = Vec::new();
    for (idx, line) in contents.lines().enumerate() {
        if let Some(frame) = parse_capture_line(idx + 1, line)? {
            frames.push(frame);
        }
    }
    Ok(frames)
}

/// Receiver that releases captured frames on their original schedule
///
/// The first frame is due as soon as playback starts; later frames follow at
/// their recorded offsets divided by `speed`. Like a real radio, the receiver
/// goes idle after handing over a frame until it is re-enabled.
#[derive(Debug)]
pub struct ReplayReceiver {
    frames: Vec<CapturedFrame>,
    next: usize,
    speed: f64,
    started: Option<Instant>,
    receiving: bool,
    frequency_hz: u32,
    last_rssi: u8,
}

impl ReplayReceiver {
    /// Replay frames at `speed` times real time
    pub fn new(frames: Vec<CapturedFrame>, speed: f64) -> Self {
        Self {
            frames,
            next: 0,
            speed: if speed > 0.0 { speed } else { 1.0 },
            started: None,
            receiving: false,
            frequency_hz: 0,
            last_rssi: 0,
        }
    }

    /// Load a capture file
    pub fn open<P: AsRef<Path>>(path: P, speed: f64) -> Result<Self> {
        let contents = fs::read_to_string(&path)?;
        let frames = parse_capture(&contents)?;
        info!("Loaded {} frames from {}", frames.len(), path.as_ref().display());
        Ok(Self::new(frames, speed))
    }

    /// Frames not yet delivered
    pub fn remaining(&self) -> usize {
        self.frames.len() - self.next
    }

    pub fn is_finished(&self) -> bool {
        self.remaining() == 0
    }

    /// Frequency the receiver is currently tuned to
    pub fn frequency(&self) -> u32 {
        self.frequency_hz
    }

    fn due_offset(&self, frame: &CapturedFrame) -> Duration {
        let first = self.frames.first().map_or(frame.timestamp, |f| f.timestamp);
        let offset = ((frame.timestamp - first) / self.speed).max(0.0);
        Duration::try_from_secs_f64(offset).unwrap_or(Duration::MAX)
    }
}

impl Receiver for ReplayReceiver {
    fn set_frequency(&mut self, frequency_hz: u32) {
        self.frequency_hz = frequency_hz;
    }

    fn last_rssi(&self) -> u8 {
        self.last_rssi
    }

    fn start_receiving(&mut self) {
        self.receiving = true;
        self.started.get_or_insert_with(Instant::now);
    }

    fn receive_frame(&mut self) -> Option<RawFrame> {
        if !self.receiving {
            return None;
        }

        let started = self.started?;
        let frame = self.frames.get(self.next)?;
        if started.elapsed() < self.due_offset(frame) {
            return None;
        }

        debug!("Replaying frame {} at {} Hz", self.next, self.frequency_hz);
        let raw = RawFrame::new(&frame.bytes);
        self.last_rssi = frame.rssi;
        self.next += 1;
        self.receiving = false;
        Some(raw)
    }
}
