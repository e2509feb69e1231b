//! # ISS Packet Decoder
//!
//! Validates bit-corrected ISS packets and folds their fields into the
//! [`TelemetrySnapshot`].

use super::crc::crc16_ccitt;
use super::protocol::*;
use crate::error::{IssBridgeError, Result};
use crate::telemetry::state::{Field, TelemetrySnapshot};
use tracing::{debug, warn};

/// Result of decoding one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// CRC matched; generic fields and the subtype field were updated
    Decoded(PacketKind),
    /// CRC mismatch; only the bad-CRC counter was touched
    BadCrc,
}

/// Check the CRC of a bit-corrected packet
///
/// The transmitter appends the CRC of bytes 0-5 as bytes 6-7, so running the
/// CRC over the first 8 bytes of a good packet gives zero.
pub fn crc_is_valid(packet: &IssPacket) -> bool {
    crc16_ccitt(&packet[..ISS_CRC_CHECK_LENGTH]) == 0
}

/// Decode a bit-corrected ISS packet into the snapshot
///
/// # Arguments
///
/// * `frame` - Packet bytes after bit-order correction (must be 10 bytes)
/// * `rssi` - Receiver signal strength reading for this packet
/// * `snapshot` - Telemetry state to update
///
/// # Returns
///
/// * `Result<DecodeOutcome>` - `Decoded` with the packet subtype, or `BadCrc`
///
/// # Errors
///
/// Returns `LengthMismatch` if the frame is not exactly 10 bytes. The
/// snapshot is left untouched in that case.
pub fn decode(frame: &[u8], rssi: u8, snapshot: &mut TelemetrySnapshot) -> Result<DecodeOutcome> {
    let packet: &IssPacket = frame.try_into().map_err(|_| IssBridgeError::LengthMismatch {
        expected: ISS_PACKET_LENGTH,
        actual: frame.len(),
    })?;

    if !crc_is_valid(packet) {
        warn!("Bad CRC on packet {:02X?}", packet);
        snapshot.record_bad_crc();
        return Ok(DecodeOutcome::BadCrc);
    }

    snapshot.record_received(packet, rssi);

    snapshot.transmitter_id = packet[0] & ISS_TRANSMITTER_ID_MASK;
    snapshot.valid.insert(Field::Transmitter);

    snapshot.wind_speed_mph = packet[1];
    snapshot.valid.insert(Field::WindSpeed);

    // Direction code 0 means the vane reported nothing
    if let Some(degrees) = wind_direction_degrees(packet[2]) {
        snapshot.wind_direction_degrees = degrees;
        snapshot.valid.insert(Field::WindDirection);
    }

    let kind = PacketKind::from_header(packet[0]);
    let (b3, b4) = (packet[3], packet[4]);

    match kind {
        PacketKind::Temperature => {
            snapshot.temperature_f = temperature_f(b3, b4);
            snapshot.valid.insert(Field::Temperature);
        }
        PacketKind::Light => {
            snapshot.light = decode_12bit(b3, b4);
            snapshot.valid.insert(Field::Light);
        }
        PacketKind::Humidity => {
            snapshot.humidity_pct = humidity_pct(b3, b4);
            snapshot.valid.insert(Field::Humidity);
        }
        PacketKind::RainSpoons => {
            snapshot.rain_spoons = b3 & ISS_RAIN_SPOONS_MASK;
            snapshot.valid.insert(Field::RainSpoons);
        }
        PacketKind::UvIndex => {
            snapshot.uv_index = uv_index(b3, b4);
            snapshot.valid.insert(Field::UvIndex);
        }
        PacketKind::Solar => {
            snapshot.solar_wm2 = solar_wm2(b3, b4);
            snapshot.valid.insert(Field::Solar);
        }
        PacketKind::Unknown(_) => {}
    }

    debug!(
        "Decoded {:?} packet from transmitter {} (rssi {})",
        kind, snapshot.transmitter_id, rssi
    );

    Ok(DecodeOutcome::Decoded(kind))
}

/// Bit-correct an over-the-air packet in place and decode it
///
/// Convenience entry for callers holding the frame exactly as the receiver
/// delivered it.
pub fn decode_air_frame(frame: &mut [u8], rssi: u8, snapshot: &mut TelemetrySnapshot) -> Result<DecodeOutcome> {
    if frame.len() != ISS_PACKET_LENGTH {
        return Err(IssBridgeError::LengthMismatch {
            expected: ISS_PACKET_LENGTH,
            actual: frame.len(),
        });
    }

    swap_packet_bit_order(frame);
    decode(frame, rssi, snapshot)
}

/// Scale a wind direction code (1-255) to degrees, rounding half up
///
/// Returns `None` for code 0.
pub fn wind_direction_degrees(code: u8) -> Option<u16> {
    if code == 0 {
        return None;
    }
    Some((0.5 + code as f64 * 360.0 / 255.0) as u16)
}

/// 12-bit value packed as byte3 (high 8 bits) and the high nibble of byte4
pub fn decode_12bit(b3: u8, b4: u8) -> u16 {
    ((b3 as u16) << 4) | ((b4 as u16) >> 4)
}

/// Temperature in degrees Fahrenheit from a signed 16-bit reading
pub fn temperature_f(b3: u8, b4: u8) -> f32 {
    let s = i16::from_be_bytes([b3, b4]);
    (0.5 + s as f64 / 160.0) as f32
}

/// Relative humidity in percent: byte3 is the low 8 bits, byte4's high nibble the top 4
pub fn humidity_pct(b3: u8, b4: u8) -> f32 {
    let v = (b3 as u16) | (((b4 >> 4) as u16) << 8);
    (v as f64 * 0.1) as f32
}

/// UV index from the 12-bit reading
pub fn uv_index(b3: u8, b4: u8) -> f32 {
    let v = decode_12bit(b3, b4) as f64;
    ((v - 4.0) / 200.0) as f32
}

/// Solar radiation in W/m² from the 12-bit reading
pub fn solar_wm2(b3: u8, b4: u8) -> f32 {
    let v = decode_12bit(b3, b4) as f64;
    ((v - 4.0) / 2.27) as f32
}
