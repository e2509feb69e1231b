//! # ISS Protocol Constants and Types
//!
//! Core protocol definitions for Davis ISS packets.
//!
//! Packet layout after bit-order correction:
//!
//! ```text
//! Byte 0: subtype (high nibble) | flags | transmitter id (low 3 bits)
//! Byte 1: wind speed (mph)
//! Byte 2: wind direction (0 = no data, 1-255 scaled to 0-360 degrees)
//! Byte 3-4: subtype-specific value
//! Byte 5: subtype-specific extra bits
//! Byte 6-7: CRC-16/CCITT over bytes 0-5, big-endian
//! Byte 8-9: repeater / padding
//! ```

/// ISS packet length in bytes
pub const ISS_PACKET_LENGTH: usize = 10;

/// Number of leading bytes covered by the CRC check (6 data bytes + 2 CRC bytes)
pub const ISS_CRC_CHECK_LENGTH: usize = 8;

/// Number of data bytes protected by the CRC
pub const ISS_DATA_LENGTH: usize = 6;

/// Mask selecting the transmitter id from byte 0
pub const ISS_TRANSMITTER_ID_MASK: u8 = 0x07;

/// Mask selecting the packet subtype from byte 0
pub const ISS_SUBTYPE_MASK: u8 = 0xF0;

/// Mask selecting the rain spoon counter from byte 3 (7 bits)
pub const ISS_RAIN_SPOONS_MASK: u8 = 0x7F;

/// Version tag carried in every telemetry report
pub const ISS_DATA_VERSION: &str = "1.0";

/// A bit-corrected ISS packet
pub type IssPacket = [u8; ISS_PACKET_LENGTH];

/// Packet subtype, selected by the high nibble of byte 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// 0x40: UV index
    UvIndex,
    /// 0x60: solar radiation
    Solar,
    /// 0x70: light level
    Light,
    /// 0x80: outside temperature
    Temperature,
    /// 0xA0: relative humidity
    Humidity,
    /// 0xE0: rain bucket tips
    RainSpoons,
    /// Any other nibble (supercap voltage, gusts, ...) carries nothing we decode
    Unknown(u8),
}

impl PacketKind {
    /// Classify a packet from its first (bit-corrected) byte
    pub fn from_header(byte0: u8) -> Self {
        match byte0 & ISS_SUBTYPE_MASK {
            0x40 => PacketKind::UvIndex,
            0x60 => PacketKind::Solar,
            0x70 => PacketKind::Light,
            0x80 => PacketKind::Temperature,
            0xA0 => PacketKind::Humidity,
            0xE0 => PacketKind::RainSpoons,
            other => PacketKind::Unknown(other),
        }
    }

    /// Subtype nibble as it appears in byte 0
    pub fn header_nibble(self) -> u8 {
        match self {
            PacketKind::UvIndex => 0x40,
            PacketKind::Solar => 0x60,
            PacketKind::Light => 0x70,
            PacketKind::Temperature => 0x80,
            PacketKind::Humidity => 0xA0,
            PacketKind::RainSpoons => 0xE0,
            PacketKind::Unknown(nibble) => nibble & ISS_SUBTYPE_MASK,
        }
    }
}

/// Reverse the bit order of a single byte (MSB <-> LSB)
///
/// The ISS sends every byte least-significant bit first, so each received
/// byte has to be mirrored before any other processing.
///
/// # Examples
///
/// ```
/// use iss_bridge::davis::protocol::swap_bit_order;
///
/// assert_eq!(swap_bit_order(0b0000_0001), 0b1000_0000);
/// assert_eq!(swap_bit_order(0x05), 0xA0);
/// ```
pub const fn swap_bit_order(b: u8) -> u8 {
    let b = ((b & 0b1111_0000) >> 4) | ((b & 0b0000_1111) << 4);
    let b = ((b & 0b1100_1100) >> 2) | ((b & 0b0011_0011) << 2);
    ((b & 0b1010_1010) >> 1) | ((b & 0b0101_0101) << 1)
}

/// Reverse the bit order of every byte in a buffer, in place
pub fn swap_packet_bit_order(buf: &mut [u8]) {
    for byte in buf.iter_mut() {
        *byte = swap_bit_order(*byte);
    }
}
