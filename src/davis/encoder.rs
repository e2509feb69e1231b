//! # ISS Packet Encoder
//!
//! Builds valid ISS packets, the way a transmitter would put them on air.

use super::crc::crc16_ccitt;
use super::protocol::*;

/// Padding written into the repeater bytes (8-9) of a direct transmission
pub const ISS_PADDING_BYTE: u8 = 0xFF;

/// Encode six data bytes into a complete bit-corrected ISS packet
///
/// # Arguments
///
/// * `data` - Bytes 0-5 (header, wind speed, wind direction, subtype value)
///
/// # Returns
///
/// * `IssPacket` - 10-byte packet: data + big-endian CRC + padding
///
/// # Examples
///
/// ```
/// use iss_bridge::davis::encoder::encode_packet;
/// use iss_bridge::davis::decoder::crc_is_valid;
///
/// let packet = encode_packet([0xA0, 0x00, 0x00, 0x64, 0x00, 0x00]);
/// assert!(crc_is_valid(&packet));
/// ```
pub fn encode_packet(data: [u8; ISS_DATA_LENGTH]) -> IssPacket {
    let mut packet = [ISS_PADDING_BYTE; ISS_PACKET_LENGTH];
    packet[..ISS_DATA_LENGTH].copy_from_slice(&data);

    let crc = crc16_ccitt(&data);
    packet[ISS_DATA_LENGTH..ISS_CRC_CHECK_LENGTH].copy_from_slice(&crc.to_be_bytes());

    packet
}

/// Convert a bit-corrected packet into over-the-air (LSB first) byte order
pub fn to_air_order(packet: &IssPacket) -> IssPacket {
    let mut air = *packet;
    swap_packet_bit_order(&mut air);
    air
}

/// Encode a humidity packet with a raw reading in tenths of a percent (12 bits)
pub fn encode_humidity(transmitter_id: u8, wind_speed_mph: u8, wind_code: u8, tenths: u16) -> IssPacket {
    let header = PacketKind::Humidity.header_nibble() | (transmitter_id & ISS_TRANSMITTER_ID_MASK);
    let b3 = (tenths & 0xFF) as u8;
    let b4 = (((tenths >> 8) & 0x0F) as u8) << 4;
    encode_packet([header, wind_speed_mph, wind_code, b3, b4, 0x00])
}

/// Encode a temperature packet from a raw signed reading (160ths of a degree F)
pub fn encode_temperature(transmitter_id: u8, wind_speed_mph: u8, wind_code: u8, raw: i16) -> IssPacket {
    let header = PacketKind::Temperature.header_nibble() | (transmitter_id & ISS_TRANSMITTER_ID_MASK);
    let [b3, b4] = raw.to_be_bytes();
    encode_packet([header, wind_speed_mph, wind_code, b3, b4, 0x00])
}
