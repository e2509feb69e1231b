//! # Telemetry State
//!
//! Latest decoded ISS values, their validity tags and the link counters.

use crate::davis::protocol::{IssPacket, ISS_PACKET_LENGTH};

/// A telemetry field that can carry a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    RecvPackets,
    LostPackets,
    BadCrc,
    Rssi,
    Transmitter,
    WindSpeed,
    WindDirection,
    Temperature,
    Light,
    RainSpoons,
    Humidity,
    UvIndex,
    Solar,
}

impl Field {
    /// Every field, in declaration order
    pub const ALL: [Field; 13] = [
        Field::RecvPackets,
        Field::LostPackets,
        Field::BadCrc,
        Field::Rssi,
        Field::Transmitter,
        Field::WindSpeed,
        Field::WindDirection,
        Field::Temperature,
        Field::Light,
        Field::RainSpoons,
        Field::Humidity,
        Field::UvIndex,
        Field::Solar,
    ];

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

/// Set of fields that hold a value received since startup
///
/// Tags can only be added; there is no way to clear the set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidFields(u16);

impl ValidFields {
    /// Empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Mark a field as holding data
    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    /// Whether a field holds data
    pub fn contains(&self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Fields currently present, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

/// Authoritative decoded state of the ISS link
///
/// A value is only meaningful when its field is present in [`valid`](Self::valid).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub valid: ValidFields,

    /// Last good packet, after bit-order correction
    pub raw: IssPacket,

    /// Transmitter id (0-7, shown as 1-8 on the console)
    pub transmitter_id: u8,

    /// Receiver RSSI reading for the last good packet
    pub rssi: u8,

    pub recv_packets: u32,
    pub lost_packets: u32,
    pub bad_crc: u32,

    pub wind_speed_mph: u8,
    pub wind_direction_degrees: u16,
    pub temperature_f: f32,
    pub light: u16,
    pub rain_spoons: u8,
    pub humidity_pct: f32,
    pub uv_index: f32,
    pub solar_wm2: f32,
}

impl TelemetrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a packet rejected by the CRC check
    pub fn record_bad_crc(&mut self) {
        self.bad_crc = self.bad_crc.saturating_add(1);
        self.valid.insert(Field::BadCrc);
    }

    /// Count a hop window that passed without reception
    pub fn record_lost_packet(&mut self) {
        self.lost_packets = self.lost_packets.saturating_add(1);
        self.valid.insert(Field::LostPackets);
    }

    /// Count a packet that passed the CRC check and keep its bytes
    pub fn record_received(&mut self, packet: &[u8; ISS_PACKET_LENGTH], rssi: u8) {
        self.recv_packets = self.recv_packets.saturating_add(1);
        self.valid.insert(Field::RecvPackets);

        self.rssi = rssi;
        self.valid.insert(Field::Rssi);

        self.raw = *packet;
    }
}
