//! # Telemetry Report
//!
//! Renders a [`TelemetrySnapshot`] as the JSON line consumed by weather
//! station software. Field order is fixed and each field only appears once
//! its validity tag is set; `raw` and `version` are always present.
//!
//! ```text
//! { "transmitter_id": 0, "RSSI": 120, "recv_packets": 1, "wind_speed_mph": 0,
//!   "humidity_pct": 10.0, "raw": "a0 00 00 64 00 00 c3 e1 ff ff", "version": "1.0" }
//! ```

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;

use super::state::{Field, TelemetrySnapshot};
use crate::davis::protocol::ISS_DATA_VERSION;
use crate::error::{IssBridgeError, Result};

/// One rendered telemetry report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transmitter_id: Option<u8>,

    #[serde(rename = "RSSI", skip_serializing_if = "Option::is_none")]
    pub rssi: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recv_packets: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_packets: Option<u32>,

    #[serde(rename = "bad_CRC", skip_serializing_if = "Option::is_none")]
    pub bad_crc: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_speed_mph: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub wind_direction_degrees: Option<u16>,

    #[serde(rename = "temperature_F", skip_serializing_if = "Option::is_none")]
    pub temperature_f: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity_pct: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub light: Option<u16>,

    #[serde(rename = "UV_index", skip_serializing_if = "Option::is_none")]
    pub uv_index: Option<f64>,

    #[serde(rename = "solar_Wm2", skip_serializing_if = "Option::is_none")]
    pub solar_wm2: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_spoons: Option<u8>,

    /// Last good packet as 10 space-separated 2-digit hex bytes
    pub raw: String,

    pub version: &'static str,
}

impl TelemetryReport {
    /// Serialize as a single line: `{ "key": value, ... }`
    pub fn to_json_line(&self) -> Result<String> {
        let mut buf = Vec::with_capacity(256);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, ReportFormatter);
        self.serialize(&mut serializer)?;

        String::from_utf8(buf).map_err(|e| IssBridgeError::Protocol(format!("Report is not UTF-8: {}", e)))
    }
}

impl TelemetrySnapshot {
    /// Build the report for the current state
    pub fn render(&self) -> TelemetryReport {
        let valid = self.valid;
        let pick = |field: Field| valid.contains(field);

        TelemetryReport {
            transmitter_id: pick(Field::Transmitter).then_some(self.transmitter_id),
            rssi: pick(Field::Rssi).then_some(self.rssi),
            recv_packets: pick(Field::RecvPackets).then_some(self.recv_packets),
            lost_packets: pick(Field::LostPackets).then_some(self.lost_packets),
            bad_crc: pick(Field::BadCrc).then_some(self.bad_crc),
            wind_speed_mph: pick(Field::WindSpeed).then_some(self.wind_speed_mph),
            wind_direction_degrees: pick(Field::WindDirection).then_some(self.wind_direction_degrees),
            temperature_f: pick(Field::Temperature).then(|| round_to(self.temperature_f, 2)),
            humidity_pct: pick(Field::Humidity).then(|| round_to(self.humidity_pct, 1)),
            light: pick(Field::Light).then_some(self.light),
            uv_index: pick(Field::UvIndex).then(|| round_to(self.uv_index, 2)),
            solar_wm2: pick(Field::Solar).then(|| round_to(self.solar_wm2, 2)),
            rain_spoons: pick(Field::RainSpoons).then_some(self.rain_spoons),
            raw: hex_bytes(&self.raw),
            version: ISS_DATA_VERSION,
        }
    }
}

/// Round to a fixed number of decimal places
fn round_to(value: f32, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value as f64 * scale).round() / scale
}

/// Lowercase hex, space separated
fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `serde_json` formatter producing `{ "a": 1, "b": 2 }`
struct ReportFormatter;

impl Formatter for ReportFormatter {
    fn begin_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b"{ ")
    }

    fn end_object<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b" }")
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}
