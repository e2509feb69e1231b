//! # Davis ISS Protocol Module
//!
//! Implementation of the over-the-air packet format used by Davis Instruments
//! ISS (Integrated Sensor Suite) weather transmitters.
//!
//! This module handles:
//! - Bit-order correction (the ISS transmits each byte LSB first)
//! - CRC-16/CCITT validation
//! - Field extraction and scaling for each packet subtype
//! - Building valid frames for tests and capture tooling

pub mod protocol;
pub mod encoder;
pub mod decoder;
pub mod crc;
