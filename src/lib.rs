//! # ISS Bridge Library
//!
//! Receive and decode Davis ISS weather transmitters.
//!
//! This library provides the frequency-hopping receive loop that follows an
//! ISS transmitter, validates and decodes its packets, and renders the
//! accumulated telemetry as one JSON report per good packet.

pub mod config;
pub mod error;
pub mod davis;
pub mod telemetry;
pub mod radio;
pub mod sync;
pub mod acquisition;
pub mod serial;
