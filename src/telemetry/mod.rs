//! # Telemetry Module
//!
//! Holds decoded ISS data and turns it into reports.
//!
//! This module handles:
//! - The authoritative telemetry snapshot and its validity tags
//! - Rendering the snapshot as a fixed-order JSON line
//! - Writing report lines to stdout and a rotating JSONL log

pub mod state;
pub mod report;
pub mod logger;
pub mod sink;
