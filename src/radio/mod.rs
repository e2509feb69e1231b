//! # Radio Module
//!
//! Interfaces to the collaborators around the acquisition loop.
//!
//! This module handles:
//! - The receiver interface (tuning, RSSI, non-blocking frame polling)
//! - The frequency-hop sequence
//! - The tick timer that paces the one-second housekeeping
//! - Replaying and capturing over-the-air frames

pub mod receiver;
pub mod hopping;
pub mod timer;
pub mod replay;
pub mod capture;
