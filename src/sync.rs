//! # Link Synchronizer
//!
//! One-second housekeeping that keeps the receiver on the transmitter's
//! channel.
//!
//! ## Modes
//!
//! The mode is derived from the time of the last good packet rather than
//! stored:
//!
//! - **Searching**: no good packet yet, or none for more than
//!   `sync_timeout_s` seconds. The receiver dwells `search_hop_threshold_s + 1`
//!   seconds per channel and walks the sequence *backwards*, so it sweeps
//!   against the transmitter's direction of travel.
//! - **Synced**: the receiver follows the transmitter's own cadence, hopping
//!   forward every `synced_hop_interval_s` seconds. A full window without a
//!   packet is counted as one lost packet.
//!
//! Every packet that arrives resets the hop counter and steps the sequence
//! forward, which re-aligns hop timing to the moment of actual reception.

use std::fmt;

use tracing::{debug, info};

use crate::config::SyncConfig;
use crate::radio::hopping::HopSequence;
use crate::radio::receiver::Receiver;
use crate::telemetry::state::TelemetrySnapshot;

/// Synchronization bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkState {
    pub seconds_since_boot: u32,

    /// Time of the last good packet; only ever moves forward once set
    pub seconds_last_packet: Option<u32>,

    /// Seconds spent on the current channel
    pub hop_counter: u32,
}

/// Diagnostic emitted once per second while searching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStatus {
    pub seconds_since_boot: u32,
    pub frequency_hz: u32,
}

impl fmt::Display for SearchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Searching {} at {} Hz", self.seconds_since_boot, self.frequency_hz)
    }
}

/// What a one-second tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Synced, still inside the current hop window
    Idle,
    /// Synced, hop window ran out without a packet; moved to the next channel
    Hopped { frequency_hz: u32 },
    /// Searching (the status may follow a backwards hop)
    Searching(SearchStatus),
}

/// Drives channel hopping from the one-second tick and packet arrivals
#[derive(Debug, Clone)]
pub struct LinkSynchronizer {
    config: SyncConfig,
    state: LinkState,
    searching: bool,
}

impl LinkSynchronizer {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            state: LinkState::default(),
            searching: true,
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Whether the link is currently considered lost
    pub fn is_searching(&self) -> bool {
        match self.state.seconds_last_packet {
            None => true,
            Some(last) => self.state.seconds_since_boot.saturating_sub(last) > self.config.sync_timeout_s,
        }
    }

    /// Housekeeping, called once per second of wall time
    pub fn on_one_second_elapsed<H, R>(
        &mut self,
        hops: &mut H,
        receiver: &mut R,
        snapshot: &mut TelemetrySnapshot,
    ) -> TickOutcome
    where
        H: HopSequence + ?Sized,
        R: Receiver + ?Sized,
    {
        self.state.hop_counter += 1;
        self.state.seconds_since_boot += 1;

        if self.is_searching() {
            if !self.searching {
                info!(
                    "Lost sync after {}s without a packet",
                    self.state.seconds_since_boot - self.state.seconds_last_packet.unwrap_or(0)
                );
                self.searching = true;
            }

            if self.state.hop_counter > self.config.search_hop_threshold_s {
                hops.previous_channel();
                Self::retune(hops, receiver);
                self.state.hop_counter = 0;
                debug!("Search hop back to {} Hz", hops.receive_frequency());
            }

            return TickOutcome::Searching(SearchStatus {
                seconds_since_boot: self.state.seconds_since_boot,
                frequency_hz: hops.receive_frequency(),
            });
        }

        if self.state.hop_counter < self.config.synced_hop_interval_s {
            return TickOutcome::Idle;
        }

        hops.next_channel();
        Self::retune(hops, receiver);
        self.state.hop_counter = 0;

        if self.state.seconds_last_packet.is_some() {
            snapshot.record_lost_packet();
        }

        let frequency_hz = hops.receive_frequency();
        debug!("Missed packet, hopped to {} Hz (lost {})", frequency_hz, snapshot.lost_packets);
        TickOutcome::Hopped { frequency_hz }
    }

    /// A frame of ISS length arrived: restart the hop window on the next channel
    pub fn on_packet_received<H: HopSequence + ?Sized>(&mut self, hops: &mut H) {
        self.state.hop_counter = 0;
        hops.next_channel();
    }

    /// A packet passed the CRC check
    pub fn on_good_packet(&mut self) {
        let now = self.state.seconds_since_boot;
        if self.state.seconds_last_packet.map_or(true, |last| now >= last) {
            self.state.seconds_last_packet = Some(now);
        }

        if self.searching {
            info!("Synchronized with transmitter at {}s", now);
            self.searching = false;
        }
    }

    fn retune<H, R>(hops: &H, receiver: &mut R)
    where
        H: HopSequence + ?Sized,
        R: Receiver + ?Sized,
    {
        receiver.set_frequency(hops.receive_frequency());
        receiver.start_receiving();
    }
}
