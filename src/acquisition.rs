//! # Acquisition Loop
//!
//! Ties the receiver, hop sequence, tick timer and link synchronizer
//! together.
//!
//! Each call to [`AcquisitionLoop::poll_once`] performs one non-blocking pass:
//!
//! 1. Run the one-second housekeeping tick if the timer delay has expired
//! 2. Give the command processor a turn
//! 3. Poll the receiver; decode ISS-sized frames and re-enable reception
//! 4. Render a report after every good packet
//!
//! [`AcquisitionLoop::run_until`] drives those passes from a tokio interval
//! and writes the results to a [`ReportSink`].

use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::davis::decoder::{decode, DecodeOutcome};
use crate::davis::protocol::{swap_packet_bit_order, ISS_PACKET_LENGTH};
use crate::radio::hopping::HopSequence;
use crate::radio::receiver::Receiver;
use crate::radio::timer::TickTimer;
use crate::sync::{LinkState, LinkSynchronizer, SearchStatus, TickOutcome};
use crate::telemetry::report::TelemetryReport;
use crate::telemetry::sink::ReportSink;
use crate::telemetry::state::TelemetrySnapshot;

/// Sidecar work interleaved with packet reception
pub trait CommandProcessor {
    fn poll(&mut self);
}

impl CommandProcessor for () {
    fn poll(&mut self) {}
}

/// Everything one pass produced, in emission order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollOutcome {
    /// Searching line from the housekeeping tick (comes first)
    pub status: Option<SearchStatus>,
    /// Report for a packet that passed the CRC
    pub report: Option<TelemetryReport>,
    /// Decoder verdict for an ISS-sized frame
    pub decode: Option<DecodeOutcome>,
}

impl PollOutcome {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.report.is_none() && self.decode.is_none()
    }
}

/// Receive loop state and collaborators
pub struct AcquisitionLoop<R, H, T, C = ()> {
    receiver: R,
    hops: H,
    timer: T,
    command: C,
    sync: LinkSynchronizer,
    snapshot: TelemetrySnapshot,
    ticks_per_second: u16,
    started: bool,
}

impl<R, H, T, C> AcquisitionLoop<R, H, T, C>
where
    R: Receiver,
    H: HopSequence,
    T: TickTimer,
    C: CommandProcessor,
{
    pub fn new(receiver: R, hops: H, timer: T, command: C, config: SyncConfig) -> Self {
        Self {
            receiver,
            hops,
            timer,
            command,
            ticks_per_second: config.ticks_per_second,
            sync: LinkSynchronizer::new(config),
            snapshot: TelemetrySnapshot::new(),
            started: false,
        }
    }

    /// Tune to the current channel, open the receive window and arm the tick
    pub fn start(&mut self) {
        self.retune();
        self.timer.set_delay(self.ticks_per_second);
        self.started = true;

        info!("Listening on {} Hz", self.hops.receive_frequency());
    }

    /// Run one pass of the loop
    pub fn poll_once(&mut self) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        if self.timer.delay_expired() {
            self.timer.set_delay(self.ticks_per_second);

            let tick = self
                .sync
                .on_one_second_elapsed(&mut self.hops, &mut self.receiver, &mut self.snapshot);
            if let TickOutcome::Searching(status) = tick {
                outcome.status = Some(status);
            }
        }

        self.command.poll();

        if let Some(mut frame) = self.receiver.receive_frame() {
            if frame.len() == ISS_PACKET_LENGTH {
                swap_packet_bit_order(frame.as_mut_bytes());
                self.sync.on_packet_received(&mut self.hops);

                let rssi = self.receiver.last_rssi();
                match decode(frame.as_bytes(), rssi, &mut self.snapshot) {
                    Ok(verdict) => outcome.decode = Some(verdict),
                    Err(e) => warn!("Failed to decode frame: {}", e),
                }

                self.timer.set_delay(self.ticks_per_second);
            } else {
                debug!("Ignoring {}-byte frame", frame.len());
            }

            self.retune();
        }

        if let Some(DecodeOutcome::Decoded(_)) = outcome.decode {
            self.sync.on_good_packet();
            outcome.report = Some(self.snapshot.render());
        }

        outcome
    }

    /// Poll until `shutdown` resolves, sending output to `sink`
    ///
    /// Starts the loop first if [`start`](Self::start) has not been called.
    /// Sink failures are logged and do not stop the loop.
    ///
    /// # Returns
    ///
    /// * `u64` - Number of reports handed to the sink
    pub async fn run_until<S, F>(&mut self, sink: &mut S, poll_interval: Duration, shutdown: F) -> u64
    where
        S: ReportSink + ?Sized,
        F: Future<Output = ()>,
    {
        if !self.started {
            self.start();
        }

        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);
        let mut reports: u64 = 0;

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    debug!("Acquisition loop stopping after {} reports", reports);
                    break;
                }

                _ = ticker.tick() => {
                    let outcome = self.poll_once();

                    if let Some(status) = outcome.status {
                        if let Err(e) = sink.emit_status(&status.to_string()).await {
                            warn!("Failed to emit status: {}", e);
                        }
                    }

                    if let Some(report) = outcome.report {
                        match report.to_json_line() {
                            Ok(line) => {
                                if let Err(e) = sink.emit_report(&line).await {
                                    warn!("Failed to emit report: {}", e);
                                }
                                reports += 1;
                            }
                            Err(e) => warn!("Failed to render report: {}", e),
                        }
                    }
                }
            }
        }

        reports
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn link_state(&self) -> &LinkState {
        self.sync.state()
    }

    pub fn is_searching(&self) -> bool {
        self.sync.is_searching()
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    pub fn hops(&self) -> &H {
        &self.hops
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    fn retune(&mut self) {
        self.receiver.set_frequency(self.hops.receive_frequency());
        self.receiver.start_receiving();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::davis::encoder::{encode_packet, to_air_order};
    use crate::davis::protocol::PacketKind;
    use crate::radio::hopping::HopTable;
    use crate::radio::receiver::{MockReceiver, RawFrame};
    use crate::radio::timer::ManualTimer;
    use crate::telemetry::sink::mocks::RecordingSink;
    use crate::telemetry::state::Field;

    const BASE_HZ: u32 = 902_000_000;
    const SPACING_HZ: u32 = 500_000;

    fn table() -> HopTable {
        HopTable::linear(BASE_HZ, SPACING_HZ, 51).unwrap()
    }

    fn humidity_air_frame() -> RawFrame {
        RawFrame::new(&to_air_order(&encode_packet([0xA0, 0x00, 0x00, 0x64, 0x00, 0x00])))
    }

    /// Receiver that hands out the given frames once, then nothing
    fn scripted_receiver(frames: Vec<RawFrame>) -> MockReceiver {
        let mut queue = frames;
        queue.reverse();

        let mut receiver = MockReceiver::new();
        receiver.expect_set_frequency().return_const(());
        receiver.expect_start_receiving().return_const(());
        receiver.expect_last_rssi().return_const(120u8);
        receiver.expect_receive_frame().returning(move || queue.pop());
        receiver
    }

    struct CountingCommand(u32);

    impl CommandProcessor for CountingCommand {
        fn poll(&mut self) {
            self.0 += 1;
        }
    }

    /// Timer whose delay is always expired, so every pass is a one-second tick
    struct ExpiredTimer;

    impl TickTimer for ExpiredTimer {
        fn ticks(&self) -> u16 {
            0
        }

        fn set_delay(&mut self, _ticks: u16) {}

        fn delay_expired(&self) -> bool {
            true
        }
    }

    #[test]
    fn test_start_tunes_and_arms_timer() {
        let mut receiver = MockReceiver::new();
        receiver
            .expect_set_frequency()
            .withf(|hz| *hz == BASE_HZ)
            .times(1)
            .return_const(());
        receiver.expect_start_receiving().times(1).return_const(());

        let mut acq = AcquisitionLoop::new(receiver, table(), ManualTimer::new(), (), SyncConfig::default());
        acq.start();

        assert_eq!(acq.timer_mut().remaining(), 100);
        assert!(acq.is_searching());
    }

    #[test]
    fn test_quiet_pass_does_nothing() {
        let mut acq = AcquisitionLoop::new(scripted_receiver(vec![]), table(), ManualTimer::new(), (), SyncConfig::default());
        acq.start();

        let outcome = acq.poll_once();
        assert!(outcome.is_empty());
        assert_eq!(acq.link_state().seconds_since_boot, 0);
    }

    #[test]
    fn test_tick_when_delay_expires() {
        let mut acq = AcquisitionLoop::new(scripted_receiver(vec![]), table(), ManualTimer::new(), (), SyncConfig::default());
        acq.start();

        acq.timer_mut().advance(99);
        assert!(acq.poll_once().status.is_none());

        acq.timer_mut().advance(1);
        let outcome = acq.poll_once();
        assert_eq!(
            outcome.status,
            Some(SearchStatus {
                seconds_since_boot: 1,
                frequency_hz: BASE_HZ,
            })
        );
        assert_eq!(acq.timer_mut().remaining(), 100, "Tick re-arms the delay");
    }

    #[test]
    fn test_good_packet_produces_report() {
        let mut acq = AcquisitionLoop::new(
            scripted_receiver(vec![humidity_air_frame()]),
            table(),
            ManualTimer::new(),
            (),
            SyncConfig::default(),
        );
        acq.start();
        acq.timer_mut().advance(40);

        let outcome = acq.poll_once();

        assert_eq!(outcome.decode, Some(DecodeOutcome::Decoded(PacketKind::Humidity)));
        let report = outcome.report.unwrap();
        assert_eq!(report.humidity_pct, Some(10.0));
        assert_eq!(report.rssi, Some(120));
        assert!(report.temperature_f.is_none());

        assert_eq!(acq.snapshot().recv_packets, 1);
        assert!(acq.snapshot().valid.contains(Field::Humidity));
        assert_eq!(acq.link_state().seconds_last_packet, Some(0));
        assert_eq!(acq.hops().current_channel(), 1, "Packet steps the hop sequence forward");
        assert_eq!(acq.timer_mut().remaining(), 100, "Packet restarts the one-second delay");
        assert!(!acq.is_searching());
    }

    #[test]
    fn test_bad_crc_counts_but_does_not_report() {
        let mut air = to_air_order(&encode_packet([0x80, 0x01, 0x02, 0x03, 0x04, 0x05]));
        air[4] ^= 0x10;

        let mut acq = AcquisitionLoop::new(
            scripted_receiver(vec![RawFrame::new(&air)]),
            table(),
            ManualTimer::new(),
            (),
            SyncConfig::default(),
        );
        acq.start();

        let outcome = acq.poll_once();

        assert_eq!(outcome.decode, Some(DecodeOutcome::BadCrc));
        assert!(outcome.report.is_none());
        assert_eq!(acq.snapshot().bad_crc, 1);
        assert_eq!(acq.snapshot().recv_packets, 0);
        assert!(acq.is_searching());
        assert_eq!(acq.hops().current_channel(), 1);
    }

    #[test]
    fn test_short_frame_ignored_but_receiver_reenabled() {
        let mut receiver = MockReceiver::new();
        let mut frames = vec![RawFrame::new(&[0x55; 4])];
        receiver.expect_receive_frame().returning(move || frames.pop());
        receiver.expect_last_rssi().never();
        // Once from start(), once after the short frame
        receiver
            .expect_set_frequency()
            .withf(|hz| *hz == BASE_HZ)
            .times(2)
            .return_const(());
        receiver.expect_start_receiving().times(2).return_const(());

        let mut acq = AcquisitionLoop::new(receiver, table(), ManualTimer::new(), (), SyncConfig::default());
        acq.start();

        let outcome = acq.poll_once();
        assert!(outcome.is_empty());
        assert_eq!(acq.hops().current_channel(), 0);
        assert_eq!(acq.snapshot().bad_crc, 0);
    }

    #[test]
    fn test_tick_comes_before_packet() {
        let mut acq = AcquisitionLoop::new(
            scripted_receiver(vec![humidity_air_frame()]),
            table(),
            ManualTimer::new(),
            (),
            SyncConfig::default(),
        );
        acq.start();
        acq.timer_mut().advance(100);

        let outcome = acq.poll_once();

        assert_eq!(outcome.status.map(|s| s.seconds_since_boot), Some(1));
        assert!(outcome.report.is_some());
        assert_eq!(acq.link_state().seconds_last_packet, Some(1));
    }

    #[test]
    fn test_command_processor_polled_every_pass() {
        let mut acq = AcquisitionLoop::new(
            scripted_receiver(vec![]),
            table(),
            ManualTimer::new(),
            CountingCommand(0),
            SyncConfig::default(),
        );
        acq.start();

        for _ in 0..5 {
            acq.poll_once();
        }

        assert_eq!(acq.command.0, 5);
    }

    #[tokio::test]
    async fn test_run_until_emits_reports() {
        let mut acq = AcquisitionLoop::new(
            scripted_receiver(vec![humidity_air_frame()]),
            table(),
            ManualTimer::new(),
            (),
            SyncConfig::default(),
        );
        let mut sink = RecordingSink::default();

        let reports = acq
            .run_until(&mut sink, Duration::from_millis(1), tokio::time::sleep(Duration::from_millis(50)))
            .await;

        assert_eq!(reports, 1);
        let lines = sink.reports.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("\"humidity_pct\": 10.0"));
        assert!(sink.statuses.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_until_emits_searching_lines() {
        let mut acq = AcquisitionLoop::new(scripted_receiver(vec![]), table(), ExpiredTimer, (), SyncConfig::default());
        let mut sink = RecordingSink::default();

        let reports = acq
            .run_until(&mut sink, Duration::from_millis(1), tokio::time::sleep(Duration::from_millis(30)))
            .await;

        assert_eq!(reports, 0);
        let statuses = sink.statuses.lock().unwrap();
        assert!(!statuses.is_empty());
        assert_eq!(statuses[0], format!("Searching 1 at {} Hz", BASE_HZ));
    }

    #[tokio::test]
    async fn test_run_until_survives_failing_sink() {
        let mut acq = AcquisitionLoop::new(
            scripted_receiver(vec![humidity_air_frame()]),
            table(),
            ManualTimer::new(),
            (),
            SyncConfig::default(),
        );
        let mut sink = RecordingSink {
            fail: true,
            ..Default::default()
        };

        acq.run_until(&mut sink, Duration::from_millis(1), tokio::time::sleep(Duration::from_millis(20)))
            .await;

        assert_eq!(acq.snapshot().recv_packets, 1);
    }
}
