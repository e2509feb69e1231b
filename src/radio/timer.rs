//! # Tick Timer
//!
//! Coarse tick counter plus a one-shot delay, polled by the acquisition loop.
//! The loop arms a delay of one second worth of ticks and runs the
//! housekeeping tick each time it expires.

use std::time::{Duration, Instant};

/// Length of one tick for [`MonotonicTimer`]
pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

/// Tick source with a single re-armable delay
pub trait TickTimer {
    /// Current tick count (wraps)
    fn ticks(&self) -> u16;

    /// Ticks elapsed since an earlier reading of [`ticks`](TickTimer::ticks)
    fn elapsed_since(&self, mark: u16) -> u16 {
        self.ticks().wrapping_sub(mark)
    }

    /// Arm the delay to expire `ticks` from now
    fn set_delay(&mut self, ticks: u16);

    /// Whether the armed delay has run out (an unarmed delay counts as expired)
    fn delay_expired(&self) -> bool;
}

/// Wall-clock timer built on [`Instant`]
#[derive(Debug, Clone)]
pub struct MonotonicTimer {
    origin: Instant,
    tick: Duration,
    deadline: Option<Instant>,
}

impl MonotonicTimer {
    pub fn new() -> Self {
        Self::with_tick(DEFAULT_TICK)
    }

    /// Timer with a custom tick length (clamped to at least 1 ms)
    pub fn with_tick(tick: Duration) -> Self {
        Self {
            origin: Instant::now(),
            tick: tick.max(Duration::from_millis(1)),
            deadline: None,
        }
    }
}

impl Default for MonotonicTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TickTimer for MonotonicTimer {
    fn ticks(&self) -> u16 {
        let elapsed = self.origin.elapsed().as_nanos() / self.tick.as_nanos();
        elapsed as u16
    }

    fn set_delay(&mut self, ticks: u16) {
        self.deadline = Some(Instant::now() + self.tick * ticks as u32);
    }

    fn delay_expired(&self) -> bool {
        self.deadline.map_or(true, |deadline| Instant::now() >= deadline)
    }
}

/// Timer advanced by hand, for tests and simulations
#[derive(Debug, Clone, Default)]
pub struct ManualTimer {
    now: u64,
    deadline: Option<u64>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `ticks`
    pub fn advance(&mut self, ticks: u64) {
        self.now += ticks;
    }

    /// Ticks left until the armed delay expires
    pub fn remaining(&self) -> u64 {
        self.deadline.map_or(0, |deadline| deadline.saturating_sub(self.now))
    }
}

impl TickTimer for ManualTimer {
    fn ticks(&self) -> u16 {
        self.now as u16
    }

    fn set_delay(&mut self, ticks: u16) {
        self.deadline = Some(self.now + ticks as u64);
    }

    fn delay_expired(&self) -> bool {
        self.deadline.map_or(true, |deadline| self.now >= deadline)
    }
}
