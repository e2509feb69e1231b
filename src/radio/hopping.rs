//! # Frequency Hopping
//!
//! The hop sequence only has to step forward, step backward and report the
//! current receive frequency. How the channel order is derived is up to the
//! implementation; [`HopTable`] walks a fixed list with wraparound.

use crate::config::HoppingConfig;
use crate::error::{IssBridgeError, Result};

/// Channel sequence shared by the transmitter and the receiver
#[cfg_attr(test, mockall::automock)]
pub trait HopSequence {
    /// Advance to the next channel in the sequence
    fn next_channel(&mut self);

    /// Step back to the previous channel in the sequence
    fn previous_channel(&mut self);

    /// Frequency of the current receive channel in Hz
    fn receive_frequency(&self) -> u32;
}

/// Fixed list of channel frequencies, walked with wraparound
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopTable {
    channels: Vec<u32>,
    index: usize,
}

impl HopTable {
    /// Create a table from an explicit channel list
    ///
    /// # Errors
    ///
    /// Returns error if the list is empty
    pub fn new(channels: Vec<u32>) -> Result<Self> {
        if channels.is_empty() {
            return Err(IssBridgeError::Protocol("hop table needs at least one channel".to_string()));
        }

        Ok(Self { channels, index: 0 })
    }

    /// Evenly spaced channels: `base + n * spacing` for `n` in `0..count`
    pub fn linear(base_frequency_hz: u32, channel_spacing_hz: u32, count: usize) -> Result<Self> {
        let channels = (0..count)
            .map(|n| {
                u32::try_from(n)
                    .ok()
                    .and_then(|n| n.checked_mul(channel_spacing_hz))
                    .and_then(|offset| base_frequency_hz.checked_add(offset))
                    .ok_or_else(|| IssBridgeError::Protocol(format!("channel {} overflows u32 Hz", n)))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(channels)
    }

    /// Build the table described by the `[hopping]` configuration section
    ///
    /// An explicit `channels` list takes precedence over the linear layout.
    pub fn from_config(config: &HoppingConfig) -> Result<Self> {
        if config.channels.is_empty() {
            Self::linear(config.base_frequency_hz, config.channel_spacing_hz, config.num_channels)
        } else {
            Self::new(config.channels.clone())
        }
    }

    /// Index of the current channel
    pub fn current_channel(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl HopSequence for HopTable {
    fn next_channel(&mut self) {
        self.index = (self.index + 1) % self.channels.len();
    }

    fn previous_channel(&mut self) {
        self.index = (self.index + self.channels.len() - 1) % self.channels.len();
    }

    fn receive_frequency(&self) -> u32 {
        self.channels[self.index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_is_rejected() {
        assert!(HopTable::new(vec![]).is_err());
        assert!(HopTable::linear(902_000_000, 500_000, 0).is_err());
    }

    #[test]
    fn test_linear_layout() {
        let table = HopTable::linear(902_000_000, 500_000, 3).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.receive_frequency(), 902_000_000);
    }

    #[test]
    fn test_linear_overflow_is_rejected() {
        assert!(HopTable::linear(u32::MAX - 10, 500_000, 2).is_err());
    }

    #[test]
    fn test_next_wraps_around() {
        let mut table = HopTable::new(vec![100, 200, 300]).unwrap();

        table.next_channel();
        assert_eq!(table.receive_frequency(), 200);
        table.next_channel();
        table.next_channel();
        assert_eq!(table.receive_frequency(), 100);
        assert_eq!(table.current_channel(), 0);
    }

    #[test]
    fn test_previous_wraps_around() {
        let mut table = HopTable::new(vec![100, 200, 300]).unwrap();

        table.previous_channel();
        assert_eq!(table.receive_frequency(), 300);
        assert_eq!(table.current_channel(), 2);
        table.previous_channel();
        assert_eq!(table.receive_frequency(), 200);
    }

    #[test]
    fn test_single_channel_table() {
        let mut table = HopTable::new(vec![915_000_000]).unwrap();
        table.next_channel();
        table.previous_channel();
        assert_eq!(table.receive_frequency(), 915_000_000);
    }

    #[test]
    fn test_from_config_prefers_explicit_channels() {
        let mut config = HoppingConfig::default();
        config.channels = vec![911_000_000, 905_000_000];

        let table = HopTable::from_config(&config).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.receive_frequency(), 911_000_000);
    }

    #[test]
    fn test_from_config_linear_default() {
        let config = HoppingConfig::default();
        let table = HopTable::from_config(&config).unwrap();

        assert_eq!(table.len(), config.num_channels);
        assert_eq!(table.receive_frequency(), config.base_frequency_hz);
    }
}
