//! Receiver interface and the raw frame it delivers

/// Largest frame a receiver can hand over
pub const MAX_PACKET_LENGTH: usize = 252;

/// Frame exactly as delivered by the receiver, before any bit correction
#[derive(Clone, PartialEq, Eq)]
pub struct RawFrame {
    buf: [u8; MAX_PACKET_LENGTH],
    len: usize,
}

impl RawFrame {
    /// Copy received bytes into a frame, truncating at `MAX_PACKET_LENGTH`
    pub fn new(bytes: &[u8]) -> Self {
        let len = bytes.len().min(MAX_PACKET_LENGTH);
        let mut buf = [0u8; MAX_PACKET_LENGTH];
        buf[..len].copy_from_slice(&bytes[..len]);
        Self { buf, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.buf[..self.len]
    }
}

impl std::fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawFrame")
            .field("len", &self.len)
            .field("bytes", &format_args!("{:02X?}", self.as_bytes()))
            .finish()
    }
}

/// Radio receiver driven by the acquisition loop
///
/// All calls are non-blocking. After delivering a frame the receiver stays
/// idle until [`start_receiving`](Receiver::start_receiving) is called again.
#[cfg_attr(test, mockall::automock)]
pub trait Receiver {
    /// Tune to a channel frequency
    fn set_frequency(&mut self, frequency_hz: u32);

    /// Signal strength of the last received frame
    fn last_rssi(&self) -> u8;

    /// Open the receive window
    fn start_receiving(&mut self);

    /// Poll for a completed frame
    fn receive_frame(&mut self) -> Option<RawFrame>;
}

impl<R: Receiver + ?Sized> Receiver for Box<R> {
    fn set_frequency(&mut self, frequency_hz: u32) {
        (**self).set_frequency(frequency_hz)
    }

    fn last_rssi(&self) -> u8 {
        (**self).last_rssi()
    }

    fn start_receiving(&mut self) {
        (**self).start_receiving()
    }

    fn receive_frame(&mut self) -> Option<RawFrame> {
        (**self).receive_frame()
    }
}
