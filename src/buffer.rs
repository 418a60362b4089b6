//! # Response buffer
//!
//! Bounded capture of the bytes received from the ESP-AT modem. Gets cleared by every
//! [Adapter](crate::adapter::Adapter) operation and filled while waiting for the expected marker.
use heapless::Vec;

/// Capacity used by the reference setup
pub const DEFAULT_RX_SIZE: usize = 2048;

/// Fixed size capture of modem output
#[derive(Clone, Debug, Default)]
pub struct ResponseBuffer<const N: usize> {
    data: Vec<u8, N>,

    /// Index at which the currently running command step started appending
    step_start: usize,

    /// True if bytes were dropped due to missing space
    truncated: bool,
}

impl<const N: usize> ResponseBuffer<N> {
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            step_start: 0,
            truncated: false,
        }
    }

    /// Drops all captured data
    pub fn clear(&mut self) {
        self.data.clear();
        self.step_start = 0;
        self.truncated = false;
    }

    /// Marks the current end as start of a new command step
    pub(crate) fn begin_step(&mut self) {
        self.step_start = self.data.len();
    }

    /// Appends as much of the given data as fits and returns the appended length.
    /// Remaining bytes are dropped and the buffer is flagged as truncated.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let length = data.len().min(self.buffer_space());
        if length < data.len() {
            self.truncated = true;
        }

        match self.data.extend_from_slice(&data[..length]) {
            Ok(_) => length,
            Err(_) => 0,
        }
    }

    /// All captured bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Captured bytes as text, None if not valid UTF-8
    pub fn as_str(&self) -> Option<&str> {
        core::str::from_utf8(&self.data).ok()
    }

    /// Bytes captured by the last started command step
    pub fn current_step(&self) -> &[u8] {
        &self.data[self.step_start..]
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() >= N
    }

    /// True if data got lost since the last [clear()](Self::clear) due to missing space
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns the remaining free buffer space
    fn buffer_space(&self) -> usize {
        N - self.data.len()
    }
}
