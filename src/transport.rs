//! # Serial transport
//!
//! The byte channel towards the ESP-AT co-processor. Opening the device and configuring baud rate
//! and line discipline is up to the caller, the [Adapter](crate::adapter::Adapter) just needs the
//! operations below.
use embedded_io::ErrorType;

/// Outcome of waiting for incoming data
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    /// Data is available for reading
    Ready,

    /// Nothing arrived within the given time
    TimedOut,
}

/// Duplex byte channel connected to the ESP-AT modem
pub trait Transport: ErrorType {
    /// Drops any data pending in both directions (received but not read yet, written but not sent yet)
    fn discard(&mut self) -> Result<(), Self::Error>;

    /// Writes all the given bytes
    fn transmit(&mut self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads up to `buffer.len()` bytes without blocking.
    /// Returns `WouldBlock` (or zero) if no data is available.
    fn receive(&mut self, buffer: &mut [u8]) -> nb::Result<usize, Self::Error>;

    /// Blocks at most `timeout_ms` milliseconds until data is available for reading
    fn wait_readable(&mut self, timeout_ms: u32) -> Result<Readiness, Self::Error>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn discard(&mut self) -> Result<(), Self::Error> {
        T::discard(self)
    }

    fn transmit(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        T::transmit(self, data)
    }

    fn receive(&mut self, buffer: &mut [u8]) -> nb::Result<usize, Self::Error> {
        T::receive(self, buffer)
    }

    fn wait_readable(&mut self, timeout_ms: u32) -> Result<Readiness, Self::Error> {
        T::wait_readable(self, timeout_ms)
    }
}
