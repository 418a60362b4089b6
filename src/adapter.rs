//! # Command executor
//!
//! [Adapter] sends single commands to the ESP-AT modem and waits until the modem output contains
//! the expected marker, the generic `ERROR` token or the timeout elapsed. Joining a network
//! ([wifi](crate::wifi)) and HTTP requests ([http](crate::http)) are built on top.
//!
//! ## Example
//!
//! ````
//! # use esp_at_http::example::{ExampleTimer, ExampleTransport};
//! use esp_at_http::adapter::{Adapter, Status};
//!
//! let mut adapter: Adapter<_, _, 1_000, 256> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//!
//! assert_eq!(Status::Ok, adapter.execute("AT", "OK", 1_000));
//! assert_eq!(b"\r\nOK", adapter.response());
//! ````
use crate::buffer::{ResponseBuffer, DEFAULT_RX_SIZE};
use crate::commands::{AtCommand, CommandErrorHandler, Outbound, ERROR_MARKER};
use crate::extract::find;
use crate::transport::{Readiness, Transport};
use crate::wifi::AssociationState;
use embedded_io::{Error as _, ErrorKind};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::Vec;

/// Max. number of bytes read from the transport at once
pub const CHUNK_SIZE: usize = 64;

/// Max. length of an expected marker in bytes
pub const MAX_MARKER_LEN: usize = 64;

/// Result of a single command exchange
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    /// Expected marker was received
    Ok,

    /// Timeout elapsed without receiving the marker
    Timeout,

    /// Modem responded with `ERROR`, the transport or the timer failed
    Error,

    /// Reserved, currently not returned by any operation
    Busy,
}

/// Central client for communicating with the ESP-AT modem
///
/// TIMER_HZ: Tick rate of the timer used for timeout measurement
///
/// RX_SIZE: Capacity of the response buffer in bytes. Modem output exceeding the capacity is still
/// checked for markers but not captured.
pub struct Adapter<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const RX_SIZE: usize = DEFAULT_RX_SIZE> {
    /// Serial connection to the modem
    pub(crate) transport: T,

    /// Timer used for timeout measurement
    pub(crate) timer: C,

    /// Capture of the modem output
    pub(crate) buffer: ResponseBuffer<RX_SIZE>,

    /// Progress of joining the WIFI network
    pub(crate) state: AssociationState,

    /// Delay after restarting the module
    pub(crate) settle_delay: TimerDurationU32<TIMER_HZ>,

    /// Output received after the last matched marker, gets consumed by the next await-only step
    carry: Vec<u8, CHUNK_SIZE>,

    /// Kind of the last transport failure
    last_error: Option<ErrorKind>,
}

impl<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const RX_SIZE: usize> Adapter<T, C, TIMER_HZ, RX_SIZE> {
    /// Creates a new adapter. The transport needs to be configured already (baud rate, raw mode).
    pub fn new(transport: T, timer: C) -> Self {
        Self {
            transport,
            timer,
            buffer: ResponseBuffer::new(),
            state: AssociationState::Reset,
            settle_delay: TimerDurationU32::millis(1_000),
            carry: Vec::new(),
            last_error: None,
        }
    }

    /// Sends the given command terminated by CRLF and waits until the modem output contains the marker.
    ///
    /// An empty command sends nothing and behaves like [await_marker()](Self::await_marker).
    /// The response buffer gets cleared first.
    pub fn execute(&mut self, command: &str, marker: &str, timeout_ms: u32) -> Status {
        self.buffer.clear();

        if command.is_empty() {
            return self.exchange(Outbound::Nothing, marker, timeout_ms);
        }

        self.exchange(Outbound::Line(command), marker, timeout_ms)
    }

    /// Waits for the marker without sending anything.
    ///
    /// Continues reading the output of the previous command, nothing gets discarded.
    pub fn await_marker(&mut self, marker: &str, timeout_ms: u32) -> Status {
        self.buffer.clear();
        self.exchange(Outbound::Nothing, marker, timeout_ms)
    }

    /// Transmits the data as is (no CRLF) and waits for the marker
    pub fn send_raw(&mut self, data: &[u8], marker: &str, timeout_ms: u32) -> Status {
        self.buffer.clear();
        self.exchange(Outbound::Raw(data), marker, timeout_ms)
    }

    /// Returns the modem output captured by the last operation
    pub fn response(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    /// Returns the response buffer of the last operation
    pub fn buffer(&self) -> &ResponseBuffer<RX_SIZE> {
        &self.buffer
    }

    /// Kind of the last transport failure, reset by [reset()](Self::reset)
    pub fn last_transport_error(&self) -> Option<ErrorKind> {
        self.last_error
    }

    /// Sets the delay after restarting the module in ms
    pub fn set_settle_delay_ms(&mut self, delay: u32) {
        self.settle_delay = TimerDurationU32::millis(delay);
    }

    /// Returns to the initial state. WIFI network needs to be joined again afterwards.
    pub fn reset(&mut self) {
        self.state = AssociationState::Reset;
        self.buffer.clear();
        self.carry.clear();
        self.last_error = None;
    }

    /// Releases transport and timer
    pub fn release(self) -> (T, C) {
        (self.transport, self.timer)
    }

    /// Runs a command step and maps the error if the command failed.
    /// Appends to the response buffer, so the caller decides when to clear it.
    pub(crate) fn send_command<Cmd: AtCommand + CommandErrorHandler>(&mut self, command: &Cmd) -> Result<(), Cmd::Error> {
        match self.exchange(command.outbound(), Cmd::MARKER, Cmd::TIMEOUT_MS) {
            Status::Ok => Ok(()),
            status => Err(command.command_error(status)),
        }
    }

    /// Sends the outbound data and reads until marker, error or timeout
    fn exchange(&mut self, outbound: Outbound<'_>, marker: &str, timeout_ms: u32) -> Status {
        if marker.len() > MAX_MARKER_LEN {
            log::error!("Marker {:?} exceeds {} bytes", marker, MAX_MARKER_LEN);
            return Status::Error;
        }

        let Some(timeout) = Self::timeout_duration(timeout_ms) else {
            log::error!("Timeout of {} ms exceeds timer range", timeout_ms);
            return Status::Error;
        };

        self.buffer.begin_step();
        let mut scanner = MarkerScanner::new(marker.as_bytes());

        if outbound == Outbound::Nothing {
            // Output following the previous marker belongs to this step
            let carry = core::mem::take(&mut self.carry);
            if !carry.is_empty() {
                if let Some(status) = self.process_chunk(&mut scanner, &carry) {
                    return status;
                }
            }
        } else {
            self.carry.clear();

            if let Err(error) = self.transport.discard() {
                self.record_error(error);
                return Status::Error;
            }

            if let Err(error) = self.transmit(outbound) {
                self.record_error(error);
                return Status::Error;
            }
        }

        // The countdown decides about the timeout, now() just limits the single waits
        if self.timer.start(timeout).is_err() {
            log::error!("Starting timer failed");
            return Status::Error;
        }

        let start = self.timer.now();
        loop {
            let remaining_ms = self.remaining_ms(start, timeout);
            match self.transport.wait_readable(remaining_ms) {
                Ok(Readiness::Ready) => {
                    if let Some(status) = self.receive_chunk(&mut scanner) {
                        return status;
                    }
                }
                Ok(Readiness::TimedOut) => {}
                Err(error) => {
                    self.record_error(error);
                    return Status::Error;
                }
            }

            match self.timer.wait() {
                Ok(_) => {
                    log::debug!("Timeout while waiting for {:?}", marker);
                    return Status::Timeout;
                }
                Err(nb::Error::WouldBlock) => {}
                Err(nb::Error::Other(_)) => {
                    log::error!("Timer failed while waiting for {:?}", marker);
                    return Status::Error;
                }
            }
        }
    }

    /// Time left until the timeout according to `now()`, at least one millisecond.
    /// Timers whose `now()` does not advance get the full timeout on each wait.
    fn remaining_ms(&mut self, start: TimerInstantU32<TIMER_HZ>, timeout: TimerDurationU32<TIMER_HZ>) -> u32 {
        let elapsed = self
            .timer
            .now()
            .checked_duration_since(start)
            .unwrap_or(TimerDurationU32::from_ticks(0));

        if elapsed >= timeout {
            return 1;
        }

        (timeout - elapsed).to_millis().max(1)
    }

    /// Reads the available data and processes it
    fn receive_chunk(&mut self, scanner: &mut MarkerScanner<'_>) -> Option<Status> {
        let mut chunk = [0x0; CHUNK_SIZE];
        let length = match self.transport.receive(&mut chunk) {
            Ok(length) => length.min(CHUNK_SIZE),
            Err(nb::Error::WouldBlock) => 0,
            Err(nb::Error::Other(error)) => {
                log::warn!("Reading from transport failed: {:?}", error);
                0
            }
        };

        if length == 0 {
            return None;
        }

        self.process_chunk(scanner, &chunk[..length])
    }

    /// Captures a received chunk and checks it for the marker and the error token
    fn process_chunk(&mut self, scanner: &mut MarkerScanner<'_>, chunk: &[u8]) -> Option<Status> {
        log::trace!("Received {:?}", chunk);

        let Some((status, end)) = scanner.scan(chunk) else {
            self.buffer.append(chunk);
            return None;
        };

        if status == Status::Ok {
            self.buffer.append(&chunk[..end]);
            self.carry.clear();
            let _ = self.carry.extend_from_slice(&chunk[end..]);
        } else {
            self.buffer.append(chunk);
        }

        log::debug!("Command finished with {:?}", status);
        Some(status)
    }

    fn transmit(&mut self, outbound: Outbound<'_>) -> Result<(), T::Error> {
        match outbound {
            Outbound::Line(line) => {
                log::trace!("Sending command {:?}", line);
                self.transport.transmit(line.as_bytes())?;
                self.transport.transmit(b"\r\n")
            }
            Outbound::Raw(data) => {
                log::trace!("Sending {} bytes of data", data.len());
                self.transport.transmit(data)
            }
            Outbound::Nothing => Ok(()),
        }
    }

    fn record_error(&mut self, error: T::Error) {
        log::error!("Transport failure: {:?}", error);
        self.last_error = Some(error.kind());
    }

    /// Converts the timeout to timer ticks, None if not representable
    fn timeout_duration(timeout_ms: u32) -> Option<TimerDurationU32<TIMER_HZ>> {
        let ticks = u64::from(timeout_ms) * u64::from(TIMER_HZ) / 1_000;
        let ticks = u32::try_from(ticks).ok()?;
        Some(TimerDurationU32::from_ticks(ticks))
    }
}

/// Incremental search for the marker and the error token over a stream of chunks.
/// Keeps the tail of the previous chunks, so tokens split across reads are found.
struct MarkerScanner<'a> {
    marker: &'a [u8],

    tail: Vec<u8, MAX_MARKER_LEN>,
}

impl<'a> MarkerScanner<'a> {
    fn new(marker: &'a [u8]) -> Self {
        Self {
            marker,
            tail: Vec::new(),
        }
    }

    /// Returns the status and the end index of the matching token within the chunk.
    /// If marker and error token are both found, the first one wins.
    fn scan(&mut self, chunk: &[u8]) -> Option<(Status, usize)> {
        if self.marker.is_empty() && !chunk.is_empty() {
            return Some((Status::Ok, chunk.len()));
        }

        let mut window: Vec<u8, { MAX_MARKER_LEN + CHUNK_SIZE }> = Vec::new();
        let _ = window.extend_from_slice(&self.tail);
        let _ = window.extend_from_slice(&chunk[..chunk.len().min(CHUNK_SIZE)]);

        let marker = find(&window, self.marker).map(|index| (Status::Ok, index, index + self.marker.len()));
        let error = find(&window, ERROR_MARKER.as_bytes())
            .map(|index| (Status::Error, index, index + ERROR_MARKER.len()));

        let found = match (marker, error) {
            (Some(marker), Some(error)) if error.1 < marker.1 => Some(error),
            (Some(marker), _) => Some(marker),
            (None, error) => error,
        };

        if let Some((status, _, end)) = found {
            return Some((status, end.saturating_sub(self.tail.len())));
        }

        let keep = window.len().min(MAX_MARKER_LEN - 1);
        self.tail.clear();
        let _ = self.tail.extend_from_slice(&window[window.len() - keep..]);
        None
    }
}
