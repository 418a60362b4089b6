//! Mocks for doc examples
use crate::transport::{Readiness, Transport};
use embedded_io::{ErrorKind, ErrorType};
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use heapless::{Deque, Vec};

/// Transport mock answering a fixed set of commands like an ESP-AT modem
#[derive(Default)]
pub struct ExampleTransport {
    /// Bytes written by the adapter, until a full line was received
    tx: Vec<u8, 512>,

    /// Bytes to be read by the adapter
    rx: Deque<u8, 512>,
}

impl ExampleTransport {
    fn respond(&mut self) {
        let response: &[u8] = match self.tx.as_slice() {
            b"AT+RST\r\n" => b"\r\nOK\r\nready\r\n",
            b"AT\r\n" | b"AT+CWMODE=1\r\n" => b"\r\nOK\r\n",
            b"AT+CWJAP=\"test_wifi\",\"secret\"\r\n" => b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n",
            b"AT+CIFSR\r\n" => b"+CIFSR:STAIP,\"10.0.0.181\"\r\n+CIFSR:STAMAC,\"10:fe:ed:05:ba:50\"\r\n\r\nOK\r\n",
            b"AT+CIPSTART=\"TCP\",\"example.com\",80\r\n" => b"CONNECT\r\n\r\nOK\r\n",
            line if line.starts_with(b"AT+CIPSEND=") => b"\r\nOK\r\n> ",
            line if line.starts_with(b"GET ") => {
                b"\r\nSEND OK\r\n\r\n+IPD,58:HTTP/1.1 200 OK\r\nContent-Length: 16\r\n\r\nnice to see you!CLOSED\r\n"
            }
            _ => b"\r\nERROR\r\n",
        };

        for byte in response {
            let _ = self.rx.push_back(*byte);
        }
        self.tx.clear();
    }
}

impl ErrorType for ExampleTransport {
    type Error = ErrorKind;
}

impl Transport for ExampleTransport {
    fn discard(&mut self) -> Result<(), Self::Error> {
        self.tx.clear();
        self.rx.clear();
        Ok(())
    }

    fn transmit(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.tx.extend_from_slice(data).map_err(|_| ErrorKind::OutOfMemory)?;

        if self.tx.ends_with(b"\r\n") {
            self.respond();
        }

        Ok(())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> nb::Result<usize, Self::Error> {
        let mut length = 0;

        while length < buffer.len() {
            match self.rx.pop_front() {
                Some(byte) => buffer[length] = byte,
                None => break,
            }
            length += 1;
        }

        if length == 0 {
            return Err(nb::Error::WouldBlock);
        }

        Ok(length)
    }

    fn wait_readable(&mut self, _timeout_ms: u32) -> Result<Readiness, Self::Error> {
        if self.rx.is_empty() {
            return Ok(Readiness::TimedOut);
        }

        Ok(Readiness::Ready)
    }
}

/// Timer mock, time advances by one millisecond on each `wait()` poll
#[derive(Default)]
pub struct ExampleTimer {
    ticks: u32,

    deadline: Option<u32>,
}

impl Timer<1_000> for ExampleTimer {
    type Error = u32;

    fn now(&mut self) -> TimerInstantU32<1_000> {
        TimerInstantU32::from_ticks(self.ticks)
    }

    fn start(&mut self, duration: TimerDurationU32<1_000>) -> Result<(), Self::Error> {
        self.deadline = Some(self.ticks.saturating_add(duration.ticks()));
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), Self::Error> {
        self.deadline = None;
        Ok(())
    }

    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        let deadline = self.deadline.ok_or(nb::Error::Other(1))?;
        self.ticks = self.ticks.saturating_add(1);

        if self.ticks < deadline {
            return Err(nb::Error::WouldBlock);
        }

        self.deadline = None;
        Ok(())
    }
}
