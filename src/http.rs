//! # HTTP client
//!
//! Sends a single unencrypted HTTP GET request over a TCP connection opened by the ESP-AT modem.
//! The modem needs to be joined to a WIFI network before, s. [WifiAdapter](crate::wifi::WifiAdapter).
//!
//! Everything the modem reports from sending the request until the remote closes the connection
//! is captured in the response buffer. Data exceeding the buffer capacity is dropped, s.
//! [ResponseBuffer::is_truncated](crate::buffer::ResponseBuffer::is_truncated).
//!
//! ## Example
//!
//! ````
//! # use esp_at_http::example::{ExampleTimer, ExampleTransport};
//! use esp_at_http::adapter::Adapter;
//!
//! let mut adapter: Adapter<_, _, 1_000, 256> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//!
//! let response = adapter.http_get("example.com", 80, "/").unwrap();
//! assert_eq!(Some(200), response.status_code());
//! assert_eq!(Some(&b"nice to see you!"[..]), response.body());
//! ````
use crate::adapter::{Adapter, Status};
use crate::commands::{AwaitCloseCommand, ConnectCommand, TransmissionCommand, TransmissionPrepareCommand};
use crate::extract::{extract_bytes, find};
use crate::transport::Transport;
use core::fmt::Write;
use core::str::FromStr;
use fugit_timer::Timer;
use heapless::String;

/// Max. length of the request text in bytes
pub const MAX_REQUEST_LEN: usize = 512;

/// HTTP request related errors
#[derive(Clone, Debug, PartialEq)]
pub enum HttpError {
    /// Host is empty, too long or contains quotes, whitespace or control characters
    InvalidHost,

    /// Path does not start with `/` or contains whitespace or control characters
    InvalidPath,

    /// Request text exceeds [MAX_REQUEST_LEN]
    RequestTooLong,

    /// TCP connect command failed
    ConnectError(Status),

    /// Preparing the transmission failed (CIPSEND command)
    TransmissionStartFailed(Status),

    /// Transmission of the request failed or the remote did not respond
    SendFailed(Status),

    /// Remote did not close the connection
    ReceiveFailed(Status),
}

/// Modem output captured while receiving the HTTP response
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse<'a> {
    raw: &'a [u8],

    /// True if modem output got dropped due to missing buffer space
    truncated: bool,
}

impl<'a> HttpResponse<'a> {
    pub(crate) fn new(raw: &'a [u8], truncated: bool) -> Self {
        Self { raw, truncated }
    }

    /// Captured modem output, starting at the first `+IPD` notification.
    /// Empty if the notification did not fit into the response buffer.
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }

    /// True if the response exceeded the buffer capacity and was cut
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    /// Status code of the HTTP status line
    pub fn status_code(&self) -> Option<u16> {
        let status_line = extract_bytes(self.raw, b"HTTP/1.", b"\r\n", 64)?.value;
        let code = status_line.get(2..5)?;

        u16::from_str(core::str::from_utf8(code).ok()?).ok()
    }

    /// Data following the header block up to the closing notification of the modem.
    ///
    /// Just a single `+IPD` frame is expected, further frame headers remain part of the body.
    pub fn body(&self) -> Option<&'a [u8]> {
        let raw = self.raw;
        let start = find(raw, b"\r\n\r\n")? + 4;
        let mut body = &raw[start..];

        if let Some(stripped) = body.strip_suffix(b"CLOSED") {
            body = stripped;
            body = body.strip_suffix(b"\r\n").unwrap_or(body);
        }

        Some(body)
    }
}

impl<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const RX_SIZE: usize> Adapter<T, C, TIMER_HZ, RX_SIZE> {
    /// Sends a GET request for the given path and captures the response until the remote closes the
    /// connection.
    ///
    /// The response buffer is cleared once at the beginning and appended by all steps.
    pub fn http_get(&mut self, host: &str, port: u16, path: &str) -> Result<HttpResponse<'_>, HttpError> {
        let connect = ConnectCommand::tcp(host, port)?;
        let request = Self::build_request(host, path)?;
        let prepare = TransmissionPrepareCommand::new(request.len())?;

        self.buffer.clear();
        self.send_command(&connect)?;
        self.send_command(&prepare)?;

        let response_start = self.buffer.len();
        self.send_command(&TransmissionCommand::new(request.as_bytes()))?;
        self.send_command(&AwaitCloseCommand).map_err(|error| {
            log::warn!("HTTP request to {}{} not completed: {:?}", host, path, error);
            error
        })?;

        let truncated = self.buffer.is_truncated();
        let capture = self.buffer.as_bytes();
        let Some(index) = find(&capture[response_start..], b"+IPD") else {
            log::warn!("Response of {}{} exceeds the buffer capacity of {} bytes", host, path, RX_SIZE);
            return Ok(HttpResponse::new(&capture[capture.len()..], truncated));
        };

        Ok(HttpResponse::new(&capture[response_start + index..], truncated))
    }

    fn build_request(host: &str, path: &str) -> Result<String<MAX_REQUEST_LEN>, HttpError> {
        if !path.starts_with('/') || path.chars().any(|character| character.is_whitespace() || character.is_control()) {
            return Err(HttpError::InvalidPath);
        }

        let mut request = String::new();
        write!(request, "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n", path, host)
            .map_err(|_| HttpError::RequestTooLong)?;

        Ok(request)
    }
}
