use crate::adapter::Status;
use crate::http::HttpError;
use crate::wifi::{AddressErrors, JoinError};
use core::fmt::Write;
use heapless::String;

/// Generic error token of the ESP-AT dialect, aborts every command
pub(crate) const ERROR_MARKER: &str = "ERROR";

/// Bytes sent to the modem for a command step
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Outbound<'a> {
    /// AT command line, gets terminated by CRLF
    Line(&'a str),

    /// Data transmitted as is
    Raw(&'a [u8]),

    /// Nothing gets sent, just waiting for further output of the modem
    Nothing,
}

/// A single step of the ESP-AT dialect
pub(crate) trait AtCommand {
    /// Substring of the modem output signaling success
    const MARKER: &'static str;

    /// Max. time to wait for the marker in milliseconds
    const TIMEOUT_MS: u32;

    fn outbound(&self) -> Outbound<'_>;
}

/// Trait for mapping command errors
pub(crate) trait CommandErrorHandler {
    type Error;

    /// Maps a failed command status
    fn command_error(&self, status: Status) -> Self::Error;
}

/// Restarts the module
#[derive(Clone, Default)]
pub(crate) struct RestartCommand;

impl AtCommand for RestartCommand {
    const MARKER: &'static str = "ready";
    const TIMEOUT_MS: u32 = 5_000;

    fn outbound(&self) -> Outbound<'_> {
        Outbound::Line("AT+RST")
    }
}

impl CommandErrorHandler for RestartCommand {
    type Error = JoinError;

    fn command_error(&self, status: Status) -> Self::Error {
        JoinError::RestartError(status)
    }
}

/// Checks if the module responds to AT commands at all
#[derive(Clone, Default)]
pub(crate) struct ProbeCommand;

impl AtCommand for ProbeCommand {
    const MARKER: &'static str = "OK";
    const TIMEOUT_MS: u32 = 1_000;

    fn outbound(&self) -> Outbound<'_> {
        Outbound::Line("AT")
    }
}

impl CommandErrorHandler for ProbeCommand {
    type Error = JoinError;

    fn command_error(&self, status: Status) -> Self::Error {
        JoinError::ProbeError(status)
    }
}

/// Sets the WIFI mode
#[derive(Clone)]
pub(crate) struct WifiModeCommand {
    /// WIFI mode command line, mode values:
    ///     0: Null mode. Wi-Fi RF will be disabled.
    ///     1: Station mode.
    ///     2: SoftAP mode.
    ///     3: SoftAP+Station mode.
    line: &'static str,
}

impl WifiModeCommand {
    pub fn station_mode() -> Self {
        Self { line: "AT+CWMODE=1" }
    }
}

impl AtCommand for WifiModeCommand {
    const MARKER: &'static str = "OK";
    const TIMEOUT_MS: u32 = 1_000;

    fn outbound(&self) -> Outbound<'_> {
        Outbound::Line(self.line)
    }
}

impl CommandErrorHandler for WifiModeCommand {
    type Error = JoinError;

    fn command_error(&self, status: Status) -> Self::Error {
        JoinError::ModeError(status)
    }
}

/// Command for joining the target WIFI access point
#[derive(Clone)]
pub(crate) struct AccessPointConnectCommand {
    line: String<256>,
}

impl AccessPointConnectCommand {
    /// Validates and escapes the credentials
    pub fn new(ssid: &str, password: &str) -> Result<Self, JoinError> {
        if ssid.is_empty() || ssid.len() > 32 {
            return Err(JoinError::InvalidSSDLength);
        }

        if password.len() > 63 {
            return Err(JoinError::InvalidPasswordLength);
        }

        let mut line = String::new();
        line.push_str("AT+CWJAP=\"").map_err(|_| JoinError::InvalidSSDLength)?;
        push_escaped(&mut line, ssid).map_err(|_| JoinError::InvalidCharacter)?;
        line.push_str("\",\"").map_err(|_| JoinError::InvalidPasswordLength)?;
        push_escaped(&mut line, password).map_err(|_| JoinError::InvalidCharacter)?;
        line.push('"').map_err(|_| JoinError::InvalidPasswordLength)?;

        Ok(Self { line })
    }
}

impl AtCommand for AccessPointConnectCommand {
    const MARKER: &'static str = "WIFI CONNECTED";
    const TIMEOUT_MS: u32 = 20_000;

    fn outbound(&self) -> Outbound<'_> {
        Outbound::Line(self.line.as_str())
    }
}

impl CommandErrorHandler for AccessPointConnectCommand {
    type Error = JoinError;

    fn command_error(&self, status: Status) -> Self::Error {
        JoinError::ConnectError(status)
    }
}

/// Waits until the access point has assigned an IP
#[derive(Clone, Default)]
pub(crate) struct AwaitAddressCommand;

impl AtCommand for AwaitAddressCommand {
    const MARKER: &'static str = "WIFI GOT IP";
    const TIMEOUT_MS: u32 = 10_000;

    fn outbound(&self) -> Outbound<'_> {
        Outbound::Nothing
    }
}

impl CommandErrorHandler for AwaitAddressCommand {
    type Error = JoinError;

    fn command_error(&self, status: Status) -> Self::Error {
        JoinError::AddressError(status)
    }
}

/// Queries the local IP and MAC addresses
#[derive(Clone, Default)]
pub(crate) struct ObtainLocalAddressCommand;

impl AtCommand for ObtainLocalAddressCommand {
    const MARKER: &'static str = "OK";
    const TIMEOUT_MS: u32 = 1_000;

    fn outbound(&self) -> Outbound<'_> {
        Outbound::Line("AT+CIFSR")
    }
}

impl CommandErrorHandler for ObtainLocalAddressCommand {
    type Error = AddressErrors;

    fn command_error(&self, status: Status) -> Self::Error {
        AddressErrors::CommandError(status)
    }
}

/// Establish a TCP connection
#[derive(Clone)]
pub(crate) struct ConnectCommand {
    line: String<128>,
}

impl ConnectCommand {
    /// Max. accepted length of the remote host name
    pub const MAX_HOST_LEN: usize = 100;

    /// Establishes a TCP connection to the given host name or IP address
    pub fn tcp(host: &str, port: u16) -> Result<Self, HttpError> {
        if !is_valid_host(host) {
            return Err(HttpError::InvalidHost);
        }

        let mut line = String::new();
        write!(line, "AT+CIPSTART=\"TCP\",\"{}\",{}", host, port).map_err(|_| HttpError::InvalidHost)?;

        Ok(Self { line })
    }
}

impl AtCommand for ConnectCommand {
    const MARKER: &'static str = "CONNECT";
    const TIMEOUT_MS: u32 = 10_000;

    fn outbound(&self) -> Outbound<'_> {
        Outbound::Line(self.line.as_str())
    }
}

impl CommandErrorHandler for ConnectCommand {
    type Error = HttpError;

    fn command_error(&self, status: Status) -> Self::Error {
        HttpError::ConnectError(status)
    }
}

/// Announces the length of the following data transmission
#[derive(Clone)]
pub(crate) struct TransmissionPrepareCommand {
    line: String<24>,
}

impl TransmissionPrepareCommand {
    pub fn new(length: usize) -> Result<Self, HttpError> {
        let mut line = String::new();
        write!(line, "AT+CIPSEND={}", length).map_err(|_| HttpError::RequestTooLong)?;

        Ok(Self { line })
    }
}

impl AtCommand for TransmissionPrepareCommand {
    const MARKER: &'static str = ">";
    const TIMEOUT_MS: u32 = 5_000;

    fn outbound(&self) -> Outbound<'_> {
        Outbound::Line(self.line.as_str())
    }
}

impl CommandErrorHandler for TransmissionPrepareCommand {
    type Error = HttpError;

    fn command_error(&self, status: Status) -> Self::Error {
        HttpError::TransmissionStartFailed(status)
    }
}

/// Transmits the announced data and waits until the remote starts answering
#[derive(Clone)]
pub(crate) struct TransmissionCommand<'a> {
    data: &'a [u8],
}

impl<'a> TransmissionCommand<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl AtCommand for TransmissionCommand<'_> {
    const MARKER: &'static str = "+IPD";
    const TIMEOUT_MS: u32 = 10_000;

    fn outbound(&self) -> Outbound<'_> {
        Outbound::Raw(self.data)
    }
}

impl CommandErrorHandler for TransmissionCommand<'_> {
    type Error = HttpError;

    fn command_error(&self, status: Status) -> Self::Error {
        HttpError::SendFailed(status)
    }
}

/// Waits until the remote closed the connection
#[derive(Clone, Default)]
pub(crate) struct AwaitCloseCommand;

impl AtCommand for AwaitCloseCommand {
    const MARKER: &'static str = "CLOSED";
    const TIMEOUT_MS: u32 = 15_000;

    fn outbound(&self) -> Outbound<'_> {
        Outbound::Nothing
    }
}

impl CommandErrorHandler for AwaitCloseCommand {
    type Error = HttpError;

    fn command_error(&self, status: Status) -> Self::Error {
        HttpError::ReceiveFailed(status)
    }
}

/// Appends a quoted string argument, escaping the characters ESP-AT treats as special.
/// Control characters can not be escaped and are rejected.
fn push_escaped<const N: usize>(line: &mut String<N>, value: &str) -> Result<(), ()> {
    for character in value.chars() {
        if character.is_control() {
            return Err(());
        }

        if matches!(character, '"' | ',' | '\\') {
            line.push('\\')?;
        }

        line.push(character)?;
    }

    Ok(())
}

/// Host names get quoted as is, so quotes, whitespace and control characters are not allowed
fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && host.len() <= ConnectCommand::MAX_HOST_LEN
        && !host
            .chars()
            .any(|character| character == '"' || character.is_whitespace() || character.is_control())
}
