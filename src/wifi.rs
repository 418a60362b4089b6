//! # WIFI access point client
//!
//! Restarting the module, joining a network and obtaining address information is supported.
//!
//! ## Example
//!
//! ````
//! # use esp_at_http::example::{ExampleTimer, ExampleTransport};
//! use esp_at_http::adapter::Adapter;
//! use esp_at_http::wifi::{AssociationState, WifiAdapter};
//!
//! let mut adapter: Adapter<_, _, 1_000, 256> = Adapter::new(ExampleTransport::default(), ExampleTimer::default());
//!
//! // Restarts the module and joins the access point
//! adapter.join("test_wifi", "secret").unwrap();
//! assert_eq!(AssociationState::Connected, adapter.get_join_state());
//!
//! let address = adapter.get_address().unwrap();
//! assert_eq!("10:fe:ed:05:ba:50", address.mac.unwrap().as_str());
//! assert_eq!("10.0.0.181", address.ipv4.unwrap().to_string());
//! ````
use crate::adapter::{Adapter, Status};
use crate::commands::{
    AccessPointConnectCommand, AtCommand, AwaitAddressCommand, CommandErrorHandler, ObtainLocalAddressCommand,
    ProbeCommand, RestartCommand, WifiModeCommand,
};
use crate::extract::extract;
use crate::transport::Transport;
use core::fmt::Debug;
use core::net::Ipv4Addr;
use core::str::FromStr;
use fugit_timer::Timer;
use heapless::String;

/// Wifi network adapter trait
pub trait WifiAdapter {
    /// Error when joining a WIFI network
    type JoinError: Debug;

    /// Error when receiving local address information
    type AddressError: Debug;

    /// Restarts the module and joins the given WIFI access point
    fn join(&mut self, ssid: &str, key: &str) -> Result<(), Self::JoinError>;

    /// Returns the current association state
    fn get_join_state(&self) -> AssociationState;

    /// Returns local address information
    fn get_address(&mut self) -> Result<LocalAddress, Self::AddressError>;
}

/// Progress of joining a WIFI network
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AssociationState {
    /// Module needs to be restarted
    Reset,

    /// Module restarted, needs to be switched to station mode
    Init,

    /// Station mode active, access point needs to be joined
    ConnectingAP,

    /// Joined and IP assigned
    Connected,

    /// A step failed
    Error,
}

impl AssociationState {
    /// True if the state machine has stopped
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Connected | Self::Error)
    }
}

/// Possible errors when joining an access point
#[derive(Clone, Debug, PartialEq)]
pub enum JoinError {
    /// Module did not report readiness after restart
    RestartError(Status),

    /// Module did not respond to AT
    ProbeError(Status),

    /// Error wile setting WIFI mode to station
    ModeError(Status),

    /// Error while joining the access point
    ConnectError(Status),

    /// Access point did not assign an IP
    AddressError(Status),

    /// Given SSID is empty or longer then the max. size of 32 chars
    InvalidSSDLength,

    /// Given password is longer then the max. size of 63 chars
    InvalidPasswordLength,

    /// SSID or password contains control characters
    InvalidCharacter,

    /// Upstream timer error
    TimerError,
}

/// Errors when receiving local address information
#[derive(Clone, Debug, PartialEq)]
pub enum AddressErrors {
    /// CIFSR command failed
    CommandError(Status),

    /// Error while parsing addresses
    AddressParseError,
}

/// Local IP and MAC addresses
#[derive(Default, Clone, Debug)]
pub struct LocalAddress {
    /// Local IPv4 address if assigned
    pub ipv4: Option<Ipv4Addr>,

    /// Local MAC address
    pub mac: Option<String<17>>,
}

impl<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const RX_SIZE: usize> WifiAdapter
    for Adapter<T, C, TIMER_HZ, RX_SIZE>
{
    type JoinError = JoinError;
    type AddressError = AddressErrors;

    /// Restarts the module and joins the given WIFI access point.
    ///
    /// Always starts from [AssociationState::Reset]. Stops at the first failing step, leaving the
    /// state at [AssociationState::Error]. Rejected credentials count as failing step.
    fn join(&mut self, ssid: &str, key: &str) -> Result<(), JoinError> {
        self.state = AssociationState::Reset;
        let connect = AccessPointConnectCommand::new(ssid, key).map_err(|error| {
            log::warn!("Rejected WIFI credentials: {:?}", error);
            self.state = AssociationState::Error;
            error
        })?;

        while !self.state.is_terminal() {
            match self.advance(&connect) {
                Ok(next) => {
                    log::debug!("Association state {:?} -> {:?}", self.state, next);
                    self.state = next;
                }
                Err(error) => {
                    log::warn!("Joining WIFI failed in state {:?}: {:?}", self.state, error);
                    self.state = AssociationState::Error;
                    return Err(error);
                }
            }
        }

        Ok(())
    }

    fn get_join_state(&self) -> AssociationState {
        self.state
    }

    /// Returns local address information
    fn get_address(&mut self) -> Result<LocalAddress, AddressErrors> {
        self.run_step(&ObtainLocalAddressCommand)?;

        let response = self.buffer.as_str().ok_or(AddressErrors::AddressParseError)?;
        LocalAddress::from_response(response)
    }
}

impl<T: Transport, C: Timer<TIMER_HZ>, const TIMER_HZ: u32, const RX_SIZE: usize> Adapter<T, C, TIMER_HZ, RX_SIZE> {
    /// Runs the commands of the current state and returns the next state
    fn advance(&mut self, connect: &AccessPointConnectCommand) -> Result<AssociationState, JoinError> {
        match self.state {
            AssociationState::Reset => {
                self.run_step(&RestartCommand)?;
                self.settle()?;
                Ok(AssociationState::Init)
            }
            AssociationState::Init => {
                self.run_step(&ProbeCommand)?;
                self.run_step(&WifiModeCommand::station_mode())?;
                Ok(AssociationState::ConnectingAP)
            }
            AssociationState::ConnectingAP => {
                self.run_step(connect)?;
                self.run_step(&AwaitAddressCommand)?;
                Ok(AssociationState::Connected)
            }
            AssociationState::Connected | AssociationState::Error => Ok(self.state),
        }
    }

    /// Runs a single command with a fresh response buffer
    fn run_step<Cmd: AtCommand + CommandErrorHandler>(&mut self, command: &Cmd) -> Result<(), Cmd::Error> {
        self.buffer.clear();
        self.send_command(command)
    }

    /// Waits until the module has finished its start up
    fn settle(&mut self) -> Result<(), JoinError> {
        self.timer.start(self.settle_delay).map_err(|_| JoinError::TimerError)?;
        nb::block!(self.timer.wait()).map_err(|_| JoinError::TimerError)
    }
}

impl LocalAddress {
    /// Parses the response of CIFSR command, e.g. `+CIFSR:STAIP,"10.0.0.181"`
    pub(crate) fn from_response(response: &str) -> Result<Self, AddressErrors> {
        let mut data = Self::default();

        if let Some(ip) = extract(response, "+CIFSR:STAIP,\"", "\"", 15) {
            if ip.truncated {
                return Err(AddressErrors::AddressParseError);
            }

            data.ipv4 = Some(Ipv4Addr::from_str(ip.value).map_err(|_| AddressErrors::AddressParseError)?);
        }

        if let Some(mac) = extract(response, "+CIFSR:STAMAC,\"", "\"", 17) {
            if mac.truncated {
                return Err(AddressErrors::AddressParseError);
            }

            data.mac = Some(String::try_from(mac.value).map_err(|_| AddressErrors::AddressParseError)?);
        }

        Ok(data)
    }
}
