//! # ESP-AT HTTP client
//!
//! Drives a serial attached ESP-AT WIFI modem: joining an access point in station mode and sending
//! a single plain HTTP GET request over a TCP connection opened by the modem itself.
//!
//! Every command step sends an AT command and blocks until the modem output contains the expected
//! marker (e.g. `OK`, `WIFI GOT IP`, `CLOSED`), the generic `ERROR` token or the timeout elapsed.
//!
//! * [adapter]: Command executor and session state
//! * [wifi]: Restarting the module and joining a WIFI network
//! * [http]: HTTP GET request
//! * [transport]: Trait to be implemented for the serial connection
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]

pub mod adapter;
pub mod buffer;
pub(crate) mod commands;
pub mod extract;
pub mod http;
pub mod transport;
pub mod wifi;

#[cfg(feature = "std")]
pub mod timer;

#[cfg(feature = "examples")]
pub mod example;

#[cfg(test)]
mod tests;
