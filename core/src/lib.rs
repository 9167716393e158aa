//! Platform-agnostic logic for the Pico W barometer logger
//!
//! Everything in here is written against small driver traits so the
//! firmware can plug in the CYW43 radio, embassy-net sockets and the RP2040
//! I2C peripheral, while the host test suite plugs in fakes.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod bmp180;
pub mod calendar;
pub mod config;
pub mod line_protocol;
pub mod log;
pub mod network;
pub mod ntp;
pub mod reading;
pub mod schedule;
pub mod sensor;
pub mod syslog;
pub mod timesync;
pub mod upload;

pub use config::Settings;
pub use log::{LogSink, Severity};
pub use reading::{Reading, SharedReading};
