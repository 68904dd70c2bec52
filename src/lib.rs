//! TWI (I2C) bus-master driver for the ATmega128
//!
//! Blocking bus primitives, register burst-read/write protocols and an
//! address-space scanner, all built on top of the [`hal::TwiPeripheral`]
//! capability so they run against the real peripheral or a simulated one.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(abi_avr_interrupt))]

#[macro_use]
mod logger;

pub mod application;
pub mod config;
pub mod drivers;
pub mod error;
pub mod hal;

#[cfg(test)]
pub(crate) mod testing;

pub use drivers::{ScanResult, SerialConsole};
pub use error::Error;
pub use hal::{
    register_callback, AbortPolicy, ClockConfig, InterruptClient, Prescaler, TwiMaster,
    TwiPeripheral, TwiStatus,
};
