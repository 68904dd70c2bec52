//! TWI (I2C) HAL implementation
//!
//! The peripheral is reached only through [`TwiPeripheral`]; [`TwiMaster`]
//! turns those register operations into the blocking bus primitives that the
//! transaction protocols and the scanner are built from.

use core::convert::Infallible;

use crate::hal::interrupt;

/// TWCR: interrupt flag, cleared by writing one to start the next step
pub const TWINT: u8 = 1 << 7;
/// TWCR: acknowledge enable
pub const TWEA: u8 = 1 << 6;
/// TWCR: start condition request
pub const TWSTA: u8 = 1 << 5;
/// TWCR: stop condition request
pub const TWSTO: u8 = 1 << 4;
/// TWCR: peripheral enable
pub const TWEN: u8 = 1 << 2;
/// TWCR: interrupt enable
pub const TWIE: u8 = 1 << 0;

/// TWCR values for each control step, derived from the value read back
///
/// TWINT is write-one-to-clear and reads back as one after every completed
/// step, so only the steps that launch a bus action may carry it.
#[cfg_attr(not(target_arch = "avr"), allow(dead_code))]
pub(crate) mod control {
    use super::{TWEA, TWINT, TWSTA, TWSTO};

    pub const fn start(twcr: u8) -> u8 {
        (twcr & !TWSTO) | TWINT | TWSTA
    }

    // A start request left next to TWSTO makes the hardware restart the bus
    pub const fn stop(twcr: u8) -> u8 {
        (twcr & !TWSTA) | TWINT | TWSTO
    }

    pub const fn transmit(twcr: u8) -> u8 {
        (twcr & !TWSTA) | TWINT
    }

    pub const fn ack(twcr: u8, ack: bool) -> u8 {
        if ack {
            (twcr & !TWINT) | TWEA
        } else {
            twcr & !(TWINT | TWEA)
        }
    }

    pub const fn receive(twcr: u8) -> u8 {
        (twcr & !TWSTA) | TWINT
    }
}

/// TWSR bits that read back the prescaler instead of the bus status
pub const PRESCALER_MASK: u8 = 0x07;

/// TWI bit-rate prescaler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Prescaler {
    Div1 = 0,
    Div4 = 1,
    Div16 = 2,
    Div64 = 3,
}

impl Prescaler {
    const ALL: [Prescaler; 4] = [Self::Div1, Self::Div4, Self::Div16, Self::Div64];

    /// Division factor applied to the bit rate
    pub const fn factor(self) -> u32 {
        match self {
            Self::Div1 => 1,
            Self::Div4 => 4,
            Self::Div16 => 16,
            Self::Div64 => 64,
        }
    }

    /// Value of the TWPS bits in TWSR
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// Bus clock settings, programmed once when the master is created
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    pub prescaler: Prescaler,
    pub bit_rate: u8,
}

impl ClockConfig {
    pub const fn new(prescaler: Prescaler, bit_rate: u8) -> Self {
        Self {
            prescaler,
            bit_rate,
        }
    }

    /// Pick the smallest prescaler whose bit rate for `scl_hz` fits in TWBR
    ///
    /// Returns `None` when `scl_hz` is faster than `cpu_hz / 16` or too slow
    /// to reach even with the largest prescaler.
    pub fn from_frequency(cpu_hz: u32, scl_hz: u32) -> Option<Self> {
        if scl_hz == 0 {
            return None;
        }
        let ratio = cpu_hz / scl_hz;
        if ratio < 16 {
            return None;
        }

        Prescaler::ALL.iter().find_map(|&prescaler| {
            let bit_rate = (ratio - 16) / (2 * prescaler.factor());
            u8::try_from(bit_rate)
                .ok()
                .map(|bit_rate| Self::new(prescaler, bit_rate))
        })
    }

    /// SCL frequency produced by this configuration
    pub const fn scl_frequency(&self, cpu_hz: u32) -> u32 {
        cpu_hz / (16 + 2 * self.bit_rate as u32 * self.prescaler.factor())
    }
}

/// TWI status codes (master modes)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TwiStatus {
    StartTransmitted,
    RepStartTransmitted,
    AddrWriteAck,
    AddrWriteNack,
    DataWriteAck,
    DataWriteNack,
    ArbitrationLost,
    AddrReadAck,
    AddrReadNack,
    DataReadAck,
    DataReadNack,
    NoInfo,
    BusError,
    /// Any other code, already masked (slave-mode states)
    Other(u8),
}

impl TwiStatus {
    /// Map a masked TWSR value to a status
    pub const fn from_code(code: u8) -> Self {
        match code & !PRESCALER_MASK {
            0x08 => Self::StartTransmitted,
            0x10 => Self::RepStartTransmitted,
            0x18 => Self::AddrWriteAck,
            0x20 => Self::AddrWriteNack,
            0x28 => Self::DataWriteAck,
            0x30 => Self::DataWriteNack,
            0x38 => Self::ArbitrationLost,
            0x40 => Self::AddrReadAck,
            0x48 => Self::AddrReadNack,
            0x50 => Self::DataReadAck,
            0x58 => Self::DataReadNack,
            0xF8 => Self::NoInfo,
            0x00 => Self::BusError,
            other => Self::Other(other),
        }
    }

    /// Raw status code as reported by TWSR
    pub const fn code(self) -> u8 {
        match self {
            Self::StartTransmitted => 0x08,
            Self::RepStartTransmitted => 0x10,
            Self::AddrWriteAck => 0x18,
            Self::AddrWriteNack => 0x20,
            Self::DataWriteAck => 0x28,
            Self::DataWriteNack => 0x30,
            Self::ArbitrationLost => 0x38,
            Self::AddrReadAck => 0x40,
            Self::AddrReadNack => 0x48,
            Self::DataReadAck => 0x50,
            Self::DataReadNack => 0x58,
            Self::NoInfo => 0xF8,
            Self::BusError => 0x00,
            Self::Other(code) => code,
        }
    }
}

/// Strip the prescaler bits from a raw TWSR value
pub const fn decode(raw: u8) -> TwiStatus {
    TwiStatus::from_code(raw & !PRESCALER_MASK)
}

/// Register-level operations of a TWI peripheral
///
/// Each method maps to one access of the control, data, status or bit-rate
/// register. Nothing here waits; blocking is layered on top by [`TwiMaster`].
/// Only the `assert_*` and `trigger_*` methods may write TWINT.
pub trait TwiPeripheral {
    /// Program TWPS and TWBR
    fn configure(&mut self, prescaler: Prescaler, bit_rate: u8);

    /// Enable the peripheral, and its interrupt line if `interrupt` is set
    fn enable(&mut self, interrupt: bool);

    /// Request a (repeated) start condition and kick the transfer
    fn assert_start(&mut self);

    /// Request a stop condition; the hardware clears TWSTO once it is sent
    fn assert_stop(&mut self);

    /// Load TWDR
    fn load_data(&mut self, byte: u8);

    /// Clear the start request and transmit TWDR
    fn trigger_transmit(&mut self);

    /// Set or clear TWEA for the next received byte without starting it
    fn set_ack_enable(&mut self, ack: bool);

    /// Start receiving one byte
    fn trigger_receive(&mut self);

    /// Read TWDR
    fn read_data(&self) -> u8;

    /// TWINT is set once the current step has finished on the bus
    fn is_transfer_complete(&self) -> bool;

    /// Unmasked TWSR
    fn raw_status(&self) -> u8;
}

#[cfg(target_arch = "avr")]
impl TwiPeripheral for avr_device::atmega128a::TWI {
    fn configure(&mut self, prescaler: Prescaler, bit_rate: u8) {
        self.twsr.write(|w| unsafe { w.bits(prescaler.bits()) });
        self.twbr.write(|w| unsafe { w.bits(bit_rate) });
    }

    fn enable(&mut self, interrupt: bool) {
        let ie = if interrupt { TWIE } else { 0 };
        self.twcr.write(|w| unsafe { w.bits(TWEN | ie) });
    }

    fn assert_start(&mut self) {
        self.twcr
            .modify(|r, w| unsafe { w.bits(control::start(r.bits())) });
    }

    fn assert_stop(&mut self) {
        self.twcr
            .modify(|r, w| unsafe { w.bits(control::stop(r.bits())) });
    }

    fn load_data(&mut self, byte: u8) {
        self.twdr.write(|w| unsafe { w.bits(byte) });
    }

    fn trigger_transmit(&mut self) {
        // TWSTA must not stay set or the hardware emits another start
        self.twcr
            .modify(|r, w| unsafe { w.bits(control::transmit(r.bits())) });
    }

    fn set_ack_enable(&mut self, ack: bool) {
        self.twcr
            .modify(|r, w| unsafe { w.bits(control::ack(r.bits(), ack)) });
    }

    fn trigger_receive(&mut self) {
        self.twcr
            .modify(|r, w| unsafe { w.bits(control::receive(r.bits())) });
    }

    fn read_data(&self) -> u8 {
        self.twdr.read().bits()
    }

    fn is_transfer_complete(&self) -> bool {
        self.twcr.read().bits() & TWINT != 0
    }

    fn raw_status(&self) -> u8 {
        self.twsr.read().bits()
    }
}

/// What a transaction leaves on the bus when a step fails
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AbortPolicy {
    /// Return immediately; the bus stays claimed until the caller stops it
    #[default]
    LeaveBus,
    /// Send a stop condition before reporting the failure
    SendStop,
}

/// TWI bus master
pub struct TwiMaster<P> {
    twi: P,
    clock: ClockConfig,
    abort_policy: AbortPolicy,
}

impl<P: TwiPeripheral> TwiMaster<P> {
    /// Configure the peripheral and take ownership of it
    ///
    /// The TWI interrupt is only enabled if a client was registered with
    /// [`register_callback`](crate::hal::register_callback) beforehand.
    pub fn new(mut twi: P, clock: ClockConfig) -> Self {
        critical_section::with(|cs| {
            twi.configure(clock.prescaler, clock.bit_rate);
            twi.enable(interrupt::is_registered_in(cs));
        });
        debug!("twi: init prescaler={} bit_rate={}", clock.prescaler, clock.bit_rate);

        Self {
            twi,
            clock,
            abort_policy: AbortPolicy::default(),
        }
    }

    pub fn with_abort_policy(mut self, policy: AbortPolicy) -> Self {
        self.abort_policy = policy;
        self
    }

    pub fn abort_policy(&self) -> AbortPolicy {
        self.abort_policy
    }

    pub fn clock(&self) -> ClockConfig {
        self.clock
    }

    /// Give the peripheral back
    pub fn release(self) -> P {
        self.twi
    }

    /// Status of the step that just completed
    #[inline]
    pub fn status(&self) -> TwiStatus {
        decode(self.twi.raw_status())
    }

    /// Non-blocking check for the end of the current step
    #[inline]
    pub fn poll_complete(&self) -> nb::Result<(), Infallible> {
        if self.twi.is_transfer_complete() {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Spin until the current step completes; no timeout
    fn wait(&self) {
        nb::block!(self.poll_complete()).unwrap_or_else(|never| match never {})
    }

    /// Send a start condition (or repeated start inside a transaction)
    pub fn start_condition(&mut self) -> TwiStatus {
        self.twi.assert_start();
        self.wait();
        let status = self.status();
        trace!("twi: start -> {}", status);
        status
    }

    /// Send a stop condition without waiting for it
    pub fn stop_condition(&mut self) {
        self.twi.assert_stop();
        trace!("twi: stop");
    }

    /// Transmit one byte (address or data)
    pub fn write_byte(&mut self, byte: u8) -> TwiStatus {
        self.twi.load_data(byte);
        self.twi.trigger_transmit();
        self.wait();
        let status = self.status();
        trace!("twi: write {=u8:#x} -> {}", byte, status);
        status
    }

    /// Receive one byte and acknowledge it
    pub fn read_byte_ack(&mut self) -> (TwiStatus, u8) {
        self.twi.set_ack_enable(true);
        self.twi.trigger_receive();
        self.wait();
        let byte = self.twi.read_data();
        let status = self.status();
        trace!("twi: read ack {=u8:#x} -> {}", byte, status);
        (status, byte)
    }

    /// Receive the final byte without acknowledging it
    pub fn read_byte_nack(&mut self) -> (TwiStatus, u8) {
        self.twi.set_ack_enable(false);
        self.twi.trigger_receive();
        self.wait();
        let byte = self.twi.read_data();
        let status = self.status();
        trace!("twi: read nack {=u8:#x} -> {}", byte, status);
        (status, byte)
    }

    #[cfg(test)]
    pub(crate) fn peripheral(&mut self) -> &mut P {
        &mut self.twi
    }
}
