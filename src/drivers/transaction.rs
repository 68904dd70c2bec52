//! Register and raw transfers built from the bus primitives
//!
//! Every step is checked against the single status the protocol expects at
//! that point. The first mismatch ends the transfer and is returned as
//! [`Error::Protocol`]; whether a stop follows depends on the
//! [`AbortPolicy`](crate::hal::AbortPolicy).

use embedded_hal::blocking::i2c;

use crate::error::Error;
use crate::hal::{AbortPolicy, TwiMaster, TwiPeripheral, TwiStatus};

/// Largest 7-bit slave address
pub const MAX_ADDRESS: u8 = 0x7F;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Write = 0,
    Read = 1,
}

impl<P: TwiPeripheral> TwiMaster<P> {
    /// Read `buffer.len()` consecutive registers starting at `register`
    pub fn read_register_burst(
        &mut self,
        address: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        self.transmit_receive(address, &[register], buffer)
    }

    /// Write one register
    pub fn write_register(&mut self, address: u8, register: u8, data: u8) -> Result<(), Error> {
        self.transmit(address, &[register, data])
    }

    /// START, SLA+W, `bytes`, STOP
    pub fn transmit(&mut self, address: u8, bytes: &[u8]) -> Result<(), Error> {
        check_address(address)?;
        let result = self
            .address(address, Direction::Write, false)
            .and_then(|_| self.send_payload(bytes));
        self.finish(address, result)
    }

    /// START, SLA+R, read into `buffer`, STOP
    pub fn receive(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Error> {
        check_address(address)?;
        if buffer.is_empty() {
            return Err(Error::InvalidArgument);
        }
        let result = self
            .address(address, Direction::Read, false)
            .and_then(|_| self.fill(buffer));
        self.finish(address, result)
    }

    /// START, SLA+W, `bytes`, repeated START, SLA+R, read into `buffer`, STOP
    pub fn transmit_receive(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), Error> {
        check_address(address)?;
        if buffer.is_empty() {
            return Err(Error::InvalidArgument);
        }
        let result = self
            .address(address, Direction::Write, false)
            .and_then(|_| self.send_payload(bytes))
            .and_then(|_| self.address(address, Direction::Read, true))
            .and_then(|_| self.fill(buffer));
        self.finish(address, result)
    }

    fn address(&mut self, address: u8, direction: Direction, repeated: bool) -> Result<(), Error> {
        let started = if repeated {
            TwiStatus::RepStartTransmitted
        } else {
            TwiStatus::StartTransmitted
        };
        let status = self.start_condition();
        expect(status, started)?;

        let acked = match direction {
            Direction::Write => TwiStatus::AddrWriteAck,
            Direction::Read => TwiStatus::AddrReadAck,
        };
        let status = self.write_byte(address << 1 | direction as u8);
        expect(status, acked)
    }

    fn send_payload(&mut self, bytes: &[u8]) -> Result<(), Error> {
        for &byte in bytes {
            let status = self.write_byte(byte);
            expect(status, TwiStatus::DataWriteAck)?;
        }
        Ok(())
    }

    // Every byte but the last is acknowledged
    fn fill(&mut self, buffer: &mut [u8]) -> Result<(), Error> {
        let Some((last, head)) = buffer.split_last_mut() else {
            return Err(Error::InvalidArgument);
        };
        for slot in head {
            let (status, byte) = self.read_byte_ack();
            expect(status, TwiStatus::DataReadAck)?;
            *slot = byte;
        }
        let (status, byte) = self.read_byte_nack();
        expect(status, TwiStatus::DataReadNack)?;
        *last = byte;
        Ok(())
    }

    fn finish(&mut self, address: u8, result: Result<(), Error>) -> Result<(), Error> {
        match result {
            Ok(()) => self.stop_condition(),
            Err(err) => {
                warn!("twi: transfer to {=u8:#x} aborted: {}", address, err);
                if self.abort_policy() == AbortPolicy::SendStop {
                    self.stop_condition();
                }
            }
        }
        result
    }
}

/// Compare a step's status against the one the protocol requires
fn expect(observed: TwiStatus, expected: TwiStatus) -> Result<(), Error> {
    if observed == expected {
        Ok(())
    } else {
        Err(Error::Protocol { expected, observed })
    }
}

fn check_address(address: u8) -> Result<(), Error> {
    if address > MAX_ADDRESS {
        Err(Error::InvalidArgument)
    } else {
        Ok(())
    }
}

impl<P: TwiPeripheral> i2c::Write for TwiMaster<P> {
    type Error = Error;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), Error> {
        self.transmit(address, bytes)
    }
}

impl<P: TwiPeripheral> i2c::Read for TwiMaster<P> {
    type Error = Error;

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> Result<(), Error> {
        self.receive(address, buffer)
    }
}

impl<P: TwiPeripheral> i2c::WriteRead for TwiMaster<P> {
    type Error = Error;

    fn write_read(&mut self, address: u8, bytes: &[u8], buffer: &mut [u8]) -> Result<(), Error> {
        self.transmit_receive(address, bytes, buffer)
    }
}
