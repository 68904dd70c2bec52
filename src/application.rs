//! Application layer for the TWI sniffer
//! Walks the bus window by window and reports what answers on the console

use core::cell::Cell;

use critical_section::Mutex;
use embedded_hal::serial;
use ufmt::uwrite;

use crate::drivers::SerialConsole;
use crate::hal::{InterruptClient, TwiMaster, TwiPeripheral};

/// Counts TWI interrupts for the sniffer report
pub struct InterruptCounter {
    count: Mutex<Cell<u16>>,
}

impl InterruptCounter {
    pub const fn new() -> Self {
        Self {
            count: Mutex::new(Cell::new(0)),
        }
    }

    pub fn get(&self) -> u16 {
        critical_section::with(|cs| self.count.borrow(cs).get())
    }
}

impl Default for InterruptCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptClient for InterruptCounter {
    fn on_transfer_complete(&self) {
        critical_section::with(|cs| {
            let count = self.count.borrow(cs);
            count.set(count.get().wrapping_add(1));
        });
    }
}

/// Sniffer state
pub struct Application<'a> {
    interrupts: &'a InterruptCounter,
    start: u8,
    end: u8,
}

impl<'a> Application<'a> {
    /// Create new application instance covering `start..end`
    pub fn new(interrupts: &'a InterruptCounter, start: u8, end: u8) -> Self {
        Self {
            interrupts,
            start,
            end,
        }
    }

    /// Scan, report, and move past the first slave until a window is empty
    ///
    /// Returns the number of slaves that were reported.
    pub fn sniff<P, W>(
        &mut self,
        twi: &mut TwiMaster<P>,
        console: &mut SerialConsole<W>,
    ) -> Result<u8, W::Error>
    where
        P: TwiPeripheral,
        W: serial::Write<u8>,
    {
        let mut reported = 0;

        loop {
            let scan = twi.scan(self.start, self.end);

            uwrite!(console, "TWI sniff interval: [")?;
            console.write_addr(self.start)?;
            uwrite!(console, " .. ")?;
            console.write_addr(self.end)?;
            uwrite!(console, "]\r\n")?;

            let result = match scan {
                Ok(result) => result,
                Err(err) => {
                    uwrite!(console, "TWI sniff failed, status: ")?;
                    console.write_addr(err.code())?;
                    uwrite!(console, "\r\n")?;
                    return Ok(reported);
                }
            };

            let Some(first) = result.first() else {
                console.write_line("No slaves found in the interval")?;
                return Ok(reported);
            };

            uwrite!(console, "slaves: {} first slave addr: ", result.count())?;
            console.write_addr(first)?;
            uwrite!(
                console,
                "\r\ntotal number of TWI interrupts: {}\r\n",
                self.interrupts.get()
            )?;

            reported += 1;
            self.start = first + 1;
        }
    }
}
