//! Bus address sniffer

use crate::drivers::transaction::MAX_ADDRESS;
use crate::error::Error;
use crate::hal::{TwiMaster, TwiPeripheral, TwiStatus};

/// Outcome of a sweep over an address window
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScanResult {
    count: u8,
    first: Option<u8>,
}

impl ScanResult {
    /// Number of addresses that acknowledged
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Lowest acknowledging address, `None` when nothing answered
    pub fn first(&self) -> Option<u8> {
        self.first
    }

    fn record(&mut self, address: u8) {
        self.count += 1;
        if self.first.is_none() {
            self.first = Some(address);
        }
    }
}

impl<P: TwiPeripheral> TwiMaster<P> {
    /// Probe every address in `start..end` with an empty write
    ///
    /// A stop is sent after each probe whether or not it was acknowledged.
    /// The sweep is abandoned as soon as a start condition fails, so a broken
    /// bus is reported instead of silently counting nothing.
    pub fn scan(&mut self, start: u8, end: u8) -> Result<ScanResult, Error> {
        if start > end || end > MAX_ADDRESS {
            return Err(Error::InvalidArgument);
        }

        let mut result = ScanResult::default();
        for address in start..end {
            let status = self.start_condition();
            if status != TwiStatus::StartTransmitted {
                warn!("twi: scan aborted at {=u8:#x}: {}", address, status);
                return Err(Error::ScanAborted { observed: status });
            }

            if self.write_byte(address << 1) == TwiStatus::AddrWriteAck {
                debug!("twi: slave at {=u8:#x}", address);
                result.record(address);
            }

            self.stop_condition();
        }

        Ok(result)
    }
}
