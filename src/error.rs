//! TWI driver errors

use crate::hal::TwiStatus;

/// Error returned by bus transactions and scans
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A bus step reported a different status than the protocol expects
    Protocol {
        expected: TwiStatus,
        observed: TwiStatus,
    },
    /// A scan probe could not put a start condition on the bus
    ScanAborted { observed: TwiStatus },
    /// Rejected before the bus was touched
    InvalidArgument,
}

impl Error {
    /// Sentinel reported for invalid arguments and aborted scans
    pub const SENTINEL: u8 = 0xFF;

    /// Status code of the failing step, or [`Error::SENTINEL`]
    pub fn code(&self) -> u8 {
        match self {
            Error::Protocol { observed, .. } => observed.code(),
            Error::ScanAborted { .. } | Error::InvalidArgument => Self::SENTINEL,
        }
    }

    /// Status the bus actually reported, if a bus step failed
    pub fn observed(&self) -> Option<TwiStatus> {
        match self {
            Error::Protocol { observed, .. } | Error::ScanAborted { observed } => Some(*observed),
            Error::InvalidArgument => None,
        }
    }
}
