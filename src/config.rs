//! Configuration constants for the TWI sniffer firmware

use crate::hal::{ClockConfig, Prescaler};

/// CPU frequency in Hz
pub const CPU_FREQ_HZ: u32 = 16_000_000;

/// UART baud rate
pub const UART_BAUD: u32 = 38_400;

/// TWI clock used by the sniffer: 16MHz / (16 + 2 * 2 * 1) = 800kHz
pub const TWI_CLOCK: ClockConfig = ClockConfig::new(Prescaler::Div1, 2);

/// First address probed by the sniffer
pub const SCAN_START: u8 = 0x00;

/// End of the sniffed window (exclusive)
pub const SCAN_END: u8 = 0x7F;
