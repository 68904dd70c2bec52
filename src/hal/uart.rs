//! Polled USART0 transmitter used by the sniffer console

use avr_device::atmega128a::USART0;
use core::convert::Infallible;

use crate::config::{CPU_FREQ_HZ, UART_BAUD};

const UBRR: u8 = (CPU_FREQ_HZ / (16 * UART_BAUD) - 1) as u8;

// UCSR0A / UCSR0B bits
const UDRE0: u8 = 1 << 5;
const TXEN0: u8 = 1 << 3;
const RXEN0: u8 = 1 << 4;

pub struct Uart {
    usart: USART0,
}

impl Uart {
    /// Set baud rate and enable the transmitter and receiver
    pub fn new(usart: USART0) -> Self {
        usart.ubrr0l.write(|w| unsafe { w.bits(UBRR) });
        usart.ucsr0b.write(|w| unsafe { w.bits(RXEN0 | TXEN0) });

        Self { usart }
    }
}

impl embedded_hal::serial::Write<u8> for Uart {
    type Error = Infallible;

    fn write(&mut self, byte: u8) -> nb::Result<(), Infallible> {
        if self.usart.ucsr0a.read().bits() & UDRE0 == 0 {
            return Err(nb::Error::WouldBlock);
        }
        self.usart.udr0.write(|w| unsafe { w.bits(byte) });
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), Infallible> {
        if self.usart.ucsr0a.read().bits() & UDRE0 == 0 {
            Err(nb::Error::WouldBlock)
        } else {
            Ok(())
        }
    }
}
