#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;

    use atmega128_twi::application::{Application, InterruptCounter};
    use atmega128_twi::config::{SCAN_END, SCAN_START, TWI_CLOCK, UART_BAUD};
    use atmega128_twi::hal::{register_callback, Uart};
    use atmega128_twi::{SerialConsole, TwiMaster};
    use avr_device::atmega128a::Peripherals;
    use ufmt::uwrite;

    static TWI_INTERRUPTS: InterruptCounter = InterruptCounter::new();

    #[avr_device::entry]
    fn main() -> ! {
        // Only fails if called twice
        let dp = Peripherals::take().unwrap();

        let mut console = SerialConsole::new(Uart::new(dp.USART0));
        uwrite!(console, "Init Done UART baud: {}\r\n", UART_BAUD).ok();

        // Register before init so the TWI interrupt gets enabled
        register_callback(&TWI_INTERRUPTS);
        let mut twi = TwiMaster::new(dp.TWI, TWI_CLOCK);
        unsafe { avr_device::interrupt::enable() };
        console.write_line("TWI init done").ok();

        let mut app = Application::new(&TWI_INTERRUPTS, SCAN_START, SCAN_END);
        app.sniff(&mut twi, &mut console).ok();

        #[allow(clippy::empty_loop)]
        loop {}
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
