pub mod interrupt;
pub mod twi;
#[cfg(target_arch = "avr")]
pub mod uart;

// Re-export commonly used types
pub use interrupt::{dispatch, is_registered, register_callback, InterruptClient};
pub use twi::{decode, AbortPolicy, ClockConfig, Prescaler, TwiMaster, TwiPeripheral, TwiStatus};
#[cfg(target_arch = "avr")]
pub use uart::Uart;
