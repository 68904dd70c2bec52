pub mod scanner;
pub mod serial_console;
pub mod transaction;

pub use scanner::ScanResult;
pub use serial_console::SerialConsole;
pub use transaction::MAX_ADDRESS;
