//! TWI interrupt notification
//!
//! A single client slot shared between setup code and the TWI vector.
//! Register before creating the [`TwiMaster`](crate::hal::TwiMaster): the
//! interrupt line is only enabled if a client is present at that point.

use core::cell::Cell;

use critical_section::{CriticalSection, Mutex};

/// Receiver of TWI transfer-complete interrupts
///
/// Runs on the interrupt path: keep it short and never start bus
/// transfers from it.
pub trait InterruptClient: Sync {
    fn on_transfer_complete(&self);
}

static CLIENT: Mutex<Cell<Option<&'static dyn InterruptClient>>> = Mutex::new(Cell::new(None));

/// Install `client`, replacing any earlier registration
pub fn register_callback(client: &'static dyn InterruptClient) {
    critical_section::with(|cs| CLIENT.borrow(cs).set(Some(client)));
}

/// Whether a client has been registered
pub fn is_registered() -> bool {
    critical_section::with(is_registered_in)
}

pub(crate) fn is_registered_in(cs: CriticalSection) -> bool {
    CLIENT.borrow(cs).get().is_some()
}

/// Forward one interrupt to the registered client, if any
pub fn dispatch() {
    let client = critical_section::with(|cs| CLIENT.borrow(cs).get());
    if let Some(client) = client {
        client.on_transfer_complete();
    }
}

#[cfg(target_arch = "avr")]
#[avr_device::interrupt(atmega128a)]
fn TWI() {
    dispatch();
}
