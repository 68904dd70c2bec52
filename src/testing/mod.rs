//! Simulated TWI peripheral for host tests
//!
//! Models the master-side state machine of the hardware closely enough to
//! produce the same status codes: start vs repeated start, address and data
//! acknowledgement, and receiver ACK/NACK. TWCR is kept as a register: a bus
//! step only runs when TWINT is written as one, and TWSTA, TWSTO and TWEA at
//! that moment decide what it does. Slaves are plain 256-byte register files
//! with an auto-incrementing pointer, set by the first written byte.

use std::cell::Cell;
use std::collections::BTreeMap;

use crate::hal::twi::{control, TWEA, TWEN, TWIE, TWINT, TWSTA, TWSTO};
use crate::hal::{Prescaler, TwiPeripheral};

/// One register-level action observed on the simulated peripheral
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Configure { prescaler: Prescaler, bit_rate: u8 },
    Enable { interrupt: bool },
    Start,
    Stop,
    Write(u8),
    ReadAck,
    ReadNack,
}

pub struct Device {
    pub registers: [u8; 256],
    pointer: u8,
}

impl Device {
    fn new() -> Self {
        Self {
            registers: [0; 256],
            pointer: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Idle,
    Started,
    Transmit { address: u8, pointer_set: bool },
    Receive { address: u8 },
    Rejected,
}

pub struct SimTwi {
    pub events: Vec<Event>,
    pub enabled: bool,
    pub interrupt_enabled: bool,
    /// Polls answered with "busy" before each step completes
    pub busy_polls: u32,
    pub polls: Cell<u32>,
    devices: BTreeMap<u8, Device>,
    faults: BTreeMap<usize, u8>,
    phase: Phase,
    prescaler: u8,
    control: u8,
    data: u8,
    status: u8,
    steps: usize,
    pending: Cell<u32>,
}

impl SimTwi {
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            enabled: false,
            interrupt_enabled: false,
            busy_polls: 0,
            polls: Cell::new(0),
            devices: BTreeMap::new(),
            faults: BTreeMap::new(),
            phase: Phase::Idle,
            prescaler: 0,
            control: 0,
            data: 0,
            status: 0xF8,
            steps: 0,
            pending: Cell::new(0),
        }
    }

    pub fn with_devices(addresses: &[u8]) -> Self {
        let mut sim = Self::new();
        for &address in addresses {
            sim.devices.insert(address, Device::new());
        }
        sim
    }

    pub fn device_mut(&mut self, address: u8) -> &mut Device {
        self.devices.entry(address).or_insert_with(Device::new)
    }

    /// Force the raw status of the `step`-th bus step (0-based, stops excluded)
    pub fn fail_step(&mut self, step: usize, raw: u8) {
        self.faults.insert(step, raw);
    }

    /// TWCR as software reads it; TWINT is set while no step is pending
    pub fn read_control(&self) -> u8 {
        if self.pending.get() == 0 {
            self.control | TWINT
        } else {
            self.control
        }
    }

    /// Store a TWCR value and run a bus step if TWINT is written as one
    pub fn write_control(&mut self, value: u8) {
        self.control = value & !TWINT;
        if value & TWINT == 0 {
            return;
        }

        if value & TWSTO != 0 {
            self.events.push(Event::Stop);
            self.phase = Phase::Idle;
            self.control &= !TWSTO;
        }
        if value & TWSTA != 0 {
            self.start();
        } else if value & TWSTO == 0 {
            match self.phase {
                Phase::Receive { address } => self.receive(address, value & TWEA != 0),
                _ => self.transmit(),
            }
        }
    }

    fn complete(&mut self, status: u8) {
        self.status = self.faults.get(&self.steps).copied().unwrap_or(status);
        self.steps += 1;
        self.pending.set(self.busy_polls);
    }

    fn start(&mut self) {
        self.events.push(Event::Start);
        let status = if self.phase == Phase::Idle { 0x08 } else { 0x10 };
        self.phase = Phase::Started;
        self.complete(status);
    }

    fn transmit(&mut self) {
        let byte = self.data;
        self.events.push(Event::Write(byte));

        let status = match self.phase {
            Phase::Started => self.address_byte(byte),
            Phase::Transmit {
                address,
                pointer_set,
            } => {
                let device = self.device_mut(address);
                if pointer_set {
                    device.registers[device.pointer as usize] = byte;
                    device.pointer = device.pointer.wrapping_add(1);
                } else {
                    device.pointer = byte;
                }
                self.phase = Phase::Transmit {
                    address,
                    pointer_set: true,
                };
                0x28
            }
            Phase::Rejected => 0x30,
            Phase::Idle | Phase::Receive { .. } => 0x00,
        };
        self.complete(status);
    }

    fn receive(&mut self, address: u8, ack: bool) {
        self.events
            .push(if ack { Event::ReadAck } else { Event::ReadNack });

        let device = self.device_mut(address);
        let byte = device.registers[device.pointer as usize];
        device.pointer = device.pointer.wrapping_add(1);
        self.data = byte;
        self.complete(if ack { 0x50 } else { 0x58 });
    }

    fn address_byte(&mut self, byte: u8) -> u8 {
        let address = byte >> 1;
        let read = byte & 1 == 1;
        let present = self.devices.contains_key(&address);

        match (present, read) {
            (true, false) => {
                self.phase = Phase::Transmit {
                    address,
                    pointer_set: false,
                };
                0x18
            }
            (true, true) => {
                self.phase = Phase::Receive { address };
                0x40
            }
            (false, false) => {
                self.phase = Phase::Rejected;
                0x20
            }
            (false, true) => {
                self.phase = Phase::Rejected;
                0x48
            }
        }
    }
}

impl TwiPeripheral for SimTwi {
    fn configure(&mut self, prescaler: Prescaler, bit_rate: u8) {
        self.prescaler = prescaler.bits();
        self.events.push(Event::Configure {
            prescaler,
            bit_rate,
        });
    }

    fn enable(&mut self, interrupt: bool) {
        self.enabled = true;
        self.interrupt_enabled = interrupt;
        self.control = TWEN | if interrupt { TWIE } else { 0 };
        self.events.push(Event::Enable { interrupt });
    }

    fn assert_start(&mut self) {
        self.write_control(control::start(self.read_control()));
    }

    fn assert_stop(&mut self) {
        self.write_control(control::stop(self.read_control()));
    }

    fn load_data(&mut self, byte: u8) {
        self.data = byte;
    }

    fn trigger_transmit(&mut self) {
        self.write_control(control::transmit(self.read_control()));
    }

    fn set_ack_enable(&mut self, ack: bool) {
        self.write_control(control::ack(self.read_control(), ack));
    }

    fn trigger_receive(&mut self) {
        self.write_control(control::receive(self.read_control()));
    }

    fn read_data(&self) -> u8 {
        self.data
    }

    fn is_transfer_complete(&self) -> bool {
        self.polls.set(self.polls.get() + 1);
        match self.pending.get() {
            0 => true,
            n => {
                self.pending.set(n - 1);
                false
            }
        }
    }

    fn raw_status(&self) -> u8 {
        self.status | self.prescaler
    }
}
