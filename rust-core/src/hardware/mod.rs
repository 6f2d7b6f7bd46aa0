//! Hardware boundary: register transport, clock, and a simulated FFT core

pub mod clock;
pub mod registers;
pub mod sim;

pub use clock::{Clock, ManualClock, SystemClock};
pub use sim::{BusAccess, SimulatedFftCore};

use crate::error::BusError;

/// Register-level access to an FFT analyzer IP core
///
/// Reads take `&mut self` because the data port is a FIFO: every read
/// of it consumes a word.
pub trait RegisterBus {
    /// Read an 8-bit register
    fn read_u8(&mut self, address: u32) -> Result<u8, BusError>;

    /// Write an 8-bit register
    fn write_u8(&mut self, address: u32, value: u8) -> Result<(), BusError>;

    /// Read a 32-bit register or data port word
    fn read_u32(&mut self, address: u32) -> Result<u32, BusError>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for &mut B {
    fn read_u8(&mut self, address: u32) -> Result<u8, BusError> {
        (**self).read_u8(address)
    }

    fn write_u8(&mut self, address: u32, value: u8) -> Result<(), BusError> {
        (**self).write_u8(address, value)
    }

    fn read_u32(&mut self, address: u32) -> Result<u32, BusError> {
        (**self).read_u32(address)
    }
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read_u8(&mut self, address: u32) -> Result<u8, BusError> {
        (**self).read_u8(address)
    }

    fn write_u8(&mut self, address: u32, value: u8) -> Result<(), BusError> {
        (**self).write_u8(address, value)
    }

    fn read_u32(&mut self, address: u32) -> Result<u32, BusError> {
        (**self).read_u32(address)
    }
}
