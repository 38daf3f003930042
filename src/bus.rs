//! Hardware seams consumed by the detection core.
//!
//! Electrical timing of 1-Wire transactions is the driver's business; the
//! core only needs a presence check and byte-level transfers, each assumed to
//! block for the duration of one bus transaction.

use core::fmt::Debug;

/// READ ROM: on a single-drop bus the attached token answers with its 64-bit ROM code.
pub const READ_ROM: u8 = 0x33;

/// Single-wire bus master.
pub trait OneWireBus {
    /// Driver error for a failed transaction.
    type Error: Debug;

    /// Descriptor identifying which physical bus to drive (pin, UART, bridge chip ...).
    type Descriptor;

    /// Bring up the bus. Called once from module initialization.
    fn init(&mut self, descriptor: Self::Descriptor) -> Result<(), Self::Error>;

    /// Issue a reset and report whether any token answered with a presence pulse.
    fn presence(&mut self) -> Result<bool, Self::Error>;

    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    fn write_byte(&mut self, byte: u8) -> Result<(), Self::Error>;
}

/// The single indicator output line.
pub trait Indicator {
    fn set(&mut self);

    fn clear(&mut self);
}
