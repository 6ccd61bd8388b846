// GPIO access seam. The engine treats pin access as an opaque capability;
// platform backends implement these traits.

use crate::errors::GpioError;

pub mod simulated;

pub use simulated::SimulatedGpio;

/// Logical level of an input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// High is the active (motion / pressed) state
    pub fn is_active(self) -> bool {
        matches!(self, Level::High)
    }
}

/// An opened input pin. Exclusive to the poll task that opened it.
pub trait PinInput: Send + std::fmt::Debug {
    fn read(&mut self) -> Level;
}

/// Factory for input pins
pub trait Gpio: Send + Sync {
    fn open_pin(&self, pin: u8) -> Result<Box<dyn PinInput>, GpioError>;
}
