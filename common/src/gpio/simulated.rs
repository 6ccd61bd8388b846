// Simulated GPIO backend used in tests and on boards without real pins

use super::{Gpio, Level, PinInput};
use crate::errors::GpioError;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// GPIO controller whose pin levels are driven programmatically.
///
/// Cloning yields another handle to the same pin state, so a test can hold
/// one handle while the engine reads through another.
#[derive(Clone, Default)]
pub struct SimulatedGpio {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    pins: Mutex<HashMap<u8, Arc<AtomicBool>>>,
    failing: Mutex<HashSet<u8>>,
}

impl SimulatedGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive a pin to the given level, creating it if it does not exist yet
    pub fn set_level(&self, pin: u8, level: Level) {
        let cell = self.cell(pin);
        cell.store(level.is_active(), Ordering::SeqCst);
    }

    /// Make subsequent `open_pin` calls for this pin fail
    pub fn fail_pin(&self, pin: u8) {
        let mut failing = self.inner.failing.lock().expect("pin state lock poisoned");
        failing.insert(pin);
    }

    fn cell(&self, pin: u8) -> Arc<AtomicBool> {
        let mut pins = self.inner.pins.lock().expect("pin state lock poisoned");
        Arc::clone(pins.entry(pin).or_default())
    }
}

impl Gpio for SimulatedGpio {
    fn open_pin(&self, pin: u8) -> Result<Box<dyn PinInput>, GpioError> {
        let failing = self.inner.failing.lock().expect("pin state lock poisoned");
        if failing.contains(&pin) {
            return Err(GpioError::OpenFailed {
                pin,
                reason: "simulated open failure".to_string(),
            });
        }
        drop(failing);

        Ok(Box::new(SimulatedPin {
            level: self.cell(pin),
        }))
    }
}

#[derive(Debug)]
struct SimulatedPin {
    level: Arc<AtomicBool>,
}

impl PinInput for SimulatedPin {
    fn read(&mut self) -> Level {
        if self.level.load(Ordering::SeqCst) {
            Level::High
        } else {
            Level::Low
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_starts_low_and_follows_level() {
        let gpio = SimulatedGpio::new();
        let mut pin = gpio.open_pin(17).unwrap();
        assert_eq!(pin.read(), Level::Low);

        gpio.set_level(17, Level::High);
        assert_eq!(pin.read(), Level::High);

        gpio.set_level(17, Level::Low);
        assert_eq!(pin.read(), Level::Low);
    }

    #[test]
    fn test_clones_share_pin_state() {
        let gpio = SimulatedGpio::new();
        let handle = gpio.clone();

        let mut pin = gpio.open_pin(4).unwrap();
        handle.set_level(4, Level::High);
        assert_eq!(pin.read(), Level::High);
    }

    #[test]
    fn test_failing_pin_refuses_to_open() {
        let gpio = SimulatedGpio::new();
        gpio.fail_pin(9);

        let err = gpio.open_pin(9).unwrap_err();
        assert!(matches!(err, GpioError::OpenFailed { pin: 9, .. }));

        // Other pins are unaffected
        assert!(gpio.open_pin(10).is_ok());
    }
}
