//! Hardware boundary for the input engine
//!
//! The engine never touches a pin directly. It asks an [`InputSource`] for the
//! raw level of a [`GpioPin`] once per tick and reads the time from a
//! [`Clock`] once per tick. Everything else in the crate is pure state.
//!
//! ```text
//! InputSource ──► raw level ──► Debouncer ──► GestureClassifier
//! Clock ───────► now_ms (u32, wrapping)
//! ```

#[cfg(feature = "rpi")]
pub mod rpi;

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, warn};

/// Logical button identifier, unique per configuration. Zero is reserved.
pub type ButtonId = u8;

/// Where a pin physically lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PinSource {
    /// Directly on the microcontroller
    #[default]
    Mcu,
    /// Behind a multiplexer / port expander
    Mux,
}

/// Opaque physical-source descriptor for one input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GpioPin {
    pub pin: u8,
    #[serde(default)]
    pub source: PinSource,
}

impl GpioPin {
    pub const fn mcu(pin: u8) -> Self {
        Self {
            pin,
            source: PinSource::Mcu,
        }
    }
}

/// Static button definition, created once at configuration time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonDef {
    pub id: ButtonId,
    pub pin: GpioPin,
    /// `true` when the closed switch reads as a low level (pull-up wiring).
    #[serde(default = "default_active_low")]
    pub active_low: bool,
}

fn default_active_low() -> bool {
    true
}

impl ButtonDef {
    pub const fn new(id: ButtonId, pin: GpioPin, active_low: bool) -> Self {
        Self {
            id,
            pin,
            active_low,
        }
    }

    /// Converts a raw pin level into the logical "pressed" level.
    pub fn is_active(&self, raw_high: bool) -> bool {
        raw_high != self.active_low
    }
}

/// Per-tick raw level access, provided by the board support layer.
pub trait InputSource {
    /// Returns `true` when the pin reads high.
    fn read(&mut self, pin: &GpioPin) -> bool;
}

impl<T: InputSource + ?Sized> InputSource for Box<T> {
    fn read(&mut self, pin: &GpioPin) -> bool {
        (**self).read(pin)
    }
}

/// Monotonic millisecond clock. Values wrap at `u32::MAX`; consumers must use
/// `wrapping_sub` for differences.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Wall clock backed by [`Instant`], truncated to `u32` milliseconds.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        // Truncation gives the same wrap behaviour as a hardware millis() counter
        self.start.elapsed().as_millis() as u32
    }
}

/// Hand-driven clock for deterministic tests and simulations.
///
/// Clones share the same time value, so a test can keep one handle while the
/// app owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Rc<Cell<u32>>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    pub fn advance(&self, delta_ms: u32) {
        self.now.set(self.now.get().wrapping_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}

/// Level table standing in for real GPIO.
///
/// Pins that were never set read high, which is the idle level of a pull-up
/// button. Clones share the table and can be moved to another thread (e.g. a
/// stdin reader task in the demo).
#[derive(Clone, Debug, Default)]
pub struct SimulatedInput {
    levels: Arc<RwLock<HashMap<GpioPin, bool>>>,
}

impl SimulatedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the raw level of a pin.
    pub fn set_level(&self, pin: GpioPin, high: bool) {
        match self.levels.write() {
            Ok(mut levels) => {
                levels.insert(pin, high);
            }
            Err(e) => warn!("Simulated input table poisoned: {}", e),
        }
    }

    /// Drives a button to its pressed or released level, honouring polarity.
    pub fn set_pressed(&self, button: &ButtonDef, pressed: bool) {
        debug!("Simulated button {} -> pressed={}", button.id, pressed);
        self.set_level(button.pin, pressed != button.active_low);
    }

    /// Flips the logical state of a button and returns the new pressed state.
    pub fn toggle(&self, button: &ButtonDef) -> bool {
        let mut source = self.clone();
        let pressed = !button.is_active(source.read(&button.pin));
        self.set_pressed(button, pressed);
        pressed
    }
}

impl InputSource for SimulatedInput {
    fn read(&mut self, pin: &GpioPin) -> bool {
        match self.levels.read() {
            Ok(levels) => levels.get(pin).copied().unwrap_or(true),
            Err(_) => true,
        }
    }
}
