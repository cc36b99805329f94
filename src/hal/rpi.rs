//! Raspberry Pi GPIO input via rppal

use super::{ButtonDef, GpioPin, InputSource, PinSource};
use rppal::gpio::{Gpio, InputPin};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum HalError {
    #[error("GPIO unavailable: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("Pin source {0:?} is not supported on this board")]
    UnsupportedSource(PinSource),
}

/// Reads button levels from the Pi's header pins.
///
/// Active-low buttons get the internal pull-up, active-high ones the pull-down.
pub struct RpiInputSource {
    pins: HashMap<GpioPin, InputPin>,
}

impl RpiInputSource {
    pub fn new(buttons: &[ButtonDef]) -> Result<Self, HalError> {
        let gpio = Gpio::new()?;
        let mut pins = HashMap::with_capacity(buttons.len());

        for button in buttons {
            if button.pin.source != PinSource::Mcu {
                return Err(HalError::UnsupportedSource(button.pin.source));
            }
            let pin = gpio.get(button.pin.pin)?;
            let input = if button.active_low {
                pin.into_input_pullup()
            } else {
                pin.into_input_pulldown()
            };
            debug!(
                "Button {} bound to BCM pin {} (active_low={})",
                button.id, button.pin.pin, button.active_low
            );
            pins.insert(button.pin, input);
        }

        info!("Raspberry Pi input source ready with {} pins", pins.len());
        Ok(Self { pins })
    }
}

impl InputSource for RpiInputSource {
    fn read(&mut self, pin: &GpioPin) -> bool {
        match self.pins.get(pin) {
            Some(input) => input.is_high(),
            None => {
                warn!("Read from unconfigured pin {:?}", pin);
                true
            }
        }
    }
}
