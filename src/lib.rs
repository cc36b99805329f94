//! Button input engine for a MIDI controller
//!
//! Raw pin levels are debounced, classified into gestures (press, release,
//! long press, double tap) and dispatched to actions registered by the active
//! application context.
//!
//! ```no_run
//! use opencontrol_input::{AppBuilder, AppError, Context, ContextApi, ContextId, Requirements};
//! use opencontrol_input::hal::{ButtonDef, GpioPin, SimulatedInput};
//! use opencontrol_input::midi::LogMidiOutput;
//!
//! #[derive(Default)]
//! struct Main;
//!
//! impl Context for Main {
//!     fn requirements() -> Requirements {
//!         Requirements { button: true, encoder: false, midi: true }
//!     }
//!
//!     fn initialize(&mut self, api: &mut ContextApi<'_>) -> Result<(), AppError> {
//!         let midi = api.require_midi()?;
//!         api.on_button(1).press().then(move || midi.send_cc(0, 20, 127));
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &str {
//!         "Main"
//!     }
//! }
//!
//! # fn main() -> Result<(), AppError> {
//! let buttons = [ButtonDef::new(1, GpioPin::mcu(32), true)];
//! let mut app = AppBuilder::new()
//!     .buttons(&buttons, 5)
//!     .input_source(SimulatedInput::new())
//!     .midi(LogMidiOutput)
//!     .build()?;
//! app.register_context::<Main>(ContextId(0), "Main")?;
//! app.begin()?;
//! loop {
//!     app.update();
//! }
//! # }
//! ```

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod hal;
pub mod input;
pub mod midi;

pub use app::{AppBuilder, OpenControlApp};
pub use config::{AppConfig, ConfigError, MidiConfig};
pub use context::{
    Capabilities, Capability, Context, ContextApi, ContextId, ContextSwitcher, Requirements,
};
pub use error::{AppError, ErrorCode};
pub use input::{Gesture, GestureEvent, GestureKind, InputConfig};
