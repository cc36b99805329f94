//! Application contexts (modes)
//!
//! A context owns one set of bindings and receives lifecycle callbacks.
//! Before a context type may register, its declared [`Requirements`] are
//! checked against the hardware [`Capabilities`] the app was built with.
//!
//! Only the active context's registry is consulted during dispatch.

pub mod lifecycle;

pub use lifecycle::{ContextPhase, ContextSlot};

use crate::error::AppError;
use crate::hal::ButtonId;
use crate::input::{BindingRegistry, ButtonBinder};
use crate::midi::MidiHandle;
use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use tracing::warn;

/// User-chosen context identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(pub u8);

impl From<u8> for ContextId {
    fn from(id: u8) -> Self {
        ContextId(id)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single hardware capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    Button,
    Encoder,
    Midi,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Button => write!(f, "button input"),
            Capability::Encoder => write!(f, "encoder input"),
            Capability::Midi => write!(f, "MIDI output"),
        }
    }
}

/// What a context type needs. Declared statically, checked once at registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Requirements {
    pub button: bool,
    pub encoder: bool,
    pub midi: bool,
}

impl Requirements {
    pub const NONE: Requirements = Requirements {
        button: false,
        encoder: false,
        midi: false,
    };
}

/// What the configured hardware provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub button: bool,
    pub encoder: bool,
    pub midi: bool,
}

impl Capabilities {
    /// Returns the first unmet requirement, checked in declaration order.
    pub fn missing(&self, requires: &Requirements) -> Option<Capability> {
        [
            (requires.button, self.button, Capability::Button),
            (requires.encoder, self.encoder, Capability::Encoder),
            (requires.midi, self.midi, Capability::Midi),
        ]
        .into_iter()
        .find(|(needed, present, _)| *needed && !*present)
        .map(|(_, _, capability)| capability)
    }

    pub fn check(&self, context: &str, requires: &Requirements) -> Result<(), AppError> {
        match self.missing(requires) {
            Some(capability) => Err(AppError::MissingCapability {
                context: context.to_string(),
                capability,
            }),
            None => Ok(()),
        }
    }
}

/// Lifecycle callbacks of an application mode.
///
/// `update` runs once per tick after gesture dispatch and must not block.
pub trait Context {
    /// Hardware this context type needs.
    fn requirements() -> Requirements
    where
        Self: Sized,
    {
        Requirements::NONE
    }

    /// Builds the bindings. Runs exactly once per activation.
    fn initialize(&mut self, api: &mut ContextApi<'_>) -> Result<(), AppError>;

    fn update(&mut self) {}

    fn cleanup(&mut self) {}

    fn name(&self) -> &str;
}

/// Cloneable handle that queues a context switch for the next tick.
#[derive(Clone, Debug, Default)]
pub struct ContextSwitcher {
    pending: Rc<Cell<Option<ContextId>>>,
}

impl ContextSwitcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests `id` to become active at the start of the next tick. A later
    /// request in the same tick replaces an earlier one.
    pub fn request(&self, id: impl Into<ContextId>) {
        self.pending.set(Some(id.into()));
    }

    pub fn take(&self) -> Option<ContextId> {
        self.pending.take()
    }
}

/// Services available to a context while it initialises.
pub struct ContextApi<'a> {
    context: &'a str,
    registry: &'a mut BindingRegistry,
    midi: Option<MidiHandle>,
    switcher: ContextSwitcher,
    known_buttons: &'a [ButtonId],
}

impl<'a> ContextApi<'a> {
    pub fn new(
        context: &'a str,
        registry: &'a mut BindingRegistry,
        midi: Option<MidiHandle>,
        switcher: ContextSwitcher,
        known_buttons: &'a [ButtonId],
    ) -> Self {
        Self {
            context,
            registry,
            midi,
            switcher,
            known_buttons,
        }
    }

    /// Starts a fluent binding: `api.on_button(1).press().then(|| ...)`.
    pub fn on_button(&mut self, button: ButtonId) -> ButtonBinder<'_> {
        if !self.known_buttons.contains(&button) {
            warn!(
                "Context '{}' binds button {} which is not configured; it will never fire",
                self.context, button
            );
        }
        self.registry.on_button(button)
    }

    /// The MIDI output, when one was configured.
    pub fn midi(&self) -> Option<MidiHandle> {
        self.midi.clone()
    }

    /// Like [`midi`](Self::midi) but reports a missing output as an error.
    pub fn require_midi(&self) -> Result<MidiHandle, AppError> {
        self.midi().ok_or_else(|| AppError::MissingCapability {
            context: self.context.to_string(),
            capability: Capability::Midi,
        })
    }

    pub fn switcher(&self) -> ContextSwitcher {
        self.switcher.clone()
    }

    pub fn binding_count(&self) -> usize {
        self.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: Capabilities = Capabilities {
        button: true,
        encoder: true,
        midi: true,
    };

    #[test]
    fn midi_requirement_needs_midi_capability() {
        let requires = Requirements {
            button: true,
            midi: true,
            ..Requirements::NONE
        };
        let without_midi = Capabilities {
            midi: false,
            ..ALL
        };

        assert_eq!(without_midi.missing(&requires), Some(Capability::Midi));
        assert_eq!(ALL.missing(&requires), None);
    }

    #[test]
    fn unrequested_capabilities_do_not_matter() {
        let requires = Requirements {
            midi: true,
            ..Requirements::NONE
        };
        let caps = Capabilities {
            button: false,
            encoder: false,
            midi: true,
        };
        assert!(caps.check("Main", &requires).is_ok());
    }

    #[test]
    fn first_missing_capability_is_reported() {
        let requires = Requirements {
            button: true,
            encoder: true,
            midi: true,
        };
        let caps = Capabilities::default();
        match caps.check("Main", &requires) {
            Err(AppError::MissingCapability { context, capability }) => {
                assert_eq!(context, "Main");
                assert_eq!(capability, Capability::Button);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn switcher_keeps_latest_request() {
        let switcher = ContextSwitcher::new();
        let handle = switcher.clone();
        handle.request(ContextId(1));
        handle.request(ContextId(2));
        assert_eq!(switcher.take(), Some(ContextId(2)));
        assert_eq!(switcher.take(), None);
    }
}
