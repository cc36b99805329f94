//! Context lifecycle with statum typestates
//!
//! Each activation of a context walks through these phases exactly once. The
//! compiler enforces the order; a slot can only be updated while `Active`.
//!
//! ```text
//! Validated ──► Initializing ──► Active ──► CleaningUp ──► Inactive
//!                    │
//!                    └── initialize() failed: slot dropped
//! ```
//!
//! `Unregistered` has no slot at all: a context type only gets one after the
//! capability check in [`OpenControlApp::register_context`](crate::app::OpenControlApp::register_context).

use crate::context::{Context, ContextApi, ContextId, ContextSwitcher};
use crate::error::AppError;
use crate::hal::ButtonId;
use crate::input::{BindingRegistry, InputConfig};
use crate::midi::MidiHandle;
use statum::{machine, state};
use tracing::{debug, error, info};

#[state]
#[derive(Debug, Clone)]
pub enum ContextPhase {
    Validated,    // Requirements checked, instance created
    Initializing, // Building bindings
    Active,       // Receiving ticks
    CleaningUp,   // cleanup() running
    Inactive,     // Bindings discarded
}

/// One activation of a context together with its binding registry.
#[machine]
pub struct ContextSlot<S: ContextPhase> {
    id: ContextId,
    name: String,
    context: Box<dyn Context>,
    registry: BindingRegistry,
}

impl<S: ContextPhase> ContextSlot<S> {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding_count(&self) -> usize {
        self.registry.len()
    }
}

impl ContextSlot<Validated> {
    pub fn create(
        id: ContextId,
        name: String,
        context: Box<dyn Context>,
        defaults: InputConfig,
    ) -> Self {
        debug!("Creating context slot {} '{}'", id, name);
        Self::new(id, name, context, BindingRegistry::new(defaults))
    }

    pub fn begin_initialize(self) -> ContextSlot<Initializing> {
        info!("Initializing context {} '{}'", self.id, self.name);
        self.transition()
    }
}

impl ContextSlot<Initializing> {
    /// Lets the context build its bindings and transitions to `Active`.
    pub fn run(
        mut self,
        midi: Option<MidiHandle>,
        switcher: ContextSwitcher,
        known_buttons: &[ButtonId],
    ) -> Result<ContextSlot<Active>, AppError> {
        let result = {
            let mut api = ContextApi::new(
                &self.name,
                &mut self.registry,
                midi,
                switcher,
                known_buttons,
            );
            self.context.initialize(&mut api)
        };

        match result {
            Ok(()) => {
                info!(
                    "Context {} '{}' active with {} binding(s)",
                    self.id,
                    self.name,
                    self.registry.len()
                );
                Ok(self.transition())
            }
            Err(e) => {
                error!("Context {} '{}' failed to initialize: {}", self.id, self.name, e);
                Err(AppError::ContextInitFailed {
                    context: self.name.clone(),
                    source: Box::new(e),
                })
            }
        }
    }
}

impl ContextSlot<Active> {
    pub fn registry(&self) -> &BindingRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut BindingRegistry {
        &mut self.registry
    }

    /// Per-tick context callback, after dispatch.
    pub fn update(&mut self) {
        self.context.update();
    }

    pub fn begin_cleanup(self) -> ContextSlot<CleaningUp> {
        info!("Deactivating context {} '{}'", self.id, self.name);
        self.transition()
    }
}

impl ContextSlot<CleaningUp> {
    /// Runs `cleanup()` and discards the bindings.
    pub fn finish(mut self) -> ContextSlot<Inactive> {
        self.context.cleanup();
        let dropped = self.registry.len();
        self.registry.clear();
        info!(
            "Context {} '{}' inactive, {} binding(s) discarded",
            self.id, self.name, dropped
        );
        self.transition()
    }
}
