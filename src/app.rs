//! Application orchestrator
//!
//! [`AppBuilder`] collects the hardware configuration, [`OpenControlApp`] owns
//! the engine, the registered contexts and the single active context. The app
//! is an ordinary owned value: create it once, call
//! [`begin`](OpenControlApp::begin), then call
//! [`update`](OpenControlApp::update) once per tick.
//!
//! ```text
//! AppBuilder ──build──► OpenControlApp ──register_context──► (capability gate)
//!                              │
//!                            begin ──► first context: Validated → Initializing → Active
//!                              │
//!                           update ──► [pending switch] → engine tick → context.update()
//! ```

use crate::config::AppConfig;
use crate::context::lifecycle::Active;
use crate::context::{Capabilities, Context, ContextId, ContextSlot, ContextSwitcher};
use crate::error::AppError;
use crate::hal::{ButtonDef, ButtonId, Clock, InputSource, SimulatedInput, SystemClock};
use crate::input::{ButtonEngine, InputConfig, DEFAULT_DEBOUNCE_MS};
use crate::midi::{MidiHandle, MidiOutput};
use std::collections::HashSet;
use tracing::{debug, error, info, trace, warn};

type ContextFactory = Box<dyn Fn() -> Box<dyn Context>>;

struct RegisteredContext {
    id: ContextId,
    name: String,
    factory: ContextFactory,
}

/// Fluent hardware configuration.
pub struct AppBuilder {
    buttons: Vec<ButtonDef>,
    debounce_ms: u32,
    input: InputConfig,
    midi: Option<Box<dyn MidiOutput>>,
    source: Option<Box<dyn InputSource>>,
    clock: Option<Box<dyn Clock>>,
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self {
            buttons: Vec::new(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            input: InputConfig::default(),
            midi: None,
            source: None,
            clock: None,
        }
    }
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds buttons and timing from a config file. MIDI and the input source
    /// still have to be supplied, they depend on the platform.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new()
            .buttons(&config.buttons, config.debounce_ms)
            .input_config(config.input)
    }

    pub fn midi(mut self, output: impl MidiOutput + 'static) -> Self {
        self.midi = Some(Box::new(output));
        self
    }

    pub fn buttons(mut self, defs: &[ButtonDef], debounce_ms: u32) -> Self {
        self.buttons = defs.to_vec();
        self.debounce_ms = debounce_ms;
        self
    }

    pub fn input_config(mut self, input: InputConfig) -> Self {
        self.input = input;
        self
    }

    pub fn input_source(mut self, source: impl InputSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn build(self) -> Result<OpenControlApp, AppError> {
        let mut seen = HashSet::new();
        for button in &self.buttons {
            if button.id == 0 {
                return Err(AppError::InvalidButton(button.id));
            }
            if !seen.insert(button.id) {
                return Err(AppError::DuplicateButton(button.id));
            }
        }
        if self.input.long_press_ms == 0 {
            return Err(AppError::InvalidTiming("long_press_ms must be > 0".into()));
        }
        if self.input.double_tap_window_ms == 0 {
            return Err(AppError::InvalidTiming(
                "double_tap_window_ms must be > 0".into(),
            ));
        }

        let source = match self.source {
            Some(source) => source,
            None if self.buttons.is_empty() => Box::new(SimulatedInput::new()),
            None => return Err(AppError::MissingInputSource),
        };
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(SystemClock::new()));

        let capabilities = Capabilities {
            button: !self.buttons.is_empty(),
            encoder: false,
            midi: self.midi.is_some(),
        };
        info!("Building app with capabilities {:?}", capabilities);

        Ok(OpenControlApp {
            engine: ButtonEngine::new(&self.buttons, self.debounce_ms, self.input),
            button_ids: self.buttons.iter().map(|b| b.id).collect(),
            source,
            clock,
            midi: self.midi.map(MidiHandle::new),
            capabilities,
            input: self.input,
            registered: Vec::new(),
            active: None,
            switcher: ContextSwitcher::new(),
            started: false,
            ticks: 0,
        })
    }
}

/// The application object driving the tick loop.
pub struct OpenControlApp {
    engine: ButtonEngine,
    button_ids: Vec<ButtonId>,
    source: Box<dyn InputSource>,
    clock: Box<dyn Clock>,
    midi: Option<MidiHandle>,
    capabilities: Capabilities,
    input: InputConfig,
    registered: Vec<RegisteredContext>,
    active: Option<ContextSlot<Active>>,
    switcher: ContextSwitcher,
    started: bool,
    ticks: u64,
}

impl OpenControlApp {
    /// Registers a context type after checking its requirements.
    pub fn register_context<C>(&mut self, id: impl Into<ContextId>, name: &str) -> Result<(), AppError>
    where
        C: Context + Default + 'static,
    {
        self.register_context_with(id, name, C::default)
    }

    /// Like [`register_context`](Self::register_context), with an explicit
    /// factory. The factory runs on every activation.
    pub fn register_context_with<C, F>(
        &mut self,
        id: impl Into<ContextId>,
        name: &str,
        factory: F,
    ) -> Result<(), AppError>
    where
        C: Context + 'static,
        F: Fn() -> C + 'static,
    {
        let id = id.into();
        if self.registered.iter().any(|r| r.id == id) {
            return Err(AppError::DuplicateContext(id));
        }

        if let Err(e) = self.capabilities.check(name, &C::requirements()) {
            error!("Refusing to register context {} '{}': {}", id, name, e);
            return Err(e);
        }

        info!("Registered context {} '{}'", id, name);
        self.registered.push(RegisteredContext {
            id,
            name: name.to_string(),
            factory: Box::new(move || -> Box<dyn Context> { Box::new(factory()) }),
        });
        Ok(())
    }

    /// Primes the inputs and activates the first registered context.
    pub fn begin(&mut self) -> Result<(), AppError> {
        if self.started {
            return Err(AppError::AlreadyStarted);
        }
        let first = self.registered.first().map(|r| r.id).ok_or(AppError::NoContext)?;

        let now = self.clock.now_ms();
        self.engine.prime(self.source.as_mut(), now);
        self.activate(first)?;
        self.started = true;
        info!("App started at {}ms", now);
        Ok(())
    }

    /// One tick of the application. Never blocks and never fails.
    pub fn update(&mut self) {
        if !self.started {
            trace!("update() before begin(), ignoring");
            return;
        }

        if let Some(id) = self.switcher.take() {
            if let Err(e) = self.switch_context(id) {
                error!("Requested context switch to {} failed: {}", id, e);
            }
        }

        let now = self.clock.now_ms();
        let Some(active) = self.active.as_mut() else {
            return;
        };
        self.engine
            .update(now, self.source.as_mut(), active.registry_mut());
        active.update();
        self.ticks = self.ticks.wrapping_add(1);
    }

    /// Deactivates the current context and activates `id`. When `id` fails to
    /// initialize, the previous context is activated again and the error is
    /// returned.
    ///
    /// Must be called between ticks; requests made from inside an action go
    /// through [`ContextSwitcher`] instead.
    pub fn switch_context(&mut self, id: impl Into<ContextId>) -> Result<(), AppError> {
        let id = id.into();
        if !self.started {
            return Err(AppError::NotStarted);
        }
        if !self.registered.iter().any(|r| r.id == id) {
            return Err(AppError::UnknownContext(id));
        }
        if self.active.as_ref().map(|a| a.id()) == Some(id) {
            debug!("Context {} already active", id);
            return Ok(());
        }

        let previous = self.active.as_ref().map(|a| a.id());
        self.deactivate();
        if let Err(e) = self.activate(id) {
            if let Some(previous) = previous {
                warn!("Switch to {} failed, restoring context {}", id, previous);
                if let Err(restore) = self.activate(previous) {
                    error!("Context {} could not be restored: {}", previous, restore);
                }
            }
            return Err(e);
        }
        Ok(())
    }

    /// Cleans up the active context. `update` is a no-op afterwards.
    pub fn shutdown(&mut self) {
        if self.started {
            info!("Shutting down after {} ticks", self.ticks);
        }
        self.deactivate();
        self.started = false;
    }

    fn activate(&mut self, id: ContextId) -> Result<(), AppError> {
        let registration = self
            .registered
            .iter()
            .find(|r| r.id == id)
            .ok_or(AppError::UnknownContext(id))?;

        let slot = ContextSlot::create(
            registration.id,
            registration.name.clone(),
            (registration.factory)(),
            self.input,
        );
        let active = slot.begin_initialize().run(
            self.midi.clone(),
            self.switcher.clone(),
            &self.button_ids,
        )?;

        self.engine.arm(active.registry());
        self.active = Some(active);
        Ok(())
    }

    fn deactivate(&mut self) {
        if let Some(active) = self.active.take() {
            let _inactive = active.begin_cleanup().finish();
            self.engine.reset_gestures();
        }
    }

    pub fn active_context(&self) -> Option<(ContextId, &str)> {
        self.active.as_ref().map(|a| (a.id(), a.name()))
    }

    pub fn binding_count(&self) -> usize {
        self.active.as_ref().map(|a| a.binding_count()).unwrap_or(0)
    }

    pub fn is_pressed(&self, button: ButtonId) -> bool {
        self.engine.is_pressed(button)
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn is_running(&self) -> bool {
        self.started
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Handle for queuing a context switch from outside an action.
    pub fn switcher(&self) -> ContextSwitcher {
        self.switcher.clone()
    }
}

impl Drop for OpenControlApp {
    fn drop(&mut self) {
        if self.active.is_some() {
            warn!("App dropped with an active context, cleaning up");
            self.deactivate();
        }
    }
}
