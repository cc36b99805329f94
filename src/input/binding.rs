//! Binding registry and the fluent registration API
//!
//! ```rust
//! use opencontrol_input::input::{BindingRegistry, InputConfig};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let mut registry = BindingRegistry::new(InputConfig::default());
//! let hits = Rc::new(Cell::new(0));
//! let counter = hits.clone();
//! registry.on_button(1).press().then(move || counter.set(counter.get() + 1));
//! registry.on_button(1).long_press_after(800).then(|| {});
//! assert_eq!(registry.len(), 2);
//! ```
//!
//! Every matching action fires, in registration order. Actions run on the
//! tick's stack: an action that blocks stalls sampling of every button.

use crate::hal::ButtonId;
use crate::input::{Gesture, GestureEvent, GestureKind, InputConfig};
use std::fmt;
use tracing::debug;

/// User callback bound to a gesture.
pub type Action = Box<dyn FnMut()>;

pub struct InputBinding {
    pub button: ButtonId,
    pub kind: GestureKind,
    /// Resolved duration: hold threshold for `LongPress`, window for
    /// `DoubleTap`, `None` for the edge gestures.
    pub duration_ms: Option<u32>,
    action: Action,
}

impl InputBinding {
    fn matches(&self, event: &GestureEvent) -> bool {
        if self.button != event.button {
            return false;
        }
        match (self.kind, event.gesture) {
            (GestureKind::Press, Gesture::Press) => true,
            (GestureKind::Release, Gesture::Release) => true,
            (GestureKind::LongPress, Gesture::LongPress { threshold_ms }) => {
                self.duration_ms == Some(threshold_ms)
            }
            (GestureKind::DoubleTap, Gesture::DoubleTap { gap_ms }) => {
                self.duration_ms.is_some_and(|window| gap_ms <= window)
            }
            _ => false,
        }
    }
}

impl fmt::Debug for InputBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputBinding")
            .field("button", &self.button)
            .field("kind", &self.kind)
            .field("duration_ms", &self.duration_ms)
            .finish_non_exhaustive()
    }
}

/// Ordered bindings of one context.
///
/// Filled during the context's initialisation, read-only while it is active
/// and dropped at cleanup.
pub struct BindingRegistry {
    defaults: InputConfig,
    bindings: Vec<InputBinding>,
}

impl BindingRegistry {
    pub fn new(defaults: InputConfig) -> Self {
        Self {
            defaults,
            bindings: Vec::new(),
        }
    }

    /// Starts a fluent binding for one button.
    pub fn on_button(&mut self, button: ButtonId) -> ButtonBinder<'_> {
        ButtonBinder {
            registry: self,
            button,
        }
    }

    pub fn insert(
        &mut self,
        button: ButtonId,
        kind: GestureKind,
        duration_ms: Option<u32>,
        action: Action,
    ) {
        let duration_ms = match kind {
            GestureKind::Press | GestureKind::Release => None,
            // The classifier never reports a zero-length hold
            GestureKind::LongPress => {
                Some(duration_ms.unwrap_or(self.defaults.long_press_ms).max(1))
            }
            GestureKind::DoubleTap => {
                Some(duration_ms.unwrap_or(self.defaults.double_tap_window_ms))
            }
        };
        debug!(
            "Binding registered: button {} {} {:?}",
            button, kind, duration_ms
        );
        self.bindings.push(InputBinding {
            button,
            kind,
            duration_ms,
            action,
        });
    }

    /// Runs every action matching `event`. Returns how many fired.
    pub fn dispatch(&mut self, event: &GestureEvent) -> usize {
        let mut fired = 0;
        for binding in self.bindings.iter_mut().filter(|b| b.matches(event)) {
            (binding.action)();
            fired += 1;
        }
        fired
    }

    /// Long-press thresholds registered for `button`, duplicates included.
    pub fn hold_thresholds(&self, button: ButtonId) -> impl Iterator<Item = u32> + '_ {
        self.durations(button, GestureKind::LongPress)
    }

    /// Widest double-tap window registered for `button`, if any.
    pub fn double_tap_window(&self, button: ButtonId) -> Option<u32> {
        self.durations(button, GestureKind::DoubleTap).max()
    }

    fn durations(&self, button: ButtonId, kind: GestureKind) -> impl Iterator<Item = u32> + '_ {
        self.bindings
            .iter()
            .filter(move |b| b.button == button && b.kind == kind)
            .filter_map(|b| b.duration_ms)
    }

    pub fn bindings(&self) -> &[InputBinding] {
        &self.bindings
    }

    pub fn defaults(&self) -> InputConfig {
        self.defaults
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("defaults", &self.defaults)
            .field("bindings", &self.bindings)
            .finish()
    }
}

/// Binding builder scoped to one button.
pub struct ButtonBinder<'r> {
    registry: &'r mut BindingRegistry,
    button: ButtonId,
}

impl<'r> ButtonBinder<'r> {
    pub fn press(self) -> GestureBinder<'r> {
        self.gesture(GestureKind::Press, None)
    }

    pub fn release(self) -> GestureBinder<'r> {
        self.gesture(GestureKind::Release, None)
    }

    /// Long press at the configured default threshold.
    pub fn long_press(self) -> GestureBinder<'r> {
        self.gesture(GestureKind::LongPress, None)
    }

    pub fn long_press_after(self, hold_ms: u32) -> GestureBinder<'r> {
        self.gesture(GestureKind::LongPress, Some(hold_ms))
    }

    /// Double tap within the configured default window.
    pub fn double_tap(self) -> GestureBinder<'r> {
        self.gesture(GestureKind::DoubleTap, None)
    }

    pub fn double_tap_within(self, window_ms: u32) -> GestureBinder<'r> {
        self.gesture(GestureKind::DoubleTap, Some(window_ms))
    }

    fn gesture(self, kind: GestureKind, duration_ms: Option<u32>) -> GestureBinder<'r> {
        GestureBinder {
            registry: self.registry,
            button: self.button,
            kind,
            duration_ms,
        }
    }
}

/// Binding builder scoped to one (button, gesture) pair.
pub struct GestureBinder<'r> {
    registry: &'r mut BindingRegistry,
    button: ButtonId,
    kind: GestureKind,
    duration_ms: Option<u32>,
}

impl GestureBinder<'_> {
    /// Moves the action into the registry.
    pub fn then<F>(self, action: F)
    where
        F: FnMut() + 'static,
    {
        self.registry
            .insert(self.button, self.kind, self.duration_ms, Box::new(action));
    }
}
