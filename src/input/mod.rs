//! Button input subsystem
//!
//! Implements the per-tick pipeline from raw pin levels to user actions:
//!
//! 1. [`debounce`] - glitch suppression, stable logical level
//! 2. [`gesture`] - press / release / long-press / double-tap classification
//! 3. [`binding`] - (button, gesture) → ordered actions, fluent registration
//! 4. [`engine`] - the dispatch loop tying the three together
//!
//! # Architecture
//!
//! ```text
//! raw level ──► Debouncer ──► GestureClassifier ──► GestureEvent ──► BindingRegistry ──► action()
//!                (stable)        (per button)         (transient)       (active context)
//! ```
//!
//! All timing is computed from one clock read per tick. Nothing here blocks
//! or allocates once a context is active.

pub mod binding;
pub mod debounce;
pub mod engine;
pub mod gesture;

pub use binding::{BindingRegistry, ButtonBinder, GestureBinder, InputBinding};
pub use debounce::Debouncer;
pub use engine::ButtonEngine;
pub use gesture::{ClassifierState, GestureClassifier};

use crate::hal::ButtonId;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DEBOUNCE_MS: u32 = 5;
pub const DEFAULT_LONG_PRESS_MS: u32 = 500;
pub const DEFAULT_DOUBLE_TAP_WINDOW_MS: u32 = 300;

/// Process-wide gesture timing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub long_press_ms: u32,
    pub double_tap_window_ms: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            long_press_ms: DEFAULT_LONG_PRESS_MS,
            double_tap_window_ms: DEFAULT_DOUBLE_TAP_WINDOW_MS,
        }
    }
}

/// Gesture vocabulary a binding can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Press,
    Release,
    LongPress,
    DoubleTap,
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureKind::Press => write!(f, "Press"),
            GestureKind::Release => write!(f, "Release"),
            GestureKind::LongPress => write!(f, "LongPress"),
            GestureKind::DoubleTap => write!(f, "DoubleTap"),
        }
    }
}

/// Classified gesture, only valid for the tick that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    Press,
    Release,
    /// Held continuously for `threshold_ms`.
    LongPress { threshold_ms: u32 },
    /// Second short tap; `gap_ms` runs from the first release to the second press.
    DoubleTap { gap_ms: u32 },
}

impl Gesture {
    pub fn kind(&self) -> GestureKind {
        match self {
            Gesture::Press => GestureKind::Press,
            Gesture::Release => GestureKind::Release,
            Gesture::LongPress { .. } => GestureKind::LongPress,
            Gesture::DoubleTap { .. } => GestureKind::DoubleTap,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureEvent {
    pub button: ButtonId,
    pub gesture: Gesture,
}

impl GestureEvent {
    pub fn kind(&self) -> GestureKind {
        self.gesture.kind()
    }
}
