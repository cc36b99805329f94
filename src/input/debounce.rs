//! Time-based debounce filter
//!
//! A level is committed only after the raw input has stayed unchanged for at
//! least the configured duration. Inputs that toggle faster than that never
//! commit.

use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Debouncer {
    /// Raw (polarity-corrected) level seen on the previous tick
    last_raw: bool,
    /// Time the raw level last changed
    candidate_since: u32,
    /// Committed level
    stable: bool,
    /// Time of the last committed transition
    stable_since: u32,
}

impl Debouncer {
    pub fn new(initial: bool, now: u32) -> Self {
        Self {
            last_raw: initial,
            candidate_since: now,
            stable: initial,
            stable_since: now,
        }
    }

    /// Feeds one sample. Returns the new stable level when it changes.
    pub fn update(&mut self, raw: bool, now: u32, debounce_ms: u32) -> Option<bool> {
        if raw != self.last_raw {
            self.last_raw = raw;
            self.candidate_since = now;
        }

        if self.last_raw != self.stable
            && now.wrapping_sub(self.candidate_since) >= debounce_ms
        {
            trace!(
                "Debounce commit {} -> {} after {}ms",
                self.stable,
                self.last_raw,
                now.wrapping_sub(self.candidate_since)
            );
            self.stable = self.last_raw;
            self.stable_since = now;
            return Some(self.stable);
        }

        None
    }

    /// Re-seeds the filter, e.g. with the level read at boot.
    pub fn reset(&mut self, level: bool, now: u32) {
        *self = Self::new(level, now);
    }

    pub fn stable(&self) -> bool {
        self.stable
    }

    pub fn stable_since(&self) -> u32 {
        self.stable_since
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(false, 0)
    }
}
