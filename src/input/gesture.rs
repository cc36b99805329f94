//! Per-button gesture state machine
//!
//! Consumes debounced edges plus the tick time and emits [`Gesture`]s.
//!
//! # State Machine
//!
//! ```text
//!            press                hold ≥ long_press_ms
//!   Idle ───────────► Pressed ─────────────────────────► PressedAwaitingRelease
//!    ▲  ▲               │  ▲                                    │
//!    │  │ 2nd release   │  │ press (within window)              │ release
//!    │  │ (DoubleTap)   │  │                                    │
//!    │  └───────────────┤  │                                    │
//!    │                  │ 1st short release (Release)           │
//!    │                  ▼  │                                    │
//!    │            WaitingForSecondTap                           │
//!    │  window expired  │                                       │
//!    └──────────────────┴───────────────────────────────────────┘
//! ```
//!
//! `Press` is emitted for every physical press. `Release` is emitted for every
//! release except the one closing a double tap, which emits `DoubleTap`
//! instead. `LongPress` fires at most once per threshold per press.

use crate::input::Gesture;
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ClassifierState {
    #[default]
    Idle,
    Pressed,
    /// The global long press already fired for this press
    PressedAwaitingRelease,
    WaitingForSecondTap,
}

#[derive(Clone, Debug)]
pub struct GestureClassifier {
    state: ClassifierState,
    long_press_ms: u32,
    base_window_ms: u32,
    double_tap_window_ms: u32,
    /// Sorted, distinct, non-zero; always contains `long_press_ms`
    hold_thresholds: Vec<u32>,
    next_hold: usize,
    press_started_at: u32,
    /// Short taps awaiting correlation (0 or 1)
    tap_count: u8,
    tap_released_at: u32,
    /// Gap between the first release and the current (second) press
    second_tap_gap: u32,
}

impl GestureClassifier {
    pub fn new(long_press_ms: u32, double_tap_window_ms: u32) -> Self {
        let long_press_ms = long_press_ms.max(1);
        Self {
            state: ClassifierState::Idle,
            long_press_ms,
            base_window_ms: double_tap_window_ms,
            double_tap_window_ms,
            hold_thresholds: vec![long_press_ms],
            next_hold: 0,
            press_started_at: 0,
            tap_count: 0,
            tap_released_at: 0,
            second_tap_gap: 0,
        }
    }

    /// Installs the long-press thresholds and double-tap window bound for this
    /// button. The global long press is always kept, and the window never
    /// shrinks below the global one.
    pub fn arm(&mut self, extra_thresholds: impl IntoIterator<Item = u32>, window_ms: u32) {
        self.hold_thresholds.clear();
        self.hold_thresholds.push(self.long_press_ms);
        self.hold_thresholds
            .extend(extra_thresholds.into_iter().map(|t| t.max(1)));
        self.hold_thresholds.sort_unstable();
        self.hold_thresholds.dedup();
        self.double_tap_window_ms = self.base_window_ms.max(window_ms);
        trace!(
            "Classifier armed: holds={:?} window={}ms",
            self.hold_thresholds,
            self.double_tap_window_ms
        );
    }

    /// Returns to `Idle` and forgets any pending tap, keeping the thresholds.
    pub fn reset(&mut self) {
        self.state = ClassifierState::Idle;
        self.next_hold = 0;
        self.tap_count = 0;
    }

    /// Advances one tick.
    ///
    /// `edge` is `Some(level)` when the debounced level changed this tick.
    pub fn step<F>(&mut self, edge: Option<bool>, now: u32, mut emit: F)
    where
        F: FnMut(Gesture),
    {
        if self.state == ClassifierState::WaitingForSecondTap
            && now.wrapping_sub(self.tap_released_at) > self.double_tap_window_ms
        {
            trace!("Double-tap window expired");
            self.state = ClassifierState::Idle;
            self.tap_count = 0;
        }

        match edge {
            Some(true) => self.on_press(now, &mut emit),
            Some(false) => self.on_release(now, &mut emit),
            None => {}
        }

        if self.is_pressed() {
            self.check_holds(now, &mut emit);
        }
    }

    fn on_press<F: FnMut(Gesture)>(&mut self, now: u32, emit: &mut F) {
        match self.state {
            ClassifierState::Idle => {
                self.tap_count = 0;
            }
            ClassifierState::WaitingForSecondTap => {
                self.second_tap_gap = now.wrapping_sub(self.tap_released_at);
            }
            // Two rising edges in a row cannot come out of the debouncer
            ClassifierState::Pressed | ClassifierState::PressedAwaitingRelease => return,
        }

        emit(Gesture::Press);
        self.press_started_at = now;
        self.next_hold = 0;
        self.state = ClassifierState::Pressed;
    }

    fn on_release<F: FnMut(Gesture)>(&mut self, now: u32, emit: &mut F) {
        match self.state {
            ClassifierState::Pressed => {
                let held = now.wrapping_sub(self.press_started_at);
                if held >= self.long_press_ms {
                    // Released on the very tick the long press would have fired
                    emit(Gesture::Release);
                    self.tap_count = 0;
                    self.state = ClassifierState::Idle;
                } else if self.tap_count == 1 {
                    emit(Gesture::DoubleTap {
                        gap_ms: self.second_tap_gap,
                    });
                    self.tap_count = 0;
                    self.state = ClassifierState::Idle;
                } else {
                    emit(Gesture::Release);
                    self.tap_count = 1;
                    self.tap_released_at = now;
                    self.state = ClassifierState::WaitingForSecondTap;
                }
            }
            ClassifierState::PressedAwaitingRelease => {
                emit(Gesture::Release);
                self.tap_count = 0;
                self.state = ClassifierState::Idle;
            }
            // Press happened before we were watching (boot or context switch)
            ClassifierState::Idle | ClassifierState::WaitingForSecondTap => {}
        }
    }

    fn check_holds<F: FnMut(Gesture)>(&mut self, now: u32, emit: &mut F) {
        let held = now.wrapping_sub(self.press_started_at);
        while let Some(&threshold) = self.hold_thresholds.get(self.next_hold) {
            if held < threshold {
                break;
            }
            self.next_hold += 1;
            emit(Gesture::LongPress {
                threshold_ms: threshold,
            });
        }

        if self.state == ClassifierState::Pressed && held >= self.long_press_ms {
            self.state = ClassifierState::PressedAwaitingRelease;
            self.tap_count = 0;
        }
    }

    pub fn state(&self) -> ClassifierState {
        self.state
    }

    pub fn is_pressed(&self) -> bool {
        matches!(
            self.state,
            ClassifierState::Pressed | ClassifierState::PressedAwaitingRelease
        )
    }

    pub fn hold_thresholds(&self) -> &[u32] {
        &self.hold_thresholds
    }

    pub fn double_tap_window_ms(&self) -> u32 {
        self.double_tap_window_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drives the classifier with a 1ms tick from `start` to `end` (inclusive),
    /// applying level changes at the given times.
    fn drive(
        classifier: &mut GestureClassifier,
        edges: &[(u32, bool)],
        start: u32,
        end: u32,
    ) -> Vec<(u32, Gesture)> {
        let mut out = Vec::new();
        let mut t = start;
        loop {
            let edge = edges.iter().find(|(at, _)| *at == t).map(|(_, l)| *l);
            classifier.step(edge, t, |g| out.push((t, g)));
            if t == end {
                break;
            }
            t = t.wrapping_add(1);
        }
        out
    }

    #[test]
    fn single_short_tap() {
        let mut c = GestureClassifier::new(500, 300);
        let events = drive(&mut c, &[(0, true), (50, false)], 0, 1000);
        assert_eq!(events, vec![(0, Gesture::Press), (50, Gesture::Release)]);
        assert_eq!(c.state(), ClassifierState::Idle);
    }

    #[test]
    fn double_tap_suppresses_second_release() {
        let mut c = GestureClassifier::new(500, 300);
        let events = drive(
            &mut c,
            &[(0, true), (50, false), (100, true), (150, false)],
            0,
            1000,
        );
        assert_eq!(
            events,
            vec![
                (0, Gesture::Press),
                (50, Gesture::Release),
                (100, Gesture::Press),
                (150, Gesture::DoubleTap { gap_ms: 50 }),
            ]
        );
    }

    #[test]
    fn long_press_fires_once_and_blocks_double_tap() {
        let mut c = GestureClassifier::new(500, 300);
        let events = drive(
            &mut c,
            &[(0, true), (700, false), (750, true), (800, false)],
            0,
            2000,
        );
        assert_eq!(
            events,
            vec![
                (0, Gesture::Press),
                (500, Gesture::LongPress { threshold_ms: 500 }),
                (700, Gesture::Release),
                (750, Gesture::Press),
                (800, Gesture::Release),
            ]
        );
    }

    #[test]
    fn second_press_after_window_is_independent() {
        let mut c = GestureClassifier::new(500, 300);
        let events = drive(
            &mut c,
            &[(0, true), (50, false), (351, true), (400, false)],
            0,
            1000,
        );
        let kinds: Vec<Gesture> = events.into_iter().map(|(_, g)| g).collect();
        assert_eq!(
            kinds,
            vec![
                Gesture::Press,
                Gesture::Release,
                Gesture::Press,
                Gesture::Release
            ]
        );
    }

    #[test]
    fn second_press_exactly_at_window_still_counts() {
        let mut c = GestureClassifier::new(500, 300);
        let events = drive(
            &mut c,
            &[(0, true), (50, false), (350, true), (400, false)],
            0,
            1000,
        );
        assert_eq!(events.last(), Some(&(400, Gesture::DoubleTap { gap_ms: 300 })));
    }

    #[test]
    fn long_second_tap_is_a_plain_release() {
        let mut c = GestureClassifier::new(500, 300);
        let events = drive(
            &mut c,
            &[(0, true), (50, false), (100, true), (700, false)],
            0,
            1000,
        );
        let kinds: Vec<Gesture> = events.into_iter().map(|(_, g)| g).collect();
        assert_eq!(
            kinds,
            vec![
                Gesture::Press,
                Gesture::Release,
                Gesture::Press,
                Gesture::LongPress { threshold_ms: 500 },
                Gesture::Release,
            ]
        );
    }

    #[test]
    fn third_tap_starts_a_new_pair() {
        let mut c = GestureClassifier::new(500, 300);
        let events = drive(
            &mut c,
            &[
                (0, true),
                (50, false),
                (100, true),
                (150, false),
                (200, true),
                (250, false),
            ],
            0,
            1000,
        );
        let double_taps = events
            .iter()
            .filter(|(_, g)| matches!(g, Gesture::DoubleTap { .. }))
            .count();
        assert_eq!(double_taps, 1);
        assert_eq!(events.last(), Some(&(250, Gesture::Release)));
    }

    #[test]
    fn armed_thresholds_fire_in_order() {
        let mut c = GestureClassifier::new(500, 300);
        c.arm([1000, 250, 500], 300);
        assert_eq!(c.hold_thresholds(), &[250, 500, 1000]);

        let events = drive(&mut c, &[(0, true), (1200, false)], 0, 1300);
        assert_eq!(
            events,
            vec![
                (0, Gesture::Press),
                (250, Gesture::LongPress { threshold_ms: 250 }),
                (500, Gesture::LongPress { threshold_ms: 500 }),
                (1000, Gesture::LongPress { threshold_ms: 1000 }),
                (1200, Gesture::Release),
            ]
        );
    }

    #[test]
    fn short_hold_threshold_does_not_disqualify_double_tap() {
        let mut c = GestureClassifier::new(500, 300);
        c.arm([100], 300);
        let events = drive(
            &mut c,
            &[(0, true), (150, false), (200, true), (250, false)],
            0,
            600,
        );
        assert_eq!(events.last(), Some(&(250, Gesture::DoubleTap { gap_ms: 50 })));
    }

    #[test]
    fn late_ticks_catch_up_on_holds() {
        let mut c = GestureClassifier::new(500, 300);
        c.arm([200], 300);
        let mut out = Vec::new();
        c.step(Some(true), 0, |g| out.push(g));
        c.step(None, 900, |g| out.push(g));
        assert_eq!(
            out,
            vec![
                Gesture::Press,
                Gesture::LongPress { threshold_ms: 200 },
                Gesture::LongPress { threshold_ms: 500 },
            ]
        );
        assert_eq!(c.state(), ClassifierState::PressedAwaitingRelease);
    }

    #[test]
    fn release_without_tracked_press_is_ignored() {
        let mut c = GestureClassifier::new(500, 300);
        let mut out = Vec::new();
        c.step(Some(false), 10, |g| out.push(g));
        assert!(out.is_empty());
        assert_eq!(c.state(), ClassifierState::Idle);
    }

    #[test]
    fn handles_clock_wraparound() {
        let start = u32::MAX - 100;
        let mut c = GestureClassifier::new(500, 300);
        let events = drive(&mut c, &[(start, true)], start, 450);
        assert_eq!(
            events,
            vec![
                (start, Gesture::Press),
                (399, Gesture::LongPress { threshold_ms: 500 }),
            ]
        );
    }

    #[test]
    fn arm_never_shrinks_window() {
        let mut c = GestureClassifier::new(500, 300);
        c.arm([], 100);
        assert_eq!(c.double_tap_window_ms(), 300);
        c.arm([], 450);
        assert_eq!(c.double_tap_window_ms(), 450);
        c.arm([], 0);
        assert_eq!(c.double_tap_window_ms(), 300);
    }
}
