use opencontrol_input::hal::{ButtonDef, GpioPin, SimulatedInput};
use opencontrol_input::input::ButtonEngine;
use opencontrol_input::{Gesture, GestureKind, InputConfig};
use proptest::prelude::*;

const BUTTON: ButtonDef = ButtonDef::new(1, GpioPin::mcu(32), true);
const LONG_PRESS: u32 = 500;
const WINDOW: u32 = 300;

/// Plays `(duration_ms, pressed)` segments into a single-button engine ticking
/// every millisecond, then idles long enough for every window to close.
fn play(debounce_ms: u32, segments: &[(u32, bool)]) -> Vec<Gesture> {
    let config = InputConfig {
        long_press_ms: LONG_PRESS,
        double_tap_window_ms: WINDOW,
    };
    let mut engine = ButtonEngine::new(&[BUTTON], debounce_ms, config);
    let mut input = SimulatedInput::new();
    engine.prime(&mut input, 0);

    let mut now = 0u32;
    let mut gestures = Vec::new();
    let tail = [(LONG_PRESS + WINDOW + debounce_ms + 10, false)];
    for &(duration, pressed) in segments.iter().chain(tail.iter()) {
        input.set_pressed(&BUTTON, pressed);
        for _ in 0..duration {
            now += 1;
            engine.poll(now, &mut input, |event| gestures.push(event.gesture));
        }
    }
    gestures
}

fn count(gestures: &[Gesture], kind: GestureKind) -> usize {
    gestures.iter().filter(|g| g.kind() == kind).count()
}

proptest! {
    #[test]
    fn glitches_shorter_than_debounce_are_ignored(
        debounce in 2u32..20,
        glitches in prop::collection::vec((1u32..20, 1u32..50), 1..20),
    ) {
        let mut segments = Vec::new();
        for (glitch, rest) in glitches {
            segments.push((glitch.min(debounce - 1), true));
            segments.push((rest.max(debounce + 1), false));
        }
        prop_assert!(play(debounce, &segments).is_empty());
    }

    #[test]
    fn every_press_reports_one_press_and_one_release(
        debounce in 0u32..10,
        hold in 11u32..2000,
    ) {
        let gestures = play(debounce, &[(20, false), (hold, true)]);
        prop_assert_eq!(count(&gestures, GestureKind::Press), 1);
        prop_assert_eq!(count(&gestures, GestureKind::Release), 1);
        prop_assert_eq!(
            count(&gestures, GestureKind::LongPress),
            usize::from(hold > LONG_PRESS)
        );
        prop_assert_eq!(count(&gestures, GestureKind::DoubleTap), 0);
    }

    #[test]
    fn long_press_precedes_release(hold in (LONG_PRESS + 1)..3000) {
        let gestures = play(5, &[(20, false), (hold, true)]);
        prop_assert_eq!(
            gestures,
            vec![
                Gesture::Press,
                Gesture::LongPress { threshold_ms: LONG_PRESS },
                Gesture::Release,
            ]
        );
    }

    #[test]
    fn double_tap_fires_only_inside_window(
        first in 6u32..LONG_PRESS,
        second in 6u32..LONG_PRESS,
        gap in 6u32..800,
    ) {
        let gestures = play(5, &[(20, false), (first, true), (gap, false), (second, true)]);
        let inside = gap <= WINDOW;

        prop_assert_eq!(count(&gestures, GestureKind::Press), 2);
        prop_assert_eq!(count(&gestures, GestureKind::DoubleTap), usize::from(inside));
        prop_assert_eq!(count(&gestures, GestureKind::Release), if inside { 1 } else { 2 });
        if inside {
            prop_assert_eq!(gestures.last(), Some(&Gesture::DoubleTap { gap_ms: gap }));
        }
    }
}
