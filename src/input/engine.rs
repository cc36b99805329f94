//! Dispatch loop
//!
//! Owns one [`ButtonRuntime`] per configured button and advances all of them
//! once per tick: sample → debounce → classify → dispatch.

use crate::hal::{ButtonDef, ButtonId, InputSource};
use crate::input::{
    BindingRegistry, Debouncer, GestureClassifier, GestureEvent, InputConfig,
};
use tracing::{debug, info};

/// Mutable per-button state, owned exclusively by the engine.
#[derive(Clone, Debug)]
pub struct ButtonRuntime {
    def: ButtonDef,
    debouncer: Debouncer,
    classifier: GestureClassifier,
}

impl ButtonRuntime {
    fn new(def: ButtonDef, config: &InputConfig) -> Self {
        Self {
            def,
            debouncer: Debouncer::default(),
            classifier: GestureClassifier::new(config.long_press_ms, config.double_tap_window_ms),
        }
    }

    pub fn def(&self) -> &ButtonDef {
        &self.def
    }

    pub fn debouncer(&self) -> &Debouncer {
        &self.debouncer
    }

    pub fn classifier(&self) -> &GestureClassifier {
        &self.classifier
    }
}

pub struct ButtonEngine {
    buttons: Vec<ButtonRuntime>,
    debounce_ms: u32,
    config: InputConfig,
}

impl ButtonEngine {
    pub fn new(defs: &[ButtonDef], debounce_ms: u32, config: InputConfig) -> Self {
        info!(
            "Creating button engine: {} buttons, debounce={}ms, long_press={}ms, double_tap={}ms",
            defs.len(),
            debounce_ms,
            config.long_press_ms,
            config.double_tap_window_ms
        );
        Self {
            buttons: defs
                .iter()
                .map(|def| ButtonRuntime::new(*def, &config))
                .collect(),
            debounce_ms,
            config,
        }
    }

    /// Seeds every debouncer with the level read right now, so a button held
    /// at start-up does not produce a press.
    pub fn prime(&mut self, source: &mut dyn InputSource, now: u32) {
        for button in &mut self.buttons {
            let level = button.def.is_active(source.read(&button.def.pin));
            button.debouncer.reset(level, now);
            button.classifier.reset();
            if level {
                debug!("Button {} held at start-up, ignored until released", button.def.id);
            }
        }
    }

    /// Installs the thresholds and windows the registry asks for on each button.
    pub fn arm(&mut self, registry: &BindingRegistry) {
        for button in &mut self.buttons {
            let id = button.def.id;
            let window = registry.double_tap_window(id).unwrap_or(0);
            button.classifier.arm(registry.hold_thresholds(id), window);
        }
    }

    /// Drops any half-finished gesture. Debounced levels are kept.
    pub fn reset_gestures(&mut self) {
        for button in &mut self.buttons {
            button.classifier.reset();
        }
    }

    /// One tick: samples every button and dispatches gestures to `registry`.
    /// Returns the number of gestures produced.
    pub fn update(
        &mut self,
        now: u32,
        source: &mut dyn InputSource,
        registry: &mut BindingRegistry,
    ) -> usize {
        self.poll(now, source, |event| {
            let fired = registry.dispatch(&event);
            debug!(
                "Button {} {:?} -> {} action(s)",
                event.button, event.gesture, fired
            );
        })
    }

    /// One tick without a registry; gestures go to `sink`.
    pub fn poll<F>(&mut self, now: u32, source: &mut dyn InputSource, mut sink: F) -> usize
    where
        F: FnMut(GestureEvent),
    {
        let debounce_ms = self.debounce_ms;
        let mut produced = 0;
        for button in &mut self.buttons {
            let raw = button.def.is_active(source.read(&button.def.pin));
            let edge = button.debouncer.update(raw, now, debounce_ms);
            let id = button.def.id;
            button.classifier.step(edge, now, |gesture| {
                produced += 1;
                sink(GestureEvent { button: id, gesture });
            });
        }
        produced
    }

    pub fn is_pressed(&self, button: ButtonId) -> bool {
        self.runtime(button)
            .map(|b| b.debouncer.stable())
            .unwrap_or(false)
    }

    pub fn runtime(&self, button: ButtonId) -> Option<&ButtonRuntime> {
        self.buttons.iter().find(|b| b.def.id == button)
    }

    pub fn contains(&self, button: ButtonId) -> bool {
        self.runtime(button).is_some()
    }

    pub fn button_count(&self) -> usize {
        self.buttons.len()
    }

    pub fn config(&self) -> InputConfig {
        self.config
    }

    pub fn debounce_ms(&self) -> u32 {
        self.debounce_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{GpioPin, SimulatedInput};
    use crate::input::{Gesture, GestureKind};
    use std::cell::RefCell;
    use std::rc::Rc;

    const B1: ButtonDef = ButtonDef::new(1, GpioPin::mcu(32), true);
    const B2: ButtonDef = ButtonDef::new(2, GpioPin::mcu(35), false);

    fn engine() -> (ButtonEngine, SimulatedInput) {
        let input = SimulatedInput::new();
        input.set_pressed(&B1, false);
        input.set_pressed(&B2, false);
        let mut engine = ButtonEngine::new(&[B1, B2], 5, InputConfig::default());
        engine.prime(&mut input.clone(), 0);
        (engine, input)
    }

    /// Ticks every millisecond up to `end`, applying physical changes on the way.
    fn run(
        engine: &mut ButtonEngine,
        input: &SimulatedInput,
        changes: &[(u32, ButtonDef, bool)],
        end: u32,
    ) -> Vec<(u32, GestureEvent)> {
        let mut out = Vec::new();
        let mut source = input.clone();
        for t in 0..=end {
            for (_, def, pressed) in changes.iter().filter(|(at, _, _)| *at == t) {
                input.set_pressed(def, *pressed);
            }
            engine.poll(t, &mut source, |e| out.push((t, e)));
        }
        out
    }

    #[test]
    fn tap_is_reported_after_debounce() {
        let (mut engine, input) = engine();
        let events = run(&mut engine, &input, &[(0, B1, true), (50, B1, false)], 600);
        assert_eq!(
            events,
            vec![
                (5, GestureEvent { button: 1, gesture: Gesture::Press }),
                (55, GestureEvent { button: 1, gesture: Gesture::Release }),
            ]
        );
    }

    #[test]
    fn polarity_is_per_button() {
        let (mut engine, input) = engine();
        let events = run(&mut engine, &input, &[(0, B2, true)], 10);
        assert_eq!(
            events,
            vec![(5, GestureEvent { button: 2, gesture: Gesture::Press })]
        );
        assert!(engine.is_pressed(2));
        assert!(!engine.is_pressed(1));
    }

    #[test]
    fn held_at_boot_is_ignored() {
        let input = SimulatedInput::new();
        input.set_pressed(&B1, true);
        let mut engine = ButtonEngine::new(&[B1], 5, InputConfig::default());
        engine.prime(&mut input.clone(), 0);

        let events = run(&mut engine, &input, &[(100, B1, false)], 1000);
        assert!(events.is_empty());
    }

    #[test]
    fn update_dispatches_into_registry() {
        let (mut engine, input) = engine();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut registry = BindingRegistry::new(InputConfig::default());
        for kind in [GestureKind::Press, GestureKind::Release] {
            let log = log.clone();
            registry.insert(1, kind, None, Box::new(move || log.borrow_mut().push(kind)));
        }
        engine.arm(&registry);

        let mut source = input.clone();
        input.set_pressed(&B1, true);
        for t in 0..=10 {
            engine.update(t, &mut source, &mut registry);
        }
        input.set_pressed(&B1, false);
        for t in 11..=20 {
            engine.update(t, &mut source, &mut registry);
        }

        assert_eq!(*log.borrow(), vec![GestureKind::Press, GestureKind::Release]);
    }

    #[test]
    fn arm_installs_registry_thresholds() {
        let (mut engine, _input) = engine();
        let mut registry = BindingRegistry::new(InputConfig::default());
        registry.on_button(1).long_press_after(1200).then(|| {});
        registry.on_button(2).double_tap_within(450).then(|| {});
        engine.arm(&registry);

        let b1 = engine.runtime(1).map(|b| b.classifier().hold_thresholds().to_vec());
        assert_eq!(b1, Some(vec![500, 1200]));
        let b2 = engine.runtime(2).map(|b| b.classifier().double_tap_window_ms());
        assert_eq!(b2, Some(450));
    }
}
