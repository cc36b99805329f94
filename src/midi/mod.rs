//! MIDI output capability
//!
//! The engine does not frame MIDI itself. Contexts receive a [`MidiHandle`]
//! and call [`MidiHandle::send_cc`]; the transport behind it decides how the
//! message reaches the wire.

#[cfg(feature = "midir")]
pub mod midir_out;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info};

/// Fire-and-forget control-change sink.
pub trait MidiOutput {
    fn send_cc(&mut self, channel: u8, controller: u8, value: u8);
}

impl<T: MidiOutput + ?Sized> MidiOutput for Box<T> {
    fn send_cc(&mut self, channel: u8, controller: u8, value: u8) {
        (**self).send_cc(channel, controller, value)
    }
}

/// One control-change message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlChange {
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

impl fmt::Display for ControlChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CC ch={} cc={} value={}",
            self.channel, self.controller, self.value
        )
    }
}

/// Shared, cloneable access to the configured output.
///
/// Actions capture a clone; all clones talk to the same transport. The engine
/// is single-threaded, so the handle is `!Send`.
#[derive(Clone)]
pub struct MidiHandle {
    output: Rc<RefCell<Box<dyn MidiOutput>>>,
}

impl MidiHandle {
    pub fn new(output: Box<dyn MidiOutput>) -> Self {
        Self {
            output: Rc::new(RefCell::new(output)),
        }
    }

    /// Sends a control change. The channel is masked to 0-15 and the
    /// controller number and value are clamped to 0-127.
    pub fn send_cc(&self, channel: u8, controller: u8, value: u8) {
        let message = ControlChange {
            channel: channel & 0x0F,
            controller: controller.min(127),
            value: value.min(127),
        };
        debug!("MIDI out: {}", message);
        self.output
            .borrow_mut()
            .send_cc(message.channel, message.controller, message.value);
    }
}

impl fmt::Debug for MidiHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidiHandle").finish_non_exhaustive()
    }
}

/// Writes every message to the log instead of a port.
#[derive(Debug, Default)]
pub struct LogMidiOutput;

impl MidiOutput for LogMidiOutput {
    fn send_cc(&mut self, channel: u8, controller: u8, value: u8) {
        info!("[MIDI] CC ch={} cc={} value={}", channel, controller, value);
    }
}

/// Captures sent messages; clones share the capture buffer.
#[derive(Clone, Debug, Default)]
pub struct MidiRecorder {
    sent: Rc<RefCell<Vec<ControlChange>>>,
}

impl MidiRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<ControlChange> {
        self.sent.borrow().clone()
    }

    pub fn last(&self) -> Option<ControlChange> {
        self.sent.borrow().last().copied()
    }

    pub fn clear(&self) {
        self.sent.borrow_mut().clear();
    }
}

impl MidiOutput for MidiRecorder {
    fn send_cc(&mut self, channel: u8, controller: u8, value: u8) {
        self.sent.borrow_mut().push(ControlChange {
            channel,
            controller,
            value,
        });
    }
}
