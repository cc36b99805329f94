//! Hardware/virtual MIDI port output via midir

use super::MidiOutput;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("MIDI init failed: {0}")]
    Init(String),

    #[error("No MIDI output port available")]
    NoPort,

    #[error("No MIDI output port matching '{0}'")]
    PortNotFound(String),

    #[error("MIDI connect failed: {0}")]
    Connect(String),
}

pub struct MidirOutput {
    conn: midir::MidiOutputConnection,
}

impl MidirOutput {
    /// Connects to the first port whose name contains `port_name`, or to the
    /// first port at all when no name is given.
    pub fn connect(client_name: &str, port_name: Option<&str>) -> Result<Self, MidiError> {
        let midi_out =
            midir::MidiOutput::new(client_name).map_err(|e| MidiError::Init(e.to_string()))?;
        let ports = midi_out.ports();

        let port = match port_name {
            Some(wanted) => ports
                .iter()
                .find(|p| {
                    midi_out
                        .port_name(p)
                        .map(|name| name.contains(wanted))
                        .unwrap_or(false)
                })
                .ok_or_else(|| MidiError::PortNotFound(wanted.to_string()))?,
            None => ports.first().ok_or(MidiError::NoPort)?,
        };

        let name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| "<unknown>".to_string());
        let conn = midi_out
            .connect(port, "opencontrol-out")
            .map_err(|e| MidiError::Connect(e.to_string()))?;

        info!("Connected MIDI output to '{}'", name);
        Ok(Self { conn })
    }
}

impl MidiOutput for MidirOutput {
    fn send_cc(&mut self, channel: u8, controller: u8, value: u8) {
        let message = [0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F];
        if let Err(e) = self.conn.send(&message) {
            warn!("Dropped MIDI message {:?}: {}", message, e);
        }
    }
}
