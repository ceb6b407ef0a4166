use crossbeam::channel::{Receiver, TryRecvError};
use midir::{Ignore, MidiInput, MidiInputConnection};
use tracing::{debug, info};

pub const CLIENT_NAME: &str = "setcue";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMidi {
    pub bytes: Vec<u8>,
    /// Driver timestamp in microseconds.
    pub timestamp_us: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub id: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("cannot initialise MIDI input: {0}")]
    Init(String),
    #[error("MIDI port '{wanted}' not found (available: {})", .available.join(", "))]
    PortNotFound {
        wanted: String,
        available: Vec<String>,
    },
    #[error("cannot open MIDI port '{port}': {message}")]
    Connect { port: String, message: String },
}

/// Where the transport gets its MIDI from. `poll` never blocks.
pub trait MidiSource {
    fn poll(&mut self) -> Option<RawMidi>;
}

impl MidiSource for Receiver<RawMidi> {
    fn poll(&mut self) -> Option<RawMidi> {
        match self.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

pub fn list_ports() -> Result<Vec<PortInfo>, MidiError> {
    let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
    Ok(port_infos(&midi_in))
}

fn port_infos(midi_in: &MidiInput) -> Vec<PortInfo> {
    midi_in
        .ports()
        .iter()
        .enumerate()
        .map(|(id, port)| PortInfo {
            name: midi_in.port_name(port).unwrap_or_default(),
            id,
        })
        .collect()
}

/// Exact name first, then a numeric id, then a case-insensitive substring.
/// A blank name never matches.
pub fn find_port<'a>(ports: &'a [PortInfo], wanted: &str) -> Option<&'a PortInfo> {
    let wanted = wanted.trim();
    if wanted.is_empty() {
        return None;
    }
    if let Some(port) = ports.iter().find(|p| p.name == wanted) {
        return Some(port);
    }
    if let Ok(id) = wanted.parse::<usize>() {
        return ports.iter().find(|p| p.id == id);
    }
    let needle = wanted.to_lowercase();
    ports.iter().find(|p| p.name.to_lowercase().contains(&needle))
}

/// A live input port. Messages arrive on the driver's thread and queue up
/// until polled.
pub struct MidirSource {
    rx: Receiver<RawMidi>,
    port_name: String,
    _conn: MidiInputConnection<()>,
}

impl MidirSource {
    pub fn open(wanted: &str) -> Result<Self, MidiError> {
        let mut midi_in =
            MidiInput::new(CLIENT_NAME).map_err(|e| MidiError::Init(e.to_string()))?;
        midi_in.ignore(Ignore::None);

        let infos = port_infos(&midi_in);
        let info = find_port(&infos, wanted).ok_or_else(|| MidiError::PortNotFound {
            wanted: wanted.to_string(),
            available: infos.iter().map(|p| p.name.clone()).collect(),
        })?;
        let port_name = info.name.clone();

        let ports = midi_in.ports();
        let port = ports.get(info.id).ok_or_else(|| MidiError::Connect {
            port: port_name.clone(),
            message: "port disappeared".into(),
        })?;

        let (tx, rx) = crossbeam::channel::unbounded();
        let conn = midi_in
            .connect(
                port,
                "setcue-input",
                move |timestamp, message, _| {
                    let _ = tx.send(RawMidi {
                        bytes: message.to_vec(),
                        timestamp_us: timestamp,
                    });
                },
                (),
            )
            .map_err(|e| MidiError::Connect {
                port: port_name.clone(),
                message: e.to_string(),
            })?;

        info!("listening on MIDI port '{port_name}'");
        Ok(Self {
            rx,
            port_name,
            _conn: conn,
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl MidiSource for MidirSource {
    fn poll(&mut self) -> Option<RawMidi> {
        let msg = self.rx.poll()?;
        debug!("raw MIDI {:02X?} @{}us", msg.bytes, msg.timestamp_us);
        Some(msg)
    }
}
