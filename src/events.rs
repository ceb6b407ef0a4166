use std::fmt;

use serde::{Deserialize, Serialize};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

pub const PITCH_BEND_CENTER: u16 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiCommand {
    NoteOff,
    NoteOn,
    PolyKeyPressure,
    ControlChange,
    ProgramChange,
    ChannelPressure,
    PitchBend,
    SystemMessage,
    Unknown,
}

impl MidiCommand {
    pub fn from_status(status: u8) -> Self {
        match status & 0xF0 {
            0x80 => MidiCommand::NoteOff,
            0x90 => MidiCommand::NoteOn,
            0xA0 => MidiCommand::PolyKeyPressure,
            0xB0 => MidiCommand::ControlChange,
            0xC0 => MidiCommand::ProgramChange,
            0xD0 => MidiCommand::ChannelPressure,
            0xE0 => MidiCommand::PitchBend,
            0xF0 => MidiCommand::SystemMessage,
            _ => MidiCommand::Unknown,
        }
    }
}

/// 1-based MIDI channel, the same convention in config, CLI and decoded
/// events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct MidiChannel(u8);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("MIDI channel must be between 1 and 16, got {0}")]
pub struct InvalidChannel(pub u8);

impl MidiChannel {
    pub fn new(channel: u8) -> Result<Self, InvalidChannel> {
        if (1..=16).contains(&channel) {
            Ok(Self(channel))
        } else {
            Err(InvalidChannel(channel))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for MidiChannel {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u8> for MidiChannel {
    type Error = InvalidChannel;

    fn try_from(channel: u8) -> Result<Self, Self::Error> {
        Self::new(channel)
    }
}

impl From<MidiChannel> for u8 {
    fn from(channel: MidiChannel) -> u8 {
        channel.0
    }
}

impl fmt::Display for MidiChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded channel message. `data` holds the payload after the status
/// byte, or every raw byte when the command is `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiEvent {
    pub command: MidiCommand,
    /// 1..=16
    pub channel: u8,
    pub data: Vec<u8>,
}

impl MidiEvent {
    /// Never fails: anything that doesn't start with a status byte degrades
    /// to `Unknown`.
    pub fn decode(bytes: &[u8]) -> Self {
        let Some(&status) = bytes.first() else {
            return Self {
                command: MidiCommand::Unknown,
                channel: 1,
                data: Vec::new(),
            };
        };

        let command = MidiCommand::from_status(status);
        let channel = (status & 0x0F) + 1;
        let data = match command {
            MidiCommand::Unknown => bytes.to_vec(),
            _ => bytes[1..].to_vec(),
        };

        Self {
            command,
            channel,
            data,
        }
    }

    fn byte(&self, idx: usize) -> Option<u8> {
        self.data.get(idx).copied()
    }

    /// `(note, velocity)` for note messages, `(note, pressure)` for poly pressure.
    pub fn note(&self) -> Option<(u8, u8)> {
        match self.command {
            MidiCommand::NoteOn | MidiCommand::NoteOff | MidiCommand::PolyKeyPressure => {
                Some((self.byte(0)?, self.byte(1)?))
            }
            _ => None,
        }
    }

    /// `(controller, value)`
    pub fn control(&self) -> Option<(u8, u8)> {
        match self.command {
            MidiCommand::ControlChange => Some((self.byte(0)?, self.byte(1)?)),
            _ => None,
        }
    }

    pub fn program(&self) -> Option<u8> {
        match self.command {
            MidiCommand::ProgramChange => self.byte(0),
            _ => None,
        }
    }

    pub fn pressure(&self) -> Option<u8> {
        match self.command {
            MidiCommand::ChannelPressure => self.byte(0),
            _ => None,
        }
    }

    /// Raw 14-bit bend value, centered on [`PITCH_BEND_CENTER`].
    pub fn pitch_bend(&self) -> Option<u16> {
        match self.command {
            MidiCommand::PitchBend => {
                let lsb = self.byte(0)? as u16;
                let msb = self.byte(1)? as u16;
                Some((msb << 7) | lsb)
            }
            _ => None,
        }
    }

    pub fn pitch_bend_offset(&self) -> Option<i16> {
        self.pitch_bend()
            .map(|value| value as i16 - PITCH_BEND_CENTER as i16)
    }

    pub fn describe(&self) -> String {
        let ch = self.channel;
        match self.command {
            MidiCommand::NoteOn | MidiCommand::NoteOff => match self.note() {
                Some((note, velocity))
                    if self.command == MidiCommand::NoteOn && velocity > 0 =>
                {
                    format!("Note ON  ch={ch} note={} vel={velocity}", note_name(note))
                }
                Some((note, velocity)) => {
                    format!("Note OFF ch={ch} note={} vel={velocity}", note_name(note))
                }
                None => self.truncated("Note"),
            },
            MidiCommand::PolyKeyPressure => match self.note() {
                Some((note, pressure)) => {
                    format!("Poly     ch={ch} note={} pressure={pressure}", note_name(note))
                }
                None => self.truncated("Poly"),
            },
            MidiCommand::ControlChange => match self.control() {
                Some((controller, value)) => {
                    format!("CC       ch={ch} ctrl={controller} val={value}")
                }
                None => self.truncated("CC"),
            },
            MidiCommand::ProgramChange => match self.program() {
                Some(program) => format!("Program  ch={ch} program={program}"),
                None => self.truncated("Program"),
            },
            MidiCommand::ChannelPressure => match self.pressure() {
                Some(pressure) => format!("Pressure ch={ch} pressure={pressure}"),
                None => self.truncated("Pressure"),
            },
            MidiCommand::PitchBend => match (self.pitch_bend(), self.pitch_bend_offset()) {
                (Some(value), Some(offset)) => {
                    format!("Bend     ch={ch} val={value} offset={offset:+}")
                }
                _ => self.truncated("Bend"),
            },
            MidiCommand::SystemMessage => format!("System   status=0x{:02X}", 0xF0 | (ch - 1)),
            MidiCommand::Unknown => format!("Raw: {:02X?}", self.data),
        }
    }

    fn truncated(&self, label: &str) -> String {
        format!("{label} ch={} (truncated) {:02X?}", self.channel, self.data)
    }
}

impl fmt::Display for MidiEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// `60` -> `C4`
pub fn note_name(note: u8) -> String {
    let octave = note as i32 / 12 - 1;
    format!("{}{}", NOTE_NAMES[note as usize % 12], octave)
}
