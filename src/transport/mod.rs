mod player;
mod state_machine;
mod vlc;

pub use player::{
    DryRunPlayer, MediaPlayer, MediaRequest, PlayerCommand, PlayerContext, PlayerError,
};
pub use state_machine::{Reaction, TransportSettings, TransportStateMachine};
pub use vlc::VlcRemote;

pub fn vlc_default_command() -> Vec<String> {
    vlc::DEFAULT_COMMAND.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
pub(crate) use player::recording::RecordingPlayer;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportMode {
    /// Play always (re)starts; pausing needs its own button.
    PlayOnly,
    /// One button alternates play and pause, like LivePrompter's.
    #[default]
    Toggle,
}

/// Which Control Change byte carries the transport code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportCode {
    #[default]
    Value,
    Controller,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransportStatus {
    #[default]
    Paused,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportAction {
    PlayPause,
    Pause,
    Up,
    Down,
    Reset,
}

impl TransportAction {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            2 => Some(TransportAction::PlayPause),
            3 => Some(TransportAction::Pause),
            4 => Some(TransportAction::Up),
            5 => Some(TransportAction::Down),
            9 => Some(TransportAction::Reset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportState {
    pub mode: TransportMode,
    pub status: TransportStatus,
    /// Key of the last successfully armed setlist entry.
    pub current_index: Option<i64>,
}
