use std::path::{Path, PathBuf};

use tracing::info;

use crate::setlist::{ResolvedEntry, Timecode};

#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    #[error("failed to start media engine `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("media engine is not accepting commands: {0}")]
    Io(#[from] std::io::Error),
    #[error("media engine has exited")]
    Exited,
    #[error("path {} cannot be sent to the media engine", .0.display())]
    UnsupportedPath(PathBuf),
}

/// What to load into the media engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRequest {
    pub path: PathBuf,
    /// Percent
    pub play_speed: u32,
    pub start_time: Timecode,
    pub end_time: Timecode,
}

impl MediaRequest {
    /// Full length at normal speed.
    pub fn plain(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            play_speed: 100,
            start_time: Timecode::ZERO,
            end_time: Timecode::MAX,
        }
    }
}

impl From<&ResolvedEntry> for MediaRequest {
    fn from(entry: &ResolvedEntry) -> Self {
        Self {
            path: entry.path.clone(),
            play_speed: entry.play_speed,
            start_time: entry.start_time,
            end_time: entry.end_time,
        }
    }
}

/// The media engine the transport drives.
pub trait MediaPlayer {
    fn load(&mut self, media: &MediaRequest) -> Result<(), PlayerError>;
    fn play(&mut self) -> Result<(), PlayerError>;
    fn pause(&mut self) -> Result<(), PlayerError>;
    /// Stops and rewinds to the start of the loaded media.
    fn stop(&mut self) -> Result<(), PlayerError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    Load(MediaRequest),
    Play,
    Pause,
    Stop,
}

/// The single media engine handle, owned by whoever runs the transport.
pub struct PlayerContext<P> {
    player: P,
    loaded: Option<PathBuf>,
}

impl<P: MediaPlayer> PlayerContext<P> {
    pub fn new(player: P) -> Self {
        Self {
            player,
            loaded: None,
        }
    }

    pub fn apply(&mut self, command: &PlayerCommand) -> Result<(), PlayerError> {
        match command {
            PlayerCommand::Load(media) => {
                self.player.load(media)?;
                self.loaded = Some(media.path.clone());
                Ok(())
            }
            PlayerCommand::Play => self.player.play(),
            PlayerCommand::Pause => self.player.pause(),
            PlayerCommand::Stop => self.player.stop(),
        }
    }

    pub fn loaded(&self) -> Option<&Path> {
        self.loaded.as_deref()
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }
}

/// Logs every call instead of playing anything. Handy for checking a
/// controller mapping without a media engine.
#[derive(Debug, Default)]
pub struct DryRunPlayer;

impl MediaPlayer for DryRunPlayer {
    fn load(&mut self, media: &MediaRequest) -> Result<(), PlayerError> {
        info!(
            "[dry-run] load {} speed={}% {}-{}",
            media.path.display(),
            media.play_speed,
            media.start_time,
            media.end_time
        );
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        info!("[dry-run] play");
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        info!("[dry-run] pause");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlayerError> {
        info!("[dry-run] stop");
        Ok(())
    }
}
