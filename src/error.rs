use std::path::PathBuf;

use crate::config::ConfigError;
use crate::midi_input::MidiError;
use crate::setlist::BuildError;
use crate::transport::PlayerError;

/// Everything that stops the program before the transport loop starts.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("setlist {} could not be read: {message}", .path.display())]
    SetlistUnreadable { path: PathBuf, message: String },
    #[error("LivePrompter: {0}")]
    LivePrompter(String),
    #[error("media directory {} could not be found", .0.display())]
    MediaDirMissing(PathBuf),
    #[error("no file with extension .{ext} in {}", .dir.display())]
    NoMatchingExtension { dir: PathBuf, ext: String },
    #[error("setlist has no valid entries")]
    EmptySetlist,
    #[error(
        "{} media file(s) could not be found, check the setlist and media path \
         (or use --ignore-missing-media)",
        .0.len()
    )]
    MissingMedia(Vec<PathBuf>),
    #[error("media engine failed to start: {0}")]
    Player(#[from] PlayerError),
    #[error(transparent)]
    Midi(#[from] MidiError),
    #[error("cannot install Ctrl+C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

impl StartupError {
    pub fn exit_code(&self) -> u8 {
        match self {
            StartupError::Config(_) => 3,
            StartupError::SetlistUnreadable { .. } => 4,
            StartupError::LivePrompter(_) => 5,
            StartupError::MediaDirMissing(_) => 6,
            StartupError::NoMatchingExtension { .. } => 7,
            StartupError::EmptySetlist => 8,
            StartupError::MissingMedia(_) => 9,
            StartupError::Player(_) => 10,
            StartupError::Midi(MidiError::Init(_)) => 11,
            StartupError::Midi(MidiError::PortNotFound { .. }) => 12,
            StartupError::Midi(MidiError::Connect { .. }) => 13,
            StartupError::Signal(_) => 14,
        }
    }
}

impl From<BuildError> for StartupError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Empty => StartupError::EmptySetlist,
            BuildError::MissingMedia { missing } => StartupError::MissingMedia(missing),
            BuildError::MediaDirMissing(dir) => StartupError::MediaDirMissing(dir),
            BuildError::NoMatchingExtension { dir, ext } => {
                StartupError::NoMatchingExtension { dir, ext }
            }
        }
    }
}
