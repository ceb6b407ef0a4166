use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::LoopConfig;
use crate::events::{InvalidChannel, MidiChannel};
use crate::setlist::MediaDefaults;
use crate::transport::{TransportCode, TransportMode, TransportSettings};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error(transparent)]
    Channel(#[from] InvalidChannel),
    #[error("no setlist given (use --setlist)")]
    NoSetlist,
    #[error("no MIDI input port given (use --input, --midiports lists them)")]
    NoPort,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerKind {
    #[default]
    Vlc,
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub setlist: Option<PathBuf>,
    /// LivePrompter install dir; the setlist is then looked up in its `Setlists` folder.
    pub liveprompter_dir: Option<PathBuf>,
    pub media_dir: Option<PathBuf>,
    pub extension: Option<String>,
    pub fallback_media: Option<PathBuf>,
    pub ignore_missing_media: bool,
    pub midi_port: Option<String>,
    pub channel: MidiChannel,
    pub mode: TransportMode,
    pub transport_code: TransportCode,
    pub tick_interval_ms: u64,
    pub max_events_per_tick: Option<usize>,
    pub fallback_grace_ms: u64,
    pub player: PlayerKind,
    pub player_command: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            setlist: None,
            liveprompter_dir: None,
            media_dir: None,
            extension: None,
            fallback_media: None,
            ignore_missing_media: false,
            midi_port: None,
            channel: MidiChannel::default(),
            mode: TransportMode::default(),
            transport_code: TransportCode::default(),
            tick_interval_ms: 10,
            max_events_per_tick: None,
            fallback_grace_ms: 5000,
            player: PlayerKind::default(),
            player_command: crate::transport::vlc_default_command(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ron_string = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&ron_string).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_ron(text: &str) -> Result<Self, String> {
        ron::from_str(text).map_err(|e| e.to_string())
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    pub fn media_defaults(&self) -> MediaDefaults {
        MediaDefaults::new(self.media_dir.clone(), self.extension.clone())
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            max_events_per_tick: self.max_events_per_tick,
        }
    }

    /// `fallback_media` is the already resolved fallback path.
    pub fn transport_settings(&self, fallback_media: Option<PathBuf>) -> TransportSettings {
        TransportSettings {
            channel: self.channel,
            mode: self.mode,
            transport_code: self.transport_code,
            fallback_media,
            fallback_grace: Duration::from_millis(self.fallback_grace_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let settings = Settings::from_ron("()").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.channel.get(), 1);
        assert_eq!(settings.mode, TransportMode::Toggle);
        assert_eq!(settings.player_command, vec!["vlc", "-I", "rc"]);
        assert_eq!(settings.loop_config(), LoopConfig::default());
    }

    #[test]
    fn reads_a_partial_config() {
        let settings = Settings::from_ron(
            r#"(
                media_dir: Some("/show"),
                extension: Some("mp3"),
                channel: 2,
                mode: PlayOnly,
                player: DryRun,
                fallback_grace_ms: 1500,
            )"#,
        )
        .unwrap();

        assert_eq!(settings.media_dir, Some(PathBuf::from("/show")));
        assert_eq!(settings.channel.get(), 2);
        assert_eq!(settings.mode, TransportMode::PlayOnly);
        assert_eq!(settings.player, PlayerKind::DryRun);

        let transport = settings.transport_settings(None);
        assert_eq!(transport.fallback_grace, Duration::from_millis(1500));
        assert_eq!(settings.media_defaults().resolve("a"), PathBuf::from("/show/a.mp3"));
    }

    #[test]
    fn channel_zero_is_rejected_not_remapped() {
        let err = Settings::from_ron("(channel: 0)").unwrap_err();
        assert!(err.contains("between 1 and 16"), "{err}");
    }

    #[test]
    fn round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("setcue.ron");
        let settings = Settings {
            midi_port: Some("FCB1010".into()),
            ignore_missing_media: true,
            ..Settings::default()
        };
        fs::write(&path, settings.to_ron().unwrap()).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
        assert!(matches!(
            Settings::load(&dir.path().join("missing.ron")),
            Err(ConfigError::Read { .. })
        ));

        fs::write(&path, "(channel: \"one\")").unwrap();
        assert!(matches!(Settings::load(&path), Err(ConfigError::Parse { .. })));
    }
}
