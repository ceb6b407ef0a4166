use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{ConfigError, PlayerKind, Settings};
use crate::events::MidiChannel;
use crate::transport::TransportMode;

pub const MORE_HELP: &str = "\
Setlist format, one entry per line:

    index,media_name[,play_speed[,start_time[,end_time]]]

  index        slot number sent as MIDI Program Change (1 selects program 0)
  media_name   file name, completed with --path and --extension when those
               parts are missing
  play_speed   percent, default 100
  start_time   HH:MM:SS, default 00:00:00
  end_time     HH:MM:SS, default 99:59:59 (play to the end)

Leave trailing fields out rather than empty: `3,Charlie,,00:15:00` is rejected.

Transport, as Control Change (the code is the CC value unless the config sets
`transport_code: Controller`):

  2  play / pause      3  pause      9  stop and rewind
  4  up (ignored)      5  down (ignored)

Selecting a slot loads it paused. Selecting a missing slot plays the
--fallback-media for a few seconds, when one is configured.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlayerArg {
    Vlc,
    DryRun,
}

impl From<PlayerArg> for PlayerKind {
    fn from(arg: PlayerArg) -> Self {
        match arg {
            PlayerArg::Vlc => PlayerKind::Vlc,
            PlayerArg::DryRun => PlayerKind::DryRun,
        }
    }
}

/// Plays setlist media on MIDI program and transport messages.
#[derive(Parser, Debug, Default)]
#[command(name = "setcue")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Play setlist media on MIDI program change and transport messages")]
pub struct Cli {
    /// RON config file; options given here override it
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Setlist file
    #[arg(short, long, value_name = "FILE")]
    pub setlist: Option<PathBuf>,

    /// LivePrompter directory; the setlist is read from its Setlists folder
    #[arg(long, value_name = "DIR")]
    pub liveprompter: Option<PathBuf>,

    /// Default media directory
    #[arg(short, long, value_name = "DIR")]
    pub path: Option<PathBuf>,

    /// Default media extension
    #[arg(short, long, value_name = "EXT")]
    pub extension: Option<String>,

    /// Start even if setlist media are missing (unsafe)
    #[arg(long)]
    pub ignore_missing_media: bool,

    /// Media played briefly when a selection is unavailable
    #[arg(long, value_name = "FILE")]
    pub fallback_media: Option<PathBuf>,

    /// MIDI input port (name, part of a name, or number)
    #[arg(short, long, value_name = "PORT")]
    pub input: Option<String>,

    /// MIDI channel to listen on
    #[arg(long, value_name = "1-16", value_parser = clap::value_parser!(u8).range(1..=16))]
    pub channel: Option<u8>,

    /// Play always plays instead of toggling play/pause
    #[arg(long)]
    pub play_only: bool,

    /// Media engine
    #[arg(long, value_enum)]
    pub player: Option<PlayerArg>,

    /// List MIDI input ports and exit
    #[arg(short = 'm', long)]
    pub midiports: bool,

    /// Explain the setlist format and MIDI mapping
    #[arg(long)]
    pub more_help: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Config file (if any) with the command line applied on top.
    pub fn settings(&self) -> Result<Settings, ConfigError> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        self.apply(&mut settings)?;
        Ok(settings)
    }

    pub fn apply(&self, settings: &mut Settings) -> Result<(), ConfigError> {
        if let Some(setlist) = &self.setlist {
            settings.setlist = Some(setlist.clone());
        }
        if let Some(dir) = &self.liveprompter {
            settings.liveprompter_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.path {
            settings.media_dir = Some(dir.clone());
        }
        if let Some(ext) = &self.extension {
            settings.extension = Some(ext.clone());
        }
        if let Some(fallback) = &self.fallback_media {
            settings.fallback_media = Some(fallback.clone());
        }
        if let Some(port) = &self.input {
            settings.midi_port = Some(port.clone());
        }
        if let Some(channel) = self.channel {
            settings.channel = MidiChannel::new(channel)?;
        }
        if let Some(player) = self.player {
            settings.player = player.into();
        }
        settings.ignore_missing_media |= self.ignore_missing_media;
        if self.play_only {
            settings.mode = TransportMode::PlayOnly;
        }
        Ok(())
    }
}
