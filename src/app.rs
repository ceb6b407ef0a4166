use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::cli::{Cli, MORE_HELP};
use crate::config::{ConfigError, PlayerKind, Settings};
use crate::engine::Engine;
use crate::error::StartupError;
use crate::filesystem::{HostFs, MediaFs};
use crate::midi_input::{self, MidirSource};
use crate::setlist::{
    self, DiagnosticKind, ResolvedSetlist, build_from_outcome, check_media_dir, resolve_fallback,
};
use crate::transport::{
    DryRunPlayer, MediaPlayer, PlayerContext, TransportSettings, TransportStateMachine, VlcRemote,
};

/// Everything validated before a media engine or MIDI port is touched.
#[derive(Debug)]
pub struct Prepared {
    pub setlist: ResolvedSetlist,
    pub transport: TransportSettings,
    pub port: String,
}

pub fn run(cli: &Cli) -> Result<(), StartupError> {
    if cli.more_help {
        println!("{MORE_HELP}");
        return Ok(());
    }
    if cli.midiports {
        return print_ports();
    }

    let settings = cli.settings()?;
    let prepared = prepare(&settings, &HostFs)?;

    match settings.player {
        PlayerKind::Vlc => {
            let player = VlcRemote::spawn(&settings.player_command)?;
            serve(player, prepared, &settings)
        }
        PlayerKind::DryRun => serve(DryRunPlayer, prepared, &settings),
    }
}

fn print_ports() -> Result<(), StartupError> {
    let ports = midi_input::list_ports()?;
    if ports.is_empty() {
        println!("No MIDI input ports found.");
    }
    for port in ports {
        println!("{:>3}: {}", port.id, port.name);
    }
    Ok(())
}

/// Startup checks in order: config, setlist location, media directory,
/// setlist contents, media files, fallback.
pub fn prepare(settings: &Settings, fs: &dyn MediaFs) -> Result<Prepared, StartupError> {
    let port = settings.midi_port.clone().ok_or(ConfigError::NoPort)?;
    if settings.ignore_missing_media {
        warn!("UNSAFE MODE: missing media will not stop startup");
    }

    let setlist_path = setlist_path(settings, fs)?;
    let defaults = settings.media_defaults();
    check_media_dir(&defaults, fs)?;

    info!("reading setlist {}", setlist_path.display());
    let outcome = setlist::parse_file(&setlist_path);
    if let Some(DiagnosticKind::Unreadable { path, message }) = outcome
        .diagnostics
        .iter()
        .map(|d| &d.kind)
        .find(|kind| matches!(kind, DiagnosticKind::Unreadable { .. }))
    {
        return Err(StartupError::SetlistUnreadable {
            path: path.clone(),
            message: message.clone(),
        });
    }
    let setlist = build_from_outcome(outcome, &defaults, settings.ignore_missing_media, fs)?;
    info!("{} setlist entries ready", setlist.len());

    let fallback = settings
        .fallback_media
        .as_deref()
        .map(|path| resolve_fallback(path, &defaults, fs));

    Ok(Prepared {
        setlist,
        transport: settings.transport_settings(fallback),
        port,
    })
}

/// Plain path, or `<dir>/Setlists/<setlist>` when a LivePrompter directory is set.
pub fn setlist_path(settings: &Settings, fs: &dyn MediaFs) -> Result<PathBuf, StartupError> {
    let setlist = settings.setlist.as_ref().ok_or(ConfigError::NoSetlist)?;
    let Some(dir) = settings.liveprompter_dir.as_ref() else {
        return Ok(setlist.clone());
    };

    if !fs.is_dir(dir) {
        return Err(StartupError::LivePrompter(format!(
            "directory {} not found",
            dir.display()
        )));
    }
    let path = dir.join("Setlists").join(setlist);
    if !fs.is_file(&path) {
        return Err(StartupError::LivePrompter(format!(
            "setlist {} not found",
            path.display()
        )));
    }
    Ok(path)
}

fn serve<P: MediaPlayer>(
    player: P,
    prepared: Prepared,
    settings: &Settings,
) -> Result<(), StartupError> {
    let source = MidirSource::open(&prepared.port)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("interrupted, shutting down");
        flag.store(true, Ordering::Relaxed);
    })?;

    info!(
        "listening on channel {} in {:?} mode",
        prepared.transport.channel, prepared.transport.mode
    );
    let machine = TransportStateMachine::new(
        prepared.setlist,
        PlayerContext::new(player),
        prepared.transport,
        Box::new(HostFs),
    );
    Engine::new(machine, source, settings.loop_config()).run(&shutdown);
    Ok(())
}
