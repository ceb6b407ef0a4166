use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace, warn};

use super::{
    MediaPlayer, MediaRequest, PlayerCommand, PlayerContext, TransportAction, TransportCode,
    TransportMode, TransportState, TransportStatus,
};
use crate::events::{MidiChannel, MidiCommand, MidiEvent};
use crate::filesystem::MediaFs;
use crate::setlist::ResolvedSetlist;

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub channel: MidiChannel,
    pub mode: TransportMode,
    pub transport_code: TransportCode,
    /// Played briefly when a selection can't be loaded.
    pub fallback_media: Option<PathBuf>,
    pub fallback_grace: Duration,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            channel: MidiChannel::default(),
            mode: TransportMode::default(),
            transport_code: TransportCode::default(),
            fallback_media: None,
            fallback_grace: Duration::from_secs(5),
        }
    }
}

/// What a single event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reaction {
    /// Other channel, or a command the transport doesn't use.
    Ignored,
    /// Selection loaded and waiting for Play.
    Armed { key: i64 },
    /// Selection unavailable, fallback media is sounding.
    FallbackPlaying { key: i64 },
    /// Selection unavailable and nothing to play instead.
    Unavailable { key: i64 },
    Transport {
        action: TransportAction,
        status: TransportStatus,
    },
    /// Up/Down are recognized but not acted on.
    Navigation(TransportAction),
    UnknownCode(u8),
}

pub struct TransportStateMachine<P> {
    setlist: ResolvedSetlist,
    context: PlayerContext<P>,
    settings: TransportSettings,
    fs: Box<dyn MediaFs>,
    state: TransportState,
    fallback_deadline: Option<Instant>,
}

impl<P: MediaPlayer> TransportStateMachine<P> {
    pub fn new(
        setlist: ResolvedSetlist,
        context: PlayerContext<P>,
        settings: TransportSettings,
        fs: Box<dyn MediaFs>,
    ) -> Self {
        let state = TransportState {
            mode: settings.mode,
            ..TransportState::default()
        };
        Self {
            setlist,
            context,
            settings,
            fs,
            state,
            fallback_deadline: None,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn status(&self) -> TransportStatus {
        self.state.status
    }

    pub fn current_index(&self) -> Option<i64> {
        self.state.current_index
    }

    pub fn mode(&self) -> TransportMode {
        self.state.mode
    }

    pub fn context(&self) -> &PlayerContext<P> {
        &self.context
    }

    pub fn player(&self) -> &P {
        self.context.player()
    }

    pub fn fallback_pending(&self) -> bool {
        self.fallback_deadline.is_some()
    }

    pub fn handle(&mut self, event: &MidiEvent, now: Instant) -> Reaction {
        if event.channel != self.settings.channel.get() {
            trace!("ignoring event on channel {}", event.channel);
            return Reaction::Ignored;
        }

        match event.command {
            MidiCommand::ProgramChange => match event.program() {
                Some(program) => self.select(program, now),
                None => Reaction::Ignored,
            },
            MidiCommand::ControlChange => match event.control() {
                Some((controller, value)) => self.transport(controller, value),
                None => Reaction::Ignored,
            },
            _ => Reaction::Ignored,
        }
    }

    /// Stops the fallback media once its grace period is over. Returns true
    /// when it fired.
    pub fn poll_timers(&mut self, now: Instant) -> bool {
        match self.fallback_deadline {
            Some(deadline) if now >= deadline => {
                debug!("fallback media grace period over");
                self.fallback_deadline = None;
                self.invoke(PlayerCommand::Stop);
                self.state.status = TransportStatus::Paused;
                true
            }
            _ => false,
        }
    }

    /// Leaves nothing playing.
    pub fn shutdown(&mut self) {
        self.fallback_deadline = None;
        self.invoke(PlayerCommand::Stop);
        self.state.status = TransportStatus::Paused;
    }

    fn select(&mut self, program: u8, now: Instant) -> Reaction {
        self.fallback_deadline = None;
        self.invoke(PlayerCommand::Stop);
        self.state.status = TransportStatus::Paused;

        let key = program as i64;
        let request = self.setlist.get(key).map(MediaRequest::from);

        match request {
            Some(request) if self.fs.is_file(&request.path) => {
                info!("arming #{} {}", key + 1, request.path.display());
                if !self.invoke(PlayerCommand::Load(request)) {
                    return Reaction::Unavailable { key };
                }
                self.state.current_index = Some(key);
                Reaction::Armed { key }
            }
            Some(request) => {
                warn!("media {} for program {program} is missing", request.path.display());
                self.play_fallback(key, now)
            }
            None => {
                warn!("program {program} is out of range of the setlist, playing nothing");
                self.play_fallback(key, now)
            }
        }
    }

    fn play_fallback(&mut self, key: i64, now: Instant) -> Reaction {
        let fallback = self
            .settings
            .fallback_media
            .clone()
            .filter(|path| self.fs.is_file(path));
        let Some(fallback) = fallback else {
            return Reaction::Unavailable { key };
        };

        if self.invoke(PlayerCommand::Load(MediaRequest::plain(fallback)))
            && self.invoke(PlayerCommand::Play)
        {
            self.fallback_deadline = Some(now + self.settings.fallback_grace);
            Reaction::FallbackPlaying { key }
        } else {
            Reaction::Unavailable { key }
        }
    }

    fn transport(&mut self, controller: u8, value: u8) -> Reaction {
        let code = match self.settings.transport_code {
            TransportCode::Value => value,
            TransportCode::Controller => controller,
        };
        let Some(action) = TransportAction::from_code(code) else {
            debug!("ignoring transport code {code}");
            return Reaction::UnknownCode(code);
        };

        match action {
            TransportAction::PlayPause => {
                let resume = self.state.mode == TransportMode::PlayOnly
                    || self.state.status == TransportStatus::Paused;
                if resume {
                    self.invoke(PlayerCommand::Play);
                    self.state.status = TransportStatus::Playing;
                } else {
                    self.invoke(PlayerCommand::Pause);
                    self.state.status = TransportStatus::Paused;
                }
            }
            TransportAction::Pause => {
                self.invoke(PlayerCommand::Pause);
                self.state.status = TransportStatus::Paused;
            }
            TransportAction::Reset => {
                self.invoke(PlayerCommand::Stop);
                self.state.status = TransportStatus::Paused;
            }
            TransportAction::Up | TransportAction::Down => {
                info!("received transport command {action:?}, ignored");
                return Reaction::Navigation(action);
            }
        }

        self.fallback_deadline = None;
        Reaction::Transport {
            action,
            status: self.state.status,
        }
    }

    /// Player failures are logged and never stop the show.
    fn invoke(&mut self, command: PlayerCommand) -> bool {
        match self.context.apply(&command) {
            Ok(()) => true,
            Err(e) => {
                error!("player {command:?} failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::fake::FakeFs;
    use crate::setlist::{MediaDefaults, build};
    use crate::transport::RecordingPlayer;

    const PROGRAM: u8 = 0xC0;
    const CONTROL: u8 = 0xB0;

    fn machine_with(
        text: &str,
        files: &[&str],
        settings: TransportSettings,
    ) -> TransportStateMachine<RecordingPlayer> {
        let fs = FakeFs::with_files(files.iter().copied());
        let defaults = MediaDefaults::new(Some(PathBuf::from("/show")), Some("mp3".into()));
        let setlist = build(text, &defaults, true, &fs).unwrap();
        TransportStateMachine::new(
            setlist,
            PlayerContext::new(RecordingPlayer::default()),
            settings,
            Box::new(fs),
        )
    }

    fn machine() -> TransportStateMachine<RecordingPlayer> {
        machine_with(
            "1,Track1\n2,Track2,80,00:10:00,00:20:00",
            &["/show/Track1.mp3", "/show/Track2.mp3", "/show/oops.mp3"],
            TransportSettings::default(),
        )
    }

    fn calls(machine: &TransportStateMachine<RecordingPlayer>) -> &[PlayerCommand] {
        &machine.context().player().calls
    }

    fn send(machine: &mut TransportStateMachine<RecordingPlayer>, bytes: &[u8]) -> Reaction {
        machine.handle(&MidiEvent::decode(bytes), Instant::now())
    }

    fn track2() -> MediaRequest {
        MediaRequest {
            path: PathBuf::from("/show/Track2.mp3"),
            play_speed: 80,
            start_time: "00:10:00".parse().unwrap(),
            end_time: "00:20:00".parse().unwrap(),
        }
    }

    #[test]
    fn starts_paused_with_nothing_loaded() {
        let m = machine();
        assert_eq!(m.status(), TransportStatus::Paused);
        assert_eq!(m.current_index(), None);
        assert_eq!(m.mode(), TransportMode::Toggle);
        assert_eq!(m.context().loaded(), None);
        assert!(calls(&m).is_empty());
    }

    #[test]
    fn select_then_toggle_twice() {
        let mut m = machine();

        assert_eq!(send(&mut m, &[PROGRAM, 1]), Reaction::Armed { key: 1 });
        assert_eq!(m.status(), TransportStatus::Paused);
        assert_eq!(m.current_index(), Some(1));

        send(&mut m, &[CONTROL, 20, 2]);
        assert_eq!(m.status(), TransportStatus::Playing);

        send(&mut m, &[CONTROL, 20, 2]);
        assert_eq!(m.status(), TransportStatus::Paused);

        assert_eq!(
            calls(&m),
            &[
                PlayerCommand::Stop,
                PlayerCommand::Load(track2()),
                PlayerCommand::Play,
                PlayerCommand::Pause,
            ]
        );
        assert_eq!(m.context().loaded(), Some(track2().path.as_path()));
    }

    #[test]
    fn selection_never_autostarts_and_stops_current_track() {
        let mut m = machine();
        send(&mut m, &[PROGRAM, 0]);
        send(&mut m, &[CONTROL, 0, 2]);
        assert_eq!(m.status(), TransportStatus::Playing);

        send(&mut m, &[PROGRAM, 1]);
        assert_eq!(m.status(), TransportStatus::Paused);
        assert_eq!(calls(&m).last(), Some(&PlayerCommand::Load(track2())));
        assert_eq!(calls(&m)[calls(&m).len() - 2], PlayerCommand::Stop);
    }

    #[test]
    fn out_of_range_without_fallback() {
        let mut m = machine();
        send(&mut m, &[PROGRAM, 0]);

        assert_eq!(send(&mut m, &[PROGRAM, 99]), Reaction::Unavailable { key: 99 });
        assert_eq!(m.status(), TransportStatus::Paused);
        assert_eq!(m.current_index(), Some(0));
        assert_eq!(calls(&m).last(), Some(&PlayerCommand::Stop));
        assert!(!m.fallback_pending());
    }

    #[test]
    fn out_of_range_from_fresh_state_loads_nothing() {
        let mut m = machine();
        send(&mut m, &[PROGRAM, 99]);
        assert_eq!(calls(&m), &[PlayerCommand::Stop]);
        assert_eq!(m.current_index(), None);
        assert_eq!(m.context().loaded(), None);
    }

    #[test]
    fn missing_file_plays_fallback_then_stops_after_grace() {
        let settings = TransportSettings {
            fallback_media: Some(PathBuf::from("/show/oops.mp3")),
            fallback_grace: Duration::from_secs(5),
            ..TransportSettings::default()
        };
        let mut m = machine_with("1,Gone", &["/show/oops.mp3"], settings);

        let t0 = Instant::now();
        let reaction = m.handle(&MidiEvent::decode(&[PROGRAM, 0]), t0);
        assert_eq!(reaction, Reaction::FallbackPlaying { key: 0 });
        assert_eq!(m.status(), TransportStatus::Paused);
        assert_eq!(m.current_index(), None);
        assert_eq!(
            calls(&m),
            &[
                PlayerCommand::Stop,
                PlayerCommand::Load(MediaRequest::plain("/show/oops.mp3")),
                PlayerCommand::Play,
            ]
        );

        assert!(!m.poll_timers(t0 + Duration::from_secs(4)));
        assert!(m.poll_timers(t0 + Duration::from_secs(5)));
        assert_eq!(calls(&m).last(), Some(&PlayerCommand::Stop));
        assert!(!m.fallback_pending());
        assert!(!m.poll_timers(t0 + Duration::from_secs(6)));
    }

    #[test]
    fn out_of_range_plays_fallback_and_keeps_selection() {
        let settings = TransportSettings {
            fallback_media: Some(PathBuf::from("/show/oops.mp3")),
            fallback_grace: Duration::from_secs(5),
            ..TransportSettings::default()
        };
        let mut m = machine_with("1,Track1", &["/show/Track1.mp3", "/show/oops.mp3"], settings);
        send(&mut m, &[PROGRAM, 0]);

        let t0 = Instant::now();
        let reaction = m.handle(&MidiEvent::decode(&[PROGRAM, 99]), t0);
        assert_eq!(reaction, Reaction::FallbackPlaying { key: 99 });
        assert_eq!(m.status(), TransportStatus::Paused);
        assert_eq!(m.current_index(), Some(0));
        assert!(m.fallback_pending());
        assert_eq!(
            &calls(&m)[2..],
            &[
                PlayerCommand::Stop,
                PlayerCommand::Load(MediaRequest::plain("/show/oops.mp3")),
                PlayerCommand::Play,
            ]
        );

        assert!(m.poll_timers(t0 + Duration::from_secs(5)));
        assert_eq!(calls(&m).last(), Some(&PlayerCommand::Stop));
    }

    #[test]
    fn fallback_that_does_not_exist_is_skipped() {
        let settings = TransportSettings {
            fallback_media: Some(PathBuf::from("/show/nope.mp3")),
            ..TransportSettings::default()
        };
        let mut m = machine_with("1,Gone", &[], settings);
        assert_eq!(send(&mut m, &[PROGRAM, 0]), Reaction::Unavailable { key: 0 });
        assert_eq!(calls(&m), &[PlayerCommand::Stop]);
    }

    #[test]
    fn new_selection_cancels_pending_fallback() {
        let settings = TransportSettings {
            fallback_media: Some(PathBuf::from("/show/oops.mp3")),
            ..TransportSettings::default()
        };
        let mut m = machine_with(
            "1,Gone\n2,Here",
            &["/show/oops.mp3", "/show/Here.mp3"],
            settings,
        );
        let t0 = Instant::now();
        m.handle(&MidiEvent::decode(&[PROGRAM, 0]), t0);
        assert!(m.fallback_pending());

        m.handle(&MidiEvent::decode(&[PROGRAM, 1]), t0 + Duration::from_secs(1));
        assert!(!m.fallback_pending());
        assert_eq!(m.current_index(), Some(1));
        assert!(!m.poll_timers(t0 + Duration::from_secs(10)));
    }

    #[test]
    fn other_channels_are_ignored() {
        let mut m = machine();
        assert_eq!(send(&mut m, &[PROGRAM | 0x02, 1]), Reaction::Ignored);
        assert_eq!(send(&mut m, &[CONTROL | 0x02, 0, 2]), Reaction::Ignored);
        assert!(calls(&m).is_empty());
        assert_eq!(m.state(), TransportState::default());
    }

    #[test]
    fn listens_on_the_configured_channel() {
        let settings = TransportSettings {
            channel: MidiChannel::new(2).unwrap(),
            ..TransportSettings::default()
        };
        let mut m = machine_with("1,Track1", &["/show/Track1.mp3"], settings);
        assert_eq!(send(&mut m, &[PROGRAM, 0]), Reaction::Ignored);
        assert_eq!(send(&mut m, &[PROGRAM | 0x01, 0]), Reaction::Armed { key: 0 });
    }

    #[test]
    fn play_only_mode_always_plays() {
        let settings = TransportSettings {
            mode: TransportMode::PlayOnly,
            ..TransportSettings::default()
        };
        let mut m = machine_with("1,Track1", &["/show/Track1.mp3"], settings);
        send(&mut m, &[PROGRAM, 0]);
        send(&mut m, &[CONTROL, 0, 2]);
        send(&mut m, &[CONTROL, 0, 2]);
        assert_eq!(m.status(), TransportStatus::Playing);
        assert_eq!(&calls(&m)[2..], &[PlayerCommand::Play, PlayerCommand::Play]);
    }

    #[test]
    fn pause_and_reset() {
        let mut m = machine();
        send(&mut m, &[PROGRAM, 0]);
        send(&mut m, &[CONTROL, 0, 2]);

        let reaction = send(&mut m, &[CONTROL, 0, 3]);
        assert_eq!(
            reaction,
            Reaction::Transport {
                action: TransportAction::Pause,
                status: TransportStatus::Paused
            }
        );
        assert_eq!(calls(&m).last(), Some(&PlayerCommand::Pause));

        send(&mut m, &[CONTROL, 0, 2]);
        send(&mut m, &[CONTROL, 0, 9]);
        assert_eq!(m.status(), TransportStatus::Paused);
        assert_eq!(calls(&m).last(), Some(&PlayerCommand::Stop));
    }

    #[test]
    fn navigation_and_unknown_codes_do_nothing() {
        let mut m = machine();
        assert_eq!(
            send(&mut m, &[CONTROL, 0, 4]),
            Reaction::Navigation(TransportAction::Up)
        );
        assert_eq!(
            send(&mut m, &[CONTROL, 0, 5]),
            Reaction::Navigation(TransportAction::Down)
        );
        assert_eq!(send(&mut m, &[CONTROL, 0, 42]), Reaction::UnknownCode(42));
        assert!(calls(&m).is_empty());
    }

    #[test]
    fn controller_number_can_carry_the_code() {
        let settings = TransportSettings {
            transport_code: TransportCode::Controller,
            ..TransportSettings::default()
        };
        let mut m = machine_with("1,Track1", &["/show/Track1.mp3"], settings);
        send(&mut m, &[PROGRAM, 0]);
        send(&mut m, &[CONTROL, 2, 127]);
        assert_eq!(m.status(), TransportStatus::Playing);
    }

    #[test]
    fn non_transport_commands_are_ignored() {
        let mut m = machine();
        for bytes in [
            &[0x90, 60, 100][..],
            &[0x80, 60, 0],
            &[0xA0, 60, 10],
            &[0xD0, 10],
            &[0xE0, 0, 0x40],
            &[0xF8],
            &[0x12, 0x34],
        ] {
            assert_eq!(send(&mut m, bytes), Reaction::Ignored);
        }
        assert!(calls(&m).is_empty());
    }

    #[test]
    fn player_failures_do_not_stop_the_machine() {
        let mut m = machine();
        m.context.player_mut().fail_next = true;
        // the defensive stop fails, the load still goes through
        assert_eq!(send(&mut m, &[PROGRAM, 1]), Reaction::Armed { key: 1 });
        assert_eq!(calls(&m), &[PlayerCommand::Load(track2())]);
    }

    #[test]
    fn shutdown_stops_the_player() {
        let mut m = machine();
        send(&mut m, &[PROGRAM, 0]);
        send(&mut m, &[CONTROL, 0, 2]);
        m.shutdown();
        assert_eq!(m.status(), TransportStatus::Paused);
        assert_eq!(calls(&m).last(), Some(&PlayerCommand::Stop));
    }
}
