use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::events::MidiEvent;
use crate::midi_input::MidiSource;
use crate::transport::{MediaPlayer, TransportStateMachine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Sleep between ticks.
    pub tick_interval: Duration,
    /// `None` drains everything queued each tick.
    pub max_events_per_tick: Option<usize>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(10),
            max_events_per_tick: None,
        }
    }
}

/// Owns the transport and its MIDI source; nothing else touches either.
pub struct Engine<P, S> {
    machine: TransportStateMachine<P>,
    source: S,
    config: LoopConfig,
}

impl<P: MediaPlayer, S: MidiSource> Engine<P, S> {
    pub fn new(machine: TransportStateMachine<P>, source: S, config: LoopConfig) -> Self {
        Self {
            machine,
            source,
            config,
        }
    }

    pub fn machine(&self) -> &TransportStateMachine<P> {
        &self.machine
    }

    /// Fires due timers, then handles queued MIDI in arrival order. Returns
    /// how many messages were handled.
    pub fn tick(&mut self, now: Instant) -> usize {
        self.machine.poll_timers(now);

        let mut handled = 0;
        while self.config.max_events_per_tick.is_none_or(|max| handled < max) {
            let Some(raw) = self.source.poll() else {
                break;
            };
            let event = MidiEvent::decode(&raw.bytes);
            let reaction = self.machine.handle(&event, now);
            debug!(?reaction, "{event}");
            handled += 1;
        }
        handled
    }

    /// Ticks until `shutdown` is raised, then stops the player.
    pub fn run(mut self, shutdown: &AtomicBool) -> TransportStateMachine<P> {
        info!(
            "waiting for MIDI commands (tick {:?})",
            self.config.tick_interval
        );
        while !shutdown.load(Ordering::Relaxed) {
            self.tick(Instant::now());
            std::thread::sleep(self.config.tick_interval);
        }

        info!("stopping playback");
        self.machine.shutdown();
        self.machine
    }
}
