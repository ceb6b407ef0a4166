use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::{Duration, Instant};

use crossbeam::channel::{Receiver, RecvTimeoutError};
use tracing::{debug, info};

use super::{MediaPlayer, MediaRequest, PlayerError};
use crate::setlist::Timecode;

pub const DEFAULT_COMMAND: [&str; 3] = ["vlc", "-I", "rc"];

const REPLY_TIMEOUT: Duration = Duration::from_millis(250);

/// Drives a VLC process through its `rc` interface on stdin.
pub struct VlcRemote {
    child: Child,
    stdin: Option<ChildStdin>,
    replies: Option<Receiver<String>>,
    /// Last known state, used when VLC doesn't answer `is_playing`.
    playing: bool,
}

impl VlcRemote {
    pub fn spawn(command: &[String]) -> Result<Self, PlayerError> {
        let command_line = command.join(" ");
        let (program, args) = command.split_first().ok_or_else(|| PlayerError::Spawn {
            command: command_line.clone(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "empty player command"),
        })?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| PlayerError::Spawn {
                command: command_line.clone(),
                source,
            })?;

        info!("started media engine `{}` (pid {})", command_line, child.id());
        let stdin = child.stdin.take();
        let replies = child.stdout.take().map(|stdout| {
            let (tx, rx) = crossbeam::channel::unbounded();
            std::thread::spawn(move || {
                for line in BufReader::new(stdout).lines() {
                    let Ok(line) = line else { break };
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            });
            rx
        });
        Ok(Self {
            child,
            stdin,
            replies,
            playing: false,
        })
    }

    /// Asks VLC whether it is playing, since media can end on its own.
    fn engine_playing(&mut self) -> Result<bool, PlayerError> {
        let Some(replies) = self.replies.clone() else {
            return Ok(self.playing);
        };
        while replies.try_recv().is_ok() {}
        self.send("is_playing")?;

        let deadline = Instant::now() + REPLY_TIMEOUT;
        loop {
            match replies.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                Ok(line) => match parse_is_playing(&line) {
                    Some(playing) => {
                        self.playing = playing;
                        return Ok(playing);
                    }
                    None => continue,
                },
                Err(RecvTimeoutError::Timeout) => {
                    debug!("no is_playing reply, assuming playing={}", self.playing);
                    return Ok(self.playing);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.replies = None;
                    return Ok(self.playing);
                }
            }
        }
    }

    fn send(&mut self, line: &str) -> Result<(), PlayerError> {
        if let Ok(Some(status)) = self.child.try_wait() {
            debug!("media engine exited with {status}");
            return Err(PlayerError::Exited);
        }
        let stdin = self.stdin.as_mut().ok_or(PlayerError::Exited)?;
        debug!("vlc <- {line}");
        writeln!(stdin, "{line}")?;
        stdin.flush()?;
        Ok(())
    }

    /// Asks VLC to quit and waits for it.
    pub fn close(mut self) -> Result<(), PlayerError> {
        self.send("quit")?;
        self.stdin = None;
        self.child.wait()?;
        Ok(())
    }
}

impl Drop for VlcRemote {
    fn drop(&mut self) {
        if self.stdin.is_some() {
            let _ = self.send("quit");
            self.stdin = None;
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

impl MediaPlayer for VlcRemote {
    fn load(&mut self, media: &MediaRequest) -> Result<(), PlayerError> {
        let enqueue = enqueue_line(media)?;
        self.send("clear")?;
        self.send(&enqueue)?;
        self.playing = false;
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlayerError> {
        if !self.engine_playing()? {
            self.send("play")?;
            self.playing = true;
        }
        Ok(())
    }

    fn pause(&mut self) -> Result<(), PlayerError> {
        // `pause` toggles in rc, so only send it while playing
        if self.engine_playing()? {
            self.send("pause")?;
            self.playing = false;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), PlayerError> {
        self.send("stop")?;
        self.playing = false;
        Ok(())
    }
}

/// Item options ride along with the MRL, so a stop/play cycle starts over
/// at the authored start time. rc has no escaping, so quotes and line breaks
/// in the path are refused.
fn enqueue_line(media: &MediaRequest) -> Result<String, PlayerError> {
    let path = media.path.display().to_string();
    if path.contains(['"', '\n', '\r']) {
        return Err(PlayerError::UnsupportedPath(media.path.clone()));
    }
    let mut line = format!("enqueue \"{path}\"");
    if media.start_time != Timecode::ZERO {
        line.push_str(&format!(" :start-time={}", media.start_time.total_seconds()));
    }
    if media.end_time != Timecode::MAX {
        line.push_str(&format!(" :stop-time={}", media.end_time.total_seconds()));
    }
    if media.play_speed != 100 {
        line.push_str(&format!(" :rate={}", media.play_speed as f32 / 100.0));
    }
    Ok(line)
}

/// `is_playing` answers `0` or `1`, possibly behind an `>` prompt.
fn parse_is_playing(line: &str) -> Option<bool> {
    match line.trim().trim_start_matches('>').trim() {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}
