mod parser;
mod path;
mod pipeline;

pub use parser::{Diagnostic, DiagnosticKind, ParseOutcome, parse, parse_file};
pub use path::{MediaDefaults, resolve};
pub use pipeline::{BuildError, build, build_from_outcome, check_media_dir, resolve_fallback};

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timecode {
    pub hours: u8,
    pub minutes: u8,
    pub seconds: u8,
}

impl Timecode {
    pub const ZERO: Timecode = Timecode::new(0, 0, 0);
    /// Default end time, i.e. "until the media ends".
    pub const MAX: Timecode = Timecode::new(99, 59, 59);

    pub const fn new(hours: u8, minutes: u8, seconds: u8) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    pub fn total_seconds(&self) -> u32 {
        self.hours as u32 * 3600 + self.minutes as u32 * 60 + self.seconds as u32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimecodeError {
    #[error("expected HH:MM:SS")]
    Format,
    #[error("hours must be 0-99, minutes and seconds 0-59")]
    OutOfRange,
}

impl FromStr for Timecode {
    type Err = TimecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        let [h, m, sec] = parts.as_slice() else {
            return Err(TimecodeError::Format);
        };

        let field = |part: &str| part.trim().parse::<u32>().map_err(|_| TimecodeError::Format);
        let (hours, minutes, seconds) = (field(*h)?, field(*m)?, field(*sec)?);

        if hours > 99 || minutes >= 60 || seconds >= 60 {
            return Err(TimecodeError::OutOfRange);
        }
        Ok(Timecode::new(hours as u8, minutes as u8, seconds as u8))
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

/// One validated setlist line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetlistEntry {
    /// Lookup key: the authored 1-based index minus one.
    pub key: i64,
    /// Source line, 1-based.
    pub line: usize,
    pub media_name: String,
    /// Percent
    pub play_speed: u32,
    pub start_time: Timecode,
    pub end_time: Timecode,
}

impl SetlistEntry {
    pub const DEFAULT_SPEED: u32 = 100;

    /// The index as the performer wrote it.
    pub fn index(&self) -> i64 {
        self.key + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub key: i64,
    pub line: usize,
    pub path: PathBuf,
    pub play_speed: u32,
    pub start_time: Timecode,
    pub end_time: Timecode,
}

impl ResolvedEntry {
    pub fn from_entry(entry: SetlistEntry, defaults: &MediaDefaults) -> Self {
        Self {
            key: entry.key,
            line: entry.line,
            path: defaults.resolve(&entry.media_name),
            play_speed: entry.play_speed,
            start_time: entry.start_time,
            end_time: entry.end_time,
        }
    }
}

impl fmt::Display for ResolvedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:<3} {} speed={}% {}-{}",
            self.key + 1,
            self.path.display(),
            self.play_speed,
            self.start_time,
            self.end_time
        )
    }
}

/// The playlist the transport runs against. Built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedSetlist {
    entries: Vec<ResolvedEntry>,
}

impl ResolvedSetlist {
    pub fn new(entries: Vec<ResolvedEntry>) -> Self {
        Self { entries }
    }

    /// Lookup by key equality, never by position.
    pub fn get(&self, key: i64) -> Option<&ResolvedEntry> {
        self.entries.iter().find(|e| e.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
