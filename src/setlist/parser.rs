use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::{SetlistEntry, Timecode};

const MAX_FIELDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiagnosticKind {
    #[error("cannot read setlist {}: {message}", .path.display())]
    Unreadable { path: PathBuf, message: String },
    #[error("expected at least an index and a media name, found {found} field(s)")]
    MissingField { found: usize },
    #[error("empty media name")]
    EmptyMediaName,
    #[error("index '{0}' is not an integer")]
    InvalidIndex(String),
    #[error("play speed '{0}' is not an integer")]
    InvalidSpeed(String),
    #[error("invalid start time '{0}' (expected HH:MM:SS)")]
    InvalidStartTime(String),
    #[error("invalid end time '{0}' (expected HH:MM:SS)")]
    InvalidEndTime(String),
    #[error("index {index} is already used on line {first_line}")]
    DuplicateIndex { index: i64, first_line: usize },
    #[error("{0} extra field(s) ignored")]
    ExtraFields(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: Option<usize>,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    fn at(line: usize, kind: DiagnosticKind) -> Self {
        Self {
            line: Some(line),
            kind,
        }
    }

    /// Warnings keep the line; everything else dropped it.
    pub fn rejected_line(&self) -> bool {
        !matches!(self.kind, DiagnosticKind::ExtraFields(_))
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub entries: Vec<SetlistEntry>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn is_unreadable(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::Unreadable { .. }))
    }
}

/// Parses `index,media_name[,play_speed[,start_time[,end_time]]]` lines.
/// Bad lines are reported and skipped, never fatal.
pub fn parse(text: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();
    let mut first_seen: HashMap<i64, usize> = HashMap::new();

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
        if fields.len() > MAX_FIELDS {
            outcome.diagnostics.push(Diagnostic::at(
                line,
                DiagnosticKind::ExtraFields(fields.len() - MAX_FIELDS),
            ));
        }

        let entry = match parse_fields(&fields, line) {
            Ok(entry) => entry,
            Err(kind) => {
                outcome.diagnostics.push(Diagnostic::at(line, kind));
                continue;
            }
        };

        if let Some(&first_line) = first_seen.get(&entry.key) {
            outcome.diagnostics.push(Diagnostic::at(
                line,
                DiagnosticKind::DuplicateIndex {
                    index: entry.index(),
                    first_line,
                },
            ));
            continue;
        }
        first_seen.insert(entry.key, line);
        outcome.entries.push(entry);
    }

    outcome
}

fn parse_fields(fields: &[&str], line: usize) -> Result<SetlistEntry, DiagnosticKind> {
    if fields.len() < 2 {
        return Err(DiagnosticKind::MissingField {
            found: fields.len(),
        });
    }

    let key = fields[0]
        .parse::<i64>()
        .ok()
        .and_then(|index| index.checked_sub(1))
        .ok_or_else(|| DiagnosticKind::InvalidIndex(fields[0].to_string()))?;

    let media_name = fields[1];
    if media_name.is_empty() {
        return Err(DiagnosticKind::EmptyMediaName);
    }

    // A present field must parse, even when it is empty.
    let play_speed = match fields.get(2) {
        Some(speed) => speed
            .parse()
            .map_err(|_| DiagnosticKind::InvalidSpeed(speed.to_string()))?,
        None => SetlistEntry::DEFAULT_SPEED,
    };

    let start_time = match fields.get(3) {
        Some(t) => t
            .parse::<Timecode>()
            .map_err(|_| DiagnosticKind::InvalidStartTime(t.to_string()))?,
        None => Timecode::ZERO,
    };

    let end_time = match fields.get(4) {
        Some(t) => t
            .parse::<Timecode>()
            .map_err(|_| DiagnosticKind::InvalidEndTime(t.to_string()))?,
        None => Timecode::MAX,
    };

    Ok(SetlistEntry {
        key,
        line,
        media_name: media_name.to_string(),
        play_speed,
        start_time,
        end_time,
    })
}

/// Like [`parse`], but an unreadable file comes back as an empty outcome
/// carrying an `Unreadable` diagnostic.
pub fn parse_file(path: &Path) -> ParseOutcome {
    match fs::read_to_string(path) {
        Ok(text) => parse(&text),
        Err(e) => ParseOutcome {
            entries: Vec::new(),
            diagnostics: vec![Diagnostic {
                line: None,
                kind: DiagnosticKind::Unreadable {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                },
            }],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_and_minimal_lines() {
        let outcome = parse("1,Alice,23,12:30:00,13:00:00\n2,Bob,42,14:00:00\n3,Carol");
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(outcome.entries.len(), 3);

        let alice = &outcome.entries[0];
        assert_eq!(alice.key, 0);
        assert_eq!(alice.index(), 1);
        assert_eq!(alice.media_name, "Alice");
        assert_eq!(alice.play_speed, 23);
        assert_eq!(alice.start_time, Timecode::new(12, 30, 0));
        assert_eq!(alice.end_time, Timecode::new(13, 0, 0));

        let bob = &outcome.entries[1];
        assert_eq!(bob.start_time, Timecode::new(14, 0, 0));
        assert_eq!(bob.end_time, Timecode::MAX);

        let carol = &outcome.entries[2];
        assert_eq!(carol.play_speed, 100);
        assert_eq!(carol.start_time, Timecode::ZERO);
        assert_eq!(carol.end_time, Timecode::MAX);
    }

    #[test]
    fn skips_blank_lines_and_keeps_line_numbers() {
        let outcome = parse("\n1,Intro\n   \n\n2,Outro\n");
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.entries[0].line, 2);
        assert_eq!(outcome.entries[1].line, 5);
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let text = "\
Lonely
x,Song
2,Song,fast
3,Song,100,25:61:00
4,Song,100,00:00:00,1:2
5,Good
,Song";
        let outcome = parse(text);

        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].media_name, "Good");

        let lines: Vec<Option<usize>> = outcome.diagnostics.iter().map(|d| d.line).collect();
        assert_eq!(lines, vec![Some(1), Some(2), Some(3), Some(4), Some(5), Some(7)]);

        assert_eq!(
            outcome.diagnostics[0].kind,
            DiagnosticKind::MissingField { found: 1 }
        );
        assert_eq!(outcome.diagnostics[1].kind, DiagnosticKind::InvalidIndex("x".into()));
        assert_eq!(outcome.diagnostics[2].kind, DiagnosticKind::InvalidSpeed("fast".into()));
        assert_eq!(
            outcome.diagnostics[3].kind,
            DiagnosticKind::InvalidStartTime("25:61:00".into())
        );
        assert_eq!(outcome.diagnostics[4].kind, DiagnosticKind::InvalidEndTime("1:2".into()));
        assert!(outcome.diagnostics.iter().all(Diagnostic::rejected_line));
    }

    #[test]
    fn empty_speed_field_rejects_the_line() {
        let outcome = parse("3,Charlie,,15:00:00,99:59:59");
        assert!(outcome.entries.is_empty());
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::InvalidSpeed(String::new()));
        assert_eq!(outcome.diagnostics[0].to_string(), "line 1: play speed '' is not an integer");
    }

    #[test]
    fn empty_media_name_is_rejected() {
        let outcome = parse("1, ,80");
        assert!(outcome.entries.is_empty());
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::EmptyMediaName);
    }

    #[test]
    fn duplicate_index_keeps_the_first_declaration() {
        let outcome = parse("1,First\n2,Second\n1,Again");
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.entries[0].media_name, "First");
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic {
                line: Some(3),
                kind: DiagnosticKind::DuplicateIndex {
                    index: 1,
                    first_line: 1
                },
            }]
        );
    }

    #[test]
    fn sparse_and_reordered_indices_are_kept_in_file_order() {
        let outcome = parse("10,Ten\n2,Two\n0,Zero");
        let keys: Vec<i64> = outcome.entries.iter().map(|e| e.key).collect();
        assert_eq!(keys, vec![9, 1, -1]);
    }

    #[test]
    fn extra_fields_warn_without_dropping() {
        let outcome = parse("1,Song,100,00:00:00,00:01:00,zoom");
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::ExtraFields(1));
        assert!(!outcome.diagnostics[0].rejected_line());
    }

    #[test]
    fn lowest_index_is_rejected_not_wrapped() {
        let outcome = parse("-9223372036854775808,Song\n1,Good");
        assert_eq!(outcome.entries.len(), 1);
        assert_eq!(outcome.entries[0].key, 0);
        assert_eq!(
            outcome.diagnostics,
            vec![Diagnostic::at(
                1,
                DiagnosticKind::InvalidIndex("-9223372036854775808".into())
            )]
        );
    }

    #[test]
    fn fields_are_trimmed() {
        let outcome = parse("  4 , My Song , 90 ,00:00:10\r\n");
        let entry = &outcome.entries[0];
        assert_eq!(entry.key, 3);
        assert_eq!(entry.media_name, "My Song");
        assert_eq!(entry.play_speed, 90);
        assert_eq!(entry.start_time, Timecode::new(0, 0, 10));
    }

    #[test]
    fn unreadable_file_is_a_diagnostic() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = parse_file(&dir.path().join("nope.txt"));
        assert!(outcome.entries.is_empty());
        assert!(outcome.is_unreadable());
        assert_eq!(outcome.diagnostics[0].line, None);
    }

    #[test]
    fn reads_a_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("set.txt");
        std::fs::write(&path, "1,Opener\n2,Closer,110\n").unwrap();

        let outcome = parse_file(&path);
        assert!(!outcome.is_unreadable());
        assert_eq!(outcome.entries.len(), 2);
        assert_eq!(outcome.entries[1].play_speed, 110);
    }
}
