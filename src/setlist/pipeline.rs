use std::path::{Path, PathBuf};

use tracing::{debug, error, warn};

use super::{MediaDefaults, ParseOutcome, ResolvedEntry, ResolvedSetlist, parse};
use crate::filesystem::MediaFs;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("setlist has no valid entries")]
    Empty,
    #[error("{} media file(s) could not be found", .missing.len())]
    MissingMedia { missing: Vec<PathBuf> },
    #[error("media directory {} does not exist", .0.display())]
    MediaDirMissing(PathBuf),
    #[error("no .{ext} file found in {}", .dir.display())]
    NoMatchingExtension { dir: PathBuf, ext: String },
}

pub fn build(
    raw_text: &str,
    defaults: &MediaDefaults,
    ignore_missing: bool,
    fs: &dyn MediaFs,
) -> Result<ResolvedSetlist, BuildError> {
    build_from_outcome(parse(raw_text), defaults, ignore_missing, fs)
}

/// Resolves an already parsed setlist. Diagnostics are logged here.
pub fn build_from_outcome(
    outcome: ParseOutcome,
    defaults: &MediaDefaults,
    ignore_missing: bool,
    fs: &dyn MediaFs,
) -> Result<ResolvedSetlist, BuildError> {
    for diagnostic in &outcome.diagnostics {
        warn!("setlist: {diagnostic}");
    }

    if outcome.entries.is_empty() {
        return Err(BuildError::Empty);
    }

    let entries: Vec<ResolvedEntry> = outcome
        .entries
        .into_iter()
        .map(|entry| ResolvedEntry::from_entry(entry, defaults))
        .collect();

    let missing: Vec<PathBuf> = entries
        .iter()
        .filter(|entry| !fs.is_file(&entry.path))
        .map(|entry| entry.path.clone())
        .collect();

    if !missing.is_empty() {
        if !ignore_missing {
            for path in &missing {
                error!("media {} not found", path.display());
            }
            return Err(BuildError::MissingMedia { missing });
        }
        for path in &missing {
            warn!("media {} not found, continuing anyway", path.display());
        }
    }

    let setlist = ResolvedSetlist::new(entries);
    for entry in setlist.iter() {
        debug!("{entry}");
    }
    Ok(setlist)
}

/// The default media directory must exist, and must hold at least one file
/// with the default extension when one is configured.
pub fn check_media_dir(defaults: &MediaDefaults, fs: &dyn MediaFs) -> Result<(), BuildError> {
    let Some(dir) = defaults.dir.as_deref() else {
        return Ok(());
    };
    if !fs.is_dir(dir) {
        return Err(BuildError::MediaDirMissing(dir.to_path_buf()));
    }

    if let Some(ext) = defaults.bare_extension() {
        let found = fs
            .list_files(dir)
            .iter()
            .any(|file| file.extension().is_some_and(|e| e == ext));
        if !found {
            return Err(BuildError::NoMatchingExtension {
                dir: dir.to_path_buf(),
                ext: ext.to_string(),
            });
        }
    }
    Ok(())
}

/// Resolves the fallback media like a setlist entry. A fallback that isn't
/// there is only warned about; the transport checks again before playing it.
pub fn resolve_fallback(
    fallback: &Path,
    defaults: &MediaDefaults,
    fs: &dyn MediaFs,
) -> PathBuf {
    let path = defaults.resolve(&fallback.to_string_lossy());
    if fs.is_file(&path) {
        debug!("fallback media {}", path.display());
    } else {
        warn!("fallback media {} not found", path.display());
    }
    path
}
