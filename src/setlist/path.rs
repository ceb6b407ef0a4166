use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Appends `default_ext` when `name` has none, then joins `default_dir` when
/// `name` is relative. Textual only, nothing is checked on disk.
pub fn resolve(name: &str, default_dir: Option<&Path>, default_ext: Option<&str>) -> PathBuf {
    let mut path = PathBuf::from(name);

    if path.extension().is_none() {
        let ext = default_ext
            .map(|ext| ext.trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty());
        if let Some(ext) = ext {
            let mut with_ext = OsString::from(path);
            with_ext.push(".");
            with_ext.push(ext);
            path = PathBuf::from(with_ext);
        }
    }

    if !path.is_absolute() {
        if let Some(dir) = default_dir.filter(|dir| !dir.as_os_str().is_empty()) {
            path = dir.join(path);
        }
    }

    path
}

/// Default directory and extension applied to every media reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaDefaults {
    pub dir: Option<PathBuf>,
    pub extension: Option<String>,
}

impl MediaDefaults {
    pub fn new(dir: Option<PathBuf>, extension: Option<String>) -> Self {
        Self { dir, extension }
    }

    pub fn resolve(&self, name: &str) -> PathBuf {
        resolve(name, self.dir.as_deref(), self.extension.as_deref())
    }

    /// The configured extension without its leading dot.
    pub fn bare_extension(&self) -> Option<&str> {
        self.extension
            .as_deref()
            .map(|ext| ext.trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    const ABSOLUTE: &str = "/srv/show/intro.wav";
    #[cfg(windows)]
    const ABSOLUTE: &str = r"C:\show\intro.wav";

    #[test]
    fn appends_extension_and_directory() {
        let dir = Path::new("media");
        assert_eq!(
            resolve("song", Some(dir), Some("mp3")),
            Path::new("media").join("song.mp3")
        );
    }

    #[test]
    fn leading_dots_in_extension_collapse_to_one() {
        assert_eq!(resolve("song", None, Some(".mp3")), PathBuf::from("song.mp3"));
        assert_eq!(resolve("song", None, Some("..mp3")), PathBuf::from("song.mp3"));
    }

    #[test]
    fn existing_extension_is_kept() {
        assert_eq!(resolve("song.wav", None, Some("mp3")), PathBuf::from("song.wav"));
    }

    #[test]
    fn no_extension_and_no_default_is_unchanged() {
        assert_eq!(resolve("song", None, None), PathBuf::from("song"));
        assert_eq!(resolve("song", None, Some("")), PathBuf::from("song"));
    }

    #[test]
    fn relative_subpaths_are_joined() {
        assert_eq!(
            resolve("set2/song", Some(Path::new("media")), Some("mp3")),
            Path::new("media").join("set2").join("song.mp3")
        );
    }

    #[test]
    fn dotted_directory_does_not_count_as_extension() {
        assert_eq!(
            resolve("v1.2/song", None, Some("mp3")),
            Path::new("v1.2").join("song.mp3")
        );
    }

    #[test]
    fn absolute_extensioned_names_are_untouched() {
        let resolved = resolve(ABSOLUTE, Some(Path::new("media")), Some("mp3"));
        assert_eq!(resolved, PathBuf::from(ABSOLUTE));
    }

    #[test]
    fn defaults_strip_extension_dots() {
        let defaults = MediaDefaults::new(None, Some(".flac".into()));
        assert_eq!(defaults.bare_extension(), Some("flac"));
        assert_eq!(defaults.resolve("a"), PathBuf::from("a.flac"));
        assert_eq!(MediaDefaults::default().bare_extension(), None);
    }
}
