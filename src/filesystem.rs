use std::path::{Path, PathBuf};

/// The filesystem queries the core needs, so it can run against a fake.
pub trait MediaFs {
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;
    /// Files directly inside `dir`. Empty when the directory can't be read.
    fn list_files(&self, dir: &Path) -> Vec<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HostFs;

impl MediaFs for HostFs {
    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_files(&self, dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_fs_sees_real_files() {
        let dir = tempfile::tempdir().unwrap();
        let song = dir.path().join("song.mp3");
        std::fs::write(&song, b"").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();

        let fs = HostFs;
        assert!(fs.is_file(&song));
        assert!(!fs.is_file(&dir.path().join("other.mp3")));
        assert!(fs.is_dir(dir.path()));
        assert_eq!(fs.list_files(dir.path()), vec![song]);
        assert!(fs.list_files(&dir.path().join("missing")).is_empty());
    }
}
