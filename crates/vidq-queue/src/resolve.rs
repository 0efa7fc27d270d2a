//! Resolving the output file name of a completed job.
//!
//! Engines do not always report what they wrote. When they don't, the newest
//! file in the output directory is taken as a best-effort guess. Only one job
//! runs at a time, but a file left behind by an earlier, crashed process can
//! still be picked up by that guess.

use crate::EngineOutput;
use crate::progress::base_name;
use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// A file found in the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    /// Base name of the file.
    pub name: String,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Lists the files in an output directory.
pub trait OutputListing: Send + Sync {
    /// Returns the regular files directly inside `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be read.
    fn entries(&self, dir: &Path) -> io::Result<Vec<ListedFile>>;
}

/// [`OutputListing`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsListing;

impl OutputListing for FsListing {
    fn entries(&self, dir: &Path) -> io::Result<Vec<ListedFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if !metadata.is_file() {
                continue;
            }
            files.push(ListedFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                modified: metadata.modified()?,
            });
        }
        Ok(files)
    }
}

/// Picks the file name to record for a successful job.
///
/// Prefers the first file the engine reported. Falls back to the most
/// recently modified file in `dir`, then to an empty string.
#[must_use]
pub fn resolve_filename(output: &EngineOutput, dir: &Path, listing: &dyn OutputListing) -> String {
    if let Some(name) = output
        .requested_downloads
        .first()
        .and_then(|path| base_name(path))
    {
        return name;
    }

    match listing.entries(dir) {
        Ok(files) => newest(files).unwrap_or_default(),
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "could not list output directory");
            String::new()
        }
    }
}

fn newest(files: Vec<ListedFile>) -> Option<String> {
    files
        .into_iter()
        .max_by_key(|file| file.modified)
        .map(|file| file.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    struct StubListing(io::Result<Vec<ListedFile>>);

    impl OutputListing for StubListing {
        fn entries(&self, _dir: &Path) -> io::Result<Vec<ListedFile>> {
            match &self.0 {
                Ok(files) => Ok(files.clone()),
                Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
            }
        }
    }

    fn at(secs: u64, name: &str) -> ListedFile {
        ListedFile {
            name: name.to_string(),
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
        }
    }

    #[test]
    fn test_prefers_reported_file() {
        let output = EngineOutput::single("/downloads/Talk [x1].mp4");
        let listing = StubListing(Ok(vec![at(100, "other.mp4")]));

        let name = resolve_filename(&output, Path::new("/downloads"), &listing);
        assert_eq!(name, "Talk [x1].mp4");
    }

    #[test]
    fn test_falls_back_to_newest_file() {
        let listing = StubListing(Ok(vec![
            at(10, "old.mp4"),
            at(30, "newest.webm"),
            at(20, "middle.mkv"),
        ]));

        let name = resolve_filename(&EngineOutput::default(), Path::new("/d"), &listing);
        assert_eq!(name, "newest.webm");
    }

    #[test]
    fn test_reported_path_without_name_falls_back() {
        let output = EngineOutput {
            requested_downloads: vec![PathBuf::from("/")],
        };
        let listing = StubListing(Ok(vec![at(1, "only.mp4")]));

        assert_eq!(resolve_filename(&output, Path::new("/d"), &listing), "only.mp4");
    }

    #[test]
    fn test_empty_directory_gives_empty_name() {
        let listing = StubListing(Ok(Vec::new()));
        assert_eq!(
            resolve_filename(&EngineOutput::default(), Path::new("/d"), &listing),
            ""
        );
    }

    #[test]
    fn test_listing_error_gives_empty_name() {
        let listing = StubListing(Err(io::Error::new(io::ErrorKind::NotFound, "missing")));
        assert_eq!(
            resolve_filename(&EngineOutput::default(), Path::new("/d"), &listing),
            ""
        );
    }

    #[test]
    fn test_fs_listing_skips_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir(temp_dir.path().join("nested")).unwrap();
        fs::write(temp_dir.path().join("clip.mp4"), b"data").unwrap();

        let files = FsListing.entries(temp_dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "clip.mp4");
    }
}
