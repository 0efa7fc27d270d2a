//! Queue configuration.

use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while preparing the queue's directories.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to create a directory.
    #[error("Failed to create directory '{path}': {source}")]
    CreateDir {
        /// The path that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// Where and how downloaded files are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Directory all finished files land in. Must stay writable for the
    /// lifetime of the queue.
    pub downloads_dir: PathBuf,
    /// Engine file naming template, relative to `downloads_dir`.
    pub output_template: String,
}

impl QueueConfig {
    /// Default file naming template: truncated title plus source id.
    pub const DEFAULT_OUTPUT_TEMPLATE: &'static str = "%(title).100s [%(id)s].%(ext)s";

    /// Creates a configuration writing into `downloads_dir`.
    #[must_use]
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloads_dir: downloads_dir.into(),
            output_template: Self::DEFAULT_OUTPUT_TEMPLATE.to_string(),
        }
    }

    /// Creates a configuration at the default path.
    #[must_use]
    pub fn with_default_path() -> Self {
        Self::new(Self::default_path())
    }

    /// Returns the default downloads directory.
    ///
    /// Uses the `directories` crate to find the appropriate location:
    /// - Linux: `~/.local/share/vidq/downloads`
    /// - macOS: `~/Library/Application Support/vidq/downloads`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\vidq\data\downloads`
    ///
    /// Falls back to `./downloads` if no home directory can be found.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "vidq").map_or_else(
            || PathBuf::from("downloads"),
            |proj_dirs| proj_dirs.data_dir().join("downloads"),
        )
    }

    /// Overrides the file naming template.
    #[must_use]
    pub fn with_output_template(mut self, template: impl Into<String>) -> Self {
        self.output_template = template.into();
        self
    }

    /// Returns the downloads directory.
    #[must_use]
    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    /// Creates the downloads directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        if !self.downloads_dir.exists() {
            fs::create_dir_all(&self.downloads_dir).map_err(|e| ConfigError::CreateDir {
                path: self.downloads_dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::with_default_path()
    }
}
