//! The boundary to the external download/extraction engine.

use crate::ProgressSink;
use std::path::PathBuf;
use thiserror::Error;

/// Everything an engine needs to run one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    /// URL to download.
    pub url: String,
    /// Cookie file to authenticate with, if any.
    pub cookie_file: Option<PathBuf>,
    /// Directory the engine writes into.
    pub output_dir: PathBuf,
    /// File naming template, relative to `output_dir`.
    pub output_template: String,
}

/// Structured result of a successful engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOutput {
    /// Files the engine reports having written, in order. May be empty.
    pub requested_downloads: Vec<PathBuf>,
}

impl EngineOutput {
    /// Creates an output reporting a single written file.
    #[must_use]
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self {
            requested_downloads: vec![path.into()],
        }
    }
}

/// Errors raised by an engine run.
///
/// The display text becomes the task's error message.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The engine program could not be started.
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        /// The program that could not be started.
        program: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// I/O error while talking to the engine.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A blocking download engine.
///
/// `run` occupies the calling thread for the whole job and reports progress
/// through `progress` as it goes.
pub trait Engine: Send + Sync + 'static {
    /// Downloads `request.url` into `request.output_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download or extraction fails.
    fn run(
        &self,
        request: &EngineRequest,
        progress: &mut dyn ProgressSink,
    ) -> Result<EngineOutput, EngineError>;
}
