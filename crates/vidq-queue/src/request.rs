//! Validation of incoming download submissions.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned synchronously to a submitter. Nothing is queued.
#[derive(Error, Debug)]
pub enum SubmitError {
    /// No URL was given.
    #[error("A URL is required")]
    MissingUrl,

    /// The URL is not an `http` or `https` URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The queue has been shut down and accepts no more jobs.
    #[error("The download queue is shut down")]
    Closed,

    /// The worker thread could not be started.
    #[error("Failed to start download worker: {source}")]
    WorkerStart {
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// A validated download submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    url: String,
    cookie_file: Option<PathBuf>,
}

impl DownloadRequest {
    /// Validates raw user input.
    ///
    /// The URL is trimmed and must use `http://` or `https://`. A cookie file
    /// that does not exist is dropped rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::MissingUrl`] for empty input and
    /// [`SubmitError::InvalidUrl`] for any other scheme.
    pub fn parse(url: &str, cookie_file: Option<PathBuf>) -> Result<Self, SubmitError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(SubmitError::MissingUrl);
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SubmitError::InvalidUrl(url.to_string()));
        }

        Ok(Self {
            url: url.to_string(),
            cookie_file: existing_file(cookie_file),
        })
    }

    /// The validated URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The cookie file, if one was given and exists.
    #[must_use]
    pub fn cookie_file(&self) -> Option<&PathBuf> {
        self.cookie_file.as_ref()
    }

    /// Splits the request into its URL and cookie file.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<PathBuf>) {
        (self.url, self.cookie_file)
    }
}

/// Keeps `path` only if it names an existing regular file.
pub(crate) fn existing_file(path: Option<PathBuf>) -> Option<PathBuf> {
    let path = path?;
    if path.as_os_str().is_empty() {
        return None;
    }
    if path.is_file() {
        Some(path)
    } else {
        tracing::debug!(path = %path.display(), "cookie file not found, continuing without it");
        None
    }
}
