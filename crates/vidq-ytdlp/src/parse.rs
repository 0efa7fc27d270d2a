//! Parsing of yt-dlp's console output.
//!
//! The engine asks yt-dlp to emit two kinds of marked lines:
//!
//! - `vidq-progress <json>`: the progress hook dictionary, one per update
//! - `vidq-file <path>`: the final path of each file after post-processing
//!
//! Anything else is ordinary console output. Lines starting with `ERROR:`
//! carry the failure message yt-dlp prints before exiting non-zero.

use serde::Deserialize;
use std::path::PathBuf;
use vidq_queue::ProgressEvent;

/// Prefix of progress lines.
pub const PROGRESS_MARKER: &str = "vidq-progress ";

/// Prefix of final file path lines.
pub const FILE_MARKER: &str = "vidq-file ";

const ERROR_PREFIX: &str = "ERROR:";

/// One classified line of yt-dlp output.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    /// A progress update.
    Progress(ProgressEvent),
    /// A file yt-dlp finished writing.
    File(PathBuf),
    /// An error message, without the `ERROR:` prefix.
    Error(String),
    /// Any other output.
    Other(String),
}

/// The subset of yt-dlp's progress dictionary that matters here.
#[derive(Debug, Deserialize)]
struct RawProgress {
    status: String,
    downloaded_bytes: Option<f64>,
    total_bytes: Option<f64>,
    total_bytes_estimate: Option<f64>,
    eta: Option<f64>,
    filename: Option<String>,
    filepath: Option<String>,
    #[serde(rename = "_percent_str")]
    percent_str: Option<String>,
}

impl RawProgress {
    fn into_event(self) -> Option<ProgressEvent> {
        match self.status.as_str() {
            "downloading" => Some(ProgressEvent::Downloading {
                percent: self.percent(),
                eta: self.eta.and_then(seconds),
            }),
            "finished" => Some(ProgressEvent::Finished {
                path: self.filename.or(self.filepath).map(PathBuf::from),
            }),
            _ => None,
        }
    }

    fn percent(&self) -> Option<f64> {
        let total = self
            .total_bytes
            .or(self.total_bytes_estimate)
            .filter(|total| *total > 0.0);

        match (self.downloaded_bytes, total) {
            (Some(done), Some(total)) => Some(done / total * 100.0),
            _ => self.percent_str.as_deref().and_then(parse_percent_str),
        }
    }
}

/// Classifies one line of output.
#[must_use]
pub fn parse_line(line: &str) -> OutputLine {
    let line = line.trim_end_matches(['\r', '\n']);

    if let Some(json) = line.strip_prefix(PROGRESS_MARKER) {
        return match serde_json::from_str::<RawProgress>(json) {
            Ok(raw) => raw
                .into_event()
                .map_or_else(|| OutputLine::Other(line.to_string()), OutputLine::Progress),
            Err(e) => {
                tracing::debug!(error = %e, "unparseable progress line");
                OutputLine::Other(line.to_string())
            }
        };
    }

    if let Some(path) = line.strip_prefix(FILE_MARKER) {
        let path = path.trim();
        if !path.is_empty() && path != "NA" {
            return OutputLine::File(PathBuf::from(path));
        }
    }

    if let Some(message) = line.strip_prefix(ERROR_PREFIX) {
        return OutputLine::Error(message.trim().to_string());
    }

    OutputLine::Other(line.to_string())
}

/// Parses yt-dlp's human readable percent (e.g. `" 42.3%"`), which may be
/// wrapped in ANSI color codes.
#[must_use]
pub fn parse_percent_str(text: &str) -> Option<f64> {
    let plain = strip_ansi(text);
    plain.trim().trim_end_matches('%').trim().parse().ok()
}

fn strip_ansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            // Skip to the end of the CSI sequence.
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn seconds(value: f64) -> Option<u64> {
    (value.is_finite() && value >= 0.0).then(|| value.round() as u64)
}
