//! yt-dlp backed download engine for vidq.
//!
//! - [`YtDlpEngine`] - Runs one download per call as a `yt-dlp` child process
//! - [`YtDlpConfig`] - Program path and extra arguments
//! - [`parse_line`] - Classifies yt-dlp output lines

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod engine;
mod parse;

pub use engine::{YtDlpConfig, YtDlpEngine};
pub use parse::{FILE_MARKER, OutputLine, PROGRESS_MARKER, parse_line, parse_percent_str};
