//! Single-worker download job queue with pollable progress state.
//!
//! This crate provides the moving parts behind `vidq`:
//!
//! - [`DownloadQueue`] - Accepts submissions and runs them one at a time
//! - [`JobStateStore`] - Lock-guarded map of task id to progress record
//! - [`TaskRecord`] / [`TaskStatus`] - What a status poll returns
//! - [`Engine`] - The blocking download engine a queue drives
//! - [`ProgressSink`] / [`ProgressEvent`] - How an engine reports progress
//! - [`resolve_filename`] - Picks the file name recorded for a finished job
//! - [`QueueConfig`] - Downloads directory and file naming template

#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod engine;
mod files;
mod job;
mod progress;
mod queue;
mod request;
mod resolve;
mod store;

pub use config::{ConfigError, QueueConfig};
pub use engine::{Engine, EngineError, EngineOutput, EngineRequest};
pub use files::{locate_download, safe_file_name};
pub use job::{JobDescriptor, TaskId, TaskRecord, TaskStatus};
pub use progress::{ProgressEvent, ProgressSink, StoreProgress};
pub use queue::DownloadQueue;
pub use request::{DownloadRequest, SubmitError};
pub use resolve::{FsListing, ListedFile, OutputListing, resolve_filename};
pub use store::JobStateStore;
