//! Task records and job descriptors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a submitted download.
pub type TaskId = Uuid;

/// Lifecycle state of a download task.
///
/// `Pending -> Downloading -> {Done | Error}`. The last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Queued, not yet picked up by the worker.
    #[default]
    Pending,
    /// The engine is running for this task.
    Downloading,
    /// The engine returned successfully.
    Done,
    /// The engine failed.
    Error,
}

impl TaskStatus {
    /// Returns true once no further transitions are allowed.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Returns the status as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Downloading => "downloading",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress record for one submitted download.
///
/// Records are only changed through the `mark_*`/`apply_*` methods, which
/// refuse to touch a terminal record and return `false` in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Task identifier, fixed at submission.
    pub id: TaskId,
    /// Current lifecycle state.
    pub status: TaskStatus,
    /// Progress in percent (0-100). Only meaningful while downloading.
    pub percent: f64,
    /// Estimated seconds remaining, if the engine knows.
    pub eta: Option<u64>,
    /// Base name of the produced file, set on completion.
    pub filename: Option<String>,
    /// Failure message, set on error.
    pub error: Option<String>,
    /// When the task was submitted.
    pub created_at: DateTime<Utc>,
    /// When the worker started the engine for this task.
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Creates a fresh `pending` record.
    #[must_use]
    pub fn pending(id: TaskId) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            percent: 0.0,
            eta: None,
            filename: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Returns true if the record is in a terminal state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Enters `downloading` right before the engine is invoked.
    pub fn mark_downloading(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Downloading;
        self.percent = 0.0;
        self.eta = None;
        self.started_at = Some(Utc::now());
        true
    }

    /// Applies an in-progress report from the engine.
    ///
    /// Percent never moves backwards while downloading; engines that fetch
    /// several streams restart their own counter for each one.
    pub fn apply_progress(&mut self, percent: Option<f64>, eta: Option<u64>) -> bool {
        if self.is_terminal() {
            return false;
        }
        if self.status != TaskStatus::Downloading {
            self.status = TaskStatus::Downloading;
            self.started_at.get_or_insert_with(Utc::now);
        }
        self.percent = self.percent.max(clamp_percent(percent.unwrap_or(0.0)));
        self.eta = eta;
        true
    }

    /// Applies the engine's "file written" report.
    ///
    /// The record stays `downloading`; `done` is asserted by the worker once
    /// the whole engine call has returned.
    pub fn apply_finished(&mut self, filename: Option<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        if let Some(name) = filename {
            self.filename = Some(name);
        }
        self.status = TaskStatus::Downloading;
        self.percent = 100.0;
        self.eta = Some(0);
        true
    }

    /// Transitions to `done` with the resolved file name (possibly empty).
    pub fn mark_done(&mut self, filename: String) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Done;
        self.percent = 100.0;
        self.eta = Some(0);
        self.filename = Some(filename);
        self.error = None;
        self.finished_at = Some(Utc::now());
        true
    }

    /// Transitions to `error` with the given message.
    pub fn mark_failed(&mut self, message: String) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Error;
        self.error = Some(message);
        self.filename = None;
        self.finished_at = Some(Utc::now());
        true
    }
}

fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// A queued unit of work. Consumed exactly once by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDescriptor {
    /// Task whose record the worker updates.
    pub id: TaskId,
    /// Target URL handed to the engine.
    pub url: String,
    /// Cookie file passed to the engine, if one was supplied and exists.
    pub cookie_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> TaskRecord {
        TaskRecord::pending(Uuid::new_v4())
    }

    #[test]
    fn test_status_is_terminal() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Downloading.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Error.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&TaskStatus::Downloading).unwrap();
        assert_eq!(json, "\"downloading\"");
        assert_eq!(TaskStatus::Done.to_string(), "done");
    }

    #[test]
    fn test_pending_record_is_cleared() {
        let rec = record();
        assert_eq!(rec.status, TaskStatus::Pending);
        assert_eq!(rec.percent, 0.0);
        assert!(rec.eta.is_none());
        assert!(rec.filename.is_none());
        assert!(rec.error.is_none());
        assert!(rec.started_at.is_none());
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut rec = record();
        assert!(rec.mark_downloading());

        rec.apply_progress(Some(40.0), Some(12));
        assert_eq!(rec.percent, 40.0);
        assert_eq!(rec.eta, Some(12));

        // Second stream restarts at zero.
        rec.apply_progress(Some(5.0), Some(30));
        assert_eq!(rec.percent, 40.0);
        assert_eq!(rec.eta, Some(30));

        rec.apply_progress(Some(250.0), None);
        assert_eq!(rec.percent, 100.0);
    }

    #[test]
    fn test_missing_or_nan_percent_counts_as_zero() {
        let mut rec = record();
        rec.mark_downloading();
        rec.apply_progress(None, None);
        assert_eq!(rec.percent, 0.0);
        rec.apply_progress(Some(f64::NAN), None);
        assert_eq!(rec.percent, 0.0);
    }

    #[test]
    fn test_finished_keeps_downloading() {
        let mut rec = record();
        rec.mark_downloading();
        rec.apply_finished(Some("clip.mp4".to_string()));

        assert_eq!(rec.status, TaskStatus::Downloading);
        assert_eq!(rec.percent, 100.0);
        assert_eq!(rec.eta, Some(0));
        assert_eq!(rec.filename.as_deref(), Some("clip.mp4"));

        // A finished report without a path keeps the earlier name.
        rec.apply_finished(None);
        assert_eq!(rec.filename.as_deref(), Some("clip.mp4"));
    }

    #[test]
    fn test_done_and_error_are_frozen() {
        let mut rec = record();
        rec.mark_downloading();
        assert!(rec.mark_done("a.mp4".to_string()));
        assert!(rec.finished_at.is_some());

        assert!(!rec.apply_progress(Some(10.0), None));
        assert!(!rec.mark_failed("late".to_string()));
        assert_eq!(rec.status, TaskStatus::Done);
        assert!(rec.error.is_none());

        let mut rec = record();
        rec.mark_downloading();
        rec.apply_finished(Some("partial.mp4".to_string()));
        assert!(rec.mark_failed("boom".to_string()));
        assert_eq!(rec.status, TaskStatus::Error);
        assert!(rec.filename.is_none());
        assert!(!rec.mark_done("x".to_string()));
        assert!(!rec.mark_downloading());
    }
}
