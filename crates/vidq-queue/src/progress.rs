//! Progress events reported by an engine while a job runs.

use crate::{JobStateStore, TaskId, TaskRecord};
use std::path::{Path, PathBuf};

/// A single progress report from the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Data is being transferred.
    Downloading {
        /// Percent complete for the current stream, if known.
        percent: Option<f64>,
        /// Estimated seconds remaining, if known.
        eta: Option<u64>,
    },
    /// The engine has written its final file, before any post-processing.
    Finished {
        /// Path of the written file, if the engine reported one.
        path: Option<PathBuf>,
    },
}

/// Receiver for progress events during an engine run.
pub trait ProgressSink {
    /// Accepts one progress event.
    fn report(&mut self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressEvent),
{
    fn report(&mut self, event: ProgressEvent) {
        self(event);
    }
}

/// Sink that applies events to one task's record in the state store.
#[derive(Debug)]
pub struct StoreProgress<'a> {
    store: &'a JobStateStore,
    id: TaskId,
}

impl<'a> StoreProgress<'a> {
    /// Creates a sink for the given task.
    #[must_use]
    pub const fn new(store: &'a JobStateStore, id: TaskId) -> Self {
        Self { store, id }
    }
}

impl ProgressSink for StoreProgress<'_> {
    fn report(&mut self, event: ProgressEvent) {
        let applied = match event {
            ProgressEvent::Downloading { percent, eta } => self
                .store
                .update(self.id, |rec| rec.apply_progress(percent, eta)),
            ProgressEvent::Finished { path } => {
                let filename = path.as_deref().and_then(base_name);
                tracing::debug!(task_id = %self.id, ?filename, "engine finished writing");
                self.store
                    .update(self.id, |rec: &mut TaskRecord| rec.apply_finished(filename))
            }
        };

        if !applied {
            tracing::warn!(task_id = %self.id, "dropped progress event for inactive task");
        }
    }
}

/// Returns the final component of `path` as UTF-8, if any.
pub(crate) fn base_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
