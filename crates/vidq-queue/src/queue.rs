//! The download queue and its single worker.
//!
//! Submissions go onto one unbounded FIFO channel. A single worker thread
//! takes them off in order and runs each to completion before looking at the
//! next, so at most one engine call is ever in flight. Callers talk to the
//! worker only through the channel and the [`JobStateStore`].

use crate::files::locate_download;
use crate::request::existing_file;
use crate::{
    DownloadRequest, Engine, EngineRequest, FsListing, JobDescriptor, JobStateStore,
    OutputListing, QueueConfig, StoreProgress, SubmitError, TaskId, TaskRecord, resolve_filename,
};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Message placed on the job channel.
#[derive(Debug)]
enum QueueMessage {
    Job(JobDescriptor),
    /// Stops the worker once every job queued before it has run.
    Shutdown,
}

/// Worker bookkeeping, guarded by one lock.
#[derive(Debug)]
struct Lifecycle {
    /// Receiving end of the channel, parked here until the worker starts.
    receiver: Option<Receiver<QueueMessage>>,
    worker: Option<JoinHandle<()>>,
    closed: bool,
}

/// Single-worker download queue with pollable per-task progress.
///
/// Construct one per process and share it (`Arc<DownloadQueue>` or a plain
/// reference) with every request handler.
pub struct DownloadQueue {
    context: Arc<WorkerContext>,
    sender: Sender<QueueMessage>,
    started: AtomicBool,
    lifecycle: Mutex<Lifecycle>,
}

impl std::fmt::Debug for DownloadQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadQueue")
            .field("config", &self.context.config)
            .field("tasks", &self.context.store.len())
            .field("started", &self.started.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl DownloadQueue {
    /// Name of the worker thread.
    pub const WORKER_THREAD_NAME: &'static str = "vidq-worker";

    /// Placeholder error message for failures that carry no text.
    pub const UNKNOWN_ERROR: &'static str = "Unknown error";

    /// Creates a queue that runs jobs on `engine`.
    ///
    /// The worker is not started until [`start`](Self::start) or the first
    /// [`enqueue`](Self::enqueue).
    #[must_use]
    pub fn new(engine: Arc<dyn Engine>, config: QueueConfig) -> Self {
        Self::with_listing(engine, config, Arc::new(FsListing))
    }

    /// Creates a queue with a custom output directory listing, used when the
    /// engine does not report the file it wrote.
    #[must_use]
    pub fn with_listing(
        engine: Arc<dyn Engine>,
        config: QueueConfig,
        listing: Arc<dyn OutputListing>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            context: Arc::new(WorkerContext {
                engine,
                listing,
                store: JobStateStore::new(),
                config,
            }),
            sender,
            started: AtomicBool::new(false),
            lifecycle: Mutex::new(Lifecycle {
                receiver: Some(receiver),
                worker: None,
                closed: false,
            }),
        }
    }

    /// Starts the worker thread. Safe to call any number of times from any
    /// thread; exactly one worker is ever spawned.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue was shut down or the thread could not
    /// be spawned.
    pub fn start(&self) -> Result<(), SubmitError> {
        if self.started.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut lifecycle = self.lifecycle();
        if self.started.load(Ordering::Acquire) {
            return Ok(());
        }
        if lifecycle.closed {
            return Err(SubmitError::Closed);
        }
        let Some(receiver) = lifecycle.receiver.take() else {
            return Err(SubmitError::Closed);
        };

        let context = Arc::clone(&self.context);
        let handle = thread::Builder::new()
            .name(Self::WORKER_THREAD_NAME.to_string())
            .spawn(move || context.run(receiver))
            .map_err(|e| {
                lifecycle.closed = true;
                SubmitError::WorkerStart { source: e }
            })?;

        lifecycle.worker = Some(handle);
        self.started.store(true, Ordering::Release);
        info!("download worker started");
        Ok(())
    }

    /// Returns true once the worker has been started.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Queues a download and returns its task id without waiting for it.
    ///
    /// A `cookie_file` that does not exist is ignored. The task's record is
    /// `pending` by the time this returns.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::MissingUrl`] for an empty URL and
    /// [`SubmitError::Closed`] after [`shutdown`](Self::shutdown).
    pub fn enqueue(
        &self,
        url: impl Into<String>,
        cookie_file: Option<PathBuf>,
    ) -> Result<TaskId, SubmitError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(SubmitError::MissingUrl);
        }
        let cookie_file = existing_file(cookie_file);

        let id = Uuid::new_v4();
        self.context.store.insert_pending(id);

        if let Err(e) = self.start() {
            self.context.store.remove(id);
            return Err(e);
        }

        // Checked under the lifecycle lock so nothing lands behind the
        // shutdown sentinel.
        let sent = {
            let lifecycle = self.lifecycle();
            !lifecycle.closed
                && self
                    .sender
                    .send(QueueMessage::Job(JobDescriptor {
                        id,
                        url: url.clone(),
                        cookie_file,
                    }))
                    .is_ok()
        };
        if !sent {
            self.context.store.remove(id);
            return Err(SubmitError::Closed);
        }

        info!(task_id = %id, url = %url, "download queued");
        Ok(id)
    }

    /// Queues a validated request. See [`enqueue`](Self::enqueue).
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::Closed`] after [`shutdown`](Self::shutdown).
    pub fn submit(&self, request: DownloadRequest) -> Result<TaskId, SubmitError> {
        let (url, cookie_file) = request.into_parts();
        self.enqueue(url, cookie_file)
    }

    /// Returns a snapshot of the task's record, or `None` for an unknown id.
    #[must_use]
    pub fn status(&self, id: TaskId) -> Option<TaskRecord> {
        self.context.store.get(id)
    }

    /// Returns the configuration this queue was built with.
    #[must_use]
    pub fn config(&self) -> &QueueConfig {
        &self.context.config
    }

    /// Resolves a finished file by base name inside the downloads directory.
    ///
    /// Returns `None` for names that could escape the directory or that do
    /// not name an existing file.
    #[must_use]
    pub fn download_path(&self, name: &str) -> Option<PathBuf> {
        locate_download(self.context.config.downloads_dir(), name)
    }

    /// Stops accepting jobs, lets already-queued jobs finish, then joins the
    /// worker.
    pub fn shutdown(&self) {
        let worker = {
            let mut lifecycle = self.lifecycle();
            if lifecycle.closed {
                return;
            }
            lifecycle.closed = true;
            lifecycle.receiver = None;
            if lifecycle.worker.is_some() {
                let _ = self.sender.send(QueueMessage::Shutdown);
            }
            lifecycle.worker.take()
        };

        if let Some(handle) = worker {
            if handle.join().is_err() {
                warn!("download worker exited abnormally");
            }
        }
        info!("download queue shut down");
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// State shared between the queue handle and the worker thread.
struct WorkerContext {
    engine: Arc<dyn Engine>,
    listing: Arc<dyn OutputListing>,
    store: JobStateStore,
    config: QueueConfig,
}

impl WorkerContext {
    /// Worker loop: one job at a time, strictly in queue order.
    fn run(&self, receiver: Receiver<QueueMessage>) {
        while let Ok(message) = receiver.recv() {
            match message {
                QueueMessage::Job(job) => self.process(job),
                QueueMessage::Shutdown => {
                    debug!("download worker received shutdown");
                    break;
                }
            }
        }
    }

    /// Runs one job to completion. Never panics and never returns early
    /// without leaving the record terminal.
    fn process(&self, job: JobDescriptor) {
        let JobDescriptor {
            id,
            url,
            cookie_file,
        } = job;

        if !self.store.update(id, TaskRecord::mark_downloading) {
            warn!(task_id = %id, "skipping job without an active record");
            return;
        }
        info!(task_id = %id, url = %url, "download started");

        let request = EngineRequest {
            url,
            cookie_file,
            output_dir: self.config.downloads_dir.clone(),
            output_template: self.config.output_template.clone(),
        };

        // No store lock is held here; the sink takes it per event.
        let outcome = {
            let mut sink = StoreProgress::new(&self.store, id);
            panic::catch_unwind(AssertUnwindSafe(|| self.engine.run(&request, &mut sink)))
        };

        match outcome {
            Ok(Ok(output)) => {
                let filename =
                    resolve_filename(&output, &request.output_dir, self.listing.as_ref());
                info!(task_id = %id, filename = %filename, "download finished");
                self.store.update(id, |rec| rec.mark_done(filename));
            }
            Ok(Err(e)) => self.fail(id, e.to_string()),
            Err(payload) => self.fail(id, panic_message(payload.as_ref())),
        }
    }

    fn fail(&self, id: TaskId, message: String) {
        let message = if message.trim().is_empty() {
            DownloadQueue::UNKNOWN_ERROR.to_string()
        } else {
            message
        };
        warn!(task_id = %id, error = %message, "download failed");
        self.store.update(id, |rec| rec.mark_failed(message));
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default()
}
