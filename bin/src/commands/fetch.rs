//! Fetch command implementation.
//!
//! Submits every URL to one download queue and polls the task records until
//! all of them are done or failed.

use crate::display;
use anyhow::{Context, Result, bail};
use indicatif::{MultiProgress, ProgressBar};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use vidq_queue::{DownloadQueue, DownloadRequest, QueueConfig, TaskId, TaskRecord, TaskStatus};
use vidq_ytdlp::YtDlpEngine;

/// Lower bound for the status refresh interval.
const MIN_INTERVAL_MS: u64 = 50;

/// Download the given URLs in order.
#[allow(clippy::too_many_arguments)]
pub(crate) async fn fetch(
    urls: &[String],
    cookies: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    template: Option<String>,
    yt_dlp: PathBuf,
    interval_ms: u64,
    multi: &MultiProgress,
    quiet: bool,
) -> Result<()> {
    let mut config = output_dir.map_or_else(QueueConfig::with_default_path, QueueConfig::new);
    if let Some(template) = template {
        config = config.with_output_template(template);
    }
    config
        .ensure_dirs()
        .context("Failed to prepare downloads directory")?;

    let engine = YtDlpEngine::with_program(yt_dlp);
    let queue = Arc::new(DownloadQueue::new(Arc::new(engine), config));
    queue.start().context("Failed to start download worker")?;

    let mut tasks: Vec<(TaskId, String)> = Vec::with_capacity(urls.len());
    for url in urls {
        let request = match DownloadRequest::parse(url, cookies.clone()) {
            Ok(request) => request,
            Err(e) => {
                eprintln!("Skipping '{url}': {e}");
                continue;
            }
        };
        let id = queue.submit(request).context("Failed to queue download")?;
        tracing::debug!(task_id = %id, url = %url, "submitted");
        tasks.push((id, url.clone()));
    }

    if tasks.is_empty() {
        bail!("No valid URLs to download");
    }

    let bars: Vec<(TaskId, ProgressBar)> = tasks
        .iter()
        .map(|(id, url)| (*id, multi.add(display::task_bar(url))))
        .collect();

    let records = watch(&queue, &bars, interval_ms).await?;

    let shutdown = Arc::clone(&queue);
    tokio::task::spawn_blocking(move || shutdown.shutdown())
        .await
        .context("Download worker shutdown failed")?;

    report(&queue, &records, quiet)
}

/// Polls the queue until every task is terminal or Ctrl+C is pressed.
async fn watch(
    queue: &DownloadQueue,
    bars: &[(TaskId, ProgressBar)],
    interval_ms: u64,
) -> Result<Vec<TaskRecord>> {
    let period = Duration::from_millis(interval_ms.max(MIN_INTERVAL_MS));
    let mut ticker = tokio::time::interval(period);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c => {
                let unfinished = bars
                    .iter()
                    .filter(|(id, _)| queue.status(*id).is_none_or(|rec| !rec.is_terminal()))
                    .count();
                bail!("Interrupted with {unfinished} download(s) unfinished");
            }
        }

        let records: Vec<TaskRecord> = bars
            .iter()
            .filter_map(|(id, pb)| {
                let record = queue.status(*id)?;
                display::render(pb, &record);
                Some(record)
            })
            .collect();

        if records.len() == bars.len() && records.iter().all(TaskRecord::is_terminal) {
            return Ok(records);
        }
    }
}

/// Prints where finished files ended up and fails if any download failed.
fn report(queue: &DownloadQueue, records: &[TaskRecord], quiet: bool) -> Result<()> {
    let failed = records
        .iter()
        .filter(|rec| rec.status == TaskStatus::Error)
        .count();

    if !quiet {
        for rec in records.iter().filter(|rec| rec.status == TaskStatus::Done) {
            if let Some(path) = rec
                .filename
                .as_deref()
                .and_then(|name| queue.download_path(name))
            {
                println!("{}", path.display());
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} downloads failed", records.len());
    }
    Ok(())
}
