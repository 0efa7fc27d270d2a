//! Progress bar rendering for task status snapshots.

use indicatif::{ProgressBar, ProgressStyle};
use vidq_queue::{TaskRecord, TaskStatus};

/// Width of the URL label shown in front of each bar.
const LABEL_WIDTH: usize = 40;

/// Creates a percent bar for one task.
pub(crate) fn task_bar(url: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{prefix:40} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .expect("Invalid progress template")
            .progress_chars("=>-"),
    );
    pb.set_prefix(label(url));
    pb.set_message("queued");
    pb
}

/// Brings a bar in line with the latest snapshot.
pub(crate) fn render(pb: &ProgressBar, record: &TaskRecord) {
    if pb.is_finished() {
        return;
    }
    match record.status {
        TaskStatus::Pending => pb.set_message("queued"),
        TaskStatus::Downloading => {
            pb.set_position(percent_position(record.percent));
            pb.set_message(format!("ETA {}", format_eta(record.eta)));
        }
        TaskStatus::Done => {
            pb.set_position(100);
            pb.finish_with_message(summary(record));
        }
        TaskStatus::Error => pb.abandon_with_message(summary(record)),
    }
}

/// One-line outcome of a task.
pub(crate) fn summary(record: &TaskRecord) -> String {
    match record.status {
        TaskStatus::Done => match record.filename.as_deref() {
            Some(name) if !name.is_empty() => format!("done: {name}"),
            _ => "done".to_string(),
        },
        TaskStatus::Error => format!(
            "error: {}",
            record.error.as_deref().unwrap_or("unknown error")
        ),
        status => status.to_string(),
    }
}

/// Formats seconds as `m:ss` or `h:mm:ss`, `--:--` when unknown.
pub(crate) fn format_eta(eta: Option<u64>) -> String {
    let Some(secs) = eta else {
        return "--:--".to_string();
    };
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent_position(percent: f64) -> u64 {
    percent.clamp(0.0, 100.0).round() as u64
}

/// Shortens a URL to fit the label column.
fn label(url: &str) -> String {
    let url = url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    if url.chars().count() <= LABEL_WIDTH {
        return url.to_string();
    }
    let head: String = url.chars().take(LABEL_WIDTH - 3).collect();
    format!("{head}...")
}
