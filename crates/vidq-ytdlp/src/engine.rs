//! [`Engine`] implementation that drives the `yt-dlp` program.

use crate::parse::{FILE_MARKER, OutputLine, PROGRESS_MARKER, parse_line};
use std::ffi::OsString;
use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use vidq_queue::{Engine, EngineError, EngineOutput, EngineRequest, ProgressSink};

/// How to invoke yt-dlp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YtDlpConfig {
    /// Program to run.
    pub program: PathBuf,
    /// Arguments placed before everything else, e.g. `["-m", "yt_dlp"]`
    /// when `program` is a Python interpreter.
    pub program_args: Vec<OsString>,
    /// Container to merge separate video and audio streams into.
    pub merge_output_format: Option<String>,
    /// Extra arguments appended after the generated ones.
    pub extra_args: Vec<OsString>,
}

impl Default for YtDlpConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            program_args: Vec::new(),
            merge_output_format: Some("mp4".to_string()),
            extra_args: Vec::new(),
        }
    }
}

/// Runs downloads through a `yt-dlp` child process.
///
/// Progress is read from yt-dlp's templated progress output and the final
/// file paths from its `after_move` print hook, so no console scraping of
/// the human readable progress bar is needed.
#[derive(Debug, Clone, Default)]
pub struct YtDlpEngine {
    config: YtDlpConfig,
}

impl YtDlpEngine {
    /// Creates an engine using `yt-dlp` from `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine with the given configuration.
    #[must_use]
    pub const fn with_config(config: YtDlpConfig) -> Self {
        Self { config }
    }

    /// Creates an engine running a specific yt-dlp executable.
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self::with_config(YtDlpConfig {
            program: program.into(),
            ..YtDlpConfig::default()
        })
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &YtDlpConfig {
        &self.config
    }

    /// Builds the full argument list for a request.
    #[must_use]
    pub fn args(&self, request: &EngineRequest) -> Vec<OsString> {
        let mut args = self.config.program_args.clone();
        args.extend(
            [
                "--newline",
                "--progress",
                "--no-simulate",
                "--no-playlist",
                "--progress-template",
            ]
            .map(OsString::from),
        );
        args.push(format!("download:{PROGRESS_MARKER}%(progress)j").into());
        args.push("--print".into());
        args.push(format!("after_move:{FILE_MARKER}%(filepath)s").into());

        if let Some(format) = &self.config.merge_output_format {
            args.push("--merge-output-format".into());
            args.push(format.into());
        }

        args.push("--paths".into());
        args.push(request.output_dir.clone().into_os_string());
        args.push("--output".into());
        args.push((&request.output_template).into());

        if let Some(cookies) = &request.cookie_file {
            args.push("--cookies".into());
            args.push(cookies.clone().into_os_string());
        }

        args.extend(self.config.extra_args.iter().cloned());
        args.push("--".into());
        args.push((&request.url).into());
        args
    }
}

impl Engine for YtDlpEngine {
    fn run(
        &self,
        request: &EngineRequest,
        progress: &mut dyn ProgressSink,
    ) -> Result<EngineOutput, EngineError> {
        let mut child = Command::new(&self.config.program)
            .args(self.args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| EngineError::Spawn {
                program: self.config.program.clone(),
                source: e,
            })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx));
        } else {
            drop(tx);
        }

        let mut files = Vec::new();
        let mut last_error = None;
        for line in rx {
            match line {
                OutputLine::Progress(event) => progress.report(event),
                OutputLine::File(path) => files.push(path),
                OutputLine::Error(message) => last_error = Some(message),
                OutputLine::Other(text) => tracing::trace!(target: "vidq_ytdlp::output", "{text}"),
            }
        }

        let read_result = readers.into_iter().try_for_each(|reader| {
            reader
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("output reader panicked")))
        });
        let status = child.wait()?;
        read_result?;

        if !status.success() {
            tracing::debug!(%status, url = %request.url, "yt-dlp exited with failure");
            return Err(EngineError::Failed(last_error.unwrap_or_default()));
        }

        Ok(EngineOutput {
            requested_downloads: files,
        })
    }
}

/// Forwards classified lines from `source` until EOF.
///
/// Reads raw bytes so a non-UTF-8 title cannot stop the drain and stall the
/// child on a full pipe.
fn spawn_reader<R>(source: R, tx: Sender<OutputLine>) -> JoinHandle<io::Result<()>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(source);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(());
            }
            let line = String::from_utf8_lossy(&buf);
            // The receiver only goes away once the run is over; keep draining.
            let _ = tx.send(parse_line(&line));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use vidq_queue::ProgressEvent;

    fn request() -> EngineRequest {
        EngineRequest {
            url: "https://example.com/watch?v=abc".to_string(),
            cookie_file: None,
            output_dir: PathBuf::from("/srv/downloads"),
            output_template: "%(title).100s [%(id)s].%(ext)s".to_string(),
        }
    }

    fn strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_args_layout() {
        let args = strings(YtDlpEngine::new().args(&request()));

        assert_eq!(args[0], "--newline");
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"download:vidq-progress %(progress)j".to_string()));
        assert!(args.contains(&"after_move:vidq-file %(filepath)s".to_string()));

        let paths = args.iter().position(|a| a == "--paths").unwrap();
        assert_eq!(args[paths + 1], "/srv/downloads");
        let output = args.iter().position(|a| a == "--output").unwrap();
        assert_eq!(args[output + 1], "%(title).100s [%(id)s].%(ext)s");
        let merge = args.iter().position(|a| a == "--merge-output-format").unwrap();
        assert_eq!(args[merge + 1], "mp4");

        assert!(!args.contains(&"--cookies".to_string()));
        assert_eq!(&args[args.len() - 2..], ["--", "https://example.com/watch?v=abc"]);
    }

    #[test]
    fn test_args_fetch_single_video_from_playlist_url() {
        let mut req = request();
        req.url = "https://example.com/watch?v=abc&list=PL1".to_string();

        let args = strings(YtDlpEngine::new().args(&req));
        let no_playlist = args.iter().position(|a| a == "--no-playlist").unwrap();
        assert!(no_playlist < args.iter().position(|a| a == "--").unwrap());
        assert_eq!(args.last().unwrap(), "https://example.com/watch?v=abc&list=PL1");
    }

    #[test]
    fn test_args_with_cookies_and_extras() {
        let engine = YtDlpEngine::with_config(YtDlpConfig {
            program: PathBuf::from("python3"),
            program_args: vec!["-m".into(), "yt_dlp".into()],
            merge_output_format: None,
            extra_args: vec!["--limit-rate".into(), "2M".into()],
        });
        let mut req = request();
        req.cookie_file = Some(PathBuf::from("/secrets/cookies.txt"));

        let args = strings(engine.args(&req));
        assert_eq!(&args[..2], ["-m", "yt_dlp"]);
        let cookies = args.iter().position(|a| a == "--cookies").unwrap();
        assert_eq!(args[cookies + 1], "/secrets/cookies.txt");
        assert!(!args.contains(&"--merge-output-format".to_string()));
        let limit = args.iter().position(|a| a == "--limit-rate").unwrap();
        assert!(limit < args.iter().position(|a| a == "--").unwrap());
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let engine = YtDlpEngine::with_program("/nonexistent/bin/yt-dlp");
        let mut sink = |_event: ProgressEvent| {};

        let err = engine.run(&request(), &mut sink).unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }

    #[cfg(unix)]
    fn script_engine(dir: &Path, body: &str) -> YtDlpEngine {
        let script = dir.join("fake-yt-dlp.sh");
        std::fs::write(&script, format!("{body}\n")).unwrap();
        YtDlpEngine::with_config(YtDlpConfig {
            program: PathBuf::from("/bin/sh"),
            program_args: vec![script.into_os_string()],
            ..YtDlpConfig::default()
        })
    }

    #[cfg(unix)]
    #[test]
    fn test_run_reports_progress_and_files() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let engine = script_engine(
            temp_dir.path(),
            r#"echo '[youtube] abc: Downloading webpage'
echo 'vidq-progress {"status": "downloading", "downloaded_bytes": 10, "total_bytes": 40, "eta": 3}' >&2
echo 'vidq-progress {"status": "downloading", "downloaded_bytes": 40, "total_bytes": 40, "eta": 0}' >&2
echo 'vidq-progress {"status": "finished", "filename": "/srv/downloads/Clip [abc].mp4"}' >&2
echo 'vidq-file /srv/downloads/Clip [abc].mp4'
exit 0"#,
        );

        let mut events = Vec::new();
        let mut sink = |event: ProgressEvent| events.push(event);
        let output = engine.run(&request(), &mut sink).unwrap();

        assert_eq!(
            output.requested_downloads,
            vec![PathBuf::from("/srv/downloads/Clip [abc].mp4")]
        );
        assert_eq!(
            events,
            vec![
                ProgressEvent::Downloading {
                    percent: Some(25.0),
                    eta: Some(3),
                },
                ProgressEvent::Downloading {
                    percent: Some(100.0),
                    eta: Some(0),
                },
                ProgressEvent::Finished {
                    path: Some(PathBuf::from("/srv/downloads/Clip [abc].mp4")),
                },
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_failure_uses_last_error_line() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let engine = script_engine(
            temp_dir.path(),
            r#"echo 'WARNING: something odd' >&2
echo 'ERROR: [generic] Unsupported URL: https://example.com/watch?v=abc' >&2
exit 1"#,
        );

        let mut sink = |_event: ProgressEvent| {};
        let err = engine.run(&request(), &mut sink).unwrap_err();
        assert_eq!(
            err.to_string(),
            "[generic] Unsupported URL: https://example.com/watch?v=abc"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_run_failure_without_message_is_empty() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let engine = script_engine(temp_dir.path(), "exit 2");

        let mut sink = |_event: ProgressEvent| {};
        let err = engine.run(&request(), &mut sink).unwrap_err();
        assert!(matches!(&err, EngineError::Failed(msg) if msg.is_empty()));
    }
}
