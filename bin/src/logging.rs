//! Tracing subscriber setup.

use indicatif::MultiProgress;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// Installs a stderr `fmt` subscriber that writes around the progress bars.
///
/// `RUST_LOG` wins when set; otherwise the level follows the `-v` count.
pub(crate) fn init(verbose: u8, quiet: bool, multi: &MultiProgress) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let multi = multi.clone();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || BarWriter::new(multi.clone(), io::stderr()))
        .with_target(verbose >= 2)
        .with_thread_names(verbose >= 2)
        .init();
}

const fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Writer that clears the bars, writes, then lets them redraw.
pub(crate) struct BarWriter<W> {
    multi: MultiProgress,
    inner: W,
}

impl<W: Write> BarWriter<W> {
    pub(crate) const fn new(multi: MultiProgress, inner: W) -> Self {
        Self { multi, inner }
    }
}

impl<W: Write> Write for BarWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        self.multi.suspend(|| inner.write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let inner = &mut self.inner;
        self.multi.suspend(|| inner.write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
