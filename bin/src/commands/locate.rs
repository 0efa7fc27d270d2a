//! Locate command implementation.

use anyhow::{Result, bail};
use std::path::PathBuf;
use vidq_queue::{QueueConfig, locate_download, safe_file_name};

/// Print the full path of a finished download.
pub(crate) fn locate(name: &str, output_dir: Option<PathBuf>) -> Result<()> {
    if safe_file_name(name).is_none() {
        bail!("Invalid file name: {name}");
    }

    let dir = output_dir.unwrap_or_else(QueueConfig::default_path);
    match locate_download(&dir, name) {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => bail!("File not found in {}: {name}", dir.display()),
    }
}
