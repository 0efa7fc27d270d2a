//! vidq CLI - queue media downloads and watch them finish.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressDrawTarget};
use std::path::PathBuf;

mod commands;
mod display;
mod logging;

#[derive(Parser)]
#[command(name = "vidq")]
#[command(about = "Queue media downloads and watch them finish", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (suppress progress output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download one or more URLs, one at a time, in the given order
    Fetch {
        /// URLs to download (http or https)
        #[arg(required = true)]
        urls: Vec<String>,

        /// Netscape-format cookie file passed to the extractor (ignored if missing)
        #[arg(short, long)]
        cookies: Option<PathBuf>,

        /// Directory finished files are written to. Defaults to the platform data dir.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// File naming template, relative to the output directory
        #[arg(long)]
        template: Option<String>,

        /// Path to the yt-dlp executable
        #[arg(long, default_value = "yt-dlp")]
        yt_dlp: PathBuf,

        /// Status refresh interval in milliseconds
        #[arg(long, default_value = "250")]
        interval: u64,
    },

    /// Print the full path of a finished download
    Locate {
        /// File name as reported when the download finished
        name: String,

        /// Directory finished files are written to. Defaults to the platform data dir.
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let multi = if cli.quiet {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    } else {
        MultiProgress::new()
    };
    logging::init(cli.verbose, cli.quiet, &multi);

    // Show help if no command provided
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Fetch {
            urls,
            cookies,
            output_dir,
            template,
            yt_dlp,
            interval,
        } => {
            commands::fetch::fetch(
                &urls,
                cookies,
                output_dir,
                template,
                yt_dlp,
                interval,
                &multi,
                cli.quiet,
            )
            .await
        }
        Commands::Locate { name, output_dir } => commands::locate::locate(&name, output_dir),
    }
}
