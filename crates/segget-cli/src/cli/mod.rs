//! CLI for the segget segmented downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use segget_core::config::{self, SeggetConfig};
use segget_core::state_store::StateStore;
use std::path::PathBuf;

use commands::{run_completions, run_forget, run_get, run_resume, run_status};

/// Process exit code when the download stopped before the file was assembled.
pub const EXIT_UNFINISHED: i32 = 2;

/// Top-level CLI for segget.
#[derive(Debug, Parser)]
#[command(name = "segget")]
#[command(about = "segget: segmented file downloader with pause and resume", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download a URL in parallel segments. Ctrl+C pauses and saves progress.
    Get {
        /// Direct HTTP/HTTPS URL to download.
        url: String,
        /// Number of segments (default from config).
        #[arg(short, long, value_name = "N")]
        segments: Option<u32>,
        /// Directory for segment files and the final file (default: current directory).
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Continue a paused or failed download of a URL.
    Resume {
        /// URL given to the earlier `get`.
        url: String,
        /// Number of segments (default: the saved record's count).
        #[arg(short, long, value_name = "N")]
        segments: Option<u32>,
        /// Directory holding the segment files (default: current directory).
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Show saved progress for every tracked file.
    Status,

    /// Drop the saved progress of a file (segment files are left on disk).
    Forget {
        /// File name as shown by `segget status`.
        file_name: String,
    },

    /// Print shell completions to stdout.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn open_store(cfg: &SeggetConfig) -> Result<StateStore> {
    Ok(match &cfg.state_file {
        Some(path) => StateStore::at(path),
        None => StateStore::open_default()?,
    })
}

impl CliCommand {
    /// Parse arguments, run the command, and return the process exit code.
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();
        if let CliCommand::Completions { shell } = cli.command {
            run_completions(shell);
            return Ok(0);
        }

        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let store = open_store(&cfg)?;

        match cli.command {
            CliCommand::Get {
                url,
                segments,
                output,
            } => run_get(&cfg, store, &url, segments, output).await,
            CliCommand::Resume {
                url,
                segments,
                output,
            } => run_resume(&cfg, store, &url, segments, output).await,
            CliCommand::Status => run_status(&store).map(|_| 0),
            CliCommand::Forget { file_name } => run_forget(&store, &file_name).map(|_| 0),
            CliCommand::Completions { .. } => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests;
