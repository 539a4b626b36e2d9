//! Run a coordinator off the async runtime while printing progress and
//! turning Ctrl+C into `interrupt()`.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use segget_core::config::SeggetConfig;
use segget_core::fetch::CurlClient;
use segget_core::ledger::ProgressStats;
use segget_core::{Coordinator, DownloadOutcome};

use crate::cli::EXIT_UNFINISHED;

const PROGRESS_INTERVAL_MS: u64 = 500;

pub(super) fn download_dir(output: Option<PathBuf>) -> Result<PathBuf> {
    let dir = match output {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub(super) fn client_for(cfg: &SeggetConfig) -> Arc<CurlClient> {
    Arc::new(CurlClient::new(segget_core::fetch::CurlOptions::from_config(cfg)))
}

/// Run `download()` (or `reinstate()` when `resume`) and map the outcome to an exit code.
pub(super) async fn drive(coord: Arc<Coordinator<CurlClient>>, resume: bool) -> Result<i32> {
    let worker = Arc::clone(&coord);
    let mut task = tokio::task::spawn_blocking(move || {
        if resume {
            worker.reinstate()
        } else {
            worker.download()
        }
    });

    let mut ticker = tokio::time::interval(Duration::from_millis(PROGRESS_INTERVAL_MS));
    let mut interrupted = false;
    let result = loop {
        tokio::select! {
            res = &mut task => break res?,
            _ = tokio::signal::ctrl_c(), if !interrupted => {
                interrupted = true;
                eprintln!("\nStopping; saving progress...");
                coord.interrupt();
            }
            _ = ticker.tick() => {
                if let Some(stats) = coord.progress() {
                    print_progress(&stats);
                }
            }
        }
    };
    if let Some(stats) = coord.progress() {
        print_progress(&stats);
    }
    eprintln!();

    let outcome = result?;
    Ok(report(&coord.target().url, outcome))
}

fn print_progress(stats: &ProgressStats) {
    let done_mib = stats.bytes_done as f64 / 1_048_576.0;
    let total_mib = stats.total_bytes as f64 / 1_048_576.0;
    let rate_mib = stats.bytes_per_sec() / 1_048_576.0;
    let eta = stats
        .eta_secs()
        .map(|s| format!("{:.0}s", s))
        .unwrap_or_else(|| "?".to_string());
    eprint!(
        "\r  {:.1} / {:.1} MiB ({:.1}%)  {:.2} MiB/s  ETA {}  segments {}/{}  ",
        done_mib,
        total_mib,
        stats.fraction() * 100.0,
        rate_mib,
        eta,
        stats.segments_done,
        stats.segment_count
    );
    let _ = std::io::stderr().flush();
}

fn report(url: &str, outcome: DownloadOutcome) -> i32 {
    match outcome {
        DownloadOutcome::Completed { path, bytes } => {
            println!("Saved {} ({} bytes).", path.display(), bytes);
            0
        }
        DownloadOutcome::Paused {
            incomplete,
            state_saved,
        } => {
            println!("Paused with {} segment(s) left.", incomplete.len());
            print_resume_hint(url, state_saved);
            EXIT_UNFINISHED
        }
        DownloadOutcome::Incomplete {
            failed,
            state_saved,
        } => {
            println!("{} segment(s) did not finish:", failed.len());
            for (id, err) in &failed {
                println!("  segment {}: {}", id, err);
            }
            print_resume_hint(url, state_saved);
            EXIT_UNFINISHED
        }
    }
}

fn print_resume_hint(url: &str, state_saved: bool) {
    if state_saved {
        println!("Continue with: segget resume {}", url);
    } else {
        println!("Progress could not be saved; see the log for details.");
    }
}
