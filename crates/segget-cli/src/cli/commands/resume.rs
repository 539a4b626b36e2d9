//! `segget resume <url>` – continue from the saved record.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use segget_core::config::SeggetConfig;
use segget_core::state_store::StateStore;
use segget_core::url_model::derive_filename;
use segget_core::{Coordinator, Target};

use super::drive::{client_for, download_dir, drive};

pub async fn run_resume(
    cfg: &SeggetConfig,
    store: StateStore,
    url: &str,
    segments: Option<u32>,
    output: Option<PathBuf>,
) -> Result<i32> {
    let file_name = derive_filename(url).ok_or_else(|| anyhow!("not a valid URL: {}", url))?;
    let record = store
        .record(&file_name)?
        .ok_or_else(|| anyhow!("no saved progress for {}", file_name))?;
    let segments = segments.unwrap_or(record.segment_count);

    // Re-probe so a changed remote size is caught before any byte is appended.
    let client = client_for(cfg);
    let probe_client = Arc::clone(&client);
    let probe_url = url.to_string();
    let target = tokio::task::spawn_blocking(move || {
        Target::probe(&probe_url, segments, probe_client.as_ref())
    })
    .await??;

    let dir = download_dir(output)?;
    println!(
        "Resuming {} ({} of {} segments left)",
        target.file_name,
        record.incomplete().count(),
        record.segment_count
    );
    let coord = Arc::new(Coordinator::new(target, client, store, dir).with_policy(cfg.range_policy));
    drive(coord, true).await
}
