//! `segget get <url>` – fresh segmented download.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use segget_core::config::SeggetConfig;
use segget_core::state_store::StateStore;
use segget_core::{Coordinator, Target};

use super::drive::{client_for, download_dir, drive};

pub async fn run_get(
    cfg: &SeggetConfig,
    store: StateStore,
    url: &str,
    segments: Option<u32>,
    output: Option<PathBuf>,
) -> Result<i32> {
    let segments = segments.unwrap_or(cfg.segments);
    let client = client_for(cfg);

    let probe_client = Arc::clone(&client);
    let probe_url = url.to_string();
    let target = tokio::task::spawn_blocking(move || {
        Target::probe(&probe_url, segments, probe_client.as_ref())
    })
    .await??;

    if store.has_record(&target.file_name)? {
        bail!(
            "{} has saved progress; run `segget resume {}` to continue it or `segget forget {}` to start over",
            target.file_name,
            url,
            target.file_name
        );
    }

    let dir = download_dir(output)?;
    println!(
        "Downloading {} ({} bytes) in {} segments to {}",
        target.file_name,
        target.total_size,
        target.segment_count,
        dir.display()
    );
    let coord = Arc::new(Coordinator::new(target, client, store, dir).with_policy(cfg.range_policy));
    drive(coord, false).await
}
