use anyhow::{Context, Result};
use tokio::sync::watch;

use crate::core::state::AppState;
use crate::services::image_store::ImageStore;
use crate::services::recognition::HttpRecognizer;
use crate::tasks::analysis;

/// Spawns the analysis worker pool and runs it until a shutdown signal
/// arrives, then waits for in-flight jobs to finish.
pub(crate) async fn run(state: AppState) -> Result<()> {
    let recognizer = HttpRecognizer::from_settings(state.settings())?;
    let images = ImageStore::from_settings(state.settings());
    images.ensure_dirs().await.context("Failed to prepare image directories")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let concurrency = state.settings().worker().concurrency as usize;

    let mut handles = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        handles.push(tokio::spawn(analysis::worker::run(
            state.clone(),
            recognizer.clone(),
            images.clone(),
            shutdown_rx.clone(),
        )));
    }

    tracing::info!(workers = concurrency, "Survey analysis workers started");

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to workers");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Worker task join failed");
        }
    }

    Ok(())
}
