use std::time::Instant;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::pipeline::context::{PipelineConfig, StageContext};
use crate::pipeline::runner::{self, RunOutcome};
use crate::repositories::jobs::{self, JobPatch};
use crate::services::image_store::ImageStore;
use crate::services::job_store::{JobStore, PgJobStore};
use crate::services::recognition::HttpRecognizer;

/// One worker: claim the oldest uploaded job, run the five-stage pipeline
/// to completion or failure, release, repeat. Concurrency across jobs
/// comes from running several of these loops.
pub(crate) async fn run(
    state: AppState,
    recognizer: HttpRecognizer,
    images: ImageStore,
    mut shutdown: watch::Receiver<bool>,
) {
    let store = PgJobStore::new(state.clone());
    let config = PipelineConfig::from_settings(state.settings());
    let poll_interval = Duration::from_secs(state.settings().worker().poll_interval_seconds);

    loop {
        if *shutdown.borrow() {
            break;
        }

        match claim_next_job(state.db()).await {
            Ok(Some(job_id)) => {
                process_job(&store, &recognizer, &images, config, job_id).await;
                continue;
            }
            Ok(None) => {}
            Err(err) => tracing::error!(error = %err, "Failed to claim survey job"),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(poll_interval) => {}
        }
    }
}

async fn claim_next_job(pool: &PgPool) -> Result<Option<Uuid>> {
    jobs::claim_next_for_processing(pool, primitive_now_utc())
        .await
        .context("Failed to claim survey job")
}

async fn process_job(
    store: &PgJobStore,
    recognizer: &HttpRecognizer,
    images: &ImageStore,
    config: PipelineConfig,
    job_id: Uuid,
) {
    let started = Instant::now();
    let ctx = StageContext { job_id, store, images, recognizer, config };

    match runner::run_job(&ctx).await {
        Ok(RunOutcome::Completed { questions, options }) => {
            metrics::counter!("survey_jobs_total", "status" => "completed").increment(1);
            metrics::histogram!("survey_job_duration_seconds")
                .record(started.elapsed().as_secs_f64());
            tracing::info!(job_id = %job_id, questions, options, "Survey job completed");
        }
        Ok(RunOutcome::Failed { stage, message }) => {
            metrics::counter!("survey_jobs_total", "status" => "failed").increment(1);
            tracing::error!(
                job_id = %job_id,
                stage = stage.as_str(),
                error = %message,
                "Survey job failed"
            );
        }
        Err(err) => {
            // The failure write itself did not land; make a last attempt so
            // the job does not stay in `processing` forever.
            metrics::counter!("survey_jobs_total", "status" => "error").increment(1);
            tracing::error!(job_id = %job_id, error = %err, "Survey job aborted unexpectedly");
            if let Err(recovery_err) =
                store.update(job_id, JobPatch::failed(format!("worker: {err:#}"))).await
            {
                tracing::error!(
                    job_id = %job_id,
                    error = %recovery_err,
                    "Failed to mark survey job failed"
                );
            }
        }
    }
}
