use anyhow::{Context, Result};

use crate::db::models::SurveyJob;
use crate::db::types::JobStage;
use crate::pipeline::context::StageContext;
use crate::pipeline::error::StageError;
use crate::pipeline::types::SurveyDocument;
use crate::pipeline::{aggregate, associate, detect, normalize, structure};
use crate::repositories::jobs::JobPatch;

#[derive(Debug)]
pub(crate) enum RunOutcome {
    Completed { questions: usize, options: usize },
    Failed { stage: JobStage, message: String },
}

/// Drives the five stages for one claimed job. Stage failures are recorded
/// on the job row with a stage-prefixed message; a job either completes
/// with a result or fails with none.
pub(crate) async fn run_job(ctx: &StageContext<'_>) -> Result<RunOutcome> {
    let job = ctx.store.get(ctx.job_id).await.context("Failed to load claimed job")?;

    match run_stages(ctx, &job).await {
        Ok(document) => Ok(RunOutcome::Completed {
            questions: document.statistics.total_questions,
            options: document.statistics.total_options,
        }),
        Err(err) => {
            let stage = err.stage();
            let message = format!("{}: {err}", stage.as_str());
            ctx.store
                .update(ctx.job_id, JobPatch::failed(message.clone()))
                .await
                .context("Failed to record job failure")?;
            Ok(RunOutcome::Failed { stage, message })
        }
    }
}

async fn run_stages(
    ctx: &StageContext<'_>,
    job: &SurveyJob,
) -> Result<SurveyDocument, StageError> {
    let processed_path = normalize::run(ctx, job).await?;
    let marks = detect::run(ctx, &processed_path).await?;
    let associations = associate::run(ctx, &processed_path, marks).await?;
    let questions = structure::run(ctx, associations).await?;
    aggregate::run(ctx, questions).await
}
