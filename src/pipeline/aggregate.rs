use crate::db::types::JobStage;
use crate::pipeline::context::StageContext;
use crate::pipeline::error::StageError;
use crate::pipeline::types::{
    AnalyzedQuestion, QuestionStatistics, StructuredQuestion, SurveyDocument, SurveyStatistics,
};
use crate::repositories::jobs::JobPatch;

/// Computes per-question and overall statistics, persists the result and
/// completes the job. The result is written before the status flips, so a
/// reader observing `completed` always finds the result.
pub(crate) async fn run(
    ctx: &StageContext<'_>,
    questions: Vec<StructuredQuestion>,
) -> Result<SurveyDocument, StageError> {
    ctx.store
        .update(
            ctx.job_id,
            JobPatch {
                stage: Some(JobStage::Aggregate),
                progress: Some(95.0),
                ..JobPatch::default()
            },
        )
        .await
        .map_err(|err| StageError::Aggregation(format!("{err:#}")))?;

    let document = analyze(questions);

    ctx.store
        .create_result(ctx.job_id, &document)
        .await
        .map_err(|err| StageError::Aggregation(format!("{err:#}")))?;

    ctx.store
        .update(ctx.job_id, JobPatch::completed())
        .await
        .map_err(|err| StageError::Aggregation(format!("{err:#}")))?;

    Ok(document)
}

/// Pure statistics pass. A question with zero options has percentage 0;
/// an empty survey has selection rate 0.
pub(crate) fn analyze(questions: Vec<StructuredQuestion>) -> SurveyDocument {
    let questions: Vec<AnalyzedQuestion> = questions
        .into_iter()
        .map(|question| {
            let total_options = question.responses.len();
            let selected_count = question.responses.iter().filter(|&&filled| filled).count();
            AnalyzedQuestion {
                question,
                statistics: QuestionStatistics {
                    total_options,
                    selected_count,
                    percentage: rate(selected_count, total_options),
                },
            }
        })
        .collect();

    let total_options = questions.iter().map(|question| question.statistics.total_options).sum();
    let total_selected = questions.iter().map(|question| question.statistics.selected_count).sum();

    SurveyDocument {
        statistics: SurveyStatistics {
            total_questions: questions.len(),
            total_options,
            total_selected,
            selection_rate: rate(total_selected, total_options),
        },
        questions,
    }
}

fn rate(selected: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    selected as f64 / total as f64 * 100.0
}
