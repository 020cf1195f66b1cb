use crate::db::types::JobStage;
use crate::pipeline::context::StageContext;
use crate::pipeline::error::StageError;
use crate::pipeline::types::{MarkAssociation, OptionPosition, StructuredQuestion};
use crate::repositories::jobs::JobPatch;

/// Converts associations into the question/options/responses model and
/// records question and option counts on the job. The counts land before
/// aggregation runs, so they stay visible even if aggregation fails.
pub(crate) async fn run(
    ctx: &StageContext<'_>,
    associations: Vec<MarkAssociation>,
) -> Result<Vec<StructuredQuestion>, StageError> {
    ctx.store
        .update(
            ctx.job_id,
            JobPatch {
                stage: Some(JobStage::Structure),
                progress: Some(85.0),
                ..JobPatch::default()
            },
        )
        .await
        .map_err(|err| StageError::Structuring(format!("{err:#}")))?;

    let questions = structure_associations(associations);

    let num_questions = i32::try_from(questions.len())
        .map_err(|_| StageError::Structuring("question count overflows".to_string()))?;
    let num_options =
        i32::try_from(questions.iter().map(|question| question.options.len()).sum::<usize>())
            .map_err(|_| StageError::Structuring("option count overflows".to_string()))?;

    ctx.store
        .update(
            ctx.job_id,
            JobPatch {
                progress: Some(90.0),
                num_questions: Some(num_questions),
                num_options: Some(num_options),
                ..JobPatch::default()
            },
        )
        .await
        .map_err(|err| StageError::Structuring(format!("{err:#}")))?;

    Ok(questions)
}

/// Groups by exact question-text equality, in first-seen order. Two
/// differently-recognized strings for one physical question stay two
/// questions; that fidelity limit comes from upstream recognition.
pub(crate) fn structure_associations(
    associations: Vec<MarkAssociation>,
) -> Vec<StructuredQuestion> {
    let mut grouped: Vec<(String, Vec<MarkAssociation>)> = Vec::new();

    for association in associations {
        match grouped.iter_mut().find(|(question, _)| *question == association.question) {
            Some((_, members)) => members.push(association),
            None => grouped.push((association.question.clone(), vec![association])),
        }
    }

    grouped
        .into_iter()
        .map(|(question, mut members)| {
            sort_reading_order(&mut members);
            StructuredQuestion {
                question,
                options: members
                    .iter()
                    .map(|member| OptionPosition { x: member.x, y: member.y })
                    .collect(),
                responses: members.iter().map(|member| member.filled).collect(),
            }
        })
        .collect()
}

/// Orders options along the dominant layout axis: left-to-right when the
/// marks spread horizontally, top-to-bottom when they stack vertically.
fn sort_reading_order(members: &mut [MarkAssociation]) {
    let (min_x, max_x) = span(members.iter().map(|member| member.x));
    let (min_y, max_y) = span(members.iter().map(|member| member.y));

    if max_x - min_x >= max_y - min_y {
        members.sort_by_key(|member| (member.x, member.y));
    } else {
        members.sort_by_key(|member| (member.y, member.x));
    }
}

fn span(values: impl Iterator<Item = u32>) -> (u32, u32) {
    values.fold((u32::MAX, 0), |(min, max), value| (min.min(value), max.max(value)))
}
