use image::imageops::crop_imm;
use image::GrayImage;

use crate::db::types::JobStage;
use crate::pipeline::context::StageContext;
use crate::pipeline::error::StageError;
use crate::pipeline::types::{Mark, MarkAssociation, QuestionGroup};
use crate::repositories::jobs::JobPatch;

/// Groups marks into questions by vertical proximity and recognizes the
/// text band above each group. Every mark in a group is paired with the
/// same question text.
pub(crate) async fn run(
    ctx: &StageContext<'_>,
    processed_path: &str,
    marks: Vec<Mark>,
) -> Result<Vec<MarkAssociation>, StageError> {
    ctx.store
        .update(
            ctx.job_id,
            JobPatch {
                stage: Some(JobStage::Associate),
                progress: Some(70.0),
                ..JobPatch::default()
            },
        )
        .await
        .map_err(|err| StageError::Recognition(format!("{err:#}")))?;

    let bytes = ctx
        .images
        .read(processed_path)
        .await
        .map_err(|err| StageError::Recognition(format!("{processed_path}: {err}")))?;
    let image = image::load_from_memory(&bytes)
        .map_err(|err| StageError::Recognition(err.to_string()))?
        .to_luma8();

    let groups = group_by_vertical_gap(marks, ctx.config.associator.vertical_gap);

    let mut associations = Vec::new();
    for group in groups {
        let question = recognize_group(ctx, &image, &group).await?;
        for mark in &group.marks {
            associations.push(MarkAssociation {
                question: question.clone(),
                x: mark.x,
                y: mark.y,
                filled: mark.filled,
            });
        }
    }

    ctx.store
        .update(ctx.job_id, JobPatch::with_progress(80.0))
        .await
        .map_err(|err| StageError::Recognition(format!("{err:#}")))?;

    Ok(associations)
}

/// Single linear pass over y-sorted marks: a vertical gap below the
/// threshold keeps the run in one group, a gap at or above it starts a
/// new group.
pub(crate) fn group_by_vertical_gap(mut marks: Vec<Mark>, gap: f64) -> Vec<QuestionGroup> {
    marks.sort_by_key(|mark| (mark.y, mark.x));

    let mut groups = Vec::new();
    let mut current: Vec<Mark> = Vec::new();

    for mark in marks {
        match current.last() {
            Some(previous) if (f64::from(mark.y) - f64::from(previous.y)).abs() < gap => {
                current.push(mark);
            }
            Some(_) => {
                groups.push(QuestionGroup { marks: std::mem::replace(&mut current, vec![mark]) });
            }
            None => current.push(mark),
        }
    }

    if !current.is_empty() {
        groups.push(QuestionGroup { marks: current });
    }

    groups
}

/// Region above the group's topmost mark, clipped to the image top. `None`
/// when the mark touches the top edge and the band would be empty.
fn band_above(top: u32, band_height: u32) -> Option<(u32, u32)> {
    let band_y = top.saturating_sub(band_height);
    let height = top - band_y;
    (height > 0).then_some((band_y, height))
}

async fn recognize_group(
    ctx: &StageContext<'_>,
    image: &GrayImage,
    group: &QuestionGroup,
) -> Result<String, StageError> {
    // A group with no readable band keeps its marks, just with empty text.
    let Some((band_y, height)) = band_above(group.top(), ctx.config.associator.band_height) else {
        return Ok(String::new());
    };

    let region = crop_imm(image, 0, band_y, image.width(), height).to_image();
    let text = ctx
        .recognizer
        .recognize(&region)
        .await
        .map_err(|err| StageError::Recognition(format!("{err:#}")))?;

    Ok(text.trim().to_string())
}
