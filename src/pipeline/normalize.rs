use std::io::Cursor;

use image::{GrayImage, ImageFormat};
use imageproc::contrast::adaptive_threshold;
use imageproc::filter::gaussian_blur_f32;

use crate::core::config::NormalizerSettings;
use crate::db::models::SurveyJob;
use crate::db::types::JobStage;
use crate::pipeline::context::StageContext;
use crate::pipeline::error::StageError;
use crate::repositories::jobs::JobPatch;

/// Converts the raw upload into a binary image where ink is foreground,
/// stores it under the processed root and records the path on the job.
/// Returns the stored path; downstream stages re-read it independently.
pub(crate) async fn run(
    ctx: &StageContext<'_>,
    job: &SurveyJob,
) -> Result<String, StageError> {
    ctx.store
        .update(
            ctx.job_id,
            JobPatch {
                stage: Some(JobStage::Normalize),
                progress: Some(20.0),
                ..JobPatch::default()
            },
        )
        .await
        .map_err(|err| StageError::StorageWrite(format!("{err:#}")))?;

    let bytes = ctx
        .images
        .read(&job.source_path)
        .await
        .map_err(|err| StageError::UnreadableImage(format!("{}: {err}", job.source_path)))?;
    let decoded = image::load_from_memory(&bytes)
        .map_err(|err| StageError::UnreadableImage(err.to_string()))?;

    let binary = binarize(&decoded.to_luma8(), &ctx.config.normalizer);

    let mut png = Cursor::new(Vec::new());
    binary
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|err| StageError::StorageWrite(err.to_string()))?;
    let processed_path = ctx
        .images
        .write_normalized(&job.filename, png.get_ref())
        .await
        .map_err(|err| StageError::StorageWrite(err.to_string()))?;

    ctx.store
        .update(
            ctx.job_id,
            JobPatch {
                progress: Some(30.0),
                processed_path: Some(processed_path.clone()),
                ..JobPatch::default()
            },
        )
        .await
        .map_err(|err| StageError::StorageWrite(format!("{err:#}")))?;

    tracing::debug!(job_id = %ctx.job_id, path = %processed_path, "Normalized survey image");

    Ok(processed_path)
}

/// Grayscale smoothing followed by locally-thresholded binarization, so
/// uneven lighting across the sheet does not wash out the marks. The
/// adaptive threshold leaves ink at zero; inverting makes ink foreground.
pub(crate) fn binarize(gray: &GrayImage, settings: &NormalizerSettings) -> GrayImage {
    let blurred = gaussian_blur_f32(gray, settings.blur_sigma);
    let mut binary = adaptive_threshold(&blurred, settings.block_radius);
    image::imageops::invert(&mut binary);
    binary
}
