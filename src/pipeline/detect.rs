use image::GrayImage;
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;

use crate::core::config::DetectorSettings;
use crate::db::types::JobStage;
use crate::pipeline::context::StageContext;
use crate::pipeline::error::StageError;
use crate::pipeline::types::Mark;
use crate::repositories::jobs::JobPatch;

/// Finds candidate bubbles in the normalized image and classifies each as
/// filled or empty. An image with no acceptable contours yields an empty
/// mark set, not an error.
pub(crate) async fn run(
    ctx: &StageContext<'_>,
    processed_path: &str,
) -> Result<Vec<Mark>, StageError> {
    ctx.store
        .update(ctx.job_id, JobPatch::at_stage(JobStage::Detect))
        .await
        .map_err(|err| StageError::Detection(format!("{err:#}")))?;

    let bytes = ctx
        .images
        .read(processed_path)
        .await
        .map_err(|err| StageError::Detection(format!("{processed_path}: {err}")))?;
    let binary = image::load_from_memory(&bytes)
        .map_err(|err| StageError::Detection(err.to_string()))?
        .to_luma8();

    let marks = detect_marks(&binary, &ctx.config.detector);

    metrics::histogram!("survey_marks_detected").record(marks.len() as f64);
    tracing::debug!(job_id = %ctx.job_id, marks = marks.len(), "Detected candidate bubbles");

    ctx.store
        .update(ctx.job_id, JobPatch::with_progress(60.0))
        .await
        .map_err(|err| StageError::Detection(format!("{err:#}")))?;

    Ok(marks)
}

/// Extracts outer contours and keeps those passing the dual area and
/// circularity filter. Area alone admits text blobs of bubble size;
/// circularity alone admits tiny specks, so both bounds apply together.
pub(crate) fn detect_marks(binary: &GrayImage, settings: &DetectorSettings) -> Vec<Mark> {
    let contours: Vec<Contour<u32>> = find_contours(binary);
    let mut marks = Vec::new();

    for contour in &contours {
        if contour.border_type != BorderType::Outer || contour.points.len() < 3 {
            continue;
        }

        let (area, perimeter) = contour_metrics(&contour.points);
        if perimeter == 0.0 {
            continue;
        }
        let circularity = 4.0 * std::f64::consts::PI * area / (perimeter * perimeter);
        if !is_candidate(area, circularity, settings) {
            continue;
        }

        let (x, y, width, height) = bounding_box(&contour.points);
        let filled = fill_ratio(binary, x, y, width, height) >= settings.fill_ratio_threshold;
        marks.push(Mark { x, y, width, height, area, circularity, filled });
    }

    marks
}

/// Both bounds are strict: a contour failing either must not become a mark.
fn is_candidate(area: f64, circularity: f64, settings: &DetectorSettings) -> bool {
    area > settings.min_area && area < settings.max_area && circularity > settings.min_circularity
}

/// Shoelace area and closed-polygon perimeter of a contour point chain.
fn contour_metrics(points: &[Point<u32>]) -> (f64, f64) {
    let n = points.len();
    let mut area = 0.0;
    let mut perimeter = 0.0;

    for i in 0..n {
        let j = (i + 1) % n;
        let (xi, yi) = (f64::from(points[i].x), f64::from(points[i].y));
        let (xj, yj) = (f64::from(points[j].x), f64::from(points[j].y));
        area += xi * yj - xj * yi;
        perimeter += (xj - xi).hypot(yj - yi);
    }

    (area.abs() / 2.0, perimeter)
}

fn bounding_box(points: &[Point<u32>]) -> (u32, u32, u32, u32) {
    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0;
    let mut max_y = 0;

    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1)
}

/// Fraction of foreground pixels inside a mark's bounding box.
fn fill_ratio(binary: &GrayImage, x: u32, y: u32, width: u32, height: u32) -> f64 {
    let mut foreground = 0u64;
    for row in y..(y + height).min(binary.height()) {
        for col in x..(x + width).min(binary.width()) {
            if binary.get_pixel(col, row).0[0] > 0 {
                foreground += 1;
            }
        }
    }

    foreground as f64 / f64::from(width * height)
}
