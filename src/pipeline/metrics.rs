//! Pixel-level feature measurement for extracted regions.
//!
//! Four numbers decide whether a region looks like a chart:
//!
//! 1. `density` — fraction of pixels darker than a near-white threshold.
//!    Charts sit between near-blank scans and fully covered photographs.
//! 2. `color_variance` — mean per-channel variance. Flat fills and
//!    grayscale scans score low; multi-series charts score high.
//! 3. `line_count` — Hough line candidates over a Canny edge map, picking up
//!    axes and gridlines.
//! 4. `rectangle_count` — external edge contours whose minimum-area
//!    rectangle exceeds 10 px on both sides, picking up bars and legends
//!    while ignoring noise-scale specks.
//!
//! Measurement never aborts the pipeline: any internal failure degrades to
//! the zero vector (which classifies as a plain image) with a `warn!` log.

use crate::pipeline::extract::Region;
use image::{DynamicImage, GrayImage};
use imageproc::contours::{find_contours, Contour};
use imageproc::edges::canny;
use imageproc::geometry::min_area_rect;
use imageproc::hough::{detect_lines, LineDetectionOptions};
use imageproc::point::Point;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Pixels with luminance below this (out of 255) count toward `density`.
pub const NEAR_WHITE_THRESHOLD: u8 = 240;

/// Canny gradient thresholds (low, high).
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Hough accumulator votes required for a line candidate.
const HOUGH_VOTE_THRESHOLD: u32 = 50;
/// Non-maximum suppression radius in (rho, theta) space.
const HOUGH_SUPPRESSION_RADIUS: u32 = 8;

/// Both sides of a contour's minimum-area rectangle must exceed this many
/// pixels to count; filters out noise-scale artefacts.
const MIN_RECTANGLE_SIDE: f32 = 10.0;

/// Below this dimension the edge/line/rectangle pass is skipped — there is
/// no line structure to find in a sliver.
const MIN_STRUCTURAL_DIM: u32 = 3;

/// The four measurements consumed by the classifier.
///
/// Derived purely from a region's pixels; computed, consumed, discarded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Fraction of pixels darker than [`NEAR_WHITE_THRESHOLD`], in `[0, 1]`.
    pub density: f32,
    /// Mean of the per-channel variances across the full image.
    pub color_variance: f32,
    /// Number of detected line candidates (0 if none).
    pub line_count: u32,
    /// Number of qualifying minimum-area rectangles.
    pub rectangle_count: u32,
}

impl FeatureVector {
    /// The conservative fallback: classifies as a plain image.
    pub const ZERO: FeatureVector = FeatureVector {
        density: 0.0,
        color_variance: 0.0,
        line_count: 0,
        rectangle_count: 0,
    };
}

/// Internal measurement failure; recovered by [`compute`].
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("image has zero area")]
    EmptyImage,
}

/// Measure a region, falling back to the zero vector on failure.
///
/// The fallback biases misclassification toward plain images rather than
/// crashing the walk; the failure is logged with page and image index.
pub fn compute(region: &Region) -> FeatureVector {
    match measure(&region.pixels) {
        Ok(features) => {
            debug!(
                page = region.page_number,
                image = region.source_index,
                density = features.density,
                color_variance = features.color_variance,
                lines = features.line_count,
                rectangles = features.rectangle_count,
                "region measured"
            );
            features
        }
        Err(e) => {
            warn!(
                page = region.page_number,
                image = region.source_index,
                error = %e,
                "feature measurement failed; using zero vector"
            );
            FeatureVector::ZERO
        }
    }
}

/// Measure a decoded image directly.
pub fn measure(image: &DynamicImage) -> Result<FeatureVector, MetricsError> {
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();
    if width == 0 || height == 0 {
        return Err(MetricsError::EmptyImage);
    }

    let total = (width as u64 * height as u64) as f64;
    let dark = luma
        .as_raw()
        .iter()
        .filter(|&&v| v < NEAR_WHITE_THRESHOLD)
        .count();
    let density = (dark as f64 / total) as f32;

    let color_variance = mean_channel_variance(image, &luma);

    if width < MIN_STRUCTURAL_DIM || height < MIN_STRUCTURAL_DIM {
        return Ok(FeatureVector {
            density,
            color_variance,
            line_count: 0,
            rectangle_count: 0,
        });
    }

    let edges = canny(&luma, CANNY_LOW, CANNY_HIGH);
    let lines = detect_lines(
        &edges,
        LineDetectionOptions {
            vote_threshold: HOUGH_VOTE_THRESHOLD,
            suppression_radius: HOUGH_SUPPRESSION_RADIUS,
        },
    );

    Ok(FeatureVector {
        density,
        color_variance,
        line_count: lines.len() as u32,
        rectangle_count: count_rectangles(&edges),
    })
}

/// Mean of the per-channel variances; luminance variance for single-channel
/// sources.
fn mean_channel_variance(image: &DynamicImage, luma: &GrayImage) -> f32 {
    if image.color().channel_count() <= 2 {
        variance(luma.as_raw().iter().copied()) as f32
    } else {
        let rgb = image.to_rgb8();
        let raw = rgb.as_raw();
        let per_channel: f64 = (0..3)
            .map(|channel| variance(raw.iter().copied().skip(channel).step_by(3)))
            .sum();
        (per_channel / 3.0) as f32
    }
}

fn variance(samples: impl Iterator<Item = u8>) -> f64 {
    let mut n = 0u64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for v in samples {
        let v = v as f64;
        n += 1;
        sum += v;
        sum_sq += v * v;
    }
    if n == 0 {
        return 0.0;
    }
    let mean = sum / n as f64;
    (sum_sq / n as f64 - mean * mean).max(0.0)
}

/// Count external contours whose minimum-area rectangle exceeds
/// [`MIN_RECTANGLE_SIDE`] on both sides.
fn count_rectangles(edges: &GrayImage) -> u32 {
    let contours: Vec<Contour<i32>> = find_contours(edges);
    contours
        .iter()
        .filter(|c| c.parent.is_none() && c.points.len() >= 4)
        .filter(|c| {
            let corners = min_area_rect(&c.points);
            let side_a = side_length(corners[0], corners[1]);
            let side_b = side_length(corners[1], corners[2]);
            side_a > MIN_RECTANGLE_SIDE && side_b > MIN_RECTANGLE_SIDE
        })
        .count() as u32
}

fn side_length(a: Point<i32>, b: Point<i32>) -> f32 {
    let dx = (a.x - b.x) as f32;
    let dy = (a.y - b.y) as f32;
    dx.hypot(dy)
}
