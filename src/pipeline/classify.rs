//! Region classification: map a [`FeatureVector`] to a three-way label.
//!
//! The classifier is a hand-tuned additive threshold model, not a trained
//! one. It lives behind the [`RegionClassifier`] trait so a learned model can
//! replace it later without touching the extraction pipeline — callers inject
//! an alternative via [`crate::config::WalkConfig::builder`].

use crate::pipeline::metrics::FeatureVector;
use serde::{Deserialize, Serialize};

/// Weight added when `0.1 < density < 0.8` — charts are neither near-blank
/// nor near-fully covered.
pub const DENSITY_WEIGHT: f32 = 0.3;
/// Weight added when `color_variance > 1000` — charts carry varied colour
/// versus flat scans.
pub const VARIANCE_WEIGHT: f32 = 0.2;
/// Weight added when `line_count > 2` — axis/gridline structure.
pub const LINE_WEIGHT: f32 = 0.3;
/// Weight added when `rectangle_count > 3` — bar/legend structure.
pub const RECTANGLE_WEIGHT: f32 = 0.2;

/// Scores strictly above this are [`Classification::Chart`].
pub const CHART_THRESHOLD: f32 = 0.6;
/// Scores strictly above this (and at most [`CHART_THRESHOLD`]) are
/// [`Classification::PossibleChart`].
pub const POSSIBLE_CHART_THRESHOLD: f32 = 0.3;

// The weights and thresholds above are calibration constants with no
// documented derivation. Changing any of them moves the chart/image split:
// treat adjustments as behavioural changes, not cleanups. Scores equal to a
// threshold stay in the lower bucket, and the f32 arithmetic matters for
// that: 0.3 + 0.3 compares equal to 0.6 in f32 (it would not in f64).

/// The three mutually exclusive outcomes for an extracted region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Strong structural evidence of a chart.
    Chart,
    /// Some chart-like structure; worth a chart-oriented prompt.
    PossibleChart,
    /// No meaningful chart structure detected.
    PlainImage,
}

/// Strategy interface: a pure function from features to a label.
///
/// Implementations must be deterministic — classifying the same vector twice
/// yields the same label.
pub trait RegionClassifier: Send + Sync {
    fn classify(&self, features: &FeatureVector) -> Classification;
}

/// The default additive weighted-threshold classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedThresholdClassifier;

impl WeightedThresholdClassifier {
    /// Compute the raw score in `[0, 1]` for a feature vector.
    ///
    /// Exposed so callers can log or threshold on the confidence directly;
    /// [`RegionClassifier::classify`] is derived from it and nothing else.
    pub fn score(&self, features: &FeatureVector) -> f32 {
        let mut score = 0.0f32;
        if features.density > 0.1 && features.density < 0.8 {
            score += DENSITY_WEIGHT;
        }
        if features.color_variance > 1000.0 {
            score += VARIANCE_WEIGHT;
        }
        if features.line_count > 2 {
            score += LINE_WEIGHT;
        }
        if features.rectangle_count > 3 {
            score += RECTANGLE_WEIGHT;
        }
        score.min(1.0)
    }
}

impl RegionClassifier for WeightedThresholdClassifier {
    fn classify(&self, features: &FeatureVector) -> Classification {
        let score = self.score(features);
        if score > CHART_THRESHOLD {
            Classification::Chart
        } else if score > POSSIBLE_CHART_THRESHOLD {
            Classification::PossibleChart
        } else {
            Classification::PlainImage
        }
    }
}
