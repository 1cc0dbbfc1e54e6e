//! The public result of one inference call.

use serde::{Deserialize, Serialize};

use crate::label::Label;

/// Tolerance for `distribution` summing to one.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Outcome of classifying a single text.
///
/// `distribution` is indexed by [`Label::index`]. `confidence` is always the
/// entry of `distribution` at the predicted label. Presentation code reads
/// these values and must not rescale them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_label: Label,
    pub confidence: f64,
    pub distribution: [f64; Label::COUNT],
}

impl PredictionResult {
    /// Build a result from a class distribution and the index chosen by the
    /// classifier. Returns `None` if the index is outside the label space.
    pub fn from_distribution(distribution: [f64; Label::COUNT], index: usize) -> Option<Self> {
        let predicted_label = Label::from_index(index).ok()?;
        Some(Self {
            predicted_label,
            confidence: distribution[index],
            distribution,
        })
    }

    /// Probability assigned to `label`.
    pub fn probability(&self, label: Label) -> f64 {
        self.distribution[label.index()]
    }

    /// Confidence as a percentage, the way the result card shows it.
    pub fn confidence_percent(&self) -> f64 {
        self.confidence * 100.0
    }

    /// Absolute gap between the two class probabilities.
    pub fn margin(&self) -> f64 {
        (self.distribution[0] - self.distribution[1]).abs()
    }

    /// True when the prediction sits within `tolerance` of the 0.5/0.5 boundary.
    pub fn is_near_boundary(&self, tolerance: f64) -> bool {
        self.margin() <= tolerance
    }
}
