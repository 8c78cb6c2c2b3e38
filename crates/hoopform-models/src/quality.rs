//! Form quality reports.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::phase::ShotSegment;

/// Fixed set of graded aspects of a shot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum QualityCategory {
    /// Elbow extension at release.
    ElbowAlignment,
    /// Depth of the knee dip during load.
    KneeBend,
    /// Launch direction of the ball at release.
    ReleaseAngle,
    /// Hip extension at release.
    HipExtension,
    /// Arm extension held through the follow-through.
    FollowThrough,
}

impl QualityCategory {
    pub const ALL: &'static [QualityCategory] = &[
        QualityCategory::ElbowAlignment,
        QualityCategory::KneeBend,
        QualityCategory::ReleaseAngle,
        QualityCategory::HipExtension,
        QualityCategory::FollowThrough,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QualityCategory::ElbowAlignment => "elbow_alignment",
            QualityCategory::KneeBend => "knee_bend",
            QualityCategory::ReleaseAngle => "release_angle",
            QualityCategory::HipExtension => "hip_extension",
            QualityCategory::FollowThrough => "follow_through",
        }
    }
}

impl fmt::Display for QualityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discrete grade for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QualityLabel {
    Good,
    NeedsWork,
    InsufficientData,
}

impl QualityLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityLabel::Good => "good",
            QualityLabel::NeedsWork => "needs work",
            QualityLabel::InsufficientData => "insufficient data",
        }
    }
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Grade of one category with the measurement behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityAssessment {
    pub label: QualityLabel,
    /// Measured extreme, `None` when the angle was never defined
    pub measured: Option<f64>,
    pub target_min: f64,
    pub target_max: f64,
}

/// Terminal result for one finalized shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QualityReport {
    pub categories: BTreeMap<QualityCategory, QualityAssessment>,
    /// Fraction of gradable categories labelled good (0.0-1.0)
    pub overall_score: Option<f64>,
    pub segment: ShotSegment,
}

impl QualityReport {
    pub fn label(&self, category: QualityCategory) -> Option<QualityLabel> {
        self.categories.get(&category).map(|a| a.label)
    }

    /// Categories that could not be graded.
    pub fn insufficient(&self) -> Vec<QualityCategory> {
        self.categories
            .iter()
            .filter(|(_, a)| a.label == QualityLabel::InsufficientData)
            .map(|(c, _)| *c)
            .collect()
    }
}
