//! Form quality scoring of finalized shot segments.
//!
//! Each category reads one angle extreme from one phase of the segment and
//! checks it against a target range. A category whose angle never had a
//! defined value in that phase is `insufficient data`, never skipped.

use hoopform_models::{
    AngleName, QualityAssessment, QualityCategory, QualityLabel, QualityReport, ShotPhase,
    ShotSegment,
};
use std::collections::BTreeMap;
use tracing::debug;

use crate::config::{ScoringConfig, TargetRange};

/// Which end of an angle's range a rule looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extreme {
    Min,
    Max,
}

/// One grading rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityRule {
    pub category: QualityCategory,
    pub phase: ShotPhase,
    pub angle: AngleName,
    pub extreme: Extreme,
    pub target: TargetRange,
}

/// Grades shot segments against configured target ranges.
#[derive(Debug, Clone)]
pub struct FormQualityScorer {
    rules: Vec<QualityRule>,
}

impl FormQualityScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        use QualityCategory::*;
        let rules = vec![
            QualityRule {
                category: ElbowAlignment,
                phase: ShotPhase::Release,
                angle: AngleName::Elbow,
                extreme: Extreme::Max,
                target: config.elbow_at_release,
            },
            QualityRule {
                category: KneeBend,
                phase: ShotPhase::Load,
                angle: AngleName::Knee,
                extreme: Extreme::Min,
                target: config.knee_at_load,
            },
            QualityRule {
                category: ReleaseAngle,
                phase: ShotPhase::Release,
                angle: AngleName::Release,
                extreme: Extreme::Max,
                target: config.release_angle,
            },
            QualityRule {
                category: HipExtension,
                phase: ShotPhase::Release,
                angle: AngleName::Hip,
                extreme: Extreme::Max,
                target: config.hip_at_release,
            },
            QualityRule {
                category: FollowThrough,
                phase: ShotPhase::FollowThrough,
                angle: AngleName::Elbow,
                extreme: Extreme::Max,
                target: config.elbow_at_follow_through,
            },
        ];
        Self { rules }
    }

    pub fn rules(&self) -> &[QualityRule] {
        &self.rules
    }

    /// Grade one finalized segment.
    pub fn score(&self, segment: &ShotSegment) -> QualityReport {
        let mut categories = BTreeMap::new();
        for rule in &self.rules {
            categories.insert(rule.category, assess(rule, segment));
        }

        let gradable: Vec<&QualityAssessment> = categories
            .values()
            .filter(|a| a.label != QualityLabel::InsufficientData)
            .collect();
        let overall_score = if gradable.is_empty() {
            None
        } else {
            let good = gradable
                .iter()
                .filter(|a| a.label == QualityLabel::Good)
                .count();
            Some(good as f64 / gradable.len() as f64)
        };

        debug!(
            shot = segment.shot_index,
            gradable = gradable.len(),
            score = ?overall_score,
            "Scored shot"
        );

        QualityReport {
            categories,
            overall_score,
            segment: segment.clone(),
        }
    }
}

fn assess(rule: &QualityRule, segment: &ShotSegment) -> QualityAssessment {
    let measured = segment
        .extremum(rule.phase, rule.angle)
        .map(|range| match rule.extreme {
            Extreme::Min => range.min,
            Extreme::Max => range.max,
        });
    let label = match measured {
        None => QualityLabel::InsufficientData,
        Some(v) if rule.target.contains(v) => QualityLabel::Good,
        Some(_) => QualityLabel::NeedsWork,
    };
    QualityAssessment {
        label,
        measured,
        target_min: rule.target.min,
        target_max: rule.target.max,
    }
}
