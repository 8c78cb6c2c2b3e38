//! Multi-backend pose fusion.
//!
//! Merges the partial skeletons produced for one frame into a single
//! skeleton, one decision per joint:
//!
//! 1. A joint reported by one backend is used unchanged.
//! 2. A joint reported by several backends becomes the weighted centroid of
//!    their positions, weight = backend reliability × detection confidence.
//!    The fused confidence is the maximum contributing confidence.
//! 3. Contributors farther than `disagreement_threshold` from the strongest
//!    report are outliers and are discarded before averaging.
//! 4. A joint nobody reports is absent.
//!
//! Contributors are sorted before any arithmetic, so the result does not
//! depend on the order the backends were listed in.

use hoopform_models::{Joint, JointName, Point2, Skeleton};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::adapter::WeightedSkeleton;
use crate::config::FusionConfig;

/// Source tag for joints the engine derives rather than detects.
pub const DERIVED_SOURCE: &str = "derived";

/// Fuses per-backend skeletons for a frame.
#[derive(Debug, Clone)]
pub struct PoseFusionEngine {
    config: FusionConfig,
}

struct Contributor<'a> {
    backend: &'a str,
    weight: f64,
    joint: &'a Joint,
}

impl Contributor<'_> {
    fn score(&self) -> f64 {
        self.weight * self.joint.confidence()
    }
}

fn strongest_first(a: &Contributor<'_>, b: &Contributor<'_>) -> Ordering {
    let pa = a.joint.position();
    let pb = b.joint.position();
    b.score()
        .total_cmp(&a.score())
        .then_with(|| a.backend.cmp(b.backend))
        .then_with(|| pa.x.total_cmp(&pb.x))
        .then_with(|| pa.y.total_cmp(&pb.y))
}

impl PoseFusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse zero or more partial skeletons for one frame.
    pub fn fuse(&self, inputs: &[WeightedSkeleton]) -> Skeleton {
        let mut by_joint: BTreeMap<JointName, Vec<Contributor<'_>>> = BTreeMap::new();
        for input in inputs {
            if !(input.weight > 0.0) {
                continue;
            }
            for (name, joint) in input.skeleton.iter() {
                by_joint.entry(name).or_default().push(Contributor {
                    backend: &input.backend,
                    weight: input.weight,
                    joint,
                });
            }
        }

        let mut fused = Skeleton::new();
        for (name, mut contributors) in by_joint {
            contributors.sort_by(strongest_first);
            if let Some(joint) = self.fuse_joint(name, &contributors) {
                fused.insert(name, joint);
            }
        }

        if self.config.derive_hip_center {
            derive_hip_center(&mut fused);
        }

        fused
    }

    fn fuse_joint(&self, name: JointName, contributors: &[Contributor<'_>]) -> Option<Joint> {
        let anchor = contributors.first()?;
        if contributors.len() == 1 {
            return Some(anchor.joint.clone());
        }

        let anchor_pos = anchor.joint.position();
        let (kept, outliers): (Vec<&Contributor<'_>>, Vec<&Contributor<'_>>) = contributors
            .iter()
            .partition(|c| {
                c.joint.position().distance(&anchor_pos) <= self.config.disagreement_threshold
            });

        if !outliers.is_empty() {
            debug!(
                joint = %name,
                anchor = anchor.backend,
                discarded = outliers.len(),
                "Discarded disagreeing joint reports"
            );
        }

        if kept.len() == 1 {
            return Some(anchor.joint.clone());
        }

        let mut weight_sum = 0.0;
        let mut x = 0.0;
        let mut y = 0.0;
        let mut z_weight = 0.0;
        let mut z = 0.0;
        let mut confidence: f64 = 0.0;
        let mut sources = BTreeSet::new();

        for c in &kept {
            let w = c.score();
            let p = c.joint.position();
            weight_sum += w;
            x += w * p.x;
            y += w * p.y;
            if let Some(depth) = p.z {
                z_weight += w;
                z += w * depth;
            }
            confidence = confidence.max(c.joint.confidence());
            sources.extend(c.joint.sources().iter().cloned());
        }

        let position = Point2 {
            x: x / weight_sum,
            y: y / weight_sum,
            z: (z_weight > 0.0).then(|| z / z_weight),
        };
        Joint::with_sources(position, confidence, sources)
    }
}

/// Fill `hip_center` from the hip pair when no backend reported it.
fn derive_hip_center(skeleton: &mut Skeleton) {
    if skeleton.contains(JointName::HipCenter) {
        return;
    }
    let (Some(left), Some(right)) = (
        skeleton.get(JointName::LeftHip),
        skeleton.get(JointName::RightHip),
    ) else {
        return;
    };

    let position = left.position().midpoint(&right.position());
    let confidence = left.confidence().min(right.confidence());
    let mut sources: BTreeSet<String> = left.sources().union(right.sources()).cloned().collect();
    sources.insert(DERIVED_SOURCE.to_string());

    if let Some(joint) = Joint::with_sources(position, confidence, sources) {
        skeleton.insert(JointName::HipCenter, joint);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::seq::SliceRandom;

    fn engine() -> PoseFusionEngine {
        PoseFusionEngine::new(FusionConfig::default())
    }

    fn single(backend: &str, weight: f64, name: JointName, x: f64, y: f64, conf: f64) -> WeightedSkeleton {
        let skeleton: Skeleton = [(name, Joint::new(Point2::new(x, y), conf, backend).unwrap())]
            .into_iter()
            .collect();
        WeightedSkeleton::new(backend, weight, skeleton)
    }

    #[test]
    fn test_empty_input_is_empty_skeleton() {
        assert!(engine().fuse(&[]).is_empty());
    }

    #[test]
    fn test_single_report_unchanged() {
        let input = single("a", 0.9, JointName::LeftWrist, 0.3, 0.4, 0.7);
        let fused = engine().fuse(&[input.clone()]);
        assert_eq!(
            fused.get(JointName::LeftWrist),
            input.skeleton.get(JointName::LeftWrist)
        );
    }

    #[test]
    fn test_weighted_centroid_and_max_confidence() {
        let a = single("a", 1.0, JointName::LeftElbow, 0.40, 0.50, 0.9);
        let b = single("b", 0.5, JointName::LeftElbow, 0.46, 0.50, 0.3);
        let fused = engine().fuse(&[a, b]);
        let elbow = fused.get(JointName::LeftElbow).unwrap();

        // weights 0.9 and 0.15
        let expected_x = (0.9 * 0.40 + 0.15 * 0.46) / 1.05;
        assert!((elbow.position().x - expected_x).abs() < 1e-12);
        assert_eq!(elbow.confidence(), 0.9);
        assert_eq!(elbow.sources().len(), 2);
    }

    #[test]
    fn test_disagreement_keeps_strongest_only() {
        let strong = single("a", 0.9, JointName::RightKnee, 0.5, 0.7, 0.9);
        let weak = single("b", 0.6, JointName::RightKnee, 0.8, 0.2, 0.95);
        let fused = engine().fuse(&[weak, strong.clone()]);
        assert_eq!(
            fused.get(JointName::RightKnee),
            strong.skeleton.get(JointName::RightKnee)
        );
    }

    #[test]
    fn test_joint_absent_everywhere_stays_absent() {
        let a = single("a", 0.9, JointName::Nose, 0.5, 0.1, 0.9);
        let fused = engine().fuse(&[a]);
        assert!(!fused.contains(JointName::LeftAnkle));
    }

    #[test]
    fn test_hip_center_derived_from_hips() {
        let mut skeleton = Skeleton::new();
        skeleton.insert(
            JointName::LeftHip,
            Joint::new(Point2::new(0.4, 0.6), 0.8, "a").unwrap(),
        );
        skeleton.insert(
            JointName::RightHip,
            Joint::new(Point2::new(0.6, 0.62), 0.6, "a").unwrap(),
        );
        let fused = engine().fuse(&[WeightedSkeleton::new("a", 0.9, skeleton)]);
        let center = fused.get(JointName::HipCenter).unwrap();
        assert!((center.position().x - 0.5).abs() < 1e-9);
        assert_eq!(center.confidence(), 0.6);
        assert!(center.sources().contains(DERIVED_SOURCE));
    }

    #[test]
    fn test_shuffled_inputs_fuse_identically() {
        let mut inputs = vec![
            single("a", 0.9, JointName::LeftWrist, 0.30, 0.40, 0.8),
            single("b", 0.7, JointName::LeftWrist, 0.32, 0.41, 0.6),
            single("c", 0.5, JointName::LeftWrist, 0.31, 0.39, 0.9),
            single("d", 0.4, JointName::LeftWrist, 0.90, 0.90, 0.9),
        ];
        let reference = engine().fuse(&inputs);
        let mut rng = rand::rng();
        for _ in 0..50 {
            inputs.shuffle(&mut rng);
            assert_eq!(engine().fuse(&inputs), reference);
        }
    }

    fn arb_report() -> impl Strategy<Value = (usize, u8, f64, f64, f64, f64)> {
        (0usize..4, 0u8..4, 0.0..1.0f64, 0.0..1.0f64, 0.05..1.0f64, 0.05..1.0f64)
    }

    proptest! {
        #[test]
        fn prop_fusion_is_order_independent(
            reports in prop::collection::vec(arb_report(), 0..12),
            rotation in 0usize..12,
        ) {
            let joints = [
                JointName::LeftWrist,
                JointName::RightWrist,
                JointName::LeftKnee,
                JointName::BallPosition,
            ];
            let inputs: Vec<WeightedSkeleton> = reports
                .iter()
                .map(|(joint, backend, x, y, conf, weight)| {
                    single(&format!("b{}", backend), *weight, joints[*joint], *x, *y, *conf)
                })
                .collect();

            let forward = engine().fuse(&inputs);
            let mut reversed = inputs.clone();
            reversed.reverse();
            let mut rotated = inputs.clone();
            if !rotated.is_empty() {
                let k = rotation % rotated.len();
                rotated.rotate_left(k);
            }

            prop_assert_eq!(&engine().fuse(&reversed), &forward);
            prop_assert_eq!(&engine().fuse(&rotated), &forward);
        }

        #[test]
        fn prop_fused_confidence_never_diluted(
            reports in prop::collection::vec((0.0..1.0f64, 0.0..1.0f64, 0.05..1.0f64, 0.05..1.0f64), 1..6),
        ) {
            let inputs: Vec<WeightedSkeleton> = reports
                .iter()
                .enumerate()
                .map(|(i, (x, y, conf, weight))| {
                    single(&format!("b{}", i), *weight, JointName::Nose, *x, *y, *conf)
                })
                .collect();
            let fused = engine().fuse(&inputs);
            let nose = fused.get(JointName::Nose).unwrap();
            let max_conf = reports.iter().map(|r| r.2).fold(0.0, f64::max);
            prop_assert!(nose.confidence() <= max_conf + 1e-12);
            // Fused confidence is always one of the reported ones
            prop_assert!(reports.iter().any(|r| (r.2 - nose.confidence()).abs() < 1e-12));
        }
    }
}
