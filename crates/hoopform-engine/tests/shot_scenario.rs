//! End-to-end shot scenarios through the public job API.
//!
//! A right-handed shooter is scripted over forty frames in COCO-17 index
//! space (plus a `sports_ball` class), replayed through a backend, fused,
//! tracked and graded.

use async_trait::async_trait;
use hoopform_engine::{
    run_jobs, BuiltinSchema, EngineConfig, EngineError, EngineResult, Frame, PoseBackend,
    ReplayBackend, SchemaSource, ShotAnalysisJob,
};
use hoopform_engine::pose::SchemaEntry;
use hoopform_models::{
    AnalysisTier, Detection, JointName, KeypointKey, QualityLabel, RawKeypoint, ShotPhase, Side,
};
use std::sync::Arc;

const NOSE: usize = 0;
const RIGHT_SHOULDER: usize = 6;
const RIGHT_ELBOW: usize = 8;
const RIGHT_WRIST: usize = 10;
const RIGHT_HIP: usize = 12;
const RIGHT_KNEE: usize = 14;
const RIGHT_ANKLE: usize = 16;

#[derive(Clone, Copy)]
enum Arm {
    Down(f64),
    Up(f64),
}

#[derive(Clone, Copy)]
enum Ball {
    InHand,
    At(f64, f64),
    Gone,
}

fn pose_detection(frame: usize, knee_angle: f64, arm: Arm, ball: Ball) -> Detection {
    let half = (180.0 - knee_angle).to_radians() / 2.0;
    let knee = (0.5 + 0.15 * half.tan(), 0.80);
    let (elbow, wrist) = match arm {
        Arm::Down(drop) => ((0.52, 0.58 + drop), (0.56, 0.62 + drop)),
        Arm::Up(angle) => {
            let a = angle.to_radians();
            ((0.5, 0.42), (0.5 + 0.08 * a.sin(), 0.42 + 0.08 * a.cos()))
        }
    };

    let point = |(x, y): (f64, f64)| RawKeypoint::new(x, y, 0.9);
    let mut detection = Detection::new("movenet", frame)
        .with_keypoint(NOSE, point((0.5, 0.4)))
        .with_keypoint(RIGHT_SHOULDER, point((0.5, 0.5)))
        .with_keypoint(RIGHT_ELBOW, point(elbow))
        .with_keypoint(RIGHT_WRIST, point(wrist))
        .with_keypoint(RIGHT_HIP, point((0.5, 0.65)))
        .with_keypoint(RIGHT_KNEE, point(knee))
        .with_keypoint(RIGHT_ANKLE, point((0.5, 0.95)));
    match ball {
        Ball::InHand => {
            detection = detection.with_keypoint("sports_ball", point((wrist.0, wrist.1 - 0.03)));
        }
        Ball::At(x, y) => detection = detection.with_keypoint("sports_ball", point((x, y))),
        Ball::Gone => {}
    }
    detection
}

/// Stand, dip, rise to set, extend, release, follow through, stand.
fn scripted_shot() -> Vec<Detection> {
    let mut script: Vec<(f64, Arm, Ball)> = Vec::new();
    script.extend((0..5).map(|_| (170.0, Arm::Down(0.0), Ball::InHand)));
    for (i, knee) in [160.0, 145.0, 135.0, 125.0, 118.0, 112.0, 110.0].iter().enumerate() {
        script.push((*knee, Arm::Down(0.01 * (i + 1) as f64), Ball::InHand));
    }
    script.extend([125.0, 145.0, 165.0].map(|k| (k, Arm::Up(90.0), Ball::InHand)));
    script.extend((0..4).map(|_| (170.0, Arm::Up(90.0), Ball::InHand)));
    script.extend([120.0, 150.0, 175.0].map(|e| (170.0, Arm::Up(e), Ball::InHand)));
    for ball in [
        Ball::At(0.52, 0.26),
        Ball::At(0.54, 0.20),
        Ball::At(0.56, 0.14),
        Ball::At(0.58, 0.08),
        Ball::At(0.60, 0.02),
        Ball::Gone,
        Ball::Gone,
    ] {
        script.push((170.0, Arm::Up(178.0), ball));
    }
    script.extend((0..11).map(|_| (170.0, Arm::Down(0.0), Ball::Gone)));

    script
        .into_iter()
        .enumerate()
        .map(|(i, (knee, arm, ball))| pose_detection(i, knee, arm, ball))
        .collect()
}

fn config(tier: AnalysisTier) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.tier = tier;
    config.backends[0].schema = SchemaSource::Builtin {
        name: BuiltinSchema::Coco17,
        extra: vec![SchemaEntry {
            key: KeypointKey::from("sports_ball"),
            joint: JointName::BallPosition,
        }],
    };
    config
}

fn movenet() -> Arc<dyn PoseBackend> {
    Arc::new(ReplayBackend::from_detections("movenet", scripted_shot()))
}

fn frames(n: usize) -> Vec<Frame> {
    (0..n).map(Frame::new).collect()
}

struct Crashing(&'static str);

#[async_trait]
impl PoseBackend for Crashing {
    fn id(&self) -> &str {
        self.0
    }

    async fn detect(&self, _frame: &Frame) -> EngineResult<Detection> {
        Err(EngineError::backend_failed(self.0, "inference crashed"))
    }
}

#[tokio::test]
async fn test_scripted_shot_yields_one_graded_segment() {
    let mut job = ShotAnalysisJob::new(config(AnalysisTier::Free), vec![movenet()]).unwrap();
    let output = job.run(frames(40)).await;

    assert_eq!(output.shots.len(), 1);
    assert_eq!(output.abandoned_segments, 0);

    let shot = &output.shots[0];
    let segment = &shot.report.segment;
    assert_eq!(shot.side, Some(Side::Right));
    assert_eq!(segment.start_frame, 8);
    assert_eq!(segment.end_frame, 33);
    assert_eq!(
        segment.phases_visited(),
        vec![
            ShotPhase::Load,
            ShotPhase::Set,
            ShotPhase::Release,
            ShotPhase::FollowThrough
        ]
    );
    assert!(shot.report.insufficient().is_empty());
    assert!(shot
        .report
        .categories
        .values()
        .all(|a| a.label != QualityLabel::InsufficientData));

    // Phases move only forward through the cycle
    for pair in output.frames.windows(2) {
        let (a, b) = (pair[0].step.phase, pair[1].step.phase);
        assert!(a == b || ShotPhase::is_legal_transition(a, b), "{a} -> {b}");
    }
}

#[tokio::test]
async fn test_professional_tier_degrades_to_free() {
    let backends: Vec<Arc<dyn PoseBackend>> = vec![
        Arc::new(Crashing("blazepose")),
        Arc::new(Crashing("openpose_verify")),
        movenet(),
    ];
    let mut job = ShotAnalysisJob::new(config(AnalysisTier::Professional), backends).unwrap();
    let output = job.run(frames(40)).await;

    assert!(output
        .frames
        .iter()
        .all(|f| f.tier_used == Some(AnalysisTier::Free)));
    assert_eq!(output.shots.len(), 1);
    assert_eq!(output.shots[0].report.segment.start_frame, 8);
}

#[tokio::test]
async fn test_concurrent_jobs_are_independent() {
    let jobs = (0..3)
        .map(|_| {
            let job = ShotAnalysisJob::new(config(AnalysisTier::Free), vec![movenet()]).unwrap();
            (job, frames(40))
        })
        .collect();

    let results = run_jobs(jobs).await;
    assert_eq!(results.len(), 3);
    for result in results {
        let output = result.unwrap();
        assert_eq!(output.shots.len(), 1);
        assert_eq!(output.shots[0].report.segment.start_frame, 8);
    }
}
