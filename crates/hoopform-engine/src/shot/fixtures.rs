//! Synthetic shooter poses for tracker and scorer tests.

use hoopform_models::{Detection, Joint, JointName, Point2, RawKeypoint, Skeleton};

pub(crate) const SHOULDER: Point2 = Point2 { x: 0.5, y: 0.5, z: None };
const HIP: Point2 = Point2 { x: 0.5, y: 0.65, z: None };
const ANKLE: Point2 = Point2 { x: 0.5, y: 0.95, z: None };
const UPPER_ARM_UP: Point2 = Point2 { x: 0.5, y: 0.42, z: None };
const FOREARM: f64 = 0.08;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Arm {
    /// Ball held low, wrist below the shoulder, lowered by `drop`
    Down { drop: f64 },
    /// Upper arm vertical, forearm at the given elbow angle
    Up { elbow: f64 },
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Ball {
    InHand,
    At(f64, f64),
    Gone,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Pose {
    pub knee: f64,
    pub arm: Arm,
    pub ball: Ball,
}

impl Pose {
    pub fn new(knee: f64, arm: Arm, ball: Ball) -> Self {
        Self { knee, arm, ball }
    }
}

fn joint(p: Point2) -> Joint {
    Joint::new(p, 0.9, "fixture").unwrap()
}

/// Right-handed shooter skeleton for a pose.
pub(crate) fn skeleton(pose: &Pose) -> Skeleton {
    let half = (180.0 - pose.knee).to_radians() / 2.0;
    let knee = Point2::new(0.5 + 0.15 * half.tan(), 0.80);

    let (elbow, wrist) = match pose.arm {
        Arm::Down { drop } => (Point2::new(0.52, 0.58 + drop), Point2::new(0.56, 0.62 + drop)),
        Arm::Up { elbow } => {
            let a = elbow.to_radians();
            let wrist = Point2::new(
                UPPER_ARM_UP.x + FOREARM * a.sin(),
                UPPER_ARM_UP.y + FOREARM * a.cos(),
            );
            (UPPER_ARM_UP, wrist)
        }
    };

    let mut s = Skeleton::new();
    s.insert(JointName::Nose, joint(Point2::new(0.5, 0.4)));
    s.insert(JointName::RightShoulder, joint(SHOULDER));
    s.insert(JointName::RightElbow, joint(elbow));
    s.insert(JointName::RightWrist, joint(wrist));
    s.insert(JointName::RightHip, joint(HIP));
    s.insert(JointName::RightKnee, joint(knee));
    s.insert(JointName::RightAnkle, joint(ANKLE));
    match pose.ball {
        Ball::InHand => {
            s.insert(
                JointName::BallPosition,
                joint(Point2::new(wrist.x, wrist.y - 0.03)),
            );
        }
        Ball::At(x, y) => {
            s.insert(JointName::BallPosition, joint(Point2::new(x, y)));
        }
        Ball::Gone => {}
    }
    s
}

/// The pose as a detection keyed by canonical joint names.
pub(crate) fn detection(backend: &str, frame_index: usize, pose: &Pose) -> Detection {
    skeleton(pose)
        .iter()
        .fold(Detection::new(backend, frame_index), |d, (name, joint)| {
            let p = joint.position();
            d.with_keypoint(name.as_str(), RawKeypoint::new(p.x, p.y, joint.confidence()))
        })
}

/// Forty frames: stand, dip, rise to set, extend, release, follow through,
/// return to stand.
pub(crate) fn scripted_shot() -> Vec<Pose> {
    let mut poses = Vec::with_capacity(40);
    for _ in 0..5 {
        poses.push(Pose::new(170.0, Arm::Down { drop: 0.0 }, Ball::InHand));
    }
    for (i, knee) in [160.0, 145.0, 135.0, 125.0, 118.0, 112.0, 110.0].iter().enumerate() {
        let drop = 0.01 * (i + 1) as f64;
        poses.push(Pose::new(*knee, Arm::Down { drop }, Ball::InHand));
    }
    for knee in [125.0, 145.0, 165.0] {
        poses.push(Pose::new(knee, Arm::Up { elbow: 90.0 }, Ball::InHand));
    }
    for _ in 0..4 {
        poses.push(Pose::new(170.0, Arm::Up { elbow: 90.0 }, Ball::InHand));
    }
    for elbow in [120.0, 150.0, 175.0] {
        poses.push(Pose::new(170.0, Arm::Up { elbow }, Ball::InHand));
    }
    let flight = [
        Ball::At(0.52, 0.26),
        Ball::At(0.54, 0.20),
        Ball::At(0.56, 0.14),
        Ball::At(0.58, 0.08),
        Ball::At(0.60, 0.02),
        Ball::Gone,
        Ball::Gone,
    ];
    for ball in flight {
        poses.push(Pose::new(170.0, Arm::Up { elbow: 178.0 }, ball));
    }
    for _ in 0..11 {
        poses.push(Pose::new(170.0, Arm::Down { drop: 0.0 }, Ball::Gone));
    }
    poses
}
