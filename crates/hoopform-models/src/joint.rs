//! Canonical joint vocabulary and per-frame skeletons.
//!
//! Every pose backend is mapped into this vocabulary before anything else
//! looks at it. A [`Joint`] only exists when it was actually detected: a
//! confidence of zero is represented by the joint being absent from the
//! [`Skeleton`], never by a stored zero.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Backend-independent skeletal landmark names.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    /// Midpoint of the pelvis. Reported by some backends, otherwise derived.
    HipCenter,
    /// Auxiliary ball point from the ball locator or an object detector.
    BallPosition,
}

impl JointName {
    pub const ALL: &'static [JointName] = &[
        JointName::Nose,
        JointName::LeftEye,
        JointName::RightEye,
        JointName::LeftEar,
        JointName::RightEar,
        JointName::LeftShoulder,
        JointName::RightShoulder,
        JointName::LeftElbow,
        JointName::RightElbow,
        JointName::LeftWrist,
        JointName::RightWrist,
        JointName::LeftHip,
        JointName::RightHip,
        JointName::LeftKnee,
        JointName::RightKnee,
        JointName::LeftAnkle,
        JointName::RightAnkle,
        JointName::HipCenter,
        JointName::BallPosition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JointName::Nose => "nose",
            JointName::LeftEye => "left_eye",
            JointName::RightEye => "right_eye",
            JointName::LeftEar => "left_ear",
            JointName::RightEar => "right_ear",
            JointName::LeftShoulder => "left_shoulder",
            JointName::RightShoulder => "right_shoulder",
            JointName::LeftElbow => "left_elbow",
            JointName::RightElbow => "right_elbow",
            JointName::LeftWrist => "left_wrist",
            JointName::RightWrist => "right_wrist",
            JointName::LeftHip => "left_hip",
            JointName::RightHip => "right_hip",
            JointName::LeftKnee => "left_knee",
            JointName::RightKnee => "right_knee",
            JointName::LeftAnkle => "left_ankle",
            JointName::RightAnkle => "right_ankle",
            JointName::HipCenter => "hip_center",
            JointName::BallPosition => "ball_position",
        }
    }

    /// Body side of the joint, `None` for midline and auxiliary points.
    pub fn side(&self) -> Option<Side> {
        match self {
            JointName::LeftEye
            | JointName::LeftEar
            | JointName::LeftShoulder
            | JointName::LeftElbow
            | JointName::LeftWrist
            | JointName::LeftHip
            | JointName::LeftKnee
            | JointName::LeftAnkle => Some(Side::Left),
            JointName::RightEye
            | JointName::RightEar
            | JointName::RightShoulder
            | JointName::RightElbow
            | JointName::RightWrist
            | JointName::RightHip
            | JointName::RightKnee
            | JointName::RightAnkle => Some(Side::Right),
            JointName::Nose | JointName::HipCenter | JointName::BallPosition => None,
        }
    }
}

impl fmt::Display for JointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for JointName {
    type Err = JointNameParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        JointName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str() == needle)
            .ok_or_else(|| JointNameParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown joint name: {0}")]
pub struct JointNameParseError(String);

/// Left or right side of the body.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn shoulder(&self) -> JointName {
        match self {
            Side::Left => JointName::LeftShoulder,
            Side::Right => JointName::RightShoulder,
        }
    }

    pub fn elbow(&self) -> JointName {
        match self {
            Side::Left => JointName::LeftElbow,
            Side::Right => JointName::RightElbow,
        }
    }

    pub fn wrist(&self) -> JointName {
        match self {
            Side::Left => JointName::LeftWrist,
            Side::Right => JointName::RightWrist,
        }
    }

    pub fn hip(&self) -> JointName {
        match self {
            Side::Left => JointName::LeftHip,
            Side::Right => JointName::RightHip,
        }
    }

    pub fn knee(&self) -> JointName {
        match self {
            Side::Left => JointName::LeftKnee,
            Side::Right => JointName::RightKnee,
        }
    }

    pub fn ankle(&self) -> JointName {
        match self {
            Side::Left => JointName::LeftAnkle,
            Side::Right => JointName::RightAnkle,
        }
    }
}

/// Normalized image-relative position, optionally with a depth estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point2 {
    /// 0.0 = left edge, 1.0 = right edge
    pub x: f64,
    /// 0.0 = top edge, 1.0 = bottom edge
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    pub fn with_depth(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Euclidean distance in the image plane.
    pub fn distance(&self, other: &Point2) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Image-plane midpoint. Depth is kept only when both sides carry it.
    pub fn midpoint(&self, other: &Point2) -> Point2 {
        Point2 {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
            z: match (self.z, other.z) {
                (Some(a), Some(b)) => Some((a + b) / 2.0),
                _ => None,
            },
        }
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

/// A detected landmark.
///
/// Only constructible through [`Joint::new`], which refuses absent
/// detections, so a `Joint` always has a position and a confidence in `(0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "JointRepr")]
pub struct Joint {
    position: Point2,
    confidence: f64,
    /// Backend ids that contributed to this joint.
    sources: BTreeSet<String>,
}

impl Joint {
    /// Create a joint reported by a single source.
    ///
    /// Returns `None` for a zero/negative/non-finite confidence or a
    /// non-finite position: such a point is absent, not a detection.
    pub fn new(position: Point2, confidence: f64, source: impl Into<String>) -> Option<Self> {
        let mut sources = BTreeSet::new();
        sources.insert(source.into());
        Self::with_sources(position, confidence, sources)
    }

    /// Create a joint with an explicit set of contributing sources.
    pub fn with_sources(
        position: Point2,
        confidence: f64,
        sources: BTreeSet<String>,
    ) -> Option<Self> {
        if !confidence.is_finite() || confidence <= 0.0 || !position.is_finite() {
            return None;
        }
        Some(Self {
            position,
            confidence: confidence.min(1.0),
            sources,
        })
    }

    pub fn position(&self) -> Point2 {
        self.position
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn sources(&self) -> &BTreeSet<String> {
        &self.sources
    }
}

#[derive(Deserialize, JsonSchema)]
struct JointRepr {
    position: Point2,
    confidence: f64,
    #[serde(default)]
    sources: BTreeSet<String>,
}

impl TryFrom<JointRepr> for Joint {
    type Error = String;

    fn try_from(repr: JointRepr) -> Result<Self, Self::Error> {
        Joint::with_sources(repr.position, repr.confidence, repr.sources)
            .ok_or_else(|| format!("joint confidence must be in (0, 1], got {}", repr.confidence))
    }
}

/// One frame's joints keyed by canonical name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Skeleton {
    joints: BTreeMap<JointName, Joint>,
}

impl Skeleton {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: JointName) -> Option<&Joint> {
        self.joints.get(&name)
    }

    /// Position of a joint if present.
    pub fn position(&self, name: JointName) -> Option<Point2> {
        self.joints.get(&name).map(Joint::position)
    }

    /// Insert or replace a joint, returning the previous value.
    pub fn insert(&mut self, name: JointName, joint: Joint) -> Option<Joint> {
        self.joints.insert(name, joint)
    }

    pub fn remove(&mut self, name: JointName) -> Option<Joint> {
        self.joints.remove(&name)
    }

    pub fn contains(&self, name: JointName) -> bool {
        self.joints.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointName, &Joint)> {
        self.joints.iter().map(|(name, joint)| (*name, joint))
    }

    pub fn names(&self) -> impl Iterator<Item = JointName> + '_ {
        self.joints.keys().copied()
    }

    /// Midpoint of two joints when both are present.
    pub fn midpoint(&self, a: JointName, b: JointName) -> Option<Point2> {
        Some(self.position(a)?.midpoint(&self.position(b)?))
    }
}

impl FromIterator<(JointName, Joint)> for Skeleton {
    fn from_iter<I: IntoIterator<Item = (JointName, Joint)>>(iter: I) -> Self {
        Self {
            joints: iter.into_iter().collect(),
        }
    }
}
