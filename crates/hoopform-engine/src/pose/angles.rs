//! Joint angle computation.
//!
//! Three-point angles use the vertex-centred vectors and the arccosine of
//! their normalized dot product, in degrees `[0, 180]`. Any missing joint
//! leaves the angle undefined.

use hoopform_models::{AngleName, AngleSet, JointName, Point2, Side, Skeleton};

/// Angle between `vertex -> a` and `vertex -> c` in degrees.
///
/// `None` when either vector has zero length.
pub fn joint_angle(a: Point2, vertex: Point2, c: Point2) -> Option<f64> {
    let (ux, uy) = (a.x - vertex.x, a.y - vertex.y);
    let (vx, vy) = (c.x - vertex.x, c.y - vertex.y);
    let norm = (ux * ux + uy * uy).sqrt() * (vx * vx + vy * vy).sqrt();
    if !(norm > f64::EPSILON) {
        return None;
    }
    let cos = ((ux * vx + uy * vy) / norm).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

/// Direction of `from -> to` against the image horizontal, upward positive,
/// in degrees `(-180, 180]`.
pub fn direction_angle(from: Point2, to: Point2) -> Option<f64> {
    let dx = to.x - from.x;
    let dy = from.y - to.y;
    if dx == 0.0 && dy == 0.0 {
        return None;
    }
    let angle = dy.atan2(dx).to_degrees();
    Some(if angle <= -180.0 { angle + 360.0 } else { angle })
}

/// The side whose wrist is higher in the frame. Ties go right.
pub fn shooting_side(skeleton: &Skeleton) -> Option<Side> {
    match (
        skeleton.position(JointName::LeftWrist),
        skeleton.position(JointName::RightWrist),
    ) {
        (Some(left), Some(right)) if left.y < right.y => Some(Side::Left),
        (Some(_), Some(_)) => Some(Side::Right),
        (Some(_), None) => Some(Side::Left),
        (None, Some(_)) => Some(Side::Right),
        (None, None) => None,
    }
}

/// Heights captured when a shot starts, for vertical displacement.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisplacementReference {
    pub ball_y: Option<f64>,
    pub wrist_y: Option<f64>,
}

impl DisplacementReference {
    pub fn capture(skeleton: &Skeleton, side: Side) -> Self {
        Self {
            ball_y: skeleton.position(JointName::BallPosition).map(|p| p.y),
            wrist_y: skeleton.position(side.wrist()).map(|p| p.y),
        }
    }
}

/// Computes the [`AngleSet`] of a fused skeleton.
#[derive(Debug, Clone)]
pub struct AngleComputer {
    /// Frame width over height; scales x so angles are measured in a
    /// square space rather than in stretched normalized units.
    aspect_ratio: f64,
}

impl Default for AngleComputer {
    fn default() -> Self {
        Self { aspect_ratio: 1.0 }
    }
}

impl AngleComputer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: f64) -> Self {
        if aspect_ratio.is_finite() && aspect_ratio > 0.0 {
            self.aspect_ratio = aspect_ratio;
        }
        self
    }

    /// Aspect ratio for a frame of `width` x `height` pixels.
    pub fn for_frame(width: u32, height: u32) -> Self {
        if height == 0 {
            return Self::default();
        }
        Self::default().with_aspect_ratio(width as f64 / height as f64)
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    /// Angles for the detected shooting side. Vertical displacement is left
    /// undefined because it needs a shot start to measure against.
    pub fn compute(&self, skeleton: &Skeleton) -> AngleSet {
        match shooting_side(skeleton) {
            Some(side) => self.compute_for_side(skeleton, side, None),
            None => self.compute_body_only(skeleton),
        }
    }

    /// Angles on a fixed side, with vertical displacement against `reference`.
    pub fn compute_for_side(
        &self,
        skeleton: &Skeleton,
        side: Side,
        reference: Option<&DisplacementReference>,
    ) -> AngleSet {
        let mut angles = AngleSet::undefined();
        angles.set(
            AngleName::Elbow,
            self.three_point(skeleton, side.shoulder(), side.elbow(), side.wrist()),
        );
        angles.set(
            AngleName::Shoulder,
            self.three_point(skeleton, side.hip(), side.shoulder(), side.elbow()),
        );
        angles.set(
            AngleName::Hip,
            self.three_point(skeleton, side.shoulder(), side.hip(), side.knee()),
        );
        angles.set(
            AngleName::Knee,
            self.three_point(skeleton, side.hip(), side.knee(), side.ankle()),
        );
        angles.set(AngleName::Release, self.release_angle(skeleton, side));
        angles.set(
            AngleName::VerticalDisplacement,
            reference.and_then(|r| vertical_displacement(skeleton, side, r)),
        );
        angles
    }

    /// Wrist-to-ball direction on `side`.
    pub fn release_angle(&self, skeleton: &Skeleton, side: Side) -> Option<f64> {
        let wrist = skeleton.position(side.wrist())?;
        let ball = skeleton.position(JointName::BallPosition)?;
        direction_angle(self.scaled(wrist), self.scaled(ball))
    }

    fn compute_body_only(&self, skeleton: &Skeleton) -> AngleSet {
        // No wrist at all: lower-body angles are still meaningful on the right side
        let mut angles = AngleSet::undefined();
        let side = Side::Right;
        angles.set(
            AngleName::Hip,
            self.three_point(skeleton, side.shoulder(), side.hip(), side.knee()),
        );
        angles.set(
            AngleName::Knee,
            self.three_point(skeleton, side.hip(), side.knee(), side.ankle()),
        );
        angles
    }

    fn three_point(&self, skeleton: &Skeleton, a: JointName, b: JointName, c: JointName) -> Option<f64> {
        let a = skeleton.position(a)?;
        let b = skeleton.position(b)?;
        let c = skeleton.position(c)?;
        joint_angle(self.scaled(a), self.scaled(b), self.scaled(c))
    }

    fn scaled(&self, p: Point2) -> Point2 {
        Point2 {
            x: p.x * self.aspect_ratio,
            ..p
        }
    }
}

/// Upward travel of the ball (or the shooting wrist when the ball is not
/// tracked) since `reference` was captured. Positive = upward.
pub fn vertical_displacement(
    skeleton: &Skeleton,
    side: Side,
    reference: &DisplacementReference,
) -> Option<f64> {
    if let (Some(start), Some(ball)) = (reference.ball_y, skeleton.position(JointName::BallPosition)) {
        return Some(start - ball.y);
    }
    let start = reference.wrist_y?;
    let wrist = skeleton.position(side.wrist())?;
    Some(start - wrist.y)
}
