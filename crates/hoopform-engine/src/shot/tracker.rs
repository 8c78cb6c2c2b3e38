//! Shot phase state machine.
//!
//! One tracker per video. Each call to [`ShotPhaseTracker::observe`] takes
//! the fused skeleton of the next frame, computes its angles and advances
//! the phase machine:
//!
//! ```text
//! IDLE -> LOAD -> SET -> RELEASE -> FOLLOW_THROUGH -> IDLE
//! ```
//!
//! A transition fires only after its condition holds on the smoothed
//! signals for a minimum run of consecutive frames. A frame missing the
//! joints a condition needs is a hold: the run neither grows nor resets.
//! More than `max_gap` held frames in a row reset the run, and mid-shot
//! they abandon the open segment and force the tracker back to IDLE.

use hoopform_models::{
    AngleName, AngleSet, JointName, PhaseFrame, ShotPhase, ShotSegment, Side, Skeleton,
};
use serde::Serialize;
use tracing::{debug, info};

use super::smoothing::SignalSmoother;
use crate::config::TrackerConfig;
use crate::pose::angles::{shooting_side, AngleComputer, DisplacementReference};

/// Segment lifecycle notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackerEvent {
    SegmentStarted { start_frame: usize, side: Side },
    SegmentFinalized(ShotSegment),
    SegmentAbandoned { start_frame: usize, at_frame: usize },
}

/// Tracker output for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseStep {
    pub frame_index: usize,
    pub phase: ShotPhase,
    pub angles: AngleSet,
    /// Shooting side in use, if any wrist has been seen
    pub side: Option<Side>,
    pub transition: Option<(ShotPhase, ShotPhase)>,
    pub event: Option<TrackerEvent>,
}

/// Outcome of evaluating a transition condition on one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Condition {
    Met,
    NotMet,
    /// Required joints missing
    Undefined,
}

impl Condition {
    fn from_bool(met: bool) -> Self {
        if met {
            Condition::Met
        } else {
            Condition::NotMet
        }
    }
}

/// Smoothed per-side signals.
#[derive(Debug, Clone)]
struct Signals {
    knee: SignalSmoother,
    elbow: SignalSmoother,
    ball_y: SignalSmoother,
    wrist_y: SignalSmoother,
    /// Shoulder y minus wrist y; positive when the wrist is higher
    wrist_lift: SignalSmoother,
    /// Ball to wrist distance
    separation: SignalSmoother,
}

impl Signals {
    fn new(window: usize) -> Self {
        Self {
            knee: SignalSmoother::new(window),
            elbow: SignalSmoother::new(window),
            ball_y: SignalSmoother::new(window),
            wrist_y: SignalSmoother::new(window),
            wrist_lift: SignalSmoother::new(window),
            separation: SignalSmoother::new(window),
        }
    }

    fn clear(&mut self) {
        self.knee.clear();
        self.elbow.clear();
        self.ball_y.clear();
        self.wrist_y.clear();
        self.wrist_lift.clear();
        self.separation.clear();
    }
}

/// Which raw inputs were present on the current frame.
#[derive(Debug, Clone, Copy, Default)]
struct Present {
    knee: bool,
    elbow: bool,
    ball: bool,
    wrist: bool,
    shoulder: bool,
}

/// Per-job phase tracker. Holds only sequential state, no shared data.
#[derive(Debug, Clone)]
pub struct ShotPhaseTracker {
    config: TrackerConfig,
    angles: AngleComputer,
    phase: ShotPhase,
    side: Option<Side>,
    reference: Option<DisplacementReference>,
    signals: Signals,
    open: Vec<PhaseFrame>,
    run: usize,
    gap: usize,
    shots_finalized: usize,
}

impl ShotPhaseTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self::with_angle_computer(config, AngleComputer::default())
    }

    pub fn with_angle_computer(config: TrackerConfig, angles: AngleComputer) -> Self {
        let signals = Signals::new(config.smoothing_window);
        Self {
            config,
            angles,
            phase: ShotPhase::Idle,
            side: None,
            reference: None,
            signals,
            open: Vec::new(),
            run: 0,
            gap: 0,
            shots_finalized: 0,
        }
    }

    pub fn set_angle_computer(&mut self, angles: AngleComputer) {
        self.angles = angles;
    }

    pub fn phase(&self) -> ShotPhase {
        self.phase
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    /// Frames recorded in the open segment.
    pub fn open_segment_len(&self) -> usize {
        self.open.len()
    }

    pub fn shots_finalized(&self) -> usize {
        self.shots_finalized
    }

    /// Return to IDLE, discarding any open segment.
    pub fn reset(&mut self) {
        self.phase = ShotPhase::Idle;
        self.side = None;
        self.reference = None;
        self.signals.clear();
        self.open.clear();
        self.run = 0;
        self.gap = 0;
    }

    /// Close the stream. An open segment is incomplete and is abandoned.
    pub fn finish(&mut self, last_frame: usize) -> Option<TrackerEvent> {
        let event = self.abandon(last_frame);
        self.reset();
        event
    }

    /// Advance the state machine by one frame.
    pub fn observe(&mut self, frame_index: usize, skeleton: &Skeleton) -> PhaseStep {
        self.update_side(skeleton);

        let (present, mut angles) = match self.side {
            Some(side) => {
                let angles = self
                    .angles
                    .compute_for_side(skeleton, side, self.reference.as_ref());
                (self.push_signals(skeleton, side, &angles), angles)
            }
            None => (Present::default(), self.angles.compute(skeleton)),
        };

        let from = self.phase;
        let mut transition = None;
        let mut event = None;

        match self.evaluate(present) {
            Condition::Met => {
                self.run += 1;
                self.gap = 0;
            }
            Condition::NotMet => {
                self.run = 0;
                self.gap = 0;
            }
            Condition::Undefined => {
                self.gap += 1;
                if self.gap > self.config.max_gap {
                    self.run = 0;
                    if self.phase.is_active() {
                        event = self.abandon(frame_index);
                        self.reset();
                    }
                }
            }
        }

        if self.phase == from && self.run >= self.required_run() {
            let to = from.next();
            self.phase = to;
            self.run = 0;
            self.gap = 0;
            transition = Some((from, to));
            debug!(frame = frame_index, from = %from, to = %to, "Shot phase transition");

            match to {
                ShotPhase::Load => {
                    if let Some(side) = self.side {
                        let reference = DisplacementReference::capture(skeleton, side);
                        angles = self.angles.compute_for_side(skeleton, side, Some(&reference));
                        self.reference = Some(reference);
                        self.open.clear();
                        info!(frame = frame_index, side = ?side, "Shot segment started");
                        event = Some(TrackerEvent::SegmentStarted {
                            start_frame: frame_index,
                            side,
                        });
                    }
                }
                ShotPhase::Idle => {
                    let frames = std::mem::take(&mut self.open);
                    let segment = ShotSegment::from_frames(self.shots_finalized, frames);
                    self.shots_finalized += 1;
                    self.reference = None;
                    info!(
                        shot = segment.shot_index,
                        start = segment.start_frame,
                        end = segment.end_frame,
                        frames = segment.frame_count(),
                        "Shot segment finalized"
                    );
                    event = Some(TrackerEvent::SegmentFinalized(segment));
                }
                _ => {}
            }
        }

        if !self.phase.is_active() {
            // No open segment to measure against
            angles.set(AngleName::VerticalDisplacement, None);
        }

        if self.phase.is_active() {
            self.open.push(PhaseFrame {
                frame_index,
                phase: self.phase,
                angles: angles.clone(),
            });
        }

        PhaseStep {
            frame_index,
            phase: self.phase,
            angles,
            side: self.side,
            transition,
            event,
        }
    }

    fn abandon(&mut self, at_frame: usize) -> Option<TrackerEvent> {
        let start_frame = self.open.first()?.frame_index;
        info!(
            start = start_frame,
            at = at_frame,
            phase = %self.phase,
            "Shot segment abandoned"
        );
        Some(TrackerEvent::SegmentAbandoned {
            start_frame,
            at_frame,
        })
    }

    /// The side is free while idle and fixed once a shot has started.
    fn update_side(&mut self, skeleton: &Skeleton) {
        if self.phase.is_active() {
            return;
        }
        if let Some(side) = shooting_side(skeleton) {
            if self.side.is_some_and(|current| current != side) {
                self.signals.clear();
                self.run = 0;
            }
            self.side = Some(side);
        }
    }

    fn push_signals(&mut self, skeleton: &Skeleton, side: Side, angles: &AngleSet) -> Present {
        let wrist = skeleton.position(side.wrist());
        let shoulder = skeleton.position(side.shoulder());
        let ball = skeleton.position(JointName::BallPosition);
        let knee = angles.get(AngleName::Knee);
        let elbow = angles.get(AngleName::Elbow);

        if let Some(v) = knee {
            self.signals.knee.push(v);
        }
        if let Some(v) = elbow {
            self.signals.elbow.push(v);
        }
        if let Some(b) = ball {
            self.signals.ball_y.push(b.y);
        }
        if let Some(w) = wrist {
            self.signals.wrist_y.push(w.y);
        }
        if let (Some(w), Some(s)) = (wrist, shoulder) {
            self.signals.wrist_lift.push(s.y - w.y);
        }
        if let (Some(w), Some(b)) = (wrist, ball) {
            self.signals.separation.push(w.distance(&b));
        }

        Present {
            knee: knee.is_some(),
            elbow: elbow.is_some(),
            ball: ball.is_some(),
            wrist: wrist.is_some(),
            shoulder: shoulder.is_some(),
        }
    }

    /// Height signal: the ball when it is tracked this frame, else the wrist.
    fn height(&self, present: Present) -> Option<&SignalSmoother> {
        if present.ball && self.signals.ball_y.len() >= 2 {
            Some(&self.signals.ball_y)
        } else if present.wrist {
            Some(&self.signals.wrist_y)
        } else {
            None
        }
    }

    fn required_run(&self) -> usize {
        let min_run = self.config.min_run.max(1);
        match self.phase {
            ShotPhase::Release => min_run.max(2),
            ShotPhase::FollowThrough => min_run.max(self.config.still_frames),
            _ => min_run,
        }
    }

    fn evaluate(&self, present: Present) -> Condition {
        let c = &self.config;
        let s = &self.signals;

        match self.phase {
            ShotPhase::Idle => {
                let Some(height) = self.height(present) else {
                    return Condition::Undefined;
                };
                if !present.knee {
                    return Condition::Undefined;
                }
                let bent = s.knee.current().is_some_and(|k| k < c.knee_bent_threshold);
                // Image y grows downward, so descending is a positive change
                let descending = height
                    .change_over(c.descent_window)
                    .is_some_and(|d| d >= c.min_descent);
                Condition::from_bool(bent && descending)
            }
            ShotPhase::Load => {
                if !(present.knee && present.wrist && present.shoulder) {
                    return Condition::Undefined;
                }
                let extending = s.knee.delta().is_some_and(|d| d >= c.knee_extension_rate);
                let raised = s.wrist_lift.current().is_some_and(|l| l > 0.0);
                Condition::from_bool(extending && raised)
            }
            ShotPhase::Set => {
                let Some(height) = self.height(present) else {
                    return Condition::Undefined;
                };
                if !present.elbow {
                    return Condition::Undefined;
                }
                let extended = s
                    .elbow
                    .current()
                    .is_some_and(|e| e > c.elbow_extension_threshold);
                let rising = height
                    .delta()
                    .is_some_and(|d| -d >= c.min_release_velocity);
                Condition::from_bool(extended && rising)
            }
            ShotPhase::Release => {
                if !(present.ball && present.wrist) {
                    return Condition::Undefined;
                }
                let separated = s
                    .separation
                    .current()
                    .is_some_and(|d| d > c.ball_separation_distance);
                Condition::from_bool(separated)
            }
            ShotPhase::FollowThrough => {
                if !(present.wrist && present.shoulder && present.elbow && present.knee) {
                    return Condition::Undefined;
                }
                let lowered = s.wrist_lift.current().is_some_and(|l| l < 0.0);
                let still = |smoother: &SignalSmoother| {
                    smoother
                        .delta()
                        .is_some_and(|d| d.abs() < c.stillness_threshold)
                };
                Condition::from_bool(lowered && still(&s.elbow) && still(&s.knee))
            }
        }
    }
}
