//! Shot phases and segmented shots.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::angles::{AngleName, AngleSet};

/// Phase of a jump-shot motion.
///
/// Phases are ordered; one shot walks `Load -> Set -> Release ->
/// FollowThrough` with `Idle` on both sides.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ShotPhase {
    #[default]
    Idle,
    Load,
    Set,
    Release,
    FollowThrough,
}

impl ShotPhase {
    pub const ALL: &'static [ShotPhase] = &[
        ShotPhase::Idle,
        ShotPhase::Load,
        ShotPhase::Set,
        ShotPhase::Release,
        ShotPhase::FollowThrough,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ShotPhase::Idle => "idle",
            ShotPhase::Load => "load",
            ShotPhase::Set => "set",
            ShotPhase::Release => "release",
            ShotPhase::FollowThrough => "follow_through",
        }
    }

    /// The only phase this one may advance to.
    pub fn next(&self) -> ShotPhase {
        match self {
            ShotPhase::Idle => ShotPhase::Load,
            ShotPhase::Load => ShotPhase::Set,
            ShotPhase::Set => ShotPhase::Release,
            ShotPhase::Release => ShotPhase::FollowThrough,
            ShotPhase::FollowThrough => ShotPhase::Idle,
        }
    }

    /// Whether `from -> to` is a legal transition. Any phase may also be
    /// forced back to `Idle` when a shot is abandoned.
    pub fn is_legal_transition(from: ShotPhase, to: ShotPhase) -> bool {
        from.next() == to || to == ShotPhase::Idle
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, ShotPhase::Idle)
    }
}

impl fmt::Display for ShotPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One frame of a shot segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PhaseFrame {
    pub frame_index: usize,
    pub phase: ShotPhase,
    pub angles: AngleSet,
}

/// Range of defined values an angle took.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AngleRange {
    pub min: f64,
    pub max: f64,
}

impl AngleRange {
    fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }
}

/// Per-phase, per-angle extremes of a segment.
pub type PhaseExtrema = BTreeMap<ShotPhase, BTreeMap<AngleName, AngleRange>>;

/// Frame span of one complete shot attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ShotSegment {
    /// Zero-based index of the shot within its job
    pub shot_index: usize,
    pub start_frame: usize,
    pub end_frame: usize,
    pub frames: Vec<PhaseFrame>,
    /// Only angles defined at least once in a phase appear here
    pub extrema: PhaseExtrema,
}

impl ShotSegment {
    /// Build a closed segment from its frames, computing extrema.
    pub fn from_frames(shot_index: usize, frames: Vec<PhaseFrame>) -> Self {
        let start_frame = frames.first().map(|f| f.frame_index).unwrap_or(0);
        let end_frame = frames.last().map(|f| f.frame_index).unwrap_or(start_frame);

        let mut extrema: PhaseExtrema = BTreeMap::new();
        for frame in &frames {
            for (name, value) in frame.angles.iter() {
                let Some(value) = value else { continue };
                extrema
                    .entry(frame.phase)
                    .or_default()
                    .entry(name)
                    .and_modify(|range| range.include(value))
                    .or_insert(AngleRange {
                        min: value,
                        max: value,
                    });
            }
        }

        Self {
            shot_index,
            start_frame,
            end_frame,
            frames,
            extrema,
        }
    }

    /// Extremes of an angle during a phase, `None` if never defined there.
    pub fn extremum(&self, phase: ShotPhase, angle: AngleName) -> Option<AngleRange> {
        self.extrema.get(&phase)?.get(&angle).copied()
    }

    /// Distinct phases in the order they were visited.
    pub fn phases_visited(&self) -> Vec<ShotPhase> {
        let mut phases: Vec<ShotPhase> = Vec::new();
        for frame in &self.frames {
            if phases.last() != Some(&frame.phase) {
                phases.push(frame.phase);
            }
        }
        phases
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}
