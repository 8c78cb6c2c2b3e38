//! Shared data models for the HoopForm shot analysis engine.
//!
//! This crate provides Serde-serializable types for:
//! - The canonical joint vocabulary and per-frame skeletons
//! - Raw per-backend detections
//! - Biomechanical angle sets
//! - Shot phases, shot segments and quality reports
//! - Analysis tiers for backend selection

pub mod analysis_tier;
pub mod angles;
pub mod detection;
pub mod joint;
pub mod phase;
pub mod quality;
pub mod rect;

// Re-export common types
pub use analysis_tier::{AnalysisTier, AnalysisTierParseError};
pub use angles::{AngleName, AngleSet};
pub use detection::{Detection, KeypointEntry, KeypointKey, RawKeypoint};
pub use joint::{Joint, JointName, JointNameParseError, Point2, Side, Skeleton};
pub use phase::{AngleRange, PhaseExtrema, PhaseFrame, ShotPhase, ShotSegment};
pub use quality::{QualityAssessment, QualityCategory, QualityLabel, QualityReport};
pub use rect::NormalizedRect;
