#![deny(unreachable_patterns)]
//! Basketball shot-form analysis engine.
//!
//! This crate provides:
//! - Backend keypoint schema adaptation and multi-backend pose fusion
//! - A heuristic image-level ball locator
//! - Biomechanical angle computation
//! - A shot phase state machine with hysteresis and occlusion tolerance
//! - Rule-based form quality scoring of finished shots
//! - Skeleton and angle callout overlays
//! - Tiered backend selection with per-frame fallback

pub mod config;
pub mod detection;
pub mod error;
pub mod job;
pub mod observability;
pub mod overlay;
pub mod pose;
pub mod shot;

pub use config::{
    BackendProfileConfig, BallLocatorConfig, EngineConfig, FusionConfig, OverlayConfig,
    ScoringConfig, TargetRange, TrackerConfig,
};
pub use detection::{
    backend_handles, detect_with_fallback, BackendHandles, BackendSet, Frame, FrameDetections,
    PoseBackend, ReplayBackend, TierPlan,
};
pub use error::{EngineError, EngineResult};
pub use job::{run_jobs, AnalysisOutput, FrameOutcome, ImageAnalysis, ScoredShot, ShotAnalysisJob};
pub use overlay::{callouts, core_anchor, Callout, OverlayRenderer, SKELETON_CONNECTIONS};
pub use pose::{
    adapt_detection, AngleComputer, BackendProfile, BackendRegistry, BallLocator, BuiltinSchema,
    PoseFusionEngine, SchemaSource, WeightedSkeleton,
};
pub use shot::{FormQualityScorer, PhaseStep, ShotPhaseTracker, SignalSmoother, TrackerEvent};
