//! Temporal shot analysis: smoothing, phase tracking and form scoring.

pub mod scoring;
pub mod smoothing;
pub mod tracker;

#[cfg(test)]
pub(crate) mod fixtures;

pub use scoring::{Extreme, FormQualityScorer, QualityRule};
pub use smoothing::SignalSmoother;
pub use tracker::{PhaseStep, ShotPhaseTracker, TrackerEvent};
