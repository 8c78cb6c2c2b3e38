//! Pose backend boundary and per-frame tier fallback.
//!
//! | Tier | Primary backend | Secondary backends | Falls back to |
//! |------|-----------------|--------------------|---------------|
//! | `Free` | general keypoint detector | none | nothing |
//! | `Professional` | named-keypoint detector | verification detector | `Free` |
//!
//! Use [`TierPlan::for_tier`] to resolve the backend sets and
//! [`detect_with_fallback`] to run them for a frame.

pub mod fallback;
pub mod providers;
pub mod tier_plan;

pub use fallback::{detect_with_fallback, FrameDetections};
pub use providers::{backend_handles, BackendHandles, Frame, PoseBackend, ReplayBackend};
pub use tier_plan::{BackendSet, TierPlan};
