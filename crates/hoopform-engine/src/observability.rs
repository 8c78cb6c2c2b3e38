//! Engine metrics.
//!
//! Provides standardized metrics for monitoring analysis jobs:
//! - Frame counters (processed, skipped)
//! - Backend failure and tier fallback counters
//! - Shot outcome counters
//! - Fused joint count histogram
//!
//! With no recorder installed every call is a no-op.

use metrics::{counter, histogram};

// =============================================================================
// Metric Names
// =============================================================================

/// Metric name constants for consistency.
pub mod names {
    /// Frames that produced a fused skeleton.
    pub const FRAMES_PROCESSED_TOTAL: &str = "hoopform_frames_processed_total";

    /// Frames skipped because every backend set failed.
    pub const FRAMES_SKIPPED_TOTAL: &str = "hoopform_frames_skipped_total";

    /// Backend detection failures by backend.
    pub const BACKEND_FAILURES_TOTAL: &str = "hoopform_backend_failures_total";

    /// Frames served by a lower tier than requested.
    pub const TIER_FALLBACKS_TOTAL: &str = "hoopform_tier_fallbacks_total";

    /// Finalized shot segments.
    pub const SHOTS_FINALIZED_TOTAL: &str = "hoopform_shots_finalized_total";

    /// Abandoned shot segments.
    pub const SHOTS_ABANDONED_TOTAL: &str = "hoopform_shots_abandoned_total";

    /// Joints present in each fused skeleton.
    pub const FUSED_JOINTS: &str = "hoopform_fused_joints";
}

// =============================================================================
// Recording Functions
// =============================================================================

/// Record a processed frame and its fused joint count.
pub fn record_frame(tier: &str, joints: usize) {
    counter!(names::FRAMES_PROCESSED_TOTAL, "tier" => tier.to_string()).increment(1);
    histogram!(names::FUSED_JOINTS).record(joints as f64);
}

/// Record a frame skipped because no backend produced a detection.
pub fn record_frame_skipped() {
    counter!(names::FRAMES_SKIPPED_TOTAL).increment(1);
}

/// Record a failed backend call.
pub fn record_backend_failure(backend: &str) {
    counter!(
        names::BACKEND_FAILURES_TOTAL,
        "backend" => backend.to_string()
    )
    .increment(1);
}

/// Record a frame served by a fallback tier.
pub fn record_tier_fallback(requested: &str, used: &str) {
    counter!(
        names::TIER_FALLBACKS_TOTAL,
        "requested" => requested.to_string(),
        "used" => used.to_string()
    )
    .increment(1);
}

/// Record a finalized shot.
pub fn record_shot_finalized() {
    counter!(names::SHOTS_FINALIZED_TOTAL).increment(1);
}

/// Record an abandoned shot.
pub fn record_shot_abandoned() {
    counter!(names::SHOTS_ABANDONED_TOTAL).increment(1);
}

// =============================================================================
// Tests
// =============================================================================
