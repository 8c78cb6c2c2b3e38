//! Per-frame tier fallback.
//!
//! Backend failures are never fatal mid-job. For each frame the sets of a
//! [`TierPlan`] are tried in order; the first set whose primary backend
//! returns a detection serves the frame. Secondary failures only shrink the
//! fused input.

use hoopform_models::{AnalysisTier, Detection};
use tracing::{debug, warn};

use super::providers::{BackendHandles, Frame};
use super::tier_plan::{BackendSet, TierPlan};
use crate::error::{EngineError, EngineResult};
use crate::observability;

/// Detections gathered for one frame.
#[derive(Debug, Clone)]
pub struct FrameDetections {
    /// Tier of the set that served the frame
    pub tier_used: AnalysisTier,
    pub detections: Vec<Detection>,
}

/// Run the plan's backend sets for one frame, falling back as needed.
///
/// Returns `None` when every set failed; the caller skips the frame.
pub async fn detect_with_fallback(
    plan: &TierPlan,
    handles: &BackendHandles,
    frame: &Frame,
) -> Option<FrameDetections> {
    for (position, set) in plan.sets().iter().enumerate() {
        match run_set(set, handles, frame).await {
            Ok(detections) => {
                if position > 0 {
                    warn!(
                        frame = frame.index,
                        requested = %plan.requested(),
                        used = %set.tier,
                        "Degraded to fallback tier"
                    );
                    observability::record_tier_fallback(
                        plan.requested().as_str(),
                        set.tier.as_str(),
                    );
                }
                return Some(FrameDetections {
                    tier_used: set.tier,
                    detections,
                });
            }
            Err(e) => {
                warn!(
                    frame = frame.index,
                    tier = %set.tier,
                    error = %e,
                    "Backend set failed"
                );
            }
        }
    }

    warn!(frame = frame.index, "All backend sets failed, skipping frame");
    observability::record_frame_skipped();
    None
}

async fn run_set(
    set: &BackendSet,
    handles: &BackendHandles,
    frame: &Frame,
) -> EngineResult<Vec<Detection>> {
    let primary = set
        .primary()
        .ok_or_else(|| EngineError::config(format!("empty backend set for tier '{}'", set.tier)))?;

    let mut detections = vec![call_backend(primary, handles, frame).await?];

    for id in set.secondaries() {
        match call_backend(id, handles, frame).await {
            Ok(detection) => detections.push(detection),
            Err(e) => {
                warn!(frame = frame.index, backend = %id, error = %e, "Secondary backend failed");
            }
        }
    }

    debug!(
        frame = frame.index,
        tier = %set.tier,
        detections = detections.len(),
        "Backend set served frame"
    );
    Ok(detections)
}

async fn call_backend(id: &str, handles: &BackendHandles, frame: &Frame) -> EngineResult<Detection> {
    let result = match handles.get(id) {
        None => Err(EngineError::BackendUnavailable(id.to_string())),
        Some(backend) if !backend.is_available() => {
            Err(EngineError::BackendUnavailable(id.to_string()))
        }
        Some(backend) => backend.detect(frame).await,
    };

    match result {
        Ok(mut detection) => {
            // The handle's identity and the frame being processed are authoritative.
            detection.backend = id.to_string();
            detection.frame_index = frame.index;
            if detection.frame_size.is_none() {
                detection.frame_size = frame.dimensions();
            }
            Ok(detection)
        }
        Err(e) => {
            observability::record_backend_failure(id);
            Err(e)
        }
    }
}
