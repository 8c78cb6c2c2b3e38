//! Keypoint schema adapter.
//!
//! Maps one backend [`Detection`] into a partial canonical [`Skeleton`]:
//! unknown keys are dropped, points below the backend's minimum confidence
//! are dropped (absent, never a zero-confidence joint), pixel coordinates
//! are normalized, and anything that lands outside the frame is dropped.

use hoopform_models::{Detection, Joint, JointName, Point2, Skeleton};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::schema::{BackendSchema, CoordinateSpace};
use crate::config::BackendProfileConfig;
use crate::error::{EngineError, EngineResult};

/// A backend as the engine sees it: schema table, weight and cutoff.
#[derive(Debug, Clone)]
pub struct BackendProfile {
    pub id: String,
    pub schema: BackendSchema,
    /// Reliability weight used by fusion, in `(0, 1]`
    pub reliability: f64,
    /// Detections below this confidence are treated as absent
    pub min_confidence: f64,
}

/// Partial skeleton from a single backend, tagged with its weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedSkeleton {
    pub backend: String,
    pub weight: f64,
    pub skeleton: Skeleton,
}

impl WeightedSkeleton {
    pub fn new(backend: impl Into<String>, weight: f64, skeleton: Skeleton) -> Self {
        Self {
            backend: backend.into(),
            weight,
            skeleton,
        }
    }
}

/// Adapt one detection with an explicit profile.
///
/// Pure function. The only error is a pixel-space detection that carries no
/// frame size, which cannot be normalized.
pub fn adapt_detection(
    detection: &Detection,
    profile: &BackendProfile,
) -> EngineResult<WeightedSkeleton> {
    let scale = match profile.schema.coordinate_space() {
        CoordinateSpace::Normalized => (1.0, 1.0),
        CoordinateSpace::Pixels => {
            let (w, h) = detection.frame_size.ok_or_else(|| {
                EngineError::invalid_detection(format!(
                    "backend {} reports pixel coordinates but frame {} has no frame size",
                    profile.id, detection.frame_index
                ))
            })?;
            if w == 0 || h == 0 {
                return Err(EngineError::invalid_detection(format!(
                    "frame {} has zero frame size",
                    detection.frame_index
                )));
            }
            (w as f64, h as f64)
        }
    };

    // Two keys may map to the same joint in a custom table; keep the stronger one.
    let mut best: BTreeMap<JointName, Joint> = BTreeMap::new();
    let mut dropped = 0usize;

    for (key, raw) in &detection.keypoints {
        let Some(name) = profile.schema.lookup(key) else {
            dropped += 1;
            continue;
        };
        if !(raw.confidence >= profile.min_confidence) {
            dropped += 1;
            continue;
        }

        let x = raw.x / scale.0;
        let y = raw.y / scale.1;
        if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
            dropped += 1;
            continue;
        }

        let position = match raw.z {
            Some(z) => Point2::with_depth(x, y, z),
            None => Point2::new(x, y),
        };
        let Some(joint) = Joint::new(position, raw.confidence, profile.id.clone()) else {
            dropped += 1;
            continue;
        };

        match best.get(&name) {
            Some(existing) if existing.confidence() >= joint.confidence() => {}
            _ => {
                best.insert(name, joint);
            }
        }
    }

    debug!(
        backend = %profile.id,
        frame = detection.frame_index,
        kept = best.len(),
        dropped,
        "Adapted detection"
    );

    Ok(WeightedSkeleton::new(
        profile.id.clone(),
        profile.reliability,
        best.into_iter().collect(),
    ))
}

/// Resolved backend profiles keyed by backend id.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    profiles: BTreeMap<String, BackendProfile>,
}

impl BackendRegistry {
    /// Build the registry from configuration. Any problem here is fatal.
    pub fn from_config(configs: &[BackendProfileConfig]) -> EngineResult<Self> {
        let mut profiles = BTreeMap::new();
        for config in configs {
            if profiles.contains_key(&config.id) {
                return Err(EngineError::config(format!(
                    "duplicate backend id '{}'",
                    config.id
                )));
            }
            let schema = config.schema.resolve(&config.id)?;
            if schema.is_empty() {
                return Err(EngineError::MissingSchema(config.id.clone()));
            }
            info!(
                backend = %config.id,
                schema = schema.name(),
                reliability = config.reliability,
                "Registered pose backend"
            );
            profiles.insert(
                config.id.clone(),
                BackendProfile {
                    id: config.id.clone(),
                    schema,
                    reliability: config.reliability,
                    min_confidence: config.min_confidence,
                },
            );
        }
        Ok(Self { profiles })
    }

    pub fn insert(&mut self, profile: BackendProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    pub fn get(&self, id: &str) -> Option<&BackendProfile> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Adapt a detection using the profile registered for its backend.
    pub fn adapt(&self, detection: &Detection) -> EngineResult<WeightedSkeleton> {
        let profile = self
            .get(&detection.backend)
            .ok_or_else(|| EngineError::UnknownBackend(detection.backend.clone()))?;
        adapt_detection(detection, profile)
    }
}
