//! Raw per-backend pose detections.
//!
//! A `Detection` is what a pose or object detector hands back for one frame,
//! still in the backend's own key vocabulary. Nothing here is canonical yet;
//! the engine's schema adapter translates it into a [`crate::Skeleton`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Backend-specific keypoint key: an output index or a landmark name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum KeypointKey {
    Index(usize),
    Name(String),
}

impl From<usize> for KeypointKey {
    fn from(index: usize) -> Self {
        KeypointKey::Index(index)
    }
}

impl From<&str> for KeypointKey {
    fn from(name: &str) -> Self {
        KeypointKey::Name(name.to_string())
    }
}

impl fmt::Display for KeypointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeypointKey::Index(index) => write!(f, "#{}", index),
            KeypointKey::Name(name) => write!(f, "{}", name),
        }
    }
}

/// A single backend keypoint as reported.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawKeypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    pub confidence: f64,
}

impl RawKeypoint {
    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            confidence,
        }
    }
}

/// Keypoint entry used for the wire form of [`Detection::keypoints`].
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KeypointEntry {
    pub key: KeypointKey,
    #[serde(flatten)]
    pub point: RawKeypoint,
}

/// Raw output of one backend for one frame.
///
/// Carries no fusion weight: the reliability configured for the backend's
/// profile is the only weight the engine uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// Backend identifier (matches a configured backend profile id)
    pub backend: String,

    /// Zero-based frame index within the unit of work
    pub frame_index: usize,

    /// Frame size in pixels, required when the backend reports pixel coordinates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_size: Option<(u32, u32)>,

    /// Keypoints keyed by the backend's own vocabulary
    #[serde(with = "keypoint_entries")]
    #[schemars(with = "Vec<KeypointEntry>")]
    pub keypoints: BTreeMap<KeypointKey, RawKeypoint>,
}

impl Detection {
    /// Create an empty detection for a backend.
    pub fn new(backend: impl Into<String>, frame_index: usize) -> Self {
        Self {
            backend: backend.into(),
            frame_index,
            frame_size: None,
            keypoints: BTreeMap::new(),
        }
    }

    /// Set the pixel frame size.
    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = Some((width, height));
        self
    }

    /// Add a keypoint (builder style).
    pub fn with_keypoint(mut self, key: impl Into<KeypointKey>, point: RawKeypoint) -> Self {
        self.keypoints.insert(key.into(), point);
        self
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// JSON object keys must be strings, so the keypoint map travels as a list
/// of `{key, x, y, z, confidence}` entries.
mod keypoint_entries {
    use super::{KeypointEntry, KeypointKey, RawKeypoint};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        map: &BTreeMap<KeypointKey, RawKeypoint>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let entries: Vec<KeypointEntry> = map
            .iter()
            .map(|(key, point)| KeypointEntry {
                key: key.clone(),
                point: *point,
            })
            .collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<KeypointKey, RawKeypoint>, D::Error> {
        let entries = Vec::<KeypointEntry>::deserialize(deserializer)?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.key, entry.point))
            .collect())
    }
}
