//! Pose backend boundary.
//!
//! The engine never runs a model itself. Each detector is wrapped behind
//! [`PoseBackend`] and owned by the job that uses it.

use async_trait::async_trait;
use hoopform_models::Detection;
use image::RgbImage;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};

/// One unit of input: a video frame or a single still image.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub index: usize,
    pub image: Option<Arc<RgbImage>>,
}

impl Frame {
    pub fn new(index: usize) -> Self {
        Self { index, image: None }
    }

    pub fn with_image(mut self, image: RgbImage) -> Self {
        self.image = Some(Arc::new(image));
        self
    }

    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.image.as_ref().map(|img| img.dimensions())
    }
}

/// Pose detection backend.
///
/// Implementations return raw keypoints in their own schema; mapping to the
/// canonical vocabulary happens in the adapter.
#[async_trait]
pub trait PoseBackend: Send + Sync {
    /// Backend id, matching a configured backend profile.
    fn id(&self) -> &str;

    /// Whether the backend can be called at all (model loaded, service up).
    fn is_available(&self) -> bool {
        true
    }

    /// Detect keypoints in a frame.
    async fn detect(&self, frame: &Frame) -> EngineResult<Detection>;
}

/// Backend handles owned by a job, keyed by backend id.
pub type BackendHandles = BTreeMap<String, Arc<dyn PoseBackend>>;

/// Collect handles into a map keyed by their ids.
pub fn backend_handles<I>(backends: I) -> BackendHandles
where
    I: IntoIterator<Item = Arc<dyn PoseBackend>>,
{
    backends
        .into_iter()
        .map(|b| (b.id().to_string(), b))
        .collect()
}

/// Serves previously recorded detections by frame index.
///
/// Lets a job re-run fusion and tracking over detections captured earlier
/// (for example, loaded from JSON) without calling a model.
#[derive(Debug, Clone)]
pub struct ReplayBackend {
    id: String,
    detections: BTreeMap<usize, Detection>,
}

impl ReplayBackend {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            detections: BTreeMap::new(),
        }
    }

    pub fn from_detections<I: IntoIterator<Item = Detection>>(
        id: impl Into<String>,
        detections: I,
    ) -> Self {
        let mut backend = Self::new(id);
        for detection in detections {
            backend.insert(detection);
        }
        backend
    }

    /// Load a JSON array of detections.
    pub fn from_json_str(id: impl Into<String>, json: &str) -> EngineResult<Self> {
        let detections: Vec<Detection> = serde_json::from_str(json)?;
        Ok(Self::from_detections(id, detections))
    }

    pub fn insert(&mut self, detection: Detection) {
        self.detections.insert(detection.frame_index, detection);
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

#[async_trait]
impl PoseBackend for ReplayBackend {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_available(&self) -> bool {
        !self.detections.is_empty()
    }

    async fn detect(&self, frame: &Frame) -> EngineResult<Detection> {
        self.detections.get(&frame.index).cloned().ok_or_else(|| {
            EngineError::backend_failed(&self.id, format!("no recorded detection for frame {}", frame.index))
        })
    }
}
