//! Configuration for the shot analysis engine.
//!
//! Every threshold the engine uses lives here with an example default.
//! The defaults are starting points to be calibrated against labelled
//! video, not fixed algorithmic constants.

use hoopform_models::AnalysisTier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::pose::schema::{BuiltinSchema, SchemaSource};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Selected analysis tier
    pub tier: AnalysisTier,

    /// Known pose backends
    pub backends: Vec<BackendProfileConfig>,

    /// Backend ids per tier; the first id of a set is its primary backend
    pub tiers: BTreeMap<AnalysisTier, Vec<String>>,

    pub fusion: FusionConfig,
    pub ball: BallLocatorConfig,
    pub tracker: TrackerConfig,
    pub scoring: ScoringConfig,
    pub overlay: OverlayConfig,
}

/// Static description of one pose backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendProfileConfig {
    /// Backend id, matched against `Detection::backend`
    pub id: String,

    /// Keypoint schema table
    pub schema: SchemaSource,

    /// Reliability weight for fusion (0.0-1.0]
    pub reliability: f64,

    /// Points below this confidence are dropped (default: 0.3)
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

fn default_min_confidence() -> f64 {
    0.3
}

/// Multi-backend fusion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Normalized distance above which two reports of one joint are treated
    /// as an outlier pair instead of averaged (default: 0.08)
    pub disagreement_threshold: f64,

    /// Reliability weight of the heuristic ball locator (default: 0.6)
    pub ball_reliability: f64,

    /// Derive `hip_center` from the hip pair when no backend reports it (default: true)
    pub derive_hip_center: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            disagreement_threshold: 0.08,
            ball_reliability: 0.6,
            derive_hip_center: true,
        }
    }
}

/// Heuristic ball locator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BallLocatorConfig {
    /// Enable the image-level ball search (default: true)
    pub enabled: bool,

    /// Hue band of a basketball in degrees (default: 5-35, orange)
    pub hue_min: f64,
    pub hue_max: f64,

    /// Minimum HSV saturation (default: 0.45)
    pub min_saturation: f64,

    /// Minimum HSV value (default: 0.25)
    pub min_value: f64,

    /// Pixel sampling stride (default: 2)
    pub stride: u32,

    /// Minimum matching samples for a plausible ball (default: 12)
    pub min_pixels: usize,

    /// Half-size of the search window around the shooting wrist (default: 0.15)
    pub search_radius: f64,

    /// Candidates below this confidence are reported absent (default: 0.2)
    pub min_confidence: f64,
}

impl Default for BallLocatorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hue_min: 5.0,
            hue_max: 35.0,
            min_saturation: 0.45,
            min_value: 0.25,
            stride: 2,
            min_pixels: 12,
            search_radius: 0.15,
            min_confidence: 0.2,
        }
    }
}

/// Shot phase state machine thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Trailing moving-average window for every signal (default: 3)
    pub smoothing_window: usize,

    /// IDLE -> LOAD: knee angle below this counts as bent (default: 150°)
    pub knee_bent_threshold: f64,

    /// IDLE -> LOAD: trailing window for the descent test (default: 4 frames)
    pub descent_window: usize,

    /// IDLE -> LOAD: minimum downward travel vs the trailing mean (default: 0.002)
    pub min_descent: f64,

    /// LOAD -> SET: minimum knee opening per frame (default: 0.5°)
    pub knee_extension_rate: f64,

    /// SET -> RELEASE: elbow near full extension (default: 150°)
    pub elbow_extension_threshold: f64,

    /// SET -> RELEASE: minimum upward ball velocity per frame (default: 0.01)
    pub min_release_velocity: f64,

    /// RELEASE -> FOLLOW_THROUGH: ball-to-hand distance for separation (default: 0.08)
    pub ball_separation_distance: f64,

    /// FOLLOW_THROUGH -> IDLE: per-frame angular change counted as still (default: 4°)
    pub stillness_threshold: f64,

    /// FOLLOW_THROUGH -> IDLE: consecutive still frames (default: 3)
    pub still_frames: usize,

    /// Consecutive qualifying frames before any transition fires (default: 2)
    pub min_run: usize,

    /// Tolerated consecutive frames with undefined signals (default: 3)
    pub max_gap: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 3,
            knee_bent_threshold: 150.0,
            descent_window: 4,
            min_descent: 0.002,
            knee_extension_rate: 0.5,
            elbow_extension_threshold: 150.0,
            min_release_velocity: 0.01,
            ball_separation_distance: 0.08,
            stillness_threshold: 4.0,
            still_frames: 3,
            min_run: 2,
            max_gap: 3,
        }
    }
}

/// Inclusive target band for a graded angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetRange {
    pub min: f64,
    pub max: f64,
}

impl TargetRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Form quality rule thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Max elbow angle during RELEASE (default: 155-180°)
    pub elbow_at_release: TargetRange,

    /// Min knee angle during LOAD (default: 95-145°)
    pub knee_at_load: TargetRange,

    /// Max release angle during RELEASE (default: 45-80°)
    pub release_angle: TargetRange,

    /// Max hip angle during RELEASE (default: 160-180°)
    pub hip_at_release: TargetRange,

    /// Max elbow angle during FOLLOW_THROUGH (default: 155-180°)
    pub elbow_at_follow_through: TargetRange,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            elbow_at_release: TargetRange::new(155.0, 180.0),
            knee_at_load: TargetRange::new(95.0, 145.0),
            release_angle: TargetRange::new(45.0, 80.0),
            hip_at_release: TargetRange::new(160.0, 180.0),
            elbow_at_follow_through: TargetRange::new(155.0, 180.0),
        }
    }
}

/// Overlay drawing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Render an overlay for every frame that carries an image (default: false)
    pub enabled: bool,

    pub skeleton_color: [u8; 3],
    pub joint_color: [u8; 3],
    pub ball_color: [u8; 3],
    pub callout_color: [u8; 3],

    /// Joint marker radius in pixels (default: 4)
    pub marker_radius: i32,

    /// Skeleton line thickness in pixels (default: 2)
    pub line_thickness: i32,

    /// Callout offset from its anchor joint in pixels (default: 24, -24)
    pub callout_offset: (i32, i32),

    /// TrueType/OpenType font for callout text; boxes only when unset
    pub font_path: Option<String>,

    /// Font size in pixels (default: 16.0)
    pub font_scale: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            skeleton_color: [255, 255, 0],
            joint_color: [0, 255, 0],
            ball_color: [255, 128, 0],
            callout_color: [255, 255, 255],
            marker_radius: 4,
            line_thickness: 2,
            callout_offset: (24, -24),
            font_path: None,
            font_scale: 16.0,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let backends = vec![
            BackendProfileConfig {
                id: "movenet".to_string(),
                schema: SchemaSource::builtin(BuiltinSchema::Coco17),
                reliability: 0.7,
                min_confidence: 0.3,
            },
            BackendProfileConfig {
                id: "blazepose".to_string(),
                schema: SchemaSource::builtin(BuiltinSchema::Blazepose33),
                reliability: 0.9,
                min_confidence: 0.5,
            },
            BackendProfileConfig {
                id: "openpose_verify".to_string(),
                schema: SchemaSource::builtin(BuiltinSchema::Body25),
                reliability: 0.6,
                min_confidence: 0.2,
            },
        ];

        let mut tiers = BTreeMap::new();
        tiers.insert(AnalysisTier::Free, vec!["movenet".to_string()]);
        tiers.insert(
            AnalysisTier::Professional,
            vec!["blazepose".to_string(), "openpose_verify".to_string()],
        );

        Self {
            tier: AnalysisTier::Free,
            backends,
            tiers,
            fusion: FusionConfig::default(),
            ball: BallLocatorConfig::default(),
            tracker: TrackerConfig::default(),
            scoring: ScoringConfig::default(),
            overlay: OverlayConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&content)?;
        info!(path = %path.as_ref().display(), tier = %config.tier, "Loaded engine config");
        Ok(config)
    }

    /// Create config from environment variables.
    ///
    /// Starts from the file named by `HOOPFORM_CONFIG` (or defaults) and
    /// applies `HOOPFORM_TIER`, `HOOPFORM_DISAGREEMENT_THRESHOLD`,
    /// `HOOPFORM_MIN_RUN` and `HOOPFORM_MAX_GAP` overrides. A `.env` file is
    /// honored when present.
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let mut config = match std::env::var("HOOPFORM_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => Self::default(),
        };

        if let Ok(tier) = std::env::var("HOOPFORM_TIER") {
            config.tier = tier
                .parse()
                .map_err(|e: hoopform_models::AnalysisTierParseError| {
                    EngineError::config(e.to_string())
                })?;
        }
        if let Some(threshold) = env_parse("HOOPFORM_DISAGREEMENT_THRESHOLD") {
            config.fusion.disagreement_threshold = threshold;
        }
        if let Some(min_run) = env_parse("HOOPFORM_MIN_RUN") {
            config.tracker.min_run = min_run;
        }
        if let Some(max_gap) = env_parse("HOOPFORM_MAX_GAP") {
            config.tracker.max_gap = max_gap;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> EngineResult<()> {
        let mut seen = std::collections::BTreeSet::new();
        for backend in &self.backends {
            if !seen.insert(backend.id.as_str()) {
                return Err(EngineError::config(format!(
                    "duplicate backend id '{}'",
                    backend.id
                )));
            }
            if !(backend.reliability > 0.0 && backend.reliability <= 1.0) {
                return Err(EngineError::config(format!(
                    "backend '{}' reliability must be in (0, 1], got {}",
                    backend.id, backend.reliability
                )));
            }
            if !(0.0..=1.0).contains(&backend.min_confidence) {
                return Err(EngineError::config(format!(
                    "backend '{}' min_confidence must be in [0, 1]",
                    backend.id
                )));
            }
        }

        for tier in self.tier.fallback_chain() {
            let ids = self.tiers.get(tier).ok_or_else(|| {
                EngineError::config(format!("no backend set configured for tier '{}'", tier))
            })?;
            if ids.is_empty() {
                return Err(EngineError::config(format!(
                    "backend set for tier '{}' is empty",
                    tier
                )));
            }
        }
        for (tier, ids) in &self.tiers {
            for id in ids {
                if !seen.contains(id.as_str()) {
                    return Err(EngineError::UnknownBackend(format!(
                        "{} (tier '{}')",
                        id, tier
                    )));
                }
            }
        }

        if !(self.fusion.disagreement_threshold > 0.0) {
            return Err(EngineError::config("disagreement_threshold must be positive"));
        }
        if !(self.fusion.ball_reliability > 0.0 && self.fusion.ball_reliability <= 1.0) {
            return Err(EngineError::config("ball_reliability must be in (0, 1]"));
        }
        if self.ball.stride == 0 {
            return Err(EngineError::config("ball stride must be at least 1"));
        }

        let t = &self.tracker;
        if t.min_run == 0 || t.smoothing_window == 0 || t.descent_window == 0 || t.still_frames == 0 {
            return Err(EngineError::config(
                "tracker run lengths and windows must be at least 1",
            ));
        }
        if !(0.0..=180.0).contains(&t.knee_bent_threshold)
            || !(0.0..=180.0).contains(&t.elbow_extension_threshold)
        {
            return Err(EngineError::config("tracker angle thresholds must be in [0, 180]"));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tracker.min_run, 2);
        assert_eq!(config.tiers[&AnalysisTier::Professional].len(), 2);
    }

    #[test]
    fn test_from_env_without_dotenv_file() {
        // No .env in the crate directory; loading must still succeed.
        let config = EngineConfig::from_env().unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = EngineConfig::from_json_str(
            r#"{"tier":"professional","tracker":{"max_gap":5}}"#,
        )
        .unwrap();
        assert_eq!(config.tier, AnalysisTier::Professional);
        assert_eq!(config.tracker.max_gap, 5);
        assert_eq!(config.tracker.min_run, 2);
        assert_eq!(config.backends.len(), 3);
    }

    #[test]
    fn test_unknown_backend_in_tier_is_fatal() {
        let mut config = EngineConfig::default();
        config
            .tiers
            .insert(AnalysisTier::Free, vec!["yolo_pose".to_string()]);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EngineError::UnknownBackend(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_reliability_rejected() {
        let mut config = EngineConfig::default();
        config.backends[0].reliability = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_fallback_tier_rejected() {
        let mut config = EngineConfig::default();
        config.tier = AnalysisTier::Professional;
        config.tiers.remove(&AnalysisTier::Free);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_min_run_rejected() {
        let mut config = EngineConfig::default();
        config.tracker.min_run = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_custom_schema_json() {
        let json = r#"{
            "backends": [
                {"id": "yolo", "reliability": 0.5,
                 "schema": {"type": "custom", "entries": [
                    {"key": "sports_ball", "joint": "ball_position"},
                    {"key": 0, "joint": "nose"}
                 ]}}
            ],
            "tiers": {"free": ["yolo"], "professional": ["yolo"]}
        }"#;
        let config = EngineConfig::from_json_str(json).unwrap();
        assert_eq!(config.backends[0].min_confidence, 0.3);
    }
}
