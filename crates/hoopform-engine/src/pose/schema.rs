//! Static keypoint schema tables, one per known backend family.
//!
//! Each backend is described by a value (its table, coordinate space and
//! weight), never by a type. Adding a backend means adding a table, either
//! one of the built-ins below or a custom table from configuration.
//!
//! | Schema | Keys | Coordinates | Typical backend |
//! |--------|------|-------------|-----------------|
//! | `coco17` | index 0-16 | normalized | MoveNet / YOLO-pose (free tier) |
//! | `blazepose33` | landmark names | normalized | BlazePose (professional) |
//! | `body25` | index 0-24 | pixels | OpenPose verification detector |

use hoopform_models::{JointName, KeypointKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Coordinate convention of a backend's raw output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateSpace {
    /// Already in `[0,1]` image-relative units.
    #[default]
    Normalized,
    /// Pixel units; divided by the detection's frame size.
    Pixels,
}

/// Built-in schema tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinSchema {
    Coco17,
    Blazepose33,
    Body25,
}

impl BuiltinSchema {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuiltinSchema::Coco17 => "coco17",
            BuiltinSchema::Blazepose33 => "blazepose33",
            BuiltinSchema::Body25 => "body25",
        }
    }

    /// Materialize the table.
    pub fn table(&self) -> BackendSchema {
        match self {
            BuiltinSchema::Coco17 => BackendSchema::coco17(),
            BuiltinSchema::Blazepose33 => BackendSchema::blazepose33(),
            BuiltinSchema::Body25 => BackendSchema::body25(),
        }
    }
}

impl fmt::Display for BuiltinSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BuiltinSchema {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coco17" | "coco" | "movenet" => Ok(BuiltinSchema::Coco17),
            "blazepose33" | "blazepose" | "mediapipe" => Ok(BuiltinSchema::Blazepose33),
            "body25" | "openpose" => Ok(BuiltinSchema::Body25),
            other => Err(EngineError::config(format!("unknown schema '{}'", other))),
        }
    }
}

/// One row of a custom schema table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaEntry {
    pub key: KeypointKey,
    pub joint: JointName,
}

/// Where a backend profile gets its table from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SchemaSource {
    Builtin {
        name: BuiltinSchema,
        /// Extra rows layered on top of the built-in table (e.g. a ball class)
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        extra: Vec<SchemaEntry>,
    },
    Custom {
        #[serde(default)]
        coordinate_space: CoordinateSpace,
        entries: Vec<SchemaEntry>,
    },
}

impl SchemaSource {
    pub fn builtin(name: BuiltinSchema) -> Self {
        SchemaSource::Builtin {
            name,
            extra: Vec::new(),
        }
    }

    /// Resolve into a concrete table.
    pub fn resolve(&self, backend: &str) -> Result<BackendSchema, EngineError> {
        match self {
            SchemaSource::Builtin { name, extra } => {
                let mut schema = name.table();
                for entry in extra {
                    schema.insert(entry.key.clone(), entry.joint);
                }
                Ok(schema)
            }
            SchemaSource::Custom {
                coordinate_space,
                entries,
            } => {
                if entries.is_empty() {
                    return Err(EngineError::MissingSchema(backend.to_string()));
                }
                let mut schema = BackendSchema::new(format!("{}_custom", backend), *coordinate_space);
                for entry in entries {
                    schema.insert(entry.key.clone(), entry.joint);
                }
                Ok(schema)
            }
        }
    }
}

/// Backend key to canonical joint table.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSchema {
    name: String,
    coordinate_space: CoordinateSpace,
    table: BTreeMap<KeypointKey, JointName>,
}

impl BackendSchema {
    pub fn new(name: impl Into<String>, coordinate_space: CoordinateSpace) -> Self {
        Self {
            name: name.into(),
            coordinate_space,
            table: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinate_space(&self) -> CoordinateSpace {
        self.coordinate_space
    }

    pub fn insert(&mut self, key: KeypointKey, joint: JointName) {
        self.table.insert(key, joint);
    }

    /// Canonical joint for a backend key, `None` for keys this engine ignores.
    pub fn lookup(&self, key: &KeypointKey) -> Option<JointName> {
        self.table.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Canonical joints this backend can produce.
    pub fn joints(&self) -> Vec<JointName> {
        let mut joints: Vec<JointName> = self.table.values().copied().collect();
        joints.sort();
        joints.dedup();
        joints
    }

    fn from_indices(name: &str, space: CoordinateSpace, rows: &[(usize, JointName)]) -> Self {
        let mut schema = Self::new(name, space);
        for (index, joint) in rows {
            schema.insert(KeypointKey::Index(*index), *joint);
        }
        schema
    }

    /// COCO 17-keypoint layout (MoveNet, YOLO-pose).
    pub fn coco17() -> Self {
        use JointName::*;
        Self::from_indices(
            "coco17",
            CoordinateSpace::Normalized,
            &[
                (0, Nose),
                (1, LeftEye),
                (2, RightEye),
                (3, LeftEar),
                (4, RightEar),
                (5, LeftShoulder),
                (6, RightShoulder),
                (7, LeftElbow),
                (8, RightElbow),
                (9, LeftWrist),
                (10, RightWrist),
                (11, LeftHip),
                (12, RightHip),
                (13, LeftKnee),
                (14, RightKnee),
                (15, LeftAnkle),
                (16, RightAnkle),
            ],
        )
    }

    /// BlazePose 33-landmark names. Hand and foot detail landmarks
    /// (pinky, index, thumb, heel, foot_index, inner/outer eye, mouth) have
    /// no canonical counterpart and are not mapped.
    pub fn blazepose33() -> Self {
        let mut schema = Self::new("blazepose33", CoordinateSpace::Normalized);
        for joint in JointName::ALL {
            if matches!(joint, JointName::HipCenter | JointName::BallPosition) {
                continue;
            }
            schema.insert(KeypointKey::Name(joint.as_str().to_string()), *joint);
        }
        schema
    }

    /// OpenPose BODY_25 layout in pixel coordinates.
    pub fn body25() -> Self {
        use JointName::*;
        Self::from_indices(
            "body25",
            CoordinateSpace::Pixels,
            &[
                (0, Nose),
                (2, RightShoulder),
                (3, RightElbow),
                (4, RightWrist),
                (5, LeftShoulder),
                (6, LeftElbow),
                (7, LeftWrist),
                (8, HipCenter),
                (9, RightHip),
                (10, RightKnee),
                (11, RightAnkle),
                (12, LeftHip),
                (13, LeftKnee),
                (14, LeftAnkle),
                (15, RightEye),
                (16, LeftEye),
                (17, RightEar),
                (18, LeftEar),
            ],
        )
    }
}
