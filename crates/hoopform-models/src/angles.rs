//! Biomechanical angle vocabulary.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Fixed set of angles/metrics derived from a fused skeleton.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AngleName {
    /// Shoulder-elbow-wrist, vertex at the elbow.
    Elbow,
    /// Hip-shoulder-elbow, vertex at the shoulder.
    Shoulder,
    /// Shoulder-hip-knee, vertex at the hip.
    Hip,
    /// Hip-knee-ankle, vertex at the knee.
    Knee,
    /// Wrist-to-ball direction against the image horizontal, upward positive.
    Release,
    /// Normalized upward travel of ball (or wrist) since the shot started.
    VerticalDisplacement,
}

impl AngleName {
    pub const ALL: &'static [AngleName] = &[
        AngleName::Elbow,
        AngleName::Shoulder,
        AngleName::Hip,
        AngleName::Knee,
        AngleName::Release,
        AngleName::VerticalDisplacement,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AngleName::Elbow => "elbow",
            AngleName::Shoulder => "shoulder",
            AngleName::Hip => "hip",
            AngleName::Knee => "knee",
            AngleName::Release => "release",
            AngleName::VerticalDisplacement => "vertical_displacement",
        }
    }
}

impl fmt::Display for AngleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Angle values for one frame.
///
/// Every name in [`AngleName::ALL`] is always present; `None` means the
/// joints needed for it were missing. An undefined angle is never `0.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AngleSet {
    values: BTreeMap<AngleName, Option<f64>>,
}

impl Default for AngleSet {
    fn default() -> Self {
        Self::undefined()
    }
}

impl AngleSet {
    /// A set where every angle is undefined.
    pub fn undefined() -> Self {
        Self {
            values: AngleName::ALL.iter().map(|name| (*name, None)).collect(),
        }
    }

    /// Value of an angle, `None` when undefined.
    pub fn get(&self, name: AngleName) -> Option<f64> {
        self.values.get(&name).copied().flatten()
    }

    pub fn is_defined(&self, name: AngleName) -> bool {
        self.get(name).is_some()
    }

    /// Set an angle. Non-finite values are stored as undefined.
    pub fn set(&mut self, name: AngleName, value: Option<f64>) {
        self.values
            .insert(name, value.filter(|v| v.is_finite()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (AngleName, Option<f64>)> + '_ {
        self.values.iter().map(|(name, value)| (*name, *value))
    }

    /// Number of defined angles.
    pub fn defined_count(&self) -> usize {
        self.values.values().filter(|v| v.is_some()).count()
    }
}
