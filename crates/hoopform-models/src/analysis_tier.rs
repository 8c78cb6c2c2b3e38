//! Analysis tier definitions for shot-form processing.
//!
//! The tier controls which set of pose backends a job runs:
//!
//! - `Free`: a single general-purpose keypoint detector
//! - `Professional`: a named-keypoint detector plus a verification detector
//!
//! A professional job that loses its backends degrades to the free set
//! instead of failing, see [`AnalysisTier::fallback_chain`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Analysis tier for a shot-analysis job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisTier {
    /// Single general-purpose pose detector.
    #[default]
    Free,

    /// Named-keypoint detector cross-checked by a verification detector.
    Professional,
}

impl AnalysisTier {
    /// All available analysis tiers.
    pub const ALL: &'static [AnalysisTier] = &[AnalysisTier::Free, AnalysisTier::Professional];

    /// Returns the tier name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisTier::Free => "free",
            AnalysisTier::Professional => "professional",
        }
    }

    /// Returns a human-readable description.
    pub fn description(&self) -> &'static str {
        match self {
            AnalysisTier::Free => "Single general-purpose pose detector",
            AnalysisTier::Professional => "Named-keypoint detector with verification detector",
        }
    }

    /// Tiers to try, best first, when running a job at this tier.
    pub fn fallback_chain(&self) -> &'static [AnalysisTier] {
        match self {
            AnalysisTier::Free => &[AnalysisTier::Free],
            AnalysisTier::Professional => &[AnalysisTier::Professional, AnalysisTier::Free],
        }
    }

    /// Returns true if this tier fuses more than one pose backend.
    pub fn is_multi_backend(&self) -> bool {
        matches!(self, AnalysisTier::Professional)
    }
}

impl fmt::Display for AnalysisTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AnalysisTier {
    type Err = AnalysisTierParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" | "basic" => Ok(AnalysisTier::Free),
            "professional" | "pro" => Ok(AnalysisTier::Professional),
            _ => Err(AnalysisTierParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown analysis tier: {0}")]
pub struct AnalysisTierParseError(String);
