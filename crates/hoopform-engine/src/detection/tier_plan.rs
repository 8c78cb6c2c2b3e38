//! Backend sets per analysis tier.
//!
//! A `TierPlan` is the ordered list of backend sets a job tries for each
//! frame: the requested tier first, then each tier of its fallback chain.
//! The first id in a set is its primary backend; the rest are secondary
//! backends whose output is fused in when available.

use hoopform_models::AnalysisTier;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// Backends run together for one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendSet {
    pub tier: AnalysisTier,
    pub backends: Vec<String>,
}

impl BackendSet {
    /// The backend whose success decides whether this set served the frame.
    pub fn primary(&self) -> Option<&str> {
        self.backends.first().map(String::as_str)
    }

    pub fn secondaries(&self) -> &[String] {
        self.backends.get(1..).unwrap_or(&[])
    }
}

/// Ordered backend sets for a requested tier.
#[derive(Debug, Clone)]
pub struct TierPlan {
    requested: AnalysisTier,
    sets: Vec<BackendSet>,
}

impl TierPlan {
    /// Build the plan for a tier from configuration.
    pub fn for_tier(tier: AnalysisTier, config: &EngineConfig) -> EngineResult<Self> {
        let mut sets = Vec::new();
        for step in tier.fallback_chain() {
            let backends = config.tiers.get(step).cloned().unwrap_or_default();
            if backends.is_empty() {
                return Err(EngineError::config(format!(
                    "no backend set configured for tier '{}'",
                    step
                )));
            }
            sets.push(BackendSet {
                tier: *step,
                backends,
            });
        }

        match tier {
            AnalysisTier::Free => {
                info!(backends = ?sets[0].backends, "Building Free tier plan (single detector)");
            }
            AnalysisTier::Professional => {
                info!(
                    backends = ?sets[0].backends,
                    fallback_sets = sets.len() - 1,
                    "Building Professional tier plan (detector + verification)"
                );
            }
        }

        Ok(Self {
            requested: tier,
            sets,
        })
    }

    pub fn requested(&self) -> AnalysisTier {
        self.requested
    }

    pub fn sets(&self) -> &[BackendSet] {
        &self.sets
    }

    /// Every backend id the plan may call, without duplicates.
    pub fn backend_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = Vec::new();
        for id in self.sets.iter().flat_map(|s| s.backends.iter()) {
            if !ids.contains(&id.as_str()) {
                ids.push(id);
            }
        }
        ids
    }
}
