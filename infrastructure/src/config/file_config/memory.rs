//! Memory configuration from TOML (`[memory]` section)

use fleet_domain::MemoryPolicy;
use serde::{Deserialize, Serialize};

/// ```toml
/// [memory]
/// collective_importance_threshold = 0.6
/// similarity_threshold = 0.85
/// personal_boost = 1.2
/// recency_half_life_days = 30.0
/// forget_min_age_days = 30
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMemoryConfig {
    pub collective_importance_threshold: f64,
    pub similarity_threshold: f64,
    pub personal_boost: f64,
    pub recency_half_life_days: f64,
    pub forget_max_access_count: u32,
    pub forget_min_age_days: i64,
    pub decay_idle_days: i64,
    pub decay_factor: f64,
}

impl Default for FileMemoryConfig {
    fn default() -> Self {
        let policy = MemoryPolicy::default();
        Self {
            collective_importance_threshold: policy.collective_importance_threshold,
            similarity_threshold: policy.similarity_threshold,
            personal_boost: policy.personal_boost,
            recency_half_life_days: policy.recency_half_life_days,
            forget_max_access_count: policy.forget_max_access_count,
            forget_min_age_days: policy.forget_min_age_days,
            decay_idle_days: policy.decay_idle_days,
            decay_factor: policy.decay_factor,
        }
    }
}

impl FileMemoryConfig {
    pub fn to_policy(&self) -> MemoryPolicy {
        MemoryPolicy {
            collective_importance_threshold: self.collective_importance_threshold,
            similarity_threshold: self.similarity_threshold,
            personal_boost: self.personal_boost,
            recency_half_life_days: self.recency_half_life_days,
            forget_max_access_count: self.forget_max_access_count,
            forget_min_age_days: self.forget_min_age_days,
            decay_idle_days: self.decay_idle_days,
            decay_factor: self.decay_factor,
        }
    }
}
