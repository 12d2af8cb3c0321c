use serde::{Deserialize, Serialize};

use crate::NetworkError;

/// How inter-sector edge weights are derived from the instrument-level
/// edges crossing between two sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SectorAggregation {
    Mean,
    Sum,
}

/// Edge-weight-to-path-cost transform used by the betweenness pass.
///
/// `InverseWeight` (cost = 1/weight) makes stronger relationships
/// "closer"; `Unit` ignores weights and treats every hop as cost 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeCostPolicy {
    InverseWeight,
    Unit,
}

/// Tunable parameters of an analysis run. Validation fails fast on the
/// first out-of-range value; nothing is silently clamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Minimum |relationship strength| for an edge to survive, in (0, 1].
    pub min_absolute_strength: f64,
    /// Keep only the top-K strongest edges per node when set.
    pub max_edges_per_node: Option<usize>,
    /// Minimum overlapping finite observations for a pair to be defined.
    pub min_overlap_observations: usize,
    /// Minimum series length; shorter series reject the whole run.
    pub min_window: usize,
    /// Trailing rolling window length; `None` uses the full overlap.
    pub window: Option<usize>,
    /// Divide betweenness by (V-1)(V-2)/2 so scores compare across sizes.
    pub normalize_betweenness: bool,
    pub sector_edge_aggregation: SectorAggregation,
    pub edge_cost_policy: EdgeCostPolicy,
    /// Cached results older than this many seconds are evicted on read.
    pub cache_ttl_secs: Option<i64>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            min_absolute_strength: 0.4,
            max_edges_per_node: None,
            min_overlap_observations: 20,
            min_window: 30,
            window: None,
            normalize_betweenness: true,
            sector_edge_aggregation: SectorAggregation::Mean,
            edge_cost_policy: EdgeCostPolicy::InverseWeight,
            cache_ttl_secs: None,
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), NetworkError> {
        if !(self.min_absolute_strength > 0.0 && self.min_absolute_strength <= 1.0) {
            return Err(NetworkError::InvalidConfiguration(format!(
                "min_absolute_strength must be in (0, 1], got {}",
                self.min_absolute_strength
            )));
        }
        if self.max_edges_per_node == Some(0) {
            return Err(NetworkError::InvalidConfiguration(
                "max_edges_per_node must be at least 1 when set".to_string(),
            ));
        }
        if self.min_overlap_observations < 2 {
            return Err(NetworkError::InvalidConfiguration(format!(
                "min_overlap_observations must be at least 2, got {}",
                self.min_overlap_observations
            )));
        }
        if self.min_window < self.min_overlap_observations {
            return Err(NetworkError::InvalidConfiguration(format!(
                "min_window ({}) must be at least min_overlap_observations ({})",
                self.min_window, self.min_overlap_observations
            )));
        }
        if let Some(w) = self.window {
            if w < self.min_overlap_observations {
                return Err(NetworkError::InvalidConfiguration(format!(
                    "window ({w}) must be at least min_overlap_observations ({})",
                    self.min_overlap_observations
                )));
            }
        }
        if let Some(ttl) = self.cache_ttl_secs {
            if ttl < 0 {
                return Err(NetworkError::InvalidConfiguration(format!(
                    "cache_ttl_secs must be non-negative, got {ttl}"
                )));
            }
        }
        Ok(())
    }
}
