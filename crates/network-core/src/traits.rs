use async_trait::async_trait;

use crate::{Instrument, NetworkConfig, NetworkError, RelationshipMatrix};

/// Declared output range of a relationship function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrengthRange {
    pub min: f64,
    pub max: f64,
}

/// A pairwise relationship function over two position-aligned series.
///
/// Implementations must exclude non-finite observations pairwise and
/// return `None` when fewer than `min_overlap` valid pairs remain.
pub trait RelationshipFn: Send + Sync {
    fn name(&self) -> &'static str;

    fn range(&self) -> StrengthRange;

    fn relate(&self, a: &[f64], b: &[f64], min_overlap: usize) -> Option<f64>;
}

/// Trait for relationship estimation engines.
#[async_trait]
pub trait Estimator: Send + Sync {
    async fn estimate(
        &self,
        instruments: &[Instrument],
        config: &NetworkConfig,
    ) -> Result<RelationshipMatrix, NetworkError>;
}
