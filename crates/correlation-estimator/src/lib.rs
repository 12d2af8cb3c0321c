use async_trait::async_trait;
use network_core::{
    Estimator, Instrument, NetworkConfig, NetworkError, RelationshipFn, RelationshipMatrix,
    StrengthRange,
};
use rayon::prelude::*;
use statrs::statistics::Statistics;

/// Pearson product-moment correlation over the pairwise-finite overlap.
pub struct PearsonRelationship;

impl RelationshipFn for PearsonRelationship {
    fn name(&self) -> &'static str {
        "pearson"
    }

    fn range(&self) -> StrengthRange {
        StrengthRange {
            min: -1.0,
            max: 1.0,
        }
    }

    fn relate(&self, a: &[f64], b: &[f64], min_overlap: usize) -> Option<f64> {
        // Missing observations drop out pairwise, not globally
        let paired: Vec<(f64, f64)> = a
            .iter()
            .zip(b.iter())
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(&x, &y)| (x, y))
            .collect();
        if paired.len() < min_overlap {
            return None;
        }

        let xs: Vec<f64> = paired.iter().map(|p| p.0).collect();
        let ys: Vec<f64> = paired.iter().map(|p| p.1).collect();
        let mean_x = xs.as_slice().mean();
        let mean_y = ys.as_slice().mean();

        let mut cov = 0.0;
        let mut var_x = 0.0;
        let mut var_y = 0.0;
        for (x, y) in &paired {
            let dx = x - mean_x;
            let dy = y - mean_y;
            cov += dx * dy;
            var_x += dx * dx;
            var_y += dy * dy;
        }

        // A flat series has no defined correlation
        if var_x == 0.0 || var_y == 0.0 {
            return None;
        }
        Some((cov / (var_x * var_y).sqrt()).clamp(-1.0, 1.0))
    }
}

/// Relationship estimation engine: turns aligned per-instrument series
/// into a symmetric pairwise strength matrix. The relationship function
/// itself is pluggable; Pearson correlation is the default.
pub struct CorrelationEstimator {
    relationship: Box<dyn RelationshipFn>,
}

impl CorrelationEstimator {
    pub fn pearson() -> Self {
        Self {
            relationship: Box::new(PearsonRelationship),
        }
    }

    pub fn with_relationship(relationship: Box<dyn RelationshipFn>) -> Self {
        Self { relationship }
    }

    pub fn relationship(&self) -> &dyn RelationshipFn {
        self.relationship.as_ref()
    }

    /// Estimate every unordered pair. Pairs with too little overlapping
    /// data are absent from the output, never zero.
    pub fn estimate_sync(
        &self,
        instruments: &[Instrument],
        config: &NetworkConfig,
    ) -> Result<RelationshipMatrix, NetworkError> {
        for inst in instruments {
            if inst.series.len() < config.min_window {
                return Err(NetworkError::DataInsufficient(format!(
                    "series for {} has {} observations, need at least {}",
                    inst.symbol,
                    inst.series.len(),
                    config.min_window
                )));
            }
        }
        // All series must sit on the shared timestamp index
        if let Some(first) = instruments.first() {
            let len = first.series.len();
            for inst in &instruments[1..] {
                if inst.series.len() != len {
                    return Err(NetworkError::InvalidData(format!(
                        "series for {} has {} observations, expected {} (shared index)",
                        inst.symbol,
                        inst.series.len(),
                        len
                    )));
                }
            }
        }

        let values: Vec<Vec<f64>> = instruments
            .iter()
            .map(|inst| {
                let v = inst.series.values();
                match config.window {
                    Some(w) if v.len() > w => v[v.len() - w..].to_vec(),
                    _ => v,
                }
            })
            .collect();

        let pairs: Vec<(usize, usize)> = (0..instruments.len())
            .flat_map(|i| ((i + 1)..instruments.len()).map(move |j| (i, j)))
            .collect();

        let estimated: Vec<((usize, usize), f64)> = pairs
            .par_iter()
            .filter_map(|&(i, j)| {
                self.relationship
                    .relate(&values[i], &values[j], config.min_overlap_observations)
                    .map(|s| ((i, j), s))
            })
            .collect();

        let mut matrix = RelationshipMatrix::new();
        for ((i, j), strength) in estimated {
            matrix.insert(&instruments[i].symbol, &instruments[j].symbol, strength);
        }
        tracing::debug!(
            relationship = self.relationship.name(),
            pairs = pairs.len(),
            defined = matrix.len(),
            "estimated relationship matrix"
        );
        Ok(matrix)
    }
}

#[async_trait]
impl Estimator for CorrelationEstimator {
    async fn estimate(
        &self,
        instruments: &[Instrument],
        config: &NetworkConfig,
    ) -> Result<RelationshipMatrix, NetworkError> {
        self.estimate_sync(instruments, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use network_core::PriceSeries;

    fn config(min_window: usize, min_overlap: usize) -> NetworkConfig {
        NetworkConfig {
            min_window,
            min_overlap_observations: min_overlap,
            ..Default::default()
        }
    }

    fn instrument(symbol: &str, values: &[f64]) -> Instrument {
        Instrument::new(symbol, symbol, PriceSeries::from_values(values))
    }

    #[test]
    fn test_perfect_positive_correlation() {
        let r = PearsonRelationship;
        let a = [1.0, 2.0, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, 8.0, 10.0];
        let s = r.relate(&a, &b, 2).unwrap();
        assert!((s - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_perfect_negative_correlation() {
        let r = PearsonRelationship;
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [8.0, 6.0, 4.0, 2.0];
        let s = r.relate(&a, &b, 2).unwrap();
        assert!((s + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_observations_excluded_pairwise() {
        let r = PearsonRelationship;
        let a = [1.0, f64::NAN, 3.0, 4.0, 5.0];
        let b = [2.0, 4.0, 6.0, f64::NAN, 10.0];
        // Only positions 0, 2, 4 overlap
        let s = r.relate(&a, &b, 3).unwrap();
        assert!((s - 1.0).abs() < 1e-12);
        // Raising the overlap floor makes the pair undefined
        assert!(r.relate(&a, &b, 4).is_none());
    }

    #[test]
    fn test_flat_series_has_no_correlation() {
        let r = PearsonRelationship;
        let a = [3.0, 3.0, 3.0, 3.0];
        let b = [1.0, 2.0, 3.0, 4.0];
        assert!(r.relate(&a, &b, 2).is_none());
    }

    #[test]
    fn test_short_series_rejected() {
        let estimator = CorrelationEstimator::pearson();
        let instruments = vec![
            instrument("AAPL", &[1.0, 2.0]),
            instrument("MSFT", &[1.0, 2.0]),
        ];
        let err = estimator
            .estimate_sync(&instruments, &config(5, 3))
            .unwrap_err();
        assert!(matches!(err, NetworkError::DataInsufficient(_)));
    }

    #[test]
    fn test_misaligned_series_rejected() {
        let estimator = CorrelationEstimator::pearson();
        let instruments = vec![
            instrument("AAPL", &[1.0, 2.0, 3.0, 4.0]),
            instrument("MSFT", &[1.0, 2.0, 3.0]),
        ];
        let err = estimator
            .estimate_sync(&instruments, &config(3, 2))
            .unwrap_err();
        assert!(matches!(err, NetworkError::InvalidData(_)));
    }

    #[test]
    fn test_undefined_pair_absent_not_zero() {
        let estimator = CorrelationEstimator::pearson();
        // MSFT only shares 2 finite positions with AAPL
        let instruments = vec![
            instrument("AAPL", &[1.0, 2.0, 3.0, 4.0]),
            instrument("MSFT", &[1.0, f64::NAN, f64::NAN, 2.0]),
            instrument("XOM", &[2.0, 4.0, 6.0, 8.0]),
        ];
        let matrix = estimator
            .estimate_sync(&instruments, &config(4, 3))
            .unwrap();
        assert_eq!(matrix.get("AAPL", "MSFT"), None);
        assert!(matrix.get("AAPL", "XOM").is_some());
    }

    #[test]
    fn test_rolling_window_uses_trailing_observations() {
        let estimator = CorrelationEstimator::pearson();
        // Correlated early, anti-correlated in the last 4 observations
        let a = [1.0, 2.0, 3.0, 4.0, 1.0, 2.0, 3.0, 4.0];
        let b = [1.0, 2.0, 3.0, 4.0, 4.0, 3.0, 2.0, 1.0];
        let instruments = vec![instrument("A", &a), instrument("B", &b)];

        let full = estimator
            .estimate_sync(&instruments, &config(4, 2))
            .unwrap()
            .get("A", "B")
            .unwrap();
        let trailing = estimator
            .estimate_sync(
                &instruments,
                &NetworkConfig {
                    window: Some(4),
                    ..config(4, 2)
                },
            )
            .unwrap()
            .get("A", "B")
            .unwrap();
        assert!(full > trailing);
        assert!((trailing + 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_estimator_trait_object() {
        let estimator: Box<dyn Estimator> = Box::new(CorrelationEstimator::pearson());
        let instruments = vec![
            instrument("A", &[1.0, 2.0, 3.0, 4.0]),
            instrument("B", &[2.0, 4.0, 6.0, 8.0]),
        ];
        let matrix = estimator
            .estimate(&instruments, &config(4, 2))
            .await
            .unwrap();
        assert_eq!(matrix.len(), 1);
    }

    #[test]
    fn test_declared_range() {
        let estimator = CorrelationEstimator::pearson();
        let range = estimator.relationship().range();
        assert_eq!(range.min, -1.0);
        assert_eq!(range.max, 1.0);
        assert_eq!(estimator.relationship().name(), "pearson");
    }
}
