use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use centrality_engine::CentralityEngine;
use chrono::Utc;
use correlation_estimator::CorrelationEstimator;
use graph_builder::{GraphBuilder, SectorAggregator};
use network_core::{
    AnalysisPhase, Instrument, NetworkAnalysis, NetworkConfig, NetworkError, NetworkMode,
    RelationshipFn,
};
use serde_json::json;
use sha2::{Digest, Sha256};

mod cache;
pub use cache::{CacheKey, NetworkCache};

/// Orchestrates the analysis pipeline (estimate → build → aggregate →
/// score) per requested mode, with a shared single-flight result cache.
pub struct NetworkOrchestrator {
    estimator: Arc<CorrelationEstimator>,
    graph_builder: Arc<GraphBuilder>,
    sector_aggregator: Arc<SectorAggregator>,
    centrality: Arc<CentralityEngine>,
    config: NetworkConfig,
    cache: Arc<NetworkCache>,
    computations: AtomicU64,
}

impl NetworkOrchestrator {
    pub fn new(config: NetworkConfig) -> Result<Self, NetworkError> {
        Self::with_cache(config, Arc::new(NetworkCache::new()))
    }

    /// The cache is an explicit collaborator: create it once per process
    /// and share it across orchestrators if needed.
    pub fn with_cache(config: NetworkConfig, cache: Arc<NetworkCache>) -> Result<Self, NetworkError> {
        config.validate()?;
        Ok(Self {
            estimator: Arc::new(CorrelationEstimator::pearson()),
            graph_builder: Arc::new(GraphBuilder::new()),
            sector_aggregator: Arc::new(SectorAggregator::new()),
            centrality: Arc::new(CentralityEngine::new()),
            config,
            cache,
            computations: AtomicU64::new(0),
        })
    }

    /// Swap the relationship function (Pearson by default).
    pub fn with_relationship(mut self, relationship: Box<dyn RelationshipFn>) -> Self {
        self.estimator = Arc::new(CorrelationEstimator::with_relationship(relationship));
        self
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Number of pipeline computations actually run (cache hits and
    /// latch waits excluded).
    pub fn computations(&self) -> u64 {
        self.computations.load(Ordering::SeqCst)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub async fn analyze(
        &self,
        instruments: &[Instrument],
        mode: NetworkMode,
    ) -> Result<Arc<NetworkAnalysis>, NetworkError> {
        self.analyze_with_config(instruments, mode, &self.config).await
    }

    /// Run or reuse an analysis for the given inputs. Concurrent callers
    /// with the same (mode, snapshot, config) share one computation.
    pub async fn analyze_with_config(
        &self,
        instruments: &[Instrument],
        mode: NetworkMode,
        config: &NetworkConfig,
    ) -> Result<Arc<NetworkAnalysis>, NetworkError> {
        config.validate()?;
        let key = CacheKey {
            mode,
            snapshot: snapshot_hash(instruments),
            config: config_fingerprint(config)?,
        };
        let ttl = config.cache_ttl_secs.map(chrono::Duration::seconds);

        if let Some(hit) = self.cache.get(&key, ttl) {
            tracing::debug!(mode = %mode, "analysis served from cache");
            return Ok(hit);
        }

        let slot = self.cache.begin(&key);
        let mut guard = slot.lock().await;
        if let Some(result) = guard.as_ref() {
            return result.clone();
        }
        // A previous leader may have completed between the cache probe
        // and latch acquisition
        if let Some(hit) = self.cache.get(&key, ttl) {
            *guard = Some(Ok(hit.clone()));
            self.cache.finish(&key);
            return Ok(hit);
        }

        self.computations.fetch_add(1, Ordering::SeqCst);
        tracing::info!(mode = %mode, instruments = instruments.len(), "starting network analysis");

        let estimator = self.estimator.clone();
        let builder = self.graph_builder.clone();
        let aggregator = self.sector_aggregator.clone();
        let centrality = self.centrality.clone();
        let owned_instruments = instruments.to_vec();
        let owned_config = config.clone();
        let snapshot = key.snapshot.clone();

        let result = tokio::task::spawn_blocking(move || {
            run_pipeline(
                &estimator,
                &builder,
                &aggregator,
                &centrality,
                &owned_instruments,
                mode,
                &owned_config,
                snapshot,
            )
        })
        .await
        .map_err(|e| NetworkError::Computation {
            phase: AnalysisPhase::Failed,
            message: format!("analysis task aborted: {e}"),
        })
        .and_then(|r| r)
        .map(Arc::new);

        match &result {
            Ok(analysis) => {
                self.cache.store(key.clone(), analysis.clone());
                tracing::info!(mode = %mode, nodes = analysis.nodes.len(), "analysis ready");
            }
            Err(e) => {
                tracing::warn!(mode = %mode, error = %e, "analysis failed; nothing cached");
            }
        }
        *guard = Some(result.clone());
        self.cache.finish(&key);
        result
    }

    /// As `analyze`, but abandoned after `timeout`. A timed-out call
    /// stores nothing; its latch is released so later callers recompute.
    pub async fn analyze_with_timeout(
        &self,
        instruments: &[Instrument],
        mode: NetworkMode,
        timeout: std::time::Duration,
    ) -> Result<Arc<NetworkAnalysis>, NetworkError> {
        let started = Instant::now();
        match tokio::time::timeout(timeout, self.analyze(instruments, mode)).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::ComputationTimeout {
                elapsed_ms: started.elapsed().as_millis() as u64,
            }),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_pipeline(
    estimator: &CorrelationEstimator,
    builder: &GraphBuilder,
    aggregator: &SectorAggregator,
    centrality: &CentralityEngine,
    instruments: &[Instrument],
    mode: NetworkMode,
    config: &NetworkConfig,
    snapshot: String,
) -> Result<NetworkAnalysis, NetworkError> {
    let started = Instant::now();

    tracing::debug!(phase = %AnalysisPhase::Estimating, "estimating pairwise relationships");
    let matrix = estimator.estimate_sync(instruments, config)?;

    tracing::debug!(phase = %AnalysisPhase::Building, "building instrument graph");
    let mut graph = builder.build(instruments, &matrix, config)?;

    if mode == NetworkMode::Sector {
        tracing::debug!(phase = %AnalysisPhase::Aggregating, "collapsing to sector graph");
        graph = aggregator.aggregate(&graph, config)?;
    }

    tracing::debug!(phase = %AnalysisPhase::Scoring, "scoring centrality");
    centrality.score(&mut graph, config)?;

    let node_count = graph.node_count();
    let edge_count = graph.edge_count();
    let density = if node_count >= 2 {
        2.0 * edge_count as f64 / (node_count as f64 * (node_count - 1) as f64)
    } else {
        0.0
    };
    let metrics = json!({
        "node_count": node_count,
        "edge_count": edge_count,
        "density": density,
        "defined_pairs": matrix.len(),
        "relationship": estimator.relationship().name(),
        "elapsed_ms": started.elapsed().as_millis() as u64,
    });

    tracing::debug!(phase = %AnalysisPhase::Ready, nodes = node_count, edges = edge_count, "analysis complete");
    Ok(NetworkAnalysis {
        mode,
        snapshot,
        generated_at: Utc::now(),
        nodes: graph.into_nodes(),
        metrics,
    })
}

/// Content hash of the instrument set: symbols, labels, sector tags and
/// raw series bits, independent of the caller's iteration order.
fn snapshot_hash(instruments: &[Instrument]) -> String {
    let mut ordered: Vec<&Instrument> = instruments.iter().collect();
    ordered.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let mut hasher = Sha256::new();
    for inst in ordered {
        hasher.update(inst.symbol.as_bytes());
        hasher.update([0]);
        hasher.update(inst.label.as_bytes());
        hasher.update([0]);
        if let Some(sector) = &inst.sector {
            hasher.update(sector.as_bytes());
        }
        hasher.update([0]);
        for obs in &inst.series.observations {
            hasher.update(obs.timestamp.timestamp_millis().to_le_bytes());
            hasher.update(obs.value.to_bits().to_le_bytes());
        }
        hasher.update([0xff]);
    }
    hex::encode(hasher.finalize())
}

fn config_fingerprint(config: &NetworkConfig) -> Result<String, NetworkError> {
    let bytes = serde_json::to_vec(config).map_err(|e| {
        NetworkError::InvalidConfiguration(format!("configuration not serializable: {e}"))
    })?;
    Ok(hex::encode(Sha256::digest(bytes)))
}
