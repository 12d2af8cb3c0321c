use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::NetworkError;

/// A single observed price on the shared timestamp index.
///
/// A `NAN` value marks a missing observation; it is excluded pairwise
/// during relationship estimation, never treated as zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Ordered price series for one instrument.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    pub observations: Vec<Observation>,
}

impl PriceSeries {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Build a series from plain values, one observation per day ending now.
    pub fn from_values(values: &[f64]) -> Self {
        let start = Utc::now() - chrono::Duration::days(values.len() as i64);
        let observations = values
            .iter()
            .enumerate()
            .map(|(i, &value)| Observation {
                timestamp: start + chrono::Duration::days(i as i64),
                value,
            })
            .collect();
        Self { observations }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }
}

/// A financial instrument and its price history. Immutable once ingested
/// for a given analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub label: String,
    pub sector: Option<String>,
    pub series: PriceSeries,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, label: impl Into<String>, series: PriceSeries) -> Self {
        Self {
            symbol: symbol.into(),
            label: label.into(),
            sector: None,
            series,
        }
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

/// Granularity of the network view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
    Stock,
    Sector,
}

impl NetworkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkMode::Stock => "stock",
            NetworkMode::Sector => "sector",
        }
    }
}

impl fmt::Display for NetworkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pipeline phase of an analysis request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisPhase {
    Idle,
    Estimating,
    Building,
    Aggregating,
    Scoring,
    Ready,
    Failed,
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnalysisPhase::Idle => "idle",
            AnalysisPhase::Estimating => "estimating",
            AnalysisPhase::Building => "building",
            AnalysisPhase::Aggregating => "aggregating",
            AnalysisPhase::Scoring => "scoring",
            AnalysisPhase::Ready => "ready",
            AnalysisPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A scored node in the network. Centrality fields are derived by the
/// scoring engine, never set by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub sector: Option<String>,
    pub degree: usize,
    pub betweenness: f64,
}

/// An undirected edge between two nodes. `weight` is the absolute
/// relationship strength (always strictly positive); `signed_strength`
/// keeps the raw signed value as auxiliary metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub a: String,
    pub b: String,
    pub weight: f64,
    pub signed_strength: f64,
}

/// A simple weighted undirected graph. Nodes keep their discovery order;
/// node ids are unique and every edge endpoint must already exist.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning its index. Duplicate ids are rejected.
    pub fn add_node(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        sector: Option<String>,
    ) -> Result<usize, NetworkError> {
        let id = id.into();
        if self.index.contains_key(&id) {
            return Err(NetworkError::InvalidData(format!(
                "duplicate node id '{id}'"
            )));
        }
        let idx = self.nodes.len();
        self.index.insert(id.clone(), idx);
        self.nodes.push(Node {
            id,
            label: label.into(),
            sector,
            degree: 0,
            betweenness: 0.0,
        });
        Ok(idx)
    }

    /// Add an undirected edge. Self-edges, unknown endpoints, duplicate
    /// pairs and non-positive or non-finite weights are rejected.
    pub fn add_edge(
        &mut self,
        a: &str,
        b: &str,
        weight: f64,
        signed_strength: f64,
    ) -> Result<(), NetworkError> {
        if a == b {
            return Err(NetworkError::InvalidData(format!("self-edge on '{a}'")));
        }
        if !self.index.contains_key(a) {
            return Err(NetworkError::InvalidData(format!("unknown endpoint '{a}'")));
        }
        if !self.index.contains_key(b) {
            return Err(NetworkError::InvalidData(format!("unknown endpoint '{b}'")));
        }
        if !(weight.is_finite() && weight > 0.0) {
            return Err(NetworkError::InvalidData(format!(
                "edge {a}--{b} has non-positive weight {weight}"
            )));
        }
        if self
            .edges
            .iter()
            .any(|e| (e.a == a && e.b == b) || (e.a == b && e.b == a))
        {
            return Err(NetworkError::InvalidData(format!(
                "duplicate edge {a}--{b}"
            )));
        }
        self.edges.push(Edge {
            a: a.to_string(),
            b: b.to_string(),
            weight,
            signed_strength,
        });
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Adjacency list as (neighbor index, edge weight) pairs.
    pub fn adjacency(&self) -> Vec<Vec<(usize, f64)>> {
        let mut adj = vec![Vec::new(); self.nodes.len()];
        for edge in &self.edges {
            let ia = self.index[&edge.a];
            let ib = self.index[&edge.b];
            adj[ia].push((ib, edge.weight));
            adj[ib].push((ia, edge.weight));
        }
        adj
    }

    /// Write derived centrality scores back onto the nodes. Engine-facing;
    /// both slices must cover every node.
    pub fn apply_centrality(
        &mut self,
        degrees: &[usize],
        betweenness: &[f64],
    ) -> Result<(), NetworkError> {
        if degrees.len() != self.nodes.len() || betweenness.len() != self.nodes.len() {
            return Err(NetworkError::Computation {
                phase: AnalysisPhase::Scoring,
                message: format!(
                    "centrality scores cover {}/{} nodes",
                    degrees.len().min(betweenness.len()),
                    self.nodes.len()
                ),
            });
        }
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.degree = degrees[i];
            node.betweenness = betweenness[i];
        }
        Ok(())
    }

    /// Consume the graph, yielding its nodes in discovery order.
    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

/// Symmetric sparse map of pairwise relationship strengths. A pair with
/// too little overlapping data is absent, never zero.
#[derive(Debug, Clone, Default)]
pub struct RelationshipMatrix {
    values: HashMap<(String, String), f64>,
}

impl RelationshipMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(a: &str, b: &str) -> (String, String) {
        if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        }
    }

    pub fn insert(&mut self, a: &str, b: &str, strength: f64) {
        self.values.insert(Self::key(a, b), strength);
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.values.get(&Self::key(a, b)).copied()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.values
            .iter()
            .map(|((a, b), &s)| (a.as_str(), b.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Result of one network analysis run. Created by the orchestrator,
/// immutable, cached per (mode, input snapshot, config).
#[derive(Debug, Clone, Serialize)]
pub struct NetworkAnalysis {
    pub mode: NetworkMode,
    /// Content hash of the input instrument set and series.
    pub snapshot: String,
    pub generated_at: DateTime<Utc>,
    /// Nodes in graph discovery order; the consumer sorts/truncates.
    pub nodes: Vec<Node>,
    pub metrics: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_node_graph() -> Graph {
        let mut g = Graph::new();
        g.add_node("AAPL", "Apple", Some("Technology".into())).unwrap();
        g.add_node("MSFT", "Microsoft", Some("Technology".into())).unwrap();
        g.add_node("XOM", "Exxon", Some("Energy".into())).unwrap();
        g
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut g = three_node_graph();
        assert!(g.add_node("AAPL", "Apple again", None).is_err());
        assert_eq!(g.node_count(), 3);
    }

    #[test]
    fn test_self_edge_rejected() {
        let mut g = three_node_graph();
        assert!(g.add_edge("AAPL", "AAPL", 0.9, 0.9).is_err());
    }

    #[test]
    fn test_duplicate_edge_rejected_either_direction() {
        let mut g = three_node_graph();
        g.add_edge("AAPL", "MSFT", 0.8, 0.8).unwrap();
        assert!(g.add_edge("MSFT", "AAPL", 0.5, 0.5).is_err());
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn test_zero_weight_edge_rejected() {
        let mut g = three_node_graph();
        assert!(g.add_edge("AAPL", "MSFT", 0.0, 0.0).is_err());
        assert!(g.add_edge("AAPL", "MSFT", f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        let mut g = three_node_graph();
        g.add_edge("AAPL", "MSFT", 0.8, -0.8).unwrap();
        let adj = g.adjacency();
        assert_eq!(adj[0], vec![(1, 0.8)]);
        assert_eq!(adj[1], vec![(0, 0.8)]);
        assert!(adj[2].is_empty());
    }

    #[test]
    fn test_relationship_matrix_symmetric_lookup() {
        let mut m = RelationshipMatrix::new();
        m.insert("MSFT", "AAPL", 0.75);
        assert_eq!(m.get("AAPL", "MSFT"), Some(0.75));
        assert_eq!(m.get("MSFT", "AAPL"), Some(0.75));
        assert_eq!(m.get("AAPL", "XOM"), None);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn test_nodes_keep_discovery_order() {
        let g = three_node_graph();
        let ids: Vec<_> = g.nodes().iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["AAPL", "MSFT", "XOM"]);
    }
}
