use network_core::{Graph, NetworkConfig, NetworkError};

mod brandes;

/// Scores every node of a graph with degree and betweenness centrality.
pub struct CentralityEngine;

impl CentralityEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute degree and betweenness and write them onto the graph's
    /// nodes. Betweenness follows the configured edge-cost policy and
    /// normalization flag.
    pub fn score(&self, graph: &mut Graph, config: &NetworkConfig) -> Result<(), NetworkError> {
        let adjacency = graph.adjacency();
        let degrees: Vec<usize> = adjacency.iter().map(|nbrs| nbrs.len()).collect();
        let betweenness = brandes::betweenness(
            &adjacency,
            config.edge_cost_policy,
            config.normalize_betweenness,
        )?;
        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            policy = ?config.edge_cost_policy,
            "scored centrality"
        );
        graph.apply_centrality(&degrees, &betweenness)
    }
}

impl Default for CentralityEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use network_core::EdgeCostPolicy;

    fn unnormalized() -> NetworkConfig {
        NetworkConfig {
            normalize_betweenness: false,
            ..Default::default()
        }
    }

    fn graph_of(nodes: &[&str], edges: &[(&str, &str, f64)]) -> Graph {
        let mut g = Graph::new();
        for id in nodes {
            g.add_node(*id, *id, None).unwrap();
        }
        for (a, b, w) in edges {
            g.add_edge(a, b, *w, *w).unwrap();
        }
        g
    }

    fn scored(nodes: &[&str], edges: &[(&str, &str, f64)], config: &NetworkConfig) -> Graph {
        let mut g = graph_of(nodes, edges);
        CentralityEngine::new().score(&mut g, config).unwrap();
        g
    }

    fn betweenness_of(g: &Graph, id: &str) -> f64 {
        g.nodes().iter().find(|n| n.id == id).unwrap().betweenness
    }

    #[test]
    fn test_edgeless_graph_all_zero() {
        let g = scored(&["A", "B", "C"], &[], &unnormalized());
        for node in g.nodes() {
            assert_eq!(node.degree, 0);
            assert_eq!(node.betweenness, 0.0);
        }
    }

    #[test]
    fn test_two_node_graph() {
        let g = scored(&["A", "B"], &[("A", "B", 0.8)], &NetworkConfig::default());
        for node in g.nodes() {
            assert_eq!(node.degree, 1);
            assert_eq!(node.betweenness, 0.0);
        }
    }

    #[test]
    fn test_path_graph_middle_node() {
        let g = scored(
            &["A", "B", "C"],
            &[("A", "B", 0.8), ("B", "C", 0.8)],
            &unnormalized(),
        );
        assert!((betweenness_of(&g, "B") - 1.0).abs() < 1e-12);
        assert_eq!(betweenness_of(&g, "A"), 0.0);
        assert_eq!(betweenness_of(&g, "C"), 0.0);
        let degrees: Vec<_> = g.nodes().iter().map(|n| n.degree).collect();
        assert_eq!(degrees, vec![1, 2, 1]);
    }

    #[test]
    fn test_star_graph_hub() {
        let g = scored(
            &["H", "L1", "L2", "L3"],
            &[("H", "L1", 0.9), ("H", "L2", 0.9), ("H", "L3", 0.9)],
            &unnormalized(),
        );
        // Hub lies on the unique shortest path of all 3 leaf pairs
        assert!((betweenness_of(&g, "H") - 3.0).abs() < 1e-12);
        for leaf in ["L1", "L2", "L3"] {
            assert_eq!(betweenness_of(&g, leaf), 0.0);
        }
    }

    #[test]
    fn test_star_graph_normalized() {
        let g = scored(
            &["H", "L1", "L2", "L3"],
            &[("H", "L1", 0.9), ("H", "L2", 0.9), ("H", "L3", 0.9)],
            &NetworkConfig::default(),
        );
        // 3 raw over (4-1)(4-2)/2 = 3 possible pairs
        assert!((betweenness_of(&g, "H") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_handshake_invariant() {
        let g = scored(
            &["A", "B", "C", "D"],
            &[("A", "B", 0.5), ("B", "C", 0.6), ("C", "D", 0.7), ("A", "C", 0.8)],
            &NetworkConfig::default(),
        );
        let degree_sum: usize = g.nodes().iter().map(|n| n.degree).sum();
        assert_eq!(degree_sum, 2 * g.edge_count());
    }

    #[test]
    fn test_all_scores_non_negative_and_finite() {
        let g = scored(
            &["A", "B", "C", "D", "E"],
            &[
                ("A", "B", 0.5),
                ("B", "C", 0.9),
                ("C", "D", 0.4),
                ("D", "E", 0.8),
                ("A", "E", 0.3),
                ("B", "D", 0.6),
            ],
            &NetworkConfig::default(),
        );
        for node in g.nodes() {
            assert!(node.betweenness >= 0.0);
            assert!(node.betweenness.is_finite());
        }
    }

    #[test]
    fn test_inverse_weight_reroutes_through_strong_edges() {
        // Direct A-C edge is weak (cost 2.5); the A-B-C detour over two
        // strong edges costs ~2.22, so B carries the A-C shortest path.
        let edges = [("A", "B", 0.9), ("B", "C", 0.9), ("A", "C", 0.4)];

        let weighted = scored(&["A", "B", "C"], &edges, &unnormalized());
        assert!((betweenness_of(&weighted, "B") - 1.0).abs() < 1e-12);

        // Under unit costs the direct hop wins and B carries nothing
        let unit = scored(
            &["A", "B", "C"],
            &edges,
            &NetworkConfig {
                edge_cost_policy: EdgeCostPolicy::Unit,
                normalize_betweenness: false,
                ..Default::default()
            },
        );
        assert_eq!(betweenness_of(&unit, "B"), 0.0);
    }

    #[test]
    fn test_equal_shortest_paths_split_credit() {
        // Square A-B-D-C-A with equal weights: two shortest paths A..D,
        // each middle node carries half of the pair's credit.
        let g = scored(
            &["A", "B", "C", "D"],
            &[("A", "B", 0.5), ("A", "C", 0.5), ("B", "D", 0.5), ("C", "D", 0.5)],
            &unnormalized(),
        );
        assert!((betweenness_of(&g, "B") - 0.5).abs() < 1e-9);
        assert!((betweenness_of(&g, "C") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_disconnected_components_no_cross_contribution() {
        // Two separate paths; unreachable pairs contribute nothing
        let g = scored(
            &["A", "B", "C", "X", "Y", "Z"],
            &[("A", "B", 0.8), ("B", "C", 0.8), ("X", "Y", 0.8), ("Y", "Z", 0.8)],
            &unnormalized(),
        );
        assert!((betweenness_of(&g, "B") - 1.0).abs() < 1e-12);
        assert!((betweenness_of(&g, "Y") - 1.0).abs() < 1e-12);
        assert_eq!(betweenness_of(&g, "A"), 0.0);
    }
}
