use std::collections::HashSet;

use network_core::{Graph, Instrument, NetworkConfig, NetworkError, RelationshipMatrix};

pub mod sector;
pub use sector::SectorAggregator;

#[derive(Debug, Clone)]
struct Candidate {
    a: usize,
    b: usize,
    weight: f64,
    signed: f64,
}

/// Builds the instrument-level graph from a relationship matrix.
///
/// Instruments enter the graph in sorted-symbol order, so the result is
/// independent of the caller's iteration order. An edge survives when its
/// absolute strength meets `min_absolute_strength`; with
/// `max_edges_per_node` set, each node retains its top-K strongest edges
/// and the final edge set is the union of the per-node retained sets (an
/// edge survives if either endpoint kept it).
pub struct GraphBuilder;

impl GraphBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        instruments: &[Instrument],
        matrix: &RelationshipMatrix,
        config: &NetworkConfig,
    ) -> Result<Graph, NetworkError> {
        if instruments.is_empty() {
            return Err(NetworkError::EmptyGraph(
                "zero instruments supplied".to_string(),
            ));
        }

        let mut ordered: Vec<&Instrument> = instruments.iter().collect();
        ordered.sort_by(|x, y| x.symbol.cmp(&y.symbol));
        for pair in ordered.windows(2) {
            if pair[0].symbol == pair[1].symbol {
                return Err(NetworkError::InvalidData(format!(
                    "duplicate instrument symbol '{}'",
                    pair[0].symbol
                )));
            }
        }

        let mut graph = Graph::new();
        for inst in &ordered {
            graph.add_node(&inst.symbol, &inst.label, inst.sector.clone())?;
        }

        let mut candidates = Vec::new();
        for i in 0..ordered.len() {
            for j in (i + 1)..ordered.len() {
                if let Some(strength) = matrix.get(&ordered[i].symbol, &ordered[j].symbol) {
                    if strength.abs() >= config.min_absolute_strength {
                        candidates.push(Candidate {
                            a: i,
                            b: j,
                            weight: strength.abs(),
                            signed: strength,
                        });
                    }
                }
            }
        }

        let retained = match config.max_edges_per_node {
            Some(k) => top_k_union(&ordered, &candidates, k),
            None => (0..candidates.len()).collect(),
        };

        for (idx, cand) in candidates.iter().enumerate() {
            if retained.contains(&idx) {
                graph.add_edge(
                    &ordered[cand.a].symbol,
                    &ordered[cand.b].symbol,
                    cand.weight,
                    cand.signed,
                )?;
            }
        }

        tracing::debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            candidates = candidates.len(),
            "built instrument graph"
        );
        Ok(graph)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-node top-K retention. Ties on weight keep the lexicographically
/// smaller neighbor symbol first.
fn top_k_union(ordered: &[&Instrument], candidates: &[Candidate], k: usize) -> HashSet<usize> {
    let mut incident = vec![Vec::new(); ordered.len()];
    for (idx, cand) in candidates.iter().enumerate() {
        incident[cand.a].push(idx);
        incident[cand.b].push(idx);
    }

    let mut retained = HashSet::new();
    for (node, edge_indices) in incident.iter().enumerate() {
        let mut ranked: Vec<(usize, &str)> = edge_indices
            .iter()
            .map(|&idx| {
                let c = &candidates[idx];
                let other = if c.a == node { c.b } else { c.a };
                (idx, ordered[other].symbol.as_str())
            })
            .collect();
        ranked.sort_by(|&(x, nx), &(y, ny)| {
            candidates[y]
                .weight
                .total_cmp(&candidates[x].weight)
                .then_with(|| nx.cmp(ny))
        });
        retained.extend(ranked.into_iter().take(k).map(|(idx, _)| idx));
    }
    retained
}
