use std::collections::{BTreeMap, BTreeSet, HashMap};

use network_core::{Graph, NetworkConfig, NetworkError, SectorAggregation};

/// Collapses an instrument-level graph into a sector-level graph.
///
/// One node per distinct sector; an edge between two sectors carries the
/// mean (or sum) of the instrument edges crossing between their members.
/// Instruments without a sector tag are excluded entirely rather than
/// grouped under a synthetic "unknown" sector, which would skew
/// centrality. Intra-sector edges collapse to self-edges and are dropped.
pub struct SectorAggregator;

impl SectorAggregator {
    pub fn new() -> Self {
        Self
    }

    pub fn aggregate(
        &self,
        graph: &Graph,
        config: &NetworkConfig,
    ) -> Result<Graph, NetworkError> {
        let mut node_sector: HashMap<&str, &str> = HashMap::new();
        let mut sectors: BTreeSet<&str> = BTreeSet::new();
        for node in graph.nodes() {
            if let Some(sector) = node.sector.as_deref() {
                node_sector.insert(node.id.as_str(), sector);
                sectors.insert(sector);
            }
        }
        if sectors.is_empty() {
            return Err(NetworkError::EmptyGraph(
                "no sector-tagged instruments for sector mode".to_string(),
            ));
        }

        let mut sector_graph = Graph::new();
        for sector in &sectors {
            sector_graph.add_node(sector_code(sector), *sector, Some((*sector).to_string()))?;
        }

        struct Rollup {
            weight_sum: f64,
            signed_sum: f64,
            count: usize,
        }

        let mut crossing: BTreeMap<(&str, &str), Rollup> = BTreeMap::new();
        for edge in graph.edges() {
            let (Some(&sa), Some(&sb)) = (
                node_sector.get(edge.a.as_str()),
                node_sector.get(edge.b.as_str()),
            ) else {
                continue;
            };
            if sa == sb {
                continue;
            }
            let key = if sa <= sb { (sa, sb) } else { (sb, sa) };
            let rollup = crossing.entry(key).or_insert(Rollup {
                weight_sum: 0.0,
                signed_sum: 0.0,
                count: 0,
            });
            rollup.weight_sum += edge.weight;
            rollup.signed_sum += edge.signed_strength;
            rollup.count += 1;
        }

        for ((sa, sb), rollup) in &crossing {
            let (weight, signed) = match config.sector_edge_aggregation {
                SectorAggregation::Mean => (
                    rollup.weight_sum / rollup.count as f64,
                    rollup.signed_sum / rollup.count as f64,
                ),
                SectorAggregation::Sum => (rollup.weight_sum, rollup.signed_sum),
            };
            sector_graph.add_edge(&sector_code(sa), &sector_code(sb), weight, signed)?;
        }

        tracing::debug!(
            sectors = sector_graph.node_count(),
            edges = sector_graph.edge_count(),
            "aggregated sector graph"
        );
        Ok(sector_graph)
    }
}

impl Default for SectorAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable identifier for a sector name: uppercased, non-alphanumerics
/// squashed to single underscores.
fn sector_code(name: &str) -> String {
    let mut code = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for c in name.chars() {
        if c.is_alphanumeric() {
            code.extend(c.to_uppercase());
            last_was_sep = false;
        } else if !last_was_sep && !code.is_empty() {
            code.push('_');
            last_was_sep = true;
        }
    }
    while code.ends_with('_') {
        code.pop();
    }
    code
}
