//! Betweenness centrality via Brandes' accumulation: one single-source
//! shortest-paths pass per node, partial dependencies summed over sources.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};

use network_core::{AnalysisPhase, EdgeCostPolicy, NetworkError};
use rayon::prelude::*;

/// Relative tolerance for treating two path costs as equal.
const COST_EPS: f64 = 1e-9;

/// Betweenness for every node of an undirected graph given its adjacency
/// list. Unreachable pairs contribute nothing. With `normalize`, scores
/// are divided by (V-1)(V-2)/2 so they compare across graph sizes.
pub fn betweenness(
    adjacency: &[Vec<(usize, f64)>],
    policy: EdgeCostPolicy,
    normalize: bool,
) -> Result<Vec<f64>, NetworkError> {
    let n = adjacency.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let costs = edge_costs(adjacency, policy)?;

    // Independent pass per source; collect preserves source order so the
    // reduction below is deterministic.
    let partials: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|s| match policy {
            EdgeCostPolicy::Unit => single_source_bfs(&costs, s),
            EdgeCostPolicy::InverseWeight => single_source_dijkstra(&costs, s),
        })
        .collect();

    let mut scores = vec![0.0; n];
    for partial in partials {
        for (v, contribution) in partial.into_iter().enumerate() {
            scores[v] += contribution;
        }
    }

    // Each unordered (s, t) pair was counted from both endpoints
    for score in scores.iter_mut() {
        *score /= 2.0;
    }

    if normalize && n >= 3 {
        let pairs = ((n - 1) * (n - 2)) as f64 / 2.0;
        for score in scores.iter_mut() {
            *score /= pairs;
        }
    }

    for score in scores.iter_mut() {
        if *score < 0.0 {
            *score = 0.0;
        }
    }
    Ok(scores)
}

/// Translate edge weights into path costs per the configured policy.
fn edge_costs(
    adjacency: &[Vec<(usize, f64)>],
    policy: EdgeCostPolicy,
) -> Result<Vec<Vec<(usize, f64)>>, NetworkError> {
    match policy {
        EdgeCostPolicy::Unit => Ok(adjacency
            .iter()
            .map(|nbrs| nbrs.iter().map(|&(j, _)| (j, 1.0)).collect())
            .collect()),
        EdgeCostPolicy::InverseWeight => {
            let mut out = Vec::with_capacity(adjacency.len());
            for nbrs in adjacency {
                let mut row = Vec::with_capacity(nbrs.len());
                for &(j, w) in nbrs {
                    if !(w.is_finite() && w > 0.0) {
                        return Err(NetworkError::Computation {
                            phase: AnalysisPhase::Scoring,
                            message: format!("edge weight {w} cannot be inverted into a path cost"),
                        });
                    }
                    row.push((j, 1.0 / w));
                }
                out.push(row);
            }
            Ok(out)
        }
    }
}

struct State {
    cost: f64,
    node: usize,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.node == other.node
    }
}

impl Eq for State {}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for State {
    // Reversed so the max-heap pops the cheapest state first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Weighted single-source pass (Dijkstra ordering).
fn single_source_dijkstra(adj: &[Vec<(usize, f64)>], s: usize) -> Vec<f64> {
    let n = adj.len();
    let mut dist = vec![f64::INFINITY; n];
    let mut sigma = vec![0.0; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut settled = vec![false; n];
    let mut order = Vec::with_capacity(n);
    let mut heap = BinaryHeap::new();

    dist[s] = 0.0;
    sigma[s] = 1.0;
    heap.push(State { cost: 0.0, node: s });

    while let Some(State { node: v, .. }) = heap.pop() {
        if settled[v] {
            continue;
        }
        settled[v] = true;
        order.push(v);
        for &(w, cost) in &adj[v] {
            if settled[w] {
                continue;
            }
            let alt = dist[v] + cost;
            let tol = COST_EPS * alt.max(1.0);
            if alt < dist[w] - tol {
                dist[w] = alt;
                sigma[w] = sigma[v];
                preds[w] = vec![v];
                heap.push(State { cost: alt, node: w });
            } else if (alt - dist[w]).abs() <= tol {
                sigma[w] += sigma[v];
                preds[w].push(v);
            }
        }
    }

    accumulate(&order, &preds, &sigma, s)
}

/// Unweighted single-source pass (BFS ordering).
fn single_source_bfs(adj: &[Vec<(usize, f64)>], s: usize) -> Vec<f64> {
    let n = adj.len();
    let mut dist = vec![usize::MAX; n];
    let mut sigma = vec![0.0; n];
    let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut order = Vec::with_capacity(n);
    let mut queue = VecDeque::new();

    dist[s] = 0;
    sigma[s] = 1.0;
    queue.push_back(s);

    while let Some(v) = queue.pop_front() {
        order.push(v);
        for &(w, _) in &adj[v] {
            if dist[w] == usize::MAX {
                dist[w] = dist[v] + 1;
                queue.push_back(w);
            }
            if dist[w] == dist[v] + 1 {
                sigma[w] += sigma[v];
                preds[w].push(v);
            }
        }
    }

    accumulate(&order, &preds, &sigma, s)
}

/// Dependency accumulation over the settled order, back to front.
fn accumulate(order: &[usize], preds: &[Vec<usize>], sigma: &[f64], s: usize) -> Vec<f64> {
    let n = sigma.len();
    let mut delta = vec![0.0; n];
    let mut bc = vec![0.0; n];
    for &w in order.iter().rev() {
        for &v in &preds[w] {
            delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
        }
        if w != s {
            bc[w] += delta[w];
        }
    }
    bc
}
