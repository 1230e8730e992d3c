//! §4.2.3 K-Shortest-Path: Yen-like enumeration of loopless src->dst paths in
//! ascending cost, each yielded as a single-chain [`PathBundle`].

use crate::error::AlgoResult;
use crate::path::bundle::{Path, PathBundle, PathStep};
use crate::path::select::EdgeSelection;
use crate::path::spf::spf;
use indexmap::IndexSet;
use netgraph_core::WorkingGraph;
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct KspConfig {
    pub max_k: usize,
    pub max_path_cost: Option<f64>,
    pub max_path_cost_factor: Option<f64>,
}

impl Default for KspConfig {
    fn default() -> Self {
        Self {
            max_k: 1,
            max_path_cost: None,
            max_path_cost_factor: None,
        }
    }
}

fn path_to_bundle(path: &Path) -> PathBundle {
    let mut preds = indexmap::IndexMap::new();
    for window in path.steps.windows(2) {
        let (from, to) = (&window[0], &window[1]);
        let mut entry = indexmap::IndexMap::new();
        entry.insert(from.node.clone(), from.edges.clone());
        preds.insert(to.node.clone(), entry);
    }
    PathBundle {
        src: path.source().unwrap_or_default().to_string(),
        dst: path.destination().unwrap_or_default().to_string(),
        cost: path.cost,
        preds,
    }
}

fn path_prefix_cost(graph: &WorkingGraph, steps: &[PathStep], upto: usize) -> f64 {
    let mut total = 0.0;
    for step in steps.iter().take(upto) {
        if let Some(edge_id) = step.edges.first() {
            if let Some(edge) = graph.edge(edge_id) {
                total += edge.cost;
            }
        }
    }
    total
}

fn exceeds_filters(cost: f64, best_cost: f64, config: &KspConfig) -> bool {
    if let Some(max_cost) = config.max_path_cost {
        if cost > max_cost {
            return true;
        }
    }
    if let Some(factor) = config.max_path_cost_factor {
        if cost > factor * best_cost {
            return true;
        }
    }
    false
}

/// Yields up to `config.max_k` ascending-cost loopless paths from `src` to `dst`.
/// Stops early once the candidate frontier is empty or the next candidate fails
/// the cost filters (all further candidates, being no cheaper, would fail too).
pub fn k_shortest_paths(
    graph: &WorkingGraph,
    src: &str,
    dst: &str,
    selection: &EdgeSelection,
    config: &KspConfig,
) -> AlgoResult<Vec<PathBundle>> {
    let mut accepted: Vec<Path> = Vec::new();
    let mut candidates: Vec<(f64, u64, Path)> = Vec::new();
    let mut seen_signatures: HashSet<Vec<String>> = HashSet::new();
    let mut insertion_seq: u64 = 0;

    let first_tree = spf(graph, src, Some(dst), selection, false, &IndexSet::new(), &IndexSet::new())?;
    let Some(first_bundle) = first_tree.bundle_to(dst) else {
        return Ok(Vec::new());
    };
    let first_path = first_bundle
        .enumerate(false)
        .into_iter()
        .next()
        .expect("reachable bundle yields at least one path");
    accepted.push(first_path);

    let best_cost = accepted[0].cost;
    if exceeds_filters(best_cost, best_cost, config) {
        return Ok(Vec::new());
    }

    while accepted.len() < config.max_k {
        let prev = accepted.last().expect("accepted is non-empty").clone();
        for i in 0..prev.steps.len().saturating_sub(1) {
            let spur_node = prev.steps[i].node.clone();
            let root_nodes: Vec<&str> = prev.steps[..=i].iter().map(|s| s.node.as_str()).collect();
            let root_cost = path_prefix_cost(graph, &prev.steps, i);

            let mut excluded_edges: IndexSet<String> = IndexSet::new();
            for p in &accepted {
                if p.steps.len() > i && p.steps[..=i].iter().map(|s| s.node.as_str()).eq(root_nodes.iter().copied()) {
                    excluded_edges.extend(p.steps[i].edges.iter().cloned());
                }
            }
            let excluded_nodes: IndexSet<String> = prev.steps[..i].iter().map(|s| s.node.clone()).collect();

            let tree = spf(graph, &spur_node, Some(dst), selection, false, &excluded_nodes, &excluded_edges)?;
            let Some(spur_bundle) = tree.bundle_to(dst) else {
                continue;
            };
            let Some(spur_path) = spur_bundle.enumerate(false).into_iter().next() else {
                continue;
            };

            let mut steps: Vec<PathStep> = prev.steps[..i].to_vec();
            steps.extend(spur_path.steps.iter().cloned());
            let total_cost = root_cost + spur_path.cost;
            let candidate = Path { steps, cost: total_cost };

            let signature: Vec<String> = candidate
                .steps
                .iter()
                .flat_map(|s| std::iter::once(s.node.clone()).chain(s.edges.iter().cloned()))
                .collect();
            if seen_signatures.insert(signature) {
                candidates.push((total_cost, insertion_seq, candidate));
                insertion_seq += 1;
            }
        }

        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap().then(a.1.cmp(&b.1)));
        let Some((cost, _, path)) = (if candidates.is_empty() { None } else { Some(candidates.remove(0)) }) else {
            break;
        };
        if exceeds_filters(cost, best_cost, config) {
            break;
        }
        accepted.push(path);
    }

    Ok(accepted.into_iter().map(|p| path_to_bundle(&p)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_core::{build_working_graph, ExclusionMask, Link, Network, Node, WorkingGraphOptions};

    fn two_path_network() -> WorkingGraph {
        let mut net = Network::new();
        for name in ["A", "B", "C", "D"] {
            net.add_node(Node::new(name)).unwrap();
        }
        net.add_link(Link::new("ab", "A", "B", 10.0)).unwrap();
        net.add_link(Link::new("bd", "B", "D", 10.0)).unwrap();
        net.add_link(Link::new("ac", "A", "C", 10.0)).unwrap();
        let mut cd = Link::new("cd", "C", "D", 10.0);
        cd.cost = 5.0;
        net.add_link(cd).unwrap();
        build_working_graph(&net, &ExclusionMask::new(), WorkingGraphOptions::default()).unwrap()
    }

    #[test]
    fn yields_paths_in_ascending_cost() {
        let graph = two_path_network();
        let config = KspConfig {
            max_k: 2,
            ..Default::default()
        };
        let bundles = k_shortest_paths(&graph, "A", "D", &EdgeSelection::AllMinCost, &config).unwrap();
        assert_eq!(bundles.len(), 2);
        assert!(bundles[0].cost <= bundles[1].cost);
    }

    #[test]
    fn respects_max_path_cost_filter() {
        let graph = two_path_network();
        let config = KspConfig {
            max_k: 5,
            max_path_cost: Some(2.5),
            max_path_cost_factor: None,
        };
        let bundles = k_shortest_paths(&graph, "A", "D", &EdgeSelection::AllMinCost, &config).unwrap();
        assert_eq!(bundles.len(), 1);
        assert!(bundles[0].cost <= 2.5);
    }

    #[test]
    fn unreachable_destination_yields_empty() {
        let graph = two_path_network();
        let config = KspConfig::default();
        let bundles = k_shortest_paths(&graph, "D", "A", &EdgeSelection::AllMinCost, &config).unwrap();
        assert!(bundles.is_empty());
    }
}
