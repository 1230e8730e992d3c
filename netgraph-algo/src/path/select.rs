//! §4.2.1 Edge-Selection Policies.
//!
//! An edge-selection function maps `(graph, u, v, excluded_edges) -> Option<(cost,
//! edges)>`, `None` meaning no admissible edge exists (infeasible hop). All
//! built-ins consider edges in stable key order so ties resolve deterministically.

use crate::consts::TOLERANCE;
use indexmap::IndexSet;
use netgraph_core::WorkingGraph;
use std::sync::Arc;

/// A user-defined selector: same signature as the built-ins, boxed so
/// [`EdgeSelection`] stays `Clone`.
pub type UserSelectorFn =
    dyn Fn(&WorkingGraph, &str, &str, &IndexSet<String>) -> Option<(f64, Vec<String>)> + Send + Sync;

#[derive(Clone)]
pub enum EdgeSelection {
    /// Among edges u->v not excluded, pick the minimum cost; return that cost and
    /// every edge tied at it.
    AllMinCost,
    /// As `AllMinCost`, but only consider edges with `remaining_capacity > TOLERANCE`.
    AllMinCostWithCapRemaining,
    /// One edge: lowest cost, ties broken by ascending key.
    SingleMinCost,
    /// Caller-supplied selector with the same contract.
    UserDefined(Arc<UserSelectorFn>),
}

impl EdgeSelection {
    pub fn select(
        &self,
        graph: &WorkingGraph,
        u: &str,
        v: &str,
        excluded_edges: &IndexSet<String>,
    ) -> Option<(f64, Vec<String>)> {
        match self {
            EdgeSelection::AllMinCost => all_min_cost(graph, u, v, excluded_edges, false),
            EdgeSelection::AllMinCostWithCapRemaining => all_min_cost(graph, u, v, excluded_edges, true),
            EdgeSelection::SingleMinCost => single_min_cost(graph, u, v, excluded_edges),
            EdgeSelection::UserDefined(f) => f(graph, u, v, excluded_edges),
        }
    }
}

impl std::fmt::Debug for EdgeSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeSelection::AllMinCost => write!(f, "AllMinCost"),
            EdgeSelection::AllMinCostWithCapRemaining => write!(f, "AllMinCostWithCapRemaining"),
            EdgeSelection::SingleMinCost => write!(f, "SingleMinCost"),
            EdgeSelection::UserDefined(_) => write!(f, "UserDefined(..)"),
        }
    }
}

fn candidates(
    graph: &WorkingGraph,
    u: &str,
    v: &str,
    excluded_edges: &IndexSet<String>,
    require_capacity: bool,
) -> Vec<(String, f64)> {
    graph
        .edges_between(u, v)
        .into_iter()
        .filter(|key| !excluded_edges.contains(key))
        .filter_map(|key| {
            let edge = graph.edge(&key)?;
            if require_capacity && edge.remaining_capacity() <= TOLERANCE {
                return None;
            }
            Some((key, edge.cost))
        })
        .collect()
}

fn all_min_cost(
    graph: &WorkingGraph,
    u: &str,
    v: &str,
    excluded_edges: &IndexSet<String>,
    require_capacity: bool,
) -> Option<(f64, Vec<String>)> {
    let candidates = candidates(graph, u, v, excluded_edges, require_capacity);
    if candidates.is_empty() {
        return None;
    }
    let min_cost = candidates
        .iter()
        .map(|(_, cost)| *cost)
        .fold(f64::INFINITY, f64::min);
    let selected: Vec<String> = candidates
        .into_iter()
        .filter(|(_, cost)| (*cost - min_cost).abs() <= TOLERANCE)
        .map(|(key, _)| key)
        .collect();
    Some((min_cost, selected))
}

fn single_min_cost(
    graph: &WorkingGraph,
    u: &str,
    v: &str,
    excluded_edges: &IndexSet<String>,
) -> Option<(f64, Vec<String>)> {
    let (cost, mut edges) = all_min_cost(graph, u, v, excluded_edges, false)?;
    edges.sort();
    edges.truncate(1);
    Some((cost, edges))
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_core::{build_working_graph, ExclusionMask, Link, Network, Node, WorkingGraphOptions};

    fn parallel_edges_network() -> Network {
        let mut net = Network::new();
        net.add_node(Node::new("A")).unwrap();
        net.add_node(Node::new("B")).unwrap();
        let mut cheap = Link::new("cheap", "A", "B", 5.0);
        cheap.cost = 1.0;
        net.add_link(cheap).unwrap();
        let mut also_cheap = Link::new("also_cheap", "A", "B", 5.0);
        also_cheap.cost = 1.0;
        net.add_link(also_cheap).unwrap();
        let mut pricier = Link::new("pricier", "A", "B", 5.0);
        pricier.cost = 2.0;
        net.add_link(pricier).unwrap();
        net
    }

    #[test]
    fn all_min_cost_returns_every_tied_edge() {
        let net = parallel_edges_network();
        let graph = build_working_graph(&net, &ExclusionMask::new(), WorkingGraphOptions::default()).unwrap();
        let (cost, edges) = EdgeSelection::AllMinCost
            .select(&graph, "A", "B", &IndexSet::new())
            .unwrap();
        assert_eq!(cost, 1.0);
        let mut edges = edges;
        edges.sort();
        assert_eq!(edges, vec!["also_cheap".to_string(), "cheap".to_string()]);
    }

    #[test]
    fn single_min_cost_picks_lowest_key_on_tie() {
        let net = parallel_edges_network();
        let graph = build_working_graph(&net, &ExclusionMask::new(), WorkingGraphOptions::default()).unwrap();
        let (cost, edges) = EdgeSelection::SingleMinCost
            .select(&graph, "A", "B", &IndexSet::new())
            .unwrap();
        assert_eq!(cost, 1.0);
        assert_eq!(edges, vec!["also_cheap".to_string()]);
    }

    #[test]
    fn cap_remaining_excludes_saturated_edges() {
        let net = parallel_edges_network();
        let mut graph = build_working_graph(&net, &ExclusionMask::new(), WorkingGraphOptions::default()).unwrap();
        graph.edge_mut("cheap").unwrap().capacity = 0.0;
        graph.edge_mut("also_cheap").unwrap().capacity = 0.0;
        let (cost, edges) = EdgeSelection::AllMinCostWithCapRemaining
            .select(&graph, "A", "B", &IndexSet::new())
            .unwrap();
        assert_eq!(cost, 2.0);
        assert_eq!(edges, vec!["pricier".to_string()]);
    }

    #[test]
    fn no_admissible_edge_is_none() {
        let net = parallel_edges_network();
        let graph = build_working_graph(&net, &ExclusionMask::new(), WorkingGraphOptions::default()).unwrap();
        let excluded: IndexSet<String> = ["cheap".into(), "also_cheap".into(), "pricier".into()]
            .into_iter()
            .collect();
        assert!(EdgeSelection::AllMinCost
            .select(&graph, "A", "B", &excluded)
            .is_none());
    }
}
