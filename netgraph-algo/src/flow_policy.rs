//! §4.5 Flow Policy: named presets binding a path algorithm, edge-selection policy,
//! flow-placement strategy, and multi-flow ("LSP-like") fan-out together, so the
//! Demand Manager can place a demand by policy name instead of wiring the path and
//! capacity engines by hand each time.

use crate::capacity::{place_flow_on_graph, remove_flow_from_graph, FlowPlacement, PlacementOutcome};
use crate::consts::TOLERANCE;
use crate::error::AlgoResult;
use crate::path::select::EdgeSelection;
use crate::path::spf::spf;
use crate::path::{k_shortest_paths, KspConfig};
use indexmap::IndexSet;
use netgraph_core::{FlowIndex, WorkingGraph};
use serde::{Deserialize, Serialize};

/// The five built-in presets from §4.5's policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowPolicy {
    /// Shortest paths, equal split across every tied lowest-cost edge.
    ShortestPathsEcmp,
    /// Shortest paths, split weighted by residual capacity rather than equally.
    ShortestPathsWcmp,
    /// Traffic engineering: unlimited unequal-cost multipath, one flow per distinct
    /// path found, no cap on path count.
    TeUcmpUnlim,
    /// Traffic engineering: equal-cost multipath fan-out capped at 256 LSPs.
    TeEcmpUpTo256Lsp,
    /// Traffic engineering: equal-cost multipath fan-out capped at 16 LSPs.
    TeEcmp16Lsp,
}

/// Resolved parameters for a [`FlowPolicy`] (§4.5 table), computed once per policy
/// rather than matched on every call.
#[derive(Debug, Clone)]
pub struct FlowPolicyConfig {
    pub selection: EdgeSelection,
    pub placement: FlowPlacement,
    pub max_flow_count: usize,
    /// `true` picks one shortest path per flow via SPF/KSP; `false` reserved for
    /// future non-shortest-path policies (none currently defined).
    pub use_shortest_paths: bool,
}

impl FlowPolicy {
    pub fn config(self) -> FlowPolicyConfig {
        match self {
            FlowPolicy::ShortestPathsEcmp => FlowPolicyConfig {
                selection: EdgeSelection::AllMinCost,
                placement: FlowPlacement::EqualBalanced,
                max_flow_count: 1,
                use_shortest_paths: true,
            },
            FlowPolicy::ShortestPathsWcmp => FlowPolicyConfig {
                selection: EdgeSelection::AllMinCost,
                placement: FlowPlacement::Proportional,
                max_flow_count: 1,
                use_shortest_paths: true,
            },
            FlowPolicy::TeUcmpUnlim => FlowPolicyConfig {
                selection: EdgeSelection::AllMinCostWithCapRemaining,
                placement: FlowPlacement::Proportional,
                max_flow_count: usize::MAX,
                use_shortest_paths: true,
            },
            FlowPolicy::TeEcmpUpTo256Lsp => FlowPolicyConfig {
                selection: EdgeSelection::AllMinCostWithCapRemaining,
                placement: FlowPlacement::EqualBalanced,
                max_flow_count: 256,
                use_shortest_paths: true,
            },
            FlowPolicy::TeEcmp16Lsp => FlowPolicyConfig {
                selection: EdgeSelection::AllMinCostWithCapRemaining,
                placement: FlowPlacement::EqualBalanced,
                max_flow_count: 16,
                use_shortest_paths: true,
            },
        }
    }
}

/// One flow actually placed by [`place_demand`]: its identity and the volume it
/// carries, so the caller can later `rebalance_demand`/`remove_demand` precisely.
#[derive(Debug, Clone)]
pub struct PlacedFlow {
    pub index: FlowIndex,
    pub volume: f64,
    /// Cost of the path bundle this flow was placed on, for cost-distribution
    /// reporting upstream (demand placement, max-flow summaries).
    pub cost: f64,
}

/// Places up to `volume` of traffic from `src` to `dst` under `policy`, splitting
/// across as many distinct shortest-path bundles as the policy's `max_flow_count`
/// allows. Returns the flows actually placed (possibly less than `volume` if the
/// network can't carry it) and the total volume placed.
pub fn place_demand(
    graph: &mut WorkingGraph,
    src: &str,
    dst: &str,
    volume: f64,
    flow_class: i64,
    policy: FlowPolicy,
) -> AlgoResult<(Vec<PlacedFlow>, f64)> {
    let config = policy.config();
    let mut placed_flows = Vec::new();
    let mut remaining = volume;
    let mut next_id: u64 = 0;

    let bundles = if config.max_flow_count == 1 {
        let tree = spf(graph, src, Some(dst), &config.selection, false, &IndexSet::new(), &IndexSet::new())?;
        tree.bundle_to(dst).into_iter().collect::<Vec<_>>()
    } else {
        let ksp_config = KspConfig {
            max_k: config.max_flow_count,
            max_path_cost: None,
            max_path_cost_factor: None,
        };
        k_shortest_paths(graph, src, dst, &config.selection, &ksp_config)?
    };

    if bundles.is_empty() {
        return Ok((placed_flows, 0.0));
    }

    let share = remaining / bundles.len() as f64;
    for bundle in &bundles {
        if remaining <= TOLERANCE {
            break;
        }
        let amount = share.min(remaining);
        let index = FlowIndex::new(src, dst, flow_class, next_id);
        next_id += 1;
        let outcome: PlacementOutcome = place_flow_on_graph(graph, bundle, amount, index.clone(), config.placement)?;
        if outcome.placed > TOLERANCE {
            remaining -= outcome.placed;
            placed_flows.push(PlacedFlow {
                index,
                volume: outcome.placed,
                cost: bundle.cost,
            });
        }
    }

    let total_placed = volume - remaining;
    Ok((placed_flows, total_placed))
}

/// Removes every flow in `flows` from `graph`, then re-places the same aggregate
/// volume under `policy` — used when topology or exclusions change mid-scenario.
pub fn rebalance_demand(
    graph: &mut WorkingGraph,
    src: &str,
    dst: &str,
    flow_class: i64,
    flows: &[PlacedFlow],
    policy: FlowPolicy,
) -> AlgoResult<(Vec<PlacedFlow>, f64)> {
    let total_volume: f64 = flows.iter().map(|f| f.volume).sum();
    for flow in flows {
        remove_flow_from_graph(graph, Some(&flow.index));
    }
    place_demand(graph, src, dst, total_volume, flow_class, policy)
}

/// Removes every flow in `flows` from `graph` without re-placing anything.
pub fn remove_demand(graph: &mut WorkingGraph, flows: &[PlacedFlow]) {
    for flow in flows {
        remove_flow_from_graph(graph, Some(&flow.index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_core::{build_working_graph, ExclusionMask, Link, Network, Node, WorkingGraphOptions};

    fn parallel_network() -> WorkingGraph {
        let mut net = Network::new();
        for name in ["A", "B"] {
            net.add_node(Node::new(name)).unwrap();
        }
        net.add_link(Link::new("e1", "A", "B", 5.0)).unwrap();
        net.add_link(Link::new("e2", "A", "B", 5.0)).unwrap();
        build_working_graph(&net, &ExclusionMask::new(), WorkingGraphOptions::default()).unwrap()
    }

    #[test]
    fn shortest_paths_ecmp_splits_across_tied_edges() {
        let mut graph = parallel_network();
        let (flows, placed) = place_demand(&mut graph, "A", "B", 8.0, 0, FlowPolicy::ShortestPathsEcmp).unwrap();
        assert!((placed - 8.0).abs() < 1e-6);
        assert_eq!(flows.len(), 1);
    }

    #[test]
    fn te_ecmp_16_lsp_caps_fanout() {
        let config = FlowPolicy::TeEcmp16Lsp.config();
        assert_eq!(config.max_flow_count, 16);
    }

    #[test]
    fn remove_demand_clears_placed_flows() {
        let mut graph = parallel_network();
        let (flows, _) = place_demand(&mut graph, "A", "B", 8.0, 0, FlowPolicy::ShortestPathsWcmp).unwrap();
        remove_demand(&mut graph, &flows);
        assert!(graph.edge("e1").unwrap().placed_flow().abs() < 1e-9);
        assert!(graph.edge("e2").unwrap().placed_flow().abs() < 1e-9);
    }

    #[test]
    fn unreachable_demand_places_nothing() {
        let mut net = Network::new();
        net.add_node(Node::new("A")).unwrap();
        net.add_node(Node::new("B")).unwrap();
        let mut graph = build_working_graph(&net, &ExclusionMask::new(), WorkingGraphOptions::default()).unwrap();
        let (flows, placed) = place_demand(&mut graph, "A", "B", 5.0, 0, FlowPolicy::ShortestPathsEcmp).unwrap();
        assert!(flows.is_empty());
        assert_eq!(placed, 0.0);
    }
}
