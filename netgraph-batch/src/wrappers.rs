//! §4.8 "convenience wrappers": ready-made analysis closures for the three
//! specialization points the harness contract names — max flow, demand placement,
//! and sensitivity — each building its own working graph from the exclusion set
//! the harness hands it.

use crate::error::BatchResult;
use indexmap::IndexMap;
use netgraph_algo::demand::{place_demands, Demand, DemandPlacementResult, PlacementRounds};
use netgraph_algo::{max_flow, max_supported_demand, sensitivity_analysis, MaxFlowOptions, MsdConfig};
use netgraph_core::{build_working_graph, ExclusionMask, Network, WorkingGraphOptions};

fn exclusions_from(excluded_nodes: &[String], excluded_links: &[String]) -> ExclusionMask {
    ExclusionMask::with_nodes(excluded_nodes.iter().cloned()).merge(&ExclusionMask::with_links(excluded_links.iter().cloned()))
}

/// Max-flow capacity for every `(src, dst)` pair, under one shared exclusion set.
pub fn max_flow_per_pair(
    network: &Network,
    excluded_nodes: &[String],
    excluded_links: &[String],
    pairs: &[(String, String)],
    options: MaxFlowOptions,
) -> BatchResult<IndexMap<(String, String), f64>> {
    let exclusions = exclusions_from(excluded_nodes, excluded_links);
    let mut out = IndexMap::new();
    for (src, dst) in pairs {
        let mut graph = build_working_graph(network, &exclusions, WorkingGraphOptions::default())?;
        let (value, _) = max_flow(&mut graph, src, dst, options)?;
        out.insert((src.clone(), dst.clone()), value);
    }
    Ok(out)
}

/// Placement ratios and per-demand cost distributions for one demand set.
pub fn demand_placement(
    network: &Network,
    excluded_nodes: &[String],
    excluded_links: &[String],
    demands: &[Demand],
    rounds: PlacementRounds,
    reoptimize_after_each_round: bool,
) -> BatchResult<DemandPlacementResult> {
    let exclusions = exclusions_from(excluded_nodes, excluded_links);
    Ok(place_demands(network, &exclusions, demands, rounds, reoptimize_after_each_round)?)
}

/// Per-edge capacity-perturbation impact on max flow between `src` and `dst`.
pub fn sensitivity(
    network: &Network,
    excluded_nodes: &[String],
    excluded_links: &[String],
    src: &str,
    dst: &str,
    delta: f64,
    options: MaxFlowOptions,
) -> BatchResult<IndexMap<String, f64>> {
    let exclusions = exclusions_from(excluded_nodes, excluded_links);
    let graph = build_working_graph(network, &exclusions, WorkingGraphOptions::default())?;
    Ok(sensitivity_analysis(&graph, src, dst, delta, options)?)
}

/// The maximum uniform-scale α at which `demands` fully places (§6.2's "maximum
/// supportable demand" operation).
pub fn max_supportable_demand(
    network: &Network,
    excluded_nodes: &[String],
    excluded_links: &[String],
    demands: &[Demand],
    rounds: PlacementRounds,
    reoptimize_after_each_round: bool,
    config: MsdConfig,
) -> BatchResult<f64> {
    let exclusions = exclusions_from(excluded_nodes, excluded_links);
    Ok(max_supported_demand(network, &exclusions, demands, rounds, reoptimize_after_each_round, config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_core::{Link, Node};

    fn diamond() -> Network {
        let mut net = Network::new();
        for name in ["A", "B", "C", "D"] {
            net.add_node(Node::new(name)).unwrap();
        }
        net.add_link(Link::new("ab", "A", "B", 10.0)).unwrap();
        net.add_link(Link::new("ac", "A", "C", 10.0)).unwrap();
        net.add_link(Link::new("bd", "B", "D", 10.0)).unwrap();
        net.add_link(Link::new("cd", "C", "D", 10.0)).unwrap();
        net
    }

    #[test]
    fn max_flow_per_pair_reports_each_pair() {
        let net = diamond();
        let pairs = vec![("A".to_string(), "D".to_string())];
        let result = max_flow_per_pair(&net, &[], &[], &pairs, MaxFlowOptions::default()).unwrap();
        assert!((result[&("A".to_string(), "D".to_string())] - 20.0).abs() < 1e-6);
    }

    #[test]
    fn sensitivity_reports_saturated_edge_impact() {
        let net = diamond();
        let result = sensitivity(&net, &[], &[], "A", "D", -1.0, MaxFlowOptions::default()).unwrap();
        assert!(result.values().any(|v| *v < 0.0));
    }

    #[test]
    fn max_supportable_demand_finds_diamond_ceiling() {
        let net = diamond();
        let demands = vec![Demand {
            label: "d".into(),
            source_selector: "^A$".into(),
            target_selector: "^D$".into(),
            volume: 1.0,
            priority: 0,
            mode: netgraph_algo::demand::ExpansionMode::Combine,
            group_by: netgraph_algo::demand::GroupBy::Flatten,
            group_attr: None,
            flow_class: 0,
            policy: netgraph_algo::FlowPolicy::ShortestPathsWcmp,
        }];
        let config = netgraph_algo::MsdConfig { resolution: 1e-3, ..netgraph_algo::MsdConfig::default() };
        let alpha = max_supportable_demand(&net, &[], &[], &demands, PlacementRounds::Auto, false, config).unwrap();
        assert!((alpha - 20.0).abs() < 1e-1, "expected alpha near 20.0, got {alpha}");
    }
}
