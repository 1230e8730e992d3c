//! §4.4 Max-Flow Engine: iterative augmentation built on the Path and Capacity
//! engines (not Dinic/Push-Relabel at the top level — each iteration finds one SPF
//! predecessor DAG and drains as much of it as the chosen placement strategy allows).

use crate::capacity::{calculate_flow, place_flow_on_graph, FlowPlacement};
use crate::consts::TOLERANCE;
use crate::error::{AlgoError, AlgoResult};
use crate::path::select::EdgeSelection;
use crate::path::spf::spf;
use indexmap::{IndexMap, IndexSet};
use netgraph_core::{ExclusionMask, FlowIndex, Network, WorkingGraph, WorkingGraphOptions};
use regex::Regex;

/// §4.4 Summary: an optional, richer report alongside the flow value.
#[derive(Debug, Clone)]
pub struct MaxFlowSummary {
    pub total_flow: f64,
    /// augmenting-path cost -> volume placed at that cost
    pub cost_distribution: IndexMap<String, f64>,
    /// edge id -> flow placed on it
    pub edge_flow: IndexMap<String, f64>,
    /// edge id -> residual (capacity - flow)
    pub residual_capacity: IndexMap<String, f64>,
    pub reachable_from_src_in_residual: IndexSet<String>,
    /// saturated edges `(u, v, edge_id)` crossing the min cut
    pub min_cut: Vec<(String, String, String)>,
}

#[derive(Debug, Clone, Copy)]
pub struct MaxFlowOptions {
    pub strategy: FlowPlacement,
    /// Single augmentation instead of true max flow — a documented trap: this
    /// computes one SPF iteration's worth of flow, not the maximum (§9 Open
    /// Questions). Prefer leaving this `false` unless you specifically want that.
    pub shortest_path_only: bool,
    pub with_summary: bool,
}

impl Default for MaxFlowOptions {
    fn default() -> Self {
        Self {
            strategy: FlowPlacement::Proportional,
            shortest_path_only: false,
            with_summary: false,
        }
    }
}

/// Runs max flow from `src` to `dst` directly on `graph`, mutating its edge flows.
/// Returns the total flow placed and, if requested, a [`MaxFlowSummary`].
pub fn max_flow(
    graph: &mut WorkingGraph,
    src: &str,
    dst: &str,
    options: MaxFlowOptions,
) -> AlgoResult<(f64, Option<MaxFlowSummary>)> {
    if !graph.has_node(src) {
        return Err(AlgoError::UnknownSource(src.to_string()));
    }
    if !graph.has_node(dst) {
        return Err(AlgoError::UnknownDestination(dst.to_string()));
    }

    let mut total_flow = 0.0;
    let mut cost_distribution: IndexMap<String, f64> = IndexMap::new();
    let mut flow_id: u64 = 0;

    loop {
        let tree = spf(
            graph,
            src,
            Some(dst),
            &EdgeSelection::AllMinCostWithCapRemaining,
            true,
            &IndexSet::new(),
            &IndexSet::new(),
        )?;
        let Some(bundle) = tree.bundle_to(dst) else {
            break;
        };
        let (feasible, _) = calculate_flow(graph, &bundle, options.strategy)?;
        if feasible <= TOLERANCE {
            break;
        }

        let index = FlowIndex::new(src, dst, 0, flow_id);
        flow_id += 1;
        let outcome = place_flow_on_graph(graph, &bundle, feasible, index, options.strategy)?;
        total_flow += outcome.placed;
        *cost_distribution.entry(format!("{}", bundle.cost)).or_insert(0.0) += outcome.placed;

        if options.shortest_path_only {
            break;
        }
    }

    let summary = if options.with_summary {
        Some(build_summary(graph, src, total_flow, cost_distribution)?)
    } else {
        None
    };

    Ok((total_flow, summary))
}

fn build_summary(
    graph: &WorkingGraph,
    src: &str,
    total_flow: f64,
    cost_distribution: IndexMap<String, f64>,
) -> AlgoResult<MaxFlowSummary> {
    let mut edge_flow = IndexMap::new();
    let mut residual_capacity = IndexMap::new();
    for (id, _, _, edge) in graph.edges() {
        edge_flow.insert(id.to_string(), edge.placed_flow());
        residual_capacity.insert(id.to_string(), edge.remaining_capacity());
    }

    let reachable = reachable_in_residual(graph, src)?;

    let mut min_cut = Vec::new();
    for (id, u, v, edge) in graph.edges() {
        if reachable.contains(u) && !reachable.contains(v) && edge.remaining_capacity() <= TOLERANCE {
            min_cut.push((u.to_string(), v.to_string(), id.to_string()));
        }
    }

    Ok(MaxFlowSummary {
        total_flow,
        cost_distribution,
        edge_flow,
        residual_capacity,
        reachable_from_src_in_residual: reachable,
        min_cut,
    })
}

fn reachable_in_residual(graph: &WorkingGraph, src: &str) -> AlgoResult<IndexSet<String>> {
    let mut reachable = IndexSet::new();
    let mut stack = vec![src.to_string()];
    reachable.insert(src.to_string());
    while let Some(node) = stack.pop() {
        for (_, target, edge) in graph.out_edges(&node)? {
            if edge.remaining_capacity() > TOLERANCE && reachable.insert(target.clone()) {
                stack.push(target);
            }
        }
    }
    Ok(reachable)
}

/// `saturated_edges`: edges with residual capacity at or below tolerance.
pub fn saturated_edges(graph: &WorkingGraph) -> Vec<String> {
    graph
        .edges()
        .filter(|(_, _, _, e)| e.remaining_capacity() <= TOLERANCE)
        .map(|(id, _, _, _)| id.to_string())
        .collect()
}

/// `sensitivity_analysis`: for each saturated edge, perturb its capacity by `delta`
/// (clamped so the result is never negative) and report the resulting change in
/// total flow from a fresh max-flow run on an independent copy of `graph`.
pub fn sensitivity_analysis(
    graph: &WorkingGraph,
    src: &str,
    dst: &str,
    delta: f64,
    options: MaxFlowOptions,
) -> AlgoResult<IndexMap<String, f64>> {
    let mut baseline_graph = graph.copy();
    let (baseline, _) = max_flow(&mut baseline_graph, src, dst, options)?;

    let mut impact = IndexMap::new();
    for edge_id in saturated_edges(graph) {
        let mut perturbed = graph.copy();
        if let Some(edge) = perturbed.edge_mut(&edge_id) {
            edge.capacity = (edge.capacity + delta).max(0.0);
        }
        let (perturbed_flow, _) = max_flow(&mut perturbed, src, dst, options)?;
        impact.insert(edge_id, perturbed_flow - baseline);
    }
    Ok(impact)
}

/// How a set of (source-label, target-label) selections combine into one or more
/// max-flow problems (§4.4 "Group semantics").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMode {
    /// One pseudo-source/pseudo-sink pair spanning every match; solved once.
    Combine,
    /// Every (source-label, target-label) pair solved independently.
    Pairwise,
}

fn regex_match_names<'a>(graph: &'a WorkingGraph, pattern: &str) -> AlgoResult<Vec<&'a str>> {
    let re = Regex::new(pattern).map_err(|e| AlgoError::InvalidSelector(e.to_string()))?;
    let matches: Vec<&str> = graph.node_names().filter(|name| re.is_match(name)).collect();
    if matches.is_empty() {
        return Err(AlgoError::EmptySelection(pattern.to_string()));
    }
    Ok(matches)
}

/// `combine` mode: attach a pseudo-source to every matched source node
/// (zero-cost, unbounded capacity) and a symmetric pseudo-sink, then solve once.
pub fn max_flow_combine(
    network: &Network,
    source_pattern: &str,
    sink_pattern: &str,
    exclusions: &ExclusionMask,
    options: MaxFlowOptions,
) -> AlgoResult<(f64, Option<MaxFlowSummary>)> {
    let mut graph = netgraph_core::build_working_graph(network, exclusions, WorkingGraphOptions::default())
        .map_err(AlgoError::Graph)?;
    let sources = regex_match_names(&graph, source_pattern)?.into_iter().map(String::from).collect::<Vec<_>>();
    let sinks = regex_match_names(&graph, sink_pattern)?.into_iter().map(String::from).collect::<Vec<_>>();

    const PSEUDO_SOURCE: &str = "__pseudo_source__";
    const PSEUDO_SINK: &str = "__pseudo_sink__";
    graph
        .add_node(PSEUDO_SOURCE, netgraph_core::WorkingNode { name: PSEUDO_SOURCE.to_string() })
        .map_err(AlgoError::Graph)?;
    graph
        .add_node(PSEUDO_SINK, netgraph_core::WorkingNode { name: PSEUDO_SINK.to_string() })
        .map_err(AlgoError::Graph)?;
    for source in &sources {
        let edge = netgraph_core::WorkingEdge::new(format!("pseudo_src_{source}"), PSEUDO_SOURCE, source.clone(), f64::INFINITY, 0.0);
        graph.add_edge(PSEUDO_SOURCE, source, Some(format!("pseudo_src_{source}")), edge).map_err(AlgoError::Graph)?;
    }
    for sink in &sinks {
        let edge = netgraph_core::WorkingEdge::new(format!("pseudo_sink_{sink}"), sink.clone(), PSEUDO_SINK, f64::INFINITY, 0.0);
        graph.add_edge(sink, PSEUDO_SINK, Some(format!("pseudo_sink_{sink}")), edge).map_err(AlgoError::Graph)?;
    }

    max_flow(&mut graph, PSEUDO_SOURCE, PSEUDO_SINK, options)
}

/// `pairwise` mode: one independent max-flow solve per `(source, sink)` pair.
pub fn max_flow_pairwise(
    network: &Network,
    source_pattern: &str,
    sink_pattern: &str,
    exclusions: &ExclusionMask,
    options: MaxFlowOptions,
) -> AlgoResult<IndexMap<(String, String), f64>> {
    let graph = netgraph_core::build_working_graph(network, exclusions, WorkingGraphOptions::default())
        .map_err(AlgoError::Graph)?;
    let sources = regex_match_names(&graph, source_pattern)?;
    let sinks = regex_match_names(&graph, sink_pattern)?;

    let mut results = IndexMap::new();
    for &source in &sources {
        for &sink in &sinks {
            if source == sink {
                continue;
            }
            let mut working = graph.copy();
            let (flow, _) = max_flow(&mut working, source, sink, options)?;
            results.insert((source.to_string(), sink.to_string()), flow);
        }
    }
    Ok(results)
}
