//! §4.3 Capacity Engine: feasible flow over a predecessor DAG, and placing/removing
//! that flow on the working graph.

use crate::consts::TOLERANCE;
use crate::error::{AlgoError, AlgoResult};
use crate::path::bundle::PathBundle;
use indexmap::IndexMap;
use netgraph_core::{FlowIndex, WorkingGraph};

/// Which discipline splits flow across equal-cost parallel next hops (§4.3.1, §4.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPlacement {
    /// Dinic-like max flow over the predecessor DAG; splits in proportion to
    /// residual capacity.
    Proportional,
    /// ECMP-style: nominal unit flow split equally at every hop, then scaled to fit
    /// residual capacity.
    EqualBalanced,
}

/// One logical arc of the predecessor DAG, aggregating every tied parallel edge
/// between `from` and `to` into a single capacity for flow computation purposes.
struct LogicalEdge {
    from: String,
    to: String,
    members: Vec<String>,
    capacity: f64,
}

fn logical_edges(graph: &WorkingGraph, bundle: &PathBundle) -> Vec<LogicalEdge> {
    let mut edges = Vec::new();
    for (to, preds) in &bundle.preds {
        for (from, members) in preds {
            let capacity: f64 = members
                .iter()
                .filter_map(|id| graph.edge(id))
                .map(|e| e.remaining_capacity().max(0.0))
                .sum();
            edges.push(LogicalEdge {
                from: from.clone(),
                to: to.clone(),
                members: members.clone(),
                capacity,
            });
        }
    }
    edges
}

/// Computes the max feasible flow over `bundle`'s predecessor DAG and the fraction
/// of total flow carried by each underlying graph edge. Returns `(0.0, {})` if `src`
/// or `dst` is unreachable (an empty bundle).
pub fn calculate_flow(
    graph: &WorkingGraph,
    bundle: &PathBundle,
    strategy: FlowPlacement,
) -> AlgoResult<(f64, IndexMap<String, f64>)> {
    if bundle.src == bundle.dst || bundle.preds.is_empty() {
        return Ok((0.0, IndexMap::new()));
    }
    let logical = logical_edges(graph, bundle);
    if logical.is_empty() {
        return Ok((0.0, IndexMap::new()));
    }

    let (total_flow, logical_flows) = match strategy {
        FlowPlacement::Proportional => dinic_max_flow(&logical, &bundle.src, &bundle.dst),
        FlowPlacement::EqualBalanced => equal_balanced_flow(&logical, &bundle.src, &bundle.dst)?,
    };

    if total_flow <= TOLERANCE {
        return Ok((0.0, IndexMap::new()));
    }

    let mut fractions: IndexMap<String, f64> = IndexMap::new();
    for (edge, &flow) in logical.iter().zip(logical_flows.iter()) {
        if flow <= TOLERANCE {
            continue;
        }
        let member_caps: Vec<f64> = edge
            .members
            .iter()
            .filter_map(|id| graph.edge(id))
            .map(|e| e.remaining_capacity().max(0.0))
            .collect();
        let cap_sum: f64 = member_caps.iter().sum();
        for (member, cap) in edge.members.iter().zip(member_caps.iter()) {
            let share = if cap_sum > TOLERANCE { cap / cap_sum } else { 1.0 / edge.members.len() as f64 };
            let amount = flow * share;
            *fractions.entry(member.clone()).or_insert(0.0) += amount / total_flow;
        }
    }

    Ok((total_flow, fractions))
}

/// One arc in the Dinic residual network: a forward logical edge or its paired
/// zero-capacity reverse arc. `logical_index` names the originating [`LogicalEdge`]
/// for forward arcs only.
struct DinicArc {
    to: usize,
    cap: f64,
    logical_index: Option<usize>,
}

/// Standard Dinic's algorithm restricted to the (small, acyclic) logical DAG.
fn dinic_max_flow(logical: &[LogicalEdge], src: &str, dst: &str) -> (f64, Vec<f64>) {
    let mut index_of: IndexMap<String, usize> = IndexMap::new();
    for edge in logical {
        let next = index_of.len();
        index_of.entry(edge.from.clone()).or_insert(next);
        let next = index_of.len();
        index_of.entry(edge.to.clone()).or_insert(next);
    }
    let n = index_of.len();
    let Some(&s) = index_of.get(src) else {
        return (0.0, vec![0.0; logical.len()]);
    };
    let Some(&t) = index_of.get(dst) else {
        return (0.0, vec![0.0; logical.len()]);
    };

    let mut adj: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut arcs: Vec<DinicArc> = Vec::new();
    for (i, edge) in logical.iter().enumerate() {
        let u = index_of[&edge.from];
        let v = index_of[&edge.to];
        adj[u].push(arcs.len());
        arcs.push(DinicArc {
            to: v,
            cap: edge.capacity,
            logical_index: Some(i),
        });
        adj[v].push(arcs.len());
        arcs.push(DinicArc {
            to: u,
            cap: 0.0,
            logical_index: None,
        });
    }

    loop {
        let mut level = vec![-1i32; n];
        level[s] = 0;
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(s);
        while let Some(u) = queue.pop_front() {
            for &arc_idx in &adj[u] {
                let arc = &arcs[arc_idx];
                if arc.cap > TOLERANCE && level[arc.to] < 0 {
                    level[arc.to] = level[u] + 1;
                    queue.push_back(arc.to);
                }
            }
        }
        if level[t] < 0 {
            break;
        }

        let mut it = vec![0usize; n];
        loop {
            let pushed = dfs_blocking_flow(s, t, f64::INFINITY, &mut adj, &mut arcs, &level, &mut it);
            if pushed <= TOLERANCE {
                break;
            }
        }
    }

    let mut total = 0.0;
    for &arc_idx in &adj[s] {
        if let Some(li) = arcs[arc_idx].logical_index {
            total += logical[li].capacity - arcs[arc_idx].cap;
        }
    }
    let mut flows = vec![0.0; logical.len()];
    for arc in &arcs {
        if let Some(li) = arc.logical_index {
            flows[li] = (logical[li].capacity - arc.cap).max(0.0);
        }
    }
    (total, flows)
}

fn dfs_blocking_flow(
    u: usize,
    t: usize,
    pushed_in: f64,
    adj: &mut [Vec<usize>],
    arcs: &mut [DinicArc],
    level: &[i32],
    it: &mut [usize],
) -> f64 {
    if u == t {
        return pushed_in;
    }
    while it[u] < adj[u].len() {
        let arc_idx = adj[u][it[u]];
        let (to, cap) = (arcs[arc_idx].to, arcs[arc_idx].cap);
        if cap > TOLERANCE && level[to] == level[u] + 1 {
            let bottleneck = pushed_in.min(cap);
            let pushed = dfs_blocking_flow(to, t, bottleneck, adj, arcs, level, it);
            if pushed > TOLERANCE {
                arcs[arc_idx].cap -= pushed;
                let rev_idx = arc_idx ^ 1;
                arcs[rev_idx].cap += pushed;
                return pushed;
            }
        }
        it[u] += 1;
    }
    0.0
}

/// ECMP-style equal split: propagate a nominal unit flow from `src`, splitting
/// equally across each node's out-edges in topological order, then scale to the
/// tightest residual capacity.
fn equal_balanced_flow(logical: &[LogicalEdge], src: &str, dst: &str) -> AlgoResult<(f64, Vec<f64>)> {
    let mut out_adj: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (i, edge) in logical.iter().enumerate() {
        out_adj.entry(edge.from.clone()).or_default().push(i);
    }

    let order = topological_order(logical, src)?;

    let mut nominal_in: IndexMap<String, f64> = IndexMap::new();
    nominal_in.insert(src.to_string(), 1.0);
    let mut nominal_edge: Vec<f64> = vec![0.0; logical.len()];

    for node in &order {
        let inflow = *nominal_in.get(node).unwrap_or(&0.0);
        if inflow <= 0.0 {
            continue;
        }
        if let Some(out_edges) = out_adj.get(node) {
            if !out_edges.is_empty() {
                let share = inflow / out_edges.len() as f64;
                for &i in out_edges {
                    nominal_edge[i] += share;
                    *nominal_in.entry(logical[i].to.clone()).or_insert(0.0) += share;
                }
            }
        }
    }

    let received_at_dst = *nominal_in.get(dst).unwrap_or(&0.0);
    if received_at_dst <= TOLERANCE {
        return Ok((0.0, vec![0.0; logical.len()]));
    }

    let mut scale = f64::INFINITY;
    for (edge, &nominal) in logical.iter().zip(nominal_edge.iter()) {
        if nominal > TOLERANCE {
            scale = scale.min(edge.capacity / nominal);
        }
    }
    if !scale.is_finite() || scale < 0.0 {
        scale = 0.0;
    }

    let total_flow = scale * received_at_dst;
    let flows: Vec<f64> = nominal_edge.iter().map(|n| n * scale).collect();
    Ok((total_flow, flows))
}

fn topological_order(logical: &[LogicalEdge], src: &str) -> AlgoResult<Vec<String>> {
    let mut out_adj: IndexMap<String, Vec<String>> = IndexMap::new();
    for edge in logical {
        out_adj.entry(edge.from.clone()).or_default().push(edge.to.clone());
        out_adj.entry(edge.to.clone()).or_default();
    }
    out_adj.entry(src.to_string()).or_default();

    let mut order = Vec::new();
    let mut visiting: IndexMap<String, bool> = IndexMap::new();

    fn visit(
        node: &str,
        out_adj: &IndexMap<String, Vec<String>>,
        visiting: &mut IndexMap<String, bool>,
        order: &mut Vec<String>,
    ) -> AlgoResult<()> {
        match visiting.get(node) {
            Some(true) => return Ok(()),
            Some(false) => {
                return Err(AlgoError::UnsupportedStrategy(format!(
                    "cycle detected in predecessor DAG at '{node}'"
                )))
            }
            None => {}
        }
        visiting.insert(node.to_string(), false);
        if let Some(successors) = out_adj.get(node) {
            for next in successors {
                visit(next, out_adj, visiting, order)?;
            }
        }
        visiting.insert(node.to_string(), true);
        order.push(node.to_string());
        Ok(())
    }

    for node in out_adj.keys().cloned().collect::<Vec<_>>() {
        visit(&node, &out_adj, &mut visiting, &mut order)?;
    }
    order.reverse();
    Ok(order)
}

/// Result of [`place_flow_on_graph`].
#[derive(Debug, Clone)]
pub struct PlacementOutcome {
    pub placed: f64,
    pub remaining: f64,
    pub touched_nodes: usize,
    pub touched_edges: usize,
}

/// §4.3.3: computes the max placeable amount (clamped to `amount`), applies it to
/// `graph`'s edges under `flow_index`, and reports what happened.
pub fn place_flow_on_graph(
    graph: &mut WorkingGraph,
    bundle: &PathBundle,
    amount: f64,
    flow_index: FlowIndex,
    strategy: FlowPlacement,
) -> AlgoResult<PlacementOutcome> {
    let (feasible, fractions) = calculate_flow(graph, bundle, strategy)?;
    let placed = feasible.min(amount).max(0.0);
    let remaining = (amount - placed).max(0.0);

    if placed <= TOLERANCE {
        return Ok(PlacementOutcome {
            placed: 0.0,
            remaining: amount,
            touched_nodes: 0,
            touched_edges: 0,
        });
    }

    let mut touched_nodes = std::collections::HashSet::new();
    for (edge_id, fraction) in &fractions {
        let volume = fraction * placed;
        if volume <= 0.0 {
            continue;
        }
        if let Some(edge) = graph.edge_mut(edge_id) {
            edge.place_flow(flow_index.clone(), volume);
            touched_nodes.insert(edge.source.clone());
            touched_nodes.insert(edge.target.clone());
        }
    }

    Ok(PlacementOutcome {
        placed,
        remaining,
        touched_nodes: touched_nodes.len(),
        touched_edges: fractions.len(),
    })
}

/// §4.3.3 `remove_flow_from_graph`: removes one flow's contribution from every edge
/// it touched, or (when `flow_index` is `None`) zeroes every flow on every edge.
pub fn remove_flow_from_graph(graph: &mut WorkingGraph, flow_index: Option<&FlowIndex>) {
    let edge_ids: Vec<String> = graph.edges().map(|(id, _, _, _)| id.to_string()).collect();
    for id in edge_ids {
        let edge = graph.edge_mut(&id).expect("id came from graph.edges()");
        match flow_index {
            Some(index) => {
                if let Some(&volume) = edge.flows.get(index) {
                    edge.remove_flow(index, volume);
                }
            }
            None => edge.clear_flows(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_core::{build_working_graph, ExclusionMask, Link, Network, Node, WorkingGraphOptions};

    fn diamond() -> WorkingGraph {
        let mut net = Network::new();
        for name in ["A", "B", "C", "D"] {
            net.add_node(Node::new(name)).unwrap();
        }
        net.add_link(Link::new("ab", "A", "B", 10.0)).unwrap();
        net.add_link(Link::new("ac", "A", "C", 10.0)).unwrap();
        net.add_link(Link::new("bd", "B", "D", 5.0)).unwrap();
        net.add_link(Link::new("cd", "C", "D", 5.0)).unwrap();
        build_working_graph(&net, &ExclusionMask::new(), WorkingGraphOptions::default()).unwrap()
    }

    fn diamond_bundle() -> PathBundle {
        let mut preds = IndexMap::new();
        let mut d_preds = IndexMap::new();
        d_preds.insert("B".to_string(), vec!["bd".to_string()]);
        d_preds.insert("C".to_string(), vec!["cd".to_string()]);
        preds.insert("D".to_string(), d_preds);
        let mut b_preds = IndexMap::new();
        b_preds.insert("A".to_string(), vec!["ab".to_string()]);
        preds.insert("B".to_string(), b_preds);
        let mut c_preds = IndexMap::new();
        c_preds.insert("A".to_string(), vec!["ac".to_string()]);
        preds.insert("C".to_string(), c_preds);
        PathBundle {
            src: "A".to_string(),
            dst: "D".to_string(),
            cost: 2.0,
            preds,
        }
    }

    #[test]
    fn diamond_proportional_flow_is_ten() {
        let graph = diamond();
        let bundle = diamond_bundle();
        let (total, _fractions) = calculate_flow(&graph, &bundle, FlowPlacement::Proportional).unwrap();
        assert!((total - 10.0).abs() < 1e-9);
    }

    #[test]
    fn diamond_equal_balanced_flow_is_ten() {
        let graph = diamond();
        let bundle = diamond_bundle();
        let (total, _fractions) = calculate_flow(&graph, &bundle, FlowPlacement::EqualBalanced).unwrap();
        assert!((total - 10.0).abs() < 1e-9);
    }

    #[test]
    fn place_and_remove_round_trips() {
        let mut graph = diamond();
        let bundle = diamond_bundle();
        let index = FlowIndex::new("A", "D", 0, 0);
        let outcome = place_flow_on_graph(&mut graph, &bundle, 10.0, index.clone(), FlowPlacement::Proportional).unwrap();
        assert!((outcome.placed - 10.0).abs() < 1e-9);
        assert_eq!(outcome.remaining, 0.0);
        assert!(graph.edge("bd").unwrap().placed_flow() > 0.0);

        remove_flow_from_graph(&mut graph, Some(&index));
        assert!(graph.edge("bd").unwrap().placed_flow().abs() < 1e-9);
        assert!(graph.edge("cd").unwrap().placed_flow().abs() < 1e-9);
    }

    #[test]
    fn unreachable_bundle_is_zero_flow() {
        let graph = diamond();
        let empty = PathBundle {
            src: "A".to_string(),
            dst: "D".to_string(),
            cost: 0.0,
            preds: IndexMap::new(),
        };
        let (total, fractions) = calculate_flow(&graph, &empty, FlowPlacement::Proportional).unwrap();
        assert_eq!(total, 0.0);
        assert!(fractions.is_empty());
    }
}
