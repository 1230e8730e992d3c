//! §4.6 Demand Manager: expands user-level demands (regex/selector source and
//! target groups, `combine`/`pairwise` fan-out, optional result grouping) into
//! concrete point-to-point demands, then places them priority-first with a
//! bounded round-robin procedure.

use crate::consts::TOLERANCE;
use crate::error::{AlgoError, AlgoResult};
use crate::flow_policy::{place_demand, rebalance_demand, FlowPolicy, PlacedFlow};
use indexmap::IndexMap;
use netgraph_core::{build_working_graph, ExclusionMask, Network, WorkingEdge, WorkingGraph, WorkingGraphOptions, WorkingNode};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// How a user-level demand's source/target selectors turn into concrete flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpansionMode {
    /// One pseudo-source spanning every matched source, one pseudo-sink spanning
    /// every matched target; one concrete demand at the full requested volume.
    Combine,
    /// Every `(source, target)` pair (excluding self-pairs), volume split evenly.
    Pairwise,
}

/// How matched nodes bucket into groups (via `group_attr`) before expansion, and
/// how those groups turn into concrete demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupBy {
    /// Ignore grouping; behaves exactly like `ExpansionMode` alone.
    Flatten,
    /// One demand per distinct source group, aimed at the full (ungrouped) target
    /// selection; requested volume split evenly across groups.
    PerGroup,
    /// Cartesian product of distinct source groups against distinct target groups
    /// (excluding a group paired with itself); requested volume split evenly
    /// across pairs.
    GroupPairwise,
}

/// One user-level demand, as authored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Demand {
    pub label: String,
    pub source_selector: String,
    pub target_selector: String,
    pub volume: f64,
    pub priority: i64,
    pub mode: ExpansionMode,
    pub group_by: GroupBy,
    /// Attribute name used to bucket matched nodes into groups. Required
    /// (ignored otherwise) when `group_by` is not [`GroupBy::Flatten`].
    #[serde(default)]
    pub group_attr: Option<String>,
    pub flow_class: i64,
    pub policy: FlowPolicy,
}

/// One concrete src/dst demand produced by expansion, tracing back to the
/// user-level demand that spawned it.
struct ExpandedDemand {
    label: String,
    src: String,
    dst: String,
    volume: f64,
    priority: i64,
    flow_class: i64,
    policy: FlowPolicy,
}

/// Outcome of placing one concrete expanded demand.
#[derive(Debug, Clone)]
pub struct DemandResult {
    pub label: String,
    pub priority: i64,
    pub requested: f64,
    pub placed: f64,
    pub dropped: f64,
    /// path-bundle cost (as string) -> volume placed at that cost.
    pub cost_distribution: IndexMap<String, f64>,
}

#[derive(Debug, Clone)]
pub struct DemandPlacementResult {
    pub demands: Vec<DemandResult>,
    pub total_requested: f64,
    pub total_placed: f64,
}

/// How many placement passes to run per priority class (§4.6 step 2-3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum PlacementRounds {
    Fixed(usize),
    /// At most 3 passes, stopping early once a pass's incremental placement falls
    /// below 1% of the class's total requested volume (diminishing returns).
    Auto,
}

fn matching_names(graph: &WorkingGraph, pattern: &str) -> AlgoResult<Vec<String>> {
    let re = Regex::new(pattern).map_err(|e| AlgoError::InvalidSelector(e.to_string()))?;
    let names: Vec<String> = graph.node_names().filter(|n| re.is_match(n)).map(String::from).collect();
    if names.is_empty() {
        return Err(AlgoError::EmptySelection(pattern.to_string()));
    }
    Ok(names)
}

fn group_of(network: &Network, node_name: &str, group_attr: &str) -> String {
    network
        .node(node_name)
        .and_then(|n| n.attrs.get(group_attr))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_default()
}

fn bucket_by_group(network: &Network, names: &[String], group_attr: &str) -> IndexMap<String, Vec<String>> {
    let mut groups: IndexMap<String, Vec<String>> = IndexMap::new();
    for name in names {
        groups.entry(group_of(network, name, group_attr)).or_default().push(name.clone());
    }
    groups
}

/// Attaches a zero-cost, unbounded pseudo-source feeding every node in `members`,
/// returning the pseudo node's name.
fn attach_pseudo_source(graph: &mut WorkingGraph, members: &[String], tag: &str) -> AlgoResult<String> {
    let pseudo = format!("__pseudo_src_{tag}__");
    graph
        .add_node(pseudo.clone(), WorkingNode { name: pseudo.clone() })
        .map_err(AlgoError::Graph)?;
    for member in members {
        let id = format!("__pseudo_src_edge_{tag}_{member}__");
        let edge = WorkingEdge::new(id.clone(), pseudo.clone(), member.clone(), f64::INFINITY, 0.0);
        graph.add_edge(&pseudo, member, Some(id), edge).map_err(AlgoError::Graph)?;
    }
    Ok(pseudo)
}

fn attach_pseudo_sink(graph: &mut WorkingGraph, members: &[String], tag: &str) -> AlgoResult<String> {
    let pseudo = format!("__pseudo_sink_{tag}__");
    graph
        .add_node(pseudo.clone(), WorkingNode { name: pseudo.clone() })
        .map_err(AlgoError::Graph)?;
    for member in members {
        let id = format!("__pseudo_sink_edge_{tag}_{member}__");
        let edge = WorkingEdge::new(id.clone(), member.clone(), pseudo.clone(), f64::INFINITY, 0.0);
        graph.add_edge(member, &pseudo, Some(id), edge).map_err(AlgoError::Graph)?;
    }
    Ok(pseudo)
}

fn expand_one(graph: &mut WorkingGraph, network: &Network, demand: &Demand, index: usize) -> AlgoResult<Vec<ExpandedDemand>> {
    let sources = matching_names(graph, &demand.source_selector)?;
    let targets = matching_names(graph, &demand.target_selector)?;

    let grouping_active = demand.group_attr.is_some() && demand.group_by != GroupBy::Flatten;

    if !grouping_active {
        return match demand.mode {
            ExpansionMode::Combine => {
                let src = attach_pseudo_source(graph, &sources, &format!("d{index}"))?;
                let dst = attach_pseudo_sink(graph, &targets, &format!("d{index}"))?;
                Ok(vec![ExpandedDemand {
                    label: demand.label.clone(),
                    src,
                    dst,
                    volume: demand.volume,
                    priority: demand.priority,
                    flow_class: demand.flow_class,
                    policy: demand.policy,
                }])
            }
            ExpansionMode::Pairwise => {
                let pairs: Vec<(&String, &String)> = sources
                    .iter()
                    .flat_map(|s| targets.iter().map(move |t| (s, t)))
                    .filter(|(s, t)| s != t)
                    .collect();
                if pairs.is_empty() {
                    return Ok(Vec::new());
                }
                let per_pair = demand.volume / pairs.len() as f64;
                Ok(pairs
                    .into_iter()
                    .enumerate()
                    .map(|(i, (s, t))| ExpandedDemand {
                        label: format!("{}[{i}]", demand.label),
                        src: s.clone(),
                        dst: t.clone(),
                        volume: per_pair,
                        priority: demand.priority,
                        flow_class: demand.flow_class,
                        policy: demand.policy,
                    })
                    .collect())
            }
        };
    }

    match demand.group_by {
        GroupBy::Flatten => unreachable!("flatten handled above"),
        GroupBy::PerGroup => {
            let group_attr = demand.group_attr.as_deref().unwrap_or_default();
            let source_groups = bucket_by_group(network, &sources, group_attr);
            let dst = attach_pseudo_sink(graph, &targets, &format!("d{index}"))?;
            let per_group = demand.volume / source_groups.len().max(1) as f64;
            let mut out = Vec::new();
            for (i, (group, members)) in source_groups.iter().enumerate() {
                let src = attach_pseudo_source(graph, members, &format!("d{index}_g{i}"))?;
                out.push(ExpandedDemand {
                    label: format!("{}[{group}]", demand.label),
                    src,
                    dst: dst.clone(),
                    volume: per_group,
                    priority: demand.priority,
                    flow_class: demand.flow_class,
                    policy: demand.policy,
                });
            }
            Ok(out)
        }
        GroupBy::GroupPairwise => {
            let group_attr = demand.group_attr.as_deref().unwrap_or_default();
            let source_groups = bucket_by_group(network, &sources, group_attr);
            let target_groups = bucket_by_group(network, &targets, group_attr);
            let mut group_pairs: Vec<(&String, &Vec<String>, &String, &Vec<String>)> = Vec::new();
            for (sg, smembers) in &source_groups {
                for (tg, tmembers) in &target_groups {
                    if sg != tg {
                        group_pairs.push((sg, smembers, tg, tmembers));
                    }
                }
            }
            if group_pairs.is_empty() {
                return Ok(Vec::new());
            }
            let per_pair = demand.volume / group_pairs.len() as f64;
            let mut out = Vec::new();
            for (i, (sg, smembers, tg, tmembers)) in group_pairs.into_iter().enumerate() {
                let src = attach_pseudo_source(graph, smembers, &format!("d{index}_p{i}s"))?;
                let dst = attach_pseudo_sink(graph, tmembers, &format!("d{index}_p{i}t"))?;
                out.push(ExpandedDemand {
                    label: format!("{}[{sg}->{tg}]", demand.label),
                    src,
                    dst,
                    volume: per_pair,
                    priority: demand.priority,
                    flow_class: demand.flow_class,
                    policy: demand.policy,
                });
            }
            Ok(out)
        }
    }
}

/// §4.6 full contract: expand every [`Demand`], sort by ascending priority (lower
/// value = higher priority), and place priority classes in order, each over up to
/// `rounds` round-robin passes.
pub fn place_demands(
    network: &Network,
    exclusions: &ExclusionMask,
    demands: &[Demand],
    rounds: PlacementRounds,
    reoptimize_after_each_round: bool,
) -> AlgoResult<DemandPlacementResult> {
    let mut graph = build_working_graph(network, exclusions, WorkingGraphOptions::default()).map_err(AlgoError::Graph)?;

    let mut expanded = Vec::new();
    for (index, demand) in demands.iter().enumerate() {
        expanded.extend(expand_one(&mut graph, network, demand, index)?);
    }
    expanded.sort_by_key(|d| d.priority);

    let mut placed_volume: Vec<f64> = vec![0.0; expanded.len()];
    let mut flows: Vec<Vec<PlacedFlow>> = vec![Vec::new(); expanded.len()];

    let mut start = 0;
    while start < expanded.len() {
        let mut end = start;
        while end < expanded.len() && expanded[end].priority == expanded[start].priority {
            end += 1;
        }
        place_priority_class(&mut graph, &expanded, start..end, rounds, reoptimize_after_each_round, &mut placed_volume, &mut flows)?;
        start = end;
    }

    let mut results = Vec::new();
    let mut total_requested = 0.0;
    let mut total_placed = 0.0;
    for (i, demand) in expanded.iter().enumerate() {
        total_requested += demand.volume;
        total_placed += placed_volume[i];
        let mut cost_distribution: IndexMap<String, f64> = IndexMap::new();
        for flow in &flows[i] {
            *cost_distribution.entry(format!("{}", flow.cost)).or_insert(0.0) += flow.volume;
        }
        results.push(DemandResult {
            label: demand.label.clone(),
            priority: demand.priority,
            requested: demand.volume,
            placed: placed_volume[i],
            dropped: (demand.volume - placed_volume[i]).max(0.0),
            cost_distribution,
        });
    }

    Ok(DemandPlacementResult {
        demands: results,
        total_requested,
        total_placed,
    })
}

fn place_priority_class(
    graph: &mut WorkingGraph,
    expanded: &[ExpandedDemand],
    class: std::ops::Range<usize>,
    rounds: PlacementRounds,
    reoptimize_after_each_round: bool,
    placed_volume: &mut [f64],
    flows: &mut [Vec<PlacedFlow>],
) -> AlgoResult<()> {
    let max_rounds = match rounds {
        PlacementRounds::Fixed(n) => n.max(1),
        PlacementRounds::Auto => 3,
    };
    let class_total: f64 = expanded[class.clone()].iter().map(|d| d.volume).sum();

    for round in 0..max_rounds {
        let rounds_left = (max_rounds - round) as f64;
        let mut round_placed = 0.0;

        for i in class.clone() {
            let remaining = (expanded[i].volume - placed_volume[i]).max(0.0);
            if remaining <= TOLERANCE {
                continue;
            }
            let target_this_round = remaining / rounds_left;
            let (new_flows, placed) = place_demand(
                graph,
                &expanded[i].src,
                &expanded[i].dst,
                target_this_round,
                expanded[i].flow_class,
                expanded[i].policy,
            )?;
            placed_volume[i] += placed;
            round_placed += placed;
            flows[i].extend(new_flows);
        }

        if reoptimize_after_each_round {
            for i in class.clone() {
                if !flows[i].is_empty() {
                    let (new_flows, placed) = rebalance_demand(
                        graph,
                        &expanded[i].src,
                        &expanded[i].dst,
                        expanded[i].flow_class,
                        &flows[i],
                        expanded[i].policy,
                    )?;
                    flows[i] = new_flows;
                    placed_volume[i] = placed;
                }
            }
        }

        if matches!(rounds, PlacementRounds::Auto) && class_total > TOLERANCE && round_placed / class_total < 0.01 {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_core::{Link, Node};

    fn two_group_network() -> Network {
        let mut net = Network::new();
        let mut a1 = Node::new("A1");
        a1.attrs.insert("region".into(), "east".into());
        net.add_node(a1).unwrap();
        let mut a2 = Node::new("A2");
        a2.attrs.insert("region".into(), "west".into());
        net.add_node(a2).unwrap();
        net.add_node(Node::new("Z")).unwrap();
        net.add_link(Link::new("e1", "A1", "Z", 10.0)).unwrap();
        net.add_link(Link::new("e2", "A2", "Z", 10.0)).unwrap();
        net
    }

    #[test]
    fn combine_mode_places_full_volume_through_pseudo_nodes() {
        let net = two_group_network();
        let demand = Demand {
            label: "d0".into(),
            source_selector: "^A".into(),
            target_selector: "^Z$".into(),
            volume: 15.0,
            priority: 0,
            mode: ExpansionMode::Combine,
            group_by: GroupBy::Flatten,
            group_attr: None,
            flow_class: 0,
            policy: FlowPolicy::ShortestPathsEcmp,
        };
        let result = place_demands(&net, &ExclusionMask::new(), &[demand], PlacementRounds::Auto, false).unwrap();
        assert_eq!(result.demands.len(), 1);
        assert!((result.total_placed - 15.0).abs() < 1e-6);
    }

    #[test]
    fn pairwise_mode_splits_volume_across_pairs() {
        let net = two_group_network();
        let demand = Demand {
            label: "d0".into(),
            source_selector: "^A".into(),
            target_selector: "^Z$".into(),
            volume: 10.0,
            priority: 0,
            mode: ExpansionMode::Pairwise,
            group_by: GroupBy::Flatten,
            group_attr: None,
            flow_class: 0,
            policy: FlowPolicy::ShortestPathsEcmp,
        };
        let result = place_demands(&net, &ExclusionMask::new(), &[demand], PlacementRounds::Fixed(1), false).unwrap();
        assert_eq!(result.demands.len(), 2);
        assert!(result.demands.iter().all(|d| (d.requested - 5.0).abs() < 1e-9));
    }

    #[test]
    fn per_group_creates_one_demand_per_source_group() {
        let net = two_group_network();
        let demand = Demand {
            label: "d0".into(),
            source_selector: "^A".into(),
            target_selector: "^Z$".into(),
            volume: 20.0,
            priority: 0,
            mode: ExpansionMode::Combine,
            group_by: GroupBy::PerGroup,
            group_attr: Some("region".into()),
            flow_class: 0,
            policy: FlowPolicy::ShortestPathsEcmp,
        };
        let result = place_demands(&net, &ExclusionMask::new(), &[demand], PlacementRounds::Auto, false).unwrap();
        assert_eq!(result.demands.len(), 2);
    }

    #[test]
    fn priority_classes_are_ordered_ascending() {
        let net = two_group_network();
        let high = Demand {
            label: "high".into(),
            source_selector: "^A1$".into(),
            target_selector: "^Z$".into(),
            volume: 10.0,
            priority: 0,
            mode: ExpansionMode::Combine,
            group_by: GroupBy::Flatten,
            group_attr: None,
            flow_class: 0,
            policy: FlowPolicy::ShortestPathsEcmp,
        };
        let low = Demand {
            priority: 5,
            label: "low".into(),
            ..high.clone()
        };
        let result = place_demands(&net, &ExclusionMask::new(), &[low, high], PlacementRounds::Fixed(1), false).unwrap();
        assert_eq!(result.demands[0].label, "high");
        assert_eq!(result.demands[1].label, "low");
    }
}
