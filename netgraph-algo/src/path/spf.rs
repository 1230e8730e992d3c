//! §4.2.2 Shortest-Path-First: a Dijkstra-like, multipath-aware single-source
//! traversal with a pluggable edge-selection policy.

use crate::consts::TOLERANCE;
use crate::error::{AlgoError, AlgoResult};
use crate::path::bundle::PathBundle;
use crate::path::select::EdgeSelection;
use indexmap::{IndexMap, IndexSet};
use netgraph_core::{Sequence, WorkingGraph};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// The shortest-path tree rooted at `src`: minimal cost to every reached node, and
/// for each node the set of predecessors that achieve that minimal cost.
#[derive(Debug, Clone)]
pub struct SpfTree {
    pub src: String,
    pub costs: IndexMap<String, f64>,
    pub preds: IndexMap<String, IndexMap<String, Vec<String>>>,
}

impl SpfTree {
    /// Extracts the `src -> dst` [`PathBundle`] (the subset of `preds` reachable
    /// backward from `dst`), or `None` if `dst` was never reached.
    pub fn bundle_to(&self, dst: &str) -> Option<PathBundle> {
        let cost = *self.costs.get(dst)?;
        if dst == self.src {
            return Some(PathBundle {
                src: self.src.clone(),
                dst: dst.to_string(),
                cost,
                preds: IndexMap::new(),
            });
        }
        let mut preds = IndexMap::new();
        let mut stack = vec![dst.to_string()];
        let mut seen = IndexSet::new();
        seen.insert(dst.to_string());
        while let Some(node) = stack.pop() {
            if node == self.src {
                continue;
            }
            let Some(node_preds) = self.preds.get(&node) else {
                continue;
            };
            preds.insert(node.clone(), node_preds.clone());
            for pred in node_preds.keys() {
                if seen.insert(pred.clone()) {
                    stack.push(pred.clone());
                }
            }
        }
        Some(PathBundle {
            src: self.src.clone(),
            dst: dst.to_string(),
            cost,
            preds,
        })
    }
}

#[derive(Clone, Debug)]
struct HeapEntry {
    cost: f64,
    seq: u64,
    node: String,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.seq == other.seq
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    /// Inverted so [`BinaryHeap`] (a max-heap) pops the smallest cost first, ties
    /// broken by the smaller sequence number (earlier push wins).
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Runs SPF from `src`. `dst`, when given, stops expansion *from* the destination
/// node but keeps draining the heap while the next candidate's cost equals
/// `costs[dst]`, so every equal-cost predecessor of `dst` is still settled.
pub fn spf(
    graph: &WorkingGraph,
    src: &str,
    dst: Option<&str>,
    selection: &EdgeSelection,
    multipath: bool,
    excluded_nodes: &IndexSet<String>,
    excluded_edges: &IndexSet<String>,
) -> AlgoResult<SpfTree> {
    if !graph.has_node(src) {
        return Err(AlgoError::UnknownSource(src.to_string()));
    }

    let mut costs: IndexMap<String, f64> = IndexMap::new();
    let mut preds: IndexMap<String, IndexMap<String, Vec<String>>> = IndexMap::new();
    let mut settled: IndexSet<String> = IndexSet::new();
    let seq = Sequence::new();
    let mut heap = BinaryHeap::new();
    let mut dst_cost: Option<f64> = None;

    costs.insert(src.to_string(), 0.0);
    heap.push(HeapEntry {
        cost: 0.0,
        seq: seq.next(),
        node: src.to_string(),
    });

    while let Some(HeapEntry { cost, node, .. }) = heap.pop() {
        if let Some(dc) = dst_cost {
            if cost > dc + TOLERANCE {
                break;
            }
        }
        if settled.contains(&node) {
            continue;
        }
        if let Some(&best) = costs.get(&node) {
            if cost > best + TOLERANCE {
                continue; // stale heap entry superseded by a later relaxation
            }
        }
        settled.insert(node.clone());

        if Some(node.as_str()) == dst {
            if dst_cost.is_none() {
                dst_cost = Some(cost);
            }
            continue;
        }

        if excluded_nodes.contains(&node) {
            continue;
        }

        let mut targets: IndexMap<String, ()> = IndexMap::new();
        for (key, target, _) in graph.out_edges(&node)? {
            if excluded_edges.contains(&key) || excluded_nodes.contains(&target) {
                continue;
            }
            targets.insert(target, ());
        }

        for target in targets.keys() {
            let Some((edge_cost, selected_edges)) = selection.select(graph, &node, target, excluded_edges) else {
                continue;
            };
            let new_cost = cost + edge_cost;
            match costs.get(target).copied() {
                None => {
                    costs.insert(target.clone(), new_cost);
                    let mut p = IndexMap::new();
                    p.insert(node.clone(), selected_edges);
                    preds.insert(target.clone(), p);
                    heap.push(HeapEntry {
                        cost: new_cost,
                        seq: seq.next(),
                        node: target.clone(),
                    });
                }
                Some(existing) if new_cost < existing - TOLERANCE => {
                    costs.insert(target.clone(), new_cost);
                    let mut p = IndexMap::new();
                    p.insert(node.clone(), selected_edges);
                    preds.insert(target.clone(), p);
                    heap.push(HeapEntry {
                        cost: new_cost,
                        seq: seq.next(),
                        node: target.clone(),
                    });
                }
                Some(existing) if multipath && (new_cost - existing).abs() <= TOLERANCE => {
                    preds.entry(target.clone()).or_default().insert(node.clone(), selected_edges);
                }
                _ => {}
            }
        }
    }

    Ok(SpfTree {
        src: src.to_string(),
        costs,
        preds,
    })
}
