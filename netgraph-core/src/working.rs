//! §7 Working Graph: the graph algorithms actually run on. A `WorkingGraph` is
//! derived from a [`Network`] by dropping every node/link that is disabled or
//! named in an [`ExclusionMask`] (failed, under maintenance, risk-group down).
//!
//! Two historically separate containers — the authored `Network` and the
//! algorithm-facing working copy — are unified here by building both on the same
//! [`StrictMultiDiGraph`], parameterized by different payload types.

use crate::error::GraphResult;
use crate::graph::StrictMultiDiGraph;
use crate::ids::{make_link_id, FlowIndex};
use crate::model::Network;
use indexmap::{IndexMap, IndexSet};

/// Names/ids to exclude when building a [`WorkingGraph`] from a [`Network`], on top
/// of whatever is already marked `disabled`. Built by the Failure Policy Evaluator
/// from risk-group expansion, or directly for ad-hoc what-if exclusion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionMask {
    pub nodes: IndexSet<String>,
    pub links: IndexSet<String>,
}

impl ExclusionMask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: impl IntoIterator<Item = String>) -> Self {
        Self {
            nodes: nodes.into_iter().collect(),
            links: IndexSet::new(),
        }
    }

    pub fn with_links(links: impl IntoIterator<Item = String>) -> Self {
        Self {
            nodes: IndexSet::new(),
            links: links.into_iter().collect(),
        }
    }

    pub fn excludes_node(&self, name: &str) -> bool {
        self.nodes.contains(name)
    }

    pub fn excludes_link(&self, id: &str) -> bool {
        self.links.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn merge(mut self, other: &ExclusionMask) -> Self {
        self.nodes.extend(other.nodes.iter().cloned());
        self.links.extend(other.links.iter().cloned());
        self
    }
}

/// A node as seen by the algorithms: just whether it's in play.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingNode {
    pub name: String,
}

/// A link as seen by the algorithms, carrying the flows currently placed on it.
/// `capacity`/`cost` are copied from the originating [`crate::model::Link`] at
/// working-graph build time; later edits to the `Network` don't retroactively
/// change an already-built `WorkingGraph`.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub capacity: f64,
    pub cost: f64,
    pub flows: IndexMap<FlowIndex, f64>,
}

impl WorkingEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>, capacity: f64, cost: f64) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            capacity,
            cost,
            flows: IndexMap::new(),
        }
    }

    pub fn placed_flow(&self) -> f64 {
        self.flows.values().sum()
    }

    pub fn remaining_capacity(&self) -> f64 {
        self.capacity - self.placed_flow()
    }

    /// Adds `volume` to the flow identified by `index`, creating the entry if absent.
    /// Does not check capacity — callers (the capacity/max-flow engines) are
    /// responsible for only placing what `remaining_capacity` allows.
    pub fn place_flow(&mut self, index: FlowIndex, volume: f64) {
        *self.flows.entry(index).or_insert(0.0) += volume;
    }

    /// Removes `volume` from the flow identified by `index`; drops the entry once
    /// it reaches (approximately) zero.
    pub fn remove_flow(&mut self, index: &FlowIndex, volume: f64) {
        if let Some(existing) = self.flows.get_mut(index) {
            *existing -= volume;
            if existing.abs() < 1e-10 {
                self.flows.shift_remove(index);
            }
        }
    }

    pub fn clear_flows(&mut self) {
        self.flows.clear();
    }
}

/// The graph algorithms run on: enabled nodes/links only, each edge tracking the
/// flows already placed on it.
pub type WorkingGraph = StrictMultiDiGraph<WorkingNode, WorkingEdge>;

/// Options for [`build_working_graph`].
#[derive(Debug, Clone, Copy)]
pub struct WorkingGraphOptions {
    /// Mirror every surviving link with a same-capacity, same-cost reverse edge
    /// (§6.2 "optional add reverse edge flag"), for analyses that treat links as
    /// bidirectional.
    pub add_reverse_edges: bool,
}

impl Default for WorkingGraphOptions {
    fn default() -> Self {
        Self {
            add_reverse_edges: false,
        }
    }
}

/// Builds a [`WorkingGraph`] from `network`, dropping nodes/links that are
/// `disabled` or named in `exclusions`. A node excluded this way takes its incident
/// links with it even if those links aren't separately excluded.
pub fn build_working_graph(
    network: &Network,
    exclusions: &ExclusionMask,
    options: WorkingGraphOptions,
) -> GraphResult<WorkingGraph> {
    let mut working = StrictMultiDiGraph::new();

    for node in network.nodes() {
        if node.disabled || exclusions.excludes_node(&node.name) {
            continue;
        }
        working.add_node(node.name.clone(), WorkingNode { name: node.name.clone() })?;
    }

    for link in network.links() {
        if link.disabled || exclusions.excludes_link(&link.id) {
            continue;
        }
        if !working.has_node(&link.source) || !working.has_node(&link.target) {
            continue;
        }
        let edge = WorkingEdge::new(link.id.clone(), link.source.clone(), link.target.clone(), link.capacity, link.cost);
        working.add_edge(&link.source, &link.target, Some(link.id.clone()), edge)?;

        if options.add_reverse_edges {
            let reverse_id = make_link_id(&link.target, &link.source);
            let reverse = WorkingEdge::new(reverse_id.clone(), link.target.clone(), link.source.clone(), link.capacity, link.cost);
            working.add_edge(&link.target, &link.source, Some(reverse_id), reverse)?;
        }
    }

    Ok(working)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Link, Node};

    fn sample_network() -> Network {
        let mut net = Network::new();
        net.add_node(Node::new("A")).unwrap();
        net.add_node(Node::new("B")).unwrap();
        let mut c = Node::new("C");
        c.disabled = true;
        net.add_node(c).unwrap();
        net.add_link(Link::new("ab", "A", "B", 10.0)).unwrap();
        let mut bc = Link::new("bc", "B", "C", 5.0);
        bc.disabled = false;
        net.add_link(bc).unwrap();
        net
    }

    #[test]
    fn disabled_node_and_its_links_are_excluded() {
        let net = sample_network();
        let working = build_working_graph(&net, &ExclusionMask::new(), WorkingGraphOptions::default()).unwrap();
        assert!(working.has_node("A"));
        assert!(working.has_node("B"));
        assert!(!working.has_node("C"));
        assert!(working.has_edge("ab"));
        assert!(!working.has_edge("bc"));
    }

    #[test]
    fn exclusion_mask_drops_named_link() {
        let net = sample_network();
        let mask = ExclusionMask::with_links(["ab".to_string()]);
        let working = build_working_graph(&net, &mask, WorkingGraphOptions::default()).unwrap();
        assert!(!working.has_edge("ab"));
    }

    #[test]
    fn reverse_edges_are_added_when_requested() {
        let net = sample_network();
        let options = WorkingGraphOptions { add_reverse_edges: true };
        let working = build_working_graph(&net, &ExclusionMask::new(), options).unwrap();
        assert!(working.has_edge("ab"));
        assert_eq!(working.edges_between("B", "A").len(), 1);
    }

    #[test]
    fn place_and_remove_flow_tracks_remaining_capacity() {
        let mut edge = WorkingEdge::new("e", "A", "B", 10.0, 1.0);
        let idx = FlowIndex::new("A", "B", 0, 0);
        edge.place_flow(idx.clone(), 4.0);
        assert_eq!(edge.remaining_capacity(), 6.0);
        edge.remove_flow(&idx, 4.0);
        assert_eq!(edge.remaining_capacity(), 10.0);
        assert!(edge.flows.is_empty());
    }
}
