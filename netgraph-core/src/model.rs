//! §3 Data Model: nodes, links, risk groups, and the `Network` container that ties
//! them to a [`StrictMultiDiGraph`].

use crate::attrs::AttrMap;
use crate::error::{GraphError, GraphResult};
use crate::graph::StrictMultiDiGraph;
use crate::ids::make_link_id;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// A network node. `disabled` nodes are excluded from the working graph (§7) but
/// remain present in the `Network` for inspection and re-enabling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub risk_groups: IndexSet<String>,
    #[serde(default)]
    pub attrs: AttrMap,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            disabled: false,
            risk_groups: IndexSet::new(),
            attrs: AttrMap::new(),
        }
    }
}

/// A directed link. `id` is the link's own stable identifier (§6.4), distinct from
/// the key it is stored under in [`StrictMultiDiGraph`] — the two happen to be set
/// equal by [`Network::add_link`], but nothing downstream may assume that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub source: String,
    pub target: String,
    pub capacity: f64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub risk_groups: IndexSet<String>,
    #[serde(default)]
    pub attrs: AttrMap,
}

impl Link {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>, capacity: f64) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            capacity,
            cost: 1.0,
            disabled: false,
            risk_groups: IndexSet::new(),
            attrs: AttrMap::new(),
        }
    }
}

/// A node in the risk-group hierarchy (§3, §9 "risk-group cycles must be rejected").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskGroup {
    pub name: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub children: IndexSet<String>,
    #[serde(default)]
    pub attrs: AttrMap,
}

impl RiskGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            disabled: false,
            children: IndexSet::new(),
            attrs: AttrMap::new(),
        }
    }
}

/// The risk-group hierarchy, validated acyclic on every mutation that could
/// introduce a cycle. A `RiskGroupTree` is a forest: groups with no parent are
/// roots, reachable directly by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RiskGroupTree {
    groups: IndexMap<String, RiskGroup>,
}

impl RiskGroupTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&RiskGroup> {
        self.groups.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RiskGroup> {
        self.groups.values()
    }

    /// Inserts `group`, then re-validates the whole tree for cycles. On failure the
    /// tree is left unchanged.
    pub fn insert(&mut self, group: RiskGroup) -> GraphResult<()> {
        let mut candidate = self.groups.clone();
        candidate.insert(group.name.clone(), group);
        Self::check_acyclic(&candidate)?;
        self.groups = candidate;
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> GraphResult<RiskGroup> {
        self.groups
            .shift_remove(name)
            .ok_or_else(|| GraphError::UnknownRiskGroup(name.to_string()))
    }

    /// All descendant group names of `name` (exclusive), per `expand_children`
    /// semantics used by the Failure Policy Evaluator (§4.7).
    pub fn expand_children(&self, name: &str) -> GraphResult<IndexSet<String>> {
        if !self.groups.contains_key(name) {
            return Err(GraphError::UnknownRiskGroup(name.to_string()));
        }
        let mut out = IndexSet::new();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(group) = self.groups.get(&current) {
                for child in &group.children {
                    if out.insert(child.clone()) {
                        stack.push(child.clone());
                    }
                }
            }
        }
        Ok(out)
    }

    fn check_acyclic(groups: &IndexMap<String, RiskGroup>) -> GraphResult<()> {
        #[derive(PartialEq, Clone, Copy)]
        enum Mark {
            Visiting,
            Done,
        }
        let mut marks: IndexMap<&str, Mark> = IndexMap::new();

        fn visit<'a>(
            name: &'a str,
            groups: &'a IndexMap<String, RiskGroup>,
            marks: &mut IndexMap<&'a str, Mark>,
        ) -> GraphResult<()> {
            match marks.get(name) {
                Some(Mark::Done) => return Ok(()),
                Some(Mark::Visiting) => return Err(GraphError::RiskGroupCycle(name.to_string())),
                None => {}
            }
            marks.insert(name, Mark::Visiting);
            if let Some(group) = groups.get(name) {
                for child in &group.children {
                    visit(child, groups, marks)?;
                }
            }
            marks.insert(name, Mark::Done);
            Ok(())
        }

        for name in groups.keys() {
            visit(name, groups, &mut marks)?;
        }
        Ok(())
    }
}

/// The network as authored: every node and link, enabled or not, plus the
/// risk-group hierarchy and network-level attributes. [`crate::working::WorkingGraph`]
/// is derived from a `Network` by excluding disabled/failed elements.
#[derive(Debug, Clone, Default)]
pub struct Network {
    pub attrs: AttrMap,
    graph: StrictMultiDiGraph<Node, Link>,
    risk_groups: RiskGroupTree,
}

impl Network {
    pub fn new() -> Self {
        Self {
            attrs: AttrMap::new(),
            graph: StrictMultiDiGraph::new(),
            risk_groups: RiskGroupTree::new(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> GraphResult<()> {
        let name = node.name.clone();
        self.graph.add_node(name, node)
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.graph.node(name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut Node> {
        self.graph.node_mut(name)
    }

    pub fn remove_node(&mut self, name: &str) -> GraphResult<()> {
        self.graph.remove_node(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.nodes().map(|(_, n)| n)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Adds a link, auto-assigning its `id` (§6.4) when not already set, and storing
    /// it under that same id as the graph edge key.
    pub fn add_link(&mut self, mut link: Link) -> GraphResult<String> {
        if link.id.is_empty() {
            link.id = make_link_id(&link.source, &link.target);
        }
        let key = link.id.clone();
        let source = link.source.clone();
        let target = link.target.clone();
        self.graph.add_edge(&source, &target, Some(key.clone()), link)?;
        Ok(key)
    }

    pub fn link(&self, id: &str) -> Option<&Link> {
        self.graph.edge(id)
    }

    pub fn link_mut(&mut self, id: &str) -> Option<&mut Link> {
        self.graph.edge_mut(id)
    }

    pub fn remove_link(&mut self, id: &str) -> GraphResult<()> {
        self.graph.remove_edge(id)
    }

    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.graph.edges().map(|(_, _, _, l)| l)
    }

    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn links_between(&self, source: &str, target: &str) -> Vec<String> {
        self.graph.edges_between(source, target)
    }

    pub fn risk_groups(&self) -> &RiskGroupTree {
        &self.risk_groups
    }

    pub fn add_risk_group(&mut self, group: RiskGroup) -> GraphResult<()> {
        self.risk_groups.insert(group)
    }

    /// Inner graph access for algorithms that need the raw strict-multigraph contract
    /// (e.g. to build an independent copy before mutating flows).
    pub fn graph(&self) -> &StrictMultiDiGraph<Node, Link> {
        &self.graph
    }

    pub fn to_node_link_dict(&self) -> serde_json::Value {
        let attrs_json = serde_json::to_value(&self.attrs).unwrap_or(serde_json::Value::Null);
        self.graph.to_node_link_dict(attrs_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_link_without_id_gets_generated_id() {
        let mut net = Network::new();
        net.add_node(Node::new("A")).unwrap();
        net.add_node(Node::new("B")).unwrap();
        let link = Link::new("", "A", "B", 10.0);
        let id = net.add_link(link).unwrap();
        assert!(id.starts_with("A|B|"));
        assert!(net.link(&id).is_some());
    }

    #[test]
    fn duplicate_link_id_rejected() {
        let mut net = Network::new();
        net.add_node(Node::new("A")).unwrap();
        net.add_node(Node::new("B")).unwrap();
        net.add_link(Link::new("fixed", "A", "B", 10.0)).unwrap();
        let err = net.add_link(Link::new("fixed", "A", "B", 5.0));
        assert!(matches!(err, Err(GraphError::DuplicateEdge(_))));
    }

    #[test]
    fn risk_group_self_cycle_rejected() {
        let mut tree = RiskGroupTree::new();
        let mut g = RiskGroup::new("rg1");
        g.children.insert("rg1".to_string());
        assert!(matches!(tree.insert(g), Err(GraphError::RiskGroupCycle(_))));
    }

    #[test]
    fn risk_group_two_cycle_rejected() {
        let mut tree = RiskGroupTree::new();
        let mut a = RiskGroup::new("a");
        a.children.insert("b".to_string());
        tree.insert(a).unwrap();
        let mut b = RiskGroup::new("b");
        b.children.insert("a".to_string());
        assert!(matches!(tree.insert(b), Err(GraphError::RiskGroupCycle(_))));
    }

    #[test]
    fn expand_children_is_transitive() {
        let mut tree = RiskGroupTree::new();
        let mut root = RiskGroup::new("root");
        root.children.insert("mid".to_string());
        tree.insert(root).unwrap();
        let mut mid = RiskGroup::new("mid");
        mid.children.insert("leaf".to_string());
        tree.insert(mid).unwrap();
        tree.insert(RiskGroup::new("leaf")).unwrap();

        let expanded = tree.expand_children("root").unwrap();
        assert!(expanded.contains("mid"));
        assert!(expanded.contains("leaf"));
        assert_eq!(expanded.len(), 2);
    }
}
