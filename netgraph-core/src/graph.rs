//! §4.1 Graph Core: a strict multi-directed graph with unique, stable edge identity.
//!
//! The "strict" discipline matters because downstream algorithms key data (flow
//! placement, predecessor sets, min-cut membership) on edge identity — silent
//! auto-creation of missing endpoints, or edge-key reuse after removal, would
//! silently corrupt those results. Both [`crate::model::Network`] and
//! [`crate::working::WorkingGraph`] are built on this same structure.

use crate::error::{GraphError, GraphResult};
use crate::ids::make_edge_key;
use indexmap::IndexMap;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::HashMap;

/// A strict multi-directed graph keyed by string node names and string edge keys.
///
/// Built on [`petgraph::stable_graph::StableDiGraph`] so that node/edge removal never
/// reassigns another entity's internal index — only the name/key indirection in
/// [`StrictMultiDiGraph`] needs to stay consistent.
#[derive(Debug)]
pub struct StrictMultiDiGraph<N, E> {
    graph: StableDiGraph<N, E>,
    node_index: IndexMap<String, NodeIndex>,
    node_names: HashMap<NodeIndex, String>,
    edge_index: IndexMap<String, EdgeIndex>,
    edge_keys: HashMap<EdgeIndex, String>,
}

impl<N, E> Default for StrictMultiDiGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone, E: Clone> Clone for StrictMultiDiGraph<N, E> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            node_index: self.node_index.clone(),
            node_names: self.node_names.clone(),
            edge_index: self.edge_index.clone(),
            edge_keys: self.edge_keys.clone(),
        }
    }
}

impl<N, E> StrictMultiDiGraph<N, E> {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            node_index: IndexMap::new(),
            node_names: HashMap::new(),
            edge_index: IndexMap::new(),
            edge_keys: HashMap::new(),
        }
    }

    /// Deep copy, safe against subsequent mutation of either graph.
    pub fn copy(&self) -> Self
    where
        N: Clone,
        E: Clone,
    {
        self.clone()
    }

    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.node_index.contains_key(name)
    }

    pub fn has_edge(&self, key: &str) -> bool {
        self.edge_index.contains_key(key)
    }

    /// Fails with [`GraphError::DuplicateNode`] if `name` already exists.
    pub fn add_node(&mut self, name: impl Into<String>, attrs: N) -> GraphResult<()> {
        let name = name.into();
        if self.node_index.contains_key(&name) {
            return Err(GraphError::DuplicateNode(name));
        }
        let idx = self.graph.add_node(attrs);
        self.node_names.insert(idx, name.clone());
        self.node_index.insert(name, idx);
        Ok(())
    }

    /// Fails with [`GraphError::MissingEndpoint`] if either endpoint is absent, or
    /// [`GraphError::DuplicateEdge`] if `key` is already taken. Assigns a fresh
    /// 22-char base64 key when `key` is `None`.
    pub fn add_edge(
        &mut self,
        src: &str,
        dst: &str,
        key: Option<String>,
        attrs: E,
    ) -> GraphResult<String> {
        let src_idx = *self
            .node_index
            .get(src)
            .ok_or_else(|| GraphError::MissingEndpoint(src.to_string(), dst.to_string()))?;
        let dst_idx = *self
            .node_index
            .get(dst)
            .ok_or_else(|| GraphError::MissingEndpoint(src.to_string(), dst.to_string()))?;
        let key = match key {
            Some(k) => {
                if self.edge_index.contains_key(&k) {
                    return Err(GraphError::DuplicateEdge(k));
                }
                k
            }
            None => loop {
                let candidate = make_edge_key();
                if !self.edge_index.contains_key(&candidate) {
                    break candidate;
                }
            },
        };
        let eidx = self.graph.add_edge(src_idx, dst_idx, attrs);
        self.edge_keys.insert(eidx, key.clone());
        self.edge_index.insert(key.clone(), eidx);
        Ok(key)
    }

    /// Fails with [`GraphError::UnknownNode`]; removes all incident edges.
    pub fn remove_node(&mut self, name: &str) -> GraphResult<()> {
        let idx = self
            .node_index
            .shift_remove(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))?;
        self.node_names.remove(&idx);

        let mut incident = std::collections::HashSet::new();
        for e in self.graph.edges_directed(idx, Direction::Outgoing) {
            incident.insert(e.id());
        }
        for e in self.graph.edges_directed(idx, Direction::Incoming) {
            incident.insert(e.id());
        }
        for eidx in incident {
            if let Some(key) = self.edge_keys.remove(&eidx) {
                self.edge_index.shift_remove(&key);
            }
        }
        self.graph.remove_node(idx);
        Ok(())
    }

    /// Fails with [`GraphError::UnknownEdge`].
    pub fn remove_edge(&mut self, key: &str) -> GraphResult<()> {
        let idx = self
            .edge_index
            .shift_remove(key)
            .ok_or_else(|| GraphError::UnknownEdge(key.to_string()))?;
        self.edge_keys.remove(&idx);
        self.graph.remove_edge(idx);
        Ok(())
    }

    pub fn node(&self, name: &str) -> Option<&N> {
        let idx = *self.node_index.get(name)?;
        self.graph.node_weight(idx)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut N> {
        let idx = *self.node_index.get(name)?;
        self.graph.node_weight_mut(idx)
    }

    pub fn edge(&self, key: &str) -> Option<&E> {
        let idx = *self.edge_index.get(key)?;
        self.graph.edge_weight(idx)
    }

    pub fn edge_mut(&mut self, key: &str) -> Option<&mut E> {
        let idx = *self.edge_index.get(key)?;
        self.graph.edge_weight_mut(idx)
    }

    pub fn edge_endpoints(&self, key: &str) -> Option<(&str, &str)> {
        let idx = *self.edge_index.get(key)?;
        let (s, t) = self.graph.edge_endpoints(idx)?;
        Some((self.node_names[&s].as_str(), self.node_names[&t].as_str()))
    }

    /// Ordered list (by insertion) of edge keys from `u` to `v`.
    pub fn edges_between(&self, u: &str, v: &str) -> Vec<String> {
        let (Some(&u_idx), Some(&v_idx)) = (self.node_index.get(u), self.node_index.get(v))
        else {
            return Vec::new();
        };
        self.edge_index
            .iter()
            .filter(|(_, &eidx)| {
                self.graph
                    .edge_endpoints(eidx)
                    .map(|(s, t)| s == u_idx && t == v_idx)
                    .unwrap_or(false)
            })
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &N)> {
        self.node_index
            .iter()
            .map(move |(name, &idx)| (name.as_str(), &self.graph[idx]))
    }

    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.node_index.keys().map(|s| s.as_str())
    }

    /// Edges in insertion order as `(key, src, dst, attrs)`.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &str, &E)> {
        self.edge_index.iter().map(move |(key, &eidx)| {
            let (s, t) = self.graph.edge_endpoints(eidx).expect("edge index valid");
            (
                key.as_str(),
                self.node_names[&s].as_str(),
                self.node_names[&t].as_str(),
                &self.graph[eidx],
            )
        })
    }

    /// Outgoing edges of `name`, in stable (insertion-order) key order — the order
    /// every edge-selection policy and the capacity calculator iterate in (§5).
    pub fn out_edges(&self, name: &str) -> GraphResult<Vec<(String, String, &E)>> {
        let idx = *self
            .node_index
            .get(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))?;
        let mut edges: Vec<(usize, String, String, &E)> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| {
                let key = self.edge_keys[&e.id()].clone();
                let seq = self.edge_index.get_index_of(&key).unwrap();
                let dst = self.node_names[&e.target()].clone();
                (seq, key, dst, e.weight())
            })
            .collect();
        edges.sort_by_key(|(seq, ..)| *seq);
        Ok(edges.into_iter().map(|(_, k, d, w)| (k, d, w)).collect())
    }

    /// Incoming edges of `name`, in stable key order.
    pub fn in_edges(&self, name: &str) -> GraphResult<Vec<(String, String, &E)>> {
        let idx = *self
            .node_index
            .get(name)
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))?;
        let mut edges: Vec<(usize, String, String, &E)> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| {
                let key = self.edge_keys[&e.id()].clone();
                let seq = self.edge_index.get_index_of(&key).unwrap();
                let src = self.node_names[&e.source()].clone();
                (seq, key, src, e.weight())
            })
            .collect();
        edges.sort_by_key(|(seq, ..)| *seq);
        Ok(edges.into_iter().map(|(_, k, s, w)| (k, s, w)).collect())
    }

    /// Canonical JSON-safe representation (§4.1): `{"graph", "nodes", "links"}`, where
    /// `source`/`target` on each link are the 0-based positions of the endpoint nodes
    /// in the `nodes` array (node-link-data convention).
    pub fn to_node_link_dict(&self, graph_attrs: serde_json::Value) -> serde_json::Value
    where
        N: Serialize,
        E: Serialize,
    {
        let position: HashMap<NodeIndex, usize> = self
            .node_index
            .values()
            .enumerate()
            .map(|(i, &idx)| (idx, i))
            .collect();
        let nodes: Vec<serde_json::Value> = self
            .node_index
            .iter()
            .map(|(name, &idx)| {
                serde_json::json!({
                    "id": name,
                    "attr": serde_json::to_value(&self.graph[idx]).unwrap_or(serde_json::Value::Null),
                })
            })
            .collect();
        let links: Vec<serde_json::Value> = self
            .edge_index
            .iter()
            .map(|(key, &eidx)| {
                let (s, t) = self.graph.edge_endpoints(eidx).expect("edge index valid");
                serde_json::json!({
                    "source": position[&s],
                    "target": position[&t],
                    "key": key,
                    "attr": serde_json::to_value(&self.graph[eidx]).unwrap_or(serde_json::Value::Null),
                })
            })
            .collect();
        serde_json::json!({ "graph": graph_attrs, "nodes": nodes, "links": links })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> StrictMultiDiGraph<(), ()> {
        StrictMultiDiGraph::new()
    }

    #[test]
    fn duplicate_node_fails() {
        let mut g = graph();
        g.add_node("A", ()).unwrap();
        assert_eq!(g.add_node("A", ()), Err(GraphError::DuplicateNode("A".into())));
    }

    #[test]
    fn add_edge_succeeds_iff_endpoints_exist_and_key_fresh() {
        let mut g = graph();
        assert!(g.add_edge("A", "B", None, ()).is_err());
        g.add_node("A", ()).unwrap();
        g.add_node("B", ()).unwrap();
        let key = g.add_edge("A", "B", Some("k1".into()), ()).unwrap();
        assert_eq!(key, "k1");
        assert_eq!(
            g.add_edge("A", "B", Some("k1".into()), ()),
            Err(GraphError::DuplicateEdge("k1".into()))
        );
    }

    #[test]
    fn add_edge_without_key_assigns_fresh_base64_key() {
        let mut g = graph();
        g.add_node("A", ()).unwrap();
        g.add_node("B", ()).unwrap();
        let k1 = g.add_edge("A", "B", None, ()).unwrap();
        let k2 = g.add_edge("A", "B", None, ()).unwrap();
        assert_ne!(k1, k2);
        assert_eq!(k1.len(), 22);
    }

    #[test]
    fn remove_node_removes_incident_edges() {
        let mut g = graph();
        g.add_node("A", ()).unwrap();
        g.add_node("B", ()).unwrap();
        g.add_node("C", ()).unwrap();
        g.add_edge("A", "B", Some("ab".into()), ()).unwrap();
        g.add_edge("B", "C", Some("bc".into()), ()).unwrap();
        g.remove_node("B").unwrap();
        assert!(!g.has_node("B"));
        assert!(!g.has_edge("ab"));
        assert!(!g.has_edge("bc"));
        assert!(g.has_node("A"));
        assert!(g.has_node("C"));
    }

    #[test]
    fn remove_unknown_node_or_edge_fails() {
        let mut g = graph();
        assert_eq!(g.remove_node("X"), Err(GraphError::UnknownNode("X".into())));
        assert_eq!(g.remove_edge("X"), Err(GraphError::UnknownEdge("X".into())));
    }

    #[test]
    fn edges_between_is_insertion_ordered() {
        let mut g = graph();
        g.add_node("A", ()).unwrap();
        g.add_node("B", ()).unwrap();
        let k1 = g.add_edge("A", "B", Some("e1".into()), ()).unwrap();
        let k2 = g.add_edge("A", "B", Some("e2".into()), ()).unwrap();
        assert_eq!(g.edges_between("A", "B"), vec![k1, k2]);
    }

    #[test]
    fn copy_is_independent() {
        let mut g: StrictMultiDiGraph<i32, i32> = StrictMultiDiGraph::new();
        g.add_node("A", 1).unwrap();
        let mut copy = g.copy();
        *copy.node_mut("A").unwrap() = 2;
        assert_eq!(*g.node("A").unwrap(), 1);
        assert_eq!(*copy.node("A").unwrap(), 2);
    }

    #[test]
    fn to_node_link_dict_round_trips_shape() {
        let mut g: StrictMultiDiGraph<i32, i32> = StrictMultiDiGraph::new();
        g.add_node("A", 1).unwrap();
        g.add_node("B", 2).unwrap();
        g.add_edge("A", "B", Some("e1".into()), 7).unwrap();
        let dict = g.to_node_link_dict(serde_json::json!({}));
        assert_eq!(dict["nodes"].as_array().unwrap().len(), 2);
        assert_eq!(dict["links"].as_array().unwrap().len(), 1);
        assert_eq!(dict["links"][0]["source"], 0);
        assert_eq!(dict["links"][0]["target"], 1);
        assert_eq!(dict["links"][0]["key"], "e1");
    }

    #[test]
    fn out_edges_are_in_stable_key_order() {
        let mut g: StrictMultiDiGraph<(), ()> = StrictMultiDiGraph::new();
        g.add_node("A", ()).unwrap();
        g.add_node("B", ()).unwrap();
        g.add_node("C", ()).unwrap();
        g.add_edge("A", "C", Some("second".into()), ()).unwrap();
        g.add_edge("A", "B", Some("first".into()), ()).unwrap();
        // insertion order is second, first regardless of alphabetic key order
        let out = g.out_edges("A").unwrap();
        let keys: Vec<&str> = out.iter().map(|(k, _, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["second", "first"]);
    }
}
