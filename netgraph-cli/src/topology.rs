//! Thin network-topology loader. Not a document parser or blueprint expander —
//! those stay out of scope, keeping the CLI a small wrapper — just a direct
//! JSON rendering of [`Node`]/[`Link`]/[`RiskGroup`], which already derive
//! `Serialize`/`Deserialize`.

use anyhow::{Context, Result};
use netgraph_core::{Link, Network, Node, RiskGroup};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct NetworkDocument {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    links: Vec<Link>,
    #[serde(default)]
    risk_groups: Vec<RiskGroup>,
}

pub fn load_network(path: &Path) -> Result<Network> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading network {}", path.display()))?;
    let doc: NetworkDocument = serde_json::from_str(&text).with_context(|| format!("parsing network {}", path.display()))?;

    let mut network = Network::new();
    for node in doc.nodes {
        network.add_node(node)?;
    }
    for link in doc.links {
        network.add_link(link)?;
    }
    for group in doc.risk_groups {
        network.add_risk_group(group)?;
    }
    Ok(network)
}

/// A small built-in diamond topology (A -> {B, C} -> D) for exercising the
/// subcommands without an input file.
pub fn demo_network() -> Network {
    let mut network = Network::new();
    for name in ["A", "B", "C", "D"] {
        network.add_node(Node::new(name)).expect("fresh network, no duplicates");
    }
    network.add_link(Link::new("ab", "A", "B", 10.0)).expect("fresh network, no duplicates");
    network.add_link(Link::new("ac", "A", "C", 10.0)).expect("fresh network, no duplicates");
    network.add_link(Link::new("bd", "B", "D", 10.0)).expect("fresh network, no duplicates");
    network.add_link(Link::new("cd", "C", "D", 10.0)).expect("fresh network, no duplicates");
    network
}
