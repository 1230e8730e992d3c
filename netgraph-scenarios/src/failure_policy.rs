//! §4.7 Failure Policy Evaluator: weighted-mode sampling over rules that select
//! failing nodes/links/risk-groups, with shared-risk-group expansion.

use crate::condition::{evaluate_all, CombineLogic, Condition};
use crate::error::{ScenarioError, ScenarioResult};
use indexmap::IndexSet;
use netgraph_core::{AttrMap, AttrValue, ExclusionMask, Link, Node, RiskGroupTree};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Node,
    Link,
    RiskGroup,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SelectionKind {
    All,
    /// Bernoulli draw per matching entity.
    Random { probability: f64 },
    /// Sample exactly `count` without replacement, optionally weighted by an
    /// attribute name resolved against each candidate's flattened attrs.
    Choice {
        count: usize,
        #[serde(default)]
        weight_by: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub scope: Scope,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub combine: CombineLogic,
    pub selection: SelectionKind,
    #[serde(default)]
    pub name_filter: Option<String>,
}

impl Rule {
    pub fn new(scope: Scope, selection: SelectionKind) -> Self {
        Self {
            scope,
            conditions: Vec::new(),
            combine: CombineLogic::And,
            selection,
            name_filter: None,
        }
    }

    fn compiled_filter(&self) -> ScenarioResult<Option<Regex>> {
        match &self.name_filter {
            None => Ok(None),
            Some(pattern) => Regex::new(pattern)
                .map(Some)
                .map_err(|_| ScenarioError::MalformedSelector(pattern.clone())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureMode {
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl FailureMode {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePolicy {
    pub name: String,
    #[serde(default)]
    pub modes: Vec<FailureMode>,
    #[serde(default)]
    pub expand_children: bool,
    #[serde(default)]
    pub expand_groups: bool,
}

impl FailurePolicy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modes: Vec::new(),
            expand_children: false,
            expand_groups: false,
        }
    }
}

/// One entity candidate for rule matching: its identifier plus its flattened
/// attribute dict (top-level fields merged over nested `attrs`, top-level wins).
struct Candidate<'a> {
    id: &'a str,
    attrs: AttrMap,
}

fn flatten_node(node: &Node) -> AttrMap {
    let mut attrs = node.attrs.clone();
    attrs.insert("disabled".to_string(), AttrValue::Bool(node.disabled));
    attrs
}

fn flatten_link(link: &Link) -> AttrMap {
    let mut attrs = link.attrs.clone();
    attrs.insert("disabled".to_string(), AttrValue::Bool(link.disabled));
    attrs.insert("capacity".to_string(), AttrValue::Number(link.capacity));
    attrs.insert("cost".to_string(), AttrValue::Number(link.cost));
    attrs
}

fn candidates_for_scope<'a>(
    scope: Scope,
    nodes: &'a [Node],
    links: &'a [Link],
    risk_groups: &'a RiskGroupTree,
) -> Vec<Candidate<'a>> {
    match scope {
        Scope::Node => nodes
            .iter()
            .map(|n| Candidate {
                id: n.name.as_str(),
                attrs: flatten_node(n),
            })
            .collect(),
        Scope::Link => links
            .iter()
            .map(|l| Candidate {
                id: l.id.as_str(),
                attrs: flatten_link(l),
            })
            .collect(),
        Scope::RiskGroup => risk_groups
            .iter()
            .map(|g| {
                let mut attrs = g.attrs.clone();
                attrs.insert("disabled".to_string(), AttrValue::Bool(g.disabled));
                Candidate { id: g.name.as_str(), attrs }
            })
            .collect(),
    }
}

fn apply_selection(rule: &Rule, matched: Vec<&Candidate<'_>>, rng: &mut StdRng) -> ScenarioResult<IndexSet<String>> {
    let mut chosen = IndexSet::new();
    match &rule.selection {
        SelectionKind::All => {
            for c in matched {
                chosen.insert(c.id.to_string());
            }
        }
        SelectionKind::Random { probability } => {
            for c in matched {
                if rng.gen_bool(probability.clamp(0.0, 1.0)) {
                    chosen.insert(c.id.to_string());
                }
            }
        }
        SelectionKind::Choice { count, weight_by } => {
            let take = (*count).min(matched.len());
            if take == 0 {
                return Ok(chosen);
            }
            match weight_by {
                None => {
                    let mut pool = matched;
                    for _ in 0..take {
                        let idx = rng.gen_range(0..pool.len());
                        chosen.insert(pool.remove(idx).id.to_string());
                    }
                }
                Some(attr) => {
                    let mut pool = matched;
                    for _ in 0..take {
                        let weights: Vec<f64> = pool
                            .iter()
                            .map(|c| c.attrs.get(attr).and_then(AttrValue::as_f64).unwrap_or(0.0).max(0.0))
                            .collect();
                        if weights.iter().all(|w| *w <= 0.0) {
                            let idx = rng.gen_range(0..pool.len());
                            chosen.insert(pool.remove(idx).id.to_string());
                            continue;
                        }
                        let dist = WeightedIndex::new(&weights).expect("validated nonzero weights above");
                        let idx = dist.sample(rng);
                        chosen.insert(pool.remove(idx).id.to_string());
                    }
                }
            }
        }
    }
    Ok(chosen)
}

fn apply_rule(
    rule: &Rule,
    nodes: &[Node],
    links: &[Link],
    risk_groups: &RiskGroupTree,
    rng: &mut StdRng,
) -> ScenarioResult<IndexSet<String>> {
    let filter = rule.compiled_filter()?;
    let candidates = candidates_for_scope(rule.scope, nodes, links, risk_groups);

    let mut matched = Vec::new();
    for c in &candidates {
        if let Some(re) = &filter {
            if !re.is_match(c.id) {
                continue;
            }
        }
        if evaluate_all(&rule.conditions, rule.combine, &c.attrs)? {
            matched.push(c);
        }
    }

    apply_selection(rule, matched, rng)
}

fn choose_mode<'a>(modes: &'a [FailureMode], policy_name: &str, rng: &mut StdRng) -> ScenarioResult<&'a FailureMode> {
    let total: f64 = modes.iter().map(|m| m.weight.max(0.0)).sum();
    if total <= 0.0 {
        return Err(ScenarioError::ZeroSumWeights(policy_name.to_string()));
    }
    let weights: Vec<f64> = modes.iter().map(|m| m.weight.max(0.0)).collect();
    let dist = WeightedIndex::new(&weights).map_err(|_| ScenarioError::ZeroSumWeights(policy_name.to_string()))?;
    Ok(&modes[dist.sample(rng)])
}

/// Runs the full §4.7 procedure: chooses a mode, applies its rules, expands
/// risk-group selections, and returns the resulting node/link exclusion set.
pub fn apply_failures(
    policy: &FailurePolicy,
    nodes: &[Node],
    links: &[Link],
    risk_groups: &RiskGroupTree,
    seed: Option<u64>,
) -> ScenarioResult<ExclusionMask> {
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    };

    let mode = choose_mode(&policy.modes, &policy.name, &mut rng)?;

    let mut failed_nodes = IndexSet::new();
    let mut failed_links = IndexSet::new();
    let mut failed_groups = IndexSet::new();

    for rule in &mode.rules {
        let selected = apply_rule(rule, nodes, links, risk_groups, &mut rng)?;
        match rule.scope {
            Scope::Node => failed_nodes.extend(selected),
            Scope::Link => failed_links.extend(selected),
            Scope::RiskGroup => failed_groups.extend(selected),
        }
    }

    if policy.expand_children {
        let mut to_expand: Vec<String> = failed_groups.iter().cloned().collect();
        while let Some(name) = to_expand.pop() {
            if let Ok(descendants) = risk_groups.expand_children(&name) {
                for d in descendants {
                    if failed_groups.insert(d.clone()) {
                        to_expand.push(d);
                    }
                }
            }
        }
    }

    if policy.expand_groups && !failed_groups.is_empty() {
        for node in nodes {
            if node.risk_groups.iter().any(|g| failed_groups.contains(g)) {
                failed_nodes.insert(node.name.clone());
            }
        }
        for link in links {
            if link.risk_groups.iter().any(|g| failed_groups.contains(g)) {
                failed_links.insert(link.id.clone());
            }
        }
    }

    failed_nodes.sort();
    failed_links.sort();
    Ok(ExclusionMask {
        nodes: failed_nodes,
        links: failed_links,
    })
}
