//! §4.8 Monte Carlo Harness: baseline-first, seeded, deduplicated, parallel
//! iteration over a failure policy.

use crate::error::{BatchError, BatchResult};
use crate::pattern::pattern_hash;
use indexmap::IndexMap;
use netgraph_core::{derive_child_seed, Network};
use netgraph_scenarios::{apply_failures, FailurePolicy};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

/// Harness-level run configuration (§4.8 contract parameters).
#[derive(Debug, Clone)]
pub struct MonteCarloConfig {
    pub iterations: usize,
    pub parallelism: usize,
    pub seed: Option<u64>,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            parallelism: 1,
            seed: None,
        }
    }
}

/// One deduplicated failure pattern and the result of running `f` against it
/// once. A failed iteration (§7: "captured and recorded as a failed iteration
/// without aborting the whole run") carries a short error category string
/// instead of aborting the harness.
#[derive(Debug, Clone)]
pub struct PatternOutcome<T> {
    pub pattern_hash: u64,
    pub excluded_nodes: Vec<String>,
    pub excluded_links: Vec<String>,
    pub occurrence_count: usize,
    pub first_iteration_index: usize,
    pub result: Result<T, String>,
}

/// Full harness output: the distinguished baseline plus one entry per unique
/// failure pattern observed, ordered by first occurrence. Baseline failures
/// abort the run (§7), so `baseline` is never itself a captured failure.
#[derive(Debug, Clone)]
pub struct MonteCarloResult<T> {
    pub baseline: T,
    pub patterns: Vec<PatternOutcome<T>>,
}

impl<T> MonteCarloResult<T> {
    /// `true` when at least one pattern's analysis failed — the host CLI maps
    /// this to exit code 3, "partial success with some iterations failed".
    pub fn had_failures(&self) -> bool {
        self.patterns.iter().any(|p| p.result.is_err())
    }
}

struct PendingPattern {
    excluded_nodes: Vec<String>,
    excluded_links: Vec<String>,
    occurrence_count: usize,
    first_iteration_index: usize,
}

/// Runs `f` once per unique failure pattern sampled from `policy` over
/// `config.iterations` draws, plus once more for the always-run empty-exclusion
/// baseline. `f` must be pure and side-effect free in `network` — each call gets
/// its own exclusion set and is free to build its own working graph.
pub fn run_monte_carlo<T, F>(network: &Network, policy: &FailurePolicy, config: &MonteCarloConfig, f: F) -> BatchResult<MonteCarloResult<T>>
where
    T: Send,
    F: Fn(&Network, &[String], &[String]) -> BatchResult<T> + Sync,
{
    if config.iterations == 0 {
        return Err(BatchError::EmptyRun);
    }
    if config.parallelism == 0 {
        return Err(BatchError::InvalidParallelism);
    }

    let baseline = f(network, &[], &[])?;

    let nodes: Vec<_> = network.nodes().cloned().collect();
    let links: Vec<_> = network.links().cloned().collect();
    let risk_groups = network.risk_groups();
    let master_seed = config.seed.unwrap_or(0);

    // Phase 1 (sequential, cheap): sample every iteration's failure pattern and
    // dedup by pattern hash, tracking first-seen order for deterministic output.
    let mut order: Vec<u64> = Vec::new();
    let mut pending: IndexMap<u64, PendingPattern> = IndexMap::new();
    for i in 0..config.iterations {
        let child_seed = derive_child_seed(master_seed, &["monte_carlo", &policy.name, &i.to_string()]);
        let mask = apply_failures(policy, &nodes, &links, risk_groups, Some(child_seed))?;
        let hash = pattern_hash(&mask.nodes.iter().cloned().collect::<Vec<_>>(), &mask.links.iter().cloned().collect::<Vec<_>>());

        match pending.get_mut(&hash) {
            Some(entry) => entry.occurrence_count += 1,
            None => {
                order.push(hash);
                pending.insert(
                    hash,
                    PendingPattern {
                        excluded_nodes: mask.nodes.into_iter().collect(),
                        excluded_links: mask.links.into_iter().collect(),
                        occurrence_count: 1,
                        first_iteration_index: i,
                    },
                );
            }
        }
    }

    // Phase 2 (parallel): invoke f once per unique pattern.
    let pool = ThreadPoolBuilder::new()
        .num_threads(config.parallelism)
        .build()
        .map_err(|e| BatchError::ThreadPool(e.to_string()))?;

    let mut patterns: Vec<PatternOutcome<T>> = pool.install(|| {
        order
            .par_iter()
            .map(|hash| {
                let entry = &pending[hash];
                let result = f(network, &entry.excluded_nodes, &entry.excluded_links).map_err(|e| e.to_string());
                PatternOutcome {
                    pattern_hash: *hash,
                    excluded_nodes: entry.excluded_nodes.clone(),
                    excluded_links: entry.excluded_links.clone(),
                    occurrence_count: entry.occurrence_count,
                    first_iteration_index: entry.first_iteration_index,
                    result,
                }
            })
            .collect()
    });

    patterns.sort_by_key(|p| p.first_iteration_index);

    Ok(MonteCarloResult { baseline, patterns })
}

#[cfg(test)]
mod tests {
    use super::*;
    use netgraph_scenarios::{FailureMode, Rule, Scope, SelectionKind};

    fn always_fail_e1_policy() -> FailurePolicy {
        let mut mode = FailureMode::new("m", 1.0);
        let mut rule = Rule::new(Scope::Link, SelectionKind::All);
        rule.name_filter = Some("^e1$".to_string());
        mode.rules.push(rule);
        FailurePolicy {
            name: "always-e1".into(),
            modes: vec![mode],
            expand_children: false,
            expand_groups: false,
        }
    }

    fn two_node_network() -> Network {
        let mut net = Network::new();
        net.add_node(netgraph_core::Node::new("A")).unwrap();
        net.add_node(netgraph_core::Node::new("B")).unwrap();
        net.add_link(netgraph_core::Link::new("e1", "A", "B", 10.0)).unwrap();
        net.add_link(netgraph_core::Link::new("e2", "A", "B", 10.0)).unwrap();
        net
    }

    #[test]
    fn deterministic_policy_collapses_to_one_pattern() {
        let net = two_node_network();
        let policy = always_fail_e1_policy();
        let config = MonteCarloConfig {
            iterations: 1000,
            parallelism: 2,
            seed: Some(7),
        };
        let result = run_monte_carlo(&net, &policy, &config, |_, _, _| Ok(1u32)).unwrap();
        assert_eq!(result.patterns.len(), 1);
        assert_eq!(result.patterns[0].occurrence_count, 1000);
        assert_eq!(result.patterns[0].excluded_links, vec!["e1".to_string()]);
    }

    #[test]
    fn baseline_always_runs_with_no_exclusions() {
        let net = two_node_network();
        let policy = always_fail_e1_policy();
        let config = MonteCarloConfig {
            iterations: 5,
            parallelism: 1,
            seed: Some(1),
        };
        let result = run_monte_carlo(&net, &policy, &config, |_, excluded_nodes, excluded_links| {
            Ok((excluded_nodes.len(), excluded_links.len()))
        })
        .unwrap();
        assert_eq!(result.baseline, (0, 0));
    }

    #[test]
    fn per_pattern_failure_is_captured_not_propagated() {
        let net = two_node_network();
        let policy = always_fail_e1_policy();
        let config = MonteCarloConfig {
            iterations: 10,
            parallelism: 1,
            seed: Some(3),
        };
        let result = run_monte_carlo(&net, &policy, &config, |_, _excluded_nodes, excluded_links| {
            if excluded_links.is_empty() {
                Ok(0u32)
            } else {
                Err(BatchError::EmptyRun)
            }
        })
        .unwrap();
        assert_eq!(result.baseline, 0);
        assert_eq!(result.patterns.len(), 1);
        assert!(result.patterns[0].result.is_err());
        assert!(result.had_failures());
    }

    #[test]
    fn zero_iterations_is_rejected() {
        let net = two_node_network();
        let policy = always_fail_e1_policy();
        let config = MonteCarloConfig {
            iterations: 0,
            parallelism: 1,
            seed: Some(1),
        };
        let result = run_monte_carlo(&net, &policy, &config, |_, _, _| Ok(()));
        assert!(matches!(result, Err(BatchError::EmptyRun)));
    }
}
