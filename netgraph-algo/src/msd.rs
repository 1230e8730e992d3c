//! §6.2 "maximum supportable demand": the largest uniform scale factor α for
//! which an entire demand set places with zero drop, found by exponential
//! bracketing followed by binary search (§8 scenario 6).

use crate::consts::TOLERANCE;
use crate::demand::{place_demands, Demand, PlacementRounds};
use crate::error::AlgoResult;
use netgraph_core::{ExclusionMask, Network};

/// Binary-search parameters. Defaults follow §8 scenario 6's probe-count bound:
/// `ceil(log2((alpha_max - alpha_min) / resolution)) + log2(growth_factor * alpha_max / alpha_start)`.
#[derive(Debug, Clone, Copy)]
pub struct MsdConfig {
    pub alpha_min: f64,
    pub alpha_max: f64,
    pub alpha_start: f64,
    pub growth_factor: f64,
    pub resolution: f64,
}

impl Default for MsdConfig {
    fn default() -> Self {
        Self {
            alpha_min: 0.0,
            alpha_max: 1e6,
            alpha_start: 1.0,
            growth_factor: 2.0,
            resolution: 1e-6,
        }
    }
}

fn scaled(demands: &[Demand], alpha: f64) -> Vec<Demand> {
    demands
        .iter()
        .map(|d| Demand {
            volume: d.volume * alpha,
            ..d.clone()
        })
        .collect()
}

/// Feasibility oracle: scale every demand's volume by `alpha` and check the
/// resulting placement drops nothing (within tolerance of the scaled total).
fn feasible_at(
    network: &Network,
    exclusions: &ExclusionMask,
    demands: &[Demand],
    rounds: PlacementRounds,
    reoptimize_after_each_round: bool,
    alpha: f64,
) -> AlgoResult<bool> {
    if alpha <= 0.0 {
        return Ok(true);
    }
    let result = place_demands(network, exclusions, &scaled(demands, alpha), rounds, reoptimize_after_each_round)?;
    let total_dropped: f64 = result.demands.iter().map(|d| d.dropped).sum();
    Ok(total_dropped <= TOLERANCE.max(result.total_requested * 1e-9))
}

/// Finds the maximum α (within `config.resolution`) at which `demands`,
/// uniformly scaled, places fully against `network`. Exponential bracketing
/// locates a feasible/infeasible pair straddling α★, then binary search narrows
/// it to the requested resolution.
pub fn max_supported_demand(
    network: &Network,
    exclusions: &ExclusionMask,
    demands: &[Demand],
    rounds: PlacementRounds,
    reoptimize_after_each_round: bool,
    config: MsdConfig,
) -> AlgoResult<f64> {
    let check = |alpha: f64| feasible_at(network, exclusions, demands, rounds, reoptimize_after_each_round, alpha);

    if demands.is_empty() {
        return Ok(config.alpha_max);
    }

    let mut lo = config.alpha_min;
    let mut hi;

    if check(config.alpha_start)? {
        let mut probe = config.alpha_start;
        lo = probe;
        loop {
            let next = (probe * config.growth_factor).min(config.alpha_max);
            if next <= probe {
                // Saturated alpha_max without finding infeasibility: everything fits.
                return Ok(config.alpha_max);
            }
            if check(next)? {
                lo = next;
                probe = next;
            } else {
                hi = next;
                break;
            }
        }
    } else {
        let mut probe = config.alpha_start;
        hi = probe;
        loop {
            let next = probe / config.growth_factor;
            if next <= config.alpha_min {
                // Nothing above alpha_min is feasible.
                return Ok(config.alpha_min);
            }
            if check(next)? {
                lo = next;
                break;
            } else {
                hi = next;
                probe = next;
            }
        }
    }

    while hi - lo > config.resolution {
        let mid = lo + (hi - lo) / 2.0;
        if check(mid)? {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Ok(lo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow_policy::FlowPolicy;
    use netgraph_core::{Link, Node};

    fn single_link_network(capacity: f64) -> Network {
        let mut net = Network::new();
        net.add_node(Node::new("A")).unwrap();
        net.add_node(Node::new("B")).unwrap();
        net.add_link(Link::new("ab", "A", "B", capacity)).unwrap();
        net
    }

    fn demand(volume: f64) -> Demand {
        Demand {
            label: "d".into(),
            source_selector: "^A$".into(),
            target_selector: "^B$".into(),
            volume,
            priority: 0,
            mode: crate::demand::ExpansionMode::Combine,
            group_by: crate::demand::GroupBy::Flatten,
            group_attr: None,
            flow_class: 0,
            policy: FlowPolicy::ShortestPathsEcmp,
        }
    }

    #[test]
    fn finds_alpha_star_at_the_capacity_boundary() {
        let net = single_link_network(10.0);
        let demands = vec![demand(1.0)];
        let exclusions = ExclusionMask::new();
        let config = MsdConfig { resolution: 1e-4, ..MsdConfig::default() };
        let alpha = max_supported_demand(&net, &exclusions, &demands, PlacementRounds::Auto, false, config).unwrap();
        assert!((alpha - 10.0).abs() < 1e-2, "expected alpha near 10.0, got {alpha}");
    }

    #[test]
    fn empty_demand_set_is_always_feasible() {
        let net = single_link_network(10.0);
        let exclusions = ExclusionMask::new();
        let alpha = max_supported_demand(&net, &exclusions, &[], PlacementRounds::Auto, false, MsdConfig::default()).unwrap();
        assert_eq!(alpha, MsdConfig::default().alpha_max);
    }
}
