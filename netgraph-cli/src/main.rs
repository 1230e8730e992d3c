//! Thin ambient CLI: logging init, TOML run configuration, and a handful of
//! subcommands exercising max-flow, demand placement, and Monte Carlo end to
//! end. The declarative-document parser, blueprint expander, hardware
//! aggregator, and notebook renderer this system's prose describes elsewhere
//! are not reimplemented here.

mod cli;
mod config;
mod demands;
mod policy;
mod topology;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::RunConfig;
use netgraph_algo::MaxFlowOptions;
use netgraph_batch::{demand_placement, max_flow_per_pair, run_monte_carlo, MonteCarloConfig};
use netgraph_core::Network;
use netgraph_results::{ResultStore, ScenarioSnapshot};
use std::process::ExitCode;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

/// §7 exit codes: 0 success, 1 configuration error, 2 runtime error, 3 partial
/// success (some Monte Carlo iterations failed).
const EXIT_OK: u8 = 0;
const EXIT_CONFIG_ERROR: u8 = 1;
const EXIT_RUNTIME_ERROR: u8 = 2;
const EXIT_PARTIAL_SUCCESS: u8 = 3;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder().with_max_level(cli.log_level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = match config::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("configuration error: {err:?}");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    match run(&cli.command, &config) {
        Ok(mut outcome) => {
            outcome.value["generated_at"] = serde_json::json!(chrono::Utc::now().to_rfc3339());
            println!("{}", serde_json::to_string_pretty(&outcome.value).expect("Value is always serializable"));
            ExitCode::from(if outcome.had_failures { EXIT_PARTIAL_SUCCESS } else { EXIT_OK })
        }
        Err(err) => {
            tracing::error!("run failed: {err:?}");
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

struct Outcome {
    value: serde_json::Value,
    had_failures: bool,
}

fn load_network(path: Option<&std::path::Path>) -> Result<Network> {
    match path {
        Some(path) => topology::load_network(path),
        None => {
            info!("no --network given, using the built-in demo diamond");
            Ok(topology::demo_network())
        }
    }
}

fn run(command: &Commands, config: &RunConfig) -> Result<Outcome> {
    match command {
        Commands::MaxFlow { network, src, dst, excluded_nodes, excluded_links } => {
            let network = load_network(network.as_deref())?;
            let options = MaxFlowOptions { with_summary: true, ..MaxFlowOptions::default() };
            let pairs = vec![(src.clone(), dst.clone())];
            let totals = max_flow_per_pair(&network, excluded_nodes, excluded_links, &pairs, options)
                .context("computing max flow")?;
            let flow = totals.get(&(src.clone(), dst.clone())).copied().unwrap_or(0.0);

            let mut store = ResultStore::new();
            store.begin_step("max_flow");
            store.put_data("total_flow", &flow)?;
            store.end_step();
            let value = store.to_json_value(&ScenarioSnapshot { seed: config.seed, ..ScenarioSnapshot::default() });
            Ok(Outcome { value, had_failures: false })
        }
        Commands::DemandPlacement { network, demands, rounds, reoptimize } => {
            let network = load_network(network.as_deref())?;
            let demand_set = demands::load_demands(demands)?;
            let rounds = match rounds {
                Some(n) => netgraph_algo::demand::PlacementRounds::Fixed(*n),
                None => netgraph_algo::demand::PlacementRounds::Auto,
            };
            let result = demand_placement(&network, &[], &[], &demand_set, rounds, *reoptimize).context("placing demands")?;

            let mut store = ResultStore::new();
            store.begin_step("demand_placement");
            store.put_data("result", &result)?;
            store.end_step();
            let value = store.to_json_value(&ScenarioSnapshot { seed: config.seed, ..ScenarioSnapshot::default() });
            Ok(Outcome { value, had_failures: false })
        }
        Commands::MonteCarloMaxFlow { network, policy, src, dst, seed, iterations, parallelism } => {
            let network = load_network(network.as_deref())?;
            let failure_policy = policy::load_policy(policy)?;
            let mc_config = resolve_mc_config(config, *seed, *iterations, *parallelism);
            let src = src.clone();
            let dst = dst.clone();
            let options = MaxFlowOptions::default();

            let result = run_monte_carlo(&network, &failure_policy, &mc_config, |network, excluded_nodes, excluded_links| {
                let pairs = vec![(src.clone(), dst.clone())];
                let totals = max_flow_per_pair(network, excluded_nodes, excluded_links, &pairs, options)?;
                Ok(totals.get(&(src.clone(), dst.clone())).copied().unwrap_or(0.0))
            })
            .context("running Monte Carlo max flow")?;

            let had_failures = result.had_failures();
            let mut store = ResultStore::new();
            store.begin_step("monte_carlo_max_flow");
            store.put_data("result", &result)?;
            store.end_step();
            let value = store.to_json_value(&ScenarioSnapshot { seed: mc_config.seed, ..ScenarioSnapshot::default() });
            Ok(Outcome { value, had_failures })
        }
        Commands::MonteCarloDemandPlacement { network, policy, demands, seed, iterations, parallelism } => {
            let network = load_network(network.as_deref())?;
            let failure_policy = policy::load_policy(policy)?;
            let demand_set = demands::load_demands(demands)?;
            let mc_config = resolve_mc_config(config, *seed, *iterations, *parallelism);

            let result = run_monte_carlo(&network, &failure_policy, &mc_config, |network, excluded_nodes, excluded_links| {
                demand_placement(
                    network,
                    excluded_nodes,
                    excluded_links,
                    &demand_set,
                    netgraph_algo::demand::PlacementRounds::Auto,
                    true,
                )
            })
            .context("running Monte Carlo demand placement")?;

            let had_failures = result.had_failures();
            let mut store = ResultStore::new();
            store.begin_step("monte_carlo_demand_placement");
            store.put_data("result", &result)?;
            store.end_step();
            let value = store.to_json_value(&ScenarioSnapshot { seed: mc_config.seed, ..ScenarioSnapshot::default() });
            Ok(Outcome { value, had_failures })
        }
    }
}

fn resolve_mc_config(config: &RunConfig, seed: Option<u64>, iterations: Option<usize>, parallelism: Option<usize>) -> MonteCarloConfig {
    MonteCarloConfig {
        seed: seed.or(config.seed),
        iterations: iterations.unwrap_or(config.iterations),
        parallelism: parallelism.unwrap_or(config.parallelism),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_flow_on_demo_network_reports_twenty() {
        let command = Commands::MaxFlow {
            network: None,
            src: "A".to_string(),
            dst: "D".to_string(),
            excluded_nodes: vec![],
            excluded_links: vec![],
        };
        let outcome = run(&command, &RunConfig::default()).unwrap();
        assert!(!outcome.had_failures);
        assert_eq!(outcome.value["steps"]["max_flow"]["data"]["total_flow"], serde_json::json!(20.0));
    }

    #[test]
    fn demand_placement_reports_full_demand_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demands.json");
        std::fs::write(
            &path,
            r#"[{
                "label": "a-to-d",
                "source_selector": "^A$",
                "target_selector": "^D$",
                "volume": 5.0,
                "priority": 0,
                "mode": "Combine",
                "group_by": "Flatten",
                "group_attr": null,
                "flow_class": 0,
                "policy": "ShortestPathsEcmp"
            }]"#,
        )
        .unwrap();

        let command = Commands::DemandPlacement { network: None, demands: path, rounds: None, reoptimize: false };
        let outcome = run(&command, &RunConfig::default()).unwrap();
        assert!(!outcome.had_failures);
        assert_eq!(outcome.value["steps"]["demand_placement"]["data"]["result"]["total_placed"], serde_json::json!(5.0));
    }
}
