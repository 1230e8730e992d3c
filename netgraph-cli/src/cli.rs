use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "NetGraph capacity-analysis engine", long_about = None)]
pub struct Cli {
    /// Logging verbosity (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    /// Explicit run-configuration TOML path; defaults to the platform config dir
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Max flow between two nodes, with the optional §4.4 summary.
    MaxFlow {
        /// Network topology JSON; omit to use the built-in demo diamond.
        #[arg(long)]
        network: Option<PathBuf>,
        #[arg(long)]
        src: String,
        #[arg(long)]
        dst: String,
        #[arg(long, value_delimiter = ',')]
        excluded_nodes: Vec<String>,
        #[arg(long, value_delimiter = ',')]
        excluded_links: Vec<String>,
    },
    /// Place a demand set (§4.6) against a network.
    DemandPlacement {
        #[arg(long)]
        network: Option<PathBuf>,
        #[arg(long)]
        demands: PathBuf,
        /// Fixed round count; omit for the diminishing-returns `Auto` policy.
        #[arg(long)]
        rounds: Option<usize>,
        #[arg(long)]
        reoptimize: bool,
    },
    /// Monte Carlo max flow over a failure policy's sampled patterns (§4.8).
    MonteCarloMaxFlow {
        #[arg(long)]
        network: Option<PathBuf>,
        #[arg(long)]
        policy: PathBuf,
        #[arg(long)]
        src: String,
        #[arg(long)]
        dst: String,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        iterations: Option<usize>,
        #[arg(long)]
        parallelism: Option<usize>,
    },
    /// Monte Carlo demand placement over a failure policy's sampled patterns (§4.8).
    MonteCarloDemandPlacement {
        #[arg(long)]
        network: Option<PathBuf>,
        #[arg(long)]
        policy: PathBuf,
        #[arg(long)]
        demands: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        iterations: Option<usize>,
        #[arg(long)]
        parallelism: Option<usize>,
    },
}
