//! §4.8 Monte Carlo Harness and its analysis-function wrappers.

pub mod error;
pub mod harness;
pub mod pattern;
pub mod wrappers;

pub use error::{BatchError, BatchResult};
pub use harness::{run_monte_carlo, MonteCarloConfig, MonteCarloResult, PatternOutcome};
pub use pattern::pattern_hash;
pub use wrappers::{demand_placement, max_flow_per_pair, max_supportable_demand, sensitivity};
