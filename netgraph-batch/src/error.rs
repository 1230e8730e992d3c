//! Error taxonomy for the Monte Carlo harness: wraps the lower-layer errors an
//! analysis closure `f` can raise, plus harness-level configuration errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error(transparent)]
    Graph(#[from] netgraph_core::GraphError),

    #[error(transparent)]
    Algo(#[from] netgraph_algo::error::AlgoError),

    #[error(transparent)]
    Scenario(#[from] netgraph_scenarios::ScenarioError),

    #[error("iterations must be at least 1")]
    EmptyRun,

    #[error("parallelism must be at least 1")]
    InvalidParallelism,

    #[error("building rayon thread pool for batch run: {0}")]
    ThreadPool(String),
}

pub type BatchResult<T> = Result<T, BatchError>;
