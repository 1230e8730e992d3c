//! Unified error type for path finding, capacity placement, max-flow, flow policy,
//! and demand placement.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum AlgoError {
    #[error(transparent)]
    Graph(#[from] netgraph_core::GraphError),

    #[error("unknown source node: {0}")]
    UnknownSource(String),

    #[error("unknown destination node: {0}")]
    UnknownDestination(String),

    #[error("unsupported flow-placement strategy: {0}")]
    UnsupportedStrategy(String),

    #[error("capacity invariant violated on edge {edge}: flow {flow} exceeds capacity {capacity} by more than tolerance")]
    CapacityInvariantViolated {
        edge: String,
        flow: f64,
        capacity: f64,
    },

    #[error("invalid selector pattern: {0}")]
    InvalidSelector(String),

    #[error("no nodes matched selector: {0}")]
    EmptySelection(String),
}

pub type AlgoResult<T> = Result<T, AlgoError>;
