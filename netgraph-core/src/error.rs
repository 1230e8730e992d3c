//! Unified error type for the graph core.
//!
//! Mirrors the structural/algorithmic error taxonomy every NetGraph crate follows:
//! a single `thiserror` enum per crate boundary, with a `Result<T, E>` alias and
//! `From` conversions rather than `unwrap`/`expect` in library code.

use thiserror::Error;

/// Errors produced by [`crate::graph::StrictMultiDiGraph`] and the network/working-graph
/// layers built on top of it.
#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum GraphError {
    #[error("duplicate node: {0}")]
    DuplicateNode(String),

    #[error("duplicate edge key: {0}")]
    DuplicateEdge(String),

    #[error("missing endpoint for edge {0} -> {1}")]
    MissingEndpoint(String, String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("unknown edge: {0}")]
    UnknownEdge(String),

    #[error("risk group cycle detected at '{0}'")]
    RiskGroupCycle(String),

    #[error("unknown risk group: {0}")]
    UnknownRiskGroup(String),

    #[error("invalid attribute path '{0}'")]
    InvalidAttrPath(String),
}

pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_node_message() {
        let err = GraphError::DuplicateNode("A".into());
        assert!(err.to_string().contains("duplicate node"));
        assert!(err.to_string().contains('A'));
    }
}
