//! Error taxonomy for condition evaluation and failure-policy application (§7).

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ScenarioError {
    #[error(transparent)]
    Graph(#[from] netgraph_core::GraphError),

    #[error("malformed selector pattern: {0}")]
    MalformedSelector(String),

    #[error("comparison operator applied to non-numeric operand at '{0}'")]
    InvalidConditionOperand(String),

    #[error("'contains'/'not_contains' requires a string or array left operand at '{0}'")]
    InvalidContainsOperand(String),

    #[error("'in'/'not_in' requires an array right operand in condition on '{0}'")]
    InvalidInOperand(String),

    #[error("failure mode weights sum to zero in policy '{0}'")]
    ZeroSumWeights(String),

    #[error("unknown failure policy: {0}")]
    UnknownPolicy(String),

    #[error("unknown risk group: {0}")]
    UnknownRiskGroup(String),
}

pub type ScenarioResult<T> = Result<T, ScenarioError>;
