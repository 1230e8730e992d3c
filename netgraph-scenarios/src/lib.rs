//! Scenario-level evaluation: attribute conditions (§6.5) and the Failure Policy
//! Evaluator (§4.7) that turns policy + network state into an [`netgraph_core::ExclusionMask`].

pub mod condition;
pub mod error;
pub mod failure_policy;

pub use condition::{evaluate_all, CombineLogic, Condition, Operator};
pub use error::{ScenarioError, ScenarioResult};
pub use failure_policy::{apply_failures, FailureMode, FailurePolicy, Rule, Scope, SelectionKind};
