//! Graph core: the strict multi-directed graph substrate, the authored network data
//! model, and the working-graph view algorithms actually run against.
//!
//! Everything else in NetGraph — path finding, capacity placement, max-flow,
//! failure policy, Monte Carlo — builds on the types exported here.

pub mod attrs;
pub mod error;
pub mod graph;
pub mod ids;
pub mod model;
pub mod working;

pub use attrs::{AttrMap, AttrValue};
pub use error::{GraphError, GraphResult};
pub use graph::StrictMultiDiGraph;
pub use ids::{derive_child_seed, FlowIndex, Sequence};
pub use model::{Link, Network, Node, RiskGroup, RiskGroupTree};
pub use working::{
    build_working_graph, ExclusionMask, WorkingEdge, WorkingGraph, WorkingGraphOptions, WorkingNode,
};
