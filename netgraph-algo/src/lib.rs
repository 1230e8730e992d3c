//! Algorithm layer: Path Engine (§4.2), Capacity Engine (§4.3), Max-Flow Engine
//! (§4.4), Flow Policy (§4.5), and Demand Manager (§4.6), all operating on the
//! [`netgraph_core::WorkingGraph`] built by the core crate.

pub mod capacity;
pub mod consts;
pub mod demand;
pub mod error;
pub mod flow_policy;
pub mod maxflow;
pub mod msd;
pub mod path;

pub use capacity::{calculate_flow, place_flow_on_graph, remove_flow_from_graph, FlowPlacement, PlacementOutcome};
pub use demand::{place_demands, Demand, DemandPlacementResult, GroupBy};
pub use error::{AlgoError, AlgoResult};
pub use msd::{max_supported_demand, MsdConfig};
pub use flow_policy::{FlowPolicy, FlowPolicyConfig};
pub use maxflow::{
    max_flow, max_flow_combine, max_flow_pairwise, saturated_edges, sensitivity_analysis, GroupMode, MaxFlowOptions,
    MaxFlowSummary,
};
pub use path::{k_shortest_paths, shortest_path_first, EdgeSelection, KspConfig, Path, PathBundle, PathStep, SpfTree};
