//! Shared numeric tolerances (§9 "Numerical tolerance").

/// Tolerance for "saturated"/"placed" checks and cost-tie detection.
pub const TOLERANCE: f64 = 1e-10;

/// Absolute tolerance for summed-flow checks, meant to be scaled by total flow.
pub const FLOW_SUM_TOLERANCE: f64 = 1e-9;
