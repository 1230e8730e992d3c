//! [`ToDict`] implementations for the domain result types produced elsewhere in
//! the workspace — the trait lives here (not alongside those types) so the
//! export format can evolve without the algorithm crates depending on it.

use crate::json::{number_map, safe_number, ToDict};
use netgraph_algo::demand::{DemandPlacementResult, DemandResult};
use netgraph_algo::MaxFlowSummary;
use netgraph_batch::{MonteCarloResult, PatternOutcome};
use netgraph_core::ExclusionMask;
use serde_json::{json, Value};

impl ToDict for ExclusionMask {
    fn to_dict(&self) -> Value {
        json!({
            "nodes": self.nodes.iter().cloned().collect::<Vec<_>>(),
            "links": self.links.iter().cloned().collect::<Vec<_>>(),
        })
    }
}

impl ToDict for DemandResult {
    fn to_dict(&self) -> Value {
        json!({
            "label": self.label,
            "priority": self.priority,
            "requested": safe_number(self.requested),
            "placed": safe_number(self.placed),
            "dropped": safe_number(self.dropped),
            "cost_distribution": number_map(&self.cost_distribution),
        })
    }
}

impl ToDict for DemandPlacementResult {
    fn to_dict(&self) -> Value {
        json!({
            "demands": self.demands.iter().map(ToDict::to_dict).collect::<Vec<_>>(),
            "total_requested": safe_number(self.total_requested),
            "total_placed": safe_number(self.total_placed),
        })
    }
}

impl ToDict for MaxFlowSummary {
    fn to_dict(&self) -> Value {
        json!({
            "total_flow": safe_number(self.total_flow),
            "cost_distribution": number_map(&self.cost_distribution),
            "edge_flow": number_map(&self.edge_flow),
            "residual_capacity": number_map(&self.residual_capacity),
            "reachable_from_src_in_residual": self.reachable_from_src_in_residual.iter().cloned().collect::<Vec<_>>(),
            "min_cut": self.min_cut.iter().map(|(u, v, id)| json!([u, v, id])).collect::<Vec<_>>(),
        })
    }
}

impl<T: ToDict> ToDict for PatternOutcome<T> {
    fn to_dict(&self) -> Value {
        let result = match &self.result {
            Ok(value) => json!({"status": "ok", "value": value.to_dict()}),
            Err(category) => json!({"status": "failed", "error": category}),
        };
        json!({
            "pattern_hash": self.pattern_hash,
            "excluded_nodes": self.excluded_nodes,
            "excluded_links": self.excluded_links,
            "occurrence_count": self.occurrence_count,
            "first_iteration_index": self.first_iteration_index,
            "result": result,
        })
    }
}

impl<T: ToDict> ToDict for MonteCarloResult<T> {
    fn to_dict(&self) -> Value {
        json!({
            "baseline": self.baseline.to_dict(),
            "patterns": self.patterns.iter().map(ToDict::to_dict).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn exclusion_mask_round_trips_through_json() {
        let mut mask = ExclusionMask::new();
        mask.nodes = vec!["A".to_string()].into_iter().collect();
        let value = mask.to_dict();
        assert_eq!(value["nodes"], json!(["A"]));
    }

    #[test]
    fn demand_result_sanitizes_nan_dropped() {
        let result = DemandResult {
            label: "d1".into(),
            priority: 0,
            requested: 0.0,
            placed: 0.0,
            dropped: f64::NAN,
            cost_distribution: Default::default(),
        };
        let value = result.to_dict();
        assert_eq!(value["dropped"], json!("NaN"));
    }
}
