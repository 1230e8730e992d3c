//! §3/§6.3 Result Store: a step-scoped container with exactly two sub-keys per
//! step (`metadata`, `data`), plus the canonical `to_json_value()` export shape.

use crate::error::{ResultsError, ResultsResult};
use crate::json::ToDict;
use indexmap::IndexMap;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
struct StepEntry {
    metadata: Map<String, Value>,
    data: Map<String, Value>,
}

/// A single master seed plus the policy/demand-set snapshots export alongside
/// every result set, so a stored result is reproducible without the original
/// scenario file (§6.3's `"scenario"` top-level key).
#[derive(Debug, Clone, Default)]
pub struct ScenarioSnapshot {
    pub seed: Option<u64>,
    pub failure_policies: Value,
    pub demand_sets: Value,
}

impl ScenarioSnapshot {
    fn to_dict(&self) -> Value {
        serde_json::json!({
            "seed": self.seed,
            "failure_policies": self.failure_policies,
            "demand_sets": self.demand_sets,
        })
    }
}

/// Driver-owned accumulator for one workflow run. Steps are written in order;
/// only one step is "active" (writable) at a time.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    steps: IndexMap<String, StepEntry>,
    active_step: Option<String>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `name` for writing, creating it if this is the first time it's seen.
    /// Steps already opened keep their existing metadata/data across a re-open.
    pub fn begin_step(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.steps.entry(name.clone()).or_default();
        self.active_step = Some(name);
    }

    pub fn end_step(&mut self) {
        self.active_step = None;
    }

    pub fn active_step(&self) -> Option<&str> {
        self.active_step.as_deref()
    }

    pub fn put_metadata(&mut self, key: impl Into<String>, value: &dyn ToDict) -> ResultsResult<()> {
        let entry = self.active_entry_mut()?;
        entry.metadata.insert(key.into(), value.to_dict());
        Ok(())
    }

    pub fn put_data(&mut self, key: impl Into<String>, value: &dyn ToDict) -> ResultsResult<()> {
        let entry = self.active_entry_mut()?;
        entry.data.insert(key.into(), value.to_dict());
        Ok(())
    }

    fn active_entry_mut(&mut self) -> ResultsResult<&mut StepEntry> {
        let name = self.active_step.clone().ok_or(ResultsError::NoActiveStep)?;
        self.steps.get_mut(&name).ok_or(ResultsError::UnknownStep(name))
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.keys().map(String::as_str)
    }

    /// Canonical JSON-safe export shape (§6.3): `workflow` maps each step to its
    /// metadata alone, `steps` maps each step to its full `{metadata, data}`, and
    /// `scenario` carries the seed and policy/demand-set snapshots. Writing the
    /// resulting value to disk is left to the host.
    pub fn to_json_value(&self, scenario: &ScenarioSnapshot) -> Value {
        let mut workflow = Map::new();
        let mut steps = Map::new();
        for (name, entry) in &self.steps {
            workflow.insert(name.clone(), Value::Object(entry.metadata.clone()));
            steps.insert(
                name.clone(),
                serde_json::json!({
                    "metadata": entry.metadata,
                    "data": entry.data,
                }),
            );
        }
        serde_json::json!({
            "workflow": workflow,
            "steps": steps,
            "scenario": scenario.to_dict(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writing_without_active_step_errors() {
        let mut store = ResultStore::new();
        let result = store.put_data("x", &1.0f64);
        assert!(matches!(result, Err(ResultsError::NoActiveStep)));
    }

    #[test]
    fn step_round_trips_metadata_and_data() {
        let mut store = ResultStore::new();
        store.begin_step("max_flow");
        store.put_metadata("units", &"Gbps".to_string()).unwrap();
        store.put_data("total_flow", &20.0f64).unwrap();
        store.end_step();

        let snapshot = ScenarioSnapshot {
            seed: Some(7),
            failure_policies: Value::Array(vec![]),
            demand_sets: Value::Array(vec![]),
        };
        let exported = store.to_json_value(&snapshot);
        assert_eq!(exported["steps"]["max_flow"]["data"]["total_flow"], serde_json::json!(20.0));
        assert_eq!(exported["workflow"]["max_flow"]["units"], serde_json::json!("Gbps"));
        assert_eq!(exported["scenario"]["seed"], serde_json::json!(7));
    }

    #[test]
    fn reopening_a_step_preserves_prior_writes() {
        let mut store = ResultStore::new();
        store.begin_step("s1");
        store.put_data("a", &1.0f64).unwrap();
        store.end_step();
        store.begin_step("s1");
        store.put_data("b", &2.0f64).unwrap();

        let snapshot = ScenarioSnapshot::default();
        let exported = store.to_json_value(&snapshot);
        assert_eq!(exported["steps"]["s1"]["data"]["a"], serde_json::json!(1.0));
        assert_eq!(exported["steps"]["s1"]["data"]["b"], serde_json::json!(2.0));
    }
}
