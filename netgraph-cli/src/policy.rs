//! Loads a failure policy (§4.7) from a JSON file — `FailurePolicy` already
//! derives `Serialize`/`Deserialize`.

use anyhow::{Context, Result};
use netgraph_scenarios::FailurePolicy;
use std::path::Path;

pub fn load_policy(path: &Path) -> Result<FailurePolicy> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading failure policy {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing failure policy {}", path.display()))
}
