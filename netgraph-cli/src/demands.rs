//! Loads a demand set (§4.6) from a JSON file — `Demand` already derives
//! `Serialize`/`Deserialize`, so this is a thin wrapper, not a format of its own.

use anyhow::{Context, Result};
use netgraph_algo::Demand;
use std::path::Path;

pub fn load_demands(path: &Path) -> Result<Vec<Demand>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading demands {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing demands {}", path.display()))
}
