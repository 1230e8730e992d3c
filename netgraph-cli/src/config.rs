//! §10.3 Configuration: the TOML run configuration (seed, iterations,
//! parallelism, failure policy name), loaded with `toml` + `serde` from an
//! optional override path or the platform config directory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    #[serde(default)]
    pub failure_policy_name: Option<String>,
}

fn default_iterations() -> usize {
    100
}

fn default_parallelism() -> usize {
    1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: None,
            iterations: default_iterations(),
            parallelism: default_parallelism(),
            failure_policy_name: None,
        }
    }
}

/// Resolves the run configuration: an explicit `--config` path wins, otherwise
/// `$XDG_CONFIG_HOME/netgraph/config.toml` is read if present, otherwise defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<RunConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    match path {
        Some(path) => {
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading config {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(RunConfig::default()),
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("netgraph").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let config = load_config(Some(Path::new("/nonexistent/path/does/not/exist.toml")));
        assert!(config.is_err());
    }

    #[test]
    fn explicit_config_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "seed = 42\niterations = 10\nparallelism = 2\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.iterations, 10);
        assert_eq!(config.parallelism, 2);
    }
}
