use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::NodeResult;

/// Env var overriding [`HostConfig::output_dir`].
pub const OUTPUT_DIR_ENV: &str = "OCS_OUTPUT_DIR";
/// Env var overriding [`HostConfig::models_dir`].
pub const MODELS_DIR_ENV: &str = "OCS_MODELS_DIR";

/// Host-managed folders the nodes read from and write to.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Root folder for saved images.
    pub output_dir: PathBuf,
    /// Default target folder for model downloads.
    pub models_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            models_dir: PathBuf::from("models"),
        }
    }
}

impl HostConfig {
    /// Defaults, then the optional JSON file, then environment overrides.
    pub fn load(path: Option<&Path>) -> NodeResult<Self> {
        let cfg = match path {
            Some(p) => Self::from_json_file(p)?,
            None => Self::default(),
        };
        Ok(cfg.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn from_json_file(path: &Path) -> NodeResult<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: Self = serde_json::from_str(&text)
            .with_context(|| format!("parse config '{}'", path.display()))?;
        Ok(cfg)
    }

    /// Apply `OCS_OUTPUT_DIR` / `OCS_MODELS_DIR` from `lookup`; empty values are ignored.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(OUTPUT_DIR_ENV).filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(MODELS_DIR_ENV).filter(|v| !v.is_empty()) {
            self.models_dir = PathBuf::from(dir);
        }
        self
    }
}

#[cfg(test)]
#[path = "../../tests/unit/host/config.rs"]
mod tests;
