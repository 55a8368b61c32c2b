//! Run configuration.
//!
//! A run configuration is read from YAML or JSON:
//!
//! ```yaml
//! isolation:
//!   propagate: [panicked]
//! checks:
//!   SAMPLE_RAWREADS_0001:
//!     min_reads: 1000
//! ```
//!
//! Every field is optional; missing fields fall back to defaults.

use crate::engine::rule::IsolationPolicy;
use crate::engine::template::TemplateArgs;
use crate::VvError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration for a validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Rule errors allowed to escape isolation
    pub isolation: IsolationPolicy,
    /// Per-check config, keyed by check id
    pub checks: BTreeMap<String, TemplateArgs>,
}

impl RunConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, VvError> {
        serde_yaml::from_str(yaml).map_err(|e| VvError::Parse {
            context: "run config (yaml)".to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, VvError> {
        serde_json::from_str(json).map_err(|e| VvError::Parse {
            context: "run config (json)".to_string(),
            message: e.to_string(),
        })
    }

    /// Load from a file; `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, VvError> {
        let content = std::fs::read_to_string(path).map_err(|e| VvError::Io {
            context: format!("load run config {}", path.display()),
            message: e.to_string(),
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Config for `check_id`, empty if none was given.
    pub fn check_config(&self, check_id: &str) -> TemplateArgs {
        self.checks.get(check_id).cloned().unwrap_or_default()
    }
}
