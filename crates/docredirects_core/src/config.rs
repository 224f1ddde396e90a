use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::script::ANCHOR_PLACEHOLDER;

pub const DEFAULT_RECORDS_PATH: &str = "redirects.json";
pub const DEFAULT_REGISTRY_PATH: &str = "build/xref-targets.json";

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RedirectsConfig {
    #[serde(default)]
    pub redirects: RedirectsSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct RedirectsSection {
    pub records: Option<String>,
    pub registry: Option<String>,
    pub script_template: Option<String>,
    pub placeholder: Option<String>,
}

impl RedirectsConfig {
    /// Placeholder token of a custom script template; the embedded template's token otherwise.
    pub fn placeholder(&self) -> &str {
        self.redirects
            .placeholder
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(ANCHOR_PLACEHOLDER)
    }

    pub fn records(&self) -> Option<&str> {
        non_empty(self.redirects.records.as_deref())
    }

    pub fn registry(&self) -> Option<&str> {
        non_empty(self.redirects.registry.as_deref())
    }

    pub fn script_template(&self) -> Option<&str> {
        non_empty(self.redirects.script_template.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Load and parse a RedirectsConfig from a TOML file. Returns default if file doesn't exist.
pub fn load_config(config_path: &Path) -> Result<RedirectsConfig> {
    if !config_path.exists() {
        return Ok(RedirectsConfig::default());
    }
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("failed to read {}", config_path.display()))?;
    let parsed: RedirectsConfig = toml::from_str(&content)
        .with_context(|| format!("failed to parse {}", config_path.display()))?;
    Ok(parsed)
}
