use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;

use crate::error::{Error, Result};

pub const ANCHOR_PLACEHOLDER: &str = "REDIRECTS_PLACEHOLDER";
pub const MANUAL_PLACEHOLDER: &str = "REDIRECTS_JSON_PLACEHOLDER";

const EMBEDDED_ANCHOR_SCRIPT: &str = include_str!("../../../assets/anchor-redirects.js");
const EMBEDDED_MANUAL_SCRIPT: &str = include_str!("../../../assets/manual-redirects.js");

/// A delivery script with a placeholder token standing in for a JSON redirect table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    source: String,
    placeholder: String,
}

impl ScriptTemplate {
    pub fn new(source: impl Into<String>, placeholder: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let placeholder = placeholder.into();
        if placeholder.is_empty() || !source.contains(&placeholder) {
            return Err(Error::MissingPlaceholder { placeholder });
        }
        Ok(Self {
            source,
            placeholder,
        })
    }

    /// Per-page script keyed by anchor.
    pub fn anchor_default() -> Self {
        Self {
            source: EMBEDDED_ANCHOR_SCRIPT.to_string(),
            placeholder: ANCHOR_PLACEHOLDER.to_string(),
        }
    }

    /// Manual-wide script keyed by `file#anchor`.
    pub fn manual_default() -> Self {
        Self {
            source: EMBEDDED_MANUAL_SCRIPT.to_string(),
            placeholder: MANUAL_PLACEHOLDER.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn render(&self, redirects: &BTreeMap<String, String>) -> Result<String> {
        let table = serde_json::to_string(redirects)?;
        Ok(self.source.replace(&self.placeholder, &table))
    }
}

pub fn load_script_template(path: &Path, placeholder: &str) -> anyhow::Result<ScriptTemplate> {
    let source =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    ScriptTemplate::new(source, placeholder)
        .with_context(|| format!("invalid script template {}", path.display()))
}
