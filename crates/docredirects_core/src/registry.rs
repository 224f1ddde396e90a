use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::location::Location;

/// Where a live identifier is rendered right now. Only `path` matters to redirects; the
/// rest is metadata the rendering pipeline may attach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XrefTarget {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl XrefTarget {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            title: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawXrefTarget {
    Path(String),
    Target(XrefTarget),
}

impl From<RawXrefTarget> for XrefTarget {
    fn from(value: RawXrefTarget) -> Self {
        match value {
            RawXrefTarget::Path(path) => XrefTarget::new(path),
            RawXrefTarget::Target(target) => target,
        }
    }
}

/// Snapshot of every identifier present in the built documentation and its canonical page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CurrentLocations {
    targets: BTreeMap<String, XrefTarget>,
}

impl CurrentLocations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_targets(targets: BTreeMap<String, XrefTarget>) -> Result<Self> {
        let mut registry = Self::new();
        for (identifier, target) in targets {
            registry.insert(identifier, target)?;
        }
        Ok(registry)
    }

    pub fn from_paths<I, K, V>(paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut registry = Self::new();
        for (identifier, path) in paths {
            registry.insert(identifier.into(), XrefTarget::new(path))?;
        }
        Ok(registry)
    }

    /// Current paths follow the same rules as record locations and must name a whole page.
    pub fn insert(&mut self, identifier: String, target: XrefTarget) -> Result<()> {
        match target.path.parse::<Location>() {
            Ok(Location::Page(_)) => {}
            Ok(Location::Anchor { .. }) => {
                return Err(Error::AnchoredCurrentPath {
                    identifier,
                    path: target.path,
                });
            }
            Err(error) => {
                return Err(Error::MalformedLocation {
                    identifier,
                    location: error.location,
                    reason: error.reason.to_string(),
                });
            }
        }
        self.targets.insert(identifier, target);
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<&XrefTarget> {
        self.targets.get(identifier)
    }

    pub fn path_of(&self, identifier: &str) -> Option<&str> {
        self.targets
            .get(identifier)
            .map(|target| target.path.as_str())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.targets.contains_key(identifier)
    }

    pub fn identifiers_on(&self, page: &str) -> BTreeSet<&str> {
        self.targets
            .iter()
            .filter(|(_, target)| target.path == page)
            .map(|(identifier, _)| identifier.as_str())
            .collect()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &XrefTarget)> {
        self.targets
            .iter()
            .map(|(identifier, target)| (identifier.as_str(), target))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

pub fn parse_registry(content: &str) -> anyhow::Result<CurrentLocations> {
    let raw: BTreeMap<String, RawXrefTarget> =
        serde_json::from_str(content).context("failed to parse current locations as JSON")?;
    let targets = raw
        .into_iter()
        .map(|(identifier, target)| (identifier, XrefTarget::from(target)))
        .collect();
    Ok(CurrentLocations::from_targets(targets)?)
}

pub fn load_registry(path: &Path) -> anyhow::Result<CurrentLocations> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let registry = parse_registry(&content)
        .with_context(|| format!("failed to load current locations from {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        identifiers = registry.len(),
        "loaded current locations"
    );
    Ok(registry)
}
