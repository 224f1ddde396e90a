use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const ANCHOR_SEPARATOR: char = '#';

/// A published address: a whole page or an anchor inside a page.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Location {
    Page(String),
    Anchor { path: String, anchor: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed location '{location}': {reason}")]
pub struct ParseLocationError {
    pub location: String,
    pub reason: &'static str,
}

impl Location {
    pub fn page(path: impl Into<String>) -> Self {
        Self::Page(path.into())
    }

    pub fn anchor(path: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self::Anchor {
            path: path.into(),
            anchor: anchor.into(),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Page(path) => path,
            Self::Anchor { path, .. } => path,
        }
    }

    pub fn anchor_name(&self) -> Option<&str> {
        match self {
            Self::Page(_) => None,
            Self::Anchor { anchor, .. } => Some(anchor.as_str()),
        }
    }

    pub fn is_anchor(&self) -> bool {
        matches!(self, Self::Anchor { .. })
    }
}

impl FromStr for Location {
    type Err = ParseLocationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let fail = |reason| ParseLocationError {
            location: raw.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(fail("location is empty"));
        }
        if raw.trim() != raw {
            return Err(fail("location has surrounding whitespace"));
        }

        let Some((path, anchor)) = raw.split_once(ANCHOR_SEPARATOR) else {
            return Ok(Self::Page(raw.to_string()));
        };
        if path.is_empty() {
            return Err(fail("path component is empty"));
        }
        if anchor.is_empty() {
            return Err(fail("anchor component is empty"));
        }
        if anchor.contains(ANCHOR_SEPARATOR) {
            return Err(fail("more than one '#' separator"));
        }
        Ok(Self::anchor(path, anchor))
    }
}

impl TryFrom<String> for Location {
    type Error = ParseLocationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page(path) => f.write_str(path),
            Self::Anchor { path, anchor } => write!(f, "{path}{ANCHOR_SEPARATOR}{anchor}"),
        }
    }
}
