use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::location::Location;

/// Every location an identifier has been published under.
///
/// `current` is the first entry of the raw list and must match the identifier's canonical
/// output path; `history` holds the older locations that now forward to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectRecord {
    pub current: Location,
    pub history: Vec<Location>,
}

impl RedirectRecord {
    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        std::iter::once(&self.current).chain(self.history.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RedirectRecords {
    records: BTreeMap<String, RedirectRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    Json,
    Yaml,
}

impl RecordFormat {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

impl RedirectRecords {
    pub fn from_raw(raw: BTreeMap<String, Vec<String>>) -> Result<Self> {
        let mut records = BTreeMap::new();
        for (identifier, entries) in raw {
            let mut locations = Vec::with_capacity(entries.len());
            for entry in entries {
                let location =
                    entry
                        .parse::<Location>()
                        .map_err(|error| Error::MalformedLocation {
                            identifier: identifier.clone(),
                            location: error.location,
                            reason: error.reason.to_string(),
                        })?;
                locations.push(location);
            }
            let record = build_record(&identifier, locations)?;
            records.insert(identifier, record);
        }
        Ok(Self { records })
    }

    pub fn from_locations(raw: BTreeMap<String, Vec<Location>>) -> Result<Self> {
        let mut records = BTreeMap::new();
        for (identifier, locations) in raw {
            let record = build_record(&identifier, locations)?;
            records.insert(identifier, record);
        }
        Ok(Self { records })
    }

    pub fn get(&self, identifier: &str) -> Option<&RedirectRecord> {
        self.records.get(identifier)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.records.contains_key(identifier)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RedirectRecord)> {
        self.records
            .iter()
            .map(|(identifier, record)| (identifier.as_str(), record))
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_raw(&self) -> BTreeMap<String, Vec<String>> {
        self.records
            .iter()
            .map(|(identifier, record)| {
                (
                    identifier.clone(),
                    record.locations().map(ToString::to_string).collect(),
                )
            })
            .collect()
    }
}

fn build_record(identifier: &str, locations: Vec<Location>) -> Result<RedirectRecord> {
    let mut locations = locations.into_iter();
    let Some(current) = locations.next() else {
        return Err(Error::EmptyRecord {
            identifier: identifier.to_string(),
        });
    };
    Ok(RedirectRecord {
        current,
        history: locations.collect(),
    })
}

pub fn parse_records(content: &str, format: RecordFormat) -> anyhow::Result<RedirectRecords> {
    let raw: BTreeMap<String, Vec<String>> = match format {
        RecordFormat::Json => {
            serde_json::from_str(content).context("failed to parse redirect records as JSON")?
        }
        RecordFormat::Yaml => {
            serde_yaml::from_str(content).context("failed to parse redirect records as YAML")?
        }
    };
    Ok(RedirectRecords::from_raw(raw)?)
}

pub fn load_records(path: &Path) -> anyhow::Result<RedirectRecords> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let records = parse_records(&content, RecordFormat::from_path(path))
        .with_context(|| format!("failed to load redirect records from {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        identifiers = records.len(),
        "loaded redirect records"
    );
    Ok(records)
}
