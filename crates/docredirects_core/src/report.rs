use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

/// Outcome of checking redirect records against the current locations.
///
/// Every category is computed on every run, so a single report always describes the
/// complete state of the records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Record identifiers absent from the documentation and not kept as rename history.
    pub orphan_identifiers: BTreeSet<String>,
    /// Live identifiers with neither a record nor a place in another record's history.
    pub identifiers_without_redirects: BTreeSet<String>,
    /// Live identifiers whose record does not start with their current output path.
    pub identifiers_missing_current_outpath: BTreeSet<String>,
    /// Historical locations that would have to forward to more than one destination.
    pub divergent_redirects: BTreeSet<String>,
    /// Historical anchors that clash with a live identifier on the same page.
    pub conflicting_anchors: BTreeSet<String>,
    /// Stale anchor redirects on moved pages, mapped to the location they should name.
    pub transitive_redirects: BTreeMap<String, String>,
    /// Server-side table derived in the same pass. Not a violation category.
    pub server_redirects: BTreeMap<String, String>,
    /// Client-side table keyed by `path#anchor`, derived in the same pass.
    pub client_redirects: BTreeMap<String, String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violation_count() == 0
    }

    pub fn violation_count(&self) -> usize {
        self.categories().map(|(_, count)| count).sum()
    }

    /// Category names paired with the number of offending entries, in reporting order.
    pub fn categories(&self) -> impl Iterator<Item = (&'static str, usize)> {
        [
            ("orphan_identifiers", self.orphan_identifiers.len()),
            (
                "identifiers_without_redirects",
                self.identifiers_without_redirects.len(),
            ),
            (
                "identifiers_missing_current_outpath",
                self.identifiers_missing_current_outpath.len(),
            ),
            ("divergent_redirects", self.divergent_redirects.len()),
            ("conflicting_anchors", self.conflicting_anchors.len()),
            ("transitive_redirects", self.transitive_redirects.len()),
        ]
        .into_iter()
    }

    pub fn messages(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if !self.orphan_identifiers.is_empty() {
            lines.push(format!(
                "following identifiers missing in source: {}",
                set_literal(&self.orphan_identifiers)
            ));
        }
        if !self.identifiers_without_redirects.is_empty() {
            lines.push(format!(
                "following identifiers don't have a redirect: {}",
                set_literal(&self.identifiers_without_redirects)
            ));
        }
        if !self.identifiers_missing_current_outpath.is_empty() {
            lines.push(format!(
                "the first location of the following identifiers must be their current output path: {}",
                set_literal(&self.identifiers_missing_current_outpath)
            ));
        }
        if !self.divergent_redirects.is_empty() {
            lines.push(format!(
                "following paths redirect to different locations: {}",
                set_literal(&self.divergent_redirects)
            ));
        }
        if !self.conflicting_anchors.is_empty() {
            lines.push(format!(
                "following anchors found that conflict with identifiers: {}",
                set_literal(&self.conflicting_anchors)
            ));
        }
        if !self.transitive_redirects.is_empty() {
            let modifications = self
                .transitive_redirects
                .iter()
                .map(|(source, destination)| format!("\t{source} -> {destination}"))
                .collect::<Vec<_>>()
                .join("\n");
            lines.push(format!(
                "following paths have server-side redirects, please modify them to represent their final paths:\n{modifications}"
            ));
        }
        lines
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("\n"))
    }
}

fn set_literal(items: &BTreeSet<String>) -> String {
    let quoted = items
        .iter()
        .map(|item| format!("'{item}'"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{quoted}}}")
}
