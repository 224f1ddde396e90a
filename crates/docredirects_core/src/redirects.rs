use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::location::Location;
use crate::records::RedirectRecords;
use crate::registry::CurrentLocations;
use crate::report::ValidationReport;
use crate::script::ScriptTemplate;

/// Forward-lookup tables derived from the records of live identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectTables {
    /// Historical page -> current page.
    pub server: BTreeMap<String, String>,
    /// Historical `path#anchor` -> `currentPath#currentIdentifier`.
    pub client: BTreeMap<Location, String>,
}

impl RedirectTables {
    pub fn client_by_location(&self) -> BTreeMap<String, String> {
        self.client
            .iter()
            .map(|(source, target)| (source.to_string(), target.clone()))
            .collect()
    }

    pub fn client_for_page(&self, page: &str) -> BTreeMap<String, String> {
        self.client
            .iter()
            .filter_map(|(source, target)| match source {
                Location::Anchor { path, anchor } if path == page => {
                    Some((anchor.clone(), target.clone()))
                }
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Resolved {
    registry: CurrentLocations,
    tables: RedirectTables,
}

/// Validator and resolver for a documentation manual's redirect records.
///
/// Lookups are only available once [`Redirects::validate`] has succeeded for a registry
/// snapshot. A failed validation drops any earlier snapshot.
#[derive(Debug, Clone)]
pub struct Redirects {
    records: RedirectRecords,
    script: ScriptTemplate,
    resolved: Option<Resolved>,
}

impl Redirects {
    pub fn new(records: RedirectRecords, script: ScriptTemplate) -> Self {
        Self {
            records,
            script,
            resolved: None,
        }
    }

    pub fn records(&self) -> &RedirectRecords {
        &self.records
    }

    pub fn script(&self) -> &ScriptTemplate {
        &self.script
    }

    pub fn is_validated(&self) -> bool {
        self.resolved.is_some()
    }

    /// Run every consistency check without touching the validation state. The report also
    /// carries the tables derived from the records, whether or not they are consistent.
    pub fn check(&self, registry: &CurrentLocations) -> ValidationReport {
        let (report, _) = self.resolve(registry);
        report
    }

    pub fn validate(&mut self, registry: CurrentLocations) -> Result<()> {
        self.resolved = None;
        let (report, tables) = self.resolve(&registry);

        for (category, count) in report.categories() {
            tracing::debug!(category, count, "checked redirect category");
        }
        if !report.is_valid() {
            for (category, count) in report.categories().filter(|(_, count)| *count > 0) {
                tracing::warn!(category, count, "redirect records are inconsistent");
            }
            return Err(Error::InvalidRedirects(Box::new(report)));
        }

        tracing::info!(
            identifiers = registry.len(),
            server_redirects = tables.server.len(),
            client_redirects = tables.client.len(),
            "redirects validated"
        );
        self.resolved = Some(Resolved { registry, tables });
        Ok(())
    }

    pub fn current_locations(&self) -> Result<&CurrentLocations> {
        Ok(&self.resolved()?.registry)
    }

    pub fn tables(&self) -> Result<&RedirectTables> {
        Ok(&self.resolved()?.tables)
    }

    pub fn server_redirects(&self) -> Result<&BTreeMap<String, String>> {
        Ok(&self.resolved()?.tables.server)
    }

    pub fn client_redirects(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.resolved()?.tables.client_by_location())
    }

    /// Anchor -> target mapping for the anchors that used to live on `page`.
    pub fn client_redirects_for(&self, page: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.resolved()?.tables.client_for_page(page))
    }

    /// Delivery script for `page` with its anchor table substituted in.
    pub fn redirects_script(&self, page: &str) -> Result<String> {
        let redirects = self.client_redirects_for(page)?;
        self.script.render(&redirects)
    }

    /// Delivery script carrying the whole client-side table, keyed by `path#anchor`.
    pub fn manual_script(&self, template: &ScriptTemplate) -> Result<String> {
        let redirects = self.client_redirects()?;
        template.render(&redirects)
    }

    fn resolved(&self) -> Result<&Resolved> {
        self.resolved.as_ref().ok_or(Error::NotValidated)
    }

    fn resolve(&self, registry: &CurrentLocations) -> (ValidationReport, RedirectTables) {
        let mut report = ValidationReport::default();
        let mut tables = RedirectTables::default();

        // Anchors kept as history by live records, with the identifiers keeping them.
        let mut history_anchors: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (identifier, record) in self.records.iter() {
            if !registry.contains(identifier) {
                continue;
            }
            for anchor in record.history.iter().filter_map(Location::anchor_name) {
                history_anchors.entry(anchor).or_default().insert(identifier);
            }
        }
        let kept_as_history = |identifier: &str| {
            history_anchors
                .get(identifier)
                .is_some_and(|keepers| keepers.iter().any(|keeper| *keeper != identifier))
        };

        for identifier in self.records.identifiers() {
            if !registry.contains(identifier) && !kept_as_history(identifier) {
                report.orphan_identifiers.insert(identifier.to_string());
            }
        }

        for identifier in registry.identifiers() {
            if !self.records.contains(identifier) && !kept_as_history(identifier) {
                report
                    .identifiers_without_redirects
                    .insert(identifier.to_string());
            }
        }

        for (identifier, record) in self.records.iter() {
            let Some(current_path) = registry.path_of(identifier) else {
                continue;
            };
            if record.current != Location::page(current_path) {
                report
                    .identifiers_missing_current_outpath
                    .insert(identifier.to_string());
            }

            for location in &record.history {
                let (target, previous) = match location {
                    Location::Page(path) => {
                        let target = current_path.to_string();
                        let previous = tables.server.get(path).cloned();
                        if previous.is_none() {
                            tables.server.insert(path.clone(), target.clone());
                        }
                        (target, previous)
                    }
                    Location::Anchor { .. } => {
                        let target = format!("{current_path}#{identifier}");
                        let previous = tables.client.get(location).cloned();
                        if previous.is_none() {
                            tables.client.insert(location.clone(), target.clone());
                        }
                        (target, previous)
                    }
                };
                if previous.is_some_and(|previous| previous != target) {
                    report.divergent_redirects.insert(location.to_string());
                }
            }
        }

        for source in tables.client.keys() {
            let Location::Anchor { path, anchor } = source else {
                continue;
            };
            if registry.identifiers_on(path).contains(anchor.as_str()) {
                report.conflicting_anchors.insert(anchor.clone());
            }
            if tables.server.contains_key(path) {
                let final_path = follow_server_redirects(&tables.server, path);
                report
                    .transitive_redirects
                    .insert(source.to_string(), format!("{final_path}#{anchor}"));
            }
        }

        report.server_redirects = tables.server.clone();
        report.client_redirects = tables.client_by_location();
        (report, tables)
    }
}

fn follow_server_redirects<'a>(server: &'a BTreeMap<String, String>, start: &'a str) -> &'a str {
    let mut seen = BTreeSet::from([start]);
    let mut cursor = start;
    while let Some(next) = server.get(cursor) {
        if !seen.insert(next.as_str()) {
            break;
        }
        cursor = next.as_str();
    }
    cursor
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{Redirects, follow_server_redirects};
    use crate::error::Error;
    use crate::location::Location;
    use crate::records::RedirectRecords;
    use crate::registry::CurrentLocations;
    use crate::script::ScriptTemplate;

    fn redirects(entries: &[(&str, &[&str])]) -> Redirects {
        let raw = entries
            .iter()
            .map(|(identifier, locations)| {
                (
                    identifier.to_string(),
                    locations.iter().map(|item| item.to_string()).collect(),
                )
            })
            .collect::<BTreeMap<String, Vec<String>>>();
        Redirects::new(
            RedirectRecords::from_raw(raw).expect("records"),
            ScriptTemplate::anchor_default(),
        )
    }

    fn registry(entries: &[(&str, &str)]) -> CurrentLocations {
        CurrentLocations::from_paths(entries.iter().copied()).expect("registry")
    }

    #[test]
    fn lookups_fail_before_validation() {
        let redirects = redirects(&[("title", &["index.html"])]);
        assert!(!redirects.is_validated());
        assert!(matches!(
            redirects.client_redirects_for("index.html"),
            Err(Error::NotValidated)
        ));
        assert!(matches!(redirects.server_redirects(), Err(Error::NotValidated)));
        assert!(matches!(
            redirects.redirects_script("index.html"),
            Err(Error::NotValidated)
        ));
    }

    #[test]
    fn failed_validation_drops_previous_snapshot() {
        let mut redirects = redirects(&[("title", &["index.html"])]);
        redirects
            .validate(registry(&[("title", "index.html")]))
            .expect("first validation");
        assert!(redirects.is_validated());

        let error = redirects
            .validate(registry(&[("title", "moved.html")]))
            .expect_err("second validation must fail");
        assert!(error.report().is_some());
        assert!(!redirects.is_validated());
        assert!(matches!(
            redirects.client_redirects_for("index.html"),
            Err(Error::NotValidated)
        ));
    }

    #[test]
    fn check_leaves_state_untouched() {
        let redirects = redirects(&[("title", &["index.html"])]);
        let report = redirects.check(&registry(&[("title", "index.html")]));
        assert!(report.is_valid());
        assert!(!redirects.is_validated());
    }

    #[test]
    fn check_reports_derived_tables_for_valid_records() {
        let redirects = redirects(&[
            ("title", &["index.html", "intro.html"]),
            ("subtitle", &["index.html", "old.html#sub"]),
        ]);
        let report = redirects.check(&registry(&[("title", "index.html"), ("subtitle", "index.html")]));

        assert!(report.is_valid());
        assert_eq!(
            report.server_redirects,
            BTreeMap::from([("intro.html".to_string(), "index.html".to_string())])
        );
        assert_eq!(
            report.client_redirects,
            BTreeMap::from([("old.html#sub".to_string(), "index.html#subtitle".to_string())])
        );
    }

    #[test]
    fn failed_validation_still_reports_derived_tables() {
        let mut redirects = redirects(&[
            ("title", &["index.html", "foo.html"]),
            ("subtitle", &["index.html", "foo.html#bar"]),
        ]);
        let error = redirects
            .validate(registry(&[("title", "index.html"), ("subtitle", "index.html")]))
            .expect_err("transitive redirect must fail");
        let report = error.report().expect("report");

        assert_eq!(report.transitive_redirects.len(), 1);
        assert_eq!(
            report.server_redirects.get("foo.html").map(String::as_str),
            Some("index.html")
        );
        assert_eq!(
            report.client_redirects.get("foo.html#bar").map(String::as_str),
            Some("index.html#subtitle")
        );
    }

    #[test]
    fn records_built_from_locations_resolve_like_raw_records() {
        let records = RedirectRecords::from_locations(BTreeMap::from([
            (
                "sec-new".to_string(),
                vec![
                    Location::page("guide.html"),
                    Location::anchor("index.html", "sec-old"),
                ],
            ),
            ("title".to_string(), vec![Location::page("index.html")]),
        ]))
        .expect("records");
        let mut redirects = Redirects::new(records, ScriptTemplate::anchor_default());
        redirects
            .validate(registry(&[("sec-new", "guide.html"), ("title", "index.html")]))
            .expect("validate");

        assert_eq!(
            redirects.client_redirects_for("index.html").expect("lookup"),
            BTreeMap::from([("sec-old".to_string(), "guide.html#sec-new".to_string())])
        );
        assert!(matches!(
            RedirectRecords::from_locations(BTreeMap::from([("ghost".to_string(), Vec::new())])),
            Err(Error::EmptyRecord { .. })
        ));
    }

    #[test]
    fn client_redirects_are_scoped_to_page() {
        let mut redirects = redirects(&[
            (
                "sec-install",
                &["installation.html", "index.html#install", "old.html#setup"],
            ),
            ("title", &["index.html"]),
        ]);
        redirects
            .validate(registry(&[
                ("sec-install", "installation.html"),
                ("title", "index.html"),
            ]))
            .expect("validate");

        assert_eq!(
            redirects.client_redirects_for("index.html").expect("lookup"),
            BTreeMap::from([(
                "install".to_string(),
                "installation.html#sec-install".to_string()
            )])
        );
        assert_eq!(
            redirects.client_redirects_for("old.html").expect("lookup"),
            BTreeMap::from([(
                "setup".to_string(),
                "installation.html#sec-install".to_string()
            )])
        );
        assert!(
            redirects
                .client_redirects_for("installation.html")
                .expect("lookup")
                .is_empty()
        );
        assert_eq!(redirects.client_redirects().expect("table").len(), 2);
    }

    #[test]
    fn server_redirects_point_at_current_page() {
        let mut redirects = redirects(&[
            ("sec-a", &["guide.html", "a.html"]),
            ("sec-b", &["guide.html", "a.html", "b.html"]),
        ]);
        redirects
            .validate(registry(&[("sec-a", "guide.html"), ("sec-b", "guide.html")]))
            .expect("merged pages share a target");

        let server = redirects.server_redirects().expect("table");
        assert_eq!(server.get("a.html").map(String::as_str), Some("guide.html"));
        assert_eq!(server.get("b.html").map(String::as_str), Some("guide.html"));
    }

    #[test]
    fn redirects_script_embeds_page_table() {
        let mut redirects = redirects(&[
            ("title", &["index.html"]),
            ("sec-new", &["index.html", "index.html#sec-old"]),
        ]);
        redirects
            .validate(registry(&[("title", "index.html"), ("sec-new", "index.html")]))
            .expect("validate");

        let script = redirects.redirects_script("index.html").expect("script");
        assert!(script.contains(r#"const redirects = {"sec-old":"index.html#sec-new"};"#));

        let manual = redirects
            .manual_script(&ScriptTemplate::manual_default())
            .expect("manual script");
        assert!(manual.contains(r#"{"index.html#sec-old":"index.html#sec-new"}"#));
    }

    #[test]
    fn follow_server_redirects_stops_on_cycles() {
        let server = BTreeMap::from([
            ("a.html".to_string(), "b.html".to_string()),
            ("b.html".to_string(), "c.html".to_string()),
            ("loop.html".to_string(), "loop.html".to_string()),
        ]);
        assert_eq!(follow_server_redirects(&server, "a.html"), "c.html");
        assert_eq!(follow_server_redirects(&server, "loop.html"), "loop.html");
        assert_eq!(follow_server_redirects(&server, "other.html"), "other.html");
    }
}
