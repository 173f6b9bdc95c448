//! Table assembly: normalized tuple streams into the three output tables.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;

use super::diag::Diagnostics;
use super::normalize::normalize_chain;
use super::{CourseTuple, Polarity, TupleKind, CHAIN_SEP};

/// Which sub-type of audit a document represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    Core = 0,
    GenEd = 1,
}

impl AuditKind {
    pub fn as_i64(self) -> i64 {
        self as i64
    }
}

/// Identifies where a document's tuples came from: one (major, kind)
/// pair, derived from file layout rather than chain content.
#[derive(Debug, Clone)]
pub struct DocumentTag {
    pub major: String,
    pub kind: AuditKind,
}

impl DocumentTag {
    pub fn new(major: impl Into<String>, kind: AuditKind) -> Self {
        Self {
            major: major.into(),
            kind,
        }
    }

    /// Synthetic composite key: `{major}_{kind}`.
    pub fn audit_id(&self) -> String {
        format!("{}_{}", self.major, self.kind as u8)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRow {
    pub audit_id: String,
    pub name: String,
    pub kind: i64,
    pub major: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementRow {
    pub requirement: String,
    pub audit_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseMappingRow {
    pub requirement: String,
    pub course_code: String,
}

#[derive(Debug)]
pub struct ExtractedTables {
    pub audits: Vec<AuditRow>,
    pub requirements: Vec<RequirementRow>,
    pub mappings: Vec<CourseMappingRow>,
}

/// Permanent post-hoc exclusions: (major, exact normalized chain) pairs
/// that must never reach the output tables (administrative top-level
/// nodes that leak into the data for some majors).
#[derive(Debug, Default, Deserialize)]
pub struct ExclusionConfig(BTreeMap<String, BTreeSet<String>>);

impl ExclusionConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn is_excluded(&self, major: &str, chain: &str) -> bool {
        self.0
            .get(major)
            .is_some_and(|chains| chains.contains(chain))
    }
}

/// Folds per-document tuple streams into the three deduplicated tables.
/// This is the single sequential step of the batch; everything upstream
/// of it is pure per-document work.
pub struct TableBuilder<'a> {
    universe: &'a BTreeSet<String>,
    exclusions: &'a ExclusionConfig,
    mappings: BTreeSet<(String, String)>,
    chain_audits: BTreeMap<String, BTreeSet<String>>,
    audit_meta: BTreeMap<String, (AuditKind, String)>,
}

impl<'a> TableBuilder<'a> {
    pub fn new(universe: &'a BTreeSet<String>, exclusions: &'a ExclusionConfig) -> Self {
        Self {
            universe,
            exclusions,
            mappings: BTreeSet::new(),
            chain_audits: BTreeMap::new(),
            audit_meta: BTreeMap::new(),
        }
    }

    pub fn add_document(
        &mut self,
        tag: &DocumentTag,
        tuples: &[CourseTuple],
        diag: &mut Diagnostics,
    ) {
        let audit_id = tag.audit_id();
        for tuple in tuples {
            let chain = normalize_chain(&tuple.chain);
            if chain.is_empty() || self.exclusions.is_excluded(&tag.major, &chain) {
                continue;
            }
            if tuple.polarity == Polarity::Exclude {
                // Exclusions only suppress a matching inclusion, and no
                // suppression pass exists; count them so the gap shows
                // up in the run summary.
                diag.excluded_tuples += 1;
                continue;
            }

            self.audit_meta
                .entry(audit_id.clone())
                .or_insert_with(|| (tag.kind, tag.major.clone()));
            self.chain_audits
                .entry(chain.clone())
                .or_default()
                .insert(audit_id.clone());

            match tuple.kind {
                TupleKind::Code => {
                    // Expand a department code against the live course
                    // universe. Zero matches is fine, not an error.
                    for course in self.universe {
                        if course.get(..2) == Some(tuple.code.as_str()) {
                            self.mappings.insert((chain.clone(), course.clone()));
                        }
                    }
                }
                TupleKind::Course => {
                    // Codes outside the universe reference retired or
                    // non-undergraduate courses; drop them.
                    if self.universe.contains(&tuple.code) {
                        self.mappings.insert((chain.clone(), tuple.code.clone()));
                    }
                }
            }
        }
    }

    pub fn finish(self, diag: &mut Diagnostics) -> ExtractedTables {
        let mut requirements = Vec::with_capacity(self.chain_audits.len());
        let mut audit_names: BTreeMap<String, String> = BTreeMap::new();

        for (chain, audit_ids) in &self.chain_audits {
            // One chain must belong to one audit. Ties are a data-quality
            // signal; break them deterministically on the lowest id.
            let Some(audit_id) = audit_ids.iter().next() else {
                continue;
            };
            if audit_ids.len() > 1 {
                let ids: Vec<&str> = audit_ids.iter().map(String::as_str).collect();
                diag.warn(format!(
                    "requirement '{chain}' claimed by audits [{}]; keeping {audit_id}",
                    ids.join(", ")
                ));
            }
            requirements.push(RequirementRow {
                requirement: chain.clone(),
                audit_id: audit_id.clone(),
            });

            let head = chain
                .split(CHAIN_SEP)
                .next()
                .unwrap_or(chain.as_str())
                .to_string();
            audit_names.entry(audit_id.clone()).or_insert(head);
        }

        let audits = audit_names
            .into_iter()
            .filter_map(|(audit_id, name)| {
                let (kind, major) = self.audit_meta.get(&audit_id)?;
                Some(AuditRow {
                    audit_id,
                    name,
                    kind: kind.as_i64(),
                    major: major.clone(),
                })
            })
            .collect();

        let mappings = self
            .mappings
            .into_iter()
            .map(|(requirement, course_code)| CourseMappingRow {
                requirement,
                course_code,
            })
            .collect();

        ExtractedTables {
            audits,
            requirements,
            mappings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::CourseTuple;

    fn universe(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    fn include_course(code: &str, chain: &str) -> CourseTuple {
        CourseTuple::course(code, chain)
    }

    fn include_code(code: &str, chain: &str) -> CourseTuple {
        CourseTuple {
            code: code.to_string(),
            chain: chain.to_string(),
            polarity: Polarity::Include,
            kind: TupleKind::Code,
        }
    }

    #[test]
    fn code_expands_against_universe() {
        let uni = universe(&["15-112", "15-213", "67-200"]);
        let exclusions = ExclusionConfig::default();
        let mut builder = TableBuilder::new(&uni, &exclusions);
        let mut diag = Diagnostics::new();

        let tag = DocumentTag::new("x", AuditKind::Core);
        builder.add_document(&tag, &[include_code("15", "BS in X---Any CS")], &mut diag);
        let tables = builder.finish(&mut diag);

        let pairs: Vec<(&str, &str)> = tables
            .mappings
            .iter()
            .map(|m| (m.requirement.as_str(), m.course_code.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![("BS in X---Any CS", "15-112"), ("BS in X---Any CS", "15-213")]
        );
    }

    #[test]
    fn courses_outside_universe_are_dropped() {
        let uni = universe(&["15-112"]);
        let exclusions = ExclusionConfig::default();
        let mut builder = TableBuilder::new(&uni, &exclusions);
        let mut diag = Diagnostics::new();

        let tag = DocumentTag::new("x", AuditKind::Core);
        builder.add_document(
            &tag,
            &[
                include_course("15-112", "BS in X---Core"),
                include_course("15-999", "BS in X---Core"),
            ],
            &mut diag,
        );
        let tables = builder.finish(&mut diag);
        assert_eq!(tables.mappings.len(), 1);
        assert_eq!(tables.mappings[0].course_code, "15-112");
        // The requirement line survives even though one course was dropped.
        assert_eq!(tables.requirements.len(), 1);
    }

    #[test]
    fn duplicate_mappings_collapse_silently() {
        let uni = universe(&["15-112"]);
        let exclusions = ExclusionConfig::default();
        let mut builder = TableBuilder::new(&uni, &exclusions);
        let mut diag = Diagnostics::new();

        let tag = DocumentTag::new("x", AuditKind::Core);
        builder.add_document(
            &tag,
            &[
                include_course("15-112", "BS in X---Core"),
                include_course("15-112", "BS in X---Core"),
            ],
            &mut diag,
        );
        let tables = builder.finish(&mut diag);
        assert_eq!(tables.mappings.len(), 1);
        assert_eq!(diag.warning_count(), 0);
    }

    #[test]
    fn exclusion_tuples_are_counted_not_mapped() {
        let uni = universe(&["15-112"]);
        let exclusions = ExclusionConfig::default();
        let mut builder = TableBuilder::new(&uni, &exclusions);
        let mut diag = Diagnostics::new();

        let tag = DocumentTag::new("x", AuditKind::Core);
        builder.add_document(
            &tag,
            &[CourseTuple {
                code: "15-112".into(),
                chain: "BS in X---Core".into(),
                polarity: Polarity::Exclude,
                kind: TupleKind::Course,
            }],
            &mut diag,
        );
        let tables = builder.finish(&mut diag);
        assert!(tables.mappings.is_empty());
        assert!(tables.requirements.is_empty());
        assert_eq!(diag.excluded_tuples, 1);
    }

    #[test]
    fn chain_conflict_warns_and_keeps_lowest_audit() {
        let uni = universe(&["15-112"]);
        let exclusions = ExclusionConfig::default();
        let mut builder = TableBuilder::new(&uni, &exclusions);
        let mut diag = Diagnostics::new();

        let shared = include_course("15-112", "Shared---Line");
        builder.add_document(&DocumentTag::new("y", AuditKind::Core), &[shared.clone()], &mut diag);
        builder.add_document(&DocumentTag::new("x", AuditKind::Core), &[shared], &mut diag);
        let tables = builder.finish(&mut diag);

        assert_eq!(tables.requirements.len(), 1);
        assert_eq!(tables.requirements[0].audit_id, "x_0");
        assert_eq!(diag.warning_count(), 1);
        assert!(diag.warnings()[0].contains("Shared---Line"));
    }

    #[test]
    fn major_exclusion_config_drops_exact_chains() {
        let uni = universe(&["15-112"]);
        let exclusions =
            ExclusionConfig::from_json(r#"{"x": ["Administrative---Holds"]}"#).unwrap();
        let mut builder = TableBuilder::new(&uni, &exclusions);
        let mut diag = Diagnostics::new();

        let tag = DocumentTag::new("x", AuditKind::Core);
        builder.add_document(
            &tag,
            &[
                include_course("15-112", "Administrative---Holds"),
                include_course("15-112", "BS in X---Core"),
            ],
            &mut diag,
        );
        let tables = builder.finish(&mut diag);
        assert_eq!(tables.requirements.len(), 1);
        assert_eq!(tables.requirements[0].requirement, "BS in X---Core");

        // Same chain under another major is unaffected.
        assert!(!exclusions.is_excluded("y", "Administrative---Holds"));
    }

    #[test]
    fn chains_are_normalized_before_assembly() {
        let uni = universe(&["15-112"]);
        let exclusions = ExclusionConfig::default();
        let mut builder = TableBuilder::new(&uni, &exclusions);
        let mut diag = Diagnostics::new();

        let tag = DocumentTag::new("x", AuditKind::Core);
        builder.add_document(
            &tag,
            &[include_course("15-112", "BS in X---Core---15-112")],
            &mut diag,
        );
        let tables = builder.finish(&mut diag);
        assert_eq!(tables.requirements[0].requirement, "BS in X---Core");
    }

    #[test]
    fn audit_row_from_chain_head_segment() {
        let uni = universe(&["15-112", "76-101"]);
        let exclusions = ExclusionConfig::default();
        let mut builder = TableBuilder::new(&uni, &exclusions);
        let mut diag = Diagnostics::new();

        let core = DocumentTag::new("x", AuditKind::Core);
        let gened = DocumentTag::new("x", AuditKind::GenEd);
        builder.add_document(&core, &[include_course("15-112", "BS in X---Core")], &mut diag);
        builder.add_document(&gened, &[include_course("76-101", "GenEd---Writing")], &mut diag);
        let tables = builder.finish(&mut diag);

        assert_eq!(tables.audits.len(), 2);
        let core_row = tables.audits.iter().find(|a| a.audit_id == "x_0").unwrap();
        assert_eq!(core_row.name, "BS in X");
        assert_eq!(core_row.kind, 0);
        assert_eq!(core_row.major, "x");
        let gened_row = tables.audits.iter().find(|a| a.audit_id == "x_1").unwrap();
        assert_eq!(gened_row.name, "GenEd");
        assert_eq!(gened_row.kind, 1);
    }

    #[test]
    fn code_with_no_universe_matches_is_not_an_error() {
        let uni = universe(&["67-200"]);
        let exclusions = ExclusionConfig::default();
        let mut builder = TableBuilder::new(&uni, &exclusions);
        let mut diag = Diagnostics::new();

        let tag = DocumentTag::new("x", AuditKind::Core);
        builder.add_document(&tag, &[include_code("15", "BS in X---Any CS")], &mut diag);
        let tables = builder.finish(&mut diag);
        assert!(tables.mappings.is_empty());
        assert_eq!(diag.warning_count(), 0);
    }
}
