//! Constraint resolution: one constraint node to its literal course tuples.

use super::diag::Diagnostics;
use super::node::{Constraint, RawConstraint};
use super::range::expand_range;
use super::{CourseTuple, Polarity, TupleKind};

/// Resolve one constraint into the (course-or-code, chain, polarity, kind)
/// tuples it denotes. Missing sub-fields are empty lists; unknown kinds
/// contribute nothing and are recorded for diagnosis.
pub fn resolve(constraint: &RawConstraint, chain: &str, diag: &mut Diagnostics) -> Vec<CourseTuple> {
    match constraint.classify() {
        Constraint::CourseSet(data) => {
            let mut out: Vec<CourseTuple> = data
                .all_courses()
                .map(|course| CourseTuple::course(course, chain))
                .collect();
            for range in data.all_ranges() {
                let (begin, end) = range.bounds();
                out.extend(expand_range(begin, end, chain, Polarity::Include, diag));
            }
            out
        }
        Constraint::DepartmentSet(data) => {
            let mut out: Vec<CourseTuple> = data
                .codes
                .iter()
                .map(|code| CourseTuple {
                    code: code.clone(),
                    chain: chain.to_string(),
                    polarity: Polarity::Include,
                    kind: TupleKind::Code,
                })
                .collect();
            out.extend(
                data.courses
                    .iter()
                    .map(|course| CourseTuple::course(course, chain)),
            );
            out
        }
        Constraint::ExclusionSet(data) => {
            // Ranges and patterns are deliberately not expanded for
            // exclusions; only explicit course lists count.
            data.all_courses()
                .map(|course| CourseTuple {
                    code: course.to_string(),
                    chain: chain.to_string(),
                    polarity: Polarity::Exclude,
                    kind: TupleKind::Course,
                })
                .collect()
        }
        Constraint::Unknown(kind) => {
            diag.warn(format!("unrecognized constraint type '{kind}' under '{chain}'"));
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_json(json: &str) -> (Vec<CourseTuple>, Diagnostics) {
        let raw: RawConstraint = serde_json::from_str(json).unwrap();
        let mut diag = Diagnostics::new();
        let out = resolve(&raw, "BS in X---Core", &mut diag);
        (out, diag)
    }

    #[test]
    fn course_set_unions_courses_and_ranges() {
        let (out, diag) = resolve_json(
            r#"{"type": "xfromcourseset", "data": {
                "courses": ["15-112"],
                "code_ranges": [["21-120", "21-121"]]}}"#,
        );
        let codes: Vec<&str> = out.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, vec!["15-112", "21-120", "21-121"]);
        assert!(out
            .iter()
            .all(|t| t.polarity == Polarity::Include && t.kind == TupleKind::Course));
        assert_eq!(diag.warning_count(), 0);
    }

    #[test]
    fn course_set_legacy_conditional_shape() {
        let (out, _) = resolve_json(
            r#"{"type": "xfromcourseset", "data": {
                "conditional_course_sets": [
                    {"courses": ["76-101"], "code_ranges": [{"begin": "80-100", "end": "80-101"}]}
                ]}}"#,
        );
        let codes: Vec<&str> = out.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, vec!["76-101", "80-100", "80-101"]);
    }

    #[test]
    fn department_set_emits_codes_and_extra_courses() {
        let (out, _) = resolve_json(
            r#"{"type": "xfromdc", "data": {"codes": ["15", "17"], "courses": ["21-127"]}}"#,
        );
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].code, "15");
        assert_eq!(out[0].kind, TupleKind::Code);
        assert_eq!(out[1].code, "17");
        assert_eq!(out[1].kind, TupleKind::Code);
        assert_eq!(out[2].code, "21-127");
        assert_eq!(out[2].kind, TupleKind::Course);
        assert!(out.iter().all(|t| t.polarity == Polarity::Include));
    }

    #[test]
    fn exclusion_set_emits_exclusions_and_ignores_ranges() {
        let (out, diag) = resolve_json(
            r#"{"type": "notcountcourseset", "data": {
                "courses": ["15-050"],
                "code_ranges": [["15-060", "15-070"]]}}"#,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, "15-050");
        assert_eq!(out[0].polarity, Polarity::Exclude);
        assert_eq!(out[0].kind, TupleKind::Course);
        assert_eq!(diag.warning_count(), 0);
    }

    #[test]
    fn exclusion_set_reads_conditional_shape_too() {
        let (out, _) = resolve_json(
            r#"{"type": "notcountcourseset", "data": {
                "conditional_course_sets": [{"courses": ["15-051"]}]}}"#,
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, "15-051");
        assert_eq!(out[0].polarity, Polarity::Exclude);
    }

    #[test]
    fn unknown_kind_warns_and_contributes_nothing() {
        let (out, diag) = resolve_json(r#"{"type": "xfromgpa", "data": {"min": 2.0}}"#);
        assert!(out.is_empty());
        assert_eq!(diag.warning_count(), 1);
        assert!(diag.warnings()[0].contains("xfromgpa"));
    }

    #[test]
    fn missing_data_resolves_to_nothing() {
        let (out, diag) = resolve_json(r#"{"type": "xfromcourseset"}"#);
        assert!(out.is_empty());
        assert_eq!(diag.warning_count(), 0);
    }
}
