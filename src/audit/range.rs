//! Course-range expansion.

use super::diag::Diagnostics;
use super::{CourseTuple, Polarity, TupleKind};

/// Sentinel department prefix meaning "unknown department".
const UNKNOWN_DEPT: &str = "XX";

/// A range spanning the whole 001-999 space means "every course in the
/// department" and collapses to a single department-code tuple instead
/// of materializing hundreds of rows.
const FULL_RANGE: (u32, u32) = (1, 999);

/// Expand a begin/end course range into individual course tuples.
///
/// Pure: same input always yields the same output, in ascending numeric
/// order. Malformed or cross-department ranges expand to nothing and
/// record a warning; they never fail the walk.
pub fn expand_range(
    begin: &str,
    end: &str,
    chain: &str,
    polarity: Polarity,
    diag: &mut Diagnostics,
) -> Vec<CourseTuple> {
    let (Some((dept, lo_raw)), Some((dept_end, hi_raw))) = (split_code(begin), split_code(end))
    else {
        diag.warn(format!("malformed course range {begin}..{end} under '{chain}'"));
        return Vec::new();
    };

    if dept != dept_end {
        diag.warn(format!(
            "course range {begin}..{end} crosses departments under '{chain}'"
        ));
        return Vec::new();
    }
    if dept == UNKNOWN_DEPT {
        diag.warn(format!(
            "course range {begin}..{end} has unknown department under '{chain}'"
        ));
        return Vec::new();
    }

    let (Ok(lo), Ok(hi)) = (lo_raw.parse::<u32>(), hi_raw.parse::<u32>()) else {
        diag.warn(format!(
            "unparsable bounds in course range {begin}..{end} under '{chain}'"
        ));
        return Vec::new();
    };

    if (lo, hi) == FULL_RANGE {
        return vec![CourseTuple {
            code: dept.to_string(),
            chain: chain.to_string(),
            polarity,
            kind: TupleKind::Code,
        }];
    }

    (lo..=hi)
        .map(|n| CourseTuple {
            code: format!("{dept}-{n:03}"),
            chain: chain.to_string(),
            polarity,
            kind: TupleKind::Course,
        })
        .collect()
}

/// Split "PP-NNN" into its 2-character department prefix and numeric part.
fn split_code(code: &str) -> Option<(&str, &str)> {
    let (dept, num) = code.split_once('-')?;
    if dept.len() != 2 || num.is_empty() {
        return None;
    }
    Some((dept, num))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expand(begin: &str, end: &str) -> (Vec<CourseTuple>, Diagnostics) {
        let mut diag = Diagnostics::new();
        let out = expand_range(begin, end, "BS in X---Core", Polarity::Include, &mut diag);
        (out, diag)
    }

    #[test]
    fn small_range_enumerates_in_order() {
        let (out, diag) = expand("15-100", "15-102");
        let codes: Vec<&str> = out.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, vec!["15-100", "15-101", "15-102"]);
        assert!(out
            .iter()
            .all(|t| t.polarity == Polarity::Include && t.kind == TupleKind::Course));
        assert!(out.iter().all(|t| t.chain == "BS in X---Core"));
        assert_eq!(diag.warning_count(), 0);
    }

    #[test]
    fn full_range_collapses_to_department_code() {
        let (out, diag) = expand("15-001", "15-999");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, "15");
        assert_eq!(out[0].kind, TupleKind::Code);
        assert_eq!(out[0].polarity, Polarity::Include);
        assert_eq!(diag.warning_count(), 0);
    }

    #[test]
    fn cross_department_range_is_rejected() {
        let (out, diag) = expand("15-100", "67-100");
        assert!(out.is_empty());
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn unknown_department_sentinel_is_rejected() {
        let (out, diag) = expand("XX-100", "XX-200");
        assert!(out.is_empty());
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn unparsable_bounds_warn_and_expand_to_nothing() {
        let (out, diag) = expand("15-1b0", "15-200");
        assert!(out.is_empty());
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn missing_separator_is_malformed() {
        let (out, diag) = expand("15100", "15-200");
        assert!(out.is_empty());
        assert_eq!(diag.warning_count(), 1);
    }

    #[test]
    fn zero_padding() {
        let (out, _) = expand("15-008", "15-010");
        let codes: Vec<&str> = out.iter().map(|t| t.code.as_str()).collect();
        assert_eq!(codes, vec!["15-008", "15-009", "15-010"]);
    }

    #[test]
    fn inverted_range_is_empty() {
        let (out, _) = expand("15-200", "15-100");
        assert!(out.is_empty());
    }
}
