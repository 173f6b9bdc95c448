//! Audit extraction core: JSON requirement trees → flat course tuples.
//!
//! Pure over already-parsed input; all file and database I/O stays at
//! the boundary. Per-document processing is independent, so the driver
//! runs it as a rayon map phase and folds the results through
//! [`tables::TableBuilder`] sequentially.

pub mod constraint;
pub mod diag;
pub mod node;
pub mod normalize;
pub mod range;
pub mod tables;
pub mod walker;

use std::sync::LazyLock;

use regex::Regex;

use diag::Diagnostics;
use tables::DocumentTag;

/// Separator joining display names into a requirement chain.
pub const CHAIN_SEP: &str = "---";

static COURSE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]{2}-[0-9]{3}$").unwrap());

/// Whether a string is course-code-shaped: two alphanumerics, hyphen,
/// three digits ("15-112").
pub fn is_course_code(s: &str) -> bool {
    COURSE_CODE_RE.is_match(s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Include,
    Exclude,
}

/// What the `code` field of a tuple holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupleKind {
    /// A literal course code ("15-112").
    Course,
    /// A 2-character department prefix standing for every course in the
    /// department, expanded later against the live course universe.
    Code,
}

/// One flattened fact from the walk: this course (or department code)
/// counts toward (or against) this requirement chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseTuple {
    pub code: String,
    pub chain: String,
    pub polarity: Polarity,
    pub kind: TupleKind,
}

impl CourseTuple {
    pub fn course(code: impl Into<String>, chain: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            chain: chain.into(),
            polarity: Polarity::Include,
            kind: TupleKind::Course,
        }
    }
}

/// Outcome of processing one audit document.
pub struct DocumentResult {
    pub tag: DocumentTag,
    pub tuples: Vec<CourseTuple>,
    pub diag: Diagnostics,
}

/// Parse and flatten one audit document. A document that fails to parse
/// contributes nothing but never aborts the batch.
pub fn process_document(tag: DocumentTag, json: &str) -> DocumentResult {
    let mut diag = Diagnostics::new();
    let tuples = match serde_json::from_str::<node::AuditDocument>(json) {
        Ok(doc) => walker::walk_document(&doc, &mut diag),
        Err(err) => {
            diag.warn(format!(
                "unparsable audit document for {}: {err}",
                tag.audit_id()
            ));
            Vec::new()
        }
    };
    DocumentResult { tag, tuples, diag }
}

// ── Tests ──
