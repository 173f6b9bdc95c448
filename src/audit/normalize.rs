//! Requirement-chain normalization.
//!
//! Raw chains pick up cosmetic trailing decoration during the walk:
//! appended course codes (bare course leaves add themselves as a chain
//! segment), arrow separators from display names, and stray dash runs.
//! Normalization strips all of it down to the semantic prefix.

use std::sync::LazyLock;

use regex::Regex;

static ARROW_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:→|->|--)\s*[A-Za-z0-9]{2}-[0-9]{3}\s*$").unwrap());
static BARE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[\s-])[A-Za-z0-9]{2}-[0-9]{3}\s*$").unwrap());
static TRAILING_ARROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:→|->|--)\s*$").unwrap());

/// Strip trailing course-code and arrow/dash decoration from a chain.
///
/// Runs the stripping passes to a fixpoint, so the function is
/// idempotent by construction: stacked decorations all come off, and a
/// clean chain passes through untouched.
pub fn normalize_chain(raw: &str) -> String {
    let mut chain = raw.to_string();
    loop {
        let before = chain.clone();
        chain = ARROW_CODE_RE.replace(&chain, "").into_owned();
        chain = BARE_CODE_RE.replace(&chain, "").into_owned();
        chain = TRAILING_ARROW_RE.replace(&chain, "").into_owned();
        chain = chain
            .trim_end_matches([' ', '-', '→', '>'])
            .to_string();
        if chain == before {
            return chain;
        }
    }
}
