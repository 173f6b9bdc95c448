//! Course-catalog boundary: loads the course universe used for
//! department-code expansion and course filtering.
//!
//! The catalog export comes from a separate extraction and appears in
//! two shapes: a plain array of course codes, or an array of objects
//! with `code` (and optionally `name`) fields. Entries that are not
//! course-code-shaped are counted and skipped.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::audit::is_course_code;

#[derive(Debug)]
pub struct CatalogCourse {
    pub code: String,
    pub name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogEntry {
    Code(String),
    Record {
        code: String,
        #[serde(default)]
        name: Option<String>,
    },
}

pub fn load_catalog(path: &Path) -> Result<Vec<CatalogCourse>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog file {}", path.display()))?;
    let entries: Vec<CatalogEntry> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse catalog file {}", path.display()))?;

    let total = entries.len();
    let courses: Vec<CatalogCourse> = entries
        .into_iter()
        .map(|entry| match entry {
            CatalogEntry::Code(code) => CatalogCourse { code, name: None },
            CatalogEntry::Record { code, name } => CatalogCourse { code, name },
        })
        .filter(|course| is_course_code(&course.code))
        .collect();

    let skipped = total - courses.len();
    if skipped > 0 {
        warn!("Skipped {} catalog entries without a valid course code", skipped);
    }
    info!("Loaded {} courses from {}", courses.len(), path.display());
    Ok(courses)
}
