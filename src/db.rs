use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};

use crate::audit::tables::ExtractedTables;
use crate::catalog::CatalogCourse;

const DB_PATH: &str = "data/audits.sqlite";

pub fn connect() -> Result<Connection> {
    std::fs::create_dir_all("data")?;
    let conn = Connection::open(DB_PATH)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        -- Course universe from the catalog extraction
        CREATE TABLE IF NOT EXISTS courses (
            code       TEXT PRIMARY KEY,
            name       TEXT,
            loaded_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS audits (
            audit_id   TEXT PRIMARY KEY,
            name       TEXT NOT NULL,
            kind       INTEGER NOT NULL CHECK(kind IN (0, 1)),
            major      TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );
        CREATE INDEX IF NOT EXISTS idx_audits_major ON audits(major);

        CREATE TABLE IF NOT EXISTS requirements (
            requirement TEXT PRIMARY KEY,
            audit_id    TEXT NOT NULL REFERENCES audits(audit_id)
        );
        CREATE INDEX IF NOT EXISTS idx_requirements_audit ON requirements(audit_id);

        CREATE TABLE IF NOT EXISTS course_requirements (
            requirement  TEXT NOT NULL REFERENCES requirements(requirement),
            course_code  TEXT NOT NULL,
            PRIMARY KEY (requirement, course_code)
        );
        CREATE INDEX IF NOT EXISTS idx_course_requirements_course
            ON course_requirements(course_code);

        CREATE TABLE IF NOT EXISTS extraction_runs (
            id              INTEGER PRIMARY KEY,
            started_at      TEXT NOT NULL,
            documents       INTEGER NOT NULL,
            tuples          INTEGER NOT NULL,
            excluded_tuples INTEGER NOT NULL,
            warnings        INTEGER NOT NULL,
            audits          INTEGER NOT NULL,
            requirements    INTEGER NOT NULL,
            mappings        INTEGER NOT NULL
        );
        ",
    )?;
    Ok(())
}

// ── Course universe ──

pub fn save_courses(conn: &Connection, courses: &[CatalogCourse]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare("INSERT OR REPLACE INTO courses (code, name) VALUES (?1, ?2)")?;
        for course in courses {
            count += stmt.execute(rusqlite::params![course.code, course.name])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn fetch_course_universe(conn: &Connection) -> Result<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT code FROM courses")?;
    let codes = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<BTreeSet<String>, _>>()?;
    Ok(codes)
}

// ── Extracted tables ──

pub struct SaveCounts {
    pub audits: usize,
    pub requirements: usize,
    pub mappings: usize,
}

pub fn save_tables(conn: &Connection, tables: &ExtractedTables) -> Result<SaveCounts> {
    let tx = conn.unchecked_transaction()?;
    let mut counts = SaveCounts {
        audits: 0,
        requirements: 0,
        mappings: 0,
    };
    {
        // Upsert instead of REPLACE: these rows are referenced by
        // foreign keys, and REPLACE deletes before reinserting.
        let mut audit_stmt = tx.prepare(
            "INSERT INTO audits (audit_id, name, kind, major)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(audit_id) DO UPDATE SET
                 name = excluded.name, kind = excluded.kind, major = excluded.major",
        )?;
        for audit in &tables.audits {
            counts.audits += audit_stmt.execute(rusqlite::params![
                audit.audit_id,
                audit.name,
                audit.kind,
                audit.major
            ])?;
        }

        let mut req_stmt = tx.prepare(
            "INSERT INTO requirements (requirement, audit_id) VALUES (?1, ?2)
             ON CONFLICT(requirement) DO UPDATE SET audit_id = excluded.audit_id",
        )?;
        for req in &tables.requirements {
            counts.requirements +=
                req_stmt.execute(rusqlite::params![req.requirement, req.audit_id])?;
        }

        let mut map_stmt = tx.prepare(
            "INSERT OR IGNORE INTO course_requirements (requirement, course_code)
             VALUES (?1, ?2)",
        )?;
        for mapping in &tables.mappings {
            counts.mappings +=
                map_stmt.execute(rusqlite::params![mapping.requirement, mapping.course_code])?;
        }
    }
    tx.commit()?;
    Ok(counts)
}

// ── Run bookkeeping ──

pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub documents: usize,
    pub tuples: usize,
    pub excluded_tuples: usize,
    pub warnings: usize,
    pub audits: usize,
    pub requirements: usize,
    pub mappings: usize,
}

pub fn record_run(conn: &Connection, run: &RunSummary) -> Result<()> {
    conn.execute(
        "INSERT INTO extraction_runs
         (started_at, documents, tuples, excluded_tuples, warnings, audits, requirements, mappings)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            run.started_at.to_rfc3339(),
            run.documents,
            run.tuples,
            run.excluded_tuples,
            run.warnings,
            run.audits,
            run.requirements,
            run.mappings,
        ],
    )?;
    Ok(())
}

// ── Stats ──

pub struct LastRun {
    pub started_at: String,
    pub documents: usize,
    pub tuples: usize,
    pub warnings: usize,
}

pub struct Stats {
    pub courses: usize,
    pub audits: usize,
    pub requirements: usize,
    pub mappings: usize,
    pub last_run: Option<LastRun>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let courses: usize = conn.query_row("SELECT COUNT(*) FROM courses", [], |r| r.get(0))?;
    let audits: usize = conn.query_row("SELECT COUNT(*) FROM audits", [], |r| r.get(0))?;
    let requirements: usize =
        conn.query_row("SELECT COUNT(*) FROM requirements", [], |r| r.get(0))?;
    let mappings: usize =
        conn.query_row("SELECT COUNT(*) FROM course_requirements", [], |r| r.get(0))?;
    let last_run = conn
        .query_row(
            "SELECT started_at, documents, tuples, warnings
             FROM extraction_runs ORDER BY id DESC LIMIT 1",
            [],
            |row| {
                Ok(LastRun {
                    started_at: row.get(0)?,
                    documents: row.get(1)?,
                    tuples: row.get(2)?,
                    warnings: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(Stats {
        courses,
        audits,
        requirements,
        mappings,
        last_run,
    })
}

// ── Requirements overview ──

pub struct RequirementOverviewRow {
    pub audit_id: String,
    pub major: String,
    pub kind: i64,
    pub requirement: String,
    pub course_count: i64,
}

pub fn fetch_requirements(
    conn: &Connection,
    major: Option<&str>,
    limit: usize,
) -> Result<Vec<RequirementOverviewRow>> {
    let mut conditions = Vec::new();
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(m) = major {
        conditions.push(format!("a.major = ?{}", params.len() + 1));
        params.push(Box::new(m.to_string()));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        "SELECT r.audit_id, a.major, a.kind, r.requirement, COUNT(cr.course_code)
         FROM requirements r
         JOIN audits a ON a.audit_id = r.audit_id
         LEFT JOIN course_requirements cr ON cr.requirement = r.requirement{}
         GROUP BY r.requirement
         ORDER BY r.audit_id, r.requirement
         LIMIT {}",
        where_clause, limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(RequirementOverviewRow {
                audit_id: row.get(0)?,
                major: row.get(1)?,
                kind: row.get(2)?,
                requirement: row.get(3)?,
                course_count: row.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
