mod audit;
mod catalog;
mod db;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::warn;

use audit::diag::Diagnostics;
use audit::tables::{AuditKind, DocumentTag, ExclusionConfig, TableBuilder};
use audit::DocumentResult;

/// A general-education audit is published under this fixed filename;
/// every other document in a major's folder is a core audit.
const GEN_ED_SENTINEL: &str = "published.json";

#[derive(Parser)]
#[command(name = "audit_etl", about = "Degree-audit extraction pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the SQLite schema
    Init,
    /// Load the course universe from a catalog JSON export
    Catalog {
        /// Catalog file: array of course codes or {code, name} records
        file: PathBuf,
    },
    /// Extract audit documents into the relational tables
    Extract {
        /// Directory laid out as <dir>/<major>/<audit>.json
        dir: PathBuf,
        /// JSON config mapping majors to excluded requirement chains
        #[arg(long)]
        exclusions: Option<PathBuf>,
        /// Max documents to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Show table counts and the last run summary
    Stats,
    /// List extracted requirements with course counts
    Requirements {
        /// Filter by major
        #[arg(short, long)]
        major: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            println!("Schema ready.");
            Ok(())
        }
        Commands::Catalog { file } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let courses = catalog::load_catalog(&file)?;
            let saved = db::save_courses(&conn, &courses)?;
            println!("Loaded {} courses into the universe.", saved);
            Ok(())
        }
        Commands::Extract {
            dir,
            exclusions,
            limit,
        } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;

            let universe = db::fetch_course_universe(&conn)?;
            if universe.is_empty() {
                println!("Course universe is empty. Run 'catalog' first.");
                return Ok(());
            }

            let exclusions = load_exclusions(exclusions.as_deref())?;
            let mut docs = discover_documents(&dir)?;
            if let Some(n) = limit {
                docs.truncate(n);
            }
            if docs.is_empty() {
                println!("No audit documents found under {}.", dir.display());
                return Ok(());
            }

            println!("Extracting {} audit documents...", docs.len());
            run_extraction(&conn, &docs, &universe, &exclusions)
        }
        Commands::Stats => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Courses:      {}", s.courses);
            println!("Audits:       {}", s.audits);
            println!("Requirements: {}", s.requirements);
            println!("Mappings:     {}", s.mappings);
            match s.last_run {
                Some(run) => println!(
                    "Last run:     {} ({} documents, {} tuples, {} warnings)",
                    run.started_at, run.documents, run.tuples, run.warnings
                ),
                None => println!("Last run:     never"),
            }
            Ok(())
        }
        Commands::Requirements { major, limit } => {
            let conn = db::connect()?;
            db::init_schema(&conn)?;
            let rows = db::fetch_requirements(&conn, major.as_deref(), limit)?;
            if rows.is_empty() {
                println!("No requirements found.");
                return Ok(());
            }

            println!(
                "{:>3} | {:<12} | {:<6} | {:<60} | {:>7}",
                "#", "Audit", "Kind", "Requirement", "Courses"
            );
            println!("{}", "-".repeat(100));
            for (i, r) in rows.iter().enumerate() {
                println!(
                    "{:>3} | {:<12} | {:<6} | {:<60} | {:>7}",
                    i + 1,
                    truncate(&r.audit_id, 12),
                    kind_label(r.kind),
                    truncate(&r.requirement, 60),
                    r.course_count
                );
            }
            println!("\n{} requirements", rows.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

// ── Extraction driver ──

struct SourceDocument {
    path: PathBuf,
    tag: DocumentTag,
}

/// Walk `<dir>/<major>/*.json`, tagging each file with its (major, kind).
fn discover_documents(dir: &Path) -> Result<Vec<SourceDocument>> {
    let mut docs = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read audit directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let major = entry.file_name().to_string_lossy().to_string();
        for file in std::fs::read_dir(entry.path())? {
            let file = file?;
            let path = file.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let kind = if file.file_name() == GEN_ED_SENTINEL {
                AuditKind::GenEd
            } else {
                AuditKind::Core
            };
            docs.push(SourceDocument {
                path,
                tag: DocumentTag::new(&major, kind),
            });
        }
    }
    // Deterministic batch order regardless of directory iteration.
    docs.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(docs)
}

fn load_exclusions(path: Option<&Path>) -> Result<ExclusionConfig> {
    match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("failed to read exclusion config {}", p.display()))?;
            ExclusionConfig::from_json(&text)
                .with_context(|| format!("failed to parse exclusion config {}", p.display()))
        }
        None => Ok(ExclusionConfig::default()),
    }
}

fn run_extraction(
    conn: &rusqlite::Connection,
    docs: &[SourceDocument],
    universe: &std::collections::BTreeSet<String>,
    exclusions: &ExclusionConfig,
) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let started_at = chrono::Utc::now();
    let pb = ProgressBar::new(docs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec})")?
            .progress_chars("=> "),
    );

    let mut builder = TableBuilder::new(universe, exclusions);
    let mut diag = Diagnostics::new();
    let mut tuple_count = 0usize;

    // Map phase per document (pure), sequential fold into the builder.
    for chunk in docs.chunks(64) {
        let results: Vec<DocumentResult> = chunk.par_iter().map(process_source).collect();
        for result in results {
            tuple_count += result.tuples.len();
            builder.add_document(&result.tag, &result.tuples, &mut diag);
            diag.merge(result.diag);
        }
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();

    let tables = builder.finish(&mut diag);
    for warning in diag.warnings() {
        warn!("{warning}");
    }

    let counts = db::save_tables(conn, &tables)?;
    db::record_run(
        conn,
        &db::RunSummary {
            started_at,
            documents: docs.len(),
            tuples: tuple_count,
            excluded_tuples: diag.excluded_tuples,
            warnings: diag.warning_count(),
            audits: counts.audits,
            requirements: counts.requirements,
            mappings: counts.mappings,
        },
    )?;

    println!(
        "Processed {} documents: {} tuples ({} exclusions inert), {} warnings.",
        docs.len(),
        tuple_count,
        diag.excluded_tuples,
        diag.warning_count()
    );
    println!(
        "Saved {} audits, {} requirements, {} course mappings.",
        counts.audits, counts.requirements, counts.mappings
    );
    Ok(())
}

/// Read and flatten one document. Read failures degrade to an empty
/// result with a warning so one bad file never aborts the batch.
fn process_source(src: &SourceDocument) -> DocumentResult {
    match std::fs::read_to_string(&src.path) {
        Ok(json) => audit::process_document(src.tag.clone(), &json),
        Err(err) => {
            let mut diag = Diagnostics::new();
            diag.warn(format!("failed to read {}: {err}", src.path.display()));
            DocumentResult {
                tag: src.tag.clone(),
                tuples: Vec::new(),
                diag,
            }
        }
    }
}

fn kind_label(kind: i64) -> &'static str {
    match kind {
        0 => "core",
        1 => "gen-ed",
        _ => "?",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
