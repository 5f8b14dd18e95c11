use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqlitePool;
use std::fs;

use crate::error::{CoreError, CoreResult};

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let url = normalize_sqlite_url(database_url);
    // Ensure the file exists for file-based sqlite (avoid open error on some setups)
    if let Some(path) = db_file_path(&url) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).ok();
        }
        if !path.exists() {
            fs::File::create(&path).ok();
        }
    }
    SqlitePool::connect(&url).await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir("migrations")?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.path());
    for e in entries {
        let p = e.path();
        if p.extension().and_then(|s| s.to_str()) == Some("sql") {
            let sql = fs::read_to_string(&p)?;
            sqlx::raw_sql(&sql).execute(pool).await?;
        }
    }
    Ok(())
}

/// Timestamps are persisted as fixed-width RFC3339 UTC text so that
/// lexicographic comparison in SQL matches chronological order.
pub fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_ts(raw: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::Persistence(format!("bad timestamp '{raw}': {e}")))
}

fn normalize_sqlite_url(input: &str) -> String {
    // Accept forms: sqlite:foo.db (fix), sqlite://foo.db (ok), file:foo.db (convert), just path (prepend)
    if input.starts_with("sqlite://") || input.starts_with("sqlite::memory:") {
        return input.to_string();
    }
    if input.starts_with("sqlite:") {
        let rest = input.trim_start_matches("sqlite:");
        return format!("sqlite://{}", rest.trim_start_matches('/'));
    }
    if input.starts_with("file:") {
        return format!("sqlite://{}", input.trim_start_matches("file:"));
    }
    format!("sqlite://{}", input)
}

fn db_file_path(url: &str) -> Option<std::path::PathBuf> {
    if let Some(rest) = url.strip_prefix("sqlite://") {
        if rest == ":memory:" {
            return None;
        }
        return Some(std::path::PathBuf::from(rest));
    }
    None
}
