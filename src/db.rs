//! Persistence layer
//!
//! SQLite with three tables: the append-only query event log, the feedback
//! record store keyed by (normalized_query, domain, subdomain), and the
//! applied-feedback ledger that makes repeat submissions idempotent.
//! Single file, zero network dependencies, works offline.

use crate::error::EngineResult;
use crate::types::{QueryEvent, QueryEventKind};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use std::path::Path;

/// Open (or create) the store and apply the schema.
pub fn init_db(path: &Path) -> EngineResult<Connection> {
    let conn = Connection::open(path)?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

/// In-memory store, used by tests and ephemeral sessions.
pub fn init_db_in_memory() -> EngineResult<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

const SCHEMA: &str = r#"
-- Query events: one row per analyze() call or feedback application.
-- Append-only; rows are never updated or deleted.
CREATE TABLE IF NOT EXISTS query_events (
    event_id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'analysis',
    created_at TEXT NOT NULL,
    raw_query TEXT NOT NULL,
    normalized_query TEXT NOT NULL,
    domain_id TEXT NOT NULL,
    subdomain_id TEXT NOT NULL,
    base_confidence REAL NOT NULL,
    effective_confidence REAL NOT NULL,
    section_ids TEXT NOT NULL,       -- JSON array of "code:number"
    article_numbers TEXT NOT NULL    -- JSON array
);

CREATE INDEX IF NOT EXISTS idx_events_session ON query_events(session_id);
CREATE INDEX IF NOT EXISTS idx_events_created ON query_events(created_at);

-- Feedback records: learned confidence adjustments per query key.
CREATE TABLE IF NOT EXISTS feedback_records (
    normalized_query TEXT NOT NULL,
    domain_id TEXT NOT NULL,
    subdomain_id TEXT NOT NULL,
    positive_count INTEGER NOT NULL DEFAULT 0,
    negative_count INTEGER NOT NULL DEFAULT 0,
    cumulative_delta REAL NOT NULL DEFAULT 0.0,
    last_updated TEXT NOT NULL,
    PRIMARY KEY (normalized_query, domain_id, subdomain_id)
);

-- Applied feedback: which (event, signal) pairs have already been counted.
CREATE TABLE IF NOT EXISTS feedback_applications (
    event_id TEXT NOT NULL,
    signal TEXT NOT NULL,
    applied_at TEXT NOT NULL,
    PRIMARY KEY (event_id, signal)
);
"#;

/// Append one event. The insert commits before this returns.
pub fn append_event(conn: &Connection, event: &QueryEvent) -> EngineResult<()> {
    conn.execute(
        r#"
        INSERT INTO query_events
            (event_id, session_id, kind, created_at, raw_query, normalized_query,
             domain_id, subdomain_id, base_confidence, effective_confidence,
             section_ids, article_numbers)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
        params![
            event.event_id,
            event.session_id,
            event.kind.name(),
            event.timestamp.to_rfc3339(),
            event.raw_query,
            event.normalized_query,
            event.domain_id,
            event.subdomain_id,
            event.base_confidence,
            event.effective_confidence,
            serde_json::to_string(&event.retrieved_section_ids).unwrap_or_else(|_| "[]".into()),
            serde_json::to_string(&event.retrieved_article_numbers).unwrap_or_else(|_| "[]".into()),
        ],
    )?;
    Ok(())
}

fn row_to_event(row: &Row<'_>) -> rusqlite::Result<QueryEvent> {
    let kind: String = row.get(2)?;
    let created_at: String = row.get(3)?;
    let section_ids: String = row.get(10)?;
    let article_numbers: String = row.get(11)?;

    Ok(QueryEvent {
        event_id: row.get(0)?,
        session_id: row.get(1)?,
        kind: QueryEventKind::parse(&kind).unwrap_or(QueryEventKind::Analysis),
        timestamp: DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        raw_query: row.get(4)?,
        normalized_query: row.get(5)?,
        domain_id: row.get(6)?,
        subdomain_id: row.get(7)?,
        base_confidence: row.get(8)?,
        effective_confidence: row.get(9)?,
        retrieved_section_ids: serde_json::from_str(&section_ids).unwrap_or_default(),
        retrieved_article_numbers: serde_json::from_str(&article_numbers).unwrap_or_default(),
    })
}

const EVENT_COLUMNS: &str = "event_id, session_id, kind, created_at, raw_query, normalized_query, \
     domain_id, subdomain_id, base_confidence, effective_confidence, section_ids, article_numbers";

/// Look up one event by id.
pub fn get_event(conn: &Connection, event_id: &str) -> EngineResult<Option<QueryEvent>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM query_events WHERE event_id = ?1",
        EVENT_COLUMNS
    ))?;
    let mut rows = stmt.query_map([event_id], row_to_event)?;
    match rows.next() {
        Some(event) => Ok(Some(event?)),
        None => Ok(None),
    }
}

/// List events newest first, optionally scoped to one session.
pub fn list_events(
    conn: &Connection,
    session_id: Option<&str>,
    limit: Option<usize>,
    offset: Option<usize>,
) -> EngineResult<Vec<QueryEvent>> {
    let limit = limit.map(|l| l as i64).unwrap_or(-1);
    let offset = offset.unwrap_or(0) as i64;

    let events = match session_id {
        Some(session) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM query_events WHERE session_id = ?1
                 ORDER BY created_at DESC, event_id DESC LIMIT ?2 OFFSET ?3",
                EVENT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![session, limit, offset], row_to_event)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM query_events
                 ORDER BY created_at DESC, event_id DESC LIMIT ?1 OFFSET ?2",
                EVENT_COLUMNS
            ))?;
            let rows = stmt.query_map(params![limit, offset], row_to_event)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(events)
}

/// Case-insensitive substring search over raw queries, plus an optional set
/// of domain ids (resolved from display names by the caller).
pub fn search_events(
    conn: &Connection,
    substring: &str,
    domain_ids: &[String],
) -> EngineResult<Vec<QueryEvent>> {
    let pattern = format!("%{}%", substring.to_lowercase());

    let mut sql = format!(
        "SELECT {} FROM query_events WHERE LOWER(raw_query) LIKE ?1",
        EVENT_COLUMNS
    );
    if !domain_ids.is_empty() {
        let placeholders: Vec<String> = (0..domain_ids.len())
            .map(|i| format!("?{}", i + 2))
            .collect();
        sql.push_str(&format!(" OR domain_id IN ({})", placeholders.join(", ")));
    }
    sql.push_str(" ORDER BY created_at DESC, event_id DESC");

    let mut stmt = conn.prepare(&sql)?;
    let mut values: Vec<&dyn rusqlite::ToSql> = vec![&pattern];
    for id in domain_ids {
        values.push(id);
    }
    let rows = stmt.query_map(values.as_slice(), row_to_event)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn count_events(conn: &Connection) -> EngineResult<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM query_events", [], |row| row.get(0))?;
    Ok(count as usize)
}

/// Mark an (event, signal) pair applied. Returns false when it already was,
/// which makes repeat feedback submissions no-ops.
pub fn mark_feedback_applied(
    conn: &Connection,
    event_id: &str,
    signal: &str,
) -> EngineResult<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO feedback_applications (event_id, signal, applied_at)
         VALUES (?1, ?2, ?3)",
        params![event_id, signal, Utc::now().to_rfc3339()],
    )?;
    Ok(changed > 0)
}

/// A feedback record row for one query key.
#[derive(Debug, Clone, Default)]
pub struct FeedbackRow {
    pub positive_count: u32,
    pub negative_count: u32,
    pub cumulative_delta: f64,
}

pub fn get_feedback(
    conn: &Connection,
    normalized_query: &str,
    domain_id: &str,
    subdomain_id: &str,
) -> EngineResult<Option<FeedbackRow>> {
    let row = conn
        .query_row(
            "SELECT positive_count, negative_count, cumulative_delta
             FROM feedback_records
             WHERE normalized_query = ?1 AND domain_id = ?2 AND subdomain_id = ?3",
            params![normalized_query, domain_id, subdomain_id],
            |row| {
                Ok(FeedbackRow {
                    positive_count: row.get::<_, i64>(0)? as u32,
                    negative_count: row.get::<_, i64>(1)? as u32,
                    cumulative_delta: row.get(2)?,
                })
            },
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    Ok(row)
}

/// Write the full record for a key in one statement.
pub fn upsert_feedback(
    conn: &Connection,
    normalized_query: &str,
    domain_id: &str,
    subdomain_id: &str,
    row: &FeedbackRow,
) -> EngineResult<()> {
    conn.execute(
        r#"
        INSERT INTO feedback_records
            (normalized_query, domain_id, subdomain_id,
             positive_count, negative_count, cumulative_delta, last_updated)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(normalized_query, domain_id, subdomain_id) DO UPDATE SET
            positive_count = excluded.positive_count,
            negative_count = excluded.negative_count,
            cumulative_delta = excluded.cumulative_delta,
            last_updated = excluded.last_updated
        "#,
        params![
            normalized_query,
            domain_id,
            subdomain_id,
            row.positive_count as i64,
            row.negative_count as i64,
            row.cumulative_delta,
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}
