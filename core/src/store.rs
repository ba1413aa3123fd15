//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! Engines and reports work on in-memory rows; they never execute SQL.

use crate::{
    cleaning::{normalize, DropCounts},
    error::AnalyticsResult,
    fact_table::FactTable,
    record::RawRequest,
    report::ReportTable,
};
use rusqlite::{params, Connection, OptionalExtension};

pub struct RequestStore {
    conn: Connection,
}

impl RequestStore {
    /// Open (or create) the database at `path`. Accepts SQLite URIs.
    pub fn open(path: &str) -> AnalyticsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> AnalyticsResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> AnalyticsResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_requests.sql"))?;
        Ok(())
    }

    // ── Service requests ───────────────────────────────────────

    pub fn insert_request(&self, r: &RawRequest) -> AnalyticsResult<()> {
        self.conn.execute(
            "INSERT INTO service_request (
                id, opened_at, closed_at, sla_target_at, department, reason, source, neighborhood
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                &r.id,
                r.opened_at,
                r.closed_at,
                r.sla_target_at,
                r.department.as_deref(),
                r.reason.as_deref(),
                r.source.as_deref(),
                r.neighborhood.as_deref(),
            ],
        )?;
        Ok(())
    }

    /// Insert many rows in one transaction. Returns the number inserted.
    pub fn insert_requests(&self, rows: &[RawRequest]) -> AnalyticsResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for r in rows {
            self.insert_request(r)?;
        }
        tx.commit()?;
        log::info!("store: inserted {} service requests", rows.len());
        Ok(rows.len())
    }

    /// Seed an empty store with `rows`. A store that already holds requests
    /// is left untouched; returns the number inserted.
    pub fn seed_if_empty(&self, rows: &[RawRequest]) -> AnalyticsResult<usize> {
        let existing = self.request_count()?;
        if existing > 0 {
            log::warn!("store: already holds {existing} service requests, not seeding");
            return Ok(0);
        }
        self.insert_requests(rows)
    }

    pub fn request_count(&self) -> AnalyticsResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM service_request", [], |row| row.get(0))?;
        Ok(n)
    }

    /// Every stored row, ordered by id.
    pub fn load_raw_requests(&self) -> AnalyticsResult<Vec<RawRequest>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, opened_at, closed_at, sla_target_at, department, reason, source,
                    neighborhood
             FROM service_request ORDER BY id ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RawRequest {
                id:            row.get(0)?,
                opened_at:     row.get(1)?,
                closed_at:     row.get(2)?,
                sla_target_at: row.get(3)?,
                department:    row.get(4)?,
                reason:        row.get(5)?,
                source:        row.get(6)?,
                neighborhood:  row.get(7)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Load, clean and freeze the fact table for one analysis run.
    pub fn load_fact_table(&self) -> AnalyticsResult<(FactTable, DropCounts)> {
        let outcome = normalize(self.load_raw_requests()?);
        Ok((FactTable::new(outcome.records)?, outcome.dropped))
    }

    // ── Report results ─────────────────────────────────────────

    pub fn save_report(&self, run_id: &str, table: &ReportTable) -> AnalyticsResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO report_result (run_id, report, row_count, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![run_id, &table.report, table.len() as i64, table.to_json()?],
        )?;
        Ok(())
    }

    pub fn load_report(&self, run_id: &str, report: &str) -> AnalyticsResult<Option<ReportTable>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM report_result WHERE run_id = ?1 AND report = ?2",
                params![run_id, report],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    pub fn report_count(&self, run_id: &str) -> AnalyticsResult<i64> {
        let n = self.conn.query_row(
            "SELECT COUNT(*) FROM report_result WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}
