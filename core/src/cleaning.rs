//! Cleaning transform: raw source rows to validated fact records.
//!
//! This is a pure function invoked once per batch load. Rows that break the
//! upstream contract are dropped and counted, never repaired.
//!
//! Derivations:
//!   status           = Closed iff closed_at is present
//!   resolution_hours = closed_at − opened_at, in fractional hours
//!   sla_met          = closed on or before sla_target_at (false when open or no target)

use crate::record::{RawRequest, RequestRecord, Status};
use serde::{Deserialize, Serialize};

/// Placeholder for a blank category or channel.
pub const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DropCounts {
    pub missing_opened_at:    usize,
    pub missing_department:   usize,
    pub missing_neighborhood: usize,
    pub closed_before_opened: usize,
}

impl DropCounts {
    pub fn total(&self) -> usize {
        self.missing_opened_at
            + self.missing_department
            + self.missing_neighborhood
            + self.closed_before_opened
    }
}

#[derive(Debug, Clone)]
pub struct CleaningOutcome {
    pub records: Vec<RequestRecord>,
    pub dropped: DropCounts,
}

pub fn normalize(raw: Vec<RawRequest>) -> CleaningOutcome {
    let mut dropped = DropCounts::default();
    let mut records = Vec::with_capacity(raw.len());

    for row in raw {
        let Some(opened_at) = row.opened_at else {
            dropped.missing_opened_at += 1;
            continue;
        };
        let Some(department) = non_blank(row.department) else {
            dropped.missing_department += 1;
            continue;
        };
        let Some(neighborhood) = non_blank(row.neighborhood) else {
            dropped.missing_neighborhood += 1;
            continue;
        };
        if row.closed_at.is_some_and(|closed| closed < opened_at) {
            dropped.closed_before_opened += 1;
            continue;
        }

        let status = if row.closed_at.is_some() { Status::Closed } else { Status::Open };
        let resolution_hours = row
            .closed_at
            .map(|closed| (closed - opened_at).num_seconds() as f64 / 3600.0);
        let sla_met = match (row.closed_at, row.sla_target_at) {
            (Some(closed), Some(target)) => closed <= target,
            _ => false,
        };

        records.push(RequestRecord {
            id: row.id,
            opened_at,
            closed_at: row.closed_at,
            department,
            reason: non_blank(row.reason).unwrap_or_else(|| UNKNOWN.to_string()),
            source: non_blank(row.source).unwrap_or_else(|| UNKNOWN.to_string()),
            neighborhood: Some(neighborhood),
            sla_met,
            status,
            resolution_hours,
        });
    }

    if dropped.total() > 0 {
        log::warn!(
            "cleaning: dropped {} rows (opened_at={}, department={}, neighborhood={}, \
             closed_before_opened={})",
            dropped.total(),
            dropped.missing_opened_at,
            dropped.missing_department,
            dropped.missing_neighborhood,
            dropped.closed_before_opened,
        );
    }
    log::info!("cleaning: kept {} rows", records.len());

    CleaningOutcome { records, dropped }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
