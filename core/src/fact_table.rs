//! Read-only fact table handle.
//!
//! RULE: Nothing mutates rows after `FactTable::new` validates them.
//! Clones share one allocation, so every report can hold its own handle.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    record::{RequestRecord, Status},
};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FactTable {
    rows: Arc<[RequestRecord]>,
}

impl FactTable {
    /// Validate the fact-table contract and freeze the rows.
    ///
    /// A violation here means the cleaning step let a bad row through, so it
    /// surfaces as `MissingField` instead of being skipped.
    pub fn new(rows: Vec<RequestRecord>) -> AnalyticsResult<Self> {
        for row in &rows {
            if row.department.trim().is_empty() {
                return Err(missing(row, "department"));
            }
            match (row.status, row.closed_at.is_some()) {
                (Status::Closed, false) => return Err(missing(row, "closed_at")),
                (Status::Open, true) => return Err(missing(row, "status")),
                _ => {}
            }
            if row.is_closed() != row.resolution_hours.is_some() {
                return Err(missing(row, "resolution_hours"));
            }
        }
        Ok(Self { rows: rows.into() })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[RequestRecord] {
        &self.rows
    }

    /// Apply a selection; preserves source row order.
    pub fn select(&self, selection: &Selection) -> Vec<&RequestRecord> {
        self.rows.iter().filter(|r| selection.matches(r)).collect()
    }
}

fn missing(row: &RequestRecord, field: &'static str) -> AnalyticsError {
    AnalyticsError::MissingField { record_id: row.id.clone(), field }
}

/// Row filter for the first stage of a report pipeline.
///
/// Filters run in a fixed order: status first, then non-blank requirements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub status: Option<Status>,
    pub require_neighborhood: bool,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn closed() -> Self {
        Self { status: Some(Status::Closed), ..Self::default() }
    }

    pub fn open() -> Self {
        Self { status: Some(Status::Open), ..Self::default() }
    }

    pub fn with_neighborhood(mut self) -> Self {
        self.require_neighborhood = true;
        self
    }

    pub fn matches(&self, row: &RequestRecord) -> bool {
        if let Some(status) = self.status {
            if row.status != status {
                return false;
            }
        }
        if self.require_neighborhood && row.neighborhood().is_none() {
            return false;
        }
        true
    }
}
