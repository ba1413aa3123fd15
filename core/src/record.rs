//! Service-request rows: the raw upstream shape and the validated fact shape.

use crate::types::{MonthBucket, RequestId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A request as it arrives from the source table. Only `id` is guaranteed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    pub id:            RequestId,
    pub opened_at:     Option<NaiveDateTime>,
    pub closed_at:     Option<NaiveDateTime>,
    pub sla_target_at: Option<NaiveDateTime>,
    pub department:    Option<String>,
    pub reason:        Option<String>,
    pub source:        Option<String>,
    pub neighborhood:  Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Open,
    Closed,
}

/// One row of the fact table. Built by the cleaning transform; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id:               RequestId,
    pub opened_at:        NaiveDateTime,
    pub closed_at:        Option<NaiveDateTime>,
    pub department:       String,
    pub reason:           String,
    pub source:           String,
    pub neighborhood:     Option<String>,
    pub sla_met:          bool,
    pub status:           Status,
    pub resolution_hours: Option<f64>,
}

impl RequestRecord {
    /// Month the request was opened in. Open requests bucket the same way.
    pub fn opened_month(&self) -> MonthBucket {
        MonthBucket::from_datetime(&self.opened_at)
    }

    pub fn is_closed(&self) -> bool {
        self.status == Status::Closed
    }

    /// Neighborhood if present and not blank.
    pub fn neighborhood(&self) -> Option<&str> {
        self.neighborhood
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}
