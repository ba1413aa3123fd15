//! Shared primitive types used across the analytics engine.

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable, opaque identifier for a service request.
pub type RequestId = String;

/// Identifier for one batch of report computations persisted to the store.
pub type RunId = String;

/// A calendar month used as a time-series key.
///
/// Field order matters: the derived `Ord` compares year first, then month,
/// which gives chronological ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthBucket {
    pub year:  i32,
    pub month: u32,
}

impl MonthBucket {
    /// Returns `None` for a month outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_datetime(ts: &NaiveDateTime) -> Self {
        Self { year: ts.year(), month: ts.month() }
    }

    /// The following calendar month.
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Number of month steps from `self` to `later`; negative if `later` is earlier.
    pub fn months_until(self, later: MonthBucket) -> i64 {
        (later.year as i64 - self.year as i64) * 12 + (later.month as i64 - self.month as i64)
    }
}

impl fmt::Display for MonthBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
