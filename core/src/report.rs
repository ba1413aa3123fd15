//! Report assembler primitives: the output table, sorting, and the
//! `Report` trait every named report implements.
//!
//! RULE: Each report is a fixed pipeline:
//!   select → aggregate → [rank / filter-by-rank] → [time series / anomaly]
//!   → sort → [limit]
//! Filters run before aggregation because they change group membership,
//! and with it the min-group-size cut and any ranking.

use crate::{
    config::ReportConfig,
    error::{AnalyticsError, AnalyticsResult},
    fact_table::FactTable,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The contract every named report must fulfill.
pub trait Report: Send + Sync {
    /// Unique stable name for this report.
    fn name(&self) -> &'static str;

    /// Compute the full report. There is no partial output: either the whole
    /// table or an error.
    fn build(&self, table: &FactTable, config: &ReportConfig) -> AnalyticsResult<ReportTable>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl Cell {
    pub fn count(n: usize) -> Self {
        Cell::Int(n as i64)
    }

    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    fn rounded(&self, places: u32) -> Self {
        match self {
            Cell::Float(f) => Cell::Float(round_to(*f, places)),
            other => other.clone(),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Missing, Cell::Float)
    }
}

/// Round half away from zero. Presentation only.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column:    &'static str,
    pub direction: Direction,
}

pub const fn asc(column: &'static str) -> SortKey {
    SortKey { column, direction: Direction::Asc }
}

pub const fn desc(column: &'static str) -> SortKey {
    SortKey { column, direction: Direction::Desc }
}

/// Compare two cells for sorting. `Missing` sorts last in either direction.
fn compare_cells(a: &Cell, b: &Cell, direction: Direction) -> Ordering {
    let natural = match (a, b) {
        (Cell::Missing, Cell::Missing) => return Ordering::Equal,
        (Cell::Missing, _) => return Ordering::Greater,
        (_, Cell::Missing) => return Ordering::Less,
        (Cell::Text(x), Cell::Text(y)) => x.cmp(y),
        (Cell::Text(_), _) => Ordering::Greater,
        (_, Cell::Text(_)) => Ordering::Less,
        _ => {
            let (x, y) = (a.as_f64().unwrap_or_default(), b.as_f64().unwrap_or_default());
            x.total_cmp(&y)
        }
    };
    match direction {
        Direction::Asc => natural,
        Direction::Desc => natural.reverse(),
    }
}

/// One report's output: named columns and flat rows, ready for export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportTable {
    pub report:  String,
    pub columns: Vec<String>,
    pub rows:    Vec<Vec<Cell>>,
}

impl ReportTable {
    pub fn new(report: &str, columns: &[&str]) -> Self {
        Self {
            report:  report.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows:    Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        debug_assert_eq!(row.len(), self.columns.len(), "row width mismatch in {}", self.report);
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> AnalyticsResult<usize> {
        self.columns.iter().position(|c| c == column).ok_or_else(|| {
            AnalyticsError::InvalidConfig(format!(
                "report '{}' has no column '{column}'",
                self.report
            ))
        })
    }

    /// Cell at (`row`, `column`), if both exist.
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Stable multi-key sort; later keys only break ties of earlier ones.
    pub fn sort_by(&mut self, keys: &[SortKey]) -> AnalyticsResult<()> {
        let resolved: Vec<(usize, Direction)> = keys
            .iter()
            .map(|k| -> AnalyticsResult<(usize, Direction)> {
                Ok((self.column_index(k.column)?, k.direction))
            })
            .collect::<AnalyticsResult<_>>()?;
        self.rows.sort_by(|a, b| {
            resolved
                .iter()
                .map(|(idx, dir)| compare_cells(&a[*idx], &b[*idx], *dir))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        Ok(())
    }

    pub fn limit(&mut self, n: usize) {
        self.rows.truncate(n);
    }

    /// Copy with every float rounded to `places` decimals.
    pub fn rounded(&self, places: u32) -> Self {
        Self {
            report:  self.report.clone(),
            columns: self.columns.clone(),
            rows:    self
                .rows
                .iter()
                .map(|row| row.iter().map(|c| c.rounded(places)).collect())
                .collect(),
        }
    }

    pub fn to_json(&self) -> AnalyticsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
