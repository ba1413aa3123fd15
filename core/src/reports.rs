//! The ten named reports.
//!
//! Each report states its pipeline in `build`; the shared engines do the
//! work. Column lists are part of each report's output contract.

use crate::{
    aggregate::{
        aggregate, Accumulator, AggregateQuery, AggregateRow, Dimension, Field, GroupKey, KeyPart,
        Predicate,
    },
    anomaly::flag_anomalies,
    config::ReportConfig,
    error::AnalyticsResult,
    fact_table::{FactTable, Selection},
    rank::{rank_within, top_n},
    report::{asc, desc, Cell, Report, ReportTable},
    timeseries::{densify_months, lag_delta_by_partition, rolling_average},
    types::MonthBucket,
};
use std::collections::{BTreeMap, BTreeSet};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn key_text(row: &AggregateRow, index: usize) -> Cell {
    Cell::text(row.key.text(index).unwrap_or_default())
}

fn int_cell(value: Option<f64>) -> Cell {
    value.map_or(Cell::Missing, |v| Cell::Int(v.round() as i64))
}

fn month_cell(month: MonthBucket) -> Cell {
    Cell::text(month.to_string())
}

/// Per-month request counts over every month between the first and last.
fn monthly_volume(table: &FactTable) -> AnalyticsResult<Vec<(MonthBucket, f64)>> {
    let query =
        AggregateQuery::by(&[Dimension::OpenedMonth]).metric("requests", Accumulator::Count);
    let points: Vec<(MonthBucket, f64)> = aggregate(table.select(&Selection::all()), &query)?
        .into_iter()
        .filter_map(|g| Some((g.key.month(0)?, g.row_count as f64)))
        .collect();
    Ok(densify_months(&points))
}

// ── 1. SLA compliance by department ──────────────────────────────────────────

/// Share of closed requests resolved within SLA, per department.
///
/// Every department in the table is seeded as a group, so with a
/// `min_group_size` of 0 a department that has no closed requests reaches
/// the ratio and fails with `DivisionByZero`.
pub struct SlaComplianceByDepartment;

impl Report for SlaComplianceByDepartment {
    fn name(&self) -> &'static str {
        "sla_compliance_by_department"
    }

    fn build(&self, table: &FactTable, config: &ReportConfig) -> AnalyticsResult<ReportTable> {
        let departments: BTreeSet<&str> =
            table.rows().iter().map(|r| r.department.as_str()).collect();
        let mut query = AggregateQuery::by(&[Dimension::Department])
            .metric("sla_met", Accumulator::CountWhere(Predicate::SlaMet))
            .metric("sla_compliance", Accumulator::Rate(Predicate::SlaMet))
            .metric("avg_resolution_hours", Accumulator::Average(Field::ResolutionHours))
            .min_group_size(config.min_group_size);
        for dept in departments {
            query = query.seed_group(GroupKey(vec![KeyPart::Text(dept.to_string())]));
        }

        let groups = aggregate(table.select(&Selection::closed()), &query)?;
        let mut out = ReportTable::new(
            self.name(),
            &["department", "total", "sla_met", "sla_compliance", "avg_resolution_hours"],
        );
        for g in &groups {
            out.push_row(vec![
                key_text(g, 0),
                Cell::count(g.row_count),
                int_cell(g.get("sla_met")),
                g.get("sla_compliance").into(),
                g.get("avg_resolution_hours").into(),
            ]);
        }
        out.sort_by(&[asc("sla_compliance"), desc("total"), asc("department")])?;
        Ok(out)
    }
}

// ── 2. Resolution time by complaint type ─────────────────────────────────────

pub struct ResolutionTimeByReason;

impl Report for ResolutionTimeByReason {
    fn name(&self) -> &'static str {
        "resolution_time_by_reason"
    }

    fn build(&self, table: &FactTable, config: &ReportConfig) -> AnalyticsResult<ReportTable> {
        let query = AggregateQuery::by(&[Dimension::Reason])
            .metric("avg_resolution_hours", Accumulator::Average(Field::ResolutionHours))
            .metric("max_resolution_hours", Accumulator::Max(Field::ResolutionHours))
            .min_group_size(config.min_group_size);
        let groups = aggregate(table.select(&Selection::closed()), &query)?;

        let mut out = ReportTable::new(
            self.name(),
            &["reason", "total", "avg_resolution_hours", "max_resolution_hours"],
        );
        for g in &groups {
            out.push_row(vec![
                key_text(g, 0),
                Cell::count(g.row_count),
                g.get("avg_resolution_hours").into(),
                g.get("max_resolution_hours").into(),
            ]);
        }
        out.sort_by(&[desc("avg_resolution_hours"), asc("reason")])?;
        out.limit(config.top_n);
        Ok(out)
    }
}

// ── 3. Most common complaint type per neighborhood ───────────────────────────

/// Rank-1 complaint type in each neighborhood. Exact ties all appear.
pub struct TopReasonByNeighborhood;

impl Report for TopReasonByNeighborhood {
    fn name(&self) -> &'static str {
        "top_reason_by_neighborhood"
    }

    fn build(&self, table: &FactTable, _config: &ReportConfig) -> AnalyticsResult<ReportTable> {
        let query = AggregateQuery::by(&[Dimension::Neighborhood, Dimension::Reason])
            .metric("requests", Accumulator::Count);
        let groups = aggregate(table.select(&Selection::all().with_neighborhood()), &query)?;
        let ranked = top_n(
            rank_within(
                groups,
                |g| g.key.text(0).unwrap_or_default().to_string(),
                |g| g.row_count as f64,
                None,
            ),
            1,
        );

        let mut out =
            ReportTable::new(self.name(), &["neighborhood", "reason", "requests", "rank"]);
        for r in &ranked {
            out.push_row(vec![
                key_text(&r.item, 0),
                key_text(&r.item, 1),
                Cell::count(r.item.row_count),
                Cell::count(r.rank),
            ]);
        }
        out.sort_by(&[asc("neighborhood"), asc("reason")])?;
        Ok(out)
    }
}

// ── 4. Neighborhood volume ───────────────────────────────────────────────────

pub struct NeighborhoodVolume;

impl Report for NeighborhoodVolume {
    fn name(&self) -> &'static str {
        "neighborhood_volume"
    }

    fn build(&self, table: &FactTable, config: &ReportConfig) -> AnalyticsResult<ReportTable> {
        let query = AggregateQuery::by(&[Dimension::Neighborhood])
            .metric("open", Accumulator::CountWhere(Predicate::Open))
            .metric("closed", Accumulator::CountWhere(Predicate::Closed))
            .metric("sla_compliance", Accumulator::Average(Field::ClosedSlaMet))
            .min_group_size(config.min_group_size);
        let groups = aggregate(table.select(&Selection::all().with_neighborhood()), &query)?;

        let mut out = ReportTable::new(
            self.name(),
            &["neighborhood", "total", "open", "closed", "sla_compliance"],
        );
        for g in &groups {
            out.push_row(vec![
                key_text(g, 0),
                Cell::count(g.row_count),
                int_cell(g.get("open")),
                int_cell(g.get("closed")),
                g.get("sla_compliance").into(),
            ]);
        }
        out.sort_by(&[desc("total"), asc("neighborhood")])?;
        out.limit(config.top_n);
        Ok(out)
    }
}

// ── 5. Submission channel attribution ────────────────────────────────────────

pub struct ChannelAttribution;

impl Report for ChannelAttribution {
    fn name(&self) -> &'static str {
        "channel_attribution"
    }

    fn build(&self, table: &FactTable, _config: &ReportConfig) -> AnalyticsResult<ReportTable> {
        let rows = table.select(&Selection::all());
        let total = rows.len();
        let query = AggregateQuery::by(&[Dimension::Source])
            .metric("sla_compliance", Accumulator::Average(Field::ClosedSlaMet))
            .metric("avg_resolution_hours", Accumulator::Average(Field::ResolutionHours));
        let groups = aggregate(rows, &query)?;

        let mut out = ReportTable::new(
            self.name(),
            &["source", "requests", "share_of_total", "sla_compliance", "avg_resolution_hours"],
        );
        for g in &groups {
            // Every group holds at least one row, so total > 0 here.
            let share = g.row_count as f64 / total as f64;
            out.push_row(vec![
                key_text(g, 0),
                Cell::count(g.row_count),
                Cell::Float(share),
                g.get("sla_compliance").into(),
                g.get("avg_resolution_hours").into(),
            ]);
        }
        out.sort_by(&[desc("requests"), asc("source")])?;
        Ok(out)
    }
}

// ── 6. Top complaint types per department ────────────────────────────────────

pub struct TopReasonsByDepartment;

impl Report for TopReasonsByDepartment {
    fn name(&self) -> &'static str {
        "top_reasons_by_department"
    }

    fn build(&self, table: &FactTable, config: &ReportConfig) -> AnalyticsResult<ReportTable> {
        let query = AggregateQuery::by(&[Dimension::Department, Dimension::Reason])
            .metric("requests", Accumulator::Count);
        let groups = aggregate(table.select(&Selection::all()), &query)?;
        let ranked = top_n(
            rank_within(
                groups,
                |g| g.key.text(0).unwrap_or_default().to_string(),
                |g| g.row_count as f64,
                None,
            ),
            config.top_n,
        );

        let mut out = ReportTable::new(self.name(), &["department", "reason", "requests", "rank"]);
        for r in &ranked {
            out.push_row(vec![
                key_text(&r.item, 0),
                key_text(&r.item, 1),
                Cell::count(r.item.row_count),
                Cell::count(r.rank),
            ]);
        }
        out.sort_by(&[asc("department"), asc("rank"), asc("reason")])?;
        Ok(out)
    }
}

// ── 7. Month-over-month volume by department ─────────────────────────────────

pub struct MonthlyTrendByDepartment;

impl Report for MonthlyTrendByDepartment {
    fn name(&self) -> &'static str {
        "monthly_trend_by_department"
    }

    fn build(&self, table: &FactTable, _config: &ReportConfig) -> AnalyticsResult<ReportTable> {
        let query = AggregateQuery::by(&[Dimension::Department, Dimension::OpenedMonth])
            .metric("requests", Accumulator::Count);
        let groups = aggregate(table.select(&Selection::all()), &query)?;
        let points: Vec<(String, MonthBucket, f64)> = groups
            .into_iter()
            .filter_map(|g| {
                let dept = g.key.text(0)?.to_string();
                Some((dept, g.key.month(1)?, g.row_count as f64))
            })
            .collect();

        let mut out = ReportTable::new(
            self.name(),
            &["department", "month", "requests", "previous_requests", "delta", "pct_change"],
        );
        for (dept, p) in lag_delta_by_partition(points) {
            out.push_row(vec![
                Cell::text(dept),
                month_cell(p.month),
                int_cell(Some(p.value)),
                int_cell(p.previous),
                int_cell(p.delta),
                p.pct_change.into(),
            ]);
        }
        out.sort_by(&[asc("department"), asc("month")])?;
        Ok(out)
    }
}

// ── 8. Rolling monthly volume ────────────────────────────────────────────────

pub struct RollingMonthlyVolume;

impl Report for RollingMonthlyVolume {
    fn name(&self) -> &'static str {
        "rolling_monthly_volume"
    }

    fn build(&self, table: &FactTable, config: &ReportConfig) -> AnalyticsResult<ReportTable> {
        let series = monthly_volume(table)?;
        let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
        let rolling = rolling_average(&values, config.rolling_window)?;

        let mut out = ReportTable::new(self.name(), &["month", "requests", "rolling_avg"]);
        for ((month, value), avg) in series.iter().zip(rolling) {
            out.push_row(vec![month_cell(*month), int_cell(Some(*value)), Cell::Float(avg)]);
        }
        out.sort_by(&[asc("month")])?;
        Ok(out)
    }
}

// ── 9. Monthly volume anomalies ──────────────────────────────────────────────

pub struct MonthlyVolumeAnomalies;

impl Report for MonthlyVolumeAnomalies {
    fn name(&self) -> &'static str {
        "monthly_volume_anomalies"
    }

    fn build(&self, table: &FactTable, config: &ReportConfig) -> AnalyticsResult<ReportTable> {
        let series = monthly_volume(table)?;
        let flagged = flag_anomalies("monthly_volume", &series, config.z_threshold)?;

        let mut out = ReportTable::new(self.name(), &["month", "requests", "z_score"]);
        for p in flagged {
            out.push_row(vec![
                month_cell(p.month),
                int_cell(Some(p.value)),
                Cell::Float(p.z_score),
            ]);
        }
        out.sort_by(&[desc("z_score"), asc("month")])?;
        Ok(out)
    }
}

// ── 10. SLA compliance trend by department ───────────────────────────────────

pub struct SlaTrendByDepartment;

impl Report for SlaTrendByDepartment {
    fn name(&self) -> &'static str {
        "sla_trend_by_department"
    }

    fn build(&self, table: &FactTable, config: &ReportConfig) -> AnalyticsResult<ReportTable> {
        let query = AggregateQuery::by(&[Dimension::Department, Dimension::OpenedMonth])
            .metric("sla_compliance", Accumulator::Rate(Predicate::SlaMet))
            .min_group_size(config.min_group_size);
        let groups = aggregate(table.select(&Selection::closed()), &query)?;

        let mut totals = BTreeMap::new();
        let mut points = Vec::with_capacity(groups.len());
        for g in &groups {
            let (Some(dept), Some(month), Some(rate)) =
                (g.key.text(0), g.key.month(1), g.get("sla_compliance"))
            else {
                continue;
            };
            totals.insert((dept.to_string(), month), g.row_count);
            points.push((dept.to_string(), month, rate));
        }

        let mut out = ReportTable::new(
            self.name(),
            &["department", "month", "total", "sla_compliance", "previous_compliance", "delta"],
        );
        for (dept, p) in lag_delta_by_partition(points) {
            let total = totals.get(&(dept.clone(), p.month)).copied().unwrap_or_default();
            out.push_row(vec![
                Cell::text(dept),
                month_cell(p.month),
                Cell::count(total),
                Cell::Float(p.value),
                p.previous.into(),
                p.delta.into(),
            ]);
        }
        out.sort_by(&[asc("department"), asc("month")])?;
        Ok(out)
    }
}

/// Every report, in the order batches run and return them.
pub fn standard_reports() -> Vec<Box<dyn Report>> {
    vec![
        Box::new(SlaComplianceByDepartment),
        Box::new(ResolutionTimeByReason),
        Box::new(TopReasonByNeighborhood),
        Box::new(NeighborhoodVolume),
        Box::new(ChannelAttribution),
        Box::new(TopReasonsByDepartment),
        Box::new(MonthlyTrendByDepartment),
        Box::new(RollingMonthlyVolume),
        Box::new(MonthlyVolumeAnomalies),
        Box::new(SlaTrendByDepartment),
    ]
}
