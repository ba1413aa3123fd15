//! Aggregation engine: group-by with several accumulators in one pass.
//!
//! Metric values stay unrounded here; rounding belongs to presentation.
//! Groups below `min_group_size` are dropped before any ratio is finalized,
//! so a ratio over zero rows can only happen when the threshold admits an
//! empty seeded group, and then it is an error.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    record::RequestRecord,
    types::MonthBucket,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Keys ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Department,
    Reason,
    Source,
    Neighborhood,
    OpenedMonth,
}

impl Dimension {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Department   => "department",
            Self::Reason       => "reason",
            Self::Source       => "source",
            Self::Neighborhood => "neighborhood",
            Self::OpenedMonth  => "month",
        }
    }

    fn extract(&self, row: &RequestRecord) -> AnalyticsResult<KeyPart> {
        Ok(match self {
            Self::Department  => KeyPart::Text(row.department.clone()),
            Self::Reason      => KeyPart::Text(row.reason.clone()),
            Self::Source      => KeyPart::Text(row.source.clone()),
            Self::OpenedMonth => KeyPart::Month(row.opened_month()),
            Self::Neighborhood => match row.neighborhood() {
                Some(n) => KeyPart::Text(n.to_string()),
                None => {
                    return Err(AnalyticsError::MissingField {
                        record_id: row.id.clone(),
                        field: "neighborhood",
                    })
                }
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyPart {
    Text(String),
    Month(MonthBucket),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Text(s) => f.write_str(s),
            KeyPart::Month(m) => write!(f, "{m}"),
        }
    }
}

/// Ordered tuple of key parts, one per dimension of the query.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey(pub Vec<KeyPart>);

impl GroupKey {
    pub fn text(&self, index: usize) -> Option<&str> {
        match self.0.get(index)? {
            KeyPart::Text(s) => Some(s),
            KeyPart::Month(_) => None,
        }
    }

    pub fn month(&self, index: usize) -> Option<MonthBucket> {
        match self.0.get(index)? {
            KeyPart::Month(m) => Some(*m),
            KeyPart::Text(_) => None,
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{part}")?;
        }
        f.write_str(")")
    }
}

// ── Metrics ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ResolutionHours,
    /// 1.0 when a closed request met its SLA, 0.0 when it missed;
    /// absent on open requests, whose SLA outcome is not yet known.
    ClosedSlaMet,
}

impl Field {
    fn value(&self, row: &RequestRecord) -> Option<f64> {
        match self {
            Field::ResolutionHours => row.resolution_hours,
            Field::ClosedSlaMet => row
                .is_closed()
                .then_some(if row.sla_met { 1.0 } else { 0.0 }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    SlaMet,
    Closed,
    Open,
}

impl Predicate {
    pub fn matches(&self, row: &RequestRecord) -> bool {
        match self {
            Predicate::SlaMet => row.sla_met,
            Predicate::Closed => row.is_closed(),
            Predicate::Open   => !row.is_closed(),
        }
    }
}

/// How one metric folds the rows of a group.
///
/// Field-based kinds skip rows where the field is absent. `Average`, `Min`
/// and `Max` over zero present values are `None`; `Sum` is `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulator {
    Count,
    CountWhere(Predicate),
    Sum(Field),
    Average(Field),
    Min(Field),
    Max(Field),
    /// Share of the group's rows matching the predicate.
    Rate(Predicate),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSpec {
    pub name: String,
    pub kind: Accumulator,
}

impl MetricSpec {
    pub fn new(name: impl Into<String>, kind: Accumulator) -> Self {
        Self { name: name.into(), kind }
    }
}

// ── Query ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct AggregateQuery {
    pub dimensions:     Vec<Dimension>,
    pub metrics:        Vec<MetricSpec>,
    pub min_group_size: usize,
    /// Groups that exist even when no row falls into them.
    pub seed_groups:    Vec<GroupKey>,
}

impl AggregateQuery {
    pub fn by(dimensions: &[Dimension]) -> Self {
        Self { dimensions: dimensions.to_vec(), ..Self::default() }
    }

    pub fn metric(mut self, name: &str, kind: Accumulator) -> Self {
        self.metrics.push(MetricSpec::new(name, kind));
        self
    }

    pub fn min_group_size(mut self, n: usize) -> Self {
        self.min_group_size = n;
        self
    }

    pub fn seed_group(mut self, key: GroupKey) -> Self {
        self.seed_groups.push(key);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    pub key:       GroupKey,
    pub row_count: usize,
    values:        Vec<(String, Option<f64>)>,
}

impl AggregateRow {
    /// Value of a named metric; `None` for an absent value or unknown name.
    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(name, _)| name == metric)
            .and_then(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, Default)]
struct MetricState {
    hits:    usize,
    sum:     f64,
    present: usize,
    min:     Option<f64>,
    max:     Option<f64>,
}

impl MetricState {
    fn observe(&mut self, kind: &Accumulator, row: &RequestRecord) {
        match kind {
            Accumulator::Count => {}
            Accumulator::CountWhere(p) | Accumulator::Rate(p) => {
                if p.matches(row) {
                    self.hits += 1;
                }
            }
            Accumulator::Sum(f)
            | Accumulator::Average(f)
            | Accumulator::Min(f)
            | Accumulator::Max(f) => {
                if let Some(v) = f.value(row) {
                    self.sum += v;
                    self.present += 1;
                    self.min = Some(self.min.map_or(v, |m| m.min(v)));
                    self.max = Some(self.max.map_or(v, |m| m.max(v)));
                }
            }
        }
    }

    fn finish(
        &self,
        spec: &MetricSpec,
        row_count: usize,
        key: &GroupKey,
    ) -> AnalyticsResult<Option<f64>> {
        Ok(match spec.kind {
            Accumulator::Count         => Some(row_count as f64),
            Accumulator::CountWhere(_) => Some(self.hits as f64),
            Accumulator::Sum(_)        => Some(self.sum),
            Accumulator::Average(_)    => {
                (self.present > 0).then(|| self.sum / self.present as f64)
            }
            Accumulator::Min(_)        => self.min,
            Accumulator::Max(_)        => self.max,
            Accumulator::Rate(_) => {
                if row_count == 0 {
                    return Err(AnalyticsError::DivisionByZero {
                        group: key.to_string(),
                        metric: spec.name.clone(),
                    });
                }
                Some(self.hits as f64 / row_count as f64)
            }
        })
    }
}

#[derive(Debug, Clone)]
struct GroupState {
    row_count: usize,
    metrics:   Vec<MetricState>,
}

impl GroupState {
    fn new(metric_count: usize) -> Self {
        Self { row_count: 0, metrics: vec![MetricState::default(); metric_count] }
    }
}

/// Group `rows` by the query's dimensions and fold every metric.
///
/// Output is ordered by group key ascending.
pub fn aggregate<'a, I>(rows: I, query: &AggregateQuery) -> AnalyticsResult<Vec<AggregateRow>>
where
    I: IntoIterator<Item = &'a RequestRecord>,
{
    let mut groups: BTreeMap<GroupKey, GroupState> = BTreeMap::new();

    for key in &query.seed_groups {
        if key.0.len() != query.dimensions.len() {
            return Err(AnalyticsError::InvalidConfig(format!(
                "seed group {key} has {} parts, query has {} dimensions",
                key.0.len(),
                query.dimensions.len()
            )));
        }
        groups
            .entry(key.clone())
            .or_insert_with(|| GroupState::new(query.metrics.len()));
    }

    for row in rows {
        let key = GroupKey(
            query
                .dimensions
                .iter()
                .map(|d| d.extract(row))
                .collect::<AnalyticsResult<Vec<_>>>()?,
        );
        let state = groups
            .entry(key)
            .or_insert_with(|| GroupState::new(query.metrics.len()));
        state.row_count += 1;
        for (spec, metric) in query.metrics.iter().zip(state.metrics.iter_mut()) {
            metric.observe(&spec.kind, row);
        }
    }

    let mut out = Vec::with_capacity(groups.len());
    for (key, state) in groups {
        if state.row_count < query.min_group_size {
            continue;
        }
        let mut values = Vec::with_capacity(query.metrics.len());
        for (spec, metric) in query.metrics.iter().zip(&state.metrics) {
            values.push((spec.name.clone(), metric.finish(spec, state.row_count, &key)?));
        }
        out.push(AggregateRow { key, row_count: state.row_count, values });
    }
    Ok(out)
}
