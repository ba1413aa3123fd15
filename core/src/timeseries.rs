//! Time-series engine: month bucketing, lag/delta, trailing averages.
//!
//! Series are keyed by `MonthBucket` and always processed in chronological
//! order, whatever order the caller passes them in.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    types::MonthBucket,
};
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_ROLLING_WINDOW: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LagPoint {
    pub month:      MonthBucket,
    pub value:      f64,
    /// Value of the preceding point; `None` for the first point.
    pub previous:   Option<f64>,
    /// `value − previous`; `None` whenever `previous` is `None`.
    pub delta:      Option<f64>,
    /// `delta / previous`; also `None` when `previous` is zero.
    pub pct_change: Option<f64>,
}

/// Previous value and change for each point of one partition's series.
pub fn lag_delta(points: &[(MonthBucket, f64)]) -> Vec<LagPoint> {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|(month, _)| *month);

    let mut previous: Option<f64> = None;
    sorted
        .into_iter()
        .map(|(month, value)| {
            let delta = previous.map(|p| value - p);
            let pct_change = match (previous, delta) {
                (Some(p), Some(d)) if p != 0.0 => Some(d / p),
                _ => None,
            };
            let point = LagPoint { month, value, previous, delta, pct_change };
            previous = Some(value);
            point
        })
        .collect()
}

/// `lag_delta` applied independently to every partition.
///
/// Output is grouped by partition key ascending, chronological within each.
pub fn lag_delta_by_partition<K>(points: Vec<(K, MonthBucket, f64)>) -> Vec<(K, LagPoint)>
where
    K: Ord + Clone,
{
    let mut partitions: BTreeMap<K, Vec<(MonthBucket, f64)>> = BTreeMap::new();
    for (key, month, value) in points {
        partitions.entry(key).or_default().push((month, value));
    }
    partitions
        .into_iter()
        .flat_map(|(key, series)| {
            lag_delta(&series)
                .into_iter()
                .map(move |point| (key.clone(), point))
        })
        .collect()
}

/// Trailing mean over the current value and up to `window − 1` before it.
///
/// The first `window − 1` outputs average whatever is available; nothing is
/// padded and nothing is skipped.
pub fn rolling_average(values: &[f64], window: usize) -> AnalyticsResult<Vec<f64>> {
    if window == 0 {
        return Err(AnalyticsError::InvalidConfig(
            "rolling window must be at least 1".into(),
        ));
    }
    Ok((0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let span = &values[start..=i];
            span.iter().sum::<f64>() / span.len() as f64
        })
        .collect())
}

/// Chronological series with every month between the first and last present.
/// Months missing from the input get `0.0`. Duplicate months are summed.
pub fn densify_months(points: &[(MonthBucket, f64)]) -> Vec<(MonthBucket, f64)> {
    let mut by_month: BTreeMap<MonthBucket, f64> = BTreeMap::new();
    for (month, value) in points {
        *by_month.entry(*month).or_insert(0.0) += value;
    }
    let (Some(first), Some(last)) = (
        by_month.keys().next().copied(),
        by_month.keys().next_back().copied(),
    ) else {
        return Vec::new();
    };

    let mut out = Vec::with_capacity(first.months_until(last) as usize + 1);
    let mut month = first;
    while month <= last {
        out.push((month, by_month.get(&month).copied().unwrap_or(0.0)));
        month = month.succ();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(year: i32, month: u32) -> MonthBucket {
        MonthBucket::new(year, month).unwrap()
    }

    #[test]
    fn rolling_average_uses_partial_start_window() {
        let out = rolling_average(&[10.0, 20.0, 30.0, 40.0], 3).unwrap();
        assert_eq!(out, vec![10.0, 15.0, 20.0, 30.0]);
    }

    #[test]
    fn rolling_window_of_one_is_identity() {
        let out = rolling_average(&[3.0, 1.0, 4.0], 1).unwrap();
        assert_eq!(out, vec![3.0, 1.0, 4.0]);
    }

    #[test]
    fn rolling_window_zero_rejected() {
        assert!(matches!(
            rolling_average(&[1.0], 0),
            Err(AnalyticsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn lag_delta_first_point_has_no_delta() {
        let out = lag_delta(&[(m(2024, 3), 9.0), (m(2024, 1), 5.0), (m(2024, 2), 7.0)]);
        let deltas: Vec<_> = out.iter().map(|p| p.delta).collect();
        assert_eq!(deltas, vec![None, Some(2.0), Some(2.0)]);
        assert_eq!(out[0].previous, None);
        assert_eq!(out[1].previous, Some(5.0));
        assert_eq!(out[0].month, m(2024, 1));
    }

    #[test]
    fn pct_change_absent_when_previous_is_zero() {
        let out = lag_delta(&[(m(2024, 1), 0.0), (m(2024, 2), 4.0), (m(2024, 3), 6.0)]);
        assert_eq!(out[1].delta, Some(4.0));
        assert_eq!(out[1].pct_change, None);
        assert_eq!(out[2].pct_change, Some(0.5));
    }

    #[test]
    fn partitions_do_not_leak_into_each_other() {
        let points = vec![
            ("B", m(2024, 1), 1.0),
            ("A", m(2024, 1), 10.0),
            ("B", m(2024, 2), 3.0),
            ("A", m(2024, 2), 4.0),
        ];
        let out = lag_delta_by_partition(points);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].0, "A");
        assert_eq!(out[0].1.delta, None);
        assert_eq!(out[1].1.delta, Some(-6.0));
        assert_eq!(out[2].0, "B");
        assert_eq!(out[2].1.delta, None);
        assert_eq!(out[3].1.delta, Some(2.0));
    }

    #[test]
    fn densify_fills_missing_months_across_year_end() {
        let out = densify_months(&[(m(2024, 2), 5.0), (m(2023, 11), 2.0)]);
        let months: Vec<String> = out.iter().map(|(mb, _)| mb.to_string()).collect();
        assert_eq!(months, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(out[1].1, 0.0);
        assert_eq!(out[3].1, 5.0);
        assert!(densify_months(&[]).is_empty());
    }
}
