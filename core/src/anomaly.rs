//! Anomaly scorer: z-scores against the whole series.
//!
//! Standard deviation is the POPULATION form (divide by N, no Bessel
//! correction). Reports are computed over the complete history, not a sample
//! of it.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    types::MonthBucket,
};
use serde::Serialize;

pub const DEFAULT_Z_THRESHOLD: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count:  usize,
    pub mean:   f64,
    pub stddev: f64,
}

impl SeriesStats {
    /// Mean and population standard deviation. `None` for an empty series.
    pub fn population(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Some(Self { count: values.len(), mean, stddev: variance.sqrt() })
    }

    /// True when the spread is indistinguishable from rounding noise.
    fn is_degenerate(&self) -> bool {
        self.stddev <= f64::EPSILON * self.mean.abs().max(1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredPoint {
    pub month:   MonthBucket,
    pub value:   f64,
    pub z_score: f64,
}

/// Score every point of `points`, in chronological order.
///
/// An empty series scores to an empty result. A constant series has no
/// defined score and fails with `UndefinedScore`.
pub fn z_scores(series: &str, points: &[(MonthBucket, f64)]) -> AnalyticsResult<Vec<ScoredPoint>> {
    let values: Vec<f64> = points.iter().map(|(_, v)| *v).collect();
    let Some(stats) = SeriesStats::population(&values) else {
        return Ok(Vec::new());
    };
    if stats.is_degenerate() {
        return Err(AnalyticsError::UndefinedScore { series: series.to_string() });
    }
    log::debug!(
        "anomaly: series={series} n={} mean={:.3} stddev={:.3}",
        stats.count,
        stats.mean,
        stats.stddev
    );

    let mut scored: Vec<ScoredPoint> = points
        .iter()
        .map(|(month, value)| ScoredPoint {
            month: *month,
            value: *value,
            z_score: (value - stats.mean) / stats.stddev,
        })
        .collect();
    scored.sort_by_key(|p| p.month);
    Ok(scored)
}

/// Points with `|z| >= threshold`, highest z first.
/// Equal scores fall back to chronological order.
pub fn flag_anomalies(
    series: &str,
    points: &[(MonthBucket, f64)],
    threshold: f64,
) -> AnalyticsResult<Vec<ScoredPoint>> {
    let mut flagged: Vec<ScoredPoint> = z_scores(series, points)?
        .into_iter()
        .filter(|p| p.z_score.abs() >= threshold)
        .collect();
    flagged.sort_by(|a, b| b.z_score.total_cmp(&a.z_score).then(a.month.cmp(&b.month)));
    Ok(flagged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Vec<(MonthBucket, f64)> {
        let mut month = MonthBucket::new(2023, 1).unwrap();
        values
            .iter()
            .map(|v| {
                let point = (month, *v);
                month = month.succ();
                point
            })
            .collect()
    }

    #[test]
    fn population_stats_match_hand_computation() {
        let stats = SeriesStats::population(&[10.0, 10.0, 10.0, 10.0, 40.0]).unwrap();
        assert_eq!(stats.mean, 16.0);
        assert_eq!(stats.stddev, 12.0);
    }

    #[test]
    fn spike_is_flagged_and_baseline_is_not() {
        let points = series(&[10.0, 10.0, 10.0, 10.0, 40.0]);
        let flagged = flag_anomalies("volume", &points, DEFAULT_Z_THRESHOLD).unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].value, 40.0);
        assert_eq!(flagged[0].z_score, 2.0);
        assert_eq!(flagged[0].month.to_string(), "2023-05");
    }

    #[test]
    fn negative_deviations_count_by_magnitude() {
        let points = series(&[40.0, 40.0, 40.0, 40.0, 10.0]);
        let flagged = flag_anomalies("volume", &points, 1.5).unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].z_score, -2.0);
    }

    #[test]
    fn constant_series_is_undefined() {
        let points = series(&[0.1, 0.1, 0.1]);
        assert!(matches!(
            z_scores("flat", &points),
            Err(AnalyticsError::UndefinedScore { series }) if series == "flat"
        ));
    }

    #[test]
    fn empty_series_scores_nothing() {
        assert!(flag_anomalies("none", &[], 1.5).unwrap().is_empty());
    }
}
