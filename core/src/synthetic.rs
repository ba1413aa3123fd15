//! Synthetic service-request log for demos and tests.
//!
//! The log is a pure function of `SyntheticLog`: same parameters, same rows.
//! A small share of rows is deliberately defective (no neighborhood, blank
//! department, no opening time) so the cleaning transform has work to do.

use crate::{
    record::RawRequest,
    rng::{SeededRng, Stream},
};
use chrono::{Duration, NaiveDate, NaiveDateTime};

pub const DEPARTMENTS: &[(&str, i64)] = &[
    // (department, SLA target in hours)
    ("PWDx", 72),
    ("BTDT", 120),
    ("ISD", 240),
    ("PARK", 168),
    ("INFO", 48),
    ("PROP", 336),
];

pub const REASONS: &[&str] = &[
    "Street Cleaning",
    "Sanitation",
    "Highway Maintenance",
    "Enforcement & Abandoned Vehicles",
    "Code Enforcement",
    "Signs & Signals",
    "Trees",
    "Building",
    "Recycling",
    "Graffiti",
];

pub const SOURCES: &[&str] = &[
    "Citizens Connect App",
    "Constituent Call",
    "Self Service",
    "Employee Generated",
    "City Worker App",
];

pub const NEIGHBORHOODS: &[&str] = &[
    "Dorchester",
    "Roxbury",
    "South Boston",
    "Allston / Brighton",
    "Jamaica Plain",
    "Back Bay",
    "East Boston",
    "Charlestown",
    "Mattapan",
    "Hyde Park",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticLog {
    pub seed:          u64,
    pub requests:      usize,
    pub start:         NaiveDate,
    pub months:        u32,
    /// Probability that a request is still open.
    pub open_rate:     f64,
    /// Probability that a row breaks the upstream contract.
    pub defect_rate:   f64,
}

impl SyntheticLog {
    pub fn new(seed: u64, requests: usize) -> Self {
        Self {
            seed,
            requests,
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            months: 12,
            open_rate: 0.12,
            defect_rate: 0.03,
        }
    }

    pub fn generate(&self) -> Vec<RawRequest> {
        let mut timing = SeededRng::new(self.seed, Stream::Timing);
        let mut category = SeededRng::new(self.seed, Stream::Category);
        let mut location = SeededRng::new(self.seed, Stream::Location);
        let mut resolution = SeededRng::new(self.seed, Stream::Resolution);
        let mut defects = SeededRng::new(self.seed, Stream::Defects);

        let origin: NaiveDateTime = self.start.and_hms_opt(0, 0, 0).unwrap_or_default();
        let span_minutes = (self.months.max(1) as u64) * 30 * 24 * 60;

        (0..self.requests)
            .map(|i| {
                let offset = timing.next_u64_below(span_minutes) as i64;
                let opened_at = origin + Duration::minutes(offset);
                let (department, sla_hours) = *category.pick(DEPARTMENTS);
                let reason = *category.pick(REASONS);
                let source = *category.pick(SOURCES);
                let neighborhood = *location.pick(NEIGHBORHOODS);

                let closed_at = (!resolution.chance(self.open_rate)).then(|| {
                    // Heavy-tailed resolution times, capped at 90 days.
                    let hours = resolution.pareto(2.0, 1.1).min(24.0 * 90.0);
                    opened_at + Duration::minutes((hours * 60.0) as i64)
                });

                let mut row = RawRequest {
                    id:            format!("SR-{:04x}-{i:06}", self.seed & 0xffff),
                    opened_at:     Some(opened_at),
                    closed_at,
                    sla_target_at: Some(opened_at + Duration::hours(sla_hours)),
                    department:    Some(department.to_string()),
                    reason:        Some(reason.to_string()),
                    source:        Some(source.to_string()),
                    neighborhood:  Some(neighborhood.to_string()),
                };

                if defects.chance(self.defect_rate) {
                    match defects.next_u64_below(3) {
                        0 => row.neighborhood = None,
                        1 => row.department = Some(String::new()),
                        _ => row.opened_at = None,
                    }
                }
                row
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        let a = SyntheticLog::new(42, 200).generate();
        let b = SyntheticLog::new(42, 200).generate();
        assert_eq!(a, b);
        assert_ne!(a, SyntheticLog::new(43, 200).generate());
    }

    #[test]
    fn rows_fall_inside_the_requested_span() {
        let log = SyntheticLog::new(5, 500);
        let end = log.start.and_hms_opt(0, 0, 0).unwrap() + Duration::days(360);
        for row in log.generate() {
            if let Some(opened) = row.opened_at {
                assert!(opened < end);
                if let Some(closed) = row.closed_at {
                    assert!(closed >= opened);
                }
            }
        }
    }

    #[test]
    fn ids_are_unique() {
        let rows = SyntheticLog::new(9, 300).generate();
        let ids: std::collections::HashSet<_> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids.len(), rows.len());
    }
}
