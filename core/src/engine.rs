//! The report engine: registry and batch runner.
//!
//! RULES:
//!   - Reports are registered once, in a fixed order; batches return
//!     results in that order.
//!   - Reports share one read-only `FactTable` and nothing else.
//!   - Each report stands alone: one report failing never discards the
//!     tables the others produced. `run_all_strict` is the fail-fast form.

use crate::{
    config::ReportConfig,
    error::{AnalyticsError, AnalyticsResult},
    fact_table::FactTable,
    report::{Report, ReportTable},
    reports::standard_reports,
};
use std::time::Instant;

/// One report's name and what it produced.
pub type ReportOutcome = (&'static str, AnalyticsResult<ReportTable>);

pub struct ReportEngine {
    config:  ReportConfig,
    reports: Vec<Box<dyn Report>>,
}

impl ReportEngine {
    /// An engine with no reports registered.
    pub fn new(config: ReportConfig) -> AnalyticsResult<Self> {
        config.validate()?;
        Ok(Self { config, reports: Vec::new() })
    }

    /// Build an engine with every standard report registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build(config: ReportConfig) -> AnalyticsResult<Self> {
        let mut engine = Self::new(config)?;
        for report in standard_reports() {
            engine.register(report);
        }
        Ok(engine)
    }

    /// Register a report. Names must be unique.
    pub fn register(&mut self, report: Box<dyn Report>) {
        debug_assert!(
            self.reports.iter().all(|r| r.name() != report.name()),
            "duplicate report name {}",
            report.name()
        );
        self.reports.push(report);
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn report_names(&self) -> Vec<&'static str> {
        self.reports.iter().map(|r| r.name()).collect()
    }

    /// Run a single report by name.
    pub fn run_one(&self, table: &FactTable, name: &str) -> AnalyticsResult<ReportTable> {
        let report = self
            .reports
            .iter()
            .find(|r| r.name() == name)
            .ok_or_else(|| AnalyticsError::ReportNotFound { name: name.to_string() })?;
        run_report(&**report, table, &self.config)
    }

    /// Run every registered report concurrently, one scoped thread each.
    /// Returns one result per report, in registration order.
    pub fn run_all(&self, table: &FactTable) -> Vec<ReportOutcome> {
        let started = Instant::now();
        let config = &self.config;

        let results: Vec<ReportOutcome> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .reports
                .iter()
                .map(|report| {
                    let name = report.name();
                    (name, scope.spawn(move || run_report(&**report, table, config)))
                })
                .collect();
            handles
                .into_iter()
                .map(|(name, handle)| {
                    let result = handle.join().unwrap_or_else(|_| {
                        Err(AnalyticsError::Other(anyhow::anyhow!("report thread panicked"))
                            .in_report(name))
                    });
                    (name, result)
                })
                .collect()
        });

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        log::info!(
            "engine: {} reports over {} rows in {:?} ({} failed)",
            results.len(),
            table.len(),
            started.elapsed(),
            failed
        );
        results
    }

    /// Like `run_all`, but the first failing report (in registration order)
    /// fails the whole batch.
    pub fn run_all_strict(&self, table: &FactTable) -> AnalyticsResult<Vec<ReportTable>> {
        self.run_all(table).into_iter().map(|(_, result)| result).collect()
    }
}

fn run_report(
    report: &dyn Report,
    table: &FactTable,
    config: &ReportConfig,
) -> AnalyticsResult<ReportTable> {
    let started = Instant::now();
    let out = report
        .build(table, config)
        .map_err(|e| e.in_report(report.name()))?;
    log::debug!(
        "report={} rows={} elapsed={:?}",
        report.name(),
        out.len(),
        started.elapsed()
    );
    Ok(out)
}
