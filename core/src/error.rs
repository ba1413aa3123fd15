use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record '{record_id}' is missing required field '{field}'")]
    MissingField { record_id: String, field: &'static str },

    #[error("Division by zero computing '{metric}' for group {group}")]
    DivisionByZero { group: String, metric: String },

    #[error("z-score undefined for series '{series}': standard deviation is zero")]
    UndefinedScore { series: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Report '{name}' not found")]
    ReportNotFound { name: String },

    #[error("Report '{report}' failed: {source}")]
    Report {
        report: String,
        #[source]
        source: Box<AnalyticsError>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnalyticsError {
    /// Attach the name of the report that was being assembled.
    pub fn in_report(self, report: &str) -> Self {
        match self {
            already @ AnalyticsError::Report { .. } => already,
            other => AnalyticsError::Report {
                report: report.to_string(),
                source: Box::new(other),
            },
        }
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
