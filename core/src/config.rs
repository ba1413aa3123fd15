use crate::{
    anomaly::DEFAULT_Z_THRESHOLD,
    error::{AnalyticsError, AnalyticsResult},
    timeseries::DEFAULT_ROLLING_WINDOW,
};
use serde::{Deserialize, Serialize};

/// Parameters shared by every report in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Groups with fewer rows than this are left out of grouped reports.
    pub min_group_size: usize,
    /// Trailing window, in months, for the rolling volume report.
    pub rolling_window: usize,
    /// Minimum |z| for a month to count as anomalous.
    pub z_threshold:    f64,
    /// Row limit for "top" reports and ranks kept per partition.
    pub top_n:          usize,
    /// Decimal places used when presenting floats. Never applied internally.
    pub decimal_places: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            min_group_size: 10,
            rolling_window: DEFAULT_ROLLING_WINDOW,
            z_threshold:    DEFAULT_Z_THRESHOLD,
            top_n:          10,
            decimal_places: 2,
        }
    }
}

impl ReportConfig {
    /// Load from a JSON file. Missing keys take their defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: ReportConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Config with small thresholds for use in tests on tiny fixtures.
    pub fn default_test() -> Self {
        Self { min_group_size: 1, top_n: 3, ..Self::default() }
    }

    pub fn validate(&self) -> AnalyticsResult<()> {
        if self.rolling_window == 0 {
            return Err(AnalyticsError::InvalidConfig("rolling_window must be >= 1".into()));
        }
        if self.top_n == 0 {
            return Err(AnalyticsError::InvalidConfig("top_n must be >= 1".into()));
        }
        if !self.z_threshold.is_finite() || self.z_threshold < 0.0 {
            return Err(AnalyticsError::InvalidConfig(format!(
                "z_threshold must be a finite, non-negative number (got {})",
                self.z_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let config: ReportConfig = serde_json::from_str(r#"{ "top_n": 5 }"#).unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.rolling_window, 3);
        assert_eq!(config.z_threshold, 1.5);
        assert_eq!(config.min_group_size, 10);
    }

    #[test]
    fn validate_rejects_zero_window_and_bad_threshold() {
        let zero_window = ReportConfig { rolling_window: 0, ..ReportConfig::default() };
        assert!(zero_window.validate().is_err());
        let nan = ReportConfig { z_threshold: f64::NAN, ..ReportConfig::default() };
        assert!(nan.validate().is_err());
        assert!(ReportConfig::default().validate().is_ok());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let path = std::env::temp_dir().join(format!("civic-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "min_group_size": 0, "z_threshold": 2.0 }"#).unwrap();
        let config = ReportConfig::load(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(config.min_group_size, 0);
        assert_eq!(config.z_threshold, 2.0);
    }
}
