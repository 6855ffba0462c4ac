//! Analysis configuration.
//!
//! Loaded from a JSON file with every field optional; command-line flags are
//! applied on top by the binary.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

use crate::trace::{DIFFERENTIAL_LATENESS_METRIC, LATENESS_METRIC};

/// A metric computed as the part of `base` attributable to each event alone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DifferentialMetric {
    pub derived: String,
    pub base: String,
}

impl DifferentialMetric {
    pub fn new(derived: &str, base: &str) -> Self {
        Self {
            derived: derived.to_string(),
            base: base.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Compute aggregate values alongside direct ones.
    pub aggregates: bool,
    /// Merge runs of non-blocking sends into one step.
    pub coalesce_isends: bool,
    /// Regex selecting which metrics are written as attributes.
    pub export_metrics: String,
    /// Refuse to analyze traces with structural errors.
    pub validate: bool,
    pub differential: Vec<DifferentialMetric>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            aggregates: true,
            coalesce_isends: false,
            export_metrics: ".*".to_string(),
            validate: true,
            differential: vec![DifferentialMetric::new(
                DIFFERENTIAL_LATENESS_METRIC,
                LATENESS_METRIC,
            )],
        }
    }
}

impl AnalysisConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open config {}", path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// The compiled `export_metrics` filter, anchored to whole names.
    pub fn metric_filter(&self) -> Result<Regex> {
        Regex::new(&format!("^(?:{})$", self.export_metrics))
            .with_context(|| format!("Invalid metric filter '{}'", self.export_metrics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert!(config.aggregates);
        assert!(!config.coalesce_isends);
        assert!(config.validate);
        assert_eq!(
            config.differential,
            vec![DifferentialMetric::new("D.Lateness", "Lateness")]
        );
        assert!(config.metric_filter().unwrap().is_match("anything"));
    }

    #[test]
    fn test_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"coalesce_isends": true, "export_metrics": "D\\..*"}}"#
        )
        .unwrap();

        let config = AnalysisConfig::from_path(file.path()).unwrap();
        assert!(config.coalesce_isends);
        assert!(config.aggregates);
        let filter = config.metric_filter().unwrap();
        assert!(filter.is_match("D.Lateness"));
        assert!(!filter.is_match("Lateness"));
    }

    #[test]
    fn test_rejects_unknown_fields() {
        let result: Result<AnalysisConfig, _> = serde_json::from_str(r#"{"agregates": false}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_filter() {
        let config = AnalysisConfig {
            export_metrics: "(".to_string(),
            ..Default::default()
        };
        assert!(config.metric_filter().is_err());
    }
}
