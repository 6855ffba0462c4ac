//! Validation configuration.

/// Configuration for validation checks.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Maximum number of findings to report per category.
    pub max_findings_per_category: usize,

    /// Report receives without a matched send.
    pub warn_unmatched: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_findings_per_category: 10,
            warn_unmatched: true,
        }
    }
}
