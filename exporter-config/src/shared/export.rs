use std::path::PathBuf;

use serde::Deserialize;

use crate::shared::ValidationError;

/// Paging and output settings for the extraction pipeline.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ExportConfig {
    /// Number of identifiers covered by a single page query.
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    /// Process each id range as two halves that are archived separately.
    #[serde(default)]
    pub split_in_half: bool,
    /// Root directory for archives; each table gets its own subdirectory.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Pause between part groups when combining split archives, in milliseconds.
    #[serde(default = "default_combine_delay_ms")]
    pub combine_delay_ms: u64,
    /// Where located day ranges are persisted for later runs.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
}

impl ExportConfig {
    /// Default number of ids per page.
    pub const DEFAULT_PAGE_SIZE: i64 = 100_000;

    /// Default pause between combined directories.
    pub const DEFAULT_COMBINE_DELAY_MS: u64 = 10_000;

    /// Ensures page_size is positive.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page_size <= 0 {
            return Err(ValidationError::InvalidFieldValue {
                field: "export.page_size".to_string(),
                constraint: "must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            split_in_half: false,
            output_dir: default_output_dir(),
            combine_delay_ms: default_combine_delay_ms(),
            ledger_path: default_ledger_path(),
        }
    }
}

fn default_page_size() -> i64 {
    ExportConfig::DEFAULT_PAGE_SIZE
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("export")
}

fn default_combine_delay_ms() -> u64 {
    ExportConfig::DEFAULT_COMBINE_DELAY_MS
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("located_ranges.csv")
}
