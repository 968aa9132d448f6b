use crate::error::{BorReportError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const DEFAULT_DISPLAY_LABEL_TYPE: &str = "MX_DSPLABEL";
pub const DEFAULT_INTERNAL_SYSTEM_INSTANCE_ID: &str = "BOR.internal";

/// How records are read out of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    /// Security identifier type whose value names the instrument.
    pub display_label_type: String,
    /// Lot origin-system marker of unallocated positions, which are skipped.
    pub internal_system_instance_id: String,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            display_label_type: DEFAULT_DISPLAY_LABEL_TYPE.to_string(),
            internal_system_instance_id: DEFAULT_INTERNAL_SYSTEM_INSTANCE_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub beneficial_owner_securities: PathBuf,
    pub realized_pl: PathBuf,
    pub realized_amortization: PathBuf,
    pub ca_income: PathBuf,
    pub historical_pl: PathBuf,
}

impl OutputPaths {
    /// Default file names placed under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            beneficial_owner_securities: dir
                .join("parsed_output_beneficial_owner_securities.csv"),
            realized_pl: dir.join("parsed_output_realized_pl.csv"),
            realized_amortization: dir.join("parsed_output_realized_amortization.csv"),
            ca_income: dir.join("parsed_output_ca_income.csv"),
            historical_pl: dir.join("historical_pl.csv"),
        }
    }

    pub fn all(&self) -> [(&'static str, &Path); 5] {
        [
            ("beneficial owner securities", self.beneficial_owner_securities.as_path()),
            ("realized pl", self.realized_pl.as_path()),
            ("realized amortization", self.realized_amortization.as_path()),
            ("ca income", self.ca_income.as_path()),
            ("historical pl", self.historical_pl.as_path()),
        ]
    }
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self::in_dir("outputs")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub input: PathBuf,
    pub outputs: OutputPaths,
    pub extraction: ExtractionSettings,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("input/BOR_statement_Historical_PL.json"),
            outputs: OutputPaths::default(),
            extraction: ExtractionSettings::default(),
        }
    }
}

impl ReportConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: ReportConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.extraction.display_label_type.trim().is_empty() {
            return Err(BorReportError::ConfigError(
                "display_label_type must not be empty".to_string(),
            ));
        }
        if self.extraction.internal_system_instance_id.trim().is_empty() {
            return Err(BorReportError::ConfigError(
                "internal_system_instance_id must not be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for (name, path) in self.outputs.all() {
            if !seen.insert(path) {
                return Err(BorReportError::ConfigError(format!(
                    "output '{}' reuses path {}",
                    name,
                    path.display()
                )));
            }
        }

        Ok(())
    }
}
