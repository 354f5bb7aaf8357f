// ⚙️ Institution configuration - static per-institution knowledge
//
// Column labels, rate tables, sheet names and number formats differ per
// institution. Each adapter owns one InstitutionConfig, loads it once at
// construction (built-in defaults or a JSON declarative source) and never
// mutates it afterwards.

use std::collections::BTreeMap;
use std::io;

use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};
use crate::record::DepositCategory;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstitutionConfig {
    /// Short institution code, e.g. "ARTHA"
    pub code: String,

    /// Display name, e.g. "Artha Syariah Bank"
    pub name: String,

    /// Canonical field name → source column label
    pub column_mapping: BTreeMap<String, String>,

    /// Annual profit-share rate per category code ("ID", "FD", "BV", "DI")
    pub rates: BTreeMap<String, f64>,

    /// Logical sheet role → sheet name in the source workbook
    #[serde(default)]
    pub sheet_names: BTreeMap<String, String>,

    /// Preferred date format for this institution's exports
    #[serde(default = "default_date_format")]
    pub date_format: String,

    #[serde(default = "default_decimal_separator")]
    pub decimal_separator: char,

    #[serde(default = "default_thousand_separator")]
    pub thousand_separator: char,

    /// Accrual year basis; 360 throughout this domain
    #[serde(default = "default_year_days")]
    pub year_days: i64,

    /// Rate used when neither the record nor the rate table has one
    #[serde(default = "default_fallback_rate")]
    pub fallback_rate: f64,
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_decimal_separator() -> char {
    ','
}

fn default_thousand_separator() -> char {
    '.'
}

fn default_year_days() -> i64 {
    crate::record::YEAR_DAYS
}

fn default_fallback_rate() -> f64 {
    0.048
}

impl InstitutionConfig {
    /// Load a configuration from a JSON declarative source.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: InstitutionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from an open JSON handle.
    pub fn from_json_reader<R: io::Read>(reader: R) -> Result<Self> {
        let config: InstitutionConfig =
            serde_json::from_reader(reader).map_err(|e| ReconError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(ReconError::Config("institution code is empty".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(ReconError::Config(format!(
                "institution '{}' has no display name",
                self.code
            )));
        }
        if self.year_days <= 0 {
            return Err(ReconError::Config(format!(
                "institution '{}' has invalid year basis {}",
                self.code, self.year_days
            )));
        }
        Ok(())
    }

    /// Source column label for a canonical field. Unmapped fields fall back
    /// to the canonical name itself.
    pub fn column<'a>(&'a self, field: &'a str) -> &'a str {
        self.column_mapping
            .get(field)
            .map(String::as_str)
            .unwrap_or(field)
    }

    /// Rate-table entry for a category, if configured.
    pub fn rate_for(&self, category: DepositCategory) -> Option<f64> {
        self.rates.get(category.code()).copied()
    }

    /// Sheet name for a logical role, if configured.
    pub fn sheet_name(&self, role: &str) -> Option<&str> {
        self.sheet_names.get(role).map(String::as_str)
    }
}

// ============================================================================
// TESTS
// ============================================================================
