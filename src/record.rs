// 📋 Record Model - Canonical deposit records + reconciliation results
//
// One DepositRecord is a single instrument observation from one source
// (the reporting bank or the oversight body). Records are built once during
// parsing and never mutated afterwards; reconciliation only reads them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Fixed 360-day accrual year used across the whole domain.
pub const YEAR_DAYS: i64 = 360;

// ============================================================================
// ENUMS
// ============================================================================

/// DepositCategory - classification of a deposit/placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DepositCategory {
    InitialDeposit,
    FinalDeposit,
    BenefitValue,
    DepositInsurance,
    Other,
}

impl DepositCategory {
    /// Short code for internal use and rate-table keys
    pub fn code(&self) -> &'static str {
        match self {
            DepositCategory::InitialDeposit => "ID",
            DepositCategory::FinalDeposit => "FD",
            DepositCategory::BenefitValue => "BV",
            DepositCategory::DepositInsurance => "DI",
            DepositCategory::Other => "OTH",
        }
    }

    /// Human-readable name for display
    pub fn label(&self) -> &'static str {
        match self {
            DepositCategory::InitialDeposit => "Initial Deposit",
            DepositCategory::FinalDeposit => "Final Deposit",
            DepositCategory::BenefitValue => "Benefit Value",
            DepositCategory::DepositInsurance => "Deposit Insurance",
            DepositCategory::Other => "Other",
        }
    }

    /// All categories, in reporting order
    pub fn all() -> [DepositCategory; 5] {
        [
            DepositCategory::InitialDeposit,
            DepositCategory::FinalDeposit,
            DepositCategory::BenefitValue,
            DepositCategory::DepositInsurance,
            DepositCategory::Other,
        ]
    }
}

/// Which side of the reconciliation a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordSource {
    /// The reporting institution's own ledger
    Primary,
    /// The independent oversight body's records
    Counterparty,
}

/// ReconStatus - classification of one reconciliation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReconStatus {
    Matched,
    Difference,
    NotFoundInPrimary,
    NotFoundInCounterparty,
    Pending,
}

impl ReconStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReconStatus::Matched => "Matched",
            ReconStatus::Difference => "Difference",
            ReconStatus::NotFoundInPrimary => "Not Found in Primary",
            ReconStatus::NotFoundInCounterparty => "Not Found in Counterparty",
            ReconStatus::Pending => "Pending",
        }
    }
}

// ============================================================================
// DEPOSIT RECORD
// ============================================================================

/// DepositRecord - one financial instrument observation from one source
///
/// Identity is the (certificate_no, account_no) pair; adapters drop rows where
/// either is blank, so downstream code can rely on both being non-empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepositRecord {
    pub institution: String,
    pub certificate_no: String,
    pub account_no: String,
    pub principal: f64,
    pub yield_amount: f64,
    pub category: DepositCategory,
    pub placement_date: Option<NaiveDate>,
    pub maturity_date: Option<NaiveDate>,
    pub settlement_date: Option<NaiveDate>,
    pub rate: Option<f64>,
    pub holding_days: Option<i64>,
    pub source: RecordSource,
}

impl DepositRecord {
    /// Create a new record with required fields.
    ///
    /// Identity fields are trimmed, amounts are clamped to be non-negative.
    /// Optional fields are attached via the builder methods below.
    pub fn new(
        institution: &str,
        certificate_no: &str,
        account_no: &str,
        principal: f64,
        yield_amount: f64,
        category: DepositCategory,
        source: RecordSource,
    ) -> Self {
        DepositRecord {
            institution: institution.trim().to_string(),
            certificate_no: certificate_no.trim().to_string(),
            account_no: account_no.trim().to_string(),
            principal: principal.max(0.0),
            yield_amount: yield_amount.max(0.0),
            category,
            placement_date: None,
            maturity_date: None,
            settlement_date: None,
            rate: None,
            holding_days: None,
            source,
        }
    }

    /// Builder pattern: attach placement date
    pub fn with_placement_date(mut self, date: Option<NaiveDate>) -> Self {
        self.placement_date = date;
        self.recompute_holding_days();
        self
    }

    /// Builder pattern: attach maturity date
    pub fn with_maturity_date(mut self, date: Option<NaiveDate>) -> Self {
        self.maturity_date = date;
        self.recompute_holding_days();
        self
    }

    /// Builder pattern: attach settlement date
    pub fn with_settlement_date(mut self, date: Option<NaiveDate>) -> Self {
        self.settlement_date = date;
        self
    }

    /// Builder pattern: attach contractual rate
    pub fn with_rate(mut self, rate: Option<f64>) -> Self {
        self.rate = rate;
        self
    }

    /// Holding period = maturity - placement, in days. Left unset when either
    /// date is missing or the span is negative.
    fn recompute_holding_days(&mut self) {
        self.holding_days = match (self.placement_date, self.maturity_date) {
            (Some(start), Some(end)) => {
                let days = (end - start).num_days();
                if days >= 0 {
                    Some(days)
                } else {
                    None
                }
            }
            _ => None,
        };
    }

    /// True when both identity fields are present
    pub fn has_identity(&self) -> bool {
        !self.certificate_no.is_empty() && !self.account_no.is_empty()
    }

    /// Reconciliation key: (certificate number, account number)
    pub fn key(&self) -> (String, String) {
        (self.certificate_no.clone(), self.account_no.clone())
    }

    /// Reporting period label derived from placement date, e.g. "Apr-25"
    pub fn period_label(&self) -> String {
        match self.placement_date {
            Some(date) => date.format("%b-%y").to_string(),
            None => "N/A".to_string(),
        }
    }
}

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

/// ReconResult - outcome of comparing one matched or unmatched record
///
/// Produced once by the reconciliation algorithm and read-only afterwards.
/// The variance is primary_yield - counterparty_yield, exactly; downstream
/// consumers never recompute it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconResult {
    pub institution: String,
    pub certificate_no: String,
    pub account_no: String,
    pub principal: f64,
    pub primary_yield: f64,
    pub counterparty_yield: f64,
    pub variance: f64,
    pub variance_pct: f64,
    pub status: ReconStatus,
    pub category: DepositCategory,
    pub period: String,
    pub notes: Option<String>,
}

impl ReconResult {
    /// Check if the variance percentage exceeds a materiality threshold
    pub fn is_material(&self, threshold: f64) -> bool {
        self.variance_pct.abs() > threshold
    }

    /// Qualitative priority band based on the variance percentage
    pub fn priority(&self) -> &'static str {
        let abs_pct = self.variance_pct.abs();
        if abs_pct < 0.1 {
            "Low"
        } else if abs_pct < 0.5 {
            "Medium"
        } else if abs_pct < 1.0 {
            "High"
        } else {
            "Critical"
        }
    }
}

// ============================================================================
// SCALAR NORMALIZATION
// ============================================================================

/// Fallback formats tried after the institution's configured one.
const COMMON_DATE_FORMATS: [&str; 5] = ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d", "%d %b %Y", "%d %B %Y"];

/// Parse an amount cell into a non-negative f64.
///
/// Honors the institution's thousand/decimal separators so "1.250.000,75"
/// (separator style ".," ) and "1,250,000.75" (style ",.") both work. Malformed
/// input degrades to 0.0 so one bad cell never sinks the row.
pub fn parse_amount(raw: &str, thousand_sep: char, decimal_sep: char) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let cleaned: String = trimmed
        .chars()
        .filter_map(|c| {
            if c == thousand_sep {
                None
            } else if c == decimal_sep {
                Some('.')
            } else if c.is_ascii_digit() || c == '-' {
                Some(c)
            } else {
                // currency symbols, spaces, stray markup
                None
            }
        })
        .collect();

    cleaned.parse::<f64>().unwrap_or(0.0).max(0.0)
}

/// Parse a date cell, trying the preferred format first and then a fixed list
/// of common formats. Returns None when nothing matches.
pub fn parse_date(raw: &str, preferred_format: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, preferred_format) {
        return Some(date);
    }

    for fmt in COMMON_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Some(date);
        }
    }

    // Timestamps like "2025-04-01 00:00:00" show up when sheets are exported
    let date_part = trimmed.split_whitespace().next()?;
    if date_part != trimmed {
        return parse_date(date_part, preferred_format);
    }

    None
}

/// Round to 2 decimal places (currency precision)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// TESTS
// ============================================================================
