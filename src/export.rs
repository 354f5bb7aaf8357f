// 📤 Export shaping - flat, display-ready rows for downstream collaborators
//
// The rendering layer (tables, spreadsheets, narrative generation) consumes
// plain structured data. Nothing here interprets results; enum values are
// flattened to their labels and that is the extent of the logic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{round2, ReconResult};
use crate::summary::Summary;

/// One detail row of a reconciliation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub institution: String,
    pub certificate_no: String,
    pub account_no: String,
    pub category: String,
    pub principal: f64,
    pub primary_yield: f64,
    pub counterparty_yield: f64,
    pub variance: f64,
    pub variance_pct: f64,
    pub status: String,
    pub priority: String,
    pub period: String,
    pub notes: String,
}

/// Flatten results into display-ready detail rows, preserving order.
pub fn results_as_table(results: &[ReconResult]) -> Vec<ResultRow> {
    results
        .iter()
        .map(|result| ResultRow {
            institution: result.institution.clone(),
            certificate_no: result.certificate_no.clone(),
            account_no: result.account_no.clone(),
            category: result.category.label().to_string(),
            principal: result.principal,
            primary_yield: result.primary_yield,
            counterparty_yield: result.counterparty_yield,
            variance: result.variance,
            variance_pct: result.variance_pct,
            status: result.status.label().to_string(),
            priority: result.priority().to_string(),
            period: result.period.clone(),
            notes: result.notes.clone().unwrap_or_default(),
        })
        .collect()
}

/// One institution's line in the side-by-side comparison table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRow {
    pub institution: String,
    pub total_records: usize,
    pub matched: usize,
    pub difference: usize,
    pub match_rate: f64,
    pub total_principal: f64,
    pub total_primary_yield: f64,
    pub total_counterparty_yield: f64,
    pub total_variance: f64,
    pub variance_pct: f64,
}

/// Flatten a summary into one comparison row.
pub fn summary_row(summary: &Summary) -> SummaryRow {
    SummaryRow {
        institution: summary.institution_name.clone(),
        total_records: summary.total_records,
        matched: summary.matched_records,
        difference: summary.difference_records,
        match_rate: round2(summary.match_rate),
        total_principal: summary.total_principal,
        total_primary_yield: summary.total_primary_yield,
        total_counterparty_yield: summary.total_counterparty_yield,
        total_variance: summary.total_variance,
        variance_pct: (summary.variance_pct * 10_000.0).round() / 10_000.0,
    }
}

/// Summary as a plain nested map for the narrative/reporting collaborators.
pub fn summary_as_map(summary: &Summary) -> Value {
    serde_json::to_value(summary).unwrap_or(Value::Null)
}

// ============================================================================
// TESTS
// ============================================================================
