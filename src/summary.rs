// 📊 Summary & KPI aggregation
//
// Everything here is a straight reduction over reconciliation results,
// recomputed fresh on every request. Percentage math is guarded by explicit
// zero checks so empty or degenerate result sets stay well-defined.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::record::{round2, DepositCategory, ReconResult, ReconStatus};

// ============================================================================
// PER-INSTITUTION SUMMARY
// ============================================================================

/// Per-category slice of a summary. Only categories with at least one result
/// are reported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryBreakdown {
    pub category: DepositCategory,
    pub count: usize,
    pub total_principal: f64,
    pub total_primary_yield: f64,
    pub total_counterparty_yield: f64,
    pub total_variance: f64,
}

/// Aggregate over one institution's result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub institution: String,
    pub institution_name: String,
    pub total_records: usize,
    pub matched_records: usize,
    pub difference_records: usize,
    pub not_found_in_primary: usize,
    pub not_found_in_counterparty: usize,
    pub match_rate: f64,
    pub total_principal: f64,
    pub total_primary_yield: f64,
    pub total_counterparty_yield: f64,
    pub total_variance: f64,
    pub variance_pct: f64,
    pub by_category: Vec<CategoryBreakdown>,
    pub generated_at: DateTime<Utc>,
}

/// Reduce one institution's results into a summary.
pub fn summarize(code: &str, name: &str, results: &[ReconResult]) -> Summary {
    let total_records = results.len();
    let count_status = |status: ReconStatus| results.iter().filter(|r| r.status == status).count();

    let matched_records = count_status(ReconStatus::Matched);
    let difference_records = count_status(ReconStatus::Difference);
    let not_found_in_primary = count_status(ReconStatus::NotFoundInPrimary);
    let not_found_in_counterparty = count_status(ReconStatus::NotFoundInCounterparty);

    let total_principal: f64 = results.iter().map(|r| r.principal).sum();
    let total_primary_yield: f64 = results.iter().map(|r| r.primary_yield).sum();
    let total_counterparty_yield: f64 = results.iter().map(|r| r.counterparty_yield).sum();
    let total_variance: f64 = results.iter().map(|r| r.variance).sum();

    let match_rate = if total_records > 0 {
        matched_records as f64 / total_records as f64 * 100.0
    } else {
        0.0
    };
    let variance_pct = if total_primary_yield != 0.0 {
        total_variance / total_primary_yield * 100.0
    } else {
        0.0
    };

    let by_category = DepositCategory::all()
        .into_iter()
        .filter_map(|category| {
            let slice: Vec<&ReconResult> =
                results.iter().filter(|r| r.category == category).collect();
            if slice.is_empty() {
                return None;
            }
            Some(CategoryBreakdown {
                category,
                count: slice.len(),
                total_principal: slice.iter().map(|r| r.principal).sum(),
                total_primary_yield: slice.iter().map(|r| r.primary_yield).sum(),
                total_counterparty_yield: slice.iter().map(|r| r.counterparty_yield).sum(),
                total_variance: slice.iter().map(|r| r.variance).sum(),
            })
        })
        .collect();

    Summary {
        institution: code.to_string(),
        institution_name: name.to_string(),
        total_records,
        matched_records,
        difference_records,
        not_found_in_primary,
        not_found_in_counterparty,
        match_rate,
        total_principal,
        total_primary_yield,
        total_counterparty_yield,
        total_variance,
        variance_pct,
        by_category,
        generated_at: Utc::now(),
    }
}

// ============================================================================
// CROSS-INSTITUTION KPIs
// ============================================================================

/// Qualitative band for the overall score. Thresholds are fixed business
/// constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn label(&self) -> &'static str {
        match self {
            ScoreBand::Excellent => "Excellent",
            ScoreBand::Good => "Good",
            ScoreBand::Fair => "Fair",
            ScoreBand::Poor => "Poor",
        }
    }

    fn from_score(score: f64) -> Self {
        if score >= 95.0 {
            ScoreBand::Excellent
        } else if score >= 85.0 {
            ScoreBand::Good
        } else if score >= 70.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }
}

/// Fleet-wide KPI metrics across all reconciled institutions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KpiReport {
    pub total_records: usize,
    pub total_matched: usize,
    pub match_rate: f64,
    pub total_variance: f64,
    pub variance_rate: f64,
    pub accuracy_score: f64,
    pub quality_score: f64,
    pub overall_score: f64,
    pub band: ScoreBand,
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Combine per-institution summaries into fleet KPIs.
///
/// overall = 0.6 × accuracy + 0.4 × quality, where accuracy is the overall
/// match rate and quality is 100 − variance_rate × 100 floored at 0.
pub fn compute_kpis<'a>(summaries: impl IntoIterator<Item = &'a Summary>) -> KpiReport {
    let mut total_records = 0usize;
    let mut total_matched = 0usize;
    let mut total_variance = 0.0f64;
    let mut total_primary_yield = 0.0f64;

    for summary in summaries {
        total_records += summary.total_records;
        total_matched += summary.matched_records;
        total_variance += summary.total_variance;
        total_primary_yield += summary.total_primary_yield;
    }

    let match_rate = if total_records > 0 {
        total_matched as f64 / total_records as f64 * 100.0
    } else {
        0.0
    };
    let variance_rate = if total_primary_yield > 0.0 {
        (total_variance / total_primary_yield * 100.0).abs()
    } else {
        0.0
    };

    let accuracy_score = match_rate;
    let quality_score = (100.0 - variance_rate * 100.0).max(0.0);
    let overall_score = accuracy_score * 0.6 + quality_score * 0.4;

    KpiReport {
        total_records,
        total_matched,
        match_rate: round2(match_rate),
        total_variance,
        variance_rate: round4(variance_rate),
        accuracy_score: round2(accuracy_score),
        quality_score: round2(quality_score),
        overall_score: round2(overall_score),
        band: ScoreBand::from_score(overall_score),
    }
}

// ============================================================================
// EXCEPTIONS
// ============================================================================

/// Materiality threshold used when the caller does not supply one, percent.
pub const DEFAULT_EXCEPTION_THRESHOLD: f64 = 0.5;

/// Results whose absolute variance percentage exceeds the threshold, in
/// original result order.
pub fn exceptions(results: &[ReconResult], threshold: f64) -> Vec<ReconResult> {
    results
        .iter()
        .filter(|r| r.is_material(threshold))
        .cloned()
        .collect()
}

// ============================================================================
// TREND GROUPING
// ============================================================================

/// Dimension to group results by for trend analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendDimension {
    Period,
    Category,
    Status,
}

/// One group of the trend analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendGroup {
    pub key: String,
    pub count: usize,
    pub variance_sum: f64,
    pub variance_mean: f64,
    pub variance_pct_mean: f64,
}

/// Group results along one dimension with per-group variance statistics.
/// Groups come back sorted by key.
pub fn trend_groups(results: &[ReconResult], dimension: TrendDimension) -> Vec<TrendGroup> {
    let mut groups: BTreeMap<String, Vec<&ReconResult>> = BTreeMap::new();
    for result in results {
        let key = match dimension {
            TrendDimension::Period => result.period.clone(),
            TrendDimension::Category => result.category.label().to_string(),
            TrendDimension::Status => result.status.label().to_string(),
        };
        groups.entry(key).or_default().push(result);
    }

    groups
        .into_iter()
        .map(|(key, members)| {
            let count = members.len();
            let variance_sum: f64 = members.iter().map(|r| r.variance).sum();
            let pct_sum: f64 = members.iter().map(|r| r.variance_pct).sum();
            TrendGroup {
                key,
                count,
                variance_sum: round2(variance_sum),
                variance_mean: round2(variance_sum / count as f64),
                variance_pct_mean: round2(pct_sum / count as f64),
            }
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
