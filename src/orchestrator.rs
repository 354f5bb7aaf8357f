// 🎛️ Orchestrator - multi-institution reconciliation driver
//
// Owns the adapter registry and the per-institution result cache for one
// reconciliation session. Every institution-level operation returns a tagged
// outcome; errors raised anywhere in the parse → reconcile → summarize
// pipeline are converted to structured failures here and never propagate raw
// to callers. Batch runs are sequential and per-institution independent, so
// one broken source never hides another institution's results.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::adapter::InstitutionAdapter;
use crate::error::{ReconError, Result};
use crate::export::{results_as_table, summary_row, ResultRow, SummaryRow};
use crate::record::ReconResult;
use crate::reconcile::reconcile;
use crate::summary::{exceptions, summarize, trend_groups, Summary, TrendDimension, TrendGroup};
use crate::table::Workbook;

// ============================================================================
// OUTCOME
// ============================================================================

/// Tagged result of one institution's reconciliation run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconOutcome {
    Success {
        institution: String,
        institution_name: String,
        summary: Summary,
        results: Vec<ReconResult>,
        primary_count: usize,
        counterparty_count: usize,
        completed_at: DateTime<Utc>,
    },
    Failure {
        institution: String,
        error: String,
        completed_at: DateTime<Utc>,
    },
}

impl ReconOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReconOutcome::Success { .. })
    }

    pub fn institution(&self) -> &str {
        match self {
            ReconOutcome::Success { institution, .. } => institution,
            ReconOutcome::Failure { institution, .. } => institution,
        }
    }

    pub fn summary(&self) -> Option<&Summary> {
        match self {
            ReconOutcome::Success { summary, .. } => Some(summary),
            ReconOutcome::Failure { .. } => None,
        }
    }

    pub fn results(&self) -> Option<&[ReconResult]> {
        match self {
            ReconOutcome::Success { results, .. } => Some(results),
            ReconOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ReconOutcome::Success { .. } => None,
            ReconOutcome::Failure { error, .. } => Some(error),
        }
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct Orchestrator {
    adapters: HashMap<String, Box<dyn InstitutionAdapter>>,
    /// Most recent results per institution, last-write-wins
    cache: HashMap<String, Vec<ReconResult>>,
}

impl Orchestrator {
    /// Empty session: no adapters registered.
    pub fn new() -> Self {
        Orchestrator {
            adapters: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Session pre-loaded with the built-in institutions.
    pub fn with_default_institutions() -> Self {
        let mut orchestrator = Orchestrator::new();
        orchestrator.register(Box::new(crate::adapter::ArthaAdapter::new()));
        orchestrator.register(Box::new(crate::adapter::SentosaAdapter::new()));
        orchestrator
    }

    /// Add or replace the adapter for an institution code.
    pub fn register(&mut self, adapter: Box<dyn InstitutionAdapter>) {
        let code = adapter.code().to_string();
        info!(institution = code.as_str(), "registered institution adapter");
        self.adapters.insert(code, adapter);
    }

    /// Registered institution codes, sorted.
    pub fn institutions(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.adapters.keys().cloned().collect();
        codes.sort();
        codes
    }

    /// Run the full pipeline for one institution. All failures come back as
    /// a structured outcome.
    pub fn reconcile_one(
        &mut self,
        code: &str,
        primary_source: &Workbook,
        counterparty_source: &Workbook,
    ) -> ReconOutcome {
        match self.run_pipeline(code, primary_source, counterparty_source) {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(institution = code, error = %err, "reconciliation failed");
                ReconOutcome::Failure {
                    institution: code.to_string(),
                    error: err.to_string(),
                    completed_at: Utc::now(),
                }
            }
        }
    }

    fn run_pipeline(
        &mut self,
        code: &str,
        primary_source: &Workbook,
        counterparty_source: &Workbook,
    ) -> Result<ReconOutcome> {
        let adapter = self
            .adapters
            .get(code)
            .ok_or_else(|| ReconError::UnsupportedInstitution(code.to_string()))?;

        info!(institution = code, "starting reconciliation");

        let primary_records = adapter.parse_primary(primary_source)?;
        info!(
            institution = code,
            records = primary_records.len(),
            "parsed primary source"
        );

        let counterparty_records = adapter.parse_counterparty(counterparty_source)?;
        info!(
            institution = code,
            records = counterparty_records.len(),
            "parsed counterparty source"
        );

        let results = reconcile(&primary_records, &counterparty_records);
        let summary = summarize(code, adapter.name(), &results);
        info!(
            institution = code,
            results = results.len(),
            match_rate = summary.match_rate,
            "reconciliation complete"
        );

        self.cache.insert(code.to_string(), results.clone());

        Ok(ReconOutcome::Success {
            institution: code.to_string(),
            institution_name: adapter.name().to_string(),
            summary,
            results,
            primary_count: primary_records.len(),
            counterparty_count: counterparty_records.len(),
            completed_at: Utc::now(),
        })
    }

    /// Sequential fan-out over `reconcile_one`. Each institution's outcome is
    /// independent; one failure never blocks the rest of the batch.
    pub fn reconcile_many(
        &mut self,
        jobs: &BTreeMap<String, (Workbook, Workbook)>,
    ) -> BTreeMap<String, ReconOutcome> {
        let mut outcomes = BTreeMap::new();
        for (code, (primary_source, counterparty_source)) in jobs {
            let outcome = self.reconcile_one(code, primary_source, counterparty_source);
            outcomes.insert(code.clone(), outcome);
        }
        outcomes
    }

    /// Cached results of the most recent run for an institution.
    pub fn cached_results(&self, code: &str) -> Option<&[ReconResult]> {
        self.cache.get(code).map(Vec::as_slice)
    }

    /// Cached results above the materiality threshold, in original order.
    /// Unknown or not-yet-reconciled codes come back empty.
    pub fn exception_items(&self, code: &str, threshold: f64) -> Vec<ReconResult> {
        match self.cache.get(code) {
            Some(results) => exceptions(results, threshold),
            None => Vec::new(),
        }
    }

    /// Trend grouping over the cached results of an institution.
    pub fn trend_analysis(&self, code: &str, dimension: TrendDimension) -> Vec<TrendGroup> {
        match self.cache.get(code) {
            Some(results) => trend_groups(results, dimension),
            None => Vec::new(),
        }
    }

    /// Concatenate all successful institutions' detail rows, keeping
    /// institution grouping and row order within each.
    pub fn consolidated_report(outcomes: &BTreeMap<String, ReconOutcome>) -> Vec<ResultRow> {
        let mut rows = Vec::new();
        for outcome in outcomes.values() {
            if let Some(results) = outcome.results() {
                rows.extend(results_as_table(results));
            }
        }
        rows
    }

    /// One comparison row per successful institution.
    pub fn summary_comparison(outcomes: &BTreeMap<String, ReconOutcome>) -> Vec<SummaryRow> {
        outcomes
            .values()
            .filter_map(|outcome| outcome.summary().map(summary_row))
            .collect()
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
