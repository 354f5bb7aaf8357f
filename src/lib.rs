// Deposit Yield Reconciliation Engine - Core Library
// Exposes all modules for use in the CLI and tests

pub mod adapter;      // Polymorphic per-institution parsing + pricing
pub mod config;       // Static per-institution configuration
pub mod error;        // Typed error taxonomy
pub mod export;       // Display-ready shaping for downstream collaborators
pub mod orchestrator; // Registry + cache + batch driving
pub mod reconcile;    // Key-matching / variance algorithm
pub mod record;       // Canonical records and results
pub mod summary;      // Per-institution summaries + fleet KPIs
pub mod table;        // Tabular input boundary (Sheet / Workbook)

// Re-export commonly used types
pub use adapter::{normalize_category, ArthaAdapter, InstitutionAdapter, SentosaAdapter};
pub use config::InstitutionConfig;
pub use error::{ReconError, Result};
pub use export::{results_as_table, summary_as_map, summary_row, ResultRow, SummaryRow};
pub use orchestrator::{Orchestrator, ReconOutcome};
pub use reconcile::{reconcile, MATCH_TOLERANCE};
pub use record::{
    parse_amount, parse_date, round2, DepositCategory, DepositRecord, ReconResult, ReconStatus,
    RecordSource, YEAR_DAYS,
};
pub use summary::{
    compute_kpis, exceptions, summarize, trend_groups, CategoryBreakdown, KpiReport, ScoreBand,
    Summary, TrendDimension, TrendGroup, DEFAULT_EXCEPTION_THRESHOLD,
};
pub use table::{RowView, Sheet, Workbook};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
