use anyhow::{Context, Result};
use std::env;
use std::fs::File;
use std::path::Path;
use std::process;

use deposit_recon::{
    Orchestrator, ReconOutcome, Sheet, Workbook, DEFAULT_EXCEPTION_THRESHOLD,
};

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("list") => run_list(),
        Some("reconcile") => run_reconcile(&args[2..]),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();
}

fn print_usage() {
    println!("Deposit Yield Reconciliation v{}", deposit_recon::VERSION);
    println!();
    println!("Usage:");
    println!("  deposit-recon list");
    println!("  deposit-recon reconcile <CODE> <PRIMARY> <COUNTERPARTY> [THRESHOLD]");
    println!();
    println!("Sources are CSV files. Multi-sheet sources are given as");
    println!("semicolon-separated 'Sheet Name=path.csv' pairs, e.g.:");
    println!("  'Initial Deposit=id.csv;Benefit Value=bv.csv'");
}

fn run_list() -> Result<()> {
    let orchestrator = Orchestrator::with_default_institutions();
    println!("🏦 Registered institutions:");
    for code in orchestrator.institutions() {
        println!("  {}", code);
    }
    Ok(())
}

fn run_reconcile(args: &[String]) -> Result<()> {
    let [code, primary_arg, counterparty_arg, rest @ ..] = args else {
        print_usage();
        process::exit(2);
    };
    let threshold = match rest.first() {
        Some(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("invalid threshold: {}", raw))?,
        None => DEFAULT_EXCEPTION_THRESHOLD,
    };

    let primary = load_workbook(primary_arg)?;
    let counterparty = load_workbook(counterparty_arg)?;

    let mut orchestrator = Orchestrator::with_default_institutions();
    let outcome = orchestrator.reconcile_one(code, &primary, &counterparty);

    match &outcome {
        ReconOutcome::Success {
            institution_name,
            summary,
            primary_count,
            counterparty_count,
            ..
        } => {
            println!("⚖️  Reconciliation - {}", institution_name);
            println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
            println!("Primary records:       {}", primary_count);
            println!("Counterparty records:  {}", counterparty_count);
            println!("Results:               {}", summary.total_records);
            println!("Matched:               {}", summary.matched_records);
            println!("Differences:           {}", summary.difference_records);
            println!("Not in counterparty:   {}", summary.not_found_in_counterparty);
            println!("Not in primary:        {}", summary.not_found_in_primary);
            println!("Match rate:            {:.2}%", summary.match_rate);
            println!("Total variance:        {:.2}", summary.total_variance);
            println!("Variance:              {:.4}%", summary.variance_pct);

            let flagged = orchestrator.exception_items(code, threshold);
            println!();
            println!("🚩 Exceptions above {:.2}%: {}", threshold, flagged.len());
            for item in &flagged {
                println!(
                    "  {} / {}  variance {:.2} ({:.2}%)  [{}]",
                    item.certificate_no,
                    item.account_no,
                    item.variance,
                    item.variance_pct,
                    item.priority()
                );
            }

            let kpis = deposit_recon::compute_kpis([summary]);
            println!();
            println!(
                "📊 Score: {:.2} ({}) - accuracy {:.2}, quality {:.2}",
                kpis.overall_score,
                kpis.band.label(),
                kpis.accuracy_score,
                kpis.quality_score
            );
            Ok(())
        }
        ReconOutcome::Failure { error, .. } => {
            eprintln!("❌ Reconciliation failed for {}: {}", code, error);
            process::exit(1);
        }
    }
}

/// Load a workbook source argument: either one CSV path, or a
/// semicolon-separated list of "Sheet Name=path" pairs.
fn load_workbook(source: &str) -> Result<Workbook> {
    let mut workbook = Workbook::new();

    for part in source.split(';').filter(|p| !p.trim().is_empty()) {
        let (name, path) = match part.split_once('=') {
            Some((name, path)) => (name.trim().to_string(), path.trim()),
            None => {
                let path = part.trim();
                let stem = Path::new(path)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("Sheet1")
                    .to_string();
                (stem, path)
            }
        };

        let file =
            File::open(path).with_context(|| format!("failed to open source file: {}", path))?;
        let sheet = Sheet::from_csv_reader(&name, file)
            .with_context(|| format!("failed to read CSV: {}", path))?;
        workbook.push(sheet);
    }

    Ok(workbook)
}
