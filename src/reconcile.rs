// ⚖️ Reconciliation algorithm - key matching + variance classification
//
// Pure computation over validated records: no I/O, no hidden state, same
// inputs always produce the same output sequence. The key is the
// (certificate number, account number) pair.

use std::collections::HashMap;

use crate::record::{DepositRecord, ReconResult, ReconStatus};

/// A matched pair is "Matched" when the absolute yield variance is below one
/// unit of currency, "Difference" otherwise.
pub const MATCH_TOLERANCE: f64 = 1.0;

/// Reconcile one institution's primary records against the counterparty set.
///
/// Matching is first-match-wins: the first counterparty record seen for a key
/// is the only one that can match, and it is consumed once matched. Extra
/// counterparty records sharing a key surface as leftovers. The output keeps
/// primary input order, then leftover counterparty records in their original
/// order, and contains exactly one result per key occurrence from either side.
pub fn reconcile(primary: &[DepositRecord], counterparty: &[DepositRecord]) -> Vec<ReconResult> {
    // One-shot lookup: key → index of first counterparty occurrence
    let mut lookup: HashMap<(String, String), usize> = HashMap::new();
    for (idx, record) in counterparty.iter().enumerate() {
        lookup.entry(record.key()).or_insert(idx);
    }

    let mut consumed = vec![false; counterparty.len()];
    let mut results = Vec::with_capacity(primary.len() + counterparty.len());

    for primary_rec in primary {
        let key = primary_rec.key();

        if let Some(idx) = lookup.remove(&key) {
            let counterparty_rec = &counterparty[idx];
            consumed[idx] = true;

            let variance = primary_rec.yield_amount - counterparty_rec.yield_amount;
            let variance_pct = if primary_rec.yield_amount != 0.0 {
                variance / primary_rec.yield_amount * 100.0
            } else {
                0.0
            };
            let status = if variance.abs() < MATCH_TOLERANCE {
                ReconStatus::Matched
            } else {
                ReconStatus::Difference
            };

            results.push(ReconResult {
                institution: primary_rec.institution.clone(),
                certificate_no: primary_rec.certificate_no.clone(),
                account_no: primary_rec.account_no.clone(),
                principal: primary_rec.principal,
                primary_yield: primary_rec.yield_amount,
                counterparty_yield: counterparty_rec.yield_amount,
                variance,
                variance_pct,
                status,
                category: primary_rec.category,
                period: primary_rec.period_label(),
                notes: None,
            });
        } else {
            results.push(ReconResult {
                institution: primary_rec.institution.clone(),
                certificate_no: primary_rec.certificate_no.clone(),
                account_no: primary_rec.account_no.clone(),
                principal: primary_rec.principal,
                primary_yield: primary_rec.yield_amount,
                counterparty_yield: 0.0,
                variance: primary_rec.yield_amount,
                variance_pct: 100.0,
                status: ReconStatus::NotFoundInCounterparty,
                category: primary_rec.category,
                period: primary_rec.period_label(),
                notes: Some("Record not found in counterparty data".to_string()),
            });
        }
    }

    // Remaining counterparty records: never matched, including duplicate keys
    // beyond the first occurrence
    for (idx, counterparty_rec) in counterparty.iter().enumerate() {
        if consumed[idx] {
            continue;
        }

        results.push(ReconResult {
            institution: counterparty_rec.institution.clone(),
            certificate_no: counterparty_rec.certificate_no.clone(),
            account_no: counterparty_rec.account_no.clone(),
            principal: counterparty_rec.principal,
            primary_yield: 0.0,
            counterparty_yield: counterparty_rec.yield_amount,
            variance: -counterparty_rec.yield_amount,
            variance_pct: -100.0,
            status: ReconStatus::NotFoundInPrimary,
            category: counterparty_rec.category,
            period: counterparty_rec.period_label(),
            notes: Some("Record not found in primary data".to_string()),
        });
    }

    results
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{DepositCategory, RecordSource};
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn primary(cert: &str, acct: &str, principal: f64, yield_amount: f64) -> DepositRecord {
        DepositRecord::new(
            "ARTHA",
            cert,
            acct,
            principal,
            yield_amount,
            DepositCategory::InitialDeposit,
            RecordSource::Primary,
        )
        .with_placement_date(NaiveDate::from_ymd_opt(2025, 4, 1))
        .with_maturity_date(NaiveDate::from_ymd_opt(2025, 5, 1))
    }

    fn counterparty(cert: &str, acct: &str, yield_amount: f64) -> DepositRecord {
        DepositRecord::new(
            "ARTHA",
            cert,
            acct,
            0.0,
            yield_amount,
            DepositCategory::InitialDeposit,
            RecordSource::Counterparty,
        )
    }

    #[test]
    fn test_identical_yields_match() {
        let results = reconcile(
            &[primary("A1", "001", 1000.0, 10.0)],
            &[counterparty("A1", "001", 10.0)],
        );

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ReconStatus::Matched);
        assert_eq!(results[0].variance, 0.0);
        assert_eq!(results[0].variance_pct, 0.0);
        assert_eq!(results[0].period, "Apr-25");
    }

    #[test]
    fn test_match_boundary_is_one_currency_unit() {
        // |variance| just under 1 → Matched
        let results = reconcile(
            &[primary("A1", "001", 1000.0, 10.0)],
            &[counterparty("A1", "001", 9.01)],
        );
        assert_eq!(results[0].status, ReconStatus::Matched);

        // |variance| of exactly 1 → Difference
        let results = reconcile(
            &[primary("A1", "001", 1000.0, 10.0)],
            &[counterparty("A1", "001", 9.0)],
        );
        assert_eq!(results[0].status, ReconStatus::Difference);
        assert_eq!(results[0].variance, 1.0);
        assert_eq!(results[0].variance_pct, 10.0);
    }

    #[test]
    fn test_primary_only_record() {
        let results = reconcile(&[primary("B2", "002", 0.0, 50.0)], &[]);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ReconStatus::NotFoundInCounterparty);
        assert_eq!(results[0].variance, 50.0);
        assert_eq!(results[0].variance_pct, 100.0);
        assert_eq!(results[0].counterparty_yield, 0.0);
        assert!(results[0].notes.is_some());
    }

    #[test]
    fn test_counterparty_only_record() {
        let results = reconcile(&[], &[counterparty("C3", "003", 20.0)]);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ReconStatus::NotFoundInPrimary);
        assert_eq!(results[0].variance, -20.0);
        assert_eq!(results[0].variance_pct, -100.0);
        assert_eq!(results[0].primary_yield, 0.0);
    }

    #[test]
    fn test_zero_primary_yield_percentage_defined() {
        let results = reconcile(
            &[primary("A1", "001", 1000.0, 0.0)],
            &[counterparty("A1", "001", 5.0)],
        );

        assert_eq!(results[0].variance, -5.0);
        assert_eq!(results[0].variance_pct, 0.0);
        assert_eq!(results[0].status, ReconStatus::Difference);
    }

    #[test]
    fn test_duplicate_counterparty_keys_first_wins() {
        let results = reconcile(
            &[primary("A1", "001", 1000.0, 10.0)],
            &[
                counterparty("A1", "001", 10.0),
                counterparty("A1", "001", 99.0),
            ],
        );

        assert_eq!(results.len(), 2);
        // First occurrence matched
        assert_eq!(results[0].status, ReconStatus::Matched);
        assert_eq!(results[0].counterparty_yield, 10.0);
        // Second occurrence is a leftover, never re-matched
        assert_eq!(results[1].status, ReconStatus::NotFoundInPrimary);
        assert_eq!(results[1].counterparty_yield, 99.0);
    }

    #[test]
    fn test_matched_entry_consumed_once() {
        // Two primary records with the same key: only one counterparty entry
        // exists, so the second primary record cannot reuse it
        let results = reconcile(
            &[
                primary("A1", "001", 1000.0, 10.0),
                primary("A1", "001", 1000.0, 10.0),
            ],
            &[counterparty("A1", "001", 10.0)],
        );

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, ReconStatus::Matched);
        assert_eq!(results[1].status, ReconStatus::NotFoundInCounterparty);
    }

    #[test]
    fn test_output_order_and_key_coverage() {
        let primary_records = vec![
            primary("P1", "1", 100.0, 1.0),
            primary("P2", "2", 100.0, 2.0),
            primary("P3", "3", 100.0, 3.0),
        ];
        let counterparty_records = vec![
            counterparty("X1", "9", 7.0),
            counterparty("P2", "2", 2.0),
            counterparty("X2", "8", 8.0),
        ];

        let results = reconcile(&primary_records, &counterparty_records);

        // Primary order first, then leftovers in counterparty order
        let certs: Vec<&str> = results.iter().map(|r| r.certificate_no.as_str()).collect();
        assert_eq!(certs, vec!["P1", "P2", "P3", "X1", "X2"]);

        // Every key from either side appears exactly once
        let keys: HashSet<(String, String)> = results
            .iter()
            .map(|r| (r.certificate_no.clone(), r.account_no.clone()))
            .collect();
        assert_eq!(keys.len(), results.len());
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn test_principal_conservation() {
        let primary_records = vec![
            primary("P1", "1", 100.0, 1.0),
            primary("P2", "2", 250.0, 2.0),
        ];
        let mut leftover = counterparty("X1", "9", 7.0);
        leftover.principal = 40.0;
        let counterparty_records = vec![counterparty("P2", "2", 2.0), leftover];

        let results = reconcile(&primary_records, &counterparty_records);

        let result_principal: f64 = results.iter().map(|r| r.principal).sum();
        // All primary principal + leftover-only counterparty principal
        assert_eq!(result_principal, 100.0 + 250.0 + 40.0);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let primary_records = vec![
            primary("P1", "1", 100.0, 1.0),
            primary("P2", "2", 250.0, 7.5),
        ];
        let counterparty_records = vec![
            counterparty("P2", "2", 2.0),
            counterparty("X1", "9", 7.0),
        ];

        let first = reconcile(&primary_records, &counterparty_records);
        let second = reconcile(&primary_records, &counterparty_records);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(reconcile(&[], &[]).is_empty());
    }
}
