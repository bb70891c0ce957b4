//! Removes or downweights legitimate accounts that tripped a detector
//! but are not money mules.
//!
//! Three checks:
//!   merchant  — high volume spread across 30+ days
//!   payroll   — same-day fan-out with near-uniform amounts
//!   micro-txn — cycles whose total is below the reporting floor

use crate::core::account::AccountId;
use crate::core::ring::{round2, FlaggedAccount, PatternTag, Ring, RingKind};
use crate::core::transaction::TransactionTable;
use chrono::{DateTime, NaiveDate, Utc};
use log::{debug, info};
use std::collections::{HashMap, HashSet};

/// An account needs at least this many transactions to look merchant-like.
pub const MERCHANT_MIN_TRANSACTIONS: usize = 50;
/// ... spread across at least this many days.
pub const MERCHANT_MIN_DAYS: i64 = 30;
/// Merchants keep 30% of their original score.
pub const MERCHANT_SCORE_PENALTY: f64 = 0.30;

/// Amounts within 20% of the group mean look payroll-like.
pub const PAYROLL_AMOUNT_VARIANCE: f64 = 0.20;
/// Minimum same-day receivers for the payroll check.
pub const PAYROLL_MIN_RECEIVERS: usize = 10;
/// Payroll senders keep 40% of their original score.
pub const PAYROLL_SCORE_PENALTY: f64 = 0.40;

/// Cycles below this total are treated as micro/test payments.
pub const MICRO_TXN_CYCLE_MAX: f64 = 500.0;
/// Accounts below this score after adjustment are not reported.
pub const MIN_REPORTABLE_SCORE: f64 = 10.0;

/// Clean up raw detection output: drop rings made entirely of
/// legitimate-looking accounts, re-check the micro-cycle floor, and
/// downweight merchant and payroll accounts.
///
/// Merchant classification takes precedence: a merchant account never
/// also receives the payroll adjustment.
pub fn filter_false_positives(
    table: &TransactionTable,
    all_rings: Vec<Ring>,
    flagged: Vec<FlaggedAccount>,
) -> (Vec<Ring>, Vec<FlaggedAccount>) {
    let merchants = find_merchants(table);
    let payroll = find_payroll_accounts(table);
    info!(
        "false-positive filter: {} merchants, {} payroll accounts",
        merchants.len(),
        payroll.len()
    );

    let mut cleaned_rings = Vec::with_capacity(all_rings.len());
    for ring in all_rings {
        if matches!(ring.kind, RingKind::Cycle { .. }) && ring.total_amount < MICRO_TXN_CYCLE_MAX {
            debug!(
                "dropping micro-cycle {} (amount {})",
                ring.ring_id, ring.total_amount
            );
            continue;
        }
        let all_legitimate = ring
            .members
            .iter()
            .all(|m| merchants.contains(m) || payroll.contains(m));
        if all_legitimate {
            debug!(
                "dropping ring {} — every member is a merchant or payroll account",
                ring.ring_id
            );
            continue;
        }
        cleaned_rings.push(ring);
    }

    let mut cleaned_accounts = Vec::with_capacity(flagged.len());
    for mut account in flagged {
        if merchants.contains(&account.account_id) {
            account.suspicion_score *= MERCHANT_SCORE_PENALTY;
            account
                .detected_patterns
                .push(PatternTag::FpMerchantDownweight);
        } else if payroll.contains(&account.account_id) {
            account
                .detected_patterns
                .retain(|tag| !matches!(tag, PatternTag::FanOut));
            account.suspicion_score *= PAYROLL_SCORE_PENALTY;
            account
                .detected_patterns
                .push(PatternTag::FpPayrollDownweight);
        }
        account.suspicion_score = round2(account.suspicion_score);

        if account.suspicion_score >= MIN_REPORTABLE_SCORE {
            cleaned_accounts.push(account);
        } else {
            debug!(
                "dropping account {} — score {} below reporting floor",
                account.account_id, account.suspicion_score
            );
        }
    }

    info!(
        "false-positive filter: {} rings, {} accounts survive",
        cleaned_rings.len(),
        cleaned_accounts.len()
    );
    (cleaned_rings, cleaned_accounts)
}

/// Likely merchants: lots of transactions spread over a long period.
pub fn find_merchants(table: &TransactionTable) -> HashSet<AccountId> {
    let mut merchants = HashSet::new();
    for account in table.accounts() {
        if table.count_involving(&account) < MERCHANT_MIN_TRANSACTIONS {
            continue;
        }
        let mut earliest: Option<DateTime<Utc>> = None;
        let mut latest: Option<DateTime<Utc>> = None;
        for txn in table.involving(&account) {
            let ts = txn.timestamp();
            earliest = Some(earliest.map_or(ts, |t| t.min(ts)));
            latest = Some(latest.map_or(ts, |t| t.max(ts)));
        }
        if let (Some(earliest), Some(latest)) = (earliest, latest) {
            if (latest - earliest).num_days() >= MERCHANT_MIN_DAYS {
                merchants.insert(account);
            }
        }
    }
    merchants
}

/// Payroll-like senders: 10+ transactions to 10+ unique receivers on one
/// calendar day, every amount within 20% of the day's mean.
pub fn find_payroll_accounts(table: &TransactionTable) -> HashSet<AccountId> {
    let mut groups: HashMap<(AccountId, NaiveDate), Vec<usize>> = HashMap::new();
    for (idx, txn) in table.rows().iter().enumerate() {
        groups
            .entry((txn.sender().clone(), txn.calendar_day()))
            .or_default()
            .push(idx);
    }

    let mut payroll = HashSet::new();
    for ((sender, _day), rows) in groups {
        if rows.len() < PAYROLL_MIN_RECEIVERS {
            continue;
        }
        let unique_receivers: HashSet<&AccountId> =
            rows.iter().map(|&i| table.rows()[i].receiver()).collect();
        if unique_receivers.len() < PAYROLL_MIN_RECEIVERS {
            continue;
        }

        let amounts: Vec<f64> = rows.iter().map(|&i| table.rows()[i].amount()).collect();
        let mean = amounts.iter().sum::<f64>() / amounts.len() as f64;
        if mean == 0.0 {
            continue;
        }
        let variance_ok = amounts
            .iter()
            .all(|a| ((a - mean).abs() / mean) <= PAYROLL_AMOUNT_VARIANCE);
        if variance_ok {
            payroll.insert(sender);
        }
    }
    payroll
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ring::SmurfPattern;
    use crate::core::transaction::{parse_timestamp, Transaction, TransactionId};
    use chrono::Duration;

    fn txn(id: &str, sender: &str, receiver: &str, amount: f64, ts: &str) -> Transaction {
        Transaction::new(
            TransactionId::new(id),
            AccountId::new(sender),
            AccountId::new(receiver),
            amount,
            parse_timestamp(ts).unwrap(),
        )
    }

    /// 60 customer payments of 50 into account M across 45 days.
    fn merchant_table() -> TransactionTable {
        let base = parse_timestamp("2026-01-01T12:00:00").unwrap();
        (0..60)
            .map(|i| {
                Transaction::new(
                    TransactionId::new(format!("T{}", i)),
                    AccountId::new(format!("CUST{:02}", i)),
                    AccountId::new("M"),
                    50.0,
                    base + Duration::hours(18 * i as i64),
                )
            })
            .collect()
    }

    fn payroll_table(receivers: usize, spread: f64) -> TransactionTable {
        let base = parse_timestamp("2026-02-01T09:00:00").unwrap();
        (0..receivers)
            .map(|i| {
                let wobble = if i % 2 == 0 { 1.0 + spread } else { 1.0 - spread };
                Transaction::new(
                    TransactionId::new(format!("T{}", i)),
                    AccountId::new("P"),
                    AccountId::new(format!("EMP{:02}", i)),
                    5000.0 * wobble,
                    base + Duration::minutes(3 * i as i64),
                )
            })
            .collect()
    }

    fn flagged(id: &str, score: f64, patterns: Vec<PatternTag>) -> FlaggedAccount {
        FlaggedAccount {
            account_id: AccountId::new(id),
            suspicion_score: score,
            detected_patterns: patterns,
            ring_id: "RING_S_001".to_string(),
            ring_ids: vec!["RING_S_001".to_string()],
        }
    }

    #[test]
    fn test_merchant_predicate() {
        let merchants = find_merchants(&merchant_table());
        assert!(merchants.contains(&AccountId::new("M")));
        // Customers each appear once — not merchants.
        assert_eq!(merchants.len(), 1);
    }

    #[test]
    fn test_merchant_needs_enough_transactions() {
        let base = parse_timestamp("2026-01-01T12:00:00").unwrap();
        let table: TransactionTable = (0..49)
            .map(|i| {
                Transaction::new(
                    TransactionId::new(format!("T{}", i)),
                    AccountId::new(format!("CUST{:02}", i)),
                    AccountId::new("M"),
                    50.0,
                    base + Duration::days(i as i64),
                )
            })
            .collect();
        assert!(find_merchants(&table).is_empty());
    }

    #[test]
    fn test_merchant_needs_time_spread() {
        let base = parse_timestamp("2026-01-01T12:00:00").unwrap();
        // 60 transactions inside 10 days: busy, but not merchant-spread.
        let table: TransactionTable = (0..60)
            .map(|i| {
                Transaction::new(
                    TransactionId::new(format!("T{}", i)),
                    AccountId::new(format!("CUST{:02}", i)),
                    AccountId::new("M"),
                    50.0,
                    base + Duration::hours(4 * i as i64),
                )
            })
            .collect();
        assert!(find_merchants(&table).is_empty());
    }

    #[test]
    fn test_payroll_predicate() {
        let payroll = find_payroll_accounts(&payroll_table(15, 0.10));
        assert!(payroll.contains(&AccountId::new("P")));
    }

    #[test]
    fn test_payroll_rejects_wide_variance() {
        let payroll = find_payroll_accounts(&payroll_table(15, 0.35));
        assert!(payroll.is_empty());
    }

    #[test]
    fn test_payroll_needs_ten_receivers() {
        assert!(find_payroll_accounts(&payroll_table(9, 0.10)).is_empty());
        assert!(!find_payroll_accounts(&payroll_table(10, 0.10)).is_empty());
    }

    #[test]
    fn test_payroll_needs_unique_receivers() {
        let base = parse_timestamp("2026-02-01T09:00:00").unwrap();
        // Twelve transfers but only three distinct receivers.
        let table: TransactionTable = (0..12)
            .map(|i| {
                Transaction::new(
                    TransactionId::new(format!("T{}", i)),
                    AccountId::new("P"),
                    AccountId::new(format!("EMP{:02}", i % 3)),
                    5000.0,
                    base + Duration::minutes(3 * i as i64),
                )
            })
            .collect();
        assert!(find_payroll_accounts(&table).is_empty());
    }

    #[test]
    fn test_micro_cycle_dropped_at_recheck() {
        let table = TransactionTable::new();
        let ring = Ring {
            ring_id: "RING_C_001".to_string(),
            members: vec![AccountId::new("A"), AccountId::new("B"), AccountId::new("C")],
            total_amount: 300.0,
            risk_score: 80.0,
            kind: RingKind::Cycle {
                cycle_length: 3,
                completed_hours: 1.0,
            },
        };
        let (rings, _) = filter_false_positives(&table, vec![ring], vec![]);
        assert!(rings.is_empty());
    }

    #[test]
    fn test_all_legitimate_ring_dropped_mixed_kept() {
        let table = merchant_table();
        let all_merchant = Ring {
            ring_id: "RING_S_001".to_string(),
            members: vec![AccountId::new("M")],
            total_amount: 3000.0,
            risk_score: 60.0,
            kind: RingKind::Smurf {
                pattern: SmurfPattern::FanIn,
                hub: AccountId::new("M"),
                peak_count: 11,
                window_start: parse_timestamp("2026-01-01T00:00:00").unwrap(),
                window_end: parse_timestamp("2026-01-04T00:00:00").unwrap(),
            },
        };
        let mut mixed = all_merchant.clone();
        mixed.ring_id = "RING_S_002".to_string();
        mixed.members.push(AccountId::new("CUST00"));

        let (rings, _) = filter_false_positives(&table, vec![all_merchant, mixed], vec![]);
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0].ring_id, "RING_S_002");
    }

    #[test]
    fn test_merchant_downweight() {
        let table = merchant_table();
        let accounts = vec![flagged("M", 80.0, vec![PatternTag::FanIn])];
        let (_, cleaned) = filter_false_positives(&table, vec![], accounts);

        assert_eq!(cleaned.len(), 1);
        let m = &cleaned[0];
        assert_eq!(m.suspicion_score, 24.0);
        assert_eq!(
            m.detected_patterns,
            vec![PatternTag::FanIn, PatternTag::FpMerchantDownweight]
        );
    }

    #[test]
    fn test_payroll_downweight_strips_fan_out() {
        let table = payroll_table(15, 0.10);
        let accounts = vec![flagged(
            "P",
            80.0,
            vec![PatternTag::FanOut, PatternTag::ShellChain],
        )];
        let (_, cleaned) = filter_false_positives(&table, vec![], accounts);

        let p = &cleaned[0];
        assert_eq!(p.suspicion_score, 32.0);
        assert_eq!(
            p.detected_patterns,
            vec![PatternTag::ShellChain, PatternTag::FpPayrollDownweight]
        );
    }

    #[test]
    fn test_merchant_precedence_over_payroll() {
        // Make P both a merchant and a payroll sender.
        let mut txns: Vec<Transaction> = Vec::new();
        let base = parse_timestamp("2026-01-01T09:00:00").unwrap();
        for i in 0..15 {
            txns.push(Transaction::new(
                TransactionId::new(format!("PAY{}", i)),
                AccountId::new("P"),
                AccountId::new(format!("EMP{:02}", i)),
                5000.0,
                base + Duration::minutes(3 * i),
            ));
        }
        // Later-day noise keeps the payroll day's amounts uniform while
        // pushing P past the merchant volume and spread thresholds.
        for i in 0..40 {
            txns.push(Transaction::new(
                TransactionId::new(format!("N{}", i)),
                AccountId::new("P"),
                AccountId::new(format!("X{:02}", i)),
                100.0 + i as f64,
                base + Duration::days(i + 1),
            ));
        }
        let table: TransactionTable = txns.into_iter().collect();
        assert!(find_merchants(&table).contains(&AccountId::new("P")));
        assert!(find_payroll_accounts(&table).contains(&AccountId::new("P")));

        let accounts = vec![flagged("P", 100.0, vec![PatternTag::FanOut])];
        let (_, cleaned) = filter_false_positives(&table, vec![], accounts);
        let p = &cleaned[0];
        // Merchant multiplier, fan_out tag kept (payroll branch skipped).
        assert_eq!(p.suspicion_score, 30.0);
        assert_eq!(
            p.detected_patterns,
            vec![PatternTag::FanOut, PatternTag::FpMerchantDownweight]
        );
    }

    #[test]
    fn test_low_scores_dropped() {
        let table = TransactionTable::new();
        let accounts = vec![
            flagged("A", 9.99, vec![]),
            flagged("B", 10.0, vec![]),
        ];
        let (_, cleaned) = filter_false_positives(&table, vec![], accounts);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].account_id, AccountId::new("B"));
    }
}
