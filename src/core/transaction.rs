use crate::core::account::AccountId;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque identifier for a transaction, carried through from the input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TransactionId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A directed, timestamped monetary transfer between two accounts.
///
/// Transactions are immutable once created; the detection engine operates
/// on a batch of them. Amounts are IEEE-754 doubles and may be negative —
/// negative flows are kept as-is and never mapped to reversed edges.
///
/// # Examples
///
/// ```
/// use mule_detector::core::account::AccountId;
/// use mule_detector::core::transaction::{parse_timestamp, Transaction, TransactionId};
///
/// let txn = Transaction::new(
///     TransactionId::new("TX_0000001"),
///     AccountId::new("ACC_A"),
///     AccountId::new("ACC_B"),
///     200.0,
///     parse_timestamp("2026-02-01T00:00:00").unwrap(),
/// );
/// assert_eq!(txn.amount(), 200.0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    id: TransactionId,
    sender: AccountId,
    receiver: AccountId,
    amount: f64,
    timestamp: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        id: TransactionId,
        sender: AccountId,
        receiver: AccountId,
        amount: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            sender,
            receiver,
            amount,
            timestamp,
        }
    }

    // --- Accessors ---

    pub fn id(&self) -> &TransactionId {
        &self.id
    }

    pub fn sender(&self) -> &AccountId {
        &self.sender
    }

    pub fn receiver(&self) -> &AccountId {
        &self.receiver
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Calendar day of the transaction (timezone treated as fixed).
    pub fn calendar_day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Parse an ISO-8601-like timestamp string into an absolute instant.
///
/// Accepts RFC 3339 (`2026-02-01T00:00:00Z`, offsets), `T`- or
/// space-separated date-times with optional fractional seconds, and bare
/// dates (interpreted as midnight). Strings without an offset are treated
/// as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
    }
    None
}

/// The cleaned transaction batch, re-indexed 0..n-1.
///
/// Keeps an auxiliary by-account index built at insertion time so the
/// scorer and the false-positive filter can pull one account's rows
/// without rescanning the whole table.
#[derive(Debug, Clone, Default)]
pub struct TransactionTable {
    rows: Vec<Transaction>,
    by_account: HashMap<AccountId, Vec<usize>>,
}

impl TransactionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, txn: Transaction) {
        let idx = self.rows.len();
        self.by_account
            .entry(txn.sender().clone())
            .or_default()
            .push(idx);
        if txn.receiver() != txn.sender() {
            self.by_account
                .entry(txn.receiver().clone())
                .or_default()
                .push(idx);
        }
        self.rows.push(txn);
    }

    pub fn rows(&self) -> &[Transaction] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All unique accounts referenced by the batch, sorted.
    pub fn accounts(&self) -> Vec<AccountId> {
        let mut accounts: Vec<AccountId> = self.by_account.keys().cloned().collect();
        accounts.sort();
        accounts
    }

    /// All rows involving `account` as sender or receiver, in row order.
    pub fn involving(&self, account: &AccountId) -> impl Iterator<Item = &Transaction> {
        self.by_account
            .get(account)
            .map(|idxs| idxs.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&i| &self.rows[i])
    }

    /// Number of rows involving `account` as sender or receiver.
    pub fn count_involving(&self, account: &AccountId) -> usize {
        self.by_account.get(account).map(Vec::len).unwrap_or(0)
    }
}

impl FromIterator<Transaction> for TransactionTable {
    fn from_iter<T: IntoIterator<Item = Transaction>>(iter: T) -> Self {
        let mut table = Self::new();
        for txn in iter {
            table.push(txn);
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn txn(id: &str, sender: &str, receiver: &str, amount: f64, ts: &str) -> Transaction {
        Transaction::new(
            TransactionId::new(id),
            AccountId::new(sender),
            AccountId::new(receiver),
            amount,
            parse_timestamp(ts).unwrap(),
        )
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = parse_timestamp("2026-02-01T10:30:00").unwrap();
        assert_eq!(parse_timestamp("2026-02-01 10:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2026-02-01T10:30:00Z").unwrap(), expected);
        assert_eq!(
            parse_timestamp("2026-02-01T10:30:00.500")
                .unwrap()
                .timestamp_millis(),
            expected.timestamp_millis() + 500
        );
        assert!(parse_timestamp("2026-02-01").is_some());
        assert!(parse_timestamp("not a date").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_table_by_account_index() {
        let mut table = TransactionTable::new();
        table.push(txn("T1", "A", "B", 100.0, "2026-02-01T00:00:00"));
        table.push(txn("T2", "B", "C", 200.0, "2026-02-01T01:00:00"));
        table.push(txn("T3", "A", "C", 300.0, "2026-02-01T02:00:00"));

        assert_eq!(table.len(), 3);
        assert_eq!(table.count_involving(&AccountId::new("A")), 2);
        assert_eq!(table.count_involving(&AccountId::new("B")), 2);
        assert_eq!(table.count_involving(&AccountId::new("C")), 2);
        assert_eq!(table.count_involving(&AccountId::new("D")), 0);

        let b_rows: Vec<_> = table
            .involving(&AccountId::new("B"))
            .map(|t| t.id().as_str().to_string())
            .collect();
        assert_eq!(b_rows, vec!["T1", "T2"]);
    }

    #[test]
    fn test_table_self_transfer_indexed_once() {
        let mut table = TransactionTable::new();
        table.push(txn("T1", "A", "A", 50.0, "2026-02-01T00:00:00"));
        assert_eq!(table.count_involving(&AccountId::new("A")), 1);
    }

    #[test]
    fn test_table_accounts_sorted() {
        let table: TransactionTable = vec![
            txn("T1", "C", "A", 10.0, "2026-02-01T00:00:00"),
            txn("T2", "B", "C", 10.0, "2026-02-01T00:00:00"),
        ]
        .into_iter()
        .collect();
        let accounts: Vec<_> = table.accounts().iter().map(|a| a.to_string()).collect();
        assert_eq!(accounts, vec!["A", "B", "C"]);
    }
}
