//! CSV ingestion: schema validation, row cleaning, type normalization.
//!
//! The input is a header-bearing table with exactly the columns
//! `transaction_id, sender_id, receiver_id, amount, timestamp`. A
//! missing column aborts the run; a row whose sender, receiver, amount
//! or timestamp cannot be parsed is dropped and ingestion continues.

use crate::core::account::AccountId;
use crate::core::transaction::{parse_timestamp, Transaction, TransactionId, TransactionTable};
use csv::StringRecord;
use log::{debug, info};
use std::fs::File;
use std::path::Path;
use thiserror::Error;

/// Columns the input table must carry.
pub const REQUIRED_COLUMNS: [&str; 5] = [
    "transaction_id",
    "sender_id",
    "receiver_id",
    "amount",
    "timestamp",
];

/// Abort-class failures of `analyze`. Row-level problems are not errors;
/// those rows are dropped and processing continues.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("input is missing required column '{0}'")]
    MissingColumn(String),
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed csv input: {0}")]
    Csv(#[from] csv::Error),
}

/// Column positions resolved from the header row.
struct Columns {
    transaction_id: usize,
    sender_id: usize,
    receiver_id: usize,
    amount: usize,
    timestamp: usize,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self, AnalysisError> {
        let position = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            transaction_id: position("transaction_id")?,
            sender_id: position("sender_id")?,
            receiver_id: position("receiver_id")?,
            amount: position("amount")?,
            timestamp: position("timestamp")?,
        })
    }
}

/// Load and clean a transaction table from a CSV file.
///
/// Surviving rows are re-indexed 0..n-1 in input order. Zero surviving
/// rows is not an error.
pub fn load_table(path: impl AsRef<Path>) -> Result<TransactionTable, AnalysisError> {
    let file = File::open(path.as_ref())?;
    let mut reader = csv::Reader::from_reader(file);

    let columns = Columns::resolve(reader.headers()?)?;

    let mut table = TransactionTable::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        match parse_row(&record, &columns) {
            Some(txn) => table.push(txn),
            None => {
                dropped += 1;
                debug!("dropping unparseable row: {:?}", record);
            }
        }
    }

    info!(
        "ingested {} transactions ({} rows dropped)",
        table.len(),
        dropped
    );
    Ok(table)
}

/// Parse one record, or `None` when a required field is empty or
/// unparseable. The transaction id is carried through as-is, empty or
/// not — only sender, receiver, amount and timestamp disqualify a row.
fn parse_row(record: &StringRecord, columns: &Columns) -> Option<Transaction> {
    let sender = record.get(columns.sender_id)?.trim();
    let receiver = record.get(columns.receiver_id)?.trim();
    if sender.is_empty() || receiver.is_empty() {
        return None;
    }

    let amount: f64 = record.get(columns.amount)?.trim().parse().ok()?;
    if !amount.is_finite() {
        return None;
    }

    let timestamp = parse_timestamp(record.get(columns.timestamp)?)?;
    let id = record.get(columns.transaction_id).unwrap_or("").trim();

    Some(Transaction::new(
        TransactionId::new(id),
        AccountId::new(sender),
        AccountId::new(receiver),
        amount,
        timestamp,
    ))
}
