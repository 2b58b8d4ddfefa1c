//! # perka-ledger
//!
//! Append-only transaction ledger recorder.
//!
//! Every balance-affecting action in the engine produces exactly one
//! immutable row: a stable id, the acting address, the amount moved, the
//! on-chain hash where one exists, and structured JSON metadata naming the
//! trigger. Rows are never updated or deleted; corrections go through
//! [`append_offset`], which writes a new offsetting row referencing the
//! original.

use rusqlite::Connection;
use tracing::debug;

use perka_db::queries::ledger::{self, NewLedgerRow};
use perka_db::DbError;
use perka_types::ledger::{LedgerKind, LedgerStatus, LedgerTransaction};
use perka_types::{unix_now, Amount};

/// Error types for ledger recording.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Db(#[from] DbError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// A balance-affecting action to be recorded.
#[derive(Debug)]
pub struct LedgerEntry<'a> {
    /// Kind of action.
    pub kind: LedgerKind,
    /// Acting principal's address.
    pub address: &'a str,
    /// Shop involved, for batch settlements.
    pub shop_id: Option<&'a str>,
    /// Points moved.
    pub amount: Amount,
    /// On-chain hash, when one exists.
    pub transaction_hash: Option<&'a str>,
    /// Settlement status of the action.
    pub status: LedgerStatus,
    /// Structured context (triggering purchase/order ids, reasons).
    pub metadata: Option<serde_json::Value>,
}

/// Append one row for an action, stamped with the current time.
///
/// Returns the new row's id.
pub fn append(conn: &Connection, entry: &LedgerEntry<'_>) -> Result<i64> {
    append_at(conn, entry, unix_now())
}

/// Append one row with an explicit timestamp.
pub fn append_at(conn: &Connection, entry: &LedgerEntry<'_>, timestamp: u64) -> Result<i64> {
    let row_id = ledger::append(
        conn,
        &NewLedgerRow {
            kind: entry.kind,
            address: entry.address,
            shop_id: entry.shop_id,
            amount: entry.amount,
            transaction_hash: entry.transaction_hash,
            status: entry.status,
            timestamp,
            metadata: entry.metadata.as_ref(),
        },
    )?;
    debug!(
        row_id,
        kind = entry.kind.as_str(),
        address = entry.address,
        amount = entry.amount,
        status = entry.status.as_str(),
        "ledger row appended"
    );
    Ok(row_id)
}

/// Append an offsetting correction for an earlier row.
///
/// The original row is left untouched; the new `refund`-typed row carries
/// the same amount and references the original by id in its metadata.
pub fn append_offset(
    conn: &Connection,
    original: &LedgerTransaction,
    reason: &str,
) -> Result<i64> {
    append(
        conn,
        &LedgerEntry {
            kind: LedgerKind::Refund,
            address: &original.address,
            shop_id: original.shop_id.as_deref(),
            amount: original.amount,
            transaction_hash: None,
            status: LedgerStatus::Confirmed,
            metadata: Some(serde_json::json!({
                "offsets_ledger_id": original.id,
                "reason": reason,
            })),
        },
    )
}

/// The most recent rows, newest first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<LedgerTransaction>> {
    Ok(ledger::recent(conn, limit)?)
}

/// The most recent rows for one address, newest first.
pub fn for_address(conn: &Connection, address: &str, limit: u32) -> Result<Vec<LedgerTransaction>> {
    Ok(ledger::for_address(conn, address, limit)?)
}
