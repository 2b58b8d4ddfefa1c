//! Ledger transaction query functions.
//!
//! Insert and select only. There is deliberately no UPDATE or DELETE in
//! this module: history is immutable and corrections are new rows.

use rusqlite::Connection;

use perka_types::ledger::{LedgerKind, LedgerStatus, LedgerTransaction};
use perka_types::Amount;

use crate::{DbError, Result};

/// Parameters for a new ledger row.
#[derive(Debug)]
pub struct NewLedgerRow<'a> {
    pub kind: LedgerKind,
    pub address: &'a str,
    pub shop_id: Option<&'a str>,
    pub amount: Amount,
    pub transaction_hash: Option<&'a str>,
    pub status: LedgerStatus,
    pub timestamp: u64,
    pub metadata: Option<&'a serde_json::Value>,
}

/// Append one row and return its id.
pub fn append(conn: &Connection, row: &NewLedgerRow<'_>) -> Result<i64> {
    let metadata = row
        .metadata
        .map(|m| serde_json::to_string(m).map_err(|e| DbError::Serialization(e.to_string())))
        .transpose()?;

    conn.execute(
        "INSERT INTO ledger_transactions
             (tx_type, address, shop_id, amount, transaction_hash, status, timestamp, metadata)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            row.kind.as_str(),
            row.address,
            row.shop_id,
            row.amount as i64,
            row.transaction_hash,
            row.status.as_str(),
            row.timestamp as i64,
            metadata,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// List the most recent rows, newest first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<LedgerTransaction>> {
    select(
        conn,
        "SELECT id, tx_type, address, shop_id, amount, transaction_hash,
                status, timestamp, metadata
         FROM ledger_transactions ORDER BY id DESC LIMIT ?1",
        rusqlite::params![limit],
    )
}

/// List the most recent rows for one address, newest first.
pub fn for_address(conn: &Connection, address: &str, limit: u32) -> Result<Vec<LedgerTransaction>> {
    select(
        conn,
        "SELECT id, tx_type, address, shop_id, amount, transaction_hash,
                status, timestamp, metadata
         FROM ledger_transactions WHERE address = ?1
         ORDER BY id DESC LIMIT ?2",
        rusqlite::params![address, limit],
    )
}

fn select(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<LedgerTransaction>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<LedgerTransaction> {
    let kind_text: String = row.get(1)?;
    let status_text: String = row.get(6)?;
    let metadata_text: Option<String> = row.get(8)?;

    Ok(LedgerTransaction {
        id: row.get(0)?,
        kind: LedgerKind::parse(&kind_text).unwrap_or(LedgerKind::Transfer),
        address: row.get(2)?,
        shop_id: row.get(3)?,
        amount: row.get::<_, i64>(4)? as u64,
        transaction_hash: row.get(5)?,
        status: LedgerStatus::parse(&status_text).unwrap_or(LedgerStatus::Failed),
        timestamp: row.get::<_, i64>(7)? as u64,
        metadata: metadata_text.and_then(|m| serde_json::from_str(&m).ok()),
    })
}
