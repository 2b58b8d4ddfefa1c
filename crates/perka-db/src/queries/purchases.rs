//! Purchase record query functions.
//!
//! `minted_at` is the settlement marker: it is stamped at most once per
//! row, and only together with the hash of the consolidating mint.

use rusqlite::{Connection, OptionalExtension};

use perka_types::purchase::{PurchaseRecord, PurchaseStatus};
use perka_types::{Amount, PurchaseId};

use crate::{DbError, Result};

/// Insert a purchase record.
pub fn insert(conn: &Connection, purchase: &PurchaseRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO purchases (id, shop_id, amount, status, minted_at, transaction_hash)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            purchase.id,
            purchase.shop_id,
            purchase.amount as i64,
            purchase.status.as_str(),
            purchase.minted_at.map(|t| t as i64),
            purchase.transaction_hash,
        ],
    )?;
    Ok(())
}

/// Fetch a purchase row.
///
/// # Errors
///
/// - [`DbError::NotFound`] if no purchase exists for the id
pub fn get(conn: &Connection, id: &str) -> Result<PurchaseRecord> {
    conn.query_row(
        "SELECT id, shop_id, amount, status, minted_at, transaction_hash
         FROM purchases WHERE id = ?1",
        [id],
        map_row,
    )
    .optional()
    .map_err(DbError::Sqlite)?
    .ok_or_else(|| DbError::NotFound(format!("purchase {id}")))
}

/// Select id and amount of every completed, unminted purchase for a shop.
pub fn unminted_for_shop(conn: &Connection, shop_id: &str) -> Result<Vec<(PurchaseId, Amount)>> {
    let mut stmt = conn.prepare(
        "SELECT id, amount FROM purchases
         WHERE shop_id = ?1 AND status = 'completed' AND minted_at IS NULL
         ORDER BY id",
    )?;

    let rows = stmt
        .query_map([shop_id], |row| {
            Ok((row.get(0)?, row.get::<_, i64>(1)? as u64))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Stamp `minted_at` and the transaction hash on exactly the given rows.
///
/// Rows already minted are skipped by the `minted_at IS NULL` guard.
/// Returns the number of rows actually stamped.
pub fn mark_minted(
    conn: &Connection,
    ids: &[PurchaseId],
    tx_hash: &str,
    minted_at: u64,
) -> Result<usize> {
    let mut stmt = conn.prepare(
        "UPDATE purchases SET minted_at = ?1, transaction_hash = ?2
         WHERE id = ?3 AND minted_at IS NULL",
    )?;

    let mut stamped = 0;
    for id in ids {
        stamped += stmt.execute(rusqlite::params![minted_at as i64, tx_hash, id])?;
    }
    Ok(stamped)
}

/// Count how many of the given rows carry the given hash and a non-null
/// `minted_at`. The batch coordinator compares this against the number of
/// rows it submitted.
pub fn count_minted(conn: &Connection, ids: &[PurchaseId], tx_hash: &str) -> Result<usize> {
    let mut stmt = conn.prepare(
        "SELECT COUNT(*) FROM purchases
         WHERE id = ?1 AND minted_at IS NOT NULL AND transaction_hash = ?2",
    )?;

    let mut count = 0usize;
    for id in ids {
        let n: i64 = stmt.query_row(rusqlite::params![id, tx_hash], |row| row.get(0))?;
        count += n as usize;
    }
    Ok(count)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PurchaseRecord> {
    let status_text: String = row.get(3)?;
    let status = PurchaseStatus::parse(&status_text).unwrap_or(PurchaseStatus::Failed);
    Ok(PurchaseRecord {
        id: row.get(0)?,
        shop_id: row.get(1)?,
        amount: row.get::<_, i64>(2)? as u64,
        status,
        minted_at: row.get::<_, Option<i64>>(4)?.map(|t| t as u64),
        transaction_hash: row.get(5)?,
    })
}
