//! Account balance query functions.
//!
//! The available/pending pair is only ever moved by the single-statement
//! updates in this module. Each guarded update checks its precondition in
//! the WHERE clause, so a race between two callers resolves to exactly one
//! winner and the loser sees zero affected rows.

use rusqlite::{Connection, OptionalExtension};

use perka_types::account::AccountBalance;
use perka_types::Amount;

use crate::{DbError, Result};

/// Fetch an account row.
///
/// # Errors
///
/// - [`DbError::NotFound`] if no account exists for the address
pub fn get(conn: &Connection, address: &str) -> Result<AccountBalance> {
    try_get(conn, address)?
        .ok_or_else(|| DbError::NotFound(format!("account {address}")))
}

/// Fetch an account row, `None` if it does not exist.
pub fn try_get(conn: &Connection, address: &str) -> Result<Option<AccountBalance>> {
    let row = conn
        .query_row(
            "SELECT address, available_balance, pending_mint_balance,
                    lifetime_earned, lifetime_redeemed, last_sync_at
             FROM accounts WHERE address = ?1",
            [address],
            map_row,
        )
        .optional()
        .map_err(DbError::Sqlite)?;
    Ok(row)
}

/// Credit points to an account, creating the row on first credit.
///
/// Increments `available_balance` and `lifetime_earned` in one statement.
pub fn credit(conn: &Connection, address: &str, amount: Amount) -> Result<()> {
    conn.execute(
        "INSERT INTO accounts (address, available_balance, lifetime_earned)
         VALUES (?1, ?2, ?2)
         ON CONFLICT(address) DO UPDATE SET
             available_balance = available_balance + ?2,
             lifetime_earned = lifetime_earned + ?2",
        rusqlite::params![address, amount as i64],
    )?;
    Ok(())
}

/// Move `amount` from available to pending in one atomic statement.
///
/// Returns `false` if the account is missing or the available balance is
/// insufficient; nothing is written in that case.
pub fn reserve(conn: &Connection, address: &str, amount: Amount) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE accounts
         SET available_balance = available_balance - ?1,
             pending_mint_balance = pending_mint_balance + ?1
         WHERE address = ?2 AND available_balance >= ?1",
        rusqlite::params![amount as i64, address],
    )?;
    Ok(updated == 1)
}

/// Return `amount` from pending to available in one atomic statement.
///
/// The exact inverse of [`reserve`]. Returns `false` if the pending balance
/// does not cover the amount.
pub fn cancel_pending(conn: &Connection, address: &str, amount: Amount) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE accounts
         SET available_balance = available_balance + ?1,
             pending_mint_balance = pending_mint_balance - ?1
         WHERE address = ?2 AND pending_mint_balance >= ?1",
        rusqlite::params![amount as i64, address],
    )?;
    Ok(updated == 1)
}

/// Clear `amount` from pending after a settled mint and stamp the sync time.
pub fn complete_pending(
    conn: &Connection,
    address: &str,
    amount: Amount,
    synced_at: u64,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE accounts
         SET pending_mint_balance = pending_mint_balance - ?1,
             last_sync_at = ?2
         WHERE address = ?3 AND pending_mint_balance >= ?1",
        rusqlite::params![amount as i64, synced_at as i64, address],
    )?;
    Ok(updated == 1)
}

/// Debit a redemption: decrement available, increment lifetime redeemed.
///
/// Reserved (pending) balance is deliberately untouchable here — tokens in
/// flight to a wallet can never be spent.
pub fn debit_redeem(conn: &Connection, address: &str, amount: Amount) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE accounts
         SET available_balance = available_balance - ?1,
             lifetime_redeemed = lifetime_redeemed + ?1
         WHERE address = ?2 AND available_balance >= ?1",
        rusqlite::params![amount as i64, address],
    )?;
    Ok(updated == 1)
}

/// List accounts with a non-zero pending balance, largest first.
pub fn with_pending(conn: &Connection, limit: u32) -> Result<Vec<AccountBalance>> {
    let mut stmt = conn.prepare(
        "SELECT address, available_balance, pending_mint_balance,
                lifetime_earned, lifetime_redeemed, last_sync_at
         FROM accounts WHERE pending_mint_balance > 0
         ORDER BY pending_mint_balance DESC LIMIT ?1",
    )?;

    let rows = stmt
        .query_map([limit], map_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountBalance> {
    Ok(AccountBalance {
        address: row.get(0)?,
        available_balance: row.get::<_, i64>(1)? as u64,
        pending_mint_balance: row.get::<_, i64>(2)? as u64,
        lifetime_earned: row.get::<_, i64>(3)? as u64,
        lifetime_redeemed: row.get::<_, i64>(4)? as u64,
        last_sync_at: row.get::<_, Option<i64>>(5)?.map(|t| t as u64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        crate::open_memory().expect("open test db")
    }

    #[test]
    fn test_credit_creates_account() {
        let conn = test_db();
        credit(&conn, "0xaaa", 100).expect("credit");
        let acct = get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 100);
        assert_eq!(acct.lifetime_earned, 100);
        assert_eq!(acct.pending_mint_balance, 0);
    }

    #[test]
    fn test_credit_accumulates() {
        let conn = test_db();
        credit(&conn, "0xaaa", 100).expect("credit");
        credit(&conn, "0xaaa", 50).expect("credit again");
        let acct = get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 150);
        assert_eq!(acct.lifetime_earned, 150);
    }

    #[test]
    fn test_get_unknown_account() {
        let conn = test_db();
        assert!(matches!(get(&conn, "0xnone"), Err(DbError::NotFound(_))));
        assert!(try_get(&conn, "0xnone").expect("try_get").is_none());
    }

    #[test]
    fn test_reserve_moves_exact_amount() {
        let conn = test_db();
        credit(&conn, "0xaaa", 100).expect("credit");
        assert!(reserve(&conn, "0xaaa", 80).expect("reserve"));

        let acct = get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 20);
        assert_eq!(acct.pending_mint_balance, 80);
    }

    #[test]
    fn test_reserve_insufficient_is_noop() {
        let conn = test_db();
        credit(&conn, "0xaaa", 30).expect("credit");
        assert!(!reserve(&conn, "0xaaa", 50).expect("reserve"));

        let acct = get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 30);
        assert_eq!(acct.pending_mint_balance, 0);
    }

    #[test]
    fn test_cancel_restores_exact_amount() {
        let conn = test_db();
        credit(&conn, "0xaaa", 100).expect("credit");
        reserve(&conn, "0xaaa", 80).expect("reserve");
        assert!(cancel_pending(&conn, "0xaaa", 80).expect("cancel"));

        let acct = get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 100);
        assert_eq!(acct.pending_mint_balance, 0);
    }

    #[test]
    fn test_cancel_over_pending_is_noop() {
        let conn = test_db();
        credit(&conn, "0xaaa", 100).expect("credit");
        reserve(&conn, "0xaaa", 40).expect("reserve");
        assert!(!cancel_pending(&conn, "0xaaa", 60).expect("cancel"));
    }

    #[test]
    fn test_complete_clears_pending_and_stamps_sync() {
        let conn = test_db();
        credit(&conn, "0xaaa", 100).expect("credit");
        reserve(&conn, "0xaaa", 80).expect("reserve");
        assert!(complete_pending(&conn, "0xaaa", 80, 1_700_000_000).expect("complete"));

        let acct = get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 20);
        assert_eq!(acct.pending_mint_balance, 0);
        assert_eq!(acct.last_sync_at, Some(1_700_000_000));
    }

    #[test]
    fn test_debit_redeem() {
        let conn = test_db();
        credit(&conn, "0xaaa", 100).expect("credit");
        assert!(debit_redeem(&conn, "0xaaa", 60).expect("redeem"));

        let acct = get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 40);
        assert_eq!(acct.lifetime_redeemed, 60);
    }

    #[test]
    fn test_redeem_cannot_touch_pending() {
        let conn = test_db();
        credit(&conn, "0xaaa", 100).expect("credit");
        reserve(&conn, "0xaaa", 80).expect("reserve");
        // only 20 available; the 80 in flight is out of reach
        assert!(!debit_redeem(&conn, "0xaaa", 50).expect("redeem"));
    }

    #[test]
    fn test_with_pending_filters_and_orders() {
        let conn = test_db();
        credit(&conn, "0xaaa", 100).expect("credit");
        credit(&conn, "0xbbb", 100).expect("credit");
        credit(&conn, "0xccc", 100).expect("credit");
        reserve(&conn, "0xaaa", 10).expect("reserve");
        reserve(&conn, "0xbbb", 90).expect("reserve");

        let pending = with_pending(&conn, 10).expect("list");
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].address, "0xbbb");
        assert_eq!(pending[1].address, "0xaaa");
    }
}
