//! One-shop batch settlement.

use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use perka_db::queries::{purchases, shops};
use perka_db::DbError;
use perka_gateway::{MintGateway, TokenContract};
use perka_ledger::LedgerEntry;
use perka_types::ledger::{LedgerKind, LedgerStatus};
use perka_types::{unix_now, Amount, ShopId, TxHash};

use crate::{BatchError, Result};

/// Outcome of one batch settlement run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatchOutcome {
    /// One on-chain mint consolidated the listed rows.
    Minted {
        /// The settled shop.
        shop_id: ShopId,
        /// Sum of all settled purchase amounts.
        total: Amount,
        /// Number of purchase rows settled.
        purchase_count: usize,
        /// Hash of the single consolidating mint.
        tx_hash: TxHash,
    },
    /// No completed, unminted purchases existed; zero on-chain calls.
    NothingToMint,
}

/// Settle all of one shop's completed, unminted purchases in one mint.
///
/// The run is atomic: an immediate transaction serializes concurrent
/// settlement attempts, the selected rows are stamped with the returned
/// hash, and a re-count verifies the stamp before commit. A mismatch is a
/// fatal consistency failure — the transaction rolls back and the
/// discrepancy is surfaced loudly, never auto-retried (a retry could
/// double-mint).
pub fn settle_shop<C: TokenContract>(
    conn: &mut Connection,
    gateway: &MintGateway<C>,
    shop_id: &str,
) -> Result<BatchOutcome> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(DbError::Sqlite)?;

    // serialization point for this shop
    let shop = shops::get(&tx, shop_id).map_err(|err| match err {
        DbError::NotFound(_) => BatchError::UnknownShop(shop_id.to_string()),
        other => BatchError::Db(other),
    })?;

    let unminted = purchases::unminted_for_shop(&tx, shop_id)?;
    if unminted.is_empty() {
        // nothing to do; dropping the transaction rolls it back
        info!(%shop_id, "batch settlement no-op: no unminted purchases");
        return Ok(BatchOutcome::NothingToMint);
    }

    let ids: Vec<_> = unminted.iter().map(|(id, _)| id.clone()).collect();
    let total = unminted
        .iter()
        .try_fold(0u64, |acc, (_, amount)| acc.checked_add(*amount))
        .ok_or_else(|| BatchError::TotalOverflow(shop_id.to_string()))?;

    // one on-chain transaction regardless of row count
    let tx_hash = gateway.mint(&shop.payout_address, total, shop_id)?;

    stamp_and_verify(&tx, shop_id, &ids, &tx_hash, total)?;

    perka_ledger::append(
        &tx,
        &LedgerEntry {
            kind: LedgerKind::Mint,
            address: &shop.payout_address,
            shop_id: Some(shop_id),
            amount: total,
            transaction_hash: Some(&tx_hash),
            status: LedgerStatus::Confirmed,
            metadata: Some(serde_json::json!({
                "purchase_ids": ids,
                "purchase_count": ids.len(),
            })),
        },
    )?;

    tx.commit().map_err(DbError::Sqlite)?;
    info!(
        %shop_id,
        total,
        purchase_count = ids.len(),
        %tx_hash,
        "batch settlement committed"
    );

    Ok(BatchOutcome::Minted {
        shop_id: shop_id.to_string(),
        total,
        purchase_count: ids.len(),
        tx_hash,
    })
}

/// Stamp the selected rows with the mint hash, then re-count the stamps.
///
/// A count short of the submitted set means a row slipped past the
/// `minted_at IS NULL` guard between select and stamp. The on-chain mint
/// already happened, so this errors instead of committing a partial stamp.
fn stamp_and_verify(
    tx: &Connection,
    shop_id: &str,
    ids: &[perka_types::PurchaseId],
    tx_hash: &str,
    total: Amount,
) -> Result<()> {
    let minted_at = unix_now();
    purchases::mark_minted(tx, ids, tx_hash, minted_at)?;

    let stamped = purchases::count_minted(tx, ids, tx_hash)?;
    if stamped != ids.len() {
        error!(
            %shop_id,
            %tx_hash,
            expected = ids.len(),
            actual = stamped,
            total,
            "batch verification mismatch: rolling back after an on-chain mint; manual reconciliation required"
        );
        return Err(BatchError::VerificationMismatch {
            shop_id: shop_id.to_string(),
            tx_hash: tx_hash.to_string(),
            expected: ids.len(),
            actual: stamped,
            total,
        });
    }
    Ok(())
}
