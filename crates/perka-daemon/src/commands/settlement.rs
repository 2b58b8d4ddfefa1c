//! Settlement command handlers.

use std::sync::Arc;

use serde_json::Value;

use perka_batch::{BatchError, BatchOutcome};

use crate::commands::settlement_error;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Settle an amount from an account's available balance onto the chain.
pub async fn instant_mint(state: &Arc<DaemonState>, params: &Value) -> Result {
    let address = params
        .get("address")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("address required"))?;
    let amount = params
        .get("amount")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("amount required"))?;
    let reason = params
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("instant_mint");

    let db = state.db.lock().await;
    let receipt = state
        .service
        .instant_mint(&db, address, amount, reason)
        .map_err(settlement_error)?;

    Ok(serde_json::json!({
        "address": receipt.address,
        "amount": receipt.amount,
        "transaction_hash": receipt.transaction_hash,
        "phase": receipt.phase,
    }))
}

/// List accounts with balance reserved for in-flight mints.
pub async fn pending_mints(state: &Arc<DaemonState>, params: &Value) -> Result {
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|l| l as u32)
        .unwrap_or(state.config.advanced.list_limit);

    let db = state.db.lock().await;
    let pending = state
        .service
        .get_pending_mints(&db, limit)
        .map_err(settlement_error)?;

    let result: Vec<Value> = pending
        .iter()
        .map(|acct| {
            serde_json::json!({
                "address": acct.address,
                "pending_mint_balance": acct.pending_mint_balance,
            })
        })
        .collect();

    Ok(serde_json::json!(result))
}

/// Consolidate one shop's unminted purchases into a single on-chain mint.
pub async fn batch_settle(state: &Arc<DaemonState>, params: &Value) -> Result {
    let shop_id = params
        .get("shop_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("shop_id required"))?;

    let mut db = state.db.lock().await;
    let outcome =
        perka_batch::settle_shop(&mut db, state.service.gateway(), shop_id).map_err(batch_error)?;

    match outcome {
        BatchOutcome::Minted {
            shop_id,
            total,
            purchase_count,
            tx_hash,
        } => Ok(serde_json::json!({
            "shop_id": shop_id,
            "total_minted": total,
            "purchase_count": purchase_count,
            "transaction_hash": tx_hash,
        })),
        BatchOutcome::NothingToMint => Ok(serde_json::json!({
            "shop_id": shop_id,
            "total_minted": 0,
            "purchase_count": 0,
        })),
    }
}

/// Map a batch error to its caller-facing RPC shape.
fn batch_error(err: BatchError) -> RpcError {
    match err {
        BatchError::UnknownShop(shop_id) => RpcError::unknown_shop(&shop_id),
        BatchError::Gateway(e) => RpcError::internal_error(&format!("gateway error: {e}")),
        // verification mismatches are deliberately loud and non-retryable
        BatchError::VerificationMismatch { .. } => {
            RpcError::internal_error("batch verification mismatch; manual reconciliation required")
        }
        BatchError::TotalOverflow(_) => RpcError::invalid_params("purchase total overflow"),
        BatchError::Db(e) => RpcError::internal_error(&format!("db error: {e}")),
        BatchError::Ledger(e) => RpcError::internal_error(&format!("ledger error: {e}")),
    }
}
