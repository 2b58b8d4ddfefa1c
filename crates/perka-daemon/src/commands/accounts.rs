//! Account command handlers.

use std::sync::Arc;

use serde_json::Value;

use perka_gateway::BurnOutcome;

use crate::commands::settlement_error;
use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

fn address_param(params: &Value) -> std::result::Result<&str, RpcError> {
    params
        .get("address")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("address required"))
}

fn amount_param(params: &Value) -> std::result::Result<u64, RpcError> {
    params
        .get("amount")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("amount required"))
}

/// Get an account's off-chain balance, with the on-chain view alongside.
pub async fn balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let address = address_param(params)?;
    let db = state.db.lock().await;

    let account = perka_db::queries::accounts::try_get(&db, address)
        .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?
        .ok_or_else(|| RpcError::unknown_account(address))?;

    // None means "unknown", distinct from zero
    let on_chain = state
        .service
        .gateway()
        .balance_of(address)
        .unwrap_or(None);

    Ok(serde_json::json!({
        "address": account.address,
        "available_balance": account.available_balance,
        "pending_mint_balance": account.pending_mint_balance,
        "lifetime_earned": account.lifetime_earned,
        "lifetime_redeemed": account.lifetime_redeemed,
        "last_sync_at": account.last_sync_at,
        "on_chain_balance": on_chain,
    }))
}

/// Credit earned points to an account.
pub async fn credit(state: &Arc<DaemonState>, params: &Value) -> Result {
    let address = address_param(params)?;
    let amount = amount_param(params)?;
    let reason = params
        .get("reason")
        .and_then(|v| v.as_str())
        .unwrap_or("credit");

    let db = state.db.lock().await;
    state
        .service
        .credit(&db, address, amount, reason)
        .map_err(settlement_error)?;

    Ok(serde_json::json!({ "credited": amount }))
}

/// Redeem points from an account's available balance.
pub async fn redeem(state: &Arc<DaemonState>, params: &Value) -> Result {
    let address = address_param(params)?;
    let amount = amount_param(params)?;

    let db = state.db.lock().await;
    let outcome = state
        .service
        .redeem(&db, address, amount)
        .map_err(settlement_error)?;

    let (method, tx_hash) = match &outcome {
        BurnOutcome::Burned(hash) => ("burned", Some(hash.clone())),
        BurnOutcome::TransferredToBurnAddress(hash) => ("transferred", Some(hash.clone())),
        BurnOutcome::Unresolved(_) => ("unresolved", None),
    };

    Ok(serde_json::json!({
        "redeemed": amount,
        "method": method,
        "tx_hash": tx_hash,
    }))
}

/// Get an account's ledger history.
pub async fn history(state: &Arc<DaemonState>, params: &Value) -> Result {
    let address = address_param(params)?;
    let limit = params
        .get("limit")
        .and_then(|v| v.as_u64())
        .map(|l| l as u32)
        .unwrap_or(state.config.advanced.list_limit);

    let db = state.db.lock().await;
    let rows = perka_ledger::for_address(&db, address, limit)
        .map_err(|e| RpcError::internal_error(&format!("ledger error: {e}")))?;

    let result: Vec<Value> = rows
        .iter()
        .map(|row| {
            serde_json::json!({
                "id": row.id,
                "type": row.kind.as_str(),
                "amount": row.amount,
                "transaction_hash": row.transaction_hash,
                "status": row.status.as_str(),
                "timestamp": row.timestamp,
                "metadata": row.metadata,
            })
        })
        .collect();

    Ok(serde_json::json!(result))
}
