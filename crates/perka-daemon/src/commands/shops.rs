//! Shop and purchase-queue command handlers.

use std::sync::Arc;

use serde_json::Value;

use perka_types::purchase::{PurchaseRecord, PurchaseStatus, Shop};

use crate::rpc::RpcError;
use crate::DaemonState;

type Result = std::result::Result<Value, RpcError>;

/// Register a shop with its payout address.
pub async fn register(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = params
        .get("shop_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("shop_id required"))?;
    let name = params
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("name required"))?;
    let payout_address = params
        .get("payout_address")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("payout_address required"))?;

    let db = state.db.lock().await;
    perka_db::queries::shops::insert(
        &db,
        &Shop {
            id: id.to_string(),
            name: name.to_string(),
            payout_address: payout_address.to_string(),
        },
    )
    .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;

    Ok(serde_json::json!({ "shop_id": id }))
}

/// Queue a purchase for later batch settlement.
pub async fn record_purchase(state: &Arc<DaemonState>, params: &Value) -> Result {
    let id = params
        .get("purchase_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("purchase_id required"))?;
    let shop_id = params
        .get("shop_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::invalid_params("shop_id required"))?;
    let amount = params
        .get("amount")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| RpcError::invalid_params("amount required"))?;
    let status = params
        .get("status")
        .and_then(|v| v.as_str())
        .and_then(PurchaseStatus::parse)
        .unwrap_or(PurchaseStatus::Completed);

    if amount == 0 {
        return Err(RpcError::invalid_params("amount must be positive"));
    }

    let db = state.db.lock().await;
    perka_db::queries::purchases::insert(
        &db,
        &PurchaseRecord {
            id: id.to_string(),
            shop_id: shop_id.to_string(),
            amount,
            status,
            minted_at: None,
            transaction_hash: None,
        },
    )
    .map_err(|e| RpcError::internal_error(&format!("db error: {e}")))?;

    Ok(serde_json::json!({ "purchase_id": id, "status": status.as_str() }))
}
