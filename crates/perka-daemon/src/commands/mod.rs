//! RPC command handlers organized by domain.

pub mod accounts;
pub mod settlement;
pub mod shops;

use perka_settlement::SettlementError;

use crate::rpc::RpcError;

/// Map a settlement error to its caller-facing RPC shape.
///
/// Synchronous rejections keep their reason; an unresolved rollback
/// failure becomes a generic retryable error while the detail stays in
/// the daemon log.
pub fn settlement_error(err: SettlementError) -> RpcError {
    match err {
        SettlementError::InvalidAmount(_) => RpcError::invalid_params("amount must be positive"),
        SettlementError::UnknownAccount(address) => RpcError::unknown_account(&address),
        SettlementError::InsufficientBalance {
            requested,
            max_allowed,
        } => RpcError::insufficient_balance(requested, max_allowed),
        SettlementError::ContractPaused => RpcError::contract_paused(),
        SettlementError::ReservationFailed { .. }
        | SettlementError::Unresolved { .. }
        | SettlementError::RolledBack(_) => RpcError::settlement_retryable(),
        SettlementError::Db(e) => RpcError::internal_error(&format!("db error: {e}")),
        SettlementError::Ledger(e) => RpcError::internal_error(&format!("ledger error: {e}")),
        SettlementError::Gateway(e) => RpcError::internal_error(&format!("gateway error: {e}")),
    }
}
