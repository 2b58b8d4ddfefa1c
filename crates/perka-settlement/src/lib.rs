//! # perka-settlement
//!
//! Balance settlement service: moves value between the off-chain account
//! ledger and the on-chain token contract for a single account at a time.
//!
//! Every mint request walks one state machine:
//!
//! ```text
//! REQUESTED -> RESERVED -> SUBMITTED -> SETTLED
//!                                    -> ROLLED_BACK
//!                                    -> UNRESOLVED
//! ```
//!
//! Reservation is pure, reversible off-chain bookkeeping performed before
//! the irreversible on-chain call, so a failed submission always has a
//! clean path back — and tokens in flight to a wallet can never be spent
//! by a concurrent redemption.
//!
//! ## Modules
//!
//! - [`phase`] — the per-request state machine and mint receipt
//! - [`service`] — validate / reserve / instant mint / cancel / pending listing

pub mod phase;
pub mod service;

pub use phase::{MintPhase, MintReceipt};
pub use service::SettlementService;

use perka_db::DbError;
use perka_gateway::GatewayError;
use perka_ledger::LedgerError;
use perka_types::Amount;

/// Error types for settlement operations.
#[derive(Debug, thiserror::Error)]
pub enum SettlementError {
    /// Requested amount is zero.
    #[error("invalid amount: {0}")]
    InvalidAmount(Amount),

    /// No account row exists for the address.
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    /// Requested more than the available balance allows.
    #[error("insufficient balance: requested {requested}, max allowed {max_allowed}")]
    InsufficientBalance {
        /// The requested amount.
        requested: Amount,
        /// The maximum the account could settle right now.
        max_allowed: Amount,
    },

    /// The contract is paused; rejected before any mutation.
    #[error("token contract is paused")]
    ContractPaused,

    /// The atomic reservation update affected no row (a concurrent writer
    /// won the race). Nothing was mutated, nothing to unwind.
    #[error("reservation failed for {address}: balance changed concurrently")]
    ReservationFailed {
        /// The account whose reservation lost the race.
        address: String,
    },

    /// The on-chain call failed and the reservation was rolled back.
    #[error("mint failed, reservation rolled back: {0}")]
    RolledBack(GatewayError),

    /// The on-chain call failed and the rollback write also failed. The
    /// reserved amount is stranded in `pending_mint_balance` and needs
    /// operator attention.
    #[error("settlement unresolved for {address}: {amount} stranded in pending")]
    Unresolved {
        /// The affected account.
        address: String,
        /// The stranded amount.
        amount: Amount,
    },

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

pub type Result<T> = std::result::Result<T, SettlementError>;
