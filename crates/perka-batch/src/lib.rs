//! # perka-batch
//!
//! Batch purchase minting coordinator.
//!
//! Consolidates all of one shop's completed, unminted purchases into a
//! single on-chain mint, exactly once, even under concurrent invocation.
//! The whole settlement runs inside one immediate-mode database
//! transaction: a concurrent run for the same shop blocks at the
//! transaction boundary until this one ends, and any failure after the
//! transaction opens rolls everything back.

pub mod coordinator;

pub use coordinator::{settle_shop, BatchOutcome};

use perka_db::DbError;
use perka_gateway::GatewayError;
use perka_ledger::LedgerError;
use perka_types::{Amount, ShopId, TxHash};

/// Error types for batch settlement.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// No shop row exists for the id.
    #[error("unknown shop: {0}")]
    UnknownShop(ShopId),

    /// Summing purchase amounts overflowed.
    #[error("purchase total overflow for shop {0}")]
    TotalOverflow(ShopId),

    /// After stamping, the re-counted rows did not match the submitted
    /// set. The transaction is rolled back even though the on-chain mint
    /// already happened: an explicit, detectable discrepancy for manual
    /// reconciliation instead of silent loss. Never auto-retried.
    #[error(
        "verification mismatch for shop {shop_id}: stamped {actual} of {expected} rows (tx {tx_hash})"
    )]
    VerificationMismatch {
        /// The shop being settled.
        shop_id: ShopId,
        /// Hash of the already-submitted on-chain mint.
        tx_hash: TxHash,
        /// Rows submitted for stamping.
        expected: usize,
        /// Rows found stamped on re-count.
        actual: usize,
        /// The minted total, for reconciliation.
        total: Amount,
    },

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

pub type Result<T> = std::result::Result<T, BatchError>;
