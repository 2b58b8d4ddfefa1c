//! The per-request settlement state machine.

use serde::{Deserialize, Serialize};

use perka_types::{Address, Amount, TxHash};

/// Phase of a single mint request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MintPhase {
    /// Request received, nothing mutated yet.
    Requested,
    /// Amount moved from available to pending in one atomic write.
    Reserved,
    /// The single on-chain call has been made.
    Submitted,
    /// On-chain success confirmed and pending cleared.
    Settled,
    /// On-chain failure; the reserved amount was returned.
    RolledBack,
    /// Rollback itself failed; operator intervention required.
    Unresolved,
}

impl MintPhase {
    /// Whether this phase ends the request.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::RolledBack | Self::Unresolved)
    }
}

/// Result of a settled instant mint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintReceipt {
    /// The minted-to address.
    pub address: Address,
    /// The settled amount.
    pub amount: Amount,
    /// Hash of the on-chain mint.
    pub transaction_hash: TxHash,
    /// Terminal phase (always [`MintPhase::Settled`] on the success path).
    pub phase: MintPhase,
}
