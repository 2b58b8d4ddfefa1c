//! Append-only ledger rows.
//!
//! One immutable row per balance-affecting action. Rows are never updated
//! or deleted; corrections are new offsetting rows.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, ShopId, TxHash};

/// The kind of balance-affecting action a ledger row records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    /// Points credited or minted on-chain.
    Mint,
    /// Points redeemed (burned or moved to the burn address).
    Redeem,
    /// Points transferred between accounts.
    Transfer,
    /// An offsetting correction of an earlier row.
    Refund,
}

impl LedgerKind {
    /// Database text representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mint => "mint",
            Self::Redeem => "redeem",
            Self::Transfer => "transfer",
            Self::Refund => "refund",
        }
    }

    /// Parse from the database text representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mint" => Some(Self::Mint),
            "redeem" => Some(Self::Redeem),
            "transfer" => Some(Self::Transfer),
            "refund" => Some(Self::Refund),
            _ => None,
        }
    }
}

/// Settlement status of a ledger row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerStatus {
    /// Action submitted but not yet confirmed.
    Pending,
    /// Action confirmed (on-chain hash known where applicable).
    Confirmed,
    /// Action failed; any reserved balance was returned.
    Failed,
}

impl LedgerStatus {
    /// Database text representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }

    /// Parse from the database text representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A single immutable ledger row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Row id assigned by the store.
    pub id: i64,
    /// Kind of action recorded.
    pub kind: LedgerKind,
    /// Acting principal's address.
    pub address: Address,
    /// Shop involved, for batch settlements.
    pub shop_id: Option<ShopId>,
    /// Points moved by this action.
    pub amount: Amount,
    /// On-chain transaction hash, when one exists.
    pub transaction_hash: Option<TxHash>,
    /// Settlement status.
    pub status: LedgerStatus,
    /// Unix timestamp when the row was appended.
    pub timestamp: u64,
    /// Structured context (triggering purchase / order ids, reasons).
    pub metadata: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            LedgerKind::Mint,
            LedgerKind::Redeem,
            LedgerKind::Transfer,
            LedgerKind::Refund,
        ] {
            assert_eq!(LedgerKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            LedgerStatus::Pending,
            LedgerStatus::Confirmed,
            LedgerStatus::Failed,
        ] {
            assert_eq!(LedgerStatus::parse(status.as_str()), Some(status));
        }
    }
}
