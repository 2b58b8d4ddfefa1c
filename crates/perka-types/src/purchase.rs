//! Purchase records accumulated per shop, awaiting batch settlement.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, PurchaseId, ShopId, TxHash};

/// Lifecycle status of a purchase record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    /// Purchase completed and eligible for settlement.
    Completed,
    /// Purchase still pending (not yet eligible).
    Pending,
    /// Purchase failed; never settled.
    Failed,
}

impl PurchaseStatus {
    /// Database text representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Failed => "failed",
        }
    }

    /// Parse from the database text representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "pending" => Some(Self::Pending),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A registered shop. The coordinator settles one shop at a time and mints
/// to its payout address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shop {
    /// Stable shop identifier.
    pub id: ShopId,
    /// Display name.
    pub name: String,
    /// Wallet address batch mints are sent to.
    pub payout_address: Address,
}

/// A single purchase row.
///
/// `minted_at` is set if and only if settlement succeeded and was verified;
/// it is never set twice for the same row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRecord {
    /// Stable purchase identifier.
    pub id: PurchaseId,
    /// Shop this purchase belongs to.
    pub shop_id: ShopId,
    /// Points earned by this purchase.
    pub amount: Amount,
    /// Lifecycle status.
    pub status: PurchaseStatus,
    /// Unix timestamp when the purchase was settled on-chain, if it was.
    pub minted_at: Option<u64>,
    /// Hash of the consolidating on-chain mint, if settled.
    pub transaction_hash: Option<TxHash>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            PurchaseStatus::Completed,
            PurchaseStatus::Pending,
            PurchaseStatus::Failed,
        ] {
            assert_eq!(PurchaseStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_status_rejects_unknown() {
        assert_eq!(PurchaseStatus::parse("settled"), None);
    }
}
