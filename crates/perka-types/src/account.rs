//! Off-chain account balance state.
//!
//! Every account has an `available` balance (spendable off-chain) and a
//! `pending_mint` balance (reserved, in flight to the chain). Both are
//! non-negative at all times, and their sum changes only through the
//! settlement service's reserve / complete / cancel operations.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount};

/// A single off-chain account balance row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// Wallet address this balance belongs to.
    pub address: Address,
    /// Spendable off-chain balance.
    pub available_balance: Amount,
    /// Reserved balance currently in flight to the chain.
    pub pending_mint_balance: Amount,
    /// Total points ever credited to this account.
    pub lifetime_earned: Amount,
    /// Total points ever redeemed from this account.
    pub lifetime_redeemed: Amount,
    /// Unix timestamp of the last settled on-chain mint, if any.
    pub last_sync_at: Option<u64>,
}

impl AccountBalance {
    /// Create a fresh zero balance for an address.
    pub fn new(address: Address) -> Self {
        Self {
            address,
            available_balance: 0,
            pending_mint_balance: 0,
            lifetime_earned: 0,
            lifetime_redeemed: 0,
            last_sync_at: None,
        }
    }

    /// Total off-chain holdings (available + pending).
    pub fn total(&self) -> Amount {
        self.available_balance + self.pending_mint_balance
    }
}
