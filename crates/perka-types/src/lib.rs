//! # perka-types
//!
//! Shared domain types used across the Perka workspace: the off-chain
//! account balance, purchase records awaiting settlement, and the
//! append-only ledger rows produced by every balance-affecting action.

pub mod account;
pub mod ledger;
pub mod purchase;

/// Common type aliases.
pub type Address = String;
pub type ShopId = String;
pub type PurchaseId = String;
pub type TxHash = String;

/// Token amounts in whole loyalty points.
pub type Amount = u64;

/// The conventional burn address used when the token contract exposes no
/// burn-from-holder call.
pub const BURN_ADDRESS: &str = "0x000000000000000000000000000000000000dEaD";

/// Default page size for listing queries.
pub const DEFAULT_LIST_LIMIT: u32 = 50;

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
