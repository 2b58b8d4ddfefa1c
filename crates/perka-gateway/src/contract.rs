//! The raw token contract call surface.
//!
//! Implementations wrap a concrete chain client; the rest of the engine
//! only sees this trait, so tests substitute [`crate::StubContract`].

use serde::{Deserialize, Serialize};

use perka_types::{Amount, TxHash};

use crate::Result;

/// What the deployed contract can do, probed once at gateway construction.
///
/// Capability decisions are made from this snapshot, never by catching a
/// failed call and falling back to another method.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCapabilities {
    /// Contract exposes a direct burn-from-holder call.
    pub supports_burn: bool,
    /// Contract exposes a pause surface.
    pub supports_pause: bool,
}

impl ContractCapabilities {
    /// A fully featured contract.
    pub fn full() -> Self {
        Self {
            supports_burn: true,
            supports_pause: true,
        }
    }
}

/// The on-chain token contract, as seen by this engine.
///
/// Calls are blocking and network-bound with no internal timeout; callers
/// bound total latency. Every method performs at most one on-chain call.
pub trait TokenContract: Send + Sync {
    /// Probe what the deployed contract supports.
    fn capabilities(&self) -> ContractCapabilities;

    /// Mint `amount` tokens to `to`. The reference string is carried into
    /// the contract event for off-chain correlation.
    fn mint(&self, to: &str, amount: Amount, reference: &str) -> Result<TxHash>;

    /// Burn `amount` tokens directly from `holder`.
    fn burn_from(&self, holder: &str, amount: Amount) -> Result<TxHash>;

    /// Transfer `amount` tokens from `from` to `to`.
    fn transfer(&self, from: &str, to: &str, amount: Amount) -> Result<TxHash>;

    /// Query the contract's own balance for an address.
    ///
    /// `None` means "unknown" (query did not resolve to a number), which is
    /// distinct from a known zero balance.
    fn balance_of(&self, address: &str) -> Result<Option<u64>>;

    /// Whether the contract is currently paused.
    fn paused(&self) -> Result<bool>;
}
