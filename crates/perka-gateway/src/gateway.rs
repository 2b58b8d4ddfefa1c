//! The mint gateway used by settlement code.
//!
//! Wraps a [`TokenContract`] and captures its capabilities once at
//! construction. All state-changing methods make exactly one contract
//! call; nothing in this module retries.

use tracing::{debug, warn};

use perka_types::{Amount, TxHash, BURN_ADDRESS};

use crate::contract::{ContractCapabilities, TokenContract};
use crate::{GatewayError, Result};

/// Outcome of a redemption-side token removal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BurnOutcome {
    /// Tokens were burned directly from the holder.
    Burned(TxHash),
    /// The contract has no burn call; tokens were moved to the burn address.
    TransferredToBurnAddress(TxHash),
    /// The single attempted call failed; nothing further was tried.
    Unresolved(GatewayError),
}

/// Gateway over one deployed token contract.
pub struct MintGateway<C> {
    contract: C,
    capabilities: ContractCapabilities,
}

impl<C: TokenContract> MintGateway<C> {
    /// Wrap a contract, probing its capabilities once.
    pub fn new(contract: C) -> Self {
        let capabilities = contract.capabilities();
        debug!(
            supports_burn = capabilities.supports_burn,
            supports_pause = capabilities.supports_pause,
            "mint gateway initialized"
        );
        Self {
            contract,
            capabilities,
        }
    }

    /// The capability snapshot taken at construction.
    pub fn capabilities(&self) -> ContractCapabilities {
        self.capabilities
    }

    /// The wrapped contract.
    pub fn contract(&self) -> &C {
        &self.contract
    }

    /// Mint `amount` tokens to `to` with one contract call.
    pub fn mint(&self, to: &str, amount: Amount, reference: &str) -> Result<TxHash> {
        let tx_hash = self.contract.mint(to, amount, reference)?;
        debug!(%to, amount, %tx_hash, "on-chain mint submitted");
        Ok(tx_hash)
    }

    /// Remove `amount` tokens from `holder`, by burn if the contract
    /// supports it, otherwise by transfer to the burn address.
    ///
    /// The method to use is decided by the capability snapshot; exactly one
    /// call is made either way, and a failed call yields
    /// [`BurnOutcome::Unresolved`] rather than a fallback attempt.
    pub fn burn_or_transfer(&self, holder: &str, amount: Amount) -> BurnOutcome {
        if self.capabilities.supports_burn {
            match self.contract.burn_from(holder, amount) {
                Ok(tx_hash) => BurnOutcome::Burned(tx_hash),
                Err(err) => {
                    warn!(%holder, amount, %err, "burn call failed, left unresolved");
                    BurnOutcome::Unresolved(err)
                }
            }
        } else {
            match self.contract.transfer(holder, BURN_ADDRESS, amount) {
                Ok(tx_hash) => BurnOutcome::TransferredToBurnAddress(tx_hash),
                Err(err) => {
                    warn!(%holder, amount, %err, "burn-address transfer failed, left unresolved");
                    BurnOutcome::Unresolved(err)
                }
            }
        }
    }

    /// Query the on-chain balance for an address.
    ///
    /// `None` means the query did not resolve to a number.
    pub fn balance_of(&self, address: &str) -> Result<Option<u64>> {
        self.contract.balance_of(address)
    }

    /// Whether the contract is paused.
    ///
    /// A contract without a pause surface is assumed operational.
    pub fn is_paused(&self) -> Result<bool> {
        if !self.capabilities.supports_pause {
            return Ok(false);
        }
        self.contract.paused()
    }
}
