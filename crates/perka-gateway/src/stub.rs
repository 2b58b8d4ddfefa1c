//! Scriptable in-memory token contract.
//!
//! Stands in for the deployed contract during development and in tests,
//! the same way a hardcoded stub oracle stands in for a price feed. All
//! mutation knobs are `dev_`-prefixed and take `&self` so the stub can sit
//! behind the same shared references as a real chain client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use perka_types::{Amount, TxHash};

use crate::contract::{ContractCapabilities, TokenContract};
use crate::{GatewayError, Result};

#[derive(Default)]
struct StubState {
    balances: HashMap<String, u64>,
    paused: bool,
    fail_calls: Option<GatewayError>,
}

/// An in-memory contract with scriptable failures and pause state.
pub struct StubContract {
    state: Mutex<StubState>,
    capabilities: ContractCapabilities,
    mint_calls: AtomicU64,
    next_nonce: AtomicU64,
}

impl StubContract {
    /// Create a fully featured stub (burn and pause surfaces present).
    pub fn new() -> Self {
        Self::with_capabilities(ContractCapabilities::full())
    }

    /// Create a stub advertising the given capabilities.
    pub fn with_capabilities(capabilities: ContractCapabilities) -> Self {
        Self {
            state: Mutex::new(StubState::default()),
            capabilities,
            mint_calls: AtomicU64::new(0),
            next_nonce: AtomicU64::new(1),
        }
    }

    /// Pause or unpause the stub contract.
    pub fn dev_set_paused(&self, paused: bool) {
        tracing::warn!(paused, "stub contract: pause state changed (dev only)");
        self.lock().paused = paused;
    }

    /// Make every state-changing call fail with the given error until
    /// [`dev_clear_failure`](Self::dev_clear_failure) is called.
    pub fn dev_fail_calls(&self, error: GatewayError) {
        tracing::warn!(%error, "stub contract: failure injected (dev only)");
        self.lock().fail_calls = Some(error);
    }

    /// Clear an injected failure.
    pub fn dev_clear_failure(&self) {
        self.lock().fail_calls = None;
    }

    /// Number of mint calls the stub has received.
    pub fn mint_calls(&self) -> u64 {
        self.mint_calls.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_hash(&self) -> TxHash {
        let nonce = self.next_nonce.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&nonce.to_be_bytes());
        bytes[8..16].copy_from_slice(&rand::random::<[u8; 8]>());
        format!("0x{}", hex::encode(bytes))
    }

    fn check_call(&self, state: &StubState) -> Result<()> {
        if let Some(err) = &state.fail_calls {
            return Err(err.clone());
        }
        if state.paused {
            return Err(GatewayError::ContractPaused);
        }
        Ok(())
    }
}

impl Default for StubContract {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenContract for StubContract {
    fn capabilities(&self) -> ContractCapabilities {
        self.capabilities
    }

    fn mint(&self, to: &str, amount: Amount, _reference: &str) -> Result<TxHash> {
        self.mint_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.lock();
        self.check_call(&state)?;
        *state.balances.entry(to.to_string()).or_insert(0) += amount;
        Ok(self.next_hash())
    }

    fn burn_from(&self, holder: &str, amount: Amount) -> Result<TxHash> {
        let mut state = self.lock();
        self.check_call(&state)?;
        let balance = state.balances.entry(holder.to_string()).or_insert(0);
        if *balance < amount {
            return Err(GatewayError::Unknown(format!(
                "burn amount exceeds balance of {holder}"
            )));
        }
        *balance -= amount;
        Ok(self.next_hash())
    }

    fn transfer(&self, from: &str, to: &str, amount: Amount) -> Result<TxHash> {
        let mut state = self.lock();
        self.check_call(&state)?;
        let from_balance = state.balances.entry(from.to_string()).or_insert(0);
        if *from_balance < amount {
            return Err(GatewayError::Unknown(format!(
                "transfer amount exceeds balance of {from}"
            )));
        }
        *from_balance -= amount;
        *state.balances.entry(to.to_string()).or_insert(0) += amount;
        Ok(self.next_hash())
    }

    fn balance_of(&self, address: &str) -> Result<Option<u64>> {
        // addresses the stub has never touched resolve to "unknown"
        Ok(self.lock().balances.get(address).copied())
    }

    fn paused(&self) -> Result<bool> {
        Ok(self.lock().paused)
    }
}
