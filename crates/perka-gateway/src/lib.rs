//! # perka-gateway
//!
//! Sole point of contact with the on-chain token contract.
//!
//! The gateway performs each on-chain call exactly once per invocation and
//! never retries internally: a blind retry risks a double mint, so
//! retry/idempotency policy belongs to callers. Contract failures are
//! classified into four categories callers can dispatch on.
//!
//! ## Modules
//!
//! - [`contract`] — the raw `TokenContract` call surface and capability probe
//! - [`gateway`] — the `MintGateway` wrapper used by settlement code
//! - [`stub`] — scriptable in-memory contract for development and testing

pub mod contract;
pub mod gateway;
pub mod stub;

pub use contract::{ContractCapabilities, TokenContract};
pub use gateway::{BurnOutcome, MintGateway};
pub use stub::StubContract;

/// Classified gateway error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The caller's signer lacks the required contract role.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The submitting account cannot cover gas for the call.
    #[error("insufficient gas: {0}")]
    InsufficientGas(String),

    /// The contract is paused; no state-changing call can succeed.
    #[error("contract is paused")]
    ContractPaused,

    /// Anything the classifier could not place in a known category.
    #[error("unknown contract error: {0}")]
    Unknown(String),
}

/// Convenience result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Classify a raw contract/RPC error message.
///
/// Contract implementations funnel their transport-level errors through
/// here so callers always see one of the four categories.
pub fn classify(raw: &str) -> GatewayError {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("pause") {
        GatewayError::ContractPaused
    } else if lower.contains("permission") || lower.contains("denied") || lower.contains("role") {
        GatewayError::PermissionDenied(raw.to_string())
    } else if lower.contains("gas") || lower.contains("funds") {
        GatewayError::InsufficientGas(raw.to_string())
    } else {
        GatewayError::Unknown(raw.to_string())
    }
}
