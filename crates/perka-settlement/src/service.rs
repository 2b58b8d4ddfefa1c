//! The balance settlement service.
//!
//! One instance owns the mint gateway; database connections are passed in
//! per call so the daemon can share a single connection behind its own
//! lock. All validation happens before any mutation, and the only writes
//! to account rows go through the single-statement guarded updates in
//! `perka_db::queries::accounts`.

use rusqlite::Connection;
use tracing::{error, info, warn};

use perka_db::queries::accounts;
use perka_gateway::{BurnOutcome, MintGateway, TokenContract};
use perka_ledger::LedgerEntry;
use perka_types::account::AccountBalance;
use perka_types::ledger::{LedgerKind, LedgerStatus};
use perka_types::{unix_now, Amount};

use crate::phase::{MintPhase, MintReceipt};
use crate::{Result, SettlementError};

/// Settlement service over one mint gateway.
pub struct SettlementService<C> {
    gateway: MintGateway<C>,
}

impl<C: TokenContract> SettlementService<C> {
    /// Create a service around an owned gateway.
    pub fn new(gateway: MintGateway<C>) -> Self {
        Self { gateway }
    }

    /// The gateway this service settles through.
    pub fn gateway(&self) -> &MintGateway<C> {
        &self.gateway
    }

    /// Check a mint request without mutating anything.
    ///
    /// # Errors
    ///
    /// - [`SettlementError::InvalidAmount`] for a zero amount
    /// - [`SettlementError::UnknownAccount`] if no account row exists
    /// - [`SettlementError::InsufficientBalance`] with the maximum the
    ///   account could settle right now
    pub fn validate(&self, conn: &Connection, address: &str, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Err(SettlementError::InvalidAmount(amount));
        }
        let account = accounts::try_get(conn, address)?
            .ok_or_else(|| SettlementError::UnknownAccount(address.to_string()))?;
        if amount > account.available_balance {
            return Err(SettlementError::InsufficientBalance {
                requested: amount,
                max_allowed: account.available_balance,
            });
        }
        Ok(())
    }

    /// Reserve `amount` for an in-flight mint.
    ///
    /// The move from available to pending is one atomic update; a loss to
    /// a concurrent writer surfaces as [`SettlementError::ReservationFailed`]
    /// with nothing to unwind.
    pub fn reserve(&self, conn: &Connection, address: &str, amount: Amount) -> Result<()> {
        if !accounts::reserve(conn, address, amount)? {
            return Err(SettlementError::ReservationFailed {
                address: address.to_string(),
            });
        }
        Ok(())
    }

    /// Return a reserved amount to the available balance.
    ///
    /// The exact inverse of [`reserve`](Self::reserve). Returns `false` if
    /// the pending balance no longer covers the amount.
    pub fn cancel_pending_mint(
        &self,
        conn: &Connection,
        address: &str,
        amount: Amount,
    ) -> Result<bool> {
        Ok(accounts::cancel_pending(conn, address, amount)?)
    }

    /// Settle `amount` from an account's available balance onto the chain.
    ///
    /// Pause check and validation run before any mutation; the reservation
    /// runs before the single gateway call. On gateway failure the
    /// reservation is rolled back ([`SettlementError::RolledBack`]); if
    /// that reversal write itself fails, the request is escalated as
    /// [`SettlementError::Unresolved`] rather than silently dropped or
    /// duplicated.
    pub fn instant_mint(
        &self,
        conn: &Connection,
        address: &str,
        amount: Amount,
        reference: &str,
    ) -> Result<MintReceipt> {
        if self.gateway.is_paused()? {
            return Err(SettlementError::ContractPaused);
        }
        self.validate(conn, address, amount)?;
        self.reserve(conn, address, amount)?;

        match self.gateway.mint(address, amount, reference) {
            Ok(tx_hash) => {
                let synced_at = unix_now();
                if !accounts::complete_pending(conn, address, amount, synced_at)? {
                    // pending no longer covers the amount: something else
                    // touched the reservation while the call was in flight
                    error!(
                        %address,
                        amount,
                        %tx_hash,
                        "settled mint could not clear pending balance; manual reconciliation required"
                    );
                    return Err(SettlementError::Unresolved {
                        address: address.to_string(),
                        amount,
                    });
                }
                perka_ledger::append(
                    conn,
                    &LedgerEntry {
                        kind: LedgerKind::Mint,
                        address,
                        shop_id: None,
                        amount,
                        transaction_hash: Some(&tx_hash),
                        status: LedgerStatus::Confirmed,
                        metadata: Some(serde_json::json!({ "reference": reference })),
                    },
                )?;
                info!(%address, amount, %tx_hash, "instant mint settled");
                Ok(MintReceipt {
                    address: address.to_string(),
                    amount,
                    transaction_hash: tx_hash,
                    phase: MintPhase::Settled,
                })
            }
            Err(gateway_err) => {
                warn!(%address, amount, %gateway_err, "on-chain mint failed, rolling back reservation");
                match accounts::cancel_pending(conn, address, amount) {
                    Ok(true) => {
                        perka_ledger::append(
                            conn,
                            &LedgerEntry {
                                kind: LedgerKind::Mint,
                                address,
                                shop_id: None,
                                amount,
                                transaction_hash: None,
                                status: LedgerStatus::Failed,
                                metadata: Some(serde_json::json!({
                                    "reference": reference,
                                    "gateway_error": gateway_err.to_string(),
                                })),
                            },
                        )?;
                        Err(SettlementError::RolledBack(gateway_err))
                    }
                    Ok(false) | Err(_) => {
                        error!(
                            %address,
                            amount,
                            %gateway_err,
                            "rollback of failed mint did not apply; amount stranded in pending"
                        );
                        Err(SettlementError::Unresolved {
                            address: address.to_string(),
                            amount,
                        })
                    }
                }
            }
        }
    }

    /// Accounts holding a pending balance, for an external retry worker.
    pub fn get_pending_mints(&self, conn: &Connection, limit: u32) -> Result<Vec<AccountBalance>> {
        Ok(accounts::with_pending(conn, limit)?)
    }

    /// Credit earned points to an account, creating it on first credit.
    pub fn credit(
        &self,
        conn: &Connection,
        address: &str,
        amount: Amount,
        reason: &str,
    ) -> Result<()> {
        if amount == 0 {
            return Err(SettlementError::InvalidAmount(amount));
        }
        accounts::credit(conn, address, amount)?;
        perka_ledger::append(
            conn,
            &LedgerEntry {
                kind: LedgerKind::Mint,
                address,
                shop_id: None,
                amount,
                transaction_hash: None,
                status: LedgerStatus::Confirmed,
                metadata: Some(serde_json::json!({ "source": "credit", "reason": reason })),
            },
        )?;
        info!(%address, amount, reason, "points credited");
        Ok(())
    }

    /// Redeem points from an account's available balance.
    ///
    /// Reserved tokens in flight to a wallet are out of reach here: the
    /// debit is guarded against `available_balance` only. The off-chain
    /// ledger is authoritative for the spend; the on-chain removal is
    /// mirrored best-effort through `burn_or_transfer` and an unresolved
    /// outcome is recorded as pending for later reconciliation.
    pub fn redeem(&self, conn: &Connection, address: &str, amount: Amount) -> Result<BurnOutcome> {
        self.validate(conn, address, amount)?;
        if !accounts::debit_redeem(conn, address, amount)? {
            return Err(SettlementError::ReservationFailed {
                address: address.to_string(),
            });
        }

        let outcome = self.gateway.burn_or_transfer(address, amount);
        let (tx_hash, status) = match &outcome {
            BurnOutcome::Burned(hash) | BurnOutcome::TransferredToBurnAddress(hash) => {
                (Some(hash.as_str()), LedgerStatus::Confirmed)
            }
            BurnOutcome::Unresolved(_) => (None, LedgerStatus::Pending),
        };
        perka_ledger::append(
            conn,
            &LedgerEntry {
                kind: LedgerKind::Redeem,
                address,
                shop_id: None,
                amount,
                transaction_hash: tx_hash,
                status,
                metadata: None,
            },
        )?;
        info!(%address, amount, ?outcome, "points redeemed");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perka_gateway::{GatewayError, StubContract};
    use perka_types::ledger::LedgerTransaction;

    fn service() -> SettlementService<StubContract> {
        SettlementService::new(MintGateway::new(StubContract::new()))
    }

    fn db_with_account(address: &str, balance: Amount) -> Connection {
        let conn = perka_db::open_memory().expect("open test db");
        accounts::credit(&conn, address, balance).expect("seed account");
        conn
    }

    fn ledger_rows(conn: &Connection) -> Vec<LedgerTransaction> {
        perka_ledger::recent(conn, 50).expect("ledger rows")
    }

    #[test]
    fn test_instant_mint_settles() {
        let svc = service();
        let conn = db_with_account("0xaaa", 100);

        let receipt = svc
            .instant_mint(&conn, "0xaaa", 80, "order-1")
            .expect("mint");
        assert_eq!(receipt.phase, MintPhase::Settled);
        assert_eq!(receipt.amount, 80);

        let acct = accounts::get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 20);
        assert_eq!(acct.pending_mint_balance, 0);
        assert!(acct.last_sync_at.is_some());

        let rows = ledger_rows(&conn);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 80);
        assert_eq!(rows[0].status, LedgerStatus::Confirmed);
        assert_eq!(
            rows[0].transaction_hash.as_deref(),
            Some(receipt.transaction_hash.as_str())
        );
    }

    #[test]
    fn test_insufficient_balance_reports_max_allowed() {
        let svc = service();
        let conn = db_with_account("0xaaa", 30);

        let err = svc
            .instant_mint(&conn, "0xaaa", 50, "order-1")
            .expect_err("must reject");
        match err {
            SettlementError::InsufficientBalance {
                requested,
                max_allowed,
            } => {
                assert_eq!(requested, 50);
                assert_eq!(max_allowed, 30);
            }
            other => panic!("unexpected error: {other}"),
        }

        // rejected pre-mutation
        let acct = accounts::get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 30);
        assert_eq!(acct.pending_mint_balance, 0);
        assert!(ledger_rows(&conn).is_empty());
    }

    #[test]
    fn test_zero_amount_rejected() {
        let svc = service();
        let conn = db_with_account("0xaaa", 30);
        assert!(matches!(
            svc.instant_mint(&conn, "0xaaa", 0, "order-1"),
            Err(SettlementError::InvalidAmount(0))
        ));
    }

    #[test]
    fn test_unknown_account_rejected() {
        let svc = service();
        let conn = perka_db::open_memory().expect("open");
        assert!(matches!(
            svc.instant_mint(&conn, "0xghost", 10, "order-1"),
            Err(SettlementError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_paused_contract_rejected_without_mutation() {
        let stub = StubContract::new();
        stub.dev_set_paused(true);
        let svc = SettlementService::new(MintGateway::new(stub));
        let conn = db_with_account("0xaaa", 100);

        assert!(matches!(
            svc.instant_mint(&conn, "0xaaa", 80, "order-1"),
            Err(SettlementError::ContractPaused)
        ));

        let acct = accounts::get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 100);
        assert_eq!(acct.pending_mint_balance, 0);
        assert!(ledger_rows(&conn).is_empty());
    }

    #[test]
    fn test_gateway_failure_rolls_back_exactly() {
        let stub = StubContract::new();
        stub.dev_fail_calls(GatewayError::InsufficientGas("out of gas".to_string()));
        let svc = SettlementService::new(MintGateway::new(stub));
        let conn = db_with_account("0xaaa", 100);

        let err = svc
            .instant_mint(&conn, "0xaaa", 80, "order-1")
            .expect_err("must fail");
        assert!(matches!(
            err,
            SettlementError::RolledBack(GatewayError::InsufficientGas(_))
        ));

        // available is exactly at its pre-call value
        let acct = accounts::get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 100);
        assert_eq!(acct.pending_mint_balance, 0);

        let rows = ledger_rows(&conn);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, LedgerStatus::Failed);
        assert!(rows[0].transaction_hash.is_none());
    }

    #[test]
    fn test_get_pending_mints_lists_stranded_reservations() {
        let svc = service();
        let conn = db_with_account("0xaaa", 100);
        svc.reserve(&conn, "0xaaa", 40).expect("reserve");

        let pending = svc.get_pending_mints(&conn, 10).expect("pending");
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].address, "0xaaa");
        assert_eq!(pending[0].pending_mint_balance, 40);
    }

    #[test]
    fn test_reserve_cancel_round_trip_no_drift() {
        let svc = service();
        let conn = db_with_account("0xaaa", 100);

        svc.reserve(&conn, "0xaaa", 33).expect("reserve");
        assert!(svc.cancel_pending_mint(&conn, "0xaaa", 33).expect("cancel"));

        let acct = accounts::get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 100);
        assert_eq!(acct.pending_mint_balance, 0);
    }

    #[test]
    fn test_credit_creates_account_and_ledger_row() {
        let svc = service();
        let conn = perka_db::open_memory().expect("open");

        svc.credit(&conn, "0xnew", 25, "welcome bonus").expect("credit");

        let acct = accounts::get(&conn, "0xnew").expect("get");
        assert_eq!(acct.available_balance, 25);
        assert_eq!(acct.lifetime_earned, 25);

        let rows = ledger_rows(&conn);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, LedgerKind::Mint);
        assert_eq!(rows[0].status, LedgerStatus::Confirmed);
    }

    #[test]
    fn test_redeem_burns_and_records() {
        let svc = service();
        let conn = db_with_account("0xaaa", 100);
        // give the stub contract something to burn
        svc.gateway().mint("0xaaa", 100, "seed").expect("seed chain");

        let outcome = svc.redeem(&conn, "0xaaa", 60).expect("redeem");
        assert!(matches!(outcome, BurnOutcome::Burned(_)));

        let acct = accounts::get(&conn, "0xaaa").expect("get");
        assert_eq!(acct.available_balance, 40);
        assert_eq!(acct.lifetime_redeemed, 60);

        let rows = ledger_rows(&conn);
        let redeem_row = rows
            .iter()
            .find(|r| r.kind == LedgerKind::Redeem)
            .expect("redeem row");
        assert_eq!(redeem_row.status, LedgerStatus::Confirmed);
    }

    /// Contract whose `mint` drains the caller's reservation through a
    /// second connection before returning, standing in for a concurrent
    /// writer racing the in-flight chain call. Needs a file-backed
    /// database; in-memory databases are private to one connection.
    struct RacingContract {
        db_path: std::path::PathBuf,
        fail_mint: bool,
    }

    impl perka_gateway::TokenContract for RacingContract {
        fn capabilities(&self) -> perka_gateway::ContractCapabilities {
            perka_gateway::ContractCapabilities::full()
        }

        fn mint(
            &self,
            to: &str,
            amount: Amount,
            _reference: &str,
        ) -> perka_gateway::Result<perka_types::TxHash> {
            let racer = perka_db::open(&self.db_path).expect("open racing connection");
            accounts::cancel_pending(&racer, to, amount).expect("drain reservation");
            if self.fail_mint {
                Err(GatewayError::Unknown("nonce too low".to_string()))
            } else {
                Ok("0xcontested".to_string())
            }
        }

        fn burn_from(&self, _: &str, _: Amount) -> perka_gateway::Result<perka_types::TxHash> {
            Err(GatewayError::Unknown("not exercised".to_string()))
        }

        fn transfer(
            &self,
            _: &str,
            _: &str,
            _: Amount,
        ) -> perka_gateway::Result<perka_types::TxHash> {
            Err(GatewayError::Unknown("not exercised".to_string()))
        }

        fn balance_of(&self, _: &str) -> perka_gateway::Result<Option<u64>> {
            Ok(None)
        }

        fn paused(&self) -> perka_gateway::Result<bool> {
            Ok(false)
        }
    }

    fn scratch_db_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "perka-settlement-{tag}-{}-{}.db",
            std::process::id(),
            unix_now()
        ))
    }

    #[test]
    fn test_settled_mint_that_cannot_clear_pending_escalates() {
        let path = scratch_db_path("cleared");
        let conn = perka_db::open(&path).expect("open test db");
        accounts::credit(&conn, "0xaaa", 100).expect("seed account");

        let svc = SettlementService::new(MintGateway::new(RacingContract {
            db_path: path.clone(),
            fail_mint: false,
        }));

        // the mint succeeds on-chain, but the reservation is gone by the
        // time the pending balance is cleared
        let err = svc
            .instant_mint(&conn, "0xaaa", 80, "order-1")
            .expect_err("must escalate");
        match err {
            SettlementError::Unresolved { address, amount } => {
                assert_eq!(address, "0xaaa");
                assert_eq!(amount, 80);
            }
            other => panic!("unexpected error: {other}"),
        }

        // no ledger row claims the contested amount either way
        assert!(ledger_rows(&conn).is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_failed_mint_whose_rollback_cannot_apply_escalates() {
        let path = scratch_db_path("rollback");
        let conn = perka_db::open(&path).expect("open test db");
        accounts::credit(&conn, "0xaaa", 100).expect("seed account");

        let svc = SettlementService::new(MintGateway::new(RacingContract {
            db_path: path.clone(),
            fail_mint: true,
        }));

        // the gateway call fails AND the rollback finds nothing pending to
        // return: not a RolledBack, an escalation
        let err = svc
            .instant_mint(&conn, "0xaaa", 80, "order-1")
            .expect_err("must escalate");
        assert!(matches!(
            err,
            SettlementError::Unresolved { amount: 80, .. }
        ));
        assert!(ledger_rows(&conn).is_empty());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_redeem_cannot_spend_reserved_balance() {
        let svc = service();
        let conn = db_with_account("0xaaa", 100);
        svc.reserve(&conn, "0xaaa", 80).expect("reserve");

        let err = svc.redeem(&conn, "0xaaa", 50).expect_err("must reject");
        match err {
            SettlementError::InsufficientBalance { max_allowed, .. } => {
                assert_eq!(max_allowed, 20);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
