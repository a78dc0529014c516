//! # Bank -- Transaction Protocol
//!
//! The orchestrator that ties the permission gate, registry, valuation
//! engine, ledger store and limit guard into the two public money-moving
//! operations, [`deposit`](Bank::deposit) and [`withdraw`](Bank::withdraw),
//! plus the permissioned administrative surface and the read-only query
//! surface.
//!
//! ## Ordering discipline
//!
//! Both operations follow checks-effects-interactions: every validation
//! and every ledger mutation completes **before** the external transfer
//! call runs, and the state lock is released before that call. The
//! consequences:
//!
//! - A transfer adapter that re-enters the bank mid-call sees the already
//!   mutated ledger. A reentrant double-withdrawal finds the balance
//!   already debited and dies with `InsufficientBalance`; no second exit
//!   of the same funds is possible.
//! - A transfer adapter that hangs cannot freeze the ledger behind a held
//!   lock. Ordering, not mutual exclusion, is the reentrancy defense.
//! - If the transfer call fails, the enclosing operation rolls its ledger
//!   mutation back and fails as a whole. A failed call leaves no trace.
//!
//! ## Atomicity
//!
//! Every error is a whole-operation abort. There is no partial
//! application, no internal retry, and no "recoverable" tier: a rejected
//! operation simply never happened as far as the ledger is concerned.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::access::{AccessControl, AccessError, Role};
use crate::asset::{AssetId, PriceSourceId};
use crate::events::{Notification, NotificationSink};
use crate::guard::{GuardError, Limits};
use crate::ledger::{BalanceError, LedgerBook};
use crate::oracle::{AssetMetadata, PriceOracle};
use crate::registry::{AssetRegistry, RegistryError};
use crate::transfer::{TransferAgent, TransferError};
use crate::valuation::{ValuationError, Valuer};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can abort a bank operation.
///
/// Component failures are wrapped; protocol-level failures are flat
/// variants. Every variant means "nothing happened".
#[derive(Debug, Error)]
pub enum BankError {
    /// A role check failed.
    #[error("access error: {0}")]
    Access(#[from] AccessError),

    /// A registry operation failed (lookup miss or registry full).
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Valuation failed (missing asset, bad price, overflow).
    #[error("valuation error: {0}")]
    Valuation(#[from] ValuationError),

    /// A ledger balance operation failed.
    #[error("balance error: {0}")]
    Balance(#[from] BalanceError),

    /// A capacity or withdraw-limit check failed.
    #[error("limit error: {0}")]
    Guard(#[from] GuardError),

    /// Zero-amount deposit.
    #[error("nothing to deposit: amount must be positive")]
    NothingToDeposit,

    /// Zero-amount withdrawal.
    #[error("nothing to withdraw: amount must be positive")]
    NothingToWithdraw,

    /// The external transfer call failed; the operation was rolled back.
    #[error("external transfer failed: {0}")]
    FailedTransfer(#[from] TransferError),

    /// Inbound value arrived outside of a deposit. The ledger never
    /// accounts for such funds, so they are rejected outright.
    #[error("unsolicited direct transfer rejected")]
    InvalidDirectTransfer,
}

// ---------------------------------------------------------------------------
// Bank
// ---------------------------------------------------------------------------

/// The bank's complete mutable state.
///
/// Fully serializable, so a storage layer can persist the vault as a
/// single blob via [`Bank::snapshot`] and rebuild it with fresh
/// capability wiring via [`Bank::from_snapshot`]. The capability trait
/// objects live outside it on [`Bank`].
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BankState {
    access: AccessControl,
    registry: AssetRegistry,
    book: LedgerBook,
    limits: Limits,
}

/// The custodial bank.
///
/// One logical operation runs at a time: all state lives behind a single
/// mutex, and the guard is always dropped before an external transfer
/// call, so the only interleaving an adapter can force is a clean
/// re-entry between mutation and transfer -- exactly the window the
/// ordering discipline is designed for.
pub struct Bank {
    oracle: Arc<dyn PriceOracle>,
    metadata: Arc<dyn AssetMetadata>,
    transfers: Arc<dyn TransferAgent>,
    sink: Option<Arc<dyn NotificationSink>>,
    state: Mutex<BankState>,
}

impl Bank {
    /// Creates a bank with the founding principal holding both roles,
    /// an empty registry and book, and both limits unbounded.
    pub fn new(
        founder: &str,
        oracle: Arc<dyn PriceOracle>,
        metadata: Arc<dyn AssetMetadata>,
        transfers: Arc<dyn TransferAgent>,
    ) -> Self {
        info!(founder = %founder, "bank created");
        Self {
            oracle,
            metadata,
            transfers,
            sink: None,
            state: Mutex::new(BankState {
                access: AccessControl::new(founder),
                registry: AssetRegistry::new(),
                book: LedgerBook::new(),
                limits: Limits::unbounded(),
            }),
        }
    }

    /// Attaches a notification sink. Builder-style, consumed at setup.
    pub fn with_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns a copy of the bank's entire mutable state, for persistence.
    pub fn snapshot(&self) -> BankState {
        self.state.lock().clone()
    }

    /// Rebuilds a bank from a previously taken [`snapshot`](Self::snapshot),
    /// wired to the given capabilities. No sink is attached; chain
    /// [`with_sink`](Self::with_sink) if one is wanted.
    pub fn from_snapshot(
        snapshot: BankState,
        oracle: Arc<dyn PriceOracle>,
        metadata: Arc<dyn AssetMetadata>,
        transfers: Arc<dyn TransferAgent>,
    ) -> Self {
        info!("bank restored from snapshot");
        Self {
            oracle,
            metadata,
            transfers,
            sink: None,
            state: Mutex::new(snapshot),
        }
    }

    fn emit(&self, event: Notification) {
        if let Some(sink) = &self.sink {
            sink.notify(&event);
        }
    }

    // -----------------------------------------------------------------------
    // Transaction protocol
    // -----------------------------------------------------------------------

    /// Deposits `amount` of `asset` for `user`.
    ///
    /// Sequence: validate, capacity-check against live prices, credit the
    /// ledger, then pull the funds in via the transfer adapter. The credit
    /// lands before the pull so a re-entrant call during the pull observes
    /// it; if the pull fails, the credit (and the deposit counter) is
    /// rolled back and the whole operation fails [`BankError::FailedTransfer`].
    ///
    /// Returns the user's new balance of `asset`.
    pub fn deposit(&self, user: &str, asset: AssetId, amount: u128) -> Result<u128, BankError> {
        if amount == 0 {
            return Err(BankError::NothingToDeposit);
        }

        let new_balance = {
            let mut st = self.state.lock();
            let (incoming, current) = {
                let valuer = Valuer::new(&st.registry, &*self.oracle, &*self.metadata);
                let incoming = valuer.value_of(asset, amount)?;
                let current = valuer.total_value(&st.book)?;
                (incoming, current)
            };
            debug!(
                user = %user,
                asset = %asset,
                amount,
                incoming_value = incoming,
                current_value = current,
                "capacity check"
            );
            st.limits.check_capacity(current, incoming)?;
            st.book.credit(user, asset, amount)?
        };

        // Lock released: the pull may re-enter, and a stuck adapter can't
        // wedge the ledger.
        if let Err(err) = self.transfers.pull_from(user, asset, amount) {
            let mut st = self.state.lock();
            st.book.rollback_credit(user, asset, amount);
            warn!(user = %user, asset = %asset, amount, error = %err, "inbound transfer failed, deposit rolled back");
            return Err(BankError::FailedTransfer(err));
        }

        info!(user = %user, asset = %asset, amount, balance = new_balance, "deposit complete");
        self.emit(Notification::Deposited {
            user: user.to_string(),
            asset,
            amount,
        });
        Ok(new_balance)
    }

    /// Withdraws `amount` of `asset` for `user`.
    ///
    /// Sequence: validate, balance-check, limit-check, debit the ledger,
    /// then push the funds out via the transfer adapter. The debit lands
    /// before the push, which is the reentrancy defense: a nested
    /// withdrawal of the same balance fails `InsufficientBalance`. If the
    /// push fails, the debit (and the withdraw counter) is rolled back and
    /// the operation fails [`BankError::FailedTransfer`].
    ///
    /// Returns the user's remaining balance of `asset`.
    pub fn withdraw(&self, user: &str, asset: AssetId, amount: u128) -> Result<u128, BankError> {
        if amount == 0 {
            return Err(BankError::NothingToWithdraw);
        }

        let remaining = {
            let mut st = self.state.lock();
            let available = st.book.balance_of(user, asset);
            if amount > available {
                return Err(BalanceError::InsufficientBalance {
                    asset,
                    available,
                    requested: amount,
                }
                .into());
            }
            st.limits.check_withdraw(amount)?;
            st.book.debit(user, asset, amount)?
        };

        if let Err(err) = self.transfers.push_to(user, asset, amount) {
            let mut st = self.state.lock();
            st.book.rollback_debit(user, asset, amount);
            warn!(user = %user, asset = %asset, amount, error = %err, "outbound transfer failed, withdrawal rolled back");
            return Err(BankError::FailedTransfer(err));
        }

        info!(user = %user, asset = %asset, amount, balance = remaining, "withdrawal complete");
        self.emit(Notification::Withdrew {
            user: user.to_string(),
            asset,
            amount,
        });
        Ok(remaining)
    }

    /// Rejects inbound value that arrived outside [`deposit`](Self::deposit).
    ///
    /// Transfer integrations call this when value is pushed at the vault
    /// unsolicited. It always fails: crediting such funds would create
    /// value the ledger never accounted for.
    pub fn receive_direct_transfer(
        &self,
        from: &str,
        asset: AssetId,
        amount: u128,
    ) -> Result<(), BankError> {
        warn!(from = %from, asset = %asset, amount, "unsolicited direct transfer rejected");
        Err(BankError::InvalidDirectTransfer)
    }

    // -----------------------------------------------------------------------
    // Administrative surface (permissioned)
    // -----------------------------------------------------------------------

    /// Lists an asset, or re-points an existing one at a new price source.
    /// Operator only.
    pub fn register_asset(
        &self,
        caller: &str,
        asset: AssetId,
        source: PriceSourceId,
    ) -> Result<(), BankError> {
        let newly_listed = {
            let mut st = self.state.lock();
            st.access.require(caller, Role::Operator)?;
            st.registry.register(asset, source)?
        };

        info!(operator = %caller, asset = %asset, source = %source, newly_listed, "asset configured");
        self.emit(Notification::AssetConfigured {
            operator: caller.to_string(),
            asset,
            price_source: source,
        });
        Ok(())
    }

    /// Replaces the capacity ceiling. Operator only, effective immediately.
    pub fn set_capacity(&self, caller: &str, capacity: u128) -> Result<(), BankError> {
        {
            let mut st = self.state.lock();
            st.access.require(caller, Role::Operator)?;
            st.limits.set_capacity(capacity);
        }

        info!(operator = %caller, capacity, "capacity changed");
        self.emit(Notification::CapacityChanged {
            operator: caller.to_string(),
            capacity,
        });
        Ok(())
    }

    /// Replaces the per-withdrawal ceiling. Operator only, effective
    /// immediately.
    pub fn set_withdraw_limit(&self, caller: &str, withdraw_limit: u128) -> Result<(), BankError> {
        {
            let mut st = self.state.lock();
            st.access.require(caller, Role::Operator)?;
            st.limits.set_withdraw_limit(withdraw_limit);
        }

        info!(operator = %caller, withdraw_limit, "withdraw limit changed");
        self.emit(Notification::WithdrawLimitChanged {
            operator: caller.to_string(),
            withdraw_limit,
        });
        Ok(())
    }

    /// Grants a role. Administrator only.
    pub fn grant_role(&self, caller: &str, principal: &str, role: Role) -> Result<(), BankError> {
        self.state.lock().access.grant(caller, principal, role)?;
        info!(admin = %caller, principal = %principal, role = %role, "role granted");
        Ok(())
    }

    /// Revokes a role. Administrator only.
    pub fn revoke_role(&self, caller: &str, principal: &str, role: Role) -> Result<(), BankError> {
        self.state.lock().access.revoke(caller, principal, role)?;
        info!(admin = %caller, principal = %principal, role = %role, "role revoked");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Query surface (read-only)
    // -----------------------------------------------------------------------

    /// Returns `user`'s balance of `asset` (0 if never held).
    pub fn balance_of(&self, user: &str, asset: AssetId) -> u128 {
        self.state.lock().book.balance_of(user, asset)
    }

    /// Returns `(deposit_count, withdraw_count)` for `user`.
    pub fn counters(&self, user: &str) -> (u64, u64) {
        self.state.lock().book.counters(user)
    }

    /// Returns the current capacity ceiling (common denomination).
    pub fn capacity_limit(&self) -> u128 {
        self.state.lock().limits.capacity()
    }

    /// Returns the current per-withdrawal ceiling (asset units).
    pub fn withdraw_limit(&self) -> u128 {
        self.state.lock().limits.withdraw_limit()
    }

    /// Returns the listed assets in registration order.
    pub fn registered_assets(&self) -> Vec<AssetId> {
        self.state.lock().registry.assets().to_vec()
    }

    /// Values `amount` of `asset` at current prices.
    pub fn value_of(&self, asset: AssetId, amount: u128) -> Result<u128, BankError> {
        let st = self.state.lock();
        let valuer = Valuer::new(&st.registry, &*self.oracle, &*self.metadata);
        Ok(valuer.value_of(asset, amount)?)
    }

    /// Values the vault's entire holdings at current prices.
    pub fn total_value(&self) -> Result<u128, BankError> {
        let st = self.state.lock();
        let valuer = Valuer::new(&st.registry, &*self.oracle, &*self.metadata);
        Ok(valuer.total_value(&st.book)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::PriceQuote;
    use parking_lot::Mutex as PlMutex;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};

    const FOUNDER: &str = "custodia:founder";
    const ALICE: &str = "custodia:alice";
    const UNIT: u128 = 1_000_000_000_000_000_000; // 10^18

    // -- fakes --------------------------------------------------------------

    #[derive(Default)]
    struct FakeOracle {
        quotes: PlMutex<HashMap<PriceSourceId, PriceQuote>>,
    }

    impl FakeOracle {
        fn set(&self, source: PriceSourceId, price: i128, decimals: u8) {
            self.quotes
                .lock()
                .insert(source, PriceQuote::new(price, decimals));
        }
    }

    impl PriceOracle for FakeOracle {
        fn latest_price(&self, source: PriceSourceId) -> PriceQuote {
            self.quotes
                .lock()
                .get(&source)
                .copied()
                .unwrap_or(PriceQuote::new(0, 0))
        }
    }

    #[derive(Default)]
    struct FakeMetadata {
        decimals: PlMutex<HashMap<AssetId, u8>>,
    }

    impl FakeMetadata {
        fn set(&self, asset: AssetId, decimals: u8) {
            self.decimals.lock().insert(asset, decimals);
        }
    }

    impl AssetMetadata for FakeMetadata {
        fn decimals(&self, asset: AssetId) -> u8 {
            self.decimals.lock().get(&asset).copied().unwrap_or(18)
        }
    }

    /// Adapter that succeeds or fails on demand and, when armed with a
    /// bank handle, re-enters `withdraw` from inside `push_to`.
    #[derive(Default)]
    struct FakeTransfers {
        fail_pull: AtomicBool,
        fail_push: AtomicBool,
        reenter_bank: PlMutex<Option<Arc<Bank>>>,
        reentry_result: PlMutex<Option<Result<u128, BankError>>>,
    }

    impl TransferAgent for FakeTransfers {
        fn pull_from(&self, _user: &str, _asset: AssetId, _amount: u128) -> Result<(), TransferError> {
            if self.fail_pull.load(Ordering::SeqCst) {
                return Err(TransferError("pull refused".into()));
            }
            Ok(())
        }

        fn push_to(&self, user: &str, asset: AssetId, amount: u128) -> Result<(), TransferError> {
            // take() so the nested call doesn't recurse again.
            let armed = self.reenter_bank.lock().take();
            if let Some(bank) = armed {
                let nested = bank.withdraw(user, asset, amount);
                *self.reentry_result.lock() = Some(nested);
            }
            if self.fail_push.load(Ordering::SeqCst) {
                return Err(TransferError("push refused".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: PlMutex<Vec<Notification>>,
    }

    impl NotificationSink for RecordingSink {
        fn notify(&self, event: &Notification) {
            self.events.lock().push(event.clone());
        }
    }

    // -- fixture ------------------------------------------------------------

    struct Fixture {
        bank: Arc<Bank>,
        oracle: Arc<FakeOracle>,
        transfers: Arc<FakeTransfers>,
        sink: Arc<RecordingSink>,
    }

    fn native_source() -> PriceSourceId {
        PriceSourceId::derive("feed:native-usd")
    }

    /// Bank with the native asset registered at 2,000.00000000 per unit
    /// (8 feed decimals) and no limits configured.
    fn fixture() -> Fixture {
        let oracle = Arc::new(FakeOracle::default());
        let metadata = Arc::new(FakeMetadata::default());
        let transfers = Arc::new(FakeTransfers::default());
        let sink = Arc::new(RecordingSink::default());

        oracle.set(native_source(), 200_000_000_000, 8);

        let bank = Arc::new(
            Bank::new(
                FOUNDER,
                oracle.clone(),
                metadata.clone(),
                transfers.clone(),
            )
            .with_sink(sink.clone()),
        );
        bank.register_asset(FOUNDER, AssetId::NATIVE, native_source())
            .unwrap();

        Fixture {
            bank,
            oracle,
            transfers,
            sink,
        }
    }

    // -- deposits -----------------------------------------------------------

    #[test]
    fn deposit_credits_and_notifies() {
        let fx = fixture();
        let balance = fx.bank.deposit(ALICE, AssetId::NATIVE, 5 * UNIT).unwrap();

        assert_eq!(balance, 5 * UNIT);
        assert_eq!(fx.bank.balance_of(ALICE, AssetId::NATIVE), 5 * UNIT);
        assert_eq!(fx.bank.counters(ALICE), (1, 0));
        assert!(fx.sink.events.lock().contains(&Notification::Deposited {
            user: ALICE.to_string(),
            asset: AssetId::NATIVE,
            amount: 5 * UNIT,
        }));
    }

    #[test]
    fn zero_deposit_rejected() {
        let fx = fixture();
        let result = fx.bank.deposit(ALICE, AssetId::NATIVE, 0);
        assert!(matches!(result, Err(BankError::NothingToDeposit)));
        assert_eq!(fx.bank.counters(ALICE), (0, 0));
    }

    #[test]
    fn deposit_of_unregistered_asset_rejected() {
        let fx = fixture();
        let ghost = AssetId::derive("GHOST", "custodia:nobody");
        let result = fx.bank.deposit(ALICE, ghost, UNIT);
        assert!(matches!(
            result,
            Err(BankError::Valuation(ValuationError::Registry(
                RegistryError::AssetNotRegistered(_)
            )))
        ));
    }

    #[test]
    fn failed_pull_rolls_the_deposit_back() {
        let fx = fixture();
        fx.transfers.fail_pull.store(true, Ordering::SeqCst);

        let result = fx.bank.deposit(ALICE, AssetId::NATIVE, 5 * UNIT);
        assert!(matches!(result, Err(BankError::FailedTransfer(_))));
        assert_eq!(fx.bank.balance_of(ALICE, AssetId::NATIVE), 0);
        assert_eq!(fx.bank.counters(ALICE), (0, 0));
        assert_eq!(fx.bank.total_value().unwrap(), 0);
        assert!(fx.sink.events.lock().iter().all(|e| !matches!(e, Notification::Deposited { .. })));
    }

    // -- capacity -----------------------------------------------------------

    #[test]
    fn capacity_scenario_from_the_design() {
        let fx = fixture();
        fx.bank.set_capacity(FOUNDER, 50_000 * UNIT).unwrap();

        // 20 units at 2,000 -> 40,000: fits.
        fx.bank.deposit(ALICE, AssetId::NATIVE, 20 * UNIT).unwrap();
        assert_eq!(fx.bank.total_value().unwrap(), 40_000 * UNIT);

        // 6 more units -> 52,000: exceeds 50,000.
        let result = fx.bank.deposit(ALICE, AssetId::NATIVE, 6 * UNIT);
        assert!(matches!(
            result,
            Err(BankError::Guard(GuardError::CapacityExceeded { .. }))
        ));
        assert_eq!(fx.bank.balance_of(ALICE, AssetId::NATIVE), 20 * UNIT);
        assert_eq!(fx.bank.counters(ALICE), (1, 0));
    }

    #[test]
    fn price_move_flips_the_capacity_outcome() {
        let fx = fixture();
        fx.bank.set_capacity(FOUNDER, 50_000 * UNIT).unwrap();

        // At 2,000/unit a 20-unit deposit passes.
        fx.bank.deposit(ALICE, AssetId::NATIVE, 20 * UNIT).unwrap();

        // The price triples: the held 20 units alone are now worth
        // 120,000, so even one more wei of native is over capacity.
        fx.oracle.set(native_source(), 600_000_000_000, 8);
        let result = fx.bank.deposit(ALICE, AssetId::NATIVE, 1);
        assert!(matches!(
            result,
            Err(BankError::Guard(GuardError::CapacityExceeded { .. }))
        ));

        // Price falls back: the identical deposit passes again.
        fx.oracle.set(native_source(), 200_000_000_000, 8);
        fx.bank.deposit(ALICE, AssetId::NATIVE, 1).unwrap();
    }

    #[test]
    fn dead_feed_blocks_deposits_of_that_asset() {
        let fx = fixture();
        fx.oracle.set(native_source(), 0, 8);

        let result = fx.bank.deposit(ALICE, AssetId::NATIVE, UNIT);
        assert!(matches!(
            result,
            Err(BankError::Valuation(ValuationError::InvalidPrice {
                price: 0,
                ..
            }))
        ));
        assert_eq!(fx.bank.balance_of(ALICE, AssetId::NATIVE), 0);
    }

    // -- withdrawals --------------------------------------------------------

    #[test]
    fn withdraw_debits_and_notifies() {
        let fx = fixture();
        fx.bank.deposit(ALICE, AssetId::NATIVE, 5 * UNIT).unwrap();

        let remaining = fx.bank.withdraw(ALICE, AssetId::NATIVE, 2 * UNIT).unwrap();
        assert_eq!(remaining, 3 * UNIT);
        assert_eq!(fx.bank.counters(ALICE), (1, 1));
        assert!(fx.sink.events.lock().contains(&Notification::Withdrew {
            user: ALICE.to_string(),
            asset: AssetId::NATIVE,
            amount: 2 * UNIT,
        }));
    }

    #[test]
    fn zero_withdrawal_rejected() {
        let fx = fixture();
        let result = fx.bank.withdraw(ALICE, AssetId::NATIVE, 0);
        assert!(matches!(result, Err(BankError::NothingToWithdraw)));
    }

    #[test]
    fn overdraw_rejected_without_mutation() {
        let fx = fixture();
        fx.bank.deposit(ALICE, AssetId::NATIVE, UNIT).unwrap();

        let result = fx.bank.withdraw(ALICE, AssetId::NATIVE, 2 * UNIT);
        assert!(matches!(
            result,
            Err(BankError::Balance(BalanceError::InsufficientBalance { .. }))
        ));
        assert_eq!(fx.bank.balance_of(ALICE, AssetId::NATIVE), UNIT);
        assert_eq!(fx.bank.counters(ALICE), (1, 0));
    }

    #[test]
    fn withdraw_limit_scenario_from_the_design() {
        let fx = fixture();
        fx.bank.deposit(ALICE, AssetId::NATIVE, 100).unwrap();
        fx.bank.set_withdraw_limit(FOUNDER, 10).unwrap();

        let result = fx.bank.withdraw(ALICE, AssetId::NATIVE, 15);
        assert!(matches!(
            result,
            Err(BankError::Guard(GuardError::WithdrawLimitExceeded {
                limit: 10,
                requested: 15,
            }))
        ));
        assert_eq!(fx.bank.balance_of(ALICE, AssetId::NATIVE), 100);
        assert_eq!(fx.bank.counters(ALICE), (1, 0));

        // At the limit exactly, the withdrawal passes.
        fx.bank.withdraw(ALICE, AssetId::NATIVE, 10).unwrap();
    }

    #[test]
    fn balance_check_precedes_limit_check() {
        let fx = fixture();
        fx.bank.set_withdraw_limit(FOUNDER, 10).unwrap();

        // 15 exceeds both the balance (0) and the limit (10); the
        // protocol reports the balance failure.
        let result = fx.bank.withdraw(ALICE, AssetId::NATIVE, 15);
        assert!(matches!(
            result,
            Err(BankError::Balance(BalanceError::InsufficientBalance { .. }))
        ));
    }

    #[test]
    fn failed_push_rolls_the_withdrawal_back() {
        let fx = fixture();
        fx.bank.deposit(ALICE, AssetId::NATIVE, 5 * UNIT).unwrap();
        fx.transfers.fail_push.store(true, Ordering::SeqCst);

        let result = fx.bank.withdraw(ALICE, AssetId::NATIVE, 2 * UNIT);
        assert!(matches!(result, Err(BankError::FailedTransfer(_))));
        assert_eq!(fx.bank.balance_of(ALICE, AssetId::NATIVE), 5 * UNIT);
        assert_eq!(fx.bank.counters(ALICE), (1, 0));
    }

    #[test]
    fn reentrant_withdrawal_finds_the_balance_already_debited() {
        let fx = fixture();
        fx.bank.deposit(ALICE, AssetId::NATIVE, 100).unwrap();

        // Arm the adapter: during push_to of the first withdrawal it will
        // re-enter withdraw() with the same amount.
        *fx.transfers.reenter_bank.lock() = Some(fx.bank.clone());

        let remaining = fx.bank.withdraw(ALICE, AssetId::NATIVE, 60).unwrap();
        assert_eq!(remaining, 40);

        // The nested attempt saw the post-debit balance of 40 and failed.
        let nested = fx.transfers.reentry_result.lock().take().unwrap();
        assert!(matches!(
            nested,
            Err(BankError::Balance(BalanceError::InsufficientBalance {
                available: 40,
                requested: 60,
                ..
            }))
        ));

        // Exactly one withdrawal happened.
        assert_eq!(fx.bank.balance_of(ALICE, AssetId::NATIVE), 40);
        assert_eq!(fx.bank.counters(ALICE), (1, 1));
    }

    #[test]
    fn round_trip_restores_balance_and_bumps_both_counters() {
        let fx = fixture();
        fx.bank.deposit(ALICE, AssetId::NATIVE, 7 * UNIT).unwrap();
        fx.bank.withdraw(ALICE, AssetId::NATIVE, 7 * UNIT).unwrap();

        assert_eq!(fx.bank.balance_of(ALICE, AssetId::NATIVE), 0);
        assert_eq!(fx.bank.counters(ALICE), (1, 1));
        assert_eq!(fx.bank.total_value().unwrap(), 0);
    }

    // -- unsolicited transfers ----------------------------------------------

    #[test]
    fn unsolicited_inbound_value_is_rejected() {
        let fx = fixture();
        let result = fx
            .bank
            .receive_direct_transfer(ALICE, AssetId::NATIVE, UNIT);
        assert!(matches!(result, Err(BankError::InvalidDirectTransfer)));
        assert_eq!(fx.bank.total_value().unwrap(), 0);
    }

    // -- administrative surface ---------------------------------------------

    #[test]
    fn non_operator_cannot_administer() {
        let fx = fixture();

        assert!(matches!(
            fx.bank
                .register_asset(ALICE, AssetId::NATIVE, native_source()),
            Err(BankError::Access(AccessError::Unauthorized { .. }))
        ));
        assert!(matches!(
            fx.bank.set_capacity(ALICE, 1),
            Err(BankError::Access(AccessError::Unauthorized { .. }))
        ));
        assert!(matches!(
            fx.bank.set_withdraw_limit(ALICE, 1),
            Err(BankError::Access(AccessError::Unauthorized { .. }))
        ));
    }

    #[test]
    fn granted_operator_can_administer() {
        let fx = fixture();
        fx.bank.grant_role(FOUNDER, ALICE, Role::Operator).unwrap();

        fx.bank.set_capacity(ALICE, 9 * UNIT).unwrap();
        assert_eq!(fx.bank.capacity_limit(), 9 * UNIT);

        fx.bank.revoke_role(FOUNDER, ALICE, Role::Operator).unwrap();
        assert!(fx.bank.set_capacity(ALICE, UNIT).is_err());
    }

    #[test]
    fn registry_bound_is_enforced_through_the_bank() {
        let fx = fixture();
        // The native asset occupies one slot already.
        for n in 1..crate::config::MAX_REGISTERED_ASSETS {
            let asset = AssetId::derive(&format!("TKN{n}"), "custodia:issuer");
            fx.bank
                .register_asset(FOUNDER, asset, PriceSourceId::derive(&format!("feed-{n}")))
                .unwrap();
        }

        let overflow = AssetId::derive("ONE-TOO-MANY", "custodia:issuer");
        let result = fx
            .bank
            .register_asset(FOUNDER, overflow, PriceSourceId::derive("feed-overflow"));
        assert!(matches!(
            result,
            Err(BankError::Registry(RegistryError::CapacityExceeded { .. }))
        ));
        assert_eq!(
            fx.bank.registered_assets().len(),
            crate::config::MAX_REGISTERED_ASSETS
        );
    }

    #[test]
    fn limit_changes_are_notified() {
        let fx = fixture();
        fx.bank.set_capacity(FOUNDER, 123).unwrap();
        fx.bank.set_withdraw_limit(FOUNDER, 45).unwrap();

        let events = fx.sink.events.lock();
        assert!(events.contains(&Notification::CapacityChanged {
            operator: FOUNDER.to_string(),
            capacity: 123,
        }));
        assert!(events.contains(&Notification::WithdrawLimitChanged {
            operator: FOUNDER.to_string(),
            withdraw_limit: 45,
        }));
    }

    // -- query surface ------------------------------------------------------

    #[test]
    fn value_queries_match_the_fixture_prices() {
        let fx = fixture();
        assert_eq!(
            fx.bank.value_of(AssetId::NATIVE, 3 * UNIT).unwrap(),
            6_000 * UNIT
        );

        fx.bank.deposit(ALICE, AssetId::NATIVE, 3 * UNIT).unwrap();
        assert_eq!(fx.bank.total_value().unwrap(), 6_000 * UNIT);
    }

    #[test]
    fn default_limits_are_unbounded() {
        let fx = fixture();
        assert_eq!(fx.bank.capacity_limit(), u128::MAX);
        assert_eq!(fx.bank.withdraw_limit(), u128::MAX);
    }

    // -- persistence --------------------------------------------------------

    #[test]
    fn snapshot_roundtrip_preserves_state() {
        let fx = fixture();
        fx.bank.set_capacity(FOUNDER, 50_000 * UNIT).unwrap();
        fx.bank.set_withdraw_limit(FOUNDER, 10 * UNIT).unwrap();
        fx.bank.deposit(ALICE, AssetId::NATIVE, 3 * UNIT).unwrap();

        let json = serde_json::to_string(&fx.bank.snapshot()).expect("serialize");
        let recovered: BankState = serde_json::from_str(&json).expect("deserialize");

        let oracle = Arc::new(FakeOracle::default());
        oracle.set(native_source(), 200_000_000_000, 8);
        let restored = Bank::from_snapshot(
            recovered,
            oracle,
            Arc::new(FakeMetadata::default()),
            Arc::new(FakeTransfers::default()),
        );

        assert_eq!(restored.balance_of(ALICE, AssetId::NATIVE), 3 * UNIT);
        assert_eq!(restored.counters(ALICE), (1, 0));
        assert_eq!(restored.capacity_limit(), 50_000 * UNIT);
        assert_eq!(restored.withdraw_limit(), 10 * UNIT);
        assert_eq!(restored.registered_assets(), vec![AssetId::NATIVE]);

        // Roles survive the round trip: the founder still operates, and
        // the restored book keeps moving money.
        restored.set_withdraw_limit(FOUNDER, 5 * UNIT).unwrap();
        restored.withdraw(ALICE, AssetId::NATIVE, UNIT).unwrap();
        assert_eq!(restored.balance_of(ALICE, AssetId::NATIVE), 2 * UNIT);
    }
}
