//! # Ledger Store
//!
//! Per-account, per-asset balance accounting plus the audit counters and
//! the vault-wide per-asset totals the capacity check aggregates over.
//!
//! Everything here is a pure state mutation: no external calls, no
//! valuation, no permission checks. The transaction protocol in `bank.rs`
//! decides *when* these mutations run and in what order relative to
//! external transfers; this module only guarantees the arithmetic
//! invariants:
//!
//! - A balance is never negative (`u128` plus explicit underflow checks).
//! - `totals[asset]` equals the sum of that asset's balance across all
//!   accounts.
//! - Counters move together with the balance mutation they describe, so a
//!   rolled-back operation leaves neither behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::asset::AssetId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during balance operations.
#[derive(Debug, Error)]
pub enum BalanceError {
    /// Attempted to debit more than the available balance.
    #[error(
        "insufficient balance: available {available}, requested {requested} (asset {asset})"
    )]
    InsufficientBalance {
        /// The asset that was being debited.
        asset: AssetId,
        /// The current balance.
        available: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// Arithmetic overflow during a credit operation.
    #[error("balance overflow: current {current}, credit {credit} (asset {asset})")]
    Overflow {
        /// The asset that was being credited.
        asset: AssetId,
        /// The current balance before the failed credit.
        current: u128,
        /// The amount that caused the overflow.
        credit: u128,
    },
}

// ---------------------------------------------------------------------------
// BalanceEntry
// ---------------------------------------------------------------------------

/// A single asset balance within an account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BalanceEntry {
    /// Balance in the asset's smallest unit.
    pub amount: u128,

    /// Timestamp of the last balance-modifying operation.
    pub last_updated: DateTime<Utc>,
}

impl BalanceEntry {
    fn zero() -> Self {
        Self {
            amount: 0,
            last_updated: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// AccountRecord
// ---------------------------------------------------------------------------

/// All ledger state for a single account: balances plus audit counters.
///
/// The counters are monotone over the account's lifetime as observed from
/// outside a transaction: they are bumped inside
/// [`credit`](LedgerBook::credit)/[`debit`](LedgerBook::debit) and undone
/// only by the rollback hooks of an aborting operation, so completed
/// history never loses a count.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Asset balances held by this account.
    #[serde(with = "crate::asset::asset_id_map")]
    balances: HashMap<AssetId, BalanceEntry>,

    /// Number of completed deposits.
    deposit_count: u64,

    /// Number of completed withdrawals.
    withdraw_count: u64,
}

// ---------------------------------------------------------------------------
// LedgerBook
// ---------------------------------------------------------------------------

/// The complete balance book of the vault.
///
/// Thread safety is handled at the [`Bank`](crate::bank::Bank) level -- a
/// `LedgerBook` is plain data.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerBook {
    /// Per-account records, keyed by principal address.
    accounts: HashMap<String, AccountRecord>,

    /// Vault-wide holdings per asset (sum over all accounts).
    #[serde(with = "crate::asset::asset_id_map")]
    totals: HashMap<AssetId, u128>,
}

impl LedgerBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` of `asset` to `account` and bumps its deposit
    /// counter. Returns the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Overflow`] if the account balance or the
    /// vault total would exceed `u128::MAX`. Nothing is mutated on error.
    pub fn credit(
        &mut self,
        account: &str,
        asset: AssetId,
        amount: u128,
    ) -> Result<u128, BalanceError> {
        let current = self.balance_of(account, asset);
        let new_balance = current.checked_add(amount).ok_or(BalanceError::Overflow {
            asset,
            current,
            credit: amount,
        })?;
        let current_total = self.total_held(asset);
        let new_total = current_total
            .checked_add(amount)
            .ok_or(BalanceError::Overflow {
                asset,
                current: current_total,
                credit: amount,
            })?;

        let record = self.accounts.entry(account.to_string()).or_default();
        let entry = record
            .balances
            .entry(asset)
            .or_insert_with(BalanceEntry::zero);
        entry.amount = new_balance;
        entry.last_updated = Utc::now();
        record.deposit_count += 1;
        self.totals.insert(asset, new_total);

        Ok(new_balance)
    }

    /// Debits `amount` of `asset` from `account` and bumps its withdraw
    /// counter. Returns the remaining balance.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::InsufficientBalance`] if `amount` exceeds
    /// the balance (an account that never held the asset has balance 0).
    /// Nothing is mutated on error.
    pub fn debit(
        &mut self,
        account: &str,
        asset: AssetId,
        amount: u128,
    ) -> Result<u128, BalanceError> {
        let available = self.balance_of(account, asset);
        if amount > available {
            return Err(BalanceError::InsufficientBalance {
                asset,
                available,
                requested: amount,
            });
        }

        let record = self.accounts.entry(account.to_string()).or_default();
        let entry = record
            .balances
            .entry(asset)
            .or_insert_with(BalanceEntry::zero);
        entry.amount = available - amount;
        entry.last_updated = Utc::now();
        record.withdraw_count += 1;
        let total = self.totals.entry(asset).or_insert(0);
        *total -= amount;

        Ok(available - amount)
    }

    /// Undoes a [`credit`](Self::credit): removes the amount and the
    /// deposit count it added. Only the aborting deposit path calls this.
    ///
    /// Subtraction saturates: if a reentrant withdrawal already moved part
    /// of the not-yet-delivered credit out, the rollback removes what is
    /// left rather than underflowing. The transfer adapter's contract is
    /// to not let that happen (funds it has not pulled must not be
    /// pushable), so the saturation is a backstop, not a feature.
    pub(crate) fn rollback_credit(&mut self, account: &str, asset: AssetId, amount: u128) {
        if let Some(record) = self.accounts.get_mut(account) {
            if let Some(entry) = record.balances.get_mut(&asset) {
                entry.amount = entry.amount.saturating_sub(amount);
                entry.last_updated = Utc::now();
            }
            record.deposit_count = record.deposit_count.saturating_sub(1);
        }
        if let Some(total) = self.totals.get_mut(&asset) {
            *total = total.saturating_sub(amount);
        }
    }

    /// Undoes a [`debit`](Self::debit): restores the amount and removes
    /// the withdraw count it added. Only the aborting withdraw path calls
    /// this.
    pub(crate) fn rollback_debit(&mut self, account: &str, asset: AssetId, amount: u128) {
        if let Some(record) = self.accounts.get_mut(account) {
            if let Some(entry) = record.balances.get_mut(&asset) {
                entry.amount = entry.amount.saturating_add(amount);
                entry.last_updated = Utc::now();
            }
            record.withdraw_count = record.withdraw_count.saturating_sub(1);
        }
        if let Some(total) = self.totals.get_mut(&asset) {
            *total = total.saturating_add(amount);
        }
    }

    /// Returns the balance of `asset` held by `account` (0 if never held).
    pub fn balance_of(&self, account: &str, asset: AssetId) -> u128 {
        self.accounts
            .get(account)
            .and_then(|r| r.balances.get(&asset))
            .map(|e| e.amount)
            .unwrap_or(0)
    }

    /// Returns `(deposit_count, withdraw_count)` for `account`.
    pub fn counters(&self, account: &str) -> (u64, u64) {
        self.accounts
            .get(account)
            .map(|r| (r.deposit_count, r.withdraw_count))
            .unwrap_or((0, 0))
    }

    /// Returns the vault-wide holdings of `asset` across all accounts.
    pub fn total_held(&self, asset: AssetId) -> u128 {
        self.totals.get(&asset).copied().unwrap_or(0)
    }

    /// Returns all non-zero balances of `account` as `(asset, amount)`
    /// pairs.
    pub fn all_balances(&self, account: &str) -> Vec<(AssetId, u128)> {
        self.accounts
            .get(account)
            .map(|r| {
                r.balances
                    .iter()
                    .filter(|(_, e)| e.amount > 0)
                    .map(|(id, e)| (*id, e.amount))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
