//! # Capacity & Limit Guard
//!
//! The two configurable ceilings and their check operations:
//!
//! - **Capacity** bounds the aggregate mark-to-market value of everything
//!   the vault holds, in the common denomination. Because the total is
//!   recomputed from live quotes on every check, the same deposit can pass
//!   at one price and fail at another. That volatility coupling is the
//!   point of mark-to-market accounting, not a bug.
//! - **Withdraw limit** bounds a single withdrawal, in the asset's own
//!   smallest unit. It is a flat ceiling, deliberately not
//!   value-converted (see DESIGN.md for the denomination decision).
//!
//! Both limits start unbounded and take effect immediately once an
//! operator lowers them; operations already completed are not revisited.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by limit checks.
#[derive(Debug, Error)]
pub enum GuardError {
    /// The operation would push aggregate value past the capacity limit.
    #[error("capacity exceeded: limit {limit}, attempted total {attempted}")]
    CapacityExceeded {
        /// The configured capacity, in common denomination.
        limit: u128,
        /// The aggregate value the operation would have produced.
        attempted: u128,
    },

    /// A single withdrawal larger than the per-operation ceiling.
    #[error("withdraw limit exceeded: limit {limit}, requested {requested}")]
    WithdrawLimitExceeded {
        /// The configured per-withdrawal ceiling, in asset units.
        limit: u128,
        /// The requested withdrawal amount.
        requested: u128,
    },
}

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// The vault's two ceilings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Limits {
    capacity: u128,
    withdraw_limit: u128,
}

impl Limits {
    /// Creates limits with both ceilings at `u128::MAX`, i.e. effectively
    /// disabled until an operator configures them.
    pub fn unbounded() -> Self {
        Self {
            capacity: u128::MAX,
            withdraw_limit: u128::MAX,
        }
    }

    /// Returns the capacity ceiling (common denomination).
    pub fn capacity(&self) -> u128 {
        self.capacity
    }

    /// Returns the per-withdrawal ceiling (asset units).
    pub fn withdraw_limit(&self) -> u128 {
        self.withdraw_limit
    }

    /// Replaces the capacity ceiling. Effective immediately.
    pub fn set_capacity(&mut self, capacity: u128) {
        self.capacity = capacity;
    }

    /// Replaces the per-withdrawal ceiling. Effective immediately.
    pub fn set_withdraw_limit(&mut self, withdraw_limit: u128) {
        self.withdraw_limit = withdraw_limit;
    }

    /// Fails unless `current_total + incoming` stays within capacity.
    ///
    /// A sum that overflows `u128` exceeds any representable capacity and
    /// is reported against `u128::MAX`.
    pub fn check_capacity(&self, current_total: u128, incoming: u128) -> Result<(), GuardError> {
        match current_total.checked_add(incoming) {
            Some(attempted) if attempted <= self.capacity => Ok(()),
            Some(attempted) => Err(GuardError::CapacityExceeded {
                limit: self.capacity,
                attempted,
            }),
            None => Err(GuardError::CapacityExceeded {
                limit: self.capacity,
                attempted: u128::MAX,
            }),
        }
    }

    /// Fails if a single withdrawal of `amount` exceeds the ceiling.
    pub fn check_withdraw(&self, amount: u128) -> Result<(), GuardError> {
        if amount > self.withdraw_limit {
            return Err(GuardError::WithdrawLimitExceeded {
                limit: self.withdraw_limit,
                requested: amount,
            });
        }
        Ok(())
    }
}

impl Default for Limits {
    fn default() -> Self {
        Self::unbounded()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
