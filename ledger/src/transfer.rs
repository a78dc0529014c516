//! # External Transfer Capability
//!
//! Actual value movement happens outside the ledger: an adapter pulls
//! deposited funds in from the depositor and pushes withdrawn funds out
//! to the recipient. The ledger only orchestrates.
//!
//! Both calls hand control to untrusted code that may synchronously
//! re-enter the [`Bank`](crate::bank::Bank) before returning. The
//! transaction protocol tolerates that by mutating ledger state strictly
//! before either call runs; see `bank.rs` for the ordering discipline.

use thiserror::Error;

use crate::asset::AssetId;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An external transfer call failed.
///
/// The message is whatever diagnostic the adapter produced; the ledger
/// treats any failure identically (whole-operation abort).
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransferError(pub String);

// ---------------------------------------------------------------------------
// TransferAgent
// ---------------------------------------------------------------------------

/// External value movement, both directions.
pub trait TransferAgent: Send + Sync {
    /// Pulls `amount` of `asset` from `user` into custody.
    ///
    /// Invoked by [`Bank::deposit`](crate::bank::Bank::deposit) *after*
    /// the ledger credit has been applied.
    fn pull_from(&self, user: &str, asset: AssetId, amount: u128) -> Result<(), TransferError>;

    /// Pushes `amount` of `asset` from custody out to `user`.
    ///
    /// Invoked by [`Bank::withdraw`](crate::bank::Bank::withdraw) *after*
    /// the ledger debit has been applied.
    fn push_to(&self, user: &str, asset: AssetId, amount: u128) -> Result<(), TransferError>;
}
