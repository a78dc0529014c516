//! # Notification Records
//!
//! Fire-and-forget structured records emitted after each successful
//! mutation, for consumption by observers outside the core (indexers,
//! dashboards, audit trails). Emission never influences the outcome of an
//! operation: a notification is sent only after the operation has fully
//! committed, and the sink has no way to report failure back.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::asset::{AssetId, PriceSourceId};

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A structured record of a committed ledger mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notification {
    /// A deposit completed.
    Deposited {
        /// The depositing account.
        user: String,
        /// The deposited asset.
        asset: AssetId,
        /// Amount in the asset's smallest unit.
        amount: u128,
    },

    /// A withdrawal completed.
    Withdrew {
        /// The withdrawing account.
        user: String,
        /// The withdrawn asset.
        asset: AssetId,
        /// Amount in the asset's smallest unit.
        amount: u128,
    },

    /// An asset was listed or re-pointed at a new price source.
    AssetConfigured {
        /// The operator that performed the registration.
        operator: String,
        /// The configured asset.
        asset: AssetId,
        /// Its (new) price source.
        price_source: PriceSourceId,
    },

    /// The capacity ceiling changed.
    CapacityChanged {
        /// The operator that changed it.
        operator: String,
        /// The new ceiling, in common denomination.
        capacity: u128,
    },

    /// The per-withdrawal ceiling changed.
    WithdrawLimitChanged {
        /// The operator that changed it.
        operator: String,
        /// The new ceiling, in asset units.
        withdraw_limit: u128,
    },
}

// ---------------------------------------------------------------------------
// NotificationSink
// ---------------------------------------------------------------------------

/// Observer interface for committed mutations.
///
/// Implementations must not panic and must not block for long; the bank
/// calls them synchronously on its own call path.
pub trait NotificationSink: Send + Sync {
    /// Delivers one record. Fire-and-forget.
    fn notify(&self, event: &Notification);
}

/// A sink that forwards every record to the `tracing` subscriber at
/// `info` level. The default choice when no external observer is wired.
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: &Notification) {
        match event {
            Notification::Deposited {
                user,
                asset,
                amount,
            } => {
                info!(user = %user, asset = %asset, amount, "deposited");
            }
            Notification::Withdrew {
                user,
                asset,
                amount,
            } => {
                info!(user = %user, asset = %asset, amount, "withdrew");
            }
            Notification::AssetConfigured {
                operator,
                asset,
                price_source,
            } => {
                info!(operator = %operator, asset = %asset, source = %price_source, "asset configured");
            }
            Notification::CapacityChanged { operator, capacity } => {
                info!(operator = %operator, capacity, "capacity changed");
            }
            Notification::WithdrawLimitChanged {
                operator,
                withdraw_limit,
            } => {
                info!(operator = %operator, withdraw_limit, "withdraw limit changed");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
