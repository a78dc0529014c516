//! # Ledger Configuration & Constants
//!
//! Every magic number in CUSTODIA lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong and you owe the team
//! coffee.
//!
//! These values are part of the accounting model. Changing them on a live
//! deployment changes what existing balances are worth, so treat every
//! edit as a migration.

// ---------------------------------------------------------------------------
// Denomination
// ---------------------------------------------------------------------------

/// Decimal places of the common denomination used for capacity accounting.
///
/// All heterogeneous asset values are normalized into this fixed-point
/// scale before they are compared against the capacity limit. 18 matches
/// the native asset, so a common-value of `10^18` reads as "one unit".
pub const COMMON_DECIMALS: u8 = 18;

/// Decimal places of the native asset.
///
/// The native asset has no queryable metadata, so its precision is pinned
/// here instead of being looked up.
pub const NATIVE_DECIMALS: u8 = 18;

// ---------------------------------------------------------------------------
// Registry Bounds
// ---------------------------------------------------------------------------

/// Maximum number of assets the registry will ever list.
///
/// The capacity check sums a valuation over every listed asset, so this
/// bound is what keeps that aggregation constant-cost. Registration fails
/// once the registry is full; there is no unlisting.
pub const MAX_REGISTERED_ASSETS: usize = 16;
