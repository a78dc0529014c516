//! # Price Oracle & Asset Metadata Capabilities
//!
//! The valuation engine never talks to a price feed directly. Both the
//! oracle and the asset-metadata source are injected as trait objects so
//! that production wires in real feed adapters while tests substitute
//! deterministic fakes.
//!
//! A quote's `price` is deliberately signed: real feed aggregators can and
//! do report zero or negative values when a feed is stale or broken, and
//! the valuation engine must see that raw value to reject it. Clamping to
//! zero here would let an attacker deposit unlimited amounts of a dead
//! asset while the capacity check computes zero contribution.

use serde::{Deserialize, Serialize};

use crate::asset::{AssetId, PriceSourceId};

// ---------------------------------------------------------------------------
// PriceQuote
// ---------------------------------------------------------------------------

/// The latest price reported by a feed, with its fixed-point precision.
///
/// A quote of `price = 200_000_000_000, decimals = 8` reads as 2,000.00
/// in the feed's quote currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Raw fixed-point price. Non-positive values mean the feed is stale
    /// or broken; the valuation engine rejects them.
    pub price: i128,

    /// Number of decimal places in `price`.
    pub decimals: u8,
}

impl PriceQuote {
    /// Convenience constructor.
    pub fn new(price: i128, decimals: u8) -> Self {
        Self { price, decimals }
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// External price feed lookup.
pub trait PriceOracle: Send + Sync {
    /// Returns the latest quote for a price source.
    ///
    /// Implementations report whatever the feed last said, including
    /// non-positive prices -- interpretation belongs to the valuation
    /// engine.
    fn latest_price(&self, source: PriceSourceId) -> PriceQuote;
}

/// External asset metadata lookup.
///
/// Consulted only for non-native assets; the native currency's precision
/// is fixed at [`crate::config::NATIVE_DECIMALS`] without a lookup.
pub trait AssetMetadata: Send + Sync {
    /// Returns the asset's native decimal precision.
    fn decimals(&self, asset: AssetId) -> u8;
}
