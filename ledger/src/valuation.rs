//! # Valuation Engine
//!
//! Converts `(asset, amount)` pairs into the common denomination using the
//! asset's registered price source, and sums those values over the whole
//! vault for the capacity check.
//!
//! ## Normalization
//!
//! Assets disagree about precision: the native asset carries 18 decimals,
//! a wrapped-BTC token 8, a feed quote maybe 8 more. The common value is
//!
//! ```text
//! value = amount * price * 10^COMMON_DECIMALS
//!         -------------------------------------
//!         10^(asset_decimals + price_decimals)
//! ```
//!
//! computed in 256-bit arithmetic with the multiplications performed
//! before the single division, so no precision is lost to intermediate
//! truncation. Every step is checked: a product or power too wide for
//! 256 bits, or a result too large for `u128`, is reported as
//! [`ValuationError::ValueOverflow`] -- never a silent wrap, never a
//! panic, even on the garbage a hostile feed or token metadata can
//! legally return.
//!
//! Valuation is read-only and repeatable: one capacity check calls
//! [`Valuer::value_of`] once per held asset plus once for the incoming
//! amount, all against the same live quotes.

use primitive_types::U256;
use thiserror::Error;

use crate::asset::{AssetId, PriceSourceId};
use crate::config::{COMMON_DECIMALS, NATIVE_DECIMALS};
use crate::ledger::LedgerBook;
use crate::oracle::{AssetMetadata, PriceOracle};
use crate::registry::{AssetRegistry, RegistryError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur while valuing holdings.
#[derive(Debug, Error)]
pub enum ValuationError {
    /// The asset has no price-source mapping.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// The feed reported a non-positive price (stale or broken).
    ///
    /// This is rejected rather than treated as zero value: a zero-valued
    /// asset would slip past the capacity check in unlimited quantity.
    #[error("price source {feed} returned non-positive price {price}")]
    InvalidPrice {
        /// The offending price source.
        feed: PriceSourceId,
        /// The raw price it reported.
        price: i128,
    },

    /// The normalized value does not fit the common denomination, or an
    /// intermediate product/power exceeded the 256-bit working width.
    #[error("value of {amount} units of asset {asset} overflows the common denomination")]
    ValueOverflow {
        /// The asset being valued.
        asset: AssetId,
        /// The amount being valued.
        amount: u128,
    },
}

// ---------------------------------------------------------------------------
// Valuer
// ---------------------------------------------------------------------------

/// A short-lived view that values assets against the current registry and
/// live oracle quotes.
///
/// Borrowed rather than owned so the bank can construct one inside its
/// state lock without cloning anything.
pub struct Valuer<'a> {
    registry: &'a AssetRegistry,
    oracle: &'a dyn PriceOracle,
    metadata: &'a dyn AssetMetadata,
}

impl<'a> Valuer<'a> {
    /// Creates a valuer over the given registry and capabilities.
    pub fn new(
        registry: &'a AssetRegistry,
        oracle: &'a dyn PriceOracle,
        metadata: &'a dyn AssetMetadata,
    ) -> Self {
        Self {
            registry,
            oracle,
            metadata,
        }
    }

    /// Values `amount` of `asset` in the common denomination.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::AssetNotRegistered`] if the asset has no price
    ///   source.
    /// - [`ValuationError::InvalidPrice`] if the feed reports `price <= 0`.
    /// - [`ValuationError::ValueOverflow`] if the result exceeds `u128`
    ///   or an intermediate product exceeds the 256-bit working width.
    pub fn value_of(&self, asset: AssetId, amount: u128) -> Result<u128, ValuationError> {
        let source = self.registry.lookup(asset)?;
        let quote = self.oracle.latest_price(source);
        if quote.price <= 0 {
            return Err(ValuationError::InvalidPrice {
                feed: source,
                price: quote.price,
            });
        }

        let asset_decimals = if asset.is_native() {
            NATIVE_DECIMALS
        } else {
            self.metadata.decimals(asset)
        };

        let overflow = || ValuationError::ValueOverflow { asset, amount };

        // Multiply first, divide once, every step checked. The worst-case
        // amount * price * 10^18 product is wider than 256 bits, and a
        // feed or token can report decimals past 10^77; both surface as
        // ValueOverflow instead of wrapping or panicking.
        let numerator = U256::from(amount)
            .checked_mul(U256::from(quote.price as u128))
            .and_then(|n| n.checked_mul(pow10(COMMON_DECIMALS)?))
            .ok_or_else(overflow)?;
        let denominator = pow10(asset_decimals)
            .and_then(|d| d.checked_mul(pow10(quote.decimals)?))
            .ok_or_else(overflow)?;
        let value = numerator / denominator;

        if value > U256::from(u128::MAX) {
            return Err(overflow());
        }
        Ok(value.as_u128())
    }

    /// Values the vault's entire holdings: the sum of
    /// [`value_of`](Self::value_of) over every registered asset with a
    /// nonzero total.
    ///
    /// Iteration is over the registry's bounded ordered list, so the cost
    /// is capped by [`crate::config::MAX_REGISTERED_ASSETS`] regardless of
    /// account count.
    pub fn total_value(&self, book: &LedgerBook) -> Result<u128, ValuationError> {
        let mut total: u128 = 0;
        for asset in self.registry.assets() {
            let held = book.total_held(*asset);
            if held == 0 {
                continue;
            }
            let value = self.value_of(*asset, held)?;
            total = total
                .checked_add(value)
                .ok_or(ValuationError::ValueOverflow {
                    asset: *asset,
                    amount: held,
                })?;
        }
        Ok(total)
    }
}

fn pow10(exp: u8) -> Option<U256> {
    U256::from(10u8).checked_pow(U256::from(exp))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
