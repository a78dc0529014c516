//! # Asset Registry
//!
//! The bounded, append-only list of assets the ledger will custody, plus
//! the mapping from each asset to its external price source.
//!
//! Two invariants matter here:
//!
//! 1. An asset appears in the ordered list **at most once**. Registering
//!    an already-listed asset only rewrites its price-source mapping.
//! 2. The list never grows past [`crate::config::MAX_REGISTERED_ASSETS`].
//!    The capacity check iterates this list on every deposit, so the bound
//!    is what keeps that aggregation constant-cost no matter how many
//!    registrations an operator attempts.
//!
//! There is no unregister operation: once listed, an asset stays listed
//! for the lifetime of the registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::asset::{AssetId, PriceSourceId};
use crate::config::MAX_REGISTERED_ASSETS;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Lookup of an asset that was never registered.
    #[error("asset {0} is not registered")]
    AssetNotRegistered(AssetId),

    /// Attempted to list a new asset while the registry is full.
    #[error("registry capacity exceeded: {max} assets already listed")]
    CapacityExceeded {
        /// The fixed maximum number of listed assets.
        max: usize,
    },
}

// ---------------------------------------------------------------------------
// AssetRegistry
// ---------------------------------------------------------------------------

/// The registry of custodied assets and their price sources.
///
/// `order` preserves registration order and is the iteration sequence for
/// the capacity aggregation; `sources` is the lookup index. Every entry in
/// `order` has a mapping in `sources` (the converse holds too -- the two
/// are mutated together in [`register`](Self::register) only).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AssetRegistry {
    /// Price-source mapping, keyed by asset.
    #[serde(with = "crate::asset::asset_id_map")]
    sources: HashMap<AssetId, PriceSourceId>,

    /// Listed assets in registration order, deduplicated.
    order: Vec<AssetId>,

    /// Maximum length of `order`.
    max_assets: usize,
}

impl AssetRegistry {
    /// Creates an empty registry bounded at
    /// [`MAX_REGISTERED_ASSETS`](crate::config::MAX_REGISTERED_ASSETS).
    pub fn new() -> Self {
        Self::with_max_assets(MAX_REGISTERED_ASSETS)
    }

    /// Creates an empty registry with an explicit bound.
    pub fn with_max_assets(max_assets: usize) -> Self {
        Self {
            sources: HashMap::new(),
            order: Vec::new(),
            max_assets,
        }
    }

    /// Registers an asset, or re-points an already-listed asset at a new
    /// price source.
    ///
    /// Returns `true` if the asset was newly listed, `false` if only the
    /// mapping was rewritten. Re-registering with the same source is a
    /// no-op that still returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::CapacityExceeded`] if the asset is new and
    /// the list is already at its maximum length.
    pub fn register(
        &mut self,
        asset: AssetId,
        source: PriceSourceId,
    ) -> Result<bool, RegistryError> {
        let newly_listed = !self.sources.contains_key(&asset);
        if newly_listed {
            if self.order.len() >= self.max_assets {
                return Err(RegistryError::CapacityExceeded {
                    max: self.max_assets,
                });
            }
            self.order.push(asset);
        }
        self.sources.insert(asset, source);
        Ok(newly_listed)
    }

    /// Resolves the price source for a registered asset.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AssetNotRegistered`] on a miss.
    pub fn lookup(&self, asset: AssetId) -> Result<PriceSourceId, RegistryError> {
        self.sources
            .get(&asset)
            .copied()
            .ok_or(RegistryError::AssetNotRegistered(asset))
    }

    /// Returns `true` if the asset is registered.
    pub fn contains(&self, asset: AssetId) -> bool {
        self.sources.contains_key(&asset)
    }

    /// Returns the listed assets in registration order.
    pub fn assets(&self) -> &[AssetId] {
        &self.order
    }

    /// Returns the number of listed assets.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if nothing is registered yet.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(n: u8) -> AssetId {
        AssetId::derive(&format!("TKN{n}"), "custodia:issuer")
    }

    fn source(label: &str) -> PriceSourceId {
        PriceSourceId::derive(label)
    }

    #[test]
    fn register_appends_in_order() {
        let mut reg = AssetRegistry::new();
        assert!(reg.register(asset(1), source("feed-1")).unwrap());
        assert!(reg.register(asset(2), source("feed-2")).unwrap());

        assert_eq!(reg.assets(), &[asset(1), asset(2)]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn reregistration_rewrites_mapping_without_duplicating() {
        let mut reg = AssetRegistry::new();
        reg.register(asset(1), source("feed-a")).unwrap();
        let newly = reg.register(asset(1), source("feed-b")).unwrap();

        assert!(!newly);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.lookup(asset(1)).unwrap(), source("feed-b"));
    }

    #[test]
    fn reregistration_with_same_source_is_idempotent() {
        let mut reg = AssetRegistry::new();
        reg.register(asset(1), source("feed-a")).unwrap();
        let newly = reg.register(asset(1), source("feed-a")).unwrap();

        assert!(!newly);
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.lookup(asset(1)).unwrap(), source("feed-a"));
    }

    #[test]
    fn full_registry_rejects_new_assets() {
        let mut reg = AssetRegistry::with_max_assets(2);
        reg.register(asset(1), source("feed-1")).unwrap();
        reg.register(asset(2), source("feed-2")).unwrap();

        let result = reg.register(asset(3), source("feed-3"));
        assert!(matches!(
            result,
            Err(RegistryError::CapacityExceeded { max: 2 })
        ));
        assert_eq!(reg.len(), 2);

        // Existing assets can still be re-pointed when full.
        reg.register(asset(1), source("feed-x")).unwrap();
        assert_eq!(reg.lookup(asset(1)).unwrap(), source("feed-x"));
    }

    #[test]
    fn default_bound_is_enforced() {
        let mut reg = AssetRegistry::new();
        for n in 0..MAX_REGISTERED_ASSETS {
            reg.register(asset(n as u8), source(&format!("feed-{n}")))
                .unwrap();
        }
        let overflow = reg.register(asset(200), source("feed-overflow"));
        assert!(matches!(
            overflow,
            Err(RegistryError::CapacityExceeded { .. })
        ));
        assert_eq!(reg.len(), MAX_REGISTERED_ASSETS);
    }

    #[test]
    fn lookup_miss_fails() {
        let reg = AssetRegistry::new();
        assert!(matches!(
            reg.lookup(asset(9)),
            Err(RegistryError::AssetNotRegistered(_))
        ));
    }

    #[test]
    fn native_asset_can_be_registered() {
        let mut reg = AssetRegistry::new();
        reg.register(AssetId::NATIVE, source("native-usd")).unwrap();
        assert!(reg.contains(AssetId::NATIVE));
        assert_eq!(reg.assets(), &[AssetId::NATIVE]);
    }

    #[test]
    fn registry_serialization_roundtrip() {
        let mut reg = AssetRegistry::new();
        reg.register(AssetId::NATIVE, source("native-usd")).unwrap();
        reg.register(asset(1), source("feed-1")).unwrap();

        let json = serde_json::to_string(&reg).expect("serialize");
        let recovered: AssetRegistry = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(recovered.assets(), reg.assets());
        assert_eq!(
            recovered.lookup(asset(1)).unwrap(),
            reg.lookup(asset(1)).unwrap()
        );
    }
}
