//! # Asset & Price-Source Identifiers
//!
//! Every asset the ledger can hold is addressed by an [`AssetId`], and
//! every external price feed by a [`PriceSourceId`]. Both are deterministic
//! BLAKE3 hashes of their canonical properties, so the same asset always
//! gets the same ID regardless of when or where it is derived -- no
//! coordination required.
//!
//! The all-zero [`AssetId::NATIVE`] sentinel denotes the native currency.
//! It is reserved: no derived ID can collide with it short of a BLAKE3
//! preimage for zero.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// AssetId
// ---------------------------------------------------------------------------

/// A unique identifier for an asset the ledger can custody.
///
/// Computed as `BLAKE3(symbol || 0x00 || issuer)`. The separator byte
/// prevents ambiguity when one field's suffix matches another field's
/// prefix. IDs are never recycled within a registry instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId([u8; 32]);

impl AssetId {
    /// The reserved sentinel for the native currency.
    ///
    /// The native asset has no issuer and no on-ledger metadata; its
    /// precision is fixed at [`crate::config::NATIVE_DECIMALS`].
    pub const NATIVE: AssetId = AssetId([0u8; 32]);

    /// Creates an `AssetId` from raw 32-byte hash.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns `true` if this is the native currency sentinel.
    pub fn is_native(&self) -> bool {
        *self == Self::NATIVE
    }

    /// Returns the hex-encoded asset ID.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded asset ID.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Derives an `AssetId` from the asset's canonical properties.
    pub fn derive(symbol: &str, issuer: &str) -> Self {
        let mut preimage = Vec::with_capacity(symbol.len() + issuer.len() + 1);
        preimage.extend_from_slice(symbol.as_bytes());
        preimage.push(0x00);
        preimage.extend_from_slice(issuer.as_bytes());
        Self(*blake3::hash(&preimage).as_bytes())
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_native() {
            write!(f, "AssetId(native)")
        } else {
            write!(f, "AssetId({}...)", &self.to_hex()[..12])
        }
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl std::str::FromStr for AssetId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// ---------------------------------------------------------------------------
// PriceSourceId
// ---------------------------------------------------------------------------

/// A unique identifier for an external price feed.
///
/// Computed as `BLAKE3(label)` of the feed's canonical label (for example
/// `"chainlink:eth-usd"`). Each registered asset maps to exactly one price
/// source at a time; re-registration replaces the mapping.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PriceSourceId([u8; 32]);

impl PriceSourceId {
    /// Creates a `PriceSourceId` from raw 32-byte hash.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Returns the raw 32-byte identifier.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Returns the hex-encoded price-source ID.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex-encoded price-source ID.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    /// Derives a `PriceSourceId` from the feed's canonical label.
    pub fn derive(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }
}

impl fmt::Debug for PriceSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PriceSourceId({}...)", &self.to_hex()[..12])
    }
}

impl fmt::Display for PriceSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Serde helper: serialize HashMap<AssetId, V> with hex-string keys
// ---------------------------------------------------------------------------

/// Serde helper module for serializing/deserializing `HashMap<AssetId, V>`
/// as a JSON object with hex-encoded string keys.
///
/// JSON requires map keys to be strings, but `AssetId` wraps `[u8; 32]`
/// which serde would serialize as an array. This module converts keys
/// to/from their hex representation so the map serializes correctly.
///
/// # Usage
///
/// ```ignore
/// #[derive(Serialize, Deserialize)]
/// struct MyStruct {
///     #[serde(with = "crate::asset::asset_id_map")]
///     balances: HashMap<AssetId, SomeValue>,
/// }
/// ```
pub mod asset_id_map {
    use super::AssetId;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::HashMap;

    pub fn serialize<V, S>(map: &HashMap<AssetId, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        V: Serialize,
        S: Serializer,
    {
        use serde::ser::SerializeMap;
        let mut ser_map = serializer.serialize_map(Some(map.len()))?;
        for (key, value) in map {
            ser_map.serialize_entry(&key.to_hex(), value)?;
        }
        ser_map.end()
    }

    pub fn deserialize<'de, V, D>(deserializer: D) -> Result<HashMap<AssetId, V>, D::Error>
    where
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let string_map: HashMap<String, V> = HashMap::deserialize(deserializer)?;
        string_map
            .into_iter()
            .map(|(key, value)| {
                AssetId::from_hex(&key)
                    .map(|id| (id, value))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
