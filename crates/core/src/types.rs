//! Common types and wire encoding
//!
//! Item ids, prices and amounts are 256-bit unsigned integers. On the wire
//! they are accepted as JSON integers (up to `u64`) or as strings, decimal or
//! `0x`-prefixed hex, and always written back as decimal strings. Nothing is
//! ever rounded or truncated: a value that does not fit is an error.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use alloy_primitives::{Address, B256};

/// Malformed or out-of-range integer input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// Empty string
    #[error("empty integer")]
    Empty,
    /// Not a decimal or `0x` hex integer
    #[error("malformed integer {0:?}")]
    Malformed(String),
    /// Larger than 2^256 - 1
    #[error("integer {0:?} does not fit in 256 bits")]
    OutOfRange(String),
}

/// Parse a decimal or `0x`-prefixed hex string into a `U256`.
pub fn parse_u256(input: &str) -> Result<U256, EncodingError> {
    let text = input.trim();
    if text.is_empty() {
        return Err(EncodingError::Empty);
    }
    let (digits, radix) = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => (hex, 16),
        None => (text, 10),
    };
    let valid = !digits.is_empty() &&
        digits.chars().all(|c| if radix == 16 { c.is_ascii_hexdigit() } else { c.is_ascii_digit() });
    if !valid {
        return Err(EncodingError::Malformed(input.to_string()));
    }
    U256::from_str_radix(digits, radix).map_err(|_| EncodingError::OutOfRange(input.to_string()))
}

/// Serde adapter for a single `U256` field.
pub mod wire_u256 {
    use super::parse_u256;
    use alloy_primitives::U256;
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    impl Raw {
        fn into_u256<E: de::Error>(self) -> Result<U256, E> {
            match self {
                Self::Number(n) => Ok(U256::from(n)),
                Self::Text(s) => parse_u256(&s).map_err(E::custom),
            }
        }
    }

    /// Write as a decimal string.
    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    /// Read from a JSON integer or a decimal/hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        Raw::deserialize(deserializer)?.into_u256()
    }

    /// Same encoding for sequences.
    pub mod seq {
        use super::Raw;
        use alloy_primitives::U256;
        use serde::{ser::SerializeSeq, Deserialize, Deserializer, Serializer};

        /// Write each value as a decimal string.
        pub fn serialize<S: Serializer>(values: &[U256], serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(values.len()))?;
            for value in values {
                seq.serialize_element(&value.to_string())?;
            }
            seq.end()
        }

        /// Read each value from a JSON integer or a decimal/hex string.
        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<U256>, D::Error> {
            Vec::<Raw>::deserialize(deserializer)?.into_iter().map(Raw::into_u256).collect()
        }
    }
}

/// One catalog entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    /// Item identifier, never zero
    #[serde(with = "wire_u256")]
    pub item_id: U256,
    /// Unit price
    #[serde(with = "wire_u256")]
    pub price: U256,
}

impl CatalogItem {
    /// Create a catalog entry
    pub const fn new(item_id: U256, price: U256) -> Self {
        Self { item_id, price }
    }

    /// The `(item_id, price)` pair committed as a leaf.
    pub const fn pair(&self) -> (U256, U256) {
        (self.item_id, self.price)
    }
}

/// One line of a purchase: an item, the price it is claimed at, and a quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItem {
    /// Item identifier
    #[serde(with = "wire_u256")]
    pub item_id: U256,
    /// Claimed unit price
    #[serde(with = "wire_u256")]
    pub price: U256,
    /// Quantity
    #[serde(with = "wire_u256")]
    pub amount: U256,
}

impl PurchaseItem {
    /// Create a purchase line
    pub const fn new(item_id: U256, price: U256, amount: U256) -> Self {
        Self { item_id, price, amount }
    }

    /// The `(item_id, price)` pair this line claims.
    pub const fn pair(&self) -> (U256, U256) {
        (self.item_id, self.price)
    }
}
