use std::fmt;
use std::str::FromStr;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::layer::LayerValue;

/// Parse a `0x`-prefixed (or bare) hex string of at most 64 digits into a U256.
fn parse_u256_hex(s: &str) -> Result<U256, TypeError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Err(TypeError::InvalidHex("empty string".into()));
    }
    if digits.len() > 64 {
        return Err(TypeError::FieldOverflow {
            field: "token id",
            bits: 256,
        });
    }
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    let bytes = hex::decode(&padded).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
    Ok(U256::from_big_endian(&bytes))
}

fn u256_to_padded_hex(value: &U256) -> String {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    format!("0x{}", hex::encode(bytes))
}

// ---------------------------------------------------------------------------
// TokenId
// ---------------------------------------------------------------------------

/// A ledger-level token id.
///
/// Ledgers do not know whether a token is a composite or an accessory; both
/// are addressed by a 256-bit id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TokenId(pub U256);

impl TokenId {
    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        parse_u256_hex(s).map(Self)
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId(0x{:x})", self.0)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl From<u64> for TokenId {
    fn from(value: u64) -> Self {
        Self(U256::from(value))
    }
}

impl From<LayerValue> for TokenId {
    fn from(value: LayerValue) -> Self {
        Self(U256::from(value.raw()))
    }
}

impl From<CompositeId> for TokenId {
    fn from(value: CompositeId) -> Self {
        Self(value.0)
    }
}

// ---------------------------------------------------------------------------
// BaseId
// ---------------------------------------------------------------------------

/// Immutable identity of the underlying avatar: the low 32 bits of a
/// composite id. Composition never changes it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseId(u32);

impl BaseId {
    /// Width of the field inside a composite id.
    pub const BITS: u32 = 32;

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Parse from hex, rejecting values wider than 32 bits.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let wide = parse_u256_hex(s)?;
        Self::try_from(wide)
    }
}

impl TryFrom<U256> for BaseId {
    type Error = TypeError;

    fn try_from(value: U256) -> Result<Self, Self::Error> {
        if value > U256::from(u32::MAX) {
            return Err(TypeError::FieldOverflow {
                field: "base id",
                bits: Self::BITS,
            });
        }
        Ok(Self(value.low_u32()))
    }
}

impl TryFrom<u64> for BaseId {
    type Error = TypeError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        u32::try_from(value)
            .map(Self)
            .map_err(|_| TypeError::FieldOverflow {
                field: "base id",
                bits: Self::BITS,
            })
    }
}

impl From<u32> for BaseId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Debug for BaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BaseId({:#010x})", self.0)
    }
}

impl fmt::Display for BaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CompositeId
// ---------------------------------------------------------------------------

/// Packed identifier of a composite (avatar) token.
///
/// Always derived from a base id and nine layer values by the codec; it is
/// never persisted as its own record, only as a balance key in the composite
/// ledger.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompositeId(U256);

impl CompositeId {
    pub const fn from_u256(value: U256) -> Self {
        Self(value)
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    /// Parse from hex (at most 64 digits, `0x` prefix optional).
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        parse_u256_hex(s).map(Self)
    }

    /// Zero-padded, 64-digit hex encoding.
    pub fn to_hex(&self) -> String {
        u256_to_padded_hex(&self.0)
    }
}

impl FromStr for CompositeId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<U256> for CompositeId {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Debug for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompositeId(0x{:x})", self.0)
    }
}

impl fmt::Display for CompositeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}
