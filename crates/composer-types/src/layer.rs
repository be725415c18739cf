use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Number of accessory slots in a composite.
pub const SLOT_COUNT: usize = 9;

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// A 1-based slot index (1..=9). Slot 1 is the most significant field of a
/// composite id.
///
/// Slots are purely positional: nothing in the composer attaches meaning to
/// what a slot depicts.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(u8);

impl Slot {
    pub const FIRST: Slot = Slot(1);
    pub const LAST: Slot = Slot(SLOT_COUNT as u8);

    pub fn new(index: u8) -> Result<Self, TypeError> {
        if (1..=SLOT_COUNT as u8).contains(&index) {
            Ok(Self(index))
        } else {
            Err(TypeError::InvalidSlot(index))
        }
    }

    /// The 1-based index.
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The 0-based array position.
    pub const fn position(self) -> usize {
        (self.0 - 1) as usize
    }

    /// All slots in ascending order.
    pub fn all() -> impl Iterator<Item = Slot> {
        (1..=SLOT_COUNT as u8).map(Slot)
    }
}

impl TryFrom<u8> for Slot {
    type Error = TypeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> Self {
        slot.0
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Collection key carried in the middle byte of a layer value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selector(pub u8);

impl Selector {
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Selector({})", self.0)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// LayerValue
// ---------------------------------------------------------------------------

/// An accessory token id placed in a slot, or zero for "empty".
///
/// A well-formed value is 24 bits wide, laid out as
/// `[item:8][selector:8][slot:8]`: `0x090109` is item 9 of the selector-1
/// collection, worn in slot 9. Only the selector is interpreted by the
/// composer; the rest is opaque and meaningful to the owning collection.
///
/// Construction is unchecked so arbitrary requests can be represented; the
/// codec enforces the field width and slot agreement on encode.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerValue(u32);

impl LayerValue {
    pub const EMPTY: LayerValue = LayerValue(0);

    /// Width of a well-formed layer value.
    pub const BITS: u32 = 24;

    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Assemble a value from its three bytes.
    pub const fn from_parts(item: u8, selector: Selector, slot: Slot) -> Self {
        Self(((item as u32) << 16) | ((selector.0 as u32) << 8) | slot.0 as u32)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The collection selector (middle byte).
    pub const fn selector(self) -> Selector {
        Selector(((self.0 >> 8) & 0xff) as u8)
    }

    /// The collection-local item byte.
    pub const fn item(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    /// The slot byte the value claims to belong to.
    pub const fn slot_byte(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Whether the value fits in [`Self::BITS`].
    pub const fn fits(self) -> bool {
        self.0 >> Self::BITS == 0
    }
}

impl From<u32> for LayerValue {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for LayerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerValue({:#08x})", self.0)
    }
}

impl fmt::Display for LayerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

/// The nine slot values of a composite, slot 1 first.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layers([LayerValue; SLOT_COUNT]);

impl Layers {
    pub const fn new(values: [LayerValue; SLOT_COUNT]) -> Self {
        Self(values)
    }

    /// All slots empty.
    pub const fn empty() -> Self {
        Self([LayerValue::EMPTY; SLOT_COUNT])
    }

    pub fn from_raw(values: [u32; SLOT_COUNT]) -> Self {
        Self(values.map(LayerValue::new))
    }

    pub fn to_raw(&self) -> [u32; SLOT_COUNT] {
        self.0.map(LayerValue::raw)
    }

    pub fn get(&self, slot: Slot) -> LayerValue {
        self.0[slot.position()]
    }

    pub fn set(&mut self, slot: Slot, value: LayerValue) {
        self.0[slot.position()] = value;
    }

    pub fn as_array(&self) -> &[LayerValue; SLOT_COUNT] {
        &self.0
    }

    /// `(slot, value)` pairs in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Slot, LayerValue)> + '_ {
        Slot::all().zip(self.0.iter().copied())
    }

    /// Number of occupied slots.
    pub fn occupied(&self) -> usize {
        self.0.iter().filter(|v| !v.is_empty()).count()
    }
}

impl From<[u32; SLOT_COUNT]> for Layers {
    fn from(values: [u32; SLOT_COUNT]) -> Self {
        Self::from_raw(values)
    }
}

impl fmt::Debug for Layers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.iter()).finish()
    }
}
