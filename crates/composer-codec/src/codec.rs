use composer_types::{BaseId, CompositeId, LayerValue, Layers, Slot, SLOT_COUNT, U256};

use crate::error::CodecError;

/// Width of the base id field (least significant bits).
pub const BASE_ID_BITS: usize = 32;

/// Width of one slot field.
pub const LAYER_FIELD_BITS: usize = 24;

/// Bits in use; everything above is zero padding.
pub const PACKED_BITS: usize = BASE_ID_BITS + LAYER_FIELD_BITS * SLOT_COUNT;

const FIELD_MASK: u32 = (1 << LAYER_FIELD_BITS) - 1;

/// Bit offset of a slot's field. Slot 9 sits directly above the base id,
/// slot 1 is the highest field.
pub const fn field_offset(slot: Slot) -> usize {
    BASE_ID_BITS + LAYER_FIELD_BITS * (SLOT_COUNT - slot.get() as usize)
}

/// Reduce a layer value to the field stored for `slot`.
///
/// The slot byte is dropped because position already carries it; the
/// remaining `[item][selector]` bytes must be non-zero so the field cannot
/// be confused with an empty slot.
pub fn pack_layer(slot: Slot, value: LayerValue) -> Result<u32, CodecError> {
    if value.is_empty() {
        return Ok(0);
    }
    if !value.fits() {
        return Err(CodecError::LayerTooWide { slot, value });
    }
    if value.slot_byte() != slot.get() {
        return Err(CodecError::SlotMismatch { slot, value });
    }
    let field = value.raw() >> 8;
    if field == 0 {
        return Err(CodecError::EmptyPayload { slot, value });
    }
    Ok(field)
}

/// Inverse of [`pack_layer`]. A zero field is the empty value.
pub fn unpack_layer(slot: Slot, field: u32) -> LayerValue {
    if field == 0 {
        LayerValue::EMPTY
    } else {
        LayerValue::new((field << 8) | u32::from(slot.get()))
    }
}

/// Pack a base id and nine layer values into a composite id.
///
/// Fails if any layer value is malformed for its slot.
pub fn encode(base: BaseId, layers: &Layers) -> Result<CompositeId, CodecError> {
    let mut packed = U256::from(base.get());
    for (slot, value) in layers.iter() {
        let field = pack_layer(slot, value)?;
        if field != 0 {
            packed = packed | (U256::from(field) << field_offset(slot));
        }
    }
    Ok(CompositeId::from_u256(packed))
}

/// Unpack a composite id into its base id and nine layer values.
///
/// Total over every 256-bit input: padding bits are ignored.
pub fn decode(id: CompositeId) -> (BaseId, Layers) {
    let raw = id.as_u256();
    let base = BaseId::new(raw.low_u32());
    let mask = U256::from(FIELD_MASK);

    let mut layers = Layers::empty();
    for slot in Slot::all() {
        let field = ((raw >> field_offset(slot)) & mask).low_u32();
        layers.set(slot, unpack_layer(slot, field));
    }
    (base, layers)
}

/// Whether `id` is exactly what `encode` would produce for its own decoding.
///
/// False for ids with padding bits set or with slot fields that no
/// well-formed layer value packs to.
pub fn is_canonical(id: CompositeId) -> bool {
    let (base, layers) = decode(id);
    encode(base, &layers).map(|re| re == id).unwrap_or(false)
}
