use composer_types::{LayerValue, Slot};

/// Validation failures raised by [`crate::encode`].
///
/// Every variant is a caller contract violation: the codec never truncates
/// a field to make it fit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("validation error: {slot} value {value} exceeds 24 bits")]
    LayerTooWide { slot: Slot, value: LayerValue },

    #[error("validation error: {slot} value {value} is tagged for slot {}", .value.slot_byte())]
    SlotMismatch { slot: Slot, value: LayerValue },

    #[error("validation error: {slot} value {value} has no item or selector bits")]
    EmptyPayload { slot: Slot, value: LayerValue },
}

impl CodecError {
    /// The slot whose value was rejected.
    pub fn slot(&self) -> Slot {
        match self {
            Self::LayerTooWide { slot, .. }
            | Self::SlotMismatch { slot, .. }
            | Self::EmptyPayload { slot, .. } => *slot,
        }
    }
}
