use thiserror::Error;

/// Errors produced by type construction and parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("{field} does not fit in {bits} bits")]
    FieldOverflow { field: &'static str, bits: u32 },

    #[error("slot index {0} is outside 1..=9")]
    InvalidSlot(u8),
}
