//! Foundation types for the layer composer.
//!
//! An avatar is a composite token: an immutable [`BaseId`] plus up to nine
//! accessory [`LayerValue`]s, one per [`Slot`]. This crate holds the value
//! types shared by the codec, the ledgers, the registry and the engine.
//!
//! # Key Types
//!
//! - [`Address`]: 20-byte holder / admin identity
//! - [`CompositeId`]: 256-bit packed identifier of a composite token
//! - [`BaseId`]: 32-bit identity of the underlying avatar
//! - [`LayerValue`]: 24-bit accessory token id (`[item][selector][slot]`)
//! - [`Selector`]: collection key resolved through the registry
//! - [`Slot`] / [`Layers`]: positional slot index and the nine-slot array

pub mod address;
pub mod composite;
pub mod error;
pub mod layer;

pub use address::Address;
pub use composite::{BaseId, CompositeId, TokenId};
pub use error::TypeError;
pub use layer::{LayerValue, Layers, Selector, Slot, SLOT_COUNT};

/// Re-exported so downstream crates share one 256-bit integer type.
pub use primitive_types::U256;
