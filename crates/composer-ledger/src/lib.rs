//! Asset ledger boundary for the layer composer.
//!
//! Accessory collections and the composite token are independent ledgers
//! owned outside the composer. This crate provides:
//! - The [`AssetLedger`] trait the engine settles against
//! - [`LedgerOp`] batches that a ledger applies all-or-nothing
//! - [`Reservation`], a prepared batch held until commit or drop
//! - [`InMemoryLedger`] for tests, the CLI simulator, and embedding

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{LedgerError, LedgerResult};
pub use memory::InMemoryLedger;
pub use traits::{Amount, AssetLedger, LedgerOp, Reservation};
