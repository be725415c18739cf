//! Admin access control and the pause gate.
//!
//! Every mutating composer operation first asks the [`PauseGate`] whether
//! it is open; admin-only operations (pausing, retargeting a collection)
//! go through an [`AccessControl`] collaborator. Read-only operations never
//! consult either.
//!
//! ```rust
//! use std::sync::Arc;
//! use composer_gate::{AdminRoles, GateError, PauseGate};
//! use composer_types::Address;
//!
//! let admin = Address::repeat_byte(1);
//! let gate = PauseGate::new(Arc::new(AdminRoles::new(admin)), false);
//! gate.pause(&admin).unwrap();
//! assert_eq!(gate.ensure_open(), Err(GateError::Paused));
//! ```

pub mod access;
pub mod error;
pub mod pause;

pub use access::{AccessControl, AdminRoles};
pub use error::GateError;
pub use pause::PauseGate;
