//! Composition engine for the layer composer.
//!
//! A holder changes which accessories their avatar wears by calling
//! [`CompositionEngine::compose`] with the nine layer values they want. The
//! engine:
//!
//! 1. checks the pause gate,
//! 2. decodes the current composite id,
//! 3. diffs old and requested layers slot by slot (attach, detach, replace),
//! 4. stages accessory mints and burns against the ledger each selector
//!    resolves to,
//! 5. re-encodes the composite id and stages the composite burn and mint,
//! 6. prepares every touched ledger, commits only once all accept, then
//!    emits a [`CompositionEvent`].
//!
//! Nothing touches a ledger until every phase has succeeded, so a failed
//! call leaves all balances exactly as they were.
//!
//! # Modules
//!
//! - [`engine`]: [`CompositionEngine`]
//! - [`plan`]: pure per-slot diff ([`SlotTransition`])
//! - [`settlement`]: staged multi-ledger journal
//! - [`events`]: completion events and their broadcast bus
//! - [`config`]: [`EngineConfig`], loadable from TOML
//! - [`error`]: [`EngineError`]

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod plan;
pub mod settlement;

pub use config::EngineConfig;
pub use engine::CompositionEngine;
pub use error::EngineError;
pub use events::{CompositionEvent, EventBus, EventId, EventStream};
pub use plan::{plan_transitions, SlotTransition};
pub use settlement::Settlement;
