//! Collection registry for the layer composer.
//!
//! Maps a small integer [`Selector`](composer_types::Selector) to the
//! accessory ledger that owns every layer value carrying it. One entry is
//! wired at construction; admins may add or overwrite entries afterwards.
//!
//! Resolution is always dynamic: overwriting a selector redirects every
//! future settlement of that selector, including layer values that were
//! encoded into composites while it pointed elsewhere. No migration step
//! exists and no history is kept.

pub mod error;
pub mod registry;

pub use error::RegistryError;
pub use registry::CollectionRegistry;
