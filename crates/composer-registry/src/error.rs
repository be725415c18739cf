use composer_gate::GateError;
use composer_types::Selector;

/// Errors from registry lookups and updates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No collection has been registered under this selector.
    #[error("no collection registered for selector {selector}")]
    NotRegistered { selector: Selector },

    /// Selector 0 cannot name a collection.
    #[error("selector 0 is reserved")]
    ReservedSelector,

    #[error(transparent)]
    Access(#[from] GateError),

    #[error("registry lock poisoned")]
    LockPoisoned,
}
