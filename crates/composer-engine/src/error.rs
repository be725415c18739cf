use composer_codec::CodecError;
use composer_gate::GateError;
use composer_ledger::{Amount, LedgerError};
use composer_registry::RegistryError;
use composer_types::{Address, LayerValue, Selector, Slot, TokenId};

/// Errors surfaced by the composition engine.
///
/// Every error is terminal: the call that produced it changed no balance.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A requested layer value does not fit its slot.
    #[error(transparent)]
    Validation(#[from] CodecError),

    /// The pause gate is closed.
    #[error("paused")]
    Paused,

    /// A layer value names a selector with no registered collection.
    #[error("no collection registered for selector {selector}{}", .slot.map(|s| format!(" ({s})")).unwrap_or_default())]
    NotRegistered {
        selector: Selector,
        slot: Option<Slot>,
    },

    /// An attach needs an accessory token the caller does not hold.
    #[error("caller does not own accessory token {token} ({slot})")]
    Ownership { slot: Slot, token: LayerValue },

    /// A burn would take a balance below zero; most often the caller does
    /// not hold the composite being recomposed.
    #[error("{ledger}: {owner} holds {balance} of {token}, cannot burn {requested}")]
    InsufficientBalance {
        ledger: String,
        owner: Address,
        token: TokenId,
        balance: Amount,
        requested: Amount,
    },

    /// The caller lacks the admin role.
    #[error("caller {caller} is not an admin")]
    Unauthorized { caller: Address },

    #[error("gate error: {0}")]
    Gate(GateError),

    #[error("registry error: {0}")]
    Registry(RegistryError),

    #[error("ledger error: {0}")]
    Ledger(LedgerError),

    /// A ledger failed while settling one slot.
    #[error("{slot}: ledger error: {source}")]
    SlotLedger { slot: Slot, source: LedgerError },

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<GateError> for EngineError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Paused => Self::Paused,
            GateError::Unauthorized { caller } => Self::Unauthorized { caller },
            other => Self::Gate(other),
        }
    }
}

impl From<RegistryError> for EngineError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotRegistered { selector } => Self::NotRegistered {
                selector,
                slot: None,
            },
            RegistryError::Access(gate) => gate.into(),
            other => Self::Registry(other),
        }
    }
}

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance {
                ledger,
                owner,
                token,
                balance,
                requested,
            } => Self::InsufficientBalance {
                ledger,
                owner,
                token,
                balance,
                requested,
            },
            other => Self::Ledger(other),
        }
    }
}
