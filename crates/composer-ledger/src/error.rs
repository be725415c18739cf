use composer_types::{Address, TokenId};

use crate::traits::Amount;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{ledger}: {owner} holds {balance} of {token}, cannot burn {requested}")]
    InsufficientBalance {
        ledger: String,
        owner: Address,
        token: TokenId,
        balance: Amount,
        requested: Amount,
    },

    #[error("{ledger}: balance or supply overflow for {token}")]
    Overflow { ledger: String, token: TokenId },

    #[error("{ledger}: lock poisoned")]
    LockPoisoned { ledger: String },

    #[error("{ledger}: backend unavailable: {reason}")]
    Unavailable { ledger: String, reason: String },
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
