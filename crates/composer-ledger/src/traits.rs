use composer_types::{Address, TokenId};
use serde::{Deserialize, Serialize};

use crate::error::LedgerResult;

/// Token quantity.
pub type Amount = u64;

/// A single balance mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum LedgerOp {
    Mint {
        to: Address,
        token: TokenId,
        amount: Amount,
    },
    Burn {
        from: Address,
        token: TokenId,
        amount: Amount,
    },
}

impl LedgerOp {
    pub fn token(&self) -> TokenId {
        match self {
            Self::Mint { token, .. } | Self::Burn { token, .. } => *token,
        }
    }

    pub fn is_burn(&self) -> bool {
        matches!(self, Self::Burn { .. })
    }
}

/// A batch a ledger has validated and locked but not yet applied.
///
/// While a reservation is alive no other writer can invalidate it. Dropping
/// it without calling [`Reservation::commit`] releases the lock and leaves
/// the ledger unchanged.
pub trait Reservation {
    /// Apply the reserved batch. Cannot fail: every check ran in
    /// [`AssetLedger::prepare`].
    fn commit(self: Box<Self>);
}

/// A multi-token balance ledger.
///
/// Possession of a handle is the authority to mint and burn: the composer
/// only receives ledgers through its constructor and the admin-gated
/// collection registry.
///
/// Implementations must be thread-safe and must serialize their own
/// writers; the composer relies on that to keep concurrent settlements from
/// spending the same balance twice.
pub trait AssetLedger: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Units of `token` held by `owner`.
    fn balance_of(&self, owner: &Address, token: TokenId) -> LedgerResult<Amount>;

    /// Validate `ops` as one batch and hold the ledger until the returned
    /// reservation is committed or dropped.
    ///
    /// A caller holding several reservations must acquire them in a fixed
    /// order; the composer orders them by ledger address.
    fn prepare<'a>(&'a self, ops: &[LedgerOp]) -> LedgerResult<Box<dyn Reservation + 'a>>;

    /// Apply a batch of operations in order, all or nothing.
    fn apply(&self, ops: &[LedgerOp]) -> LedgerResult<()> {
        self.prepare(ops)?.commit();
        Ok(())
    }

    /// Credit `amount` units of `token` to `to`.
    fn mint(&self, to: &Address, token: TokenId, amount: Amount) -> LedgerResult<()> {
        self.apply(&[LedgerOp::Mint {
            to: *to,
            token,
            amount,
        }])
    }

    /// Debit `amount` units of `token` from `owner`.
    ///
    /// Fails with [`crate::LedgerError::InsufficientBalance`] if the owner
    /// holds less than `amount`.
    fn burn(&self, owner: &Address, token: TokenId, amount: Amount) -> LedgerResult<()> {
        self.apply(&[LedgerOp::Burn {
            from: *owner,
            token,
            amount,
        }])
    }
}
