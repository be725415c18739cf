//! In-memory asset ledger for tests, the simulator, and embedding.
//!
//! [`InMemoryLedger`] keeps balances in a `HashMap` behind a `RwLock`.
//! [`AssetLedger::prepare`] takes the write lock and validates the whole
//! batch against a scratch copy of the touched balances; the lock is held
//! until the reservation is committed or dropped, so a failing or abandoned
//! batch leaves the ledger exactly as it was.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use composer_types::{Address, TokenId};
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};
use crate::traits::{Amount, AssetLedger, LedgerOp, Reservation};

/// An in-memory implementation of [`AssetLedger`].
#[derive(Debug)]
pub struct InMemoryLedger {
    name: String,
    inner: RwLock<LedgerState>,
}

#[derive(Debug, Default)]
struct LedgerState {
    balances: HashMap<(Address, TokenId), Amount>,
    supply: HashMap<TokenId, Amount>,
}

impl InMemoryLedger {
    /// Create an empty ledger.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: RwLock::new(LedgerState::default()),
        }
    }

    /// Total units of `token` across all holders.
    pub fn supply_of(&self, token: TokenId) -> LedgerResult<Amount> {
        let state = self.read()?;
        Ok(state.supply.get(&token).copied().unwrap_or(0))
    }

    /// Every non-zero balance held by `owner`, sorted by token id.
    pub fn holdings(&self, owner: &Address) -> LedgerResult<Vec<(TokenId, Amount)>> {
        let state = self.read()?;
        let mut result: Vec<(TokenId, Amount)> = state
            .balances
            .iter()
            .filter(|((holder, _), _)| holder == owner)
            .map(|((_, token), amount)| (*token, *amount))
            .collect();
        result.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(result)
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned {
            ledger: self.name.clone(),
        })
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, LedgerState>> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned {
            ledger: self.name.clone(),
        })
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new("memory")
    }
}

type Staged = (HashMap<(Address, TokenId), Amount>, HashMap<TokenId, Amount>);

impl InMemoryLedger {
    /// Run `ops` against `state` without mutating it, returning every
    /// touched balance and supply as it would be afterwards.
    fn stage(&self, state: &LedgerState, ops: &[LedgerOp]) -> LedgerResult<Staged> {
        let mut balances: HashMap<(Address, TokenId), Amount> = HashMap::new();
        let mut supply: HashMap<TokenId, Amount> = HashMap::new();

        for op in ops {
            match *op {
                LedgerOp::Mint { to, token, amount } => {
                    let key = (to, token);
                    let current = *balances
                        .entry(key)
                        .or_insert_with(|| state.balances.get(&key).copied().unwrap_or(0));
                    let total = *supply
                        .entry(token)
                        .or_insert_with(|| state.supply.get(&token).copied().unwrap_or(0));
                    let overflow = || LedgerError::Overflow {
                        ledger: self.name.clone(),
                        token,
                    };
                    balances.insert(key, current.checked_add(amount).ok_or_else(overflow)?);
                    supply.insert(token, total.checked_add(amount).ok_or_else(overflow)?);
                }
                LedgerOp::Burn {
                    from,
                    token,
                    amount,
                } => {
                    let key = (from, token);
                    let current = *balances
                        .entry(key)
                        .or_insert_with(|| state.balances.get(&key).copied().unwrap_or(0));
                    if current < amount {
                        return Err(LedgerError::InsufficientBalance {
                            ledger: self.name.clone(),
                            owner: from,
                            token,
                            balance: current,
                            requested: amount,
                        });
                    }
                    balances.insert(key, current - amount);
                    let total = *supply
                        .entry(token)
                        .or_insert_with(|| state.supply.get(&token).copied().unwrap_or(0));
                    supply.insert(token, total.saturating_sub(amount));
                }
            }
        }
        Ok((balances, supply))
    }
}

/// A validated batch holding the ledger's write lock.
struct PendingBatch<'a> {
    name: &'a str,
    state: RwLockWriteGuard<'a, LedgerState>,
    balances: HashMap<(Address, TokenId), Amount>,
    supply: HashMap<TokenId, Amount>,
    ops: usize,
}

impl Reservation for PendingBatch<'_> {
    fn commit(self: Box<Self>) {
        let PendingBatch {
            name,
            mut state,
            balances,
            supply,
            ops,
        } = *self;
        for (key, amount) in balances {
            if amount == 0 {
                state.balances.remove(&key);
            } else {
                state.balances.insert(key, amount);
            }
        }
        for (token, amount) in supply {
            if amount == 0 {
                state.supply.remove(&token);
            } else {
                state.supply.insert(token, amount);
            }
        }
        debug!(ledger = %name, ops, "batch applied");
    }
}

impl AssetLedger for InMemoryLedger {
    fn name(&self) -> &str {
        &self.name
    }

    fn balance_of(&self, owner: &Address, token: TokenId) -> LedgerResult<Amount> {
        let state = self.read()?;
        Ok(state.balances.get(&(*owner, token)).copied().unwrap_or(0))
    }

    fn prepare<'a>(&'a self, ops: &[LedgerOp]) -> LedgerResult<Box<dyn Reservation + 'a>> {
        let state = self.write()?;
        let (balances, supply) = self.stage(&state, ops)?;
        Ok(Box::new(PendingBatch {
            name: &self.name,
            state,
            balances,
            supply,
            ops: ops.len(),
        }))
    }
}
