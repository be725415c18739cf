//! Staged multi-ledger journal.
//!
//! A [`Settlement`] records every mint and burn a composition needs without
//! touching any ledger. Reads go through the journal: the balance it reports
//! is the ledger's balance plus whatever the journal has already staged, so
//! later checks see earlier steps of the same composition. Dropping a
//! settlement discards it.
//!
//! [`Settlement::commit`] is two-phase. Every touched ledger first prepares
//! its batch, validating it and locking out other writers; only once all of
//! them have accepted is any batch applied. If one ledger rejects, the
//! reservations already taken are dropped and no ledger changes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use composer_ledger::{Amount, AssetLedger, LedgerError, LedgerOp};
use composer_types::{Address, TokenId};
use tracing::{debug, error};

use crate::error::EngineError;

struct Posting {
    ledger: Arc<dyn AssetLedger>,
    ops: Vec<LedgerOp>,
}

/// Journal of staged balance effects across any number of ledgers.
#[derive(Default)]
pub struct Settlement {
    postings: Vec<Posting>,
    deltas: HashMap<(usize, Address, TokenId), i128>,
}

/// Identity of the ledger behind a handle, ignoring the vtable.
fn ledger_key(ledger: &Arc<dyn AssetLedger>) -> usize {
    Arc::as_ptr(ledger) as *const () as usize
}

fn same_ledger(a: &Arc<dyn AssetLedger>, b: &Arc<dyn AssetLedger>) -> bool {
    ledger_key(a) == ledger_key(b)
}

impl Settlement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of staged operations across all ledgers.
    pub fn len(&self) -> usize {
        self.postings.iter().map(|p| p.ops.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct ledgers touched.
    pub fn ledger_count(&self) -> usize {
        self.postings.len()
    }

    fn posting_index(&mut self, ledger: &Arc<dyn AssetLedger>) -> usize {
        if let Some(index) = self
            .postings
            .iter()
            .position(|p| same_ledger(&p.ledger, ledger))
        {
            return index;
        }
        self.postings.push(Posting {
            ledger: Arc::clone(ledger),
            ops: Vec::new(),
        });
        self.postings.len() - 1
    }

    fn delta(&self, index: usize, owner: &Address, token: TokenId) -> i128 {
        self.deltas
            .get(&(index, *owner, token))
            .copied()
            .unwrap_or(0)
    }

    /// Balance as it will be once everything staged so far is committed.
    pub fn balance_of(
        &mut self,
        ledger: &Arc<dyn AssetLedger>,
        owner: &Address,
        token: TokenId,
    ) -> Result<Amount, EngineError> {
        let index = self.posting_index(ledger);
        let base = i128::from(ledger.balance_of(owner, token)?);
        let projected = base + self.delta(index, owner, token);
        Amount::try_from(projected).map_err(|_| {
            EngineError::Ledger(LedgerError::Overflow {
                ledger: ledger.name().to_string(),
                token,
            })
        })
    }

    /// Stage a mint.
    pub fn stage_mint(
        &mut self,
        ledger: &Arc<dyn AssetLedger>,
        to: &Address,
        token: TokenId,
        amount: Amount,
    ) -> Result<(), EngineError> {
        let current = self.balance_of(ledger, to, token)?;
        if current.checked_add(amount).is_none() {
            return Err(EngineError::Ledger(LedgerError::Overflow {
                ledger: ledger.name().to_string(),
                token,
            }));
        }
        let index = self.posting_index(ledger);
        *self.deltas.entry((index, *to, token)).or_insert(0) += i128::from(amount);
        self.postings[index].ops.push(LedgerOp::Mint {
            to: *to,
            token,
            amount,
        });
        debug!(ledger = ledger.name(), %token, amount, "mint staged");
        Ok(())
    }

    /// Stage a burn, failing now if the projected balance is too small.
    pub fn stage_burn(
        &mut self,
        ledger: &Arc<dyn AssetLedger>,
        from: &Address,
        token: TokenId,
        amount: Amount,
    ) -> Result<(), EngineError> {
        let current = self.balance_of(ledger, from, token)?;
        if current < amount {
            return Err(EngineError::InsufficientBalance {
                ledger: ledger.name().to_string(),
                owner: *from,
                token,
                balance: current,
                requested: amount,
            });
        }
        let index = self.posting_index(ledger);
        *self.deltas.entry((index, *from, token)).or_insert(0) -= i128::from(amount);
        self.postings[index].ops.push(LedgerOp::Burn {
            from: *from,
            token,
            amount,
        });
        debug!(ledger = ledger.name(), %token, amount, "burn staged");
        Ok(())
    }

    /// Apply every staged operation, all ledgers or none.
    ///
    /// Each batch is validated against the journal while staging, so a
    /// ledger only rejects here if another writer changed it in between or
    /// the backend itself fails.
    pub fn commit(self) -> Result<usize, EngineError> {
        let total = self.len();
        let mut postings: Vec<&Posting> =
            self.postings.iter().filter(|p| !p.ops.is_empty()).collect();
        // One global lock order, so concurrent settlements cannot deadlock.
        postings.sort_by_key(|p| ledger_key(&p.ledger));

        let mut reservations = Vec::with_capacity(postings.len());
        for posting in &postings {
            match posting.ledger.prepare(&posting.ops) {
                Ok(reservation) => reservations.push(reservation),
                Err(err) => {
                    error!(
                        ledger = posting.ledger.name(),
                        prepared = reservations.len(),
                        error = %err,
                        "settlement rejected by ledger"
                    );
                    return Err(err.into());
                }
            }
        }

        for (posting, reservation) in postings.iter().zip(reservations) {
            reservation.commit();
            debug!(
                ledger = posting.ledger.name(),
                ops = posting.ops.len(),
                "settlement applied"
            );
        }
        Ok(total)
    }
}

impl fmt::Debug for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut list = f.debug_list();
        for posting in &self.postings {
            list.entry(&(posting.ledger.name(), &posting.ops));
        }
        list.finish()
    }
}
