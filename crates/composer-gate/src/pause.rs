use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use composer_types::Address;
use tracing::info;

use crate::access::AccessControl;
use crate::error::GateError;

/// Binary open/paused switch consulted before every mutating operation.
///
/// Transitions in either direction are admin-only. Reads are lock-free.
pub struct PauseGate {
    paused: AtomicBool,
    access: Arc<dyn AccessControl>,
}

impl PauseGate {
    pub fn new(access: Arc<dyn AccessControl>, start_paused: bool) -> Self {
        Self {
            paused: AtomicBool::new(start_paused),
            access,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Fail with [`GateError::Paused`] if the gate is closed.
    pub fn ensure_open(&self) -> Result<(), GateError> {
        if self.is_paused() {
            Err(GateError::Paused)
        } else {
            Ok(())
        }
    }

    /// Close the gate. Fails if already paused.
    pub fn pause(&self, caller: &Address) -> Result<(), GateError> {
        self.access.require_admin(caller)?;
        self.paused
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| GateError::AlreadyPaused)?;
        info!(by = %caller, "composer paused");
        Ok(())
    }

    /// Reopen the gate. Fails if not paused.
    pub fn unpause(&self, caller: &Address) -> Result<(), GateError> {
        self.access.require_admin(caller)?;
        self.paused
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| GateError::NotPaused)?;
        info!(by = %caller, "composer unpaused");
        Ok(())
    }
}

impl fmt::Debug for PauseGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PauseGate")
            .field("paused", &self.is_paused())
            .finish_non_exhaustive()
    }
}
