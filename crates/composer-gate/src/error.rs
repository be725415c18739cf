use composer_types::Address;

/// Errors raised by access checks and pause transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The gate is closed; no mutation may proceed.
    #[error("paused")]
    Paused,

    #[error("already paused")]
    AlreadyPaused,

    #[error("not paused")]
    NotPaused,

    /// The caller lacks the admin role.
    #[error("caller {caller} is not an admin")]
    Unauthorized { caller: Address },

    /// Revoking would leave no admin at all.
    #[error("cannot revoke the last admin {admin}")]
    LastAdmin { admin: Address },

    #[error("role table lock poisoned")]
    LockPoisoned,
}
