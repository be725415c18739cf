use std::collections::BTreeSet;
use std::sync::RwLock;

use composer_types::Address;
use tracing::info;

use crate::error::GateError;

/// Answers "may this caller administer the composer?".
///
/// Implementations must be thread-safe; the composer shares one instance
/// between the pause gate and the collection registry.
pub trait AccessControl: Send + Sync {
    /// Whether `who` holds the admin role.
    fn is_admin(&self, who: &Address) -> bool;

    /// Fail with [`GateError::Unauthorized`] unless `who` is an admin.
    fn require_admin(&self, who: &Address) -> Result<(), GateError> {
        if self.is_admin(who) {
            Ok(())
        } else {
            Err(GateError::Unauthorized { caller: *who })
        }
    }
}

/// In-memory admin role table.
///
/// Seeded with one admin at construction. Admins may grant and revoke the
/// role; the table never becomes empty.
#[derive(Debug)]
pub struct AdminRoles {
    admins: RwLock<BTreeSet<Address>>,
}

impl AdminRoles {
    pub fn new(initial_admin: Address) -> Self {
        let mut admins = BTreeSet::new();
        admins.insert(initial_admin);
        Self {
            admins: RwLock::new(admins),
        }
    }

    /// Grant the admin role. Returns `false` if `who` already held it.
    pub fn grant_admin(&self, caller: &Address, who: Address) -> Result<bool, GateError> {
        self.require_admin(caller)?;
        let mut admins = self.admins.write().map_err(|_| GateError::LockPoisoned)?;
        let added = admins.insert(who);
        if added {
            info!(admin = %who, by = %caller, "admin granted");
        }
        Ok(added)
    }

    /// Revoke the admin role. Returns `false` if `who` did not hold it.
    pub fn revoke_admin(&self, caller: &Address, who: &Address) -> Result<bool, GateError> {
        self.require_admin(caller)?;
        let mut admins = self.admins.write().map_err(|_| GateError::LockPoisoned)?;
        if !admins.contains(who) {
            return Ok(false);
        }
        if admins.len() == 1 {
            return Err(GateError::LastAdmin { admin: *who });
        }
        admins.remove(who);
        info!(admin = %who, by = %caller, "admin revoked");
        Ok(true)
    }

    /// Current admins in address order.
    pub fn admins(&self) -> Vec<Address> {
        self.admins
            .read()
            .map(|admins| admins.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl AccessControl for AdminRoles {
    fn is_admin(&self, who: &Address) -> bool {
        // A poisoned table denies everyone.
        self.admins
            .read()
            .map(|admins| admins.contains(who))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::repeat_byte(0x01)
    }

    fn stranger() -> Address {
        Address::repeat_byte(0x02)
    }

    #[test]
    fn initial_admin_is_admin() {
        let roles = AdminRoles::new(owner());
        assert!(roles.is_admin(&owner()));
        assert!(!roles.is_admin(&stranger()));
        assert!(roles.require_admin(&owner()).is_ok());
    }

    #[test]
    fn require_admin_names_the_caller() {
        let roles = AdminRoles::new(owner());
        assert_eq!(
            roles.require_admin(&stranger()),
            Err(GateError::Unauthorized { caller: stranger() })
        );
    }

    #[test]
    fn admins_can_grant_and_revoke() {
        let roles = AdminRoles::new(owner());
        assert!(roles.grant_admin(&owner(), stranger()).unwrap());
        assert!(!roles.grant_admin(&owner(), stranger()).unwrap());
        assert!(roles.is_admin(&stranger()));

        assert!(roles.revoke_admin(&stranger(), &owner()).unwrap());
        assert!(!roles.is_admin(&owner()));
        assert_eq!(roles.admins(), vec![stranger()]);
    }

    #[test]
    fn non_admin_cannot_grant() {
        let roles = AdminRoles::new(owner());
        let err = roles.grant_admin(&stranger(), stranger()).unwrap_err();
        assert_eq!(err, GateError::Unauthorized { caller: stranger() });
        assert!(!roles.is_admin(&stranger()));
    }

    #[test]
    fn last_admin_cannot_be_revoked() {
        let roles = AdminRoles::new(owner());
        assert_eq!(
            roles.revoke_admin(&owner(), &owner()),
            Err(GateError::LastAdmin { admin: owner() })
        );
        assert!(roles.is_admin(&owner()));
    }

    #[test]
    fn revoking_unknown_address_is_a_no_op() {
        let roles = AdminRoles::new(owner());
        assert!(!roles.revoke_admin(&owner(), &stranger()).unwrap());
    }
}
