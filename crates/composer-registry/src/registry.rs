use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use composer_gate::AccessControl;
use composer_ledger::AssetLedger;
use composer_types::{Address, LayerValue, Selector};
use tracing::info;

use crate::error::RegistryError;

/// Selector to accessory-ledger mapping.
///
/// Reads take a shared lock and clone the `Arc`, so a settlement keeps the
/// ledger it resolved even if an admin retargets the selector mid-flight.
pub struct CollectionRegistry {
    entries: RwLock<BTreeMap<Selector, Arc<dyn AssetLedger>>>,
    access: Arc<dyn AccessControl>,
}

impl CollectionRegistry {
    /// Create a registry with `store` pre-wired under `selector`.
    pub fn new(
        access: Arc<dyn AccessControl>,
        selector: Selector,
        store: Arc<dyn AssetLedger>,
    ) -> Result<Self, RegistryError> {
        if selector.get() == 0 {
            return Err(RegistryError::ReservedSelector);
        }
        let mut entries = BTreeMap::new();
        entries.insert(selector, store);
        Ok(Self {
            entries: RwLock::new(entries),
            access,
        })
    }

    /// The ledger registered under `selector`.
    pub fn get(&self, selector: Selector) -> Result<Arc<dyn AssetLedger>, RegistryError> {
        let entries = self.entries.read().map_err(|_| RegistryError::LockPoisoned)?;
        entries
            .get(&selector)
            .cloned()
            .ok_or(RegistryError::NotRegistered { selector })
    }

    /// The ledger owning a layer value, by its selector byte.
    pub fn resolve(
        &self,
        value: LayerValue,
    ) -> Result<(Selector, Arc<dyn AssetLedger>), RegistryError> {
        let selector = value.selector();
        self.get(selector).map(|store| (selector, store))
    }

    /// Register or overwrite the ledger for `selector`. Admin only.
    ///
    /// Returns the ledger previously registered there, if any. Takes effect
    /// for every resolution that starts after this call returns.
    pub fn set(
        &self,
        caller: &Address,
        selector: Selector,
        store: Arc<dyn AssetLedger>,
    ) -> Result<Option<Arc<dyn AssetLedger>>, RegistryError> {
        self.access.require_admin(caller)?;
        if selector.get() == 0 {
            return Err(RegistryError::ReservedSelector);
        }

        let mut entries = self.entries.write().map_err(|_| RegistryError::LockPoisoned)?;
        let new_name = store.name().to_string();
        let previous = entries.insert(selector, store);
        info!(
            %selector,
            store = %new_name,
            previous = previous.as_ref().map(|p| p.name()).unwrap_or("-"),
            by = %caller,
            "collection registered"
        );
        Ok(previous)
    }

    pub fn contains(&self, selector: Selector) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(&selector))
            .unwrap_or(false)
    }

    /// Registered selectors in ascending order.
    pub fn selectors(&self) -> Vec<Selector> {
        self.entries
            .read()
            .map(|entries| entries.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl fmt::Debug for CollectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        if let Ok(entries) = self.entries.read() {
            for (selector, store) in entries.iter() {
                map.entry(&selector.get(), &store.name());
            }
        }
        map.finish()
    }
}
