use std::fmt;
use std::sync::Arc;

use composer_codec::{decode, encode};
use composer_gate::{AccessControl, PauseGate};
use composer_ledger::AssetLedger;
use composer_registry::CollectionRegistry;
use composer_types::{Address, BaseId, CompositeId, LayerValue, Layers, Selector, Slot, TokenId};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{CompositionEvent, EventBus, EventStream};
use crate::plan::plan_transitions;
use crate::settlement::Settlement;

/// Orchestrates compositions against the composite ledger and the accessory
/// ledgers the registry resolves to.
///
/// The engine holds no balances and takes no locks of its own. Every
/// `compose` call stages its effects in a [`Settlement`] and commits them
/// only once all checks have passed.
pub struct CompositionEngine {
    config: EngineConfig,
    composites: Arc<dyn AssetLedger>,
    registry: CollectionRegistry,
    gate: PauseGate,
    access: Arc<dyn AccessControl>,
    events: EventBus,
}

impl CompositionEngine {
    /// Wire an engine with `default_collection` registered under
    /// `config.default_selector`.
    pub fn new(
        config: EngineConfig,
        composites: Arc<dyn AssetLedger>,
        default_collection: Arc<dyn AssetLedger>,
        access: Arc<dyn AccessControl>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let registry = CollectionRegistry::new(
            Arc::clone(&access),
            config.default_selector(),
            default_collection,
        )?;
        let gate = PauseGate::new(Arc::clone(&access), config.start_paused);
        let events = EventBus::new(config.event_capacity);
        Ok(Self {
            config,
            composites,
            registry,
            gate,
            access,
            events,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    pub fn composites(&self) -> &Arc<dyn AssetLedger> {
        &self.composites
    }

    pub fn access(&self) -> &Arc<dyn AccessControl> {
        &self.access
    }

    /// Split a composite id into its base id and layers. Never fails.
    pub fn decode(&self, id: CompositeId) -> (BaseId, Layers) {
        decode(id)
    }

    /// Compute the id `compose` would produce, without checking ownership,
    /// the pause gate, or the registry.
    pub fn preview(
        &self,
        id: CompositeId,
        requested: &Layers,
    ) -> Result<(BaseId, CompositeId), EngineError> {
        let (base_id, _) = decode(id);
        let new_id = encode(base_id, requested)?;
        Ok((base_id, new_id))
    }

    /// Recompose `id` so that it wears exactly `requested`.
    ///
    /// On success the caller holds the new composite, every detached
    /// accessory has been minted back, every attached accessory burned, and
    /// one [`CompositionEvent`] has been published. On failure nothing
    /// changed.
    pub fn compose(
        &self,
        caller: &Address,
        id: CompositeId,
        requested: &Layers,
    ) -> Result<CompositeId, EngineError> {
        match self.try_compose(caller, id, requested) {
            Ok(event) => {
                let new_id = event.composite_id;
                info!(
                    %caller,
                    from = %id,
                    to = %new_id,
                    event = %event.id,
                    "composition settled"
                );
                self.events.publish(event);
                Ok(new_id)
            }
            Err(err) => {
                warn!(%caller, composite = %id, error = %err, "composition rejected");
                Err(err)
            }
        }
    }

    fn try_compose(
        &self,
        caller: &Address,
        id: CompositeId,
        requested: &Layers,
    ) -> Result<CompositionEvent, EngineError> {
        self.gate.ensure_open()?;

        let (base_id, old) = decode(id);
        let mut settlement = Settlement::new();

        for (slot, transition) in plan_transitions(&old, requested) {
            if transition.is_unchanged() {
                continue;
            }
            debug!(%slot, ?transition, "slot transition");
            if let Some(value) = transition.detached() {
                let store = self.resolve(slot, value)?;
                settlement
                    .stage_mint(&store, caller, TokenId::from(value), 1)
                    .map_err(in_slot(slot))?;
            }
            if let Some(value) = transition.attached() {
                self.stage_attach(&mut settlement, caller, slot, value)?;
            }
        }

        let new_id = encode(base_id, requested)?;

        // Burn before mint, even when the id is unchanged.
        settlement.stage_burn(&self.composites, caller, TokenId::from(id), 1)?;
        settlement.stage_mint(&self.composites, caller, TokenId::from(new_id), 1)?;
        settlement.commit()?;

        Ok(CompositionEvent::new(
            self.events.next_sequence(),
            *caller,
            base_id,
            *requested,
            new_id,
            id,
        ))
    }

    fn stage_attach(
        &self,
        settlement: &mut Settlement,
        caller: &Address,
        slot: Slot,
        value: LayerValue,
    ) -> Result<(), EngineError> {
        let store = self.resolve(slot, value)?;
        let token = TokenId::from(value);
        let held = settlement
            .balance_of(&store, caller, token)
            .map_err(in_slot(slot))?;
        if held == 0 {
            return Err(EngineError::Ownership { slot, token: value });
        }
        settlement
            .stage_burn(&store, caller, token, 1)
            .map_err(in_slot(slot))
    }

    fn resolve(&self, slot: Slot, value: LayerValue) -> Result<Arc<dyn AssetLedger>, EngineError> {
        match self.registry.resolve(value) {
            Ok((_, store)) => Ok(store),
            Err(err) => match EngineError::from(err) {
                EngineError::NotRegistered { selector, .. } => Err(EngineError::NotRegistered {
                    selector,
                    slot: Some(slot),
                }),
                other => Err(other),
            },
        }
    }

    /// Register or overwrite the ledger behind `selector`. Admin only, and
    /// refused while the gate is closed.
    ///
    /// Already-encoded layer values carrying `selector` resolve to the new
    /// ledger from now on; nothing is migrated.
    pub fn set_collection(
        &self,
        caller: &Address,
        selector: Selector,
        store: Arc<dyn AssetLedger>,
    ) -> Result<Option<Arc<dyn AssetLedger>>, EngineError> {
        self.gate.ensure_open()?;
        Ok(self.registry.set(caller, selector, store)?)
    }

    pub fn collection(&self, selector: Selector) -> Result<Arc<dyn AssetLedger>, EngineError> {
        Ok(self.registry.get(selector)?)
    }

    pub fn pause(&self, caller: &Address) -> Result<(), EngineError> {
        Ok(self.gate.pause(caller)?)
    }

    pub fn unpause(&self, caller: &Address) -> Result<(), EngineError> {
        Ok(self.gate.unpause(caller)?)
    }

    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Receive every composition settled after this call.
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Compositions settled so far.
    pub fn compositions(&self) -> u64 {
        self.events.published()
    }
}

/// Attach `slot` to a ledger failure raised while settling it.
fn in_slot(slot: Slot) -> impl Fn(EngineError) -> EngineError {
    move |err| match err {
        EngineError::Ledger(source) => EngineError::SlotLedger { slot, source },
        other => other,
    }
}

impl fmt::Debug for CompositionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositionEngine")
            .field("config", &self.config)
            .field("composites", &self.composites.name())
            .field("registry", &self.registry)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
