//! End-to-end composition scenarios against in-memory ledgers.

use std::sync::{Arc, Barrier};

use composer_codec::{decode, encode, CodecError};
use composer_engine::{CompositionEngine, EngineConfig, EngineError};
use composer_gate::AdminRoles;
use composer_ledger::{
    Amount, AssetLedger, InMemoryLedger, LedgerError, LedgerOp, LedgerResult, Reservation,
};
use composer_types::{Address, BaseId, CompositeId, LayerValue, Layers, Selector, Slot, TokenId};
use proptest::prelude::*;
use tokio::sync::broadcast::error::TryRecvError;

const BASE: u32 = 0xffffffcc;

const FULL: &str = "0x000101000201000301000401000501000601000701000801000901ffffffcc";
const FULL_LAYERS: [u32; 9] = [
    0x010101, 0x020102, 0x030103, 0x040104, 0x050105, 0x060106, 0x070107, 0x080108, 0x090109,
];

struct Harness {
    engine: CompositionEngine,
    composites: Arc<InMemoryLedger>,
    official: Arc<InMemoryLedger>,
}

fn admin() -> Address {
    Address::repeat_byte(0xad)
}

fn holder() -> Address {
    Address::repeat_byte(0x42)
}

fn id(hex: &str) -> CompositeId {
    CompositeId::from_hex(hex).unwrap()
}

fn base_only() -> CompositeId {
    id("0xffffffcc")
}

fn token(raw: u32) -> TokenId {
    TokenId::from(LayerValue::new(raw))
}

impl Harness {
    fn new() -> Self {
        let composites = Arc::new(InMemoryLedger::new("composites"));
        let official = Arc::new(InMemoryLedger::new("official"));
        let engine = CompositionEngine::new(
            EngineConfig::default(),
            composites.clone(),
            official.clone(),
            Arc::new(AdminRoles::new(admin())),
        )
        .unwrap();
        Self {
            engine,
            composites,
            official,
        }
    }

    /// Register a fresh ledger under `selector`.
    fn collection(&self, selector: u8, name: &str) -> Arc<InMemoryLedger> {
        let store = Arc::new(InMemoryLedger::new(name));
        self.engine
            .set_collection(&admin(), Selector(selector), store.clone())
            .unwrap();
        store
    }

    fn hold_composite(&self, composite: CompositeId) {
        self.composites
            .mint(&holder(), TokenId::from(composite), 1)
            .unwrap();
    }

    fn composite_balance(&self, composite: CompositeId) -> u64 {
        self.composites
            .balance_of(&holder(), TokenId::from(composite))
            .unwrap()
    }
}

fn give(store: &InMemoryLedger, raws: &[u32]) {
    for raw in raws {
        store.mint(&holder(), token(*raw), 1).unwrap();
    }
}

fn balance(store: &InMemoryLedger, raw: u32) -> u64 {
    store.balance_of(&holder(), token(raw)).unwrap()
}

/// A collection whose backend answers reads but refuses every write.
struct OfflineLedger {
    store: InMemoryLedger,
}

impl AssetLedger for OfflineLedger {
    fn name(&self) -> &str {
        self.store.name()
    }

    fn balance_of(&self, owner: &Address, token: TokenId) -> LedgerResult<Amount> {
        self.store.balance_of(owner, token)
    }

    fn prepare<'a>(&'a self, _ops: &[LedgerOp]) -> LedgerResult<Box<dyn Reservation + 'a>> {
        Err(LedgerError::Unavailable {
            ledger: self.name().to_string(),
            reason: "maintenance".into(),
        })
    }
}

#[test]
fn attach_to_bare_base() {
    let h = Harness::new();
    h.hold_composite(base_only());
    give(&h.official, &[0x010101, 0x090109]);

    let requested = Layers::from([0x010101, 0, 0, 0, 0, 0, 0, 0, 0x090109]);
    let new_id = h.engine.compose(&holder(), base_only(), &requested).unwrap();

    assert_eq!(
        new_id,
        id("0x000101000000000000000000000000000000000000000000000901ffffffcc")
    );
    assert_eq!(balance(&h.official, 0x010101), 0);
    assert_eq!(balance(&h.official, 0x090109), 0);
    assert_eq!(h.composite_balance(base_only()), 0);
    assert_eq!(h.composite_balance(new_id), 1);
}

#[test]
fn no_op_round_trips_the_same_id() {
    let h = Harness::new();
    let full = id(FULL);
    h.hold_composite(full);
    let mut events = h.engine.subscribe();

    let (_, layers) = decode(full);
    let new_id = h.engine.compose(&holder(), full, &layers).unwrap();

    assert_eq!(new_id, full);
    assert_eq!(h.composite_balance(full), 1);
    assert_eq!(h.composites.supply_of(TokenId::from(full)).unwrap(), 1);
    assert!(h.official.holdings(&holder()).unwrap().is_empty());

    let event = events.try_recv().unwrap();
    assert_eq!(event.composite_id, full);
    assert_eq!(event.previous_id, full);
}

#[test]
fn no_op_still_requires_the_composite() {
    let h = Harness::new();
    let full = id(FULL);
    let (_, layers) = decode(full);
    let err = h.engine.compose(&holder(), full, &layers).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { balance: 0, .. }));
}

#[test]
fn detach_one_slot_returns_the_accessory() {
    let h = Harness::new();
    let old = id("0x000101000000000000000000000000000000000000000000000901ffffffcc");
    h.hold_composite(old);

    let requested = Layers::from([0x010101, 0, 0, 0, 0, 0, 0, 0, 0]);
    let new_id = h.engine.compose(&holder(), old, &requested).unwrap();

    assert_eq!(
        new_id,
        id("0x000101000000000000000000000000000000000000000000000000ffffffcc")
    );
    assert_eq!(balance(&h.official, 0x090109), 1);
    assert_eq!(balance(&h.official, 0x010101), 0);
    assert_eq!(h.composite_balance(old), 0);
    assert_eq!(h.composite_balance(new_id), 1);
}

#[test]
fn detach_all_returns_every_accessory() {
    let h = Harness::new();
    let full = id(FULL);
    h.hold_composite(full);

    let new_id = h.engine.compose(&holder(), full, &Layers::empty()).unwrap();

    assert_eq!(new_id, base_only());
    for raw in FULL_LAYERS {
        assert_eq!(balance(&h.official, raw), 1, "{raw:#08x}");
    }
    assert_eq!(h.composite_balance(full), 0);
    assert_eq!(h.composite_balance(base_only()), 1);
}

#[test]
fn replace_swaps_accessories() {
    let h = Harness::new();
    let old = id("0x000101000000000000000000000000000000000000000000000901ffffffcc");
    h.hold_composite(old);
    give(&h.official, &[0x020101, 0x0a0109]);

    let requested = Layers::from([0x020101, 0, 0, 0, 0, 0, 0, 0, 0x0a0109]);
    let new_id = h.engine.compose(&holder(), old, &requested).unwrap();

    assert_eq!(
        new_id,
        id("0x000201000000000000000000000000000000000000000000000a01ffffffcc")
    );
    assert_eq!(balance(&h.official, 0x010101), 1);
    assert_eq!(balance(&h.official, 0x090109), 1);
    assert_eq!(balance(&h.official, 0x020101), 0);
    assert_eq!(balance(&h.official, 0x0a0109), 0);
}

#[test]
fn unowned_attach_changes_nothing() {
    let h = Harness::new();
    let old = id("0x000000000000000000000000000000000000000000000000000901ffffffcc");
    h.hold_composite(old);
    give(&h.official, &[0x010101]);

    let requested = Layers::from([0, 0x020102, 0, 0, 0, 0, 0, 0, 0x090109]);
    let err = h.engine.compose(&holder(), old, &requested).unwrap_err();

    assert_eq!(
        err,
        EngineError::Ownership {
            slot: Slot::new(2).unwrap(),
            token: LayerValue::new(0x020102),
        }
    );
    assert_eq!(h.composite_balance(old), 1);
    assert_eq!(h.official.holdings(&holder()).unwrap(), vec![(token(0x010101), 1)]);
}

#[test]
fn unowned_replace_does_not_return_the_old_accessory() {
    let h = Harness::new();
    let old = id("0x000101000000000000000000000000000000000000000000000901ffffffcc");
    h.hold_composite(old);

    let requested = Layers::from([0x020101, 0, 0, 0, 0, 0, 0, 0, 0x090109]);
    let err = h.engine.compose(&holder(), old, &requested).unwrap_err();

    assert!(matches!(err, EngineError::Ownership { .. }));
    assert_eq!(balance(&h.official, 0x010101), 0);
    assert_eq!(h.composite_balance(old), 1);
}

#[test]
fn paused_gate_blocks_until_unpaused() {
    let h = Harness::new();
    let old = id("0x000000000000000000000000000000000000000000000000000901ffffffcc");
    h.hold_composite(old);
    give(&h.official, &[0x020102]);
    let requested = Layers::from([0, 0x020102, 0, 0, 0, 0, 0, 0, 0x090109]);

    h.engine.pause(&admin()).unwrap();
    let err = h.engine.compose(&holder(), old, &requested).unwrap_err();
    assert_eq!(err, EngineError::Paused);
    assert_eq!(balance(&h.official, 0x020102), 1);
    assert_eq!(h.composite_balance(old), 1);

    // Read-only operations ignore the gate.
    let (base, preview) = h.engine.preview(old, &requested).unwrap();
    assert_eq!(base, BaseId::new(BASE));
    assert_eq!(h.engine.decode(old).0, base);

    h.engine.unpause(&admin()).unwrap();
    let new_id = h.engine.compose(&holder(), old, &requested).unwrap();
    assert_eq!(
        new_id,
        id("0x000000000201000000000000000000000000000000000000000901ffffffcc")
    );
    assert_eq!(new_id, preview);
    assert_eq!(balance(&h.official, 0x020102), 0);
}

#[test]
fn multi_collection_attach() {
    let h = Harness::new();
    let community = h.collection(2, "community");
    h.hold_composite(base_only());
    give(&community, &[0x010201, 0x090209]);
    give(&h.official, &FULL_LAYERS[1..8]);

    let mut raw = FULL_LAYERS;
    raw[0] = 0x010201;
    raw[8] = 0x090209;
    let new_id = h
        .engine
        .compose(&holder(), base_only(), &Layers::from(raw))
        .unwrap();

    assert_eq!(
        new_id,
        id("0x000102000201000301000401000501000601000701000801000902ffffffcc")
    );
    assert!(community.holdings(&holder()).unwrap().is_empty());
    assert!(h.official.holdings(&holder()).unwrap().is_empty());
}

#[test]
fn multi_collection_replace() {
    let h = Harness::new();
    let community = h.collection(2, "community");
    let old = id("0x000102000000000000000000000000000000000000000000000901ffffffcc");
    h.hold_composite(old);
    give(&community, &[0x020201]);
    give(&h.official, &[0x0a0109]);

    let requested = Layers::from([0x020201, 0, 0, 0, 0, 0, 0, 0, 0x0a0109]);
    let new_id = h.engine.compose(&holder(), old, &requested).unwrap();

    assert_eq!(
        new_id,
        id("0x000202000000000000000000000000000000000000000000000a01ffffffcc")
    );
    assert_eq!(community.holdings(&holder()).unwrap(), vec![(token(0x010201), 1)]);
    assert_eq!(h.official.holdings(&holder()).unwrap(), vec![(token(0x090109), 1)]);
}

#[test]
fn multi_collection_detach_all() {
    let h = Harness::new();
    let community = h.collection(2, "community");
    let old = id("0x000102000201000302000401000501000601000701000801000901ffffffcc");
    h.hold_composite(old);

    let new_id = h.engine.compose(&holder(), old, &Layers::empty()).unwrap();

    assert_eq!(new_id, base_only());
    assert_eq!(
        community.holdings(&holder()).unwrap(),
        vec![(token(0x010201), 1), (token(0x030203), 1)]
    );
    let official: Vec<u32> = [0x020102, 0x040104, 0x050105, 0x060106, 0x070107, 0x080108, 0x090109]
        .into_iter()
        .filter(|raw| balance(&h.official, *raw) == 1)
        .collect();
    assert_eq!(official.len(), 7);
}

#[test]
fn retarget_resolves_old_ids_against_the_new_ledger() {
    let h = Harness::new();
    let first = h.collection(2, "community-a");
    let old = id("0x000102000000000000000000000000000000000000000000000000ffffffcc");
    h.hold_composite(old);

    // Encoded while selector 2 pointed at `first`; now retarget it.
    let second = Arc::new(InMemoryLedger::new("community-b"));
    let previous = h
        .engine
        .set_collection(&admin(), Selector(2), second.clone())
        .unwrap();
    assert_eq!(previous.map(|p| p.name().to_string()), Some("community-a".into()));

    h.engine.compose(&holder(), old, &Layers::empty()).unwrap();

    assert_eq!(balance(&second, 0x010201), 1);
    assert_eq!(balance(&first, 0x010201), 0);
}

#[test]
fn unregistered_selector_is_rejected_atomically() {
    let h = Harness::new();
    let old = id("0x000102000000000000000000000000000000000000000000000901ffffffcc");
    h.hold_composite(old);

    // Slot 9 detach would succeed; slot 1 resolves nowhere.
    let err = h.engine.compose(&holder(), old, &Layers::empty()).unwrap_err();

    assert_eq!(
        err,
        EngineError::NotRegistered {
            selector: Selector(2),
            slot: Some(Slot::new(1).unwrap()),
        }
    );
    assert_eq!(balance(&h.official, 0x090109), 0);
    assert_eq!(h.composite_balance(old), 1);
}

#[test]
fn missing_composite_leaves_accessories_untouched() {
    let h = Harness::new();
    give(&h.official, &[0x010101]);

    let requested = Layers::from([0x010101, 0, 0, 0, 0, 0, 0, 0, 0]);
    let err = h.engine.compose(&holder(), base_only(), &requested).unwrap_err();

    assert!(matches!(
        err,
        EngineError::InsufficientBalance { ref ledger, balance: 0, requested: 1, .. }
            if ledger == "composites"
    ));
    assert_eq!(balance(&h.official, 0x010101), 1);
}

#[test]
fn invalid_layer_is_a_validation_error() {
    let h = Harness::new();
    h.hold_composite(base_only());
    // Owned, so the attach leg stages fine; the value claims slot 2.
    give(&h.official, &[0x010102]);

    let requested = Layers::from([0x010102, 0, 0, 0, 0, 0, 0, 0, 0]);
    let err = h.engine.compose(&holder(), base_only(), &requested).unwrap_err();

    assert!(matches!(
        err,
        EngineError::Validation(CodecError::SlotMismatch { .. })
    ));
    assert_eq!(balance(&h.official, 0x010102), 1);
    assert_eq!(h.composite_balance(base_only()), 1);
}

#[test]
fn stale_id_cannot_be_composed_again() {
    let h = Harness::new();
    let full = id(FULL);
    h.hold_composite(full);

    h.engine.compose(&holder(), full, &Layers::empty()).unwrap();
    let err = h.engine.compose(&holder(), full, &Layers::empty()).unwrap_err();

    assert!(matches!(err, EngineError::InsufficientBalance { .. }));
    for raw in FULL_LAYERS {
        assert_eq!(balance(&h.official, raw), 1);
    }
}

#[test]
fn only_the_holder_can_compose() {
    let h = Harness::new();
    let full = id(FULL);
    h.hold_composite(full);
    let stranger = Address::repeat_byte(0x99);

    let err = h.engine.compose(&stranger, full, &Layers::empty()).unwrap_err();
    assert!(matches!(err, EngineError::InsufficientBalance { owner, .. } if owner == stranger));
    assert!(h.official.holdings(&stranger).unwrap().is_empty());
}

#[test]
fn failing_accessory_ledger_leaves_the_composite_in_place() {
    let h = Harness::new();
    let community = Arc::new(OfflineLedger {
        store: InMemoryLedger::new("community"),
    });
    h.engine
        .set_collection(&admin(), Selector(2), community.clone())
        .unwrap();
    h.hold_composite(base_only());
    give(&community.store, &[0x010201]);

    let requested = Layers::from([0x010201, 0, 0, 0, 0, 0, 0, 0, 0]);
    let target = encode(BaseId::new(BASE), &requested).unwrap();
    let err = h.engine.compose(&holder(), base_only(), &requested).unwrap_err();

    assert!(matches!(
        err,
        EngineError::Ledger(LedgerError::Unavailable { ref ledger, .. }) if ledger == "community"
    ));
    assert_eq!(h.composite_balance(base_only()), 1);
    assert_eq!(h.composite_balance(target), 0);
    assert_eq!(balance(&community.store, 0x010201), 1);
    assert_eq!(h.engine.compositions(), 0);
}

#[test]
fn collections_cannot_be_retargeted_while_paused() {
    let h = Harness::new();
    h.engine.pause(&admin()).unwrap();
    let err = h
        .engine
        .set_collection(&admin(), Selector(2), Arc::new(InMemoryLedger::new("community")))
        .err()
        .expect("paused engine must refuse");
    assert_eq!(err, EngineError::Paused);
    assert!(!h.engine.registry().contains(Selector(2)));

    h.engine.unpause(&admin()).unwrap();
    h.collection(2, "community");
    assert!(h.engine.registry().contains(Selector(2)));
}

#[test]
fn set_collection_is_admin_only() {
    let h = Harness::new();
    let err = h
        .engine
        .set_collection(&holder(), Selector(2), Arc::new(InMemoryLedger::new("rogue")))
        .err()
        .expect("non-admin must be rejected");
    assert_eq!(err, EngineError::Unauthorized { caller: holder() });
    assert!(!h.engine.registry().contains(Selector(2)));
}

#[test]
fn events_describe_each_settled_composition() {
    let h = Harness::new();
    h.hold_composite(base_only());
    give(&h.official, &[0x010101, 0x090109]);
    let mut events = h.engine.subscribe();

    // A rejected call publishes nothing.
    let unowned = Layers::from([0, 0x020102, 0, 0, 0, 0, 0, 0, 0]);
    assert!(h.engine.compose(&holder(), base_only(), &unowned).is_err());
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));

    let requested = Layers::from([0x010101, 0, 0, 0, 0, 0, 0, 0, 0x090109]);
    let new_id = h.engine.compose(&holder(), base_only(), &requested).unwrap();

    let event = events.try_recv().unwrap();
    assert_eq!(event.sequence, 1);
    assert_eq!(event.caller, holder());
    assert_eq!(event.base_id, BaseId::new(BASE));
    assert_eq!(event.layers, requested);
    assert_eq!(event.composite_id, new_id);
    assert_eq!(event.previous_id, base_only());
    assert!(event.verify());
    assert_eq!(h.engine.compositions(), 1);
}

#[tokio::test]
async fn subscribers_receive_events_asynchronously() {
    let h = Harness::new();
    let full = id(FULL);
    h.hold_composite(full);
    let mut events = h.engine.subscribe();

    h.engine.compose(&holder(), full, &Layers::empty()).unwrap();

    let event = events.recv().await.unwrap();
    assert_eq!(event.composite_id, base_only());
    assert_eq!(event.layers.occupied(), 0);
}

#[test]
fn racing_calls_on_one_composite_settle_once() {
    let h = Harness::new();
    let full = id(FULL);
    h.hold_composite(full);
    let barrier = Barrier::new(2);

    let results: Vec<Result<CompositeId, EngineError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    h.engine.compose(&holder(), full, &Layers::empty())
                })
            })
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for raw in FULL_LAYERS {
        assert_eq!(balance(&h.official, raw), 1);
    }
    assert_eq!(h.composite_balance(base_only()), 1);
    assert_eq!(h.composite_balance(full), 0);
}

#[test]
fn two_composites_racing_for_one_accessory_settle_once() {
    let h = Harness::new();
    let bares = [
        base_only(),
        encode(BaseId::new(BASE - 1), &Layers::empty()).unwrap(),
    ];
    for bare in bares {
        h.hold_composite(bare);
    }
    give(&h.official, &[0x010101]);
    let requested = Layers::from([0x010101, 0, 0, 0, 0, 0, 0, 0, 0]);
    let barrier = Barrier::new(2);

    let (h, barrier, requested) = (&h, &barrier, &requested);
    let results: Vec<Result<CompositeId, EngineError>> = std::thread::scope(|scope| {
        let handles: Vec<_> = bares
            .iter()
            .map(|&bare| {
                scope.spawn(move || {
                    barrier.wait();
                    h.engine.compose(&holder(), bare, requested)
                })
            })
            .collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for (bare, result) in bares.iter().zip(&results) {
        match result {
            Ok(worn) => {
                assert_eq!(h.composite_balance(*bare), 0);
                assert_eq!(h.composite_balance(*worn), 1);
            }
            Err(_) => assert_eq!(h.composite_balance(*bare), 1),
        }
    }
    assert_eq!(balance(&h.official, 0x010101), 0);
    assert_eq!(h.composites.holdings(&holder()).unwrap().len(), 2);
}

proptest! {
    #[test]
    fn attach_then_detach_restores_every_balance(mask in any::<[bool; 9]>(), base in any::<u32>()) {
        let h = Harness::new();
        let bare = encode(BaseId::new(base), &Layers::empty()).unwrap();
        h.hold_composite(bare);

        let mut raw = [0u32; 9];
        for (i, wear) in mask.iter().enumerate() {
            if *wear {
                raw[i] = FULL_LAYERS[i];
                give(&h.official, &[FULL_LAYERS[i]]);
            }
        }
        let requested = Layers::from(raw);

        let worn = h.engine.compose(&holder(), bare, &requested).unwrap();
        prop_assert_eq!(decode(worn), (BaseId::new(base), requested));
        prop_assert!(h.official.holdings(&holder()).unwrap().is_empty());

        let back = h.engine.compose(&holder(), worn, &Layers::empty()).unwrap();
        prop_assert_eq!(back, bare);
        prop_assert_eq!(h.official.holdings(&holder()).unwrap().len(), requested.occupied());
        prop_assert_eq!(h.composite_balance(bare), 1);
    }
}
