use std::sync::atomic::{AtomicU64, Ordering};

use composer_types::{Address, BaseId, CompositeId, Layers};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Content-addressed identifier of a composition event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub hash: [u8; 32],
}

impl EventId {
    pub fn from_hash(hash: [u8; 32]) -> Self {
        Self { hash }
    }

    /// First 8 hex chars.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.hash[..4])
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evt:{}", self.short_hex())
    }
}

/// Emitted once per successful composition, after every ledger committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionEvent {
    /// BLAKE3 over the sequence number and the fields below.
    pub id: EventId,
    /// Per-engine counter, starting at 1.
    pub sequence: u64,
    pub caller: Address,
    pub base_id: BaseId,
    /// The layers now encoded in `composite_id`.
    pub layers: Layers,
    pub composite_id: CompositeId,
    /// The composite that was burned.
    pub previous_id: CompositeId,
}

impl CompositionEvent {
    pub fn new(
        sequence: u64,
        caller: Address,
        base_id: BaseId,
        layers: Layers,
        composite_id: CompositeId,
        previous_id: CompositeId,
    ) -> Self {
        let id = EventId::from_hash(Self::compute_id(
            sequence,
            &caller,
            base_id,
            &layers,
            composite_id,
            previous_id,
        ));
        Self {
            id,
            sequence,
            caller,
            base_id,
            layers,
            composite_id,
            previous_id,
        }
    }

    /// True if `id` still matches the event's content.
    pub fn verify(&self) -> bool {
        self.id.hash
            == Self::compute_id(
                self.sequence,
                &self.caller,
                self.base_id,
                &self.layers,
                self.composite_id,
                self.previous_id,
            )
    }

    fn compute_id(
        sequence: u64,
        caller: &Address,
        base_id: BaseId,
        layers: &Layers,
        composite_id: CompositeId,
        previous_id: CompositeId,
    ) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"composer-event-v1:");
        hasher.update(&sequence.to_le_bytes());
        hasher.update(caller.as_bytes());
        hasher.update(&base_id.get().to_le_bytes());
        for raw in layers.to_raw() {
            hasher.update(&raw.to_le_bytes());
        }
        let mut word = [0u8; 32];
        composite_id.as_u256().to_big_endian(&mut word);
        hasher.update(&word);
        previous_id.as_u256().to_big_endian(&mut word);
        hasher.update(&word);
        *hasher.finalize().as_bytes()
    }
}

/// Receiver half handed to subscribers.
pub type EventStream = broadcast::Receiver<CompositionEvent>;

/// Fan-out of composition events.
///
/// Publishing never blocks and never fails: with no subscribers the event is
/// dropped, and slow subscribers observe `RecvError::Lagged`.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<CompositionEvent>,
    sequence: AtomicU64,
}

impl EventBus {
    /// `capacity` must be non-zero.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            sequence: AtomicU64::new(0),
        }
    }

    /// Reserve the next sequence number.
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Send to all current subscribers; returns how many received it.
    pub fn publish(&self, event: CompositionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> EventStream {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Events published so far.
    pub fn published(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }
}
