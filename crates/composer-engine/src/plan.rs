use composer_types::{LayerValue, Layers, Slot};
use serde::{Deserialize, Serialize};

/// What a composition does to one slot.
///
/// A requested zero always means "empty this slot"; there is no
/// leave-unchanged sentinel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SlotTransition {
    /// Old and requested values are equal (including both empty).
    Unchanged,
    /// Empty slot receives an accessory; the holder's token is burned.
    Attach { value: LayerValue },
    /// Occupied slot is emptied; the accessory is minted back to the holder.
    Detach { value: LayerValue },
    /// One accessory is swapped for another: detach, then attach.
    Replace { from: LayerValue, to: LayerValue },
}

impl SlotTransition {
    /// Classify the move from `old` to `requested`.
    pub fn between(old: LayerValue, requested: LayerValue) -> Self {
        match (old.is_empty(), requested.is_empty()) {
            _ if old == requested => Self::Unchanged,
            (true, false) => Self::Attach { value: requested },
            (false, true) => Self::Detach { value: old },
            _ => Self::Replace {
                from: old,
                to: requested,
            },
        }
    }

    /// The value returned to the holder, if any.
    pub fn detached(&self) -> Option<LayerValue> {
        match *self {
            Self::Detach { value } => Some(value),
            Self::Replace { from, .. } => Some(from),
            _ => None,
        }
    }

    /// The value taken from the holder, if any.
    pub fn attached(&self) -> Option<LayerValue> {
        match *self {
            Self::Attach { value } => Some(value),
            Self::Replace { to, .. } => Some(to),
            _ => None,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        matches!(self, Self::Unchanged)
    }
}

/// Diff every slot, in ascending slot order.
pub fn plan_transitions(old: &Layers, requested: &Layers) -> Vec<(Slot, SlotTransition)> {
    old.iter()
        .zip(requested.iter())
        .map(|((slot, from), (_, to))| (slot, SlotTransition::between(from, to)))
        .collect()
}
