use std::collections::{BTreeMap, BTreeSet};

use crate::person::{PersonId, PersonNode};

/// Transient classification of one visible node during an update cycle.
///
/// `Available` is the resting mark between cycles (visible and clickable);
/// classification assigns one of the other three to every node of the incoming
/// dataset, and finalization clears all marks back to neutral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeState {
    Available,
    New,
    Update,
    Remove,
}

/// Classify every node of `next` against the previously visible id set.
///
/// Placeholders (`xref == ""`) are always `Remove`: they are never emphasized
/// and never clickable. A node that was visible before stays as `Update`, any
/// other real person is `New`. Nodes visible before but absent from `next` are
/// not emitted here; see [`ReconcilePlan::build`] for the full contract.
pub fn classify(
    previous_visible: &BTreeSet<PersonId>,
    next: &[PersonNode],
) -> BTreeMap<PersonId, NodeState> {
    let mut states = BTreeMap::new();

    for node in next {
        let state = if node.is_placeholder() {
            NodeState::Remove
        } else if previous_visible.contains(&node.id) {
            NodeState::Update
        } else {
            NodeState::New
        };
        states.insert(node.id, state);
    }

    states
}

/// Explicit previous visual state handed to the reconciler, decoupling
/// classification from the scene representation.
#[derive(Clone, Debug, Default)]
pub struct PreviousState {
    /// Every person id present in the scene before this cycle.
    pub present: BTreeSet<PersonId>,
    /// Subset that was marked available (clickable) at the last finalization.
    pub available: BTreeSet<PersonId>,
}

/// One cycle's complete reconciliation: per-node classification plus the ids
/// that vanished from the dataset entirely and must leave the scene.
#[derive(Clone, Debug)]
pub struct ReconcilePlan {
    pub states: BTreeMap<PersonId, NodeState>,
    pub departed: Vec<PersonId>,
}

impl ReconcilePlan {
    /// Build the plan for one cycle. Computed once per cycle; every animation
    /// style decision afterwards reads from this value.
    pub fn build(previous: &PreviousState, next: &[PersonNode]) -> Self {
        let states = classify(&previous.available, next);

        let next_ids: BTreeSet<PersonId> = next.iter().map(|n| n.id).collect();
        let departed = previous
            .present
            .iter()
            .filter(|id| !next_ids.contains(id))
            .copied()
            .collect();

        Self { states, departed }
    }
}
