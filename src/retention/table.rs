use super::{RetentionFlags, RetentionState, Retainable};
use crate::graph::{Entity, EntityId, Program};
use std::collections::BTreeMap;

/// Retention records for every entity of a program, keyed by entity id.
///
/// Cloning a table is the snapshot mechanism: two tables compare equal when
/// every entity carries bit-identical state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionTable {
    states: BTreeMap<EntityId, RetentionState>,
}

impl RetentionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table with a default record for every entity of `program`
    pub fn for_program(program: &Program) -> Self {
        let mut table = Self::new();
        table.sync(program);
        table
    }

    /// Add default records for new entities and drop records of removed ones
    pub fn sync(&mut self, program: &Program) {
        self.states.retain(|id, _| program.contains(*id));
        for id in program.entity_ids() {
            self.states.entry(id).or_default();
        }
    }

    /// Record of an entity; unknown entities read as the default record
    pub fn get(&self, id: EntityId) -> RetentionState {
        self.states.get(&id).copied().unwrap_or_default()
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> &mut RetentionState {
        self.states.entry(id).or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &RetentionState)> {
        self.states.iter().map(|(id, state)| (*id, state))
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of entities carrying every bit of `flags`
    pub fn count(&self, flags: RetentionFlags) -> usize {
        self.states.values().filter(|s| s.flags().contains(flags)).count()
    }

    /// Drop every configuration and reachability bit
    pub(crate) fn reset(&mut self) {
        for state in self.states.values_mut() {
            *state = RetentionState::default();
        }
    }

    pub(crate) fn clear_reachability(&mut self) {
        for state in self.states.values_mut() {
            state.clear_reachable();
        }
    }

    /// Configuration bits only, for checking that marking left them alone
    pub fn configuration(&self) -> BTreeMap<EntityId, RetentionFlags> {
        self.states
            .iter()
            .map(|(id, state)| (*id, state.flags() & RetentionFlags::CONFIGURATION))
            .collect()
    }
}

/// An entity paired with its retention record
#[derive(Debug, Clone, Copy)]
pub struct Retained<'a> {
    pub entity: &'a Entity,
    pub state: RetentionState,
}

impl Retainable for Retained<'_> {
    fn retention(&self) -> &RetentionState {
        &self.state
    }
}
