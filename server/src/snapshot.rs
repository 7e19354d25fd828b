//! The relay's in-memory record of every persisted entity's last known
//! state, the single source of truth new connections synchronize against.

use std::collections::HashMap;

use shared::{Entity, Vec2};

/// World snapshot store.
///
/// Entities are kept decoded in insertion order (replay order for late
/// joiners) with a side index from id to slot, so lookups never re-parse a
/// record. Owner lookups still scan linearly; that is an accepted
/// small-world trade-off, not something to optimize away silently.
#[derive(Debug, Default)]
pub struct WorldSnapshot {
    entities: Vec<Entity>,
    index: HashMap<u64, usize>,
}

impl WorldSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entity at the end of the replay order.
    ///
    /// An entity re-announced under an existing id replaces the stored
    /// record in place; live ids are unique per session, so this only
    /// happens when a client re-sends its own create.
    pub fn insert(&mut self, entity: Entity) {
        if let Some(&slot) = self.index.get(&entity.id) {
            self.entities[slot] = entity;
            return;
        }

        self.index.insert(entity.id, self.entities.len());
        self.entities.push(entity);
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Entity> {
        self.index.get(&id).map(|&slot| &self.entities[slot])
    }

    /// Updates the stored position of `id`. Unknown ids are a silent no-op:
    /// a move can legitimately arrive for an entity that was never
    /// persisted or is already gone.
    pub fn update_moved(&mut self, id: u64, position: Vec2) {
        if let Some(&slot) = self.index.get(&id) {
            self.entities[slot].position = position;
        }
    }

    /// Removes the first stored entity owned by `owner` and returns its id.
    ///
    /// Only the first match is removed; the store assumes one persisted
    /// entity per connection. No match is a no-op, not a fault.
    pub fn remove_first_owned_by(&mut self, owner: u32) -> Option<u64> {
        let slot = self
            .entities
            .iter()
            .position(|entity| entity.owner == Some(owner))?;

        let removed = self.entities.remove(slot);
        self.index.remove(&removed.id);

        // Slots after the removed one shifted down by one.
        for entity in &self.entities[slot..] {
            if let Some(s) = self.index.get_mut(&entity.id) {
                *s -= 1;
            }
        }

        Some(removed.id)
    }

    /// All stored entities in replay order. Called once per new connection.
    pub fn snapshot_all(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
