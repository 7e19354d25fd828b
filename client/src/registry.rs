//! Session-scoped entity registry.
//!
//! One registry exists per running client, created when the relay assigns
//! a connection id. Ids are drawn from a monotonic `u64` counter seeded at
//! `connection_id << 32`: strictly increasing within the session, and the
//! high bits keep independently allocating clients out of each other's id
//! space.

use std::collections::HashMap;

use shared::{Collider, Component, ComponentKind, Entity, Renderer};

pub struct Registry {
    client_id: u32,
    next_id: u64,
    entities: HashMap<u64, Entity>,
}

impl Registry {
    pub fn new(client_id: u32) -> Self {
        Self {
            client_id,
            next_id: (client_id as u64) << 32,
            entities: HashMap::new(),
        }
    }

    /// Allocates a fresh id without creating an entity. Projectiles share
    /// the entity id space but never live in the registry.
    pub fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Creates an entity with a fresh id, owned by the local connection.
    pub fn create(&mut self) -> u64 {
        let id = self.alloc_id();
        self.entities.insert(id, Entity::new(id, Some(self.client_id)));
        id
    }

    /// Adopts an entity announced or replayed by a peer, id and owner
    /// included.
    pub fn insert(&mut self, entity: Entity) {
        self.entities.insert(entity.id, entity);
    }

    pub fn get(&self, id: u64) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: u64) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn remove(&mut self, id: u64) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Colliders of server-owned level geometry, with their placements.
    /// Peer avatars are excluded: players pass through each other, only
    /// walls block movement.
    pub fn static_colliders(&self) -> impl Iterator<Item = (&Entity, &Collider)> {
        self.entities
            .values()
            .filter(|entity| entity.owner.is_none())
            .filter_map(|entity| {
                match entity.get_component(ComponentKind::Collider) {
                    Some(Component::Collider(collider)) => Some((entity, collider)),
                    _ => None,
                }
            })
    }

    /// Renderer components of server-owned level geometry, with their
    /// placements. Players are drawn from live state, not from here.
    pub fn static_renderers(&self) -> impl Iterator<Item = (&Entity, &Renderer)> {
        self.entities
            .values()
            .filter(|entity| entity.owner.is_none())
            .filter_map(|entity| {
                match entity.get_component(ComponentKind::Renderer) {
                    Some(Component::Renderer(renderer)) => Some((entity, renderer)),
                    _ => None,
                }
            })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::Vec2;

    #[test]
    fn test_ids_are_monotonic_and_partitioned() {
        let mut registry = Registry::new(3);

        let first = registry.create();
        let second = registry.create();

        assert_eq!(first, 3u64 << 32);
        assert_eq!(second, first + 1);
    }

    #[test]
    fn test_distinct_clients_never_collide() {
        let mut a = Registry::new(1);
        let mut b = Registry::new(2);

        let a_ids: Vec<u64> = (0..100).map(|_| a.alloc_id()).collect();
        let b_ids: Vec<u64> = (0..100).map(|_| b.alloc_id()).collect();

        for id in &a_ids {
            assert!(!b_ids.contains(id));
        }
    }

    #[test]
    fn test_created_entity_owned_locally() {
        let mut registry = Registry::new(7);
        let id = registry.create();

        assert_eq!(registry.get(id).unwrap().owner, Some(7));
    }

    #[test]
    fn test_insert_preserves_remote_identity() {
        let mut registry = Registry::new(1);

        let mut remote = Entity::new((9u64 << 32) | 4, Some(9));
        remote.position = Vec2::new(1.0, 2.0);
        registry.insert(remote);

        let adopted = registry.get((9u64 << 32) | 4).unwrap();
        assert_eq!(adopted.owner, Some(9));
        assert_eq!(adopted.position, Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_remove() {
        let mut registry = Registry::new(1);
        let id = registry.create();

        assert!(registry.remove(id).is_some());
        assert!(registry.get(id).is_none());
        assert!(registry.remove(id).is_none());
    }

    #[test]
    fn test_static_colliders_skip_owned_entities() {
        let mut registry = Registry::new(1);

        let mut wall = Entity::new(0, None);
        wall.add_component(Component::Collider(Collider::Segment {
            start: Vec2::new(0.0, -1.0),
            end: Vec2::new(0.0, 1.0),
        }));
        registry.insert(wall);

        let avatar_id = registry.create();
        registry
            .get_mut(avatar_id)
            .unwrap()
            .add_component(Component::Collider(Collider::Circle { radius: 0.5 }));

        let colliders: Vec<_> = registry.static_colliders().collect();
        assert_eq!(colliders.len(), 1);
        assert_eq!(colliders[0].0.id, 0);
    }
}
