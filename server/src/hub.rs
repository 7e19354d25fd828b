//! Protocol side effects of the relay, separated from socket I/O.
//!
//! The hub owns the world snapshot and turns every inbound event into a
//! list of [`Action`]s (direct replies and fan-out broadcasts) that the
//! network layer executes. Keeping the decision logic free of sockets is
//! what makes the synchronization contract testable.

use log::{debug, warn};

use shared::{Entity, Message, Vec2};

use crate::snapshot::WorldSnapshot;

/// An outbound instruction produced by the hub.
#[derive(Debug, Clone)]
pub enum Action {
    Send { to: u32, message: Message },
    Broadcast { exclude: Option<u32>, message: Message },
}

pub struct Hub {
    snapshot: WorldSnapshot,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            snapshot: WorldSnapshot::new(),
        }
    }

    /// Seeds the snapshot with server-owned level entities before any
    /// client connects, so every joiner replays the same arena.
    pub fn with_entities(entities: Vec<Entity>) -> Self {
        let mut snapshot = WorldSnapshot::new();
        for entity in entities {
            snapshot.insert(entity);
        }
        Self { snapshot }
    }

    pub fn snapshot(&self) -> &WorldSnapshot {
        &self.snapshot
    }

    /// Handshake for a freshly registered connection: the acknowledgement,
    /// then the entire current world replayed as one create per stored
    /// entity, in insertion order. Full replay is the only catch-up
    /// mechanism; there is no delta sync.
    pub fn on_connect(&self, client_id: u32) -> Vec<Action> {
        let mut actions = vec![Action::Send {
            to: client_id,
            message: Message::Connected { client_id },
        }];

        for entity in self.snapshot.snapshot_all() {
            actions.push(Action::Send {
                to: client_id,
                message: Message::CreateEntity {
                    entity: entity.clone(),
                    persist: false,
                },
            });
        }

        actions
    }

    /// Applies one gameplay message from `from` and decides what goes out.
    ///
    /// The relay never validates payload contents. In particular a
    /// `ProjectileHit` is rebroadcast regardless of plausibility:
    /// adjudication authority rests with the firing client, an accepted
    /// trust gap rather than an oversight.
    pub fn handle(&mut self, from: u32, message: Message) -> Vec<Action> {
        match message {
            Message::CreateEntity { entity, persist } => {
                if persist {
                    debug!("Persisting entity {} for client {}", entity.id, from);
                    self.snapshot.insert(entity.clone());
                }
                vec![Action::Broadcast {
                    exclude: Some(from),
                    message: Message::CreateEntity { entity, persist },
                }]
            }

            Message::MoveEntity { id, position } => {
                self.snapshot.update_moved(id, position);
                vec![Action::Broadcast {
                    exclude: Some(from),
                    message: Message::MoveEntity { id, position },
                }]
            }

            message @ (Message::CreateProjectile { .. }
            | Message::ProjectileHit { .. }
            | Message::ChangeColour { .. }) => {
                vec![Action::Broadcast {
                    exclude: Some(from),
                    message,
                }]
            }

            Message::Heartbeat { .. } => Vec::new(),

            other => {
                warn!("Unexpected message from client {}: {:?}", from, other);
                Vec::new()
            }
        }
    }

    /// Cleanup for a closed connection: drop the first snapshot entry the
    /// connection owned and tell everyone else it is gone. A connection
    /// with nothing persisted disconnects silently.
    pub fn on_disconnect(&mut self, client_id: u32) -> Vec<Action> {
        match self.snapshot.remove_first_owned_by(client_id) {
            Some(entity_id) => vec![Action::Broadcast {
                exclude: Some(client_id),
                message: Message::DestroyEntity { id: entity_id },
            }],
            None => Vec::new(),
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds a wall: a server-owned entity with a segment collider and the
/// matching line renderer, endpoints relative to the entity position.
pub fn wall_entity(id: u64, start: Vec2, end: Vec2) -> Entity {
    use shared::{Collider, Component, Renderer};

    let mut entity = Entity::new(id, None);
    entity.add_component(Component::Collider(Collider::Segment { start, end }));
    entity.add_component(Component::Renderer(Renderer::Line { start, end }));
    entity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avatar(id: u64, owner: u32, x: f32, y: f32) -> Entity {
        let mut entity = Entity::new(id, Some(owner));
        entity.position = Vec2::new(x, y);
        entity
    }

    fn broadcasts(actions: &[Action]) -> Vec<&Message> {
        actions
            .iter()
            .filter_map(|action| match action {
                Action::Broadcast { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_connect_acknowledges_then_replays() {
        let mut hub = Hub::new();
        hub.handle(
            1,
            Message::CreateEntity {
                entity: avatar(1, 1, 0.0, 0.0),
                persist: true,
            },
        );

        let actions = hub.on_connect(2);
        assert_eq!(actions.len(), 2);

        match &actions[0] {
            Action::Send {
                to: 2,
                message: Message::Connected { client_id: 2 },
            } => {}
            other => panic!("Expected Connected first, got {:?}", other),
        }

        match &actions[1] {
            Action::Send {
                to: 2,
                message: Message::CreateEntity { entity, .. },
            } => {
                assert_eq!(entity.id, 1);
                assert_eq!(entity.owner, Some(1));
                assert_eq!(entity.position, Vec2::ZERO);
            }
            other => panic!("Expected replayed create, got {:?}", other),
        }
    }

    #[test]
    fn test_create_without_persist_not_stored() {
        let mut hub = Hub::new();
        let actions = hub.handle(
            1,
            Message::CreateEntity {
                entity: avatar(1, 1, 0.0, 0.0),
                persist: false,
            },
        );

        assert!(hub.snapshot().is_empty());
        assert_eq!(broadcasts(&actions).len(), 1);
    }

    #[test]
    fn test_create_broadcast_excludes_sender() {
        let mut hub = Hub::new();
        let actions = hub.handle(
            3,
            Message::CreateEntity {
                entity: avatar(1, 3, 0.0, 0.0),
                persist: true,
            },
        );

        match &actions[..] {
            [Action::Broadcast { exclude, .. }] => assert_eq!(*exclude, Some(3)),
            other => panic!("Expected a single broadcast, got {:?}", other),
        }
    }

    #[test]
    fn test_move_updates_store_and_later_joiners() {
        let mut hub = Hub::new();
        hub.handle(
            1,
            Message::CreateEntity {
                entity: avatar(1, 1, 0.0, 0.0),
                persist: true,
            },
        );
        hub.handle(
            1,
            Message::MoveEntity {
                id: 1,
                position: Vec2::new(3.0, 4.0),
            },
        );

        // A connection joining now replays the moved position, not the
        // original one.
        let replay = hub.on_connect(5);
        match &replay[1] {
            Action::Send {
                message: Message::CreateEntity { entity, .. },
                ..
            } => assert_eq!(entity.position, Vec2::new(3.0, 4.0)),
            other => panic!("Expected replayed create, got {:?}", other),
        }
    }

    #[test]
    fn test_move_unknown_id_still_rebroadcast() {
        let mut hub = Hub::new();
        let actions = hub.handle(
            1,
            Message::MoveEntity {
                id: 42,
                position: Vec2::new(1.0, 1.0),
            },
        );

        assert!(hub.snapshot().is_empty());
        assert_eq!(broadcasts(&actions).len(), 1);
    }

    #[test]
    fn test_projectile_hit_pure_rebroadcast() {
        let mut hub = Hub::new();
        hub.handle(
            1,
            Message::CreateEntity {
                entity: avatar(1, 1, 0.0, 0.0),
                persist: true,
            },
        );

        // Implausible hit from a client that owns nothing: relayed anyway,
        // snapshot untouched.
        let actions = hub.handle(
            9,
            Message::ProjectileHit {
                owner: 9,
                projectile_id: 1234,
                target: 1,
            },
        );

        assert_eq!(hub.snapshot().len(), 1);
        match &actions[..] {
            [Action::Broadcast {
                exclude: Some(9),
                message: Message::ProjectileHit { target: 1, .. },
            }] => {}
            other => panic!("Expected unvalidated rebroadcast, got {:?}", other),
        }
    }

    #[test]
    fn test_disconnect_removes_entry_and_broadcasts_once() {
        let mut hub = Hub::new();
        hub.handle(
            1,
            Message::CreateEntity {
                entity: avatar(1, 1, 0.0, 0.0),
                persist: true,
            },
        );
        hub.handle(
            2,
            Message::CreateEntity {
                entity: avatar((2 << 32) | 1, 2, 1.0, 1.0),
                persist: true,
            },
        );

        let actions = hub.on_disconnect(1);

        assert_eq!(hub.snapshot().len(), 1);
        match &actions[..] {
            [Action::Broadcast {
                message: Message::DestroyEntity { id: 1 },
                ..
            }] => {}
            other => panic!("Expected one destroy broadcast, got {:?}", other),
        }
    }

    #[test]
    fn test_disconnect_without_entity_is_silent() {
        let mut hub = Hub::new();
        assert!(hub.on_disconnect(7).is_empty());
    }

    #[test]
    fn test_disconnect_orphans_second_owned_entity() {
        // Known gap, kept on purpose: the store assumes one persisted
        // entity per connection and removes only the first. A second owned
        // entity stays in the snapshot with no owner to clean it up.
        let mut hub = Hub::new();
        hub.handle(
            1,
            Message::CreateEntity {
                entity: avatar(1, 1, 0.0, 0.0),
                persist: true,
            },
        );
        hub.handle(
            1,
            Message::CreateEntity {
                entity: avatar(2, 1, 5.0, 5.0),
                persist: true,
            },
        );

        let actions = hub.on_disconnect(1);

        assert_eq!(actions.len(), 1);
        assert_eq!(hub.snapshot().len(), 1);
        assert!(hub.snapshot().find_by_id(2).is_some());
    }

    #[test]
    fn test_seeded_walls_replay_before_avatars() {
        let mut hub = Hub::with_entities(vec![wall_entity(
            0,
            Vec2::new(-4.0, -6.0),
            Vec2::new(-4.0, 6.0),
        )]);
        hub.handle(
            1,
            Message::CreateEntity {
                entity: avatar((1 << 32) | 0, 1, 0.0, 0.0),
                persist: true,
            },
        );

        let actions = hub.on_connect(2);
        assert_eq!(actions.len(), 3);
        match &actions[1] {
            Action::Send {
                message: Message::CreateEntity { entity, .. },
                ..
            } => assert_eq!(entity.owner, None),
            other => panic!("Expected the wall first, got {:?}", other),
        }
    }

    #[test]
    fn test_heartbeat_has_no_side_effects() {
        let mut hub = Hub::new();
        let actions = hub.handle(1, Message::Heartbeat { timestamp: 123 });
        assert!(actions.is_empty());
        assert!(hub.snapshot().is_empty());
    }
}
