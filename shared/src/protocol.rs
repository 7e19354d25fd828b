//! Wire protocol between clients and the relay.
//!
//! One bincode-encoded [`Message`] per UDP datagram. The relay treats most
//! messages as fan-out: it rebroadcasts them to every other registered
//! connection, persisting into the world snapshot only where noted. It
//! never validates payload contents: adjudication authority for combat
//! rests entirely with the firing client.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Projectile};
use crate::vec2::Vec2;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Message {
    // Connection lifecycle
    Connect {
        client_version: u32,
    },
    Connected {
        client_id: u32,
    },
    Disconnected {
        reason: String,
    },
    Disconnect,
    Heartbeat {
        timestamp: u64,
    },

    /// Announces a new entity. The relay persists it into the snapshot when
    /// `persist` is set; receiving clients ignore the flag.
    CreateEntity {
        entity: Entity,
        persist: bool,
    },
    /// Mirrors a fired projectile to peers. Never persisted.
    CreateProjectile {
        projectile: Projectile,
    },
    /// Moves a previously created entity. The relay updates the stored
    /// position when the id is known and rebroadcasts either way.
    MoveEntity {
        id: u64,
        position: Vec2,
    },
    /// A hit adjudicated by the firing client. `target` is the avatar
    /// entity id of the player that was hit. Relayed without validation.
    ProjectileHit {
        owner: u32,
        projectile_id: u64,
        target: u64,
    },
    /// Tells peers that an entity is gone, sent on its owner's disconnect.
    DestroyEntity {
        id: u64,
    },
    /// Colour cycle, attributed by the sender itself.
    ChangeColour {
        client_id: u32,
        colour: u8,
    },
}
