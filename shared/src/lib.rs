//! Types shared between the relay and the client: the wire protocol, the
//! entity/component data model, and the collision geometry both sides use.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub mod entity;
pub mod geometry;
pub mod protocol;
pub mod vec2;

pub use entity::{Collider, Component, ComponentKind, Entity, Projectile, Renderer};
pub use geometry::segment_circle_intersects;
pub use protocol::Message;
pub use vec2::Vec2;

pub const PROTOCOL_VERSION: u32 = 1;

/// World space spans `[-WORLD_WIDTH / 2, WORLD_WIDTH / 2]` horizontally and
/// the same vertically; the arena is a centered square.
pub const WORLD_WIDTH: f32 = 20.0;
pub const WORLD_HEIGHT: f32 = 20.0;

pub const PLAYER_RADIUS: f32 = 0.5;
/// World units per second of held movement.
pub const PLAYER_SPEED: f32 = 4.0;
pub const PROJECTILE_SPEED: f32 = 50.0;
/// Seconds between shots while attack is held.
pub const ATTACK_INTERVAL: f32 = 0.5;
/// Size of the player colour palette; colour indices wrap at this value.
pub const COLOUR_COUNT: u8 = 7;

/// Current wall-clock time in milliseconds, for heartbeat payloads.
pub fn timestamp_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_millis() as u64
}
