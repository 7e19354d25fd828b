//! Local simulation: the per-frame tick that moves the player, fires and
//! sweeps projectiles, adjudicates hits against cached peers, and keeps
//! the rest of the arena in sync through protocol messages.
//!
//! The world never touches a socket. Everything it wants sent goes into an
//! outbox the glue layer drains after each tick, and everything received
//! is applied through [`World::apply`].

use std::collections::HashMap;

use log::{debug, info, warn};
use rand::Rng;

use shared::{
    segment_circle_intersects, Component, Entity, Message, Projectile, Renderer, Vec2,
    ATTACK_INTERVAL, COLOUR_COUNT, PLAYER_RADIUS, PLAYER_SPEED, PROJECTILE_SPEED, WORLD_HEIGHT,
    WORLD_WIDTH,
};

use crate::registry::Registry;

/// What the presentation layer feeds the simulation each tick.
#[derive(Debug, Clone, Default)]
pub struct HeldInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub attack: bool,
    /// World-space point the player is aiming at.
    pub aim: Vec2,
    /// Edge-triggered: cycle to the next palette colour this tick.
    pub cycle_colour: bool,
}

/// Cache of another connection's publicly visible state, kept in sync
/// purely by incoming protocol messages.
#[derive(Debug, Clone)]
pub struct Peer {
    pub client_id: u32,
    pub entity_id: u64,
    pub position: Vec2,
    pub colour: u8,
    pub hits_taken: u32,
}

/// Client-side state that only exists once the relay has acknowledged the
/// connection and assigned an identity.
struct Session {
    client_id: u32,
    avatar_id: u64,
    registry: Registry,
}

pub struct World {
    session: Option<Session>,

    position: Vec2,
    previous: Vec2,
    colour: u8,
    hits_taken: u32,
    attack_cooldown: f32,

    projectiles: Vec<Projectile>,
    peers: HashMap<u32, Peer>,
    outbox: Vec<Message>,
}

impl World {
    pub fn new() -> Self {
        Self {
            session: None,
            position: Vec2::ZERO,
            previous: Vec2::ZERO,
            colour: 0,
            hits_taken: 0,
            attack_cooldown: 0.0,
            projectiles: Vec::new(),
            peers: HashMap::new(),
            outbox: Vec::new(),
        }
    }

    /// Begins the session: seeds the registry with the assigned id, spawns
    /// the avatar at `spawn`, and announces it for persistence so late
    /// joiners replay it.
    pub fn start_session(&mut self, client_id: u32, spawn: Vec2) {
        let mut registry = Registry::new(client_id);

        let avatar_id = registry.create();
        let avatar = registry.get_mut(avatar_id).expect("just created");
        avatar.position = spawn;
        avatar.add_component(Component::Collider(shared::Collider::Circle {
            radius: PLAYER_RADIUS,
        }));
        avatar.add_component(Component::Renderer(Renderer::Circle {
            radius: PLAYER_RADIUS,
            colour: self.colour,
        }));

        self.outbox.push(Message::CreateEntity {
            entity: avatar.clone(),
            persist: true,
        });

        self.position = spawn;
        self.previous = spawn;
        self.session = Some(Session {
            client_id,
            avatar_id,
            registry,
        });

        info!("Session started as client {} at {:?}", client_id, spawn);
    }

    /// Applies one message received from the relay.
    pub fn apply(&mut self, message: Message) {
        match message {
            Message::Connected { client_id } => {
                self.start_session(client_id, random_spawn());
            }

            Message::Disconnected { reason } => {
                warn!("Relay dropped us: {}", reason);
                self.session = None;
            }

            Message::CreateEntity { entity, .. } => self.apply_create(entity),

            Message::CreateProjectile { projectile } => {
                self.projectiles.push(projectile);
            }

            Message::MoveEntity { id, position } => {
                if let Some(peer) = self.peers.values_mut().find(|p| p.entity_id == id) {
                    peer.position = position;
                }
                if let Some(session) = &mut self.session {
                    if let Some(entity) = session.registry.get_mut(id) {
                        entity.position = position;
                    }
                }
            }

            Message::ProjectileHit {
                owner,
                projectile_id,
                target,
            } => {
                if let Some(projectile) =
                    self.projectiles.iter_mut().find(|p| p.id == projectile_id)
                {
                    projectile.destroyed = true;
                }

                let own_avatar = self.session.as_ref().map(|s| s.avatar_id);
                if own_avatar == Some(target) {
                    self.hits_taken += 1;
                    debug!("Hit by client {} ({} total)", owner, self.hits_taken);
                } else if let Some(peer) =
                    self.peers.values_mut().find(|p| p.entity_id == target)
                {
                    peer.hits_taken += 1;
                }
            }

            Message::DestroyEntity { id } => {
                if let Some(session) = &mut self.session {
                    session.registry.remove(id);
                }
                self.peers.retain(|_, peer| peer.entity_id != id);
            }

            Message::ChangeColour { client_id, colour } => {
                if let Some(peer) = self.peers.get_mut(&client_id) {
                    peer.colour = colour % COLOUR_COUNT;
                }
            }

            other => {
                debug!("Ignoring unexpected message: {:?}", other);
            }
        }
    }

    fn apply_create(&mut self, entity: Entity) {
        let Some(session) = &mut self.session else {
            // Replay raced ahead of the acknowledgement; with no identity
            // yet there is nowhere to put this.
            debug!("Dropping entity {} received before session start", entity.id);
            return;
        };

        match entity.owner {
            Some(owner) if owner == session.client_id => {
                debug!("Ignoring echo of our own entity {}", entity.id);
            }
            Some(owner) => {
                let colour = entity
                    .components
                    .iter()
                    .find_map(|component| match component {
                        Component::Renderer(Renderer::Circle { colour, .. }) => Some(*colour),
                        _ => None,
                    })
                    .unwrap_or(0);

                self.peers.insert(
                    owner,
                    Peer {
                        client_id: owner,
                        entity_id: entity.id,
                        position: entity.position,
                        colour,
                        hits_taken: 0,
                    },
                );
                session.registry.insert(entity);
            }
            None => {
                // Server-owned level geometry.
                session.registry.insert(entity);
            }
        }
    }

    /// One logical frame of the simulation.
    ///
    /// Before the session starts there is nothing to simulate; input is
    /// ignored until the relay assigns an identity.
    pub fn tick(&mut self, dt: f32, input: &HeldInput) {
        // The attack timer only ever decreases toward zero; it refills
        // when a shot actually fires.
        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);

        let Some(session) = self.session.as_mut() else {
            return;
        };

        // Movement: held directions, clamped to the arena, reverted if the
        // resulting circle would cut through level geometry.
        self.previous = self.position;
        let mut candidate = self.position;

        if input.up {
            candidate.y -= PLAYER_SPEED * dt;
        }
        if input.down {
            candidate.y += PLAYER_SPEED * dt;
        }
        if input.left {
            candidate.x -= PLAYER_SPEED * dt;
        }
        if input.right {
            candidate.x += PLAYER_SPEED * dt;
        }

        let max_x = WORLD_WIDTH / 2.0 - PLAYER_RADIUS;
        let max_y = WORLD_HEIGHT / 2.0 - PLAYER_RADIUS;
        candidate.x = candidate.x.clamp(-max_x, max_x);
        candidate.y = candidate.y.clamp(-max_y, max_y);

        let blocked = session
            .registry
            .static_colliders()
            .any(|(entity, collider)| {
                collider.intersects_circle(entity.position, candidate, PLAYER_RADIUS)
            });
        if !blocked {
            self.position = candidate;
        }

        if self.position != self.previous {
            if let Some(avatar) = session.registry.get_mut(session.avatar_id) {
                avatar.position = self.position;
            }
            self.outbox.push(Message::MoveEntity {
                id: session.avatar_id,
                position: self.position,
            });
        }

        if input.cycle_colour {
            self.colour = (self.colour + 1) % COLOUR_COUNT;
            self.outbox.push(Message::ChangeColour {
                client_id: session.client_id,
                colour: self.colour,
            });
        }

        // Firing: spawn at the rim of the player circle, aimed at the
        // target point.
        if input.attack && self.attack_cooldown <= 0.0 {
            let direction = (input.aim - self.position).normalized();
            if direction != Vec2::ZERO {
                let projectile = Projectile::new(
                    session.registry.alloc_id(),
                    session.client_id,
                    self.position + direction * PLAYER_RADIUS,
                    direction,
                    PROJECTILE_SPEED,
                );

                self.outbox.push(Message::CreateProjectile {
                    projectile: projectile.clone(),
                });
                self.projectiles.push(projectile);
                self.attack_cooldown += ATTACK_INTERVAL;
            }
        }

        // Sweep every live projectile forward one tick.
        for projectile in &mut self.projectiles {
            if !projectile.destroyed {
                projectile.advance(dt);
            }
        }

        // Hit detection: each client adjudicates only its own projectiles,
        // against every known peer. The swept tail..head segment is the
        // collision shape, so fast projectiles cannot tunnel through a
        // player between ticks.
        let local_id = session.client_id;
        for projectile in &mut self.projectiles {
            if projectile.owner != local_id || projectile.destroyed {
                continue;
            }

            for peer in self.peers.values_mut() {
                if segment_circle_intersects(
                    projectile.tail,
                    projectile.head,
                    peer.position,
                    PLAYER_RADIUS,
                ) {
                    projectile.destroyed = true;
                    peer.hits_taken += 1;
                    self.outbox.push(Message::ProjectileHit {
                        owner: local_id,
                        projectile_id: projectile.id,
                        target: peer.entity_id,
                    });
                }
            }
        }

        self.projectiles.retain(|projectile| !projectile.destroyed);
    }

    /// Messages emitted since the last drain, in emission order.
    pub fn drain_outbox(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.outbox)
    }

    pub fn client_id(&self) -> Option<u32> {
        self.session.as_ref().map(|session| session.client_id)
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn colour(&self) -> u8 {
        self.colour
    }

    pub fn hits_taken(&self) -> u32 {
        self.hits_taken
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.values()
    }

    /// Renderer components of server-owned level geometry.
    pub fn scenery(&self) -> impl Iterator<Item = (&Entity, &Renderer)> {
        self.session
            .iter()
            .flat_map(|session| session.registry.static_renderers())
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniformly random in-bounds spawn point.
fn random_spawn() -> Vec2 {
    let mut rng = rand::thread_rng();
    let max_x = WORLD_WIDTH / 2.0 - PLAYER_RADIUS;
    let max_y = WORLD_HEIGHT / 2.0 - PLAYER_RADIUS;
    Vec2::new(rng.gen_range(-max_x..max_x), rng.gen_range(-max_y..max_y))
}
