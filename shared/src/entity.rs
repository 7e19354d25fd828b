//! Synchronized game objects: entities with capability components, and the
//! ephemeral projectiles that are broadcast but never persisted.

use serde::{Deserialize, Serialize};

use crate::geometry::segment_circle_intersects;
use crate::vec2::Vec2;

/// The unit of synchronized game state.
///
/// Entities are exchanged whole over the wire and replayed to late joiners
/// from the relay's world snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: u64,
    /// Connection that created the entity. `None` marks server-owned level
    /// geometry such as walls.
    pub owner: Option<u32>,
    pub position: Vec2,
    pub destroyed: bool,
    pub components: Vec<Component>,
}

impl Entity {
    pub fn new(id: u64, owner: Option<u32>) -> Self {
        Entity {
            id,
            owner,
            position: Vec2::ZERO,
            destroyed: false,
            components: Vec::new(),
        }
    }

    /// Attaches a component and returns a reference to it.
    pub fn add_component(&mut self, component: Component) -> &Component {
        self.components.push(component);
        self.components.last().expect("just pushed")
    }

    /// Returns the first component of the given kind, if any.
    ///
    /// An entity may carry any number of components per kind; callers that
    /// care about more than the first should walk `components` themselves.
    pub fn get_component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components.iter().find(|c| c.kind() == kind)
    }
}

/// Capability tag used for component lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Collider,
    Renderer,
}

/// A behavior attached to an entity, tagged by capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Component {
    Collider(Collider),
    Renderer(Renderer),
}

impl Component {
    pub fn kind(&self) -> ComponentKind {
        match self {
            Component::Collider(_) => ComponentKind::Collider,
            Component::Renderer(_) => ComponentKind::Renderer,
        }
    }
}

/// Collision capability: every variant can test itself against a circle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Collider {
    /// A line obstacle. Endpoints are relative to the entity position.
    Segment { start: Vec2, end: Vec2 },
    /// A round body centered on the entity position.
    Circle { radius: f32 },
}

impl Collider {
    /// Tests this collider, placed at `origin`, against a circle.
    pub fn intersects_circle(&self, origin: Vec2, center: Vec2, radius: f32) -> bool {
        match self {
            Collider::Segment { start, end } => {
                segment_circle_intersects(origin + *start, origin + *end, center, radius)
            }
            Collider::Circle { radius: own } => {
                (center - origin).magnitude() <= *own + radius
            }
        }
    }
}

/// Drawing capability. Interpreted by the client's presentation layer; the
/// relay carries it opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Renderer {
    /// A line in world space, endpoints relative to the entity position.
    Line { start: Vec2, end: Vec2 },
    /// A filled circle centered on the entity position.
    Circle { radius: f32, colour: u8 },
}

/// A short-lived, owner-attributed moving entity.
///
/// Projectiles are mirrored to peers by broadcast only and never enter the
/// world snapshot. `tail`..`head` is the segment swept since the previous
/// simulation tick; that segment, not a point, is the collision shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projectile {
    pub id: u64,
    pub owner: u32,
    pub origin: Vec2,
    pub direction: Vec2,
    pub speed: f32,
    pub head: Vec2,
    pub tail: Vec2,
    pub destroyed: bool,
}

impl Projectile {
    pub fn new(id: u64, owner: u32, origin: Vec2, direction: Vec2, speed: f32) -> Self {
        Projectile {
            id,
            owner,
            origin,
            direction,
            speed,
            head: origin,
            tail: origin,
            destroyed: false,
        }
    }

    /// Advances the swept segment by one tick: the old head becomes the
    /// tail and the head moves `speed * dt` along the direction.
    pub fn advance(&mut self, dt: f32) {
        self.tail = self.head;
        self.head = self.head + self.direction * (self.speed * dt);
    }
}
