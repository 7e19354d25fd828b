//! Presentation layer: world-to-screen mapping and frame drawing.
//!
//! The canvas is the largest square that fits the window; world space is a
//! centered rectangle scaled onto it. Nothing in here feeds back into the
//! simulation except the inverse transform for the aim point.

use macroquad::prelude::*;

use shared::{Vec2, COLOUR_COUNT, PLAYER_RADIUS, WORLD_HEIGHT, WORLD_WIDTH};

use crate::game::World;

/// Player palette; colour indices wrap at [`COLOUR_COUNT`].
const PLAYER_COLOURS: [Color; COLOUR_COUNT as usize] = [
    Color::new(1.0, 0.0, 0.0, 1.0),
    Color::new(1.0, 0.5, 0.0, 1.0),
    Color::new(1.0, 1.0, 0.0, 1.0),
    Color::new(0.0, 1.0, 0.0, 1.0),
    Color::new(0.0, 0.5, 1.0, 1.0),
    Color::new(0.25, 0.0, 1.0, 1.0),
    Color::new(0.75, 0.0, 1.0, 1.0),
];

fn palette(colour: u8) -> Color {
    PLAYER_COLOURS[(colour % COLOUR_COUNT) as usize]
}

pub struct Renderer {
    view_size: Vec2,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            view_size: Vec2::new(WORLD_WIDTH, WORLD_HEIGHT),
        }
    }

    fn canvas_size(&self) -> f32 {
        screen_width().min(screen_height())
    }

    pub fn world_to_screen(&self, point: Vec2) -> Vec2 {
        let size = self.canvas_size();
        Vec2::new(
            size / 2.0 + point.x * size / self.view_size.x,
            size / 2.0 + point.y * size / self.view_size.y,
        )
    }

    pub fn world_length_to_screen(&self, length: f32) -> f32 {
        length * self.canvas_size() / self.view_size.y
    }

    pub fn screen_to_world(&self, point: Vec2) -> Vec2 {
        let size = self.canvas_size();
        Vec2::new(
            point.x / size * self.view_size.x - self.view_size.x / 2.0,
            point.y / size * self.view_size.y - self.view_size.y / 2.0,
        )
    }

    pub fn render(&self, world: &World) {
        clear_background(BLACK);

        for (entity, renderer) in world.scenery() {
            match renderer {
                shared::Renderer::Line { start, end } => {
                    let a = self.world_to_screen(entity.position + *start);
                    let b = self.world_to_screen(entity.position + *end);
                    draw_line(a.x, a.y, b.x, b.y, 2.0, WHITE);
                }
                shared::Renderer::Circle { radius, colour } => {
                    let center = self.world_to_screen(entity.position);
                    let r = self.world_length_to_screen(*radius);
                    draw_circle(center.x, center.y, r, palette(*colour));
                }
            }
        }

        for projectile in world.projectiles() {
            let tail = self.world_to_screen(projectile.tail);
            let head = self.world_to_screen(projectile.head);
            draw_line(tail.x, tail.y, head.x, head.y, 2.0, WHITE);
        }

        for peer in world.peers() {
            self.draw_player(peer.position, peer.colour, peer.hits_taken);
        }

        if world.client_id().is_some() {
            self.draw_player(world.position(), world.colour(), world.hits_taken());
        }
    }

    fn draw_player(&self, position: Vec2, colour: u8, hits_taken: u32) {
        let center = self.world_to_screen(position);
        let radius = self.world_length_to_screen(PLAYER_RADIUS);

        draw_circle(center.x, center.y, radius, palette(colour));
        draw_text(
            &hits_taken.to_string(),
            center.x - 5.0,
            center.y - radius - 5.0,
            20.0,
            palette(colour),
        );
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}
