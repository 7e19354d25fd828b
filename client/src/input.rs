//! Keyboard and mouse capture for the simulation tick.

use macroquad::prelude::*;

use shared::Vec2;

use crate::game::HeldInput;

/// Samples raw device state once per frame and packages it as a
/// [`HeldInput`].
///
/// The aim point is reported in screen space; converting it to world
/// coordinates is the presentation layer's job.
pub struct InputManager {
    prev_colour_key: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            prev_colour_key: false,
        }
    }

    pub fn sample(&mut self) -> HeldInput {
        // Movement supports both WASD and arrow keys.
        let up = is_key_down(KeyCode::W) || is_key_down(KeyCode::Up);
        let down = is_key_down(KeyCode::S) || is_key_down(KeyCode::Down);
        let left = is_key_down(KeyCode::A) || is_key_down(KeyCode::Left);
        let right = is_key_down(KeyCode::D) || is_key_down(KeyCode::Right);

        let attack = is_mouse_button_down(MouseButton::Left);
        let (mouse_x, mouse_y) = mouse_position();

        // Edge detection: one colour step per press, not per held frame.
        let colour_key = is_key_down(KeyCode::Space);
        let cycle_colour = colour_key && !self.prev_colour_key;
        self.prev_colour_key = colour_key;

        HeldInput {
            up,
            down,
            left,
            right,
            attack,
            aim: Vec2::new(mouse_x, mouse_y),
            cycle_colour,
        }
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
