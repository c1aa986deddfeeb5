/*
 * Viewport Module
 *
 * The whole scene is drawn in desktop coordinates. To make every window
 * show its own slice of one continuous space, the scene root is shifted by
 * minus the window's position on the desktop: moving a window right moves
 * the world left inside it. The target jumps on every move, the current
 * offset eases after it.
 */

use nannou::prelude::*;

use crate::motion::ease_toward;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewportOffset {
    pub target: Vec2,
    pub current: Vec2,
}

impl ViewportOffset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_surface_moved(&mut self, screen_position: Vec2) {
        self.target = -screen_position;
    }

    // Jump straight to the new offset, used for the very first position
    pub fn snap(&mut self, screen_position: Vec2) {
        self.on_surface_moved(screen_position);
        self.current = self.target;
    }

    pub fn tick(&mut self, factor: f32) {
        self.current = ease_toward(self.current, self.target, factor);
    }
}
