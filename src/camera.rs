/*
 * Camera Module
 *
 * The simulation works in desktop coordinates: origin at the top-left of
 * the desktop, y growing downwards. nannou draws with the origin in the
 * middle of the window and y growing upwards. The camera applies the
 * viewport offset and converts desktop points into window space.
 */

use nannou::prelude::*;

use crate::viewport::ViewportOffset;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Camera {
    // Translation of the scene root; minus the window's desktop position
    // once the viewport has settled
    pub offset: Vec2,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn follow(&mut self, viewport: &ViewportOffset) {
        self.offset = viewport.current;
    }

    // Convert a point from desktop space to window drawing space
    pub fn world_to_screen(&self, point: Vec2, window_rect: Rect) -> Vec2 {
        let local = point + self.offset;
        vec2(window_rect.left() + local.x, window_rect.top() - local.y)
    }
}
