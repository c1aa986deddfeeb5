/*
 * UI Module
 *
 * Draws the debug overlay in the top-left corner of the window.
 */

use nannou::prelude::*;

use crate::debug::DebugInfo;

pub fn draw_debug_info(draw: &Draw, debug_info: &DebugInfo, window_rect: Rect) {
    let lines = debug_info.lines();

    let margin = 20.0;
    let line_height = 20.0;
    let panel_width = 260.0;
    let panel_height = line_height * lines.len() as f32 + margin;

    draw.rect()
        .x_y(window_rect.left() + panel_width / 2.0, window_rect.top() - panel_height / 2.0)
        .w_h(panel_width, panel_height)
        .color(rgba(0.0, 0.0, 0.0, 0.7));

    let text_x = window_rect.left() + margin;
    let text_y = window_rect.top() - margin;

    for (i, text) in lines.iter().enumerate() {
        // Left-aligned text box starting at the margin
        draw.text(text)
            .x_y(text_x + (panel_width - margin) / 2.0, text_y - i as f32 * line_height)
            .w(panel_width - margin)
            .left_justify()
            .color(WHITE)
            .font_size(14);
    }
}
