/*
 * Renderer Module
 *
 * Draws the current state of the simulation into this window:
 * - Each body as a wireframe sphere in its surface's hue, spinning with
 *   the shared clock
 * - Each satellite as a small translucent disc
 * - The debug overlay when enabled
 *
 * The renderer never writes to the simulation. Only entities whose scene
 * node is attached are drawn.
 */

use std::f32::consts::PI;

use log::warn;
use nannou::prelude::*;

use crate::app::Model;
use crate::body::PrimaryBody;
use crate::camera::Camera;
use crate::ui;
use crate::{MERIDIANS, SATELLITE_SIZE};

pub fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    draw.background().color(BLACK);

    let window_rect = app.window_rect();

    if let Some(runtime) = &model.runtime {
        let sim = &runtime.simulation;
        let scene = sim.scene();
        let population = sim.population();

        for body in population.bodies() {
            if scene.contains(body.node) {
                draw_body(&draw, body, &model.camera, window_rect);
            }
        }

        // Satellites on top of every body
        for body in population.bodies() {
            for satellite in &body.satellites {
                if !scene.contains(satellite.node) || population.owner_of(satellite).is_none() {
                    continue;
                }
                let pos = model.camera.world_to_screen(satellite.position, window_rect);
                draw.ellipse()
                    .xy(pos)
                    .radius(SATELLITE_SIZE)
                    .color(rgba(1.0, 1.0, 1.0, 0.7));
            }
        }

        if sim.params().show_debug {
            ui::draw_debug_info(&draw, &model.debug_info, window_rect);
        }
    }

    if let Err(e) = draw.to_frame(app, &frame) {
        warn!("failed to draw frame: {:?}", e);
    }
}

// Outline plus meridian rings; phase.y turns the rings, phase.x tilts them
fn draw_body(draw: &Draw, body: &PrimaryBody, camera: &Camera, window_rect: Rect) {
    let center = camera.world_to_screen(body.position, window_rect);
    let color = hsl(body.hue, 1.0, 0.5);
    let diameter = body.size * 2.0;

    draw.ellipse()
        .xy(center)
        .radius(body.size)
        .no_fill()
        .stroke(color)
        .stroke_weight(1.0);

    for k in 0..MERIDIANS {
        let angle = body.phase.y + k as f32 * PI / MERIDIANS as f32;
        draw.ellipse()
            .xy(center)
            .w_h(diameter * angle.cos().abs(), diameter)
            .rotate(body.phase.x)
            .no_fill()
            .stroke(color)
            .stroke_weight(1.0);
    }

    // Equator
    draw.ellipse()
        .xy(center)
        .w_h(diameter, diameter * body.phase.x.sin().abs())
        .rotate(body.phase.x)
        .no_fill()
        .stroke(color)
        .stroke_weight(1.0);
}
