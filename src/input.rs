/*
 * Input Module
 *
 * Keyboard toggles:
 * - D: debug overlay
 * - Space: pause the simulation
 * - Up / Down: satellites per body (rebuilds the population)
 * - I: switch between attracting and repelling satellites
 */

use log::info;
use nannou::prelude::*;

use crate::app::Model;
use crate::params::SimulationParams;

pub fn key_pressed(_app: &App, model: &mut Model, key: Key) {
    let Some(runtime) = model.runtime.as_mut() else {
        return;
    };
    let sim = &mut runtime.simulation;

    match key {
        Key::D => sim.edit_params(|p| p.show_debug = !p.show_debug),
        Key::Space => {
            sim.edit_params(|p| p.pause_simulation = !p.pause_simulation);
            info!("simulation paused: {}", sim.params().pause_simulation);
        }
        Key::Up => sim.edit_params(|p| p.satellites_per_body = step_satellites(p.satellites_per_body, 1)),
        Key::Down => sim.edit_params(|p| p.satellites_per_body = step_satellites(p.satellites_per_body, -1)),
        Key::I => {
            sim.edit_params(|p| p.interaction = p.interaction.flipped());
            info!("satellite interaction: {:?}", sim.params().interaction);
        }
        _ => {}
    }
}

// Move the satellite count by `delta`, staying within the allowed range
pub fn step_satellites(current: usize, delta: isize) -> usize {
    let range = SimulationParams::get_satellite_range();
    let next = current.saturating_add_signed(delta);
    next.clamp(*range.start(), *range.end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn satellite_count_stays_in_range() {
        assert_eq!(step_satellites(10, 1), 11);
        assert_eq!(step_satellites(10, -1), 9);
        assert_eq!(step_satellites(1, -1), 1);
        assert_eq!(step_satellites(256, 1), 256);
        assert_eq!(step_satellites(0, -1), 1);
    }
}
