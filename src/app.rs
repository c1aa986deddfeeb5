/*
 * Application Module
 *
 * This module wires the simulation into nannou's frame loop. Each frame:
 * 1. The window's current rectangle is published to the surface registry
 * 2. Registry notices are queued into the simulation
 * 3. The simulation steps with the shared clock and the measured delta
 * 4. The camera picks up the eased viewport offset for the renderer
 *
 * Setup that can fail before a window exists (params, shared store) is
 * done in main. Joining the registry needs the window's rectangle, so it
 * happens here; if it fails the model stays halted and the app quits
 * without ever stepping the simulation.
 */

use std::sync::Mutex;
use std::time::Duration;

use log::{error, info, warn};
use nannou::prelude::*;

use crate::camera::Camera;
use crate::clock::{self, FrameClock};
use crate::debug::DebugInfo;
use crate::input;
use crate::params::SimulationParams;
use crate::registry::{Metadata, SurfaceRegistry};
use crate::renderer;
use crate::simulation::Simulation;
use crate::surface::SurfaceRect;
use crate::WINDOW_TITLE;

// Everything main prepares for the model
pub struct Launch {
    pub params: SimulationParams,
    pub registry: Box<dyn SurfaceRegistry + Send>,
    pub metadata: Metadata,
    pub seed: Option<u64>,
}

// nannou builds the model from a plain fn, so the launch data is handed
// over through this slot
static LAUNCH: Mutex<Option<Launch>> = Mutex::new(None);

pub struct Runtime {
    pub simulation: Simulation,
    pub registry: Box<dyn SurfaceRegistry + Send>,
    pub last_rect: SurfaceRect,
}

// Main model for the application
pub struct Model {
    pub window: WindowId,
    // None once setup failed; nothing is simulated
    pub runtime: Option<Runtime>,
    pub camera: Camera,
    pub debug_info: DebugInfo,
    pub clock: FrameClock,
}

pub fn launch(launch: Launch) {
    match LAUNCH.lock() {
        Ok(mut slot) => *slot = Some(launch),
        Err(e) => {
            error!("could not hand over launch configuration: {}", e);
            return;
        }
    }
    nannou::app(model).update(update).exit(exit).run();
}

// Initialize the model
pub fn model(app: &App) -> Model {
    let launch = LAUNCH.lock().ok().and_then(|mut slot| slot.take());

    let window = app
        .new_window()
        .title(WINDOW_TITLE)
        .size(800, 600)
        .view(renderer::view)
        .key_pressed(input::key_pressed)
        .build()
        .expect("Failed to create window");

    let mut model = Model {
        window,
        runtime: None,
        camera: Camera::new(),
        debug_info: DebugInfo::default(),
        clock: FrameClock::new(Duration::from_millis(250)),
    };

    let Some(launch) = launch else {
        error!("no launch configuration, not starting the simulation");
        app.quit();
        return model;
    };

    let local_rect = local_surface_rect(app, window).unwrap_or_default();
    let mut registry = launch.registry;
    let local_id = match registry.init(launch.metadata, local_rect) {
        Ok(id) => id,
        Err(e) => {
            error!("could not join the surface registry: {}", e);
            app.quit();
            return model;
        }
    };
    info!("window registered as surface {}", local_id);

    model
        .clock
        .set_max_dt(Duration::from_secs_f32(launch.params.max_frame_dt));

    let mut simulation = Simulation::new(launch.params, launch.seed);
    simulation.snap_viewport(local_rect.position());
    simulation.request_rebuild();
    model.camera.follow(simulation.viewport());
    model.debug_info.local_surface = Some(local_id);

    model.runtime = Some(Runtime {
        simulation,
        registry,
        last_rect: local_rect,
    });
    model
}

// Update the model
pub fn update(app: &App, model: &mut Model, update: Update) {
    model.debug_info.fps = app.fps();
    model.debug_info.frame_time = update.since_last;
    let dt = model.clock.tick().as_secs_f32();

    let Some(runtime) = model.runtime.as_mut() else {
        return;
    };

    if let Some(rect) = local_surface_rect(app, model.window) {
        runtime.last_rect = rect;
    }

    // A failed poll keeps the last snapshot; the frame still runs
    match runtime.registry.update(runtime.last_rect) {
        Ok(notices) => {
            for notice in notices {
                runtime.simulation.notify(notice);
            }
        }
        Err(e) => warn!("surface registry update failed: {}", e),
    }

    let now = clock::seconds_since_midnight();
    let report = runtime
        .simulation
        .step(now, dt, runtime.registry.surfaces());

    let sim = &runtime.simulation;
    model.debug_info.record(&report, sim.stats());
    model.debug_info.surfaces = runtime.registry.surfaces().len();
    model.debug_info.bodies = sim.population().len();
    model.debug_info.satellites = sim.population().satellite_count();
    model.debug_info.generation = sim.population().generation();
    // The store may hand out a new id after this window was pruned
    model.debug_info.local_surface = runtime.registry.local_id();

    model.camera.follow(sim.viewport());
}

// Remove this window from the registry on the way out
pub fn exit(_app: &App, model: Model) {
    if let Some(mut runtime) = model.runtime {
        if let Err(e) = runtime.registry.leave() {
            warn!("could not leave the surface registry: {}", e);
        }
    }
}

// The window's rectangle on the desktop, in points. Platforms that do not
// report window positions place the window at the desktop origin.
fn local_surface_rect(app: &App, id: WindowId) -> Option<SurfaceRect> {
    let window = app.window(id)?;
    let scale = window.scale_factor();
    let (w, h) = window.inner_size_points();
    let (x, y) = window
        .outer_position_pixels()
        .map(|(x, y)| (x as f32 / scale, y as f32 / scale))
        .unwrap_or((0.0, 0.0));
    Some(SurfaceRect::new(x, y, w, h))
}
