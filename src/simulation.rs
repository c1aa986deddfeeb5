/*
 * Simulation Module
 *
 * The Simulation owns all mutable state of one scene: parameters, the
 * population, the scene graph, the viewport offset and the random source
 * used for orbit jitter. Several independent simulations can exist side by
 * side, which is what the tests do.
 *
 * Registry notices can arrive at any point between frames. They are folded
 * into a single pending slot and only applied at the start of the next
 * step, so a frame always runs in this order:
 *   pending rebuild -> viewport ease -> bodies -> satellites -> interaction
 * and the renderer then reads the result.
 */

use log::{debug, warn};
use nannou::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::SimError;
use crate::motion::{self, TickReport};
use crate::params::SimulationParams;
use crate::population::{Population, RebuildSummary};
use crate::registry::RegistryNotice;
use crate::scene::Scene;
use crate::surface::Surface;
use crate::viewport::ViewportOffset;

// Coalesced registry notices. Repeated notices between two frames collapse
// into one rebuild and the latest position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PendingUpdates {
    pub set_changed: bool,
    pub moved_to: Option<Vec2>,
}

impl PendingUpdates {
    pub fn push(&mut self, notice: RegistryNotice) {
        match notice {
            RegistryNotice::SetChanged => self.set_changed = true,
            RegistryNotice::ShapeChanged { position } => self.moved_to = Some(position),
        }
    }

    pub fn take(&mut self) -> PendingUpdates {
        std::mem::take(self)
    }

    pub fn is_empty(&self) -> bool {
        !self.set_changed && self.moved_to.is_none()
    }
}

// Outcome of one step
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub rebuild: Option<RebuildSummary>,
    pub tick: Option<TickReport>,
    // Set when the whole motion update was dropped
    pub fault: Option<SimError>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SimStats {
    pub frames: u64,
    pub faulted_frames: u64,
    pub rebuilds: u64,
}

pub struct Simulation {
    params: SimulationParams,
    population: Population,
    viewport: ViewportOffset,
    scene: Scene,
    pending: PendingUpdates,
    rng: StdRng,
    stats: SimStats,
    last_fault: Option<SimError>,
}

impl Simulation {
    // A fixed seed makes the orbit jitter reproducible
    pub fn new(params: SimulationParams, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            params,
            population: Population::new(),
            viewport: ViewportOffset::new(),
            scene: Scene::new(),
            pending: PendingUpdates::default(),
            rng,
            stats: SimStats::default(),
            last_fault: None,
        }
    }

    // Queue a registry notice for the next step
    pub fn notify(&mut self, notice: RegistryNotice) {
        self.pending.push(notice);
    }

    pub fn request_rebuild(&mut self) {
        self.pending.set_changed = true;
    }

    // Align the viewport with the local surface without easing
    pub fn snap_viewport(&mut self, screen_position: Vec2) {
        self.viewport.snap(screen_position);
    }

    // Change parameters; queues a rebuild when the change affects how the
    // population is laid out
    pub fn edit_params(&mut self, edit: impl FnOnce(&mut SimulationParams)) {
        self.params.take_snapshot();
        edit(&mut self.params);
        let changes = self.params.detect_changes();
        if changes.rebuild_needed {
            debug!("parameter change requires a population rebuild");
            self.request_rebuild();
        }
    }

    pub fn step(&mut self, now: f64, dt: f32, surfaces: &[Surface]) -> FrameReport {
        self.stats.frames += 1;
        let mut report = FrameReport::default();

        let pending = self.pending.take();
        if pending.set_changed {
            let summary = self
                .population
                .rebuild(surfaces, &self.params, &mut self.scene, &mut self.rng);
            self.stats.rebuilds += 1;
            report.rebuild = Some(summary);
        }
        if let Some(position) = pending.moved_to {
            self.viewport.on_surface_moved(position);
        }

        if let Err(fault) = motion::check_time(now, dt) {
            self.record_fault(&fault);
            report.fault = Some(fault);
            return report;
        }

        self.viewport.tick(self.params.ease_factor(self.params.falloff, dt));

        if self.params.pause_simulation {
            return report;
        }

        match motion::tick(self.population.bodies_mut(), surfaces, now, dt, &self.params) {
            Ok(tick) => {
                for fault in &tick.faults {
                    self.log_fault(fault);
                }
                report.tick = Some(tick);
            }
            Err(fault) => {
                self.record_fault(&fault);
                report.fault = Some(fault);
            }
        }
        report
    }

    fn record_fault(&mut self, fault: &SimError) {
        self.stats.faulted_frames += 1;
        self.log_fault(fault);
    }

    // Warn once per distinct fault, repeats only at debug level
    fn log_fault(&mut self, fault: &SimError) {
        if self.last_fault.as_ref() == Some(fault) {
            debug!("frame fault repeated: {}", fault);
        } else {
            warn!("frame fault: {}", fault);
            self.last_fault = Some(fault.clone());
        }
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn viewport(&self) -> &ViewportOffset {
        &self.viewport
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn pending(&self) -> &PendingUpdates {
        &self.pending
    }

    pub fn stats(&self) -> SimStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{SurfaceId, SurfaceRect};
    use approx::assert_relative_eq;

    const FRAME: f32 = 1.0 / 60.0;

    fn surfaces(n: u64) -> Vec<Surface> {
        (0..n)
            .map(|i| Surface::new(SurfaceId(i + 1), SurfaceRect::new(i as f32 * 300.0, 0.0, 200.0, 200.0)))
            .collect()
    }

    #[test]
    fn notices_coalesce_into_one_slot() {
        let mut pending = PendingUpdates::default();
        assert!(pending.is_empty());
        pending.push(RegistryNotice::SetChanged);
        pending.push(RegistryNotice::ShapeChanged { position: vec2(1.0, 2.0) });
        pending.push(RegistryNotice::SetChanged);
        pending.push(RegistryNotice::ShapeChanged { position: vec2(3.0, 4.0) });

        let taken = pending.take();
        assert!(taken.set_changed);
        assert_eq!(taken.moved_to, Some(vec2(3.0, 4.0)));
        assert!(pending.is_empty());
    }

    #[test]
    fn notices_apply_only_on_the_next_step() {
        let mut sim = Simulation::new(SimulationParams::default(), Some(1));
        let list = surfaces(2);

        sim.notify(RegistryNotice::SetChanged);
        sim.notify(RegistryNotice::ShapeChanged { position: vec2(100.0, 50.0) });
        assert!(sim.population().is_empty());
        assert_eq!(sim.viewport().target, Vec2::ZERO);

        let report = sim.step(0.0, FRAME, &list);
        assert_eq!(report.rebuild.map(|r| r.created_bodies), Some(2));
        assert_eq!(sim.population().len(), 2);
        assert_eq!(sim.viewport().target, vec2(-100.0, -50.0));
        assert_relative_eq!(sim.viewport().current.x, -5.0, epsilon = 1e-3);

        // No further rebuild without a new notice
        let report = sim.step(0.0, FRAME, &list);
        assert!(report.rebuild.is_none());
        assert_eq!(sim.stats().rebuilds, 1);
    }

    #[test]
    fn bad_frame_time_drops_the_frame_but_not_the_loop() {
        let mut sim = Simulation::new(SimulationParams::default(), Some(1));
        let list = surfaces(1);
        sim.request_rebuild();
        sim.step(0.0, FRAME, &list);
        let before = sim.population().bodies()[0].position;

        let report = sim.step(f64::INFINITY, FRAME, &list);
        assert!(matches!(report.fault, Some(SimError::InvalidTime { .. })));
        assert_eq!(sim.population().bodies()[0].position, before);
        assert_eq!(sim.viewport().current, Vec2::ZERO);

        let report = sim.step(1.0, FRAME, &list);
        assert!(report.fault.is_none());
        assert!(report.tick.is_some());
        assert_eq!(sim.stats().faulted_frames, 1);
        assert_eq!(sim.stats().frames, 3);
    }

    #[test]
    fn pause_freezes_motion_but_keeps_viewport_in_sync() {
        let mut params = SimulationParams::default();
        params.pause_simulation = true;
        let mut sim = Simulation::new(params, Some(1));
        sim.request_rebuild();
        sim.notify(RegistryNotice::ShapeChanged { position: vec2(200.0, 0.0) });

        let list = surfaces(1);
        let report = sim.step(0.0, FRAME, &list);
        assert!(report.tick.is_none());
        assert_eq!(sim.population().len(), 1);
        assert!(sim.viewport().current.x < 0.0);
    }

    #[test]
    fn layout_edits_queue_a_rebuild() {
        let mut sim = Simulation::new(SimulationParams::default(), Some(1));
        sim.edit_params(|p| p.show_debug = true);
        assert!(!sim.pending().set_changed);

        sim.edit_params(|p| p.satellites_per_body = 3);
        assert!(sim.pending().set_changed);

        sim.step(0.0, FRAME, &surfaces(2));
        assert!(sim
            .population()
            .bodies()
            .iter()
            .all(|b| b.satellites.len() == 3));
    }
}
