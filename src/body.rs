/*
 * Body Module
 *
 * This module defines the two kinds of entities in the scene:
 * 1. PrimaryBody: one per surface, eases towards the center of its surface
 *    and spins with the shared animation clock
 * 2. Satellite: a small particle orbiting a body. Its position keeps the
 *    previous orbit offset and is pulled back towards the body every frame,
 *    which makes the ring trail behind a moving body
 *
 * Satellites refer to their body through a BodyHandle (index plus
 * population generation) rather than a reference, so a rebuild can never
 * leave a satellite pointing at a body that no longer exists.
 */

use std::f32::consts::TAU;

use nannou::prelude::*;
use rand::Rng;

use crate::motion::ease_toward;
use crate::params::SimulationParams;
use crate::scene::{NodeId, NodeKind, Scene};
use crate::surface::{Surface, SurfaceId};

// Lifecycle of every entity: Created -> Active -> Released, never backwards
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityState {
    Created,
    Active,
    Released,
}

impl EntityState {
    pub fn activate(self) -> Self {
        match self {
            EntityState::Created => EntityState::Active,
            other => other,
        }
    }

    pub fn release(self) -> Self {
        EntityState::Released
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle {
    pub index: usize,
    pub generation: u32,
}

#[derive(Clone, Debug)]
pub struct Satellite {
    pub owner: BodyHandle,
    pub angle: f32,
    pub radius: f32,
    pub position: Point2,
    pub node: NodeId,
    pub state: EntityState,
}

impl Satellite {
    // Starts on its orbit around `center`
    pub fn new(owner: BodyHandle, angle: f32, radius: f32, center: Point2, scene: &mut Scene) -> Self {
        Self {
            owner,
            angle,
            radius,
            position: center + orbit_offset(angle, radius),
            node: scene.attach(NodeKind::Satellite),
            state: EntityState::Created,
        }
    }

    // Lag towards the body, then add this frame's orbit offset on top
    pub fn advance(&mut self, center: Point2, follow: f32, angle_step: f32, offset_scale: f32) {
        self.angle = (self.angle + angle_step).rem_euclid(TAU);
        if !self.position.is_finite() {
            self.position = center + orbit_offset(self.angle, self.radius);
            return;
        }
        self.position = ease_toward(self.position, center, follow);
        self.position += orbit_offset(self.angle, self.radius) * offset_scale;
    }

    pub fn release(&mut self, scene: &mut Scene) {
        scene.detach(self.node);
        self.state = self.state.release();
    }
}

#[derive(Clone, Debug)]
pub struct PrimaryBody {
    pub owner: SurfaceId,
    pub size: f32,
    pub hue: f32,
    pub position: Point2,
    // Presentational spin, not used by the simulation
    pub phase: Vec2,
    pub satellites: Vec<Satellite>,
    pub node: NodeId,
    pub state: EntityState,
}

impl PrimaryBody {
    // Body for the surface at `index` in registry order, centered on the
    // surface and already surrounded by its satellites
    pub fn spawn<R: Rng>(
        handle: BodyHandle,
        surface: &Surface,
        params: &SimulationParams,
        scene: &mut Scene,
        rng: &mut R,
    ) -> Self {
        let index = handle.index as f32;
        let size = params.base_size + index * params.size_step;
        let hue = (index * params.hue_step).rem_euclid(1.0);
        // A malformed rect still gets a body; it joins its surface once
        // the rect is valid again
        let position = surface.target().unwrap_or(Vec2::ZERO);

        let node = scene.attach(NodeKind::Body);

        let count = params.satellites_per_body;
        let satellites = (0..count)
            .map(|j| {
                let angle = (j as f32 / count as f32) * TAU;
                // Drawn once, never re-rolled
                let jitter = rng.gen::<f32>() * params.radius_jitter;
                let radius = size + params.radius_margin + jitter;
                Satellite::new(handle, angle, radius, position, scene)
            })
            .collect();

        let mut body = Self {
            owner: surface.id,
            size,
            hue,
            position,
            phase: Vec2::ZERO,
            satellites,
            node,
            state: EntityState::Created,
        };
        body.activate();
        body
    }

    fn activate(&mut self) {
        self.state = self.state.activate();
        for satellite in &mut self.satellites {
            satellite.state = satellite.state.activate();
        }
    }

    pub fn track(&mut self, target: Point2, factor: f32) {
        if !self.position.is_finite() {
            self.position = target;
            return;
        }
        self.position = ease_toward(self.position, target, factor);
    }

    pub fn spin(&mut self, now: f64, params: &SimulationParams) {
        self.phase = vec2(
            wrap_phase(now * params.spin_rate_x as f64),
            wrap_phase(now * params.spin_rate_y as f64),
        );
    }

    // Detach the body and all of its satellites from the scene
    pub fn release(&mut self, scene: &mut Scene) {
        for satellite in &mut self.satellites {
            satellite.release(scene);
        }
        scene.detach(self.node);
        self.state = self.state.release();
    }
}

pub fn orbit_offset(angle: f32, radius: f32) -> Vec2 {
    vec2(angle.cos() * radius, angle.sin() * radius)
}

// Reduce in f64 first so large clock values keep their precision
fn wrap_phase(phase: f64) -> f32 {
    phase.rem_euclid(std::f64::consts::TAU) as f32
}
