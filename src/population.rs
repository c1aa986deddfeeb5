/*
 * Population Module
 *
 * Keeps exactly one PrimaryBody per live surface, in registry order.
 * The population is never diffed: whenever the set of surfaces changes,
 * every body and satellite is released and the whole population is built
 * again from the current surface list. Each rebuild bumps a generation
 * counter so handles from an older population stop resolving.
 */

use log::info;
use rand::Rng;

use crate::body::{BodyHandle, PrimaryBody, Satellite};
use crate::params::SimulationParams;
use crate::scene::Scene;
use crate::surface::Surface;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    pub released_bodies: usize,
    pub released_satellites: usize,
    pub created_bodies: usize,
    pub created_satellites: usize,
}

#[derive(Default)]
pub struct Population {
    bodies: Vec<PrimaryBody>,
    generation: u32,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rebuild<R: Rng>(
        &mut self,
        surfaces: &[Surface],
        params: &SimulationParams,
        scene: &mut Scene,
        rng: &mut R,
    ) -> RebuildSummary {
        let mut summary = self.release_all(scene);

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;

        self.bodies = surfaces
            .iter()
            .enumerate()
            .map(|(index, surface)| {
                let handle = BodyHandle { index, generation };
                PrimaryBody::spawn(handle, surface, params, scene, rng)
            })
            .collect();

        summary.created_bodies = self.bodies.len();
        summary.created_satellites = self.satellite_count();

        info!(
            "population rebuilt (generation {}): {} bodies, {} satellites",
            generation, summary.created_bodies, summary.created_satellites
        );
        summary
    }

    // Detach and drop every entity
    pub fn release_all(&mut self, scene: &mut Scene) -> RebuildSummary {
        let mut summary = RebuildSummary::default();
        for mut body in self.bodies.drain(..) {
            summary.released_satellites += body.satellites.len();
            summary.released_bodies += 1;
            body.release(scene);
        }
        summary
    }

    pub fn bodies(&self) -> &[PrimaryBody] {
        &self.bodies
    }

    pub fn bodies_mut(&mut self) -> &mut [PrimaryBody] {
        &mut self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn satellite_count(&self) -> usize {
        self.bodies.iter().map(|b| b.satellites.len()).sum()
    }

    // Resolve a handle, None if it belongs to an older population
    pub fn body(&self, handle: BodyHandle) -> Option<&PrimaryBody> {
        if handle.generation != self.generation {
            return None;
        }
        self.bodies.get(handle.index)
    }

    pub fn owner_of(&self, satellite: &Satellite) -> Option<&PrimaryBody> {
        self.body(satellite.owner)
    }
}
