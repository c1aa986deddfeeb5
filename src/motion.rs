/*
 * Motion Module
 *
 * Per-frame update of the whole population, in a fixed order:
 * 1. Every body eases towards the center of the surface at the same index
 * 2. The body spins with the shared clock (presentation only)
 * 3. Its satellites advance their orbit and lag after the body
 * 4. Satellites of different bodies that come close are nudged along the
 *    line joining them
 *
 * The interaction pass is a full O(n²) scan over satellite pairs of
 * distinct bodies. With ten satellites per window and a handful of windows
 * that is a few thousand distance checks per frame; it is not meant for
 * hundreds of satellites per body.
 */

use nannou::prelude::*;

use crate::body::PrimaryBody;
use crate::error::SimError;
use crate::params::SimulationParams;
use crate::surface::Surface;

// What happened during one tick
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub updated_bodies: usize,
    // Bodies without a surface at their index (registry shrank before the
    // rebuild ran)
    pub skipped_bodies: usize,
    pub interacting_pairs: usize,
    pub faults: Vec<SimError>,
}

// First-order low-pass step. Never overshoots for factor in [0, 1].
#[inline]
pub fn ease_toward(current: Point2, target: Point2, factor: f32) -> Point2 {
    current + (target - current) * factor
}

pub fn check_time(now: f64, dt: f32) -> Result<(), SimError> {
    if !now.is_finite() || !dt.is_finite() || dt < 0.0 {
        return Err(SimError::InvalidTime { now, dt });
    }
    Ok(())
}

pub fn tick(
    bodies: &mut [PrimaryBody],
    surfaces: &[Surface],
    now: f64,
    dt: f32,
    params: &SimulationParams,
) -> Result<TickReport, SimError> {
    check_time(now, dt)?;

    let scale = params.frame_scale(dt);
    let falloff = params.ease_factor(params.falloff, dt);
    let follow = params.ease_factor(params.satellite_follow, dt);
    let angle_step = params.angular_step * scale;

    let active = bodies.len().min(surfaces.len());
    let mut report = TickReport {
        skipped_bodies: bodies.len() - active,
        ..TickReport::default()
    };

    for (body, surface) in bodies.iter_mut().zip(surfaces) {
        let target = match surface.target() {
            Ok(target) => target,
            Err(fault) => {
                report.faults.push(fault);
                continue;
            }
        };

        body.track(target, falloff);
        body.spin(now, params);

        let center = body.position;
        for satellite in &mut body.satellites {
            satellite.advance(center, follow, angle_step, scale);
        }
        report.updated_bodies += 1;
    }

    report.interacting_pairs = interact(&mut bodies[..active], params, scale);
    Ok(report)
}

// Nudge every close pair of satellites that belong to different bodies.
// Both satellites move by the same amount in opposite directions; the sign
// of the interaction decides whether they close in or back off. Returns the
// number of pairs that were nudged.
pub fn interact(bodies: &mut [PrimaryBody], params: &SimulationParams, step_scale: f32) -> usize {
    let threshold_sq = params.interaction_threshold * params.interaction_threshold;
    let step = params.nudge_step * step_scale * params.interaction.sign();
    let mut pairs = 0;

    for i in 0..bodies.len() {
        let (head, tail) = bodies.split_at_mut(i + 1);
        let body_a = &mut head[i];

        for body_b in tail.iter_mut() {
            for a in &mut body_a.satellites {
                for b in &mut body_b.satellites {
                    let delta = b.position - a.position;
                    let d_squared = delta.length_squared();

                    // Coincident satellites have no direction to move in.
                    // Also rejects NaN from a body spawned on a malformed rect.
                    if !(d_squared > 0.0 && d_squared < threshold_sq) {
                        continue;
                    }

                    let dir = delta / d_squared.sqrt();
                    a.position += dir * step;
                    b.position -= dir * step;
                    pairs += 1;
                }
            }
        }
    }

    pairs
}
