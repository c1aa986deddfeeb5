/*
 * Debug Information Module
 *
 * This module defines the DebugInfo struct that collects per-frame metrics
 * for the on-screen overlay:
 * - FPS and frame time
 * - Surfaces, bodies and satellites currently alive
 * - Interacting satellite pairs in the last frame
 * - Bodies skipped or degraded, and frames dropped because of faults
 */

use std::time::Duration;

use crate::simulation::{FrameReport, SimStats};
use crate::surface::SurfaceId;

#[derive(Clone, Debug, Default)]
pub struct DebugInfo {
    pub fps: f32,
    pub frame_time: Duration,
    pub surfaces: usize,
    pub bodies: usize,
    pub satellites: usize,
    pub interacting_pairs: usize,
    pub skipped_bodies: usize,
    pub degraded_bodies: usize,
    pub faulted_frames: u64,
    pub rebuilds: u64,
    pub generation: u32,
    pub local_surface: Option<SurfaceId>,
}

impl DebugInfo {
    // Fold in the outcome of the latest step
    pub fn record(&mut self, report: &FrameReport, stats: SimStats) {
        if let Some(tick) = &report.tick {
            self.interacting_pairs = tick.interacting_pairs;
            self.skipped_bodies = tick.skipped_bodies;
            self.degraded_bodies = tick.faults.len();
        }
        self.faulted_frames = stats.faulted_frames;
        self.rebuilds = stats.rebuilds;
    }

    pub fn lines(&self) -> Vec<String> {
        let local = self
            .local_surface
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        vec![
            format!("FPS: {:.1}", self.fps),
            format!("Frame time: {:.2} ms", self.frame_time.as_secs_f64() * 1000.0),
            format!("Surface: {} of {}", local, self.surfaces),
            format!("Bodies: {}  Satellites: {}", self.bodies, self.satellites),
            format!("Interacting pairs: {}", self.interacting_pairs),
            format!("Skipped: {}  Degraded: {}", self.skipped_bodies, self.degraded_bodies),
            format!("Faulted frames: {}  Rebuilds: {}", self.faulted_frames, self.rebuilds),
            format!("Population generation: {}", self.generation),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::TickReport;

    #[test]
    fn record_keeps_last_tick_numbers() {
        let mut info = DebugInfo::default();
        let report = FrameReport {
            tick: Some(TickReport {
                updated_bodies: 2,
                skipped_bodies: 1,
                interacting_pairs: 4,
                faults: Vec::new(),
            }),
            ..FrameReport::default()
        };
        let stats = SimStats { frames: 10, faulted_frames: 2, rebuilds: 3 };
        info.record(&report, stats);
        assert_eq!(info.interacting_pairs, 4);
        assert_eq!(info.skipped_bodies, 1);
        assert_eq!(info.faulted_frames, 2);

        // A frame without a tick (paused) leaves the numbers alone
        info.record(&FrameReport::default(), stats);
        assert_eq!(info.interacting_pairs, 4);
    }

    #[test]
    fn overlay_lines_show_local_surface() {
        let mut info = DebugInfo::default();
        assert!(info.lines()[2].contains('-'));
        info.local_surface = Some(SurfaceId(3));
        info.surfaces = 4;
        assert_eq!(info.lines()[2], "Surface: #3 of 4");
        info.generation = 5;
        assert_eq!(info.lines().last().unwrap(), "Population generation: 5");
    }
}
