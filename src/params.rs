/*
 * Simulation Parameters Module
 *
 * This module defines the SimulationParams struct that contains every
 * tunable constant of the orbit simulation. Parameters can be loaded from a
 * JSON file, adjusted at runtime from the keyboard, and compared against a
 * snapshot to find out whether the population has to be rebuilt.
 *
 * The motion constants are expressed per reference frame (60 fps by
 * default) and converted to rates with the measured frame delta, so the
 * scene moves at the same speed on any refresh rate.
 */

use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ParamsError;

// Direction in which close satellites of different bodies are nudged
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    Attract,
    Repel,
}

impl InteractionMode {
    // +1 moves the pair together, -1 pushes it apart
    pub fn sign(self) -> f32 {
        match self {
            InteractionMode::Attract => 1.0,
            InteractionMode::Repel => -1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            InteractionMode::Attract => InteractionMode::Repel,
            InteractionMode::Repel => InteractionMode::Attract,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    // Population layout
    pub base_size: f32,
    pub size_step: f32,
    pub hue_step: f32,
    pub satellites_per_body: usize,
    pub radius_margin: f32,
    pub radius_jitter: f32,

    // Motion, per reference frame
    pub falloff: f32,
    pub satellite_follow: f32,
    pub angular_step: f32,
    pub spin_rate_x: f32,
    pub spin_rate_y: f32,

    // Pairwise interaction
    pub interaction_threshold: f32,
    pub nudge_step: f32,
    pub interaction: InteractionMode,

    // Timing
    pub reference_fps: f32,
    pub max_frame_dt: f32,

    pub show_debug: bool,
    pub pause_simulation: bool,

    #[serde(skip)]
    pub previous_values: Option<ParamSnapshot>,
}

// A snapshot of the values that decide how the population is built
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSnapshot {
    base_size: f32,
    size_step: f32,
    hue_step: f32,
    satellites_per_body: usize,
    radius_margin: f32,
    radius_jitter: f32,
    interaction: InteractionMode,
    show_debug: bool,
    pause_simulation: bool,
}

// What changed since the last snapshot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParamChanges {
    pub rebuild_needed: bool,
    pub any_changed: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            base_size: 50.0,
            size_step: 20.0,
            hue_step: 0.1,
            satellites_per_body: 10,
            radius_margin: 20.0,
            radius_jitter: 10.0,
            falloff: 0.05,
            satellite_follow: 0.05,
            angular_step: 0.01,
            spin_rate_x: 0.5,
            spin_rate_y: 0.3,
            interaction_threshold: 30.0,
            nudge_step: 0.5,
            interaction: InteractionMode::Attract,
            reference_fps: 60.0,
            max_frame_dt: 0.25,
            show_debug: false,
            pause_simulation: false,
            previous_values: None,
        }
    }
}

impl SimulationParams {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ParamsError> {
        let json = fs::read_to_string(path)?;
        let params: Self = serde_json::from_str(&json)?;
        params.validate()?;
        Ok(params)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ParamsError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        let unit = Self::get_fraction_range();
        check("falloff", self.falloff, |v| unit.contains(&v))?;
        check("satellite_follow", self.satellite_follow, |v| unit.contains(&v))?;
        check("base_size", self.base_size, |v| v > 0.0)?;
        check("size_step", self.size_step, |v| v >= 0.0)?;
        check("radius_margin", self.radius_margin, |v| v >= 0.0)?;
        check("radius_jitter", self.radius_jitter, |v| v >= 0.0)?;
        check("interaction_threshold", self.interaction_threshold, |v| v > 0.0)?;
        check("nudge_step", self.nudge_step, |v| v >= 0.0)?;
        check("reference_fps", self.reference_fps, |v| v > 0.0)?;
        check("max_frame_dt", self.max_frame_dt, |v| v > 0.0)?;
        check("angular_step", self.angular_step, |_| true)?;
        check("hue_step", self.hue_step, |_| true)?;

        if !Self::get_satellite_range().contains(&self.satellites_per_body) {
            return Err(ParamsError::OutOfRange {
                field: "satellites_per_body",
                value: self.satellites_per_body as f64,
            });
        }
        Ok(())
    }

    // Number of reference frames covered by a frame of `dt` seconds
    pub fn frame_scale(&self, dt: f32) -> f32 {
        dt * self.reference_fps
    }

    // Per-frame easing fraction turned into the fraction for `dt` seconds.
    // Equal to `fraction` when dt is exactly one reference frame.
    pub fn ease_factor(&self, fraction: f32, dt: f32) -> f32 {
        1.0 - (1.0 - fraction).powf(self.frame_scale(dt))
    }

    pub fn take_snapshot(&mut self) {
        self.previous_values = Some(self.snapshot());
    }

    // Compare against the last snapshot. Without one nothing has changed.
    pub fn detect_changes(&self) -> ParamChanges {
        let Some(prev) = &self.previous_values else {
            return ParamChanges::default();
        };
        let now = self.snapshot();

        let rebuild_needed = now.base_size != prev.base_size
            || now.size_step != prev.size_step
            || now.hue_step != prev.hue_step
            || now.satellites_per_body != prev.satellites_per_body
            || now.radius_margin != prev.radius_margin
            || now.radius_jitter != prev.radius_jitter;

        ParamChanges {
            rebuild_needed,
            any_changed: rebuild_needed || now != *prev,
        }
    }

    fn snapshot(&self) -> ParamSnapshot {
        ParamSnapshot {
            base_size: self.base_size,
            size_step: self.size_step,
            hue_step: self.hue_step,
            satellites_per_body: self.satellites_per_body,
            radius_margin: self.radius_margin,
            radius_jitter: self.radius_jitter,
            interaction: self.interaction,
            show_debug: self.show_debug,
            pause_simulation: self.pause_simulation,
        }
    }

    pub fn get_satellite_range() -> RangeInclusive<usize> {
        1..=256
    }

    // Open interval (0, 1) approximated for f32
    pub fn get_fraction_range() -> RangeInclusive<f32> {
        f32::EPSILON..=(1.0 - f32::EPSILON)
    }
}

fn check(field: &'static str, value: f32, ok: impl Fn(f32) -> bool) -> Result<(), ParamsError> {
    if value.is_finite() && ok(value) {
        Ok(())
    } else {
        Err(ParamsError::OutOfRange {
            field,
            value: value as f64,
        })
    }
}
