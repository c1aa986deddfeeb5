/*
 * Surface Module
 *
 * A surface is one participating window: an opaque id plus the rectangle it
 * occupies on the desktop, in points, with y growing downwards. Surfaces are
 * owned by the registry and only read by the simulation.
 */

use std::fmt;

use nannou::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::SimError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    // Top-left corner on the desktop
    pub fn position(&self) -> Vec2 {
        vec2(self.x, self.y)
    }

    pub fn center(&self) -> Vec2 {
        vec2(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    // Reject rectangles the simulation cannot place a body on
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err("non-finite position");
        }
        if !(self.width.is_finite() && self.height.is_finite()) {
            return Err("non-finite size");
        }
        if self.width < 0.0 || self.height < 0.0 {
            return Err("negative size");
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub id: SurfaceId,
    pub rect: SurfaceRect,
}

impl Surface {
    pub fn new(id: SurfaceId, rect: SurfaceRect) -> Self {
        Self { id, rect }
    }

    // Center of the rectangle, or the fault that stops a body from tracking it
    pub fn target(&self) -> Result<Vec2, SimError> {
        self.rect
            .validate()
            .map(|_| self.rect.center())
            .map_err(|reason| SimError::MalformedSurface { id: self.id, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_middle_of_rect() {
        let rect = SurfaceRect::new(0.0, 0.0, 800.0, 600.0);
        assert_eq!(rect.center(), vec2(400.0, 300.0));

        let rect = SurfaceRect::new(100.0, -50.0, 200.0, 100.0);
        assert_eq!(rect.center(), vec2(200.0, 0.0));
    }

    #[test]
    fn malformed_rects_are_rejected() {
        assert!(SurfaceRect::new(f32::NAN, 0.0, 10.0, 10.0).validate().is_err());
        assert!(SurfaceRect::new(0.0, 0.0, f32::INFINITY, 10.0).validate().is_err());
        assert!(SurfaceRect::new(0.0, 0.0, 10.0, -1.0).validate().is_err());
        assert!(SurfaceRect::new(0.0, 0.0, 0.0, 0.0).validate().is_ok());
    }

    #[test]
    fn target_reports_the_offending_surface() {
        let surface = Surface::new(SurfaceId(7), SurfaceRect::new(0.0, 0.0, -5.0, 5.0));
        match surface.target() {
            Err(SimError::MalformedSurface { id, .. }) => assert_eq!(id, SurfaceId(7)),
            other => panic!("unexpected {:?}", other),
        }
    }
}
