/*
 * Error Module
 *
 * Error types for the three places things can go wrong: a single frame of
 * the simulation, the shared surface registry, and loading parameters.
 * Frame errors are recoverable (the frame is dropped), the other two are
 * setup failures.
 */

use thiserror::Error;

use crate::surface::SurfaceId;

// Faults raised while advancing one frame
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("surface {id} has a malformed rectangle: {reason}")]
    MalformedSurface { id: SurfaceId, reason: &'static str },

    #[error("invalid frame time (now = {now}, dt = {dt})")]
    InvalidTime { now: f64, dt: f32 },
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("shared surface store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shared surface store is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry used before init")]
    NotInitialized,
}

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("could not read params file: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse params file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{field} = {value} is out of range")]
    OutOfRange { field: &'static str, value: f64 },
}
