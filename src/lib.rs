/*
 * Orbitsync - Module Definitions
 *
 * A scene of orbiting particles that spans several windows. Every window
 * is a surface in a shared registry; each surface gets a body with a ring
 * of satellites, and every window shows its own slice of one continuous
 * desktop-sized space.
 */

// Re-export key components for easier access
pub use app::Model;
pub use body::{BodyHandle, EntityState, PrimaryBody, Satellite};
pub use camera::Camera;
pub use debug::DebugInfo;
pub use error::{ParamsError, RegistryError, SimError};
pub use params::{InteractionMode, SimulationParams};
pub use population::Population;
pub use registry::{MemoryRegistry, Metadata, RegistryNotice, SharedFileRegistry, SurfaceRegistry};
pub use scene::Scene;
pub use simulation::Simulation;
pub use surface::{Surface, SurfaceId, SurfaceRect};
pub use viewport::ViewportOffset;

// Define modules
pub mod app;
pub mod body;
pub mod camera;
pub mod clock;
pub mod debug;
pub mod error;
pub mod input;
pub mod motion;
pub mod params;
pub mod population;
pub mod registry;
pub mod renderer;
pub mod scene;
pub mod simulation;
pub mod surface;
pub mod ui;
pub mod viewport;

// Constants
pub const SATELLITE_SIZE: f32 = 5.0;
pub const MERIDIANS: usize = 4;
pub const WINDOW_TITLE: &str = "orbitsync";
