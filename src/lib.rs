//! Decision and flight-control core for AI combat aircraft
//!
//! This crate provides:
//! - Target selection, behavior states and aim-point planning per pilot
//! - A kinematic flight model with Mach-referenced speed control
//! - Terrain and obstacle avoidance over rapier3d ray queries
//! - A headless fixed-timestep driver over a hecs entity world

pub mod ai;
pub mod core;
pub mod ecs;
pub mod flight;
pub mod physics;

// Re-exports for convenience
pub use glam;
pub use hecs;
pub use rapier3d;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::ai::{BehaviorState, EngagementPolicy, PilotController, PilotSnapshot};
    pub use crate::core::{
        AircraftSpawn, FlightEvent, PilotConfig, Scenario, Simulation, SimulationConfig,
    };
    pub use crate::ecs::{Allegiance, Contact, EntityDirectory, Faction, Name, Transform, World};
    pub use crate::flight::{ControlInputs, FlightState};
    pub use crate::physics::{FlatGround, Physics, RayFilter, RayHit, WorldQuery};
    pub use glam::{Quat, Vec2, Vec3};
}
