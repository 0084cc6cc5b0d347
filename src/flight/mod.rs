//! Flight control and flight model
//!
//! Speed regulation, terrain avoidance, input shaping and the kinematic
//! integrator that turns commands into motion.

mod boundary;
mod controls;
mod dynamics;
mod speed;
mod terrain;

pub use boundary::{BoundaryEnforcer, BoundingVolume};
pub use controls::{ControlInputs, apply_dead_zone, approach_factor, inverse_lerp, smooth};
pub use dynamics::{FlightDynamics, FlightReport, FlightState, bank_angle};
pub use speed::{MachController, SpeedCommand, SpeedTarget};
pub use terrain::{AvoidanceOutput, ProbeState, TerrainAvoidance, ThrottleOverride};
