//! Core simulation module
//!
//! Configuration, scenario files, pilot events and the fixed-timestep
//! driver that runs every pilot.

pub mod config;
pub mod events;
pub mod interval;
pub mod scenario;
pub mod simulation;

pub use config::{
    BoundsConfig, ConfigError, ControlConfig, EngagementConfig, HandlingConfig, MachConfig,
    PatrolConfig, PilotConfig, SensorConfig, SpeedConfig, TerrainConfig,
};
pub use events::{EventQueue, FlightEvent};
pub use interval::Interval;
pub use scenario::{
    AircraftSpawn, ObstacleShape, ObstacleSpec, Scenario, SimulationConfig, TerrainLayout,
};
pub use simulation::Simulation;
