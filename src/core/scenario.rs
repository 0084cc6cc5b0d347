//! Scenario files
//!
//! A scenario describes the terrain, the obstacles and the aircraft of one
//! headless engagement. Scenarios are stored as RON or JSON.

use std::fs;
use std::path::Path;

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use super::config::{ConfigError, PilotConfig};
use crate::ai::EngagementPolicy;
use crate::ecs::Faction;

/// Fixed-timestep driver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Physics step in seconds
    pub fixed_dt: f32,
    /// Simulated seconds the demo runs for
    pub duration: f32,
    /// Upper bound on physics steps per `advance` call
    pub max_steps_per_advance: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 50.0,
            duration: 60.0,
            max_steps_per_advance: 8,
        }
    }
}

/// Shape of a static obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleShape {
    Box {
        half_extents: Vec3,
        /// Rotation about world up, in degrees
        yaw: f32,
    },
    Sphere {
        radius: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSpec {
    pub center: Vec3,
    pub shape: ObstacleShape,
}

/// Ground and obstacles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainLayout {
    /// Height of a flat ground slab, `None` for no terrain at all
    pub ground_height: Option<f32>,
    /// Horizontal extent of the ground slab
    pub ground_size: Vec2,
    pub obstacles: Vec<ObstacleSpec>,
}

impl TerrainLayout {
    /// Whether any geometry exists to query.
    #[must_use]
    pub fn has_geometry(&self) -> bool {
        self.ground_height.is_some() || !self.obstacles.is_empty()
    }
}

impl Default for TerrainLayout {
    fn default() -> Self {
        Self {
            ground_height: Some(0.0),
            ground_size: Vec2::new(40_000.0, 40_000.0),
            obstacles: Vec::new(),
        }
    }
}

/// One aircraft to spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftSpawn {
    pub name: String,
    pub faction: Faction,
    pub position: Vec3,
    /// Initial heading, flattened to the horizontal plane
    pub heading: Vec3,
    pub speed: f32,
    #[serde(default)]
    pub pilot: PilotConfig,
}

/// A complete headless engagement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub name: String,
    pub simulation: SimulationConfig,
    pub terrain: TerrainLayout,
    pub aircraft: Vec<AircraftSpawn>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Untitled".to_string(),
            simulation: SimulationConfig::default(),
            terrain: TerrainLayout::default(),
            aircraft: Vec::new(),
        }
    }
}

impl Scenario {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Two aircraft closing head-on, already inside sensor range, over flat
    /// ground with a ridge between their patrol areas.
    #[must_use]
    pub fn default_duel() -> Self {
        let blue = PilotConfig {
            seed: 1,
            policy: EngagementPolicy::Aggressive,
            skill_level: 0.9,
            ..Default::default()
        };
        let mut red = PilotConfig {
            seed: 2,
            policy: EngagementPolicy::Defensive,
            skill_level: 0.7,
            ..Default::default()
        };
        red.patrol.center = Vec3::new(0.0, 1000.0, -5000.0);

        Self {
            name: "Duel".to_string(),
            simulation: SimulationConfig::default(),
            terrain: TerrainLayout {
                obstacles: vec![ObstacleSpec {
                    center: Vec3::new(0.0, 300.0, -3000.0),
                    shape: ObstacleShape::Box {
                        half_extents: Vec3::new(2000.0, 300.0, 150.0),
                        yaw: 0.0,
                    },
                }],
                ..Default::default()
            },
            aircraft: vec![
                AircraftSpawn {
                    name: "Viper".to_string(),
                    faction: Faction::Blue,
                    position: Vec3::new(0.0, 1200.0, 0.0),
                    heading: Vec3::NEG_Z,
                    speed: 200.0,
                    pilot: blue,
                },
                AircraftSpawn {
                    name: "Flanker".to_string(),
                    faction: Faction::Red,
                    position: Vec3::new(300.0, 1100.0, -4500.0),
                    heading: Vec3::Z,
                    speed: 200.0,
                    pilot: red,
                },
            ],
        }
    }

    /// Save scenario to a RON file
    pub fn save_ron(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let ron_string = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, ron_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load scenario from a RON file
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    pub fn from_ron_str(content: &str) -> Result<Self, ConfigError> {
        ron::from_str(content).map_err(|e| ConfigError::DeserializeError(e.to_string()))
    }

    /// Save scenario to a JSON file
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json_string = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        fs::write(path, json_string).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Load scenario from a JSON file
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| ConfigError::DeserializeError(e.to_string()))
    }

    /// Load a scenario, picking the format from the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::load_json(path),
            _ => Self::load_ron(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_serialization_ron() {
        let scenario = Scenario::default_duel();
        let ron_str =
            ron::ser::to_string_pretty(&scenario, ron::ser::PrettyConfig::default()).unwrap();
        assert!(ron_str.contains("Viper"));

        let loaded = Scenario::from_ron_str(&ron_str).unwrap();
        assert_eq!(loaded, scenario);
    }

    #[test]
    fn test_scenario_serialization_json() {
        let scenario = Scenario::default_duel();
        let json_str = serde_json::to_string(&scenario).unwrap();
        let loaded: Scenario = serde_json::from_str(&json_str).unwrap();
        assert_eq!(loaded.aircraft.len(), 2);
        assert_eq!(loaded.aircraft[1].pilot.policy, EngagementPolicy::Defensive);
    }

    #[test]
    fn test_minimal_ron_fills_defaults() {
        let scenario = Scenario::from_ron_str(
            r#"(
                name: "Solo",
                aircraft: [(
                    name: "Lone",
                    faction: Blue,
                    position: (0.0, 900.0, 0.0),
                    heading: (1.0, 0.0, 0.0),
                    speed: 180.0,
                )],
            )"#,
        )
        .unwrap();
        assert_eq!(scenario.name, "Solo");
        assert_eq!(scenario.terrain.ground_height, Some(0.0));
        assert_eq!(scenario.aircraft[0].pilot, PilotConfig::default());
    }

    #[test]
    fn test_malformed_ron_is_a_deserialize_error() {
        let err = Scenario::from_ron_str("(name: 5").unwrap_err();
        assert!(matches!(err, ConfigError::DeserializeError(_)));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let err = Scenario::load_ron("/nonexistent/scenario.ron").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
    }
}
