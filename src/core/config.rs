//! Construction-time tuning for one AI pilot
//!
//! Every section derives serde so pilots can be described in scenario files.
//! Missing fields fall back to their defaults.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::ai::{EngagementPolicy, WaypointOrdering};

/// Detection and decision cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Maximum straight-line detection distance
    pub range: f32,
    /// Seconds between target scans
    pub detection_interval: f32,
    /// Seconds between behavior re-evaluations
    pub decision_interval: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            range: 5000.0,
            detection_interval: 0.3,
            decision_interval: 0.5,
        }
    }
}

/// Patrol volume and waypoint generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolConfig {
    pub center: Vec3,
    /// Footprint size along X and Z
    pub size: Vec2,
    pub altitude_min: f32,
    pub altitude_max: f32,
    pub waypoint_count: usize,
    /// A waypoint counts as reached inside this distance
    pub reach_distance: f32,
    pub ordering: WaypointOrdering,
}

impl Default for PatrolConfig {
    fn default() -> Self {
        Self {
            center: Vec3::new(0.0, 1000.0, 0.0),
            size: Vec2::new(6000.0, 6000.0),
            altitude_min: 700.0,
            altitude_max: 1500.0,
            waypoint_count: 6,
            reach_distance: 300.0,
            ordering: WaypointOrdering::Sequential,
        }
    }
}

/// Engagement geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngagementConfig {
    pub distance_min: f32,
    pub distance_max: f32,
    /// Defensive pilots evade when the target is closer than this
    pub min_engagement_range: f32,
    /// Height kept above the target while attacking
    pub altitude_advantage: f32,
    /// Seconds of target motion to lead at full skill
    pub lead_prediction_time: f32,
    /// Height kept above an escorted aircraft
    pub escort_altitude_offset: f32,
    /// Length of an evasive break
    pub evade_lateral_distance: f32,
    /// Seconds before an evasive break reverses direction
    pub evade_jink_period: f32,
    /// Maximum random vertical offset of an evasive aim point
    pub evade_vertical_jitter: f32,
}

impl EngagementConfig {
    /// Midpoint of the engagement distance band
    #[must_use]
    pub fn ideal_distance(&self) -> f32 {
        (self.distance_min + self.distance_max) * 0.5
    }
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            distance_min: 400.0,
            distance_max: 1200.0,
            min_engagement_range: 600.0,
            altitude_advantage: 150.0,
            lead_prediction_time: 1.5,
            escort_altitude_offset: 50.0,
            evade_lateral_distance: 800.0,
            evade_jink_period: 3.0,
            evade_vertical_jitter: 150.0,
        }
    }
}

/// Engine and airframe speed limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    pub max_throttle: f32,
    /// Fastest change of the engine setting, per second
    pub throttle_response: f32,
    /// Forward acceleration at full throttle
    pub thrust_acceleration: f32,
    /// Extra deceleration when braking hard
    pub brake_deceleration: f32,
    /// Quadratic drag factor on forward speed
    pub drag_coefficient: f32,
    pub cruise_speed: f32,
    pub stall_threshold: f32,
    pub max_speed: f32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            max_throttle: 1.0,
            throttle_response: 0.8,
            thrust_acceleration: 45.0,
            brake_deceleration: 30.0,
            drag_coefficient: 3.5e-4,
            cruise_speed: 200.0,
            stall_threshold: 70.0,
            max_speed: 340.0,
        }
    }
}

/// Rotation rates, turn coupling and stall behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlingConfig {
    /// Base pitch rate in degrees per second
    pub pitch_rate: f32,
    /// Base roll rate in degrees per second
    pub roll_rate: f32,
    /// Yaw rate in radians per second at full bank strength
    pub turn_force: f32,
    /// Turn coupling is active for bank angles between these, in degrees
    pub bank_min: f32,
    pub bank_max: f32,
    /// Sideways acceleration while banked
    pub lateral_nudge: f32,
    /// Forward deceleration at full bank strength
    pub bank_speed_penalty: f32,
    /// Forward deceleration at full nose-up input
    pub pitch_speed_bleed: f32,
    /// Upward acceleration at full nose-up input
    pub pitch_lift: f32,
    /// Forward acceleration at full nose-down input
    pub dive_gain: f32,
    /// How quickly velocity realigns with the nose in level flight
    pub realign_rate: f32,
    /// How quickly a stalled nose drops, radians per second
    pub stall_rotation_rate: f32,
    pub stall_sink: f32,
    pub stall_push: f32,
    /// Pitch command per unit of vertical aim offset in the body frame
    pub pitch_gain: f32,
    /// Roll command per radian of bank error
    pub roll_gain: f32,
    /// Largest bank the steering will ask for, in degrees
    pub max_bank: f32,
}

impl Default for HandlingConfig {
    fn default() -> Self {
        Self {
            pitch_rate: 45.0,
            roll_rate: 90.0,
            turn_force: 0.6,
            bank_min: 15.0,
            bank_max: 165.0,
            lateral_nudge: 4.0,
            bank_speed_penalty: 6.0,
            pitch_speed_bleed: 12.0,
            pitch_lift: 6.0,
            dive_gain: 10.0,
            realign_rate: 2.0,
            stall_rotation_rate: 1.0,
            stall_sink: 9.81,
            stall_push: 6.0,
            pitch_gain: 2.5,
            roll_gain: 1.5,
            max_bank: 70.0,
        }
    }
}

/// Mach-referenced speed regulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachConfig {
    pub speed_of_sound: f32,
    pub mach_min: f32,
    pub mach_max: f32,
    pub cruise_mach: f32,
    pub combat_mach: f32,
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Anti-windup bound on the integral term
    pub integral_limit: f32,
    /// Raw PID output is divided by this before clamping to `[-1, 1]`
    pub output_scale: f32,
    /// Lower bound on the timestep used for the derivative
    pub min_dt: f32,
}

impl Default for MachConfig {
    fn default() -> Self {
        Self {
            speed_of_sound: 343.0,
            mach_min: 0.3,
            mach_max: 0.95,
            cruise_mach: 0.6,
            combat_mach: 0.8,
            kp: 3.0,
            ki: 0.5,
            kd: 0.05,
            integral_limit: 2.0,
            output_scale: 1.0,
            min_dt: 1e-3,
        }
    }
}

/// Terrain and obstacle avoidance thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainConfig {
    /// Altitude floor used when no terrain query is available
    pub min_altitude: f32,
    /// Clearance below which an emergency climb is forced
    pub hard_deck_agl: f32,
    /// Longest forward probe
    pub terrain_check_distance: f32,
    /// Shortest forward probe
    pub min_lookahead: f32,
    pub lookahead_time_min: f32,
    pub lookahead_time_max: f32,
    pub climb_command: f32,
    pub sidestep_command: f32,
    pub emergency_climb: f32,
    /// Exponential blend rate of avoidance commands
    pub blend_rate: f32,
    /// Minimum throttle input while avoiding an obstacle ahead
    pub avoid_throttle: f32,
    /// Above this priority navigation pitch/roll is ignored
    pub override_priority: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            min_altitude: 150.0,
            hard_deck_agl: 200.0,
            terrain_check_distance: 3000.0,
            min_lookahead: 500.0,
            lookahead_time_min: 4.0,
            lookahead_time_max: 10.0,
            climb_command: 1.0,
            sidestep_command: 0.8,
            emergency_climb: 1.0,
            blend_rate: 4.0,
            avoid_throttle: 0.8,
            override_priority: 0.5,
        }
    }
}

/// Input shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub smoothing_rate: f32,
    pub dead_zone: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            smoothing_rate: 6.0,
            dead_zone: 0.05,
        }
    }
}

/// Optional operating volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    /// Corners of the rectangular footprint, any order
    pub corners: [Vec3; 4],
    pub altitude_min: f32,
    pub altitude_max: f32,
    /// Outward velocity is limited within this distance of a face
    pub edge_margin: f32,
    pub outward_speed_limit: f32,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            corners: [
                Vec3::new(-5000.0, 0.0, -5000.0),
                Vec3::new(5000.0, 0.0, -5000.0),
                Vec3::new(5000.0, 0.0, 5000.0),
                Vec3::new(-5000.0, 0.0, 5000.0),
            ],
            altitude_min: 100.0,
            altitude_max: 6000.0,
            edge_margin: 100.0,
            outward_speed_limit: 10.0,
        }
    }
}

/// Full configuration of one AI pilot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    pub sensor: SensorConfig,
    pub patrol: PatrolConfig,
    pub engagement: EngagementConfig,
    pub speed: SpeedConfig,
    pub handling: HandlingConfig,
    pub mach: MachConfig,
    pub terrain: TerrainConfig,
    pub controls: ControlConfig,
    pub bounds: Option<BoundsConfig>,
    /// Absolute altitude floor, always enforced
    pub altitude_floor: f32,
    /// 0 is a novice, 1 an ace
    pub skill_level: f32,
    pub policy: EngagementPolicy,
    /// Seed for waypoint generation and evasive jitter
    pub seed: u64,
}

impl Default for PilotConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::default(),
            patrol: PatrolConfig::default(),
            engagement: EngagementConfig::default(),
            speed: SpeedConfig::default(),
            handling: HandlingConfig::default(),
            mach: MachConfig::default(),
            terrain: TerrainConfig::default(),
            controls: ControlConfig::default(),
            bounds: None,
            altitude_floor: 30.0,
            skill_level: 0.8,
            policy: EngagementPolicy::Aggressive,
            seed: 0,
        }
    }
}

fn ordered(a: &mut f32, b: &mut f32) {
    if *a > *b {
        std::mem::swap(a, b);
    }
}

/// Reset every listed field that is NaN or infinite to its default and
/// record its dotted name.
macro_rules! reset_non_finite {
    ($reset:ident, $prefix:literal, $section:expr, $defaults:expr, [$($field:ident),+ $(,)?]) => {
        $(
            if !$section.$field.is_finite() {
                $section.$field = $defaults.$field;
                $reset.push(concat!($prefix, stringify!($field)));
            }
        )+
    };
}

impl PilotConfig {
    /// Replace NaN and infinite values with their defaults.
    ///
    /// Returns the names of the fields that were reset.
    pub fn reset_non_finite(&mut self) -> Vec<&'static str> {
        let defaults = PilotConfig::default();
        let mut reset = Vec::new();
        reset_non_finite!(reset, "", self, defaults, [altitude_floor, skill_level]);
        reset_non_finite!(
            reset,
            "sensor.",
            self.sensor,
            defaults.sensor,
            [range, detection_interval, decision_interval]
        );
        reset_non_finite!(
            reset,
            "patrol.",
            self.patrol,
            defaults.patrol,
            [center, size, altitude_min, altitude_max, reach_distance]
        );
        reset_non_finite!(
            reset,
            "engagement.",
            self.engagement,
            defaults.engagement,
            [
                distance_min,
                distance_max,
                min_engagement_range,
                altitude_advantage,
                lead_prediction_time,
                escort_altitude_offset,
                evade_lateral_distance,
                evade_jink_period,
                evade_vertical_jitter,
            ]
        );
        reset_non_finite!(
            reset,
            "speed.",
            self.speed,
            defaults.speed,
            [
                max_throttle,
                throttle_response,
                thrust_acceleration,
                brake_deceleration,
                drag_coefficient,
                cruise_speed,
                stall_threshold,
                max_speed,
            ]
        );
        reset_non_finite!(
            reset,
            "handling.",
            self.handling,
            defaults.handling,
            [
                pitch_rate,
                roll_rate,
                turn_force,
                bank_min,
                bank_max,
                lateral_nudge,
                bank_speed_penalty,
                pitch_speed_bleed,
                pitch_lift,
                dive_gain,
                realign_rate,
                stall_rotation_rate,
                stall_sink,
                stall_push,
                pitch_gain,
                roll_gain,
                max_bank,
            ]
        );
        reset_non_finite!(
            reset,
            "mach.",
            self.mach,
            defaults.mach,
            [
                speed_of_sound,
                mach_min,
                mach_max,
                cruise_mach,
                combat_mach,
                kp,
                ki,
                kd,
                integral_limit,
                output_scale,
                min_dt,
            ]
        );
        reset_non_finite!(
            reset,
            "terrain.",
            self.terrain,
            defaults.terrain,
            [
                min_altitude,
                hard_deck_agl,
                terrain_check_distance,
                min_lookahead,
                lookahead_time_min,
                lookahead_time_max,
                climb_command,
                sidestep_command,
                emergency_climb,
                blend_rate,
                avoid_throttle,
                override_priority,
            ]
        );
        reset_non_finite!(
            reset,
            "controls.",
            self.controls,
            defaults.controls,
            [smoothing_rate, dead_zone]
        );
        if let Some(bounds) = self.bounds.as_mut() {
            let fallback = BoundsConfig::default();
            reset_non_finite!(
                reset,
                "bounds.",
                bounds,
                fallback,
                [altitude_min, altitude_max, edge_margin, outward_speed_limit]
            );
            if bounds.corners.iter().any(|c| !c.is_finite()) {
                bounds.corners = fallback.corners;
                reset.push("bounds.corners");
            }
        }
        reset
    }

    /// Describe every problem with this configuration.
    ///
    /// Problems are never fatal: [`PilotConfig::sanitized`] repairs them.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut warnings: Vec<String> = self
            .clone()
            .reset_non_finite()
            .into_iter()
            .map(|field| format!("{field} is not a finite number"))
            .collect();
        if self.skill_level.is_finite() && !(0.0..=1.0).contains(&self.skill_level) {
            warnings.push(format!("skill_level {} outside [0, 1]", self.skill_level));
        }
        if self.sensor.range <= 0.0 {
            warnings.push("sensor range must be positive".to_string());
        }
        if self.sensor.detection_interval <= 0.0 || self.sensor.decision_interval <= 0.0 {
            warnings.push("sensor intervals must be positive".to_string());
        }
        if self.patrol.altitude_min > self.patrol.altitude_max {
            warnings.push("patrol altitude band is inverted".to_string());
        }
        if self.patrol.waypoint_count == 0 {
            warnings.push("patrol needs at least one waypoint".to_string());
        }
        if self.engagement.distance_min > self.engagement.distance_max {
            warnings.push("engagement distance band is inverted".to_string());
        }
        if self.mach.mach_min > self.mach.mach_max {
            warnings.push("mach_min exceeds mach_max".to_string());
        }
        if self.mach.speed_of_sound <= 0.0 {
            warnings.push("speed_of_sound must be positive".to_string());
        }
        if self.mach.integral_limit < 0.0 {
            warnings.push("integral_limit must not be negative".to_string());
        }
        if self.speed.max_throttle <= 0.0 {
            warnings.push("max_throttle must be positive".to_string());
        }
        if self.speed.stall_threshold * 1.2 > self.speed.max_speed {
            warnings.push("stall margin exceeds max_speed".to_string());
        }
        if self.terrain.lookahead_time_min > self.terrain.lookahead_time_max {
            warnings.push("terrain look-ahead times are inverted".to_string());
        }
        if let Some(bounds) = &self.bounds {
            if bounds.altitude_min > bounds.altitude_max {
                warnings.push("bounding volume altitude band is inverted".to_string());
            }
        }
        warnings
    }

    /// Copy with non-finite values reset, out-of-range values clamped and
    /// inverted pairs swapped.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        config.reset_non_finite();
        config.skill_level = config.skill_level.clamp(0.0, 1.0);
        config.sensor.range = config.sensor.range.max(0.0);
        config.sensor.detection_interval = config.sensor.detection_interval.max(0.01);
        config.sensor.decision_interval = config.sensor.decision_interval.max(0.01);
        config.patrol.waypoint_count = config.patrol.waypoint_count.max(1);
        ordered(&mut config.patrol.altitude_min, &mut config.patrol.altitude_max);
        ordered(
            &mut config.engagement.distance_min,
            &mut config.engagement.distance_max,
        );
        ordered(&mut config.mach.mach_min, &mut config.mach.mach_max);
        config.mach.speed_of_sound = config.mach.speed_of_sound.max(1.0);
        config.mach.integral_limit = config.mach.integral_limit.abs();
        config.mach.output_scale = config.mach.output_scale.abs().max(1e-3);
        config.mach.min_dt = config.mach.min_dt.max(1e-6);
        config.speed.max_throttle = config.speed.max_throttle.max(0.01);
        config.speed.max_speed = config
            .speed
            .max_speed
            .max(config.speed.stall_threshold * 1.2);
        ordered(
            &mut config.terrain.lookahead_time_min,
            &mut config.terrain.lookahead_time_max,
        );
        if let Some(bounds) = config.bounds.as_mut() {
            ordered(&mut bounds.altitude_min, &mut bounds.altitude_max);
        }
        config
    }
}

/// Errors that can occur loading or saving configuration
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// IO error
    IoError(String),
    /// Serialization error
    SerializeError(String),
    /// Deserialization error
    DeserializeError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IoError(e) => write!(f, "IO error: {e}"),
            Self::SerializeError(e) => write!(f, "Serialization error: {e}"),
            Self::DeserializeError(e) => write!(f, "Deserialization error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PilotConfig::default().validate().is_empty());
    }

    #[test]
    fn test_sanitize_repairs_bad_values() {
        let mut config = PilotConfig {
            skill_level: 1.7,
            ..Default::default()
        };
        config.mach.mach_min = 0.9;
        config.mach.mach_max = 0.4;
        config.engagement.distance_min = 2000.0;

        assert_eq!(config.validate().len(), 3);

        let fixed = config.sanitized();
        assert!(fixed.validate().is_empty());
        assert_eq!(fixed.skill_level, 1.0);
        assert!(fixed.mach.mach_min < fixed.mach.mach_max);
        assert_eq!(fixed.engagement.distance_max, 2000.0);
    }

    #[test]
    fn test_sanitize_resets_non_finite_values() {
        let mut config: PilotConfig = ron::from_str("(skill_level: NaN)").unwrap();
        config.sensor.range = f32::INFINITY;
        config.mach.ki = f32::NEG_INFINITY;
        config.patrol.center = Vec3::new(0.0, f32::NAN, 0.0);

        let warnings = config.validate();
        assert_eq!(warnings.len(), 4);
        assert!(warnings.iter().any(|w| w.starts_with("skill_level ")));
        assert!(warnings.iter().any(|w| w.starts_with("sensor.range ")));
        assert!(warnings.iter().any(|w| w.starts_with("mach.ki ")));
        assert!(warnings.iter().any(|w| w.starts_with("patrol.center ")));

        let defaults = PilotConfig::default();
        let fixed = config.sanitized();
        assert!(fixed.validate().is_empty());
        assert_eq!(fixed.skill_level, defaults.skill_level);
        assert_eq!(fixed.sensor.range, defaults.sensor.range);
        assert_eq!(fixed.mach.ki, defaults.mach.ki);
        assert_eq!(fixed.patrol.center, defaults.patrol.center);
    }

    #[test]
    fn test_non_finite_bounds_fall_back() {
        let mut config = PilotConfig {
            bounds: Some(BoundsConfig::default()),
            ..Default::default()
        };
        if let Some(bounds) = config.bounds.as_mut() {
            bounds.corners[2].x = f32::NAN;
            bounds.edge_margin = f32::INFINITY;
        }
        let fixed = config.sanitized();
        assert_eq!(fixed.bounds, Some(BoundsConfig::default()));
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: PilotConfig =
            ron::from_str("(skill_level: 0.5, policy: Defensive)").unwrap();
        assert_eq!(config.skill_level, 0.5);
        assert_eq!(config.policy, EngagementPolicy::Defensive);
        assert_eq!(config.sensor, SensorConfig::default());
    }

    #[test]
    fn test_ideal_distance_is_band_midpoint() {
        let engagement = EngagementConfig::default();
        assert_eq!(engagement.ideal_distance(), 800.0);
    }
}
