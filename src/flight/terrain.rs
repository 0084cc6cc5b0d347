//! Predictive terrain and obstacle avoidance
//!
//! Runs every physics tick before commands are committed and may override
//! the navigation pitch/roll. Two probes are used: a ray straight down for
//! ground clearance and a speed-scaled ray along the nose for obstacles.

use glam::Vec3;

use super::controls::{ControlInputs, inverse_lerp, smooth};
use crate::core::config::TerrainConfig;
use crate::physics::{RayFilter, WorldQuery};

/// How avoidance constrains the throttle this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ThrottleOverride {
    None,
    /// Full power
    Full,
    /// Throttle input no lower than this
    AtLeast(f32),
}

impl ThrottleOverride {
    fn strongest(self, other: ThrottleOverride) -> ThrottleOverride {
        match (self, other) {
            (ThrottleOverride::Full, _) | (_, ThrottleOverride::Full) => ThrottleOverride::Full,
            (ThrottleOverride::AtLeast(a), ThrottleOverride::AtLeast(b)) => {
                ThrottleOverride::AtLeast(a.max(b))
            }
            (ThrottleOverride::AtLeast(a), ThrottleOverride::None)
            | (ThrottleOverride::None, ThrottleOverride::AtLeast(a)) => {
                ThrottleOverride::AtLeast(a)
            }
            (ThrottleOverride::None, ThrottleOverride::None) => ThrottleOverride::None,
        }
    }
}

/// Result of one avoidance evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvoidanceOutput {
    pub avoiding: bool,
    /// 0 is no threat, 1 is imminent
    pub priority: f32,
    /// Blended pitch command
    pub pitch: f32,
    /// Blended roll command
    pub roll: f32,
    pub throttle: ThrottleOverride,
    /// Clearance above the ground, when it could be measured
    pub agl: Option<f32>,
}

impl AvoidanceOutput {
    /// Merge avoidance into the navigation commands.
    ///
    /// Above `override_priority` navigation pitch/roll are replaced outright,
    /// below it they are blended by priority.
    #[must_use]
    pub fn apply(&self, navigation: ControlInputs, override_priority: f32) -> ControlInputs {
        let mut inputs = navigation;
        if self.avoiding {
            if self.priority > override_priority {
                inputs.pitch = self.pitch;
                inputs.roll = self.roll;
            } else {
                inputs.pitch += (self.pitch - inputs.pitch) * self.priority;
                inputs.roll += (self.roll - inputs.roll) * self.priority;
            }
        }
        inputs.throttle = match self.throttle {
            ThrottleOverride::None => inputs.throttle,
            ThrottleOverride::Full => 1.0,
            ThrottleOverride::AtLeast(floor) => inputs.throttle.max(floor),
        };
        inputs.clamped()
    }
}

/// Aircraft state the probes need.
#[derive(Debug, Clone, Copy)]
pub struct ProbeState {
    pub position: Vec3,
    pub forward: Vec3,
    pub right: Vec3,
    pub speed: f32,
}

/// Persistent avoidance state.
#[derive(Debug, Clone, Default)]
pub struct TerrainAvoidance {
    avoiding: bool,
    priority: f32,
    pitch: f32,
    roll: f32,
    warned_missing_query: bool,
}

impl TerrainAvoidance {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_avoiding(&self) -> bool {
        self.avoiding
    }

    #[must_use]
    pub fn priority(&self) -> f32 {
        self.priority
    }

    /// Forward probe length for the given airspeed.
    #[must_use]
    pub fn lookahead_distance(speed: f32, config: &TerrainConfig) -> f32 {
        let upper = config
            .terrain_check_distance
            .min(speed * config.lookahead_time_max)
            .max(config.min_lookahead);
        (speed * config.lookahead_time_min)
            .max(config.min_lookahead)
            .min(upper)
    }

    pub fn evaluate(
        &mut self,
        probe: &ProbeState,
        query: Option<&dyn WorldQuery>,
        config: &TerrainConfig,
        dt: f32,
    ) -> AvoidanceOutput {
        let mut avoiding = false;
        let mut priority: f32 = 0.0;
        let mut pitch_target: f32 = 0.0;
        let mut roll_target: f32 = 0.0;
        let mut throttle = ThrottleOverride::None;
        let mut agl = None;

        match query {
            None => {
                if !self.warned_missing_query {
                    log::warn!(
                        "no terrain query configured, falling back to altitude floor of {}",
                        config.min_altitude
                    );
                    self.warned_missing_query = true;
                }
                if probe.position.y < config.min_altitude {
                    avoiding = true;
                    priority = 1.0;
                    pitch_target = config.emergency_climb;
                    throttle = ThrottleOverride::Full;
                }
            }
            Some(query) => {
                let threshold = config.min_altitude.max(config.hard_deck_agl);

                // Ground clearance
                let probe_depth = config.terrain_check_distance.max(threshold * 2.0);
                if let Some(ground) =
                    query.cast(probe.position, Vec3::NEG_Y, probe_depth, RayFilter::Terrain)
                {
                    let clearance = probe.position.y - ground.point.y;
                    agl = Some(clearance);
                    if clearance < threshold {
                        avoiding = true;
                        priority = 1.0;
                        let urgency = inverse_lerp(
                            config.hard_deck_agl,
                            config.hard_deck_agl * 0.5,
                            clearance,
                        );
                        pitch_target = urgency * config.emergency_climb;
                        throttle = ThrottleOverride::Full;
                    }
                }

                // Forward look-ahead
                let distance = Self::lookahead_distance(probe.speed, config);
                if let Some(hit) = query.cast(
                    probe.position,
                    probe.forward,
                    distance,
                    RayFilter::TerrainAndObstacles,
                ) {
                    let threat = inverse_lerp(distance, distance * 0.3, hit.distance);
                    avoiding = true;
                    priority = priority.max(threat);
                    pitch_target = pitch_target.max(config.climb_command * threat);
                    throttle = throttle.strongest(ThrottleOverride::AtLeast(config.avoid_throttle));
                    let side = if hit.normal.dot(probe.right) >= 0.0 { 1.0 } else { -1.0 };
                    roll_target = side * config.sidestep_command * threat;
                    log::trace!(
                        "obstacle {:.0} m ahead (probe {:.0} m), threat {:.2}",
                        hit.distance,
                        distance,
                        threat
                    );
                }
            }
        }

        self.pitch = smooth(self.pitch, pitch_target, config.blend_rate, dt);
        self.roll = smooth(self.roll, roll_target, config.blend_rate, dt);
        self.avoiding = avoiding;
        self.priority = priority;

        AvoidanceOutput {
            avoiding,
            priority,
            pitch: self.pitch,
            roll: self.roll,
            throttle,
            agl,
        }
    }
}
