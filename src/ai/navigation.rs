//! Aim-point planning
//!
//! Turns the behavior state and the current target into a single world
//! position for the steering layer to fly at.

use glam::Vec3;
use hecs::Entity;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::fsm::{BehaviorState, EngagementPolicy};
use crate::core::config::{EngagementConfig, PatrolConfig, PilotConfig};
use crate::ecs::Contact;

// ============================================================================
// Waypoints
// ============================================================================

/// How the patrol cursor moves once a waypoint is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaypointOrdering {
    /// Next index, wrapping to the first
    #[default]
    Sequential,
    /// Uniform random pick among the other waypoints
    Random,
}

/// Patrol waypoints, generated once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct WaypointSet {
    points: Vec<Vec3>,
    cursor: usize,
    ordering: WaypointOrdering,
}

impl WaypointSet {
    /// Build from explicit points.
    #[must_use]
    pub fn from_points(points: Vec<Vec3>, ordering: WaypointOrdering) -> Self {
        Self {
            points,
            cursor: 0,
            ordering,
        }
    }

    /// Scatter `waypoint_count` points uniformly over the patrol box.
    pub fn generate(config: &PatrolConfig, rng: &mut impl Rng) -> Self {
        let half_x = config.size.x.abs() * 0.5;
        let half_z = config.size.y.abs() * 0.5;
        let (alt_lo, alt_hi) = (
            config.altitude_min.min(config.altitude_max),
            config.altitude_min.max(config.altitude_max),
        );

        let points = (0..config.waypoint_count.max(1))
            .map(|_| {
                Vec3::new(
                    config.center.x + rng.gen_range(-half_x..=half_x),
                    rng.gen_range(alt_lo..=alt_hi),
                    config.center.z + rng.gen_range(-half_z..=half_z),
                )
            })
            .collect();
        Self::from_points(points, config.ordering)
    }

    #[must_use]
    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub fn current(&self) -> Option<Vec3> {
        self.points.get(self.cursor).copied()
    }

    /// Move the cursor per the ordering mode.
    pub fn advance(&mut self, rng: &mut impl Rng) {
        let len = self.points.len();
        if len < 2 {
            return;
        }
        self.cursor = match self.ordering {
            WaypointOrdering::Sequential => (self.cursor + 1) % len,
            WaypointOrdering::Random => {
                // Skip over the current index so the pick always moves.
                let pick = rng.gen_range(0..len - 1);
                if pick >= self.cursor { pick + 1 } else { pick }
            }
        };
    }

    /// Advance if `position` is within `reach` of the current waypoint.
    pub fn update(&mut self, position: Vec3, reach: f32, rng: &mut impl Rng) -> bool {
        match self.current() {
            Some(point) if point.distance(position) <= reach => {
                self.advance(rng);
                log::debug!("waypoint reached, next #{}", self.cursor);
                true
            }
            _ => false,
        }
    }
}

// ============================================================================
// Aim points
// ============================================================================

/// Composite navigation output, replaced as a whole on every decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationTarget {
    pub aim_point: Vec3,
    pub state: BehaviorState,
    pub target: Option<Entity>,
}

/// Where the target will be after `lead_time` seconds at its current velocity.
#[must_use]
pub fn predict_position(target: &Contact, lead_time: f32) -> Vec3 {
    target.position + target.velocity.unwrap_or(Vec3::ZERO) * lead_time
}

/// Aim point while engaging `target` under `policy`.
#[must_use]
pub fn pursuit_point(
    policy: EngagementPolicy,
    position: Vec3,
    target: &Contact,
    skill: f32,
    config: &EngagementConfig,
) -> Vec3 {
    let ideal = config.ideal_distance();
    match policy {
        EngagementPolicy::Aggressive => {
            let predicted = predict_position(target, config.lead_prediction_time * skill);
            let behind = target.position - target.heading() * ideal
                + Vec3::Y * config.altitude_advantage;
            predicted.lerp(behind, skill * 0.7)
        }
        EngagementPolicy::Defensive => {
            let away = (position - target.position).normalize_or(-target.heading());
            target.position + away * ideal + Vec3::Y * (1.5 * config.altitude_advantage)
        }
        EngagementPolicy::Escort => {
            target.position
                + target.right() * (0.7 * ideal)
                + Vec3::Y * config.escort_altitude_offset
        }
    }
}

/// Sign of the jink perpendicular for the window containing `clock`.
#[must_use]
pub fn jink_sign(clock: f32, period: f32) -> f32 {
    let window = (clock / period.max(1e-3)).floor() as i64;
    if window.rem_euclid(2) == 0 { 1.0 } else { -1.0 }
}

/// Aim point while breaking away from a threat at `threat`.
pub fn evasion_point(
    position: Vec3,
    threat: Vec3,
    clock: f32,
    config: &EngagementConfig,
    rng: &mut impl Rng,
) -> Vec3 {
    let away = (position - threat).normalize_or(Vec3::X);
    let perpendicular = away.cross(Vec3::Y).normalize_or(Vec3::Z)
        * jink_sign(clock, config.evade_jink_period);
    let jitter = config.evade_vertical_jitter.abs();
    let vertical = if jitter > 0.0 {
        rng.gen_range(-jitter..=jitter)
    } else {
        0.0
    };
    position + (away + perpendicular) * config.evade_lateral_distance + Vec3::Y * vertical
}

/// Owns the patrol route and the planner's random stream.
#[derive(Debug, Clone)]
pub struct NavigationPlanner {
    waypoints: WaypointSet,
    rng: ChaCha8Rng,
}

impl NavigationPlanner {
    #[must_use]
    pub fn new(waypoints: WaypointSet, rng: ChaCha8Rng) -> Self {
        Self { waypoints, rng }
    }

    /// Generate the patrol route from `config` using `rng`.
    pub fn from_config(config: &PatrolConfig, mut rng: ChaCha8Rng) -> Self {
        let waypoints = WaypointSet::generate(config, &mut rng);
        log::debug!("generated {} patrol waypoints", waypoints.len());
        Self::new(waypoints, rng)
    }

    #[must_use]
    pub fn waypoints(&self) -> &WaypointSet {
        &self.waypoints
    }

    /// Aim point for the current patrol leg, without moving the cursor.
    #[must_use]
    pub fn patrol_point(&self, config: &PatrolConfig) -> Vec3 {
        self.waypoints.current().unwrap_or(config.center)
    }

    /// Compute the navigation target for one decision.
    ///
    /// Engage and Evade without a live target fall back to patrolling.
    pub fn plan(
        &mut self,
        state: BehaviorState,
        position: Vec3,
        target: Option<&Contact>,
        config: &PilotConfig,
        clock: f32,
    ) -> NavigationTarget {
        let aim_point = match (state, target) {
            (BehaviorState::Engage, Some(target)) => pursuit_point(
                config.policy,
                position,
                target,
                config.skill_level,
                &config.engagement,
            ),
            (BehaviorState::Evade, Some(target)) => evasion_point(
                position,
                target.position,
                clock,
                &config.engagement,
                &mut self.rng,
            ),
            (BehaviorState::Return, _) => config.patrol.center,
            _ => {
                self.waypoints
                    .update(position, config.patrol.reach_distance, &mut self.rng);
                self.patrol_point(&config.patrol)
            }
        };
        NavigationTarget {
            aim_point,
            state,
            target: target.map(|t| t.entity),
        }
    }
}
