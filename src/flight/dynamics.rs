//! Simplified fixed-wing flight model
//!
//! Closed-form kinematic integration of thrust, drag, stall, pitch and
//! bank-to-turn coupling. The order of the steps in
//! [`FlightDynamics::integrate`] matters: stall is evaluated before pitch so
//! it can take pitch authority away, and the final speed clamp runs after
//! every acceleration has been applied.

use glam::{Quat, Vec3};

use super::boundary::BoundaryEnforcer;
use super::controls::{ControlInputs, approach_factor};
use crate::core::config::{HandlingConfig, SpeedConfig};
use crate::ecs::{Transform, look_rotation};

/// Kinematic state of one aircraft.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightState {
    pub position: Vec3,
    pub rotation: Quat,
    pub velocity: Vec3,
    /// Engine setting in `[0, max_throttle]`
    pub throttle: f32,
}

impl FlightState {
    /// Level flight along `heading` at `speed`
    #[must_use]
    pub fn level(position: Vec3, heading: Vec3, speed: f32) -> Self {
        let rotation = look_rotation(Vec3::new(heading.x, 0.0, heading.z), Vec3::Y);
        Self {
            position,
            rotation,
            velocity: rotation * Vec3::NEG_Z * speed,
            throttle: 0.5,
        }
    }

    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    #[must_use]
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Airspeed along the nose
    #[must_use]
    pub fn forward_speed(&self) -> f32 {
        self.velocity.dot(self.forward())
    }

    #[must_use]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Signed bank angle in radians, positive when banked right
    #[must_use]
    pub fn bank_angle(&self) -> f32 {
        bank_angle(self.rotation)
    }

    #[must_use]
    pub fn transform(&self) -> Transform {
        Transform::from_position_rotation(self.position, self.rotation)
    }
}

/// Signed angle between world up and the aircraft's up axis, measured about
/// the forward axis.
#[must_use]
pub fn bank_angle(rotation: Quat) -> f32 {
    let forward = rotation * Vec3::NEG_Z;
    let up = rotation * Vec3::Y;
    let level_up = Vec3::Y - forward * forward.y;
    if level_up.length_squared() < 1e-6 {
        // Nose straight up or down: bank is undefined
        return 0.0;
    }
    let level_up = level_up.normalize();
    level_up.cross(up).dot(forward).atan2(level_up.dot(up))
}

/// Flags describing what happened during one integration step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FlightReport {
    pub stalled: bool,
    /// Bank-to-turn coupling was active
    pub turning: bool,
    pub bank_angle: f32,
    /// Position or velocity was clamped by the boundary
    pub clamped: bool,
}

/// Parameters borrowed for one integration step.
#[derive(Debug, Clone, Copy)]
pub struct FlightDynamics<'a> {
    pub speed: &'a SpeedConfig,
    pub handling: &'a HandlingConfig,
    pub boundary: &'a BoundaryEnforcer,
    pub skill_level: f32,
    pub dead_zone: f32,
}

impl FlightDynamics<'_> {
    pub fn integrate(&self, state: &mut FlightState, inputs: ControlInputs, dt: f32) -> FlightReport {
        let speed = self.speed;
        let handling = self.handling;
        let inputs = inputs.clamped().with_dead_zone(self.dead_zone);
        let mut report = FlightReport::default();

        // The engine slews toward the commanded setting at a bounded rate
        let setting = inputs.throttle.max(0.0) * speed.max_throttle;
        let slew = (speed.throttle_response * dt).max(0.0);
        state.throttle = (state.throttle + (setting - state.throttle).clamp(-slew, slew))
            .clamp(0.0, speed.max_throttle);

        // 1. Thrust, drag and braking
        let forward = state.forward();
        state.velocity += forward * state.throttle * speed.thrust_acceleration * dt;
        let forward_speed = state.forward_speed();
        if forward_speed > 0.0 {
            let drag = speed.drag_coefficient * forward_speed * forward_speed * dt;
            state.velocity -= forward * drag.min(forward_speed);
        }
        let current = state.speed();
        if inputs.throttle < -0.5 && current > 1.0 {
            let brake = (speed.brake_deceleration * -inputs.throttle * dt).min(current);
            state.velocity -= state.velocity / current * brake;
        }

        // 2. Stall: the nose falls toward half-down and the aircraft mushes
        report.stalled = state.forward_speed() <= speed.stall_threshold;
        if report.stalled {
            let forward = state.forward();
            let half_down = (forward + Vec3::NEG_Y).normalize_or(Vec3::NEG_Y);
            let correction = Quat::from_rotation_arc(forward, half_down);
            let blend = approach_factor(handling.stall_rotation_rate, dt);
            state.rotation = (Quat::IDENTITY.slerp(correction, blend) * state.rotation).normalize();
            state.velocity +=
                (Vec3::NEG_Y * handling.stall_sink + state.forward() * handling.stall_push) * dt;
        }

        // 3. Speed limit
        state.velocity = state.velocity.clamp_length_max(speed.max_speed);

        // 4. Pitch
        if !report.stalled && inputs.pitch != 0.0 {
            let forward = state.forward();
            let mut forward_speed = state.velocity.dot(forward);
            let residual = state.velocity - forward * forward_speed;

            let speed_factor = (forward_speed / speed.cruise_speed.max(1.0)).clamp(0.0, 1.0);
            let rate = handling.pitch_rate.to_radians() * (0.5 + speed_factor) * self.skill_level;
            let pitch = Quat::from_axis_angle(state.right(), inputs.pitch * rate * dt);
            state.rotation = (pitch * state.rotation).normalize();

            let mut lift = Vec3::ZERO;
            if inputs.pitch > 0.0 {
                forward_speed -= inputs.pitch * handling.pitch_speed_bleed * dt;
                lift = state.up() * inputs.pitch * handling.pitch_lift * dt;
            } else {
                forward_speed -= inputs.pitch * handling.dive_gain * dt;
            }
            forward_speed = forward_speed.max(speed.stall_threshold * 0.8);
            state.velocity = state.forward() * forward_speed + residual + lift;
        }

        // 5. Roll and bank-to-turn coupling
        if inputs.roll != 0.0 {
            let angle = inputs.roll * handling.roll_rate.to_radians() * self.skill_level * dt;
            let roll = Quat::from_axis_angle(state.forward(), angle);
            state.rotation = (roll * state.rotation).normalize();
        }

        report.bank_angle = state.bank_angle();
        let bank = report.bank_angle.abs();
        if bank > handling.bank_min.to_radians() && bank < handling.bank_max.to_radians() {
            report.turning = true;
            let strength = report.bank_angle.sin();
            let yaw = Quat::from_axis_angle(Vec3::Y, -strength * handling.turn_force * dt);
            state.rotation = (yaw * state.rotation).normalize();
            state.velocity = yaw * state.velocity;

            let forward = state.forward();
            let level_right = forward.cross(Vec3::Y).normalize_or_zero();
            state.velocity += level_right * strength * handling.lateral_nudge * dt;

            let forward_speed = state.velocity.dot(forward);
            let penalty = (strength.abs() * handling.bank_speed_penalty * dt)
                .min((forward_speed - speed.stall_threshold * 0.8).max(0.0));
            state.velocity -= forward * penalty;
        } else {
            let aligned = state.forward() * state.speed();
            let blend = approach_factor(handling.realign_rate, dt);
            state.velocity = state.velocity.lerp(aligned, blend);
        }

        // Integrate position under the final speed limit
        state.velocity = state.velocity.clamp_length_max(speed.max_speed);
        state.position += state.velocity * dt;

        // 6. Boundary
        report.clamped = self.boundary.enforce(&mut state.position, &mut state.velocity);

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    struct Rig {
        speed: SpeedConfig,
        handling: HandlingConfig,
        boundary: BoundaryEnforcer,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                speed: SpeedConfig::default(),
                handling: HandlingConfig::default(),
                boundary: BoundaryEnforcer::new(None, 30.0),
            }
        }

        fn dynamics(&self) -> FlightDynamics<'_> {
            FlightDynamics {
                speed: &self.speed,
                handling: &self.handling,
                boundary: &self.boundary,
                skill_level: 1.0,
                dead_zone: 0.05,
            }
        }
    }

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn test_throttle_and_speed_stay_bounded() {
        let rig = Rig::new();
        let mut state = FlightState::level(Vec3::new(0.0, 2000.0, 0.0), Vec3::NEG_Z, 300.0);
        for i in 0..3000 {
            let inputs = ControlInputs::new(
                if i % 400 < 200 { -0.6 } else { 0.4 },
                if i % 300 < 150 { 1.0 } else { -0.3 },
                1.0,
            );
            rig.dynamics().integrate(&mut state, inputs, DT);
            assert!((0.0..=rig.speed.max_throttle).contains(&state.throttle));
            assert!(state.speed() <= rig.speed.max_speed + 1e-3);
        }
    }

    #[test]
    fn test_throttle_slews_to_the_commanded_setting() {
        let rig = Rig::new();
        let mut state = FlightState::level(Vec3::new(0.0, 2000.0, 0.0), Vec3::NEG_Z, 200.0);
        state.throttle = 0.0;
        let step = rig.speed.throttle_response * DT;
        let mut last = state.throttle;
        for _ in 0..120 {
            rig.dynamics()
                .integrate(&mut state, ControlInputs::new(0.0, 0.0, 0.4), DT);
            assert!(state.throttle - last <= step + 1e-6);
            assert!(state.throttle <= 0.4 + 1e-6);
            last = state.throttle;
        }
        // A held input settles the engine instead of winding it up
        assert!((state.throttle - 0.4 * rig.speed.max_throttle).abs() < 1e-5);
    }

    #[test]
    fn test_full_braking_slows_down() {
        let rig = Rig::new();
        let mut state = FlightState::level(Vec3::new(0.0, 2000.0, 0.0), Vec3::NEG_Z, 300.0);
        for _ in 0..60 {
            rig.dynamics()
                .integrate(&mut state, ControlInputs::new(0.0, 0.0, -1.0), DT);
        }
        assert!(state.speed() < 280.0);
        assert_eq!(state.throttle, 0.0);
    }

    #[test]
    fn test_stall_drops_the_nose() {
        let rig = Rig::new();
        let mut state = FlightState::level(Vec3::new(0.0, 2000.0, 0.0), Vec3::NEG_Z, 40.0);
        state.throttle = 0.0;
        let report = rig
            .dynamics()
            .integrate(&mut state, ControlInputs::new(1.0, 0.0, -1.0), DT);
        assert!(report.stalled);
        assert!(state.forward().y < 0.0);
        assert!(state.velocity.y < 0.0);
    }

    #[test]
    fn test_nose_up_pitches_and_bleeds_speed() {
        let rig = Rig::new();
        let mut state = FlightState::level(Vec3::new(0.0, 2000.0, 0.0), Vec3::NEG_Z, 200.0);
        state.throttle = 0.0;
        let before = state.forward_speed();
        rig.dynamics()
            .integrate(&mut state, ControlInputs::new(1.0, 0.0, 0.0), DT);
        assert!(state.forward().y > 0.0);
        assert!(state.forward_speed() < before);
    }

    #[test]
    fn test_dead_zone_suppresses_small_inputs() {
        let rig = Rig::new();
        let mut state = FlightState::level(Vec3::new(0.0, 2000.0, 0.0), Vec3::NEG_Z, 200.0);
        let rotation = state.rotation;
        rig.dynamics()
            .integrate(&mut state, ControlInputs::new(0.03, -0.04, 0.0), DT);
        assert!(state.rotation.angle_between(rotation) < 1e-5);
    }

    #[test]
    fn test_right_bank_turns_right() {
        let rig = Rig::new();
        let mut state = FlightState::level(Vec3::new(0.0, 2000.0, 0.0), Vec3::NEG_Z, 200.0);
        // Roll into a right bank
        while state.bank_angle() < 45f32.to_radians() {
            rig.dynamics()
                .integrate(&mut state, ControlInputs::new(0.0, 1.0, 0.3), DT);
        }
        let start = state.position;
        for _ in 0..120 {
            let report = rig.dynamics().integrate(&mut state, ControlInputs::NEUTRAL, DT);
            assert!(report.turning);
        }
        assert!(state.forward().x > 0.1, "heading swung right");
        assert!(state.position.x > start.x);
    }

    #[test]
    fn test_bank_angle_sign() {
        let right = Quat::from_axis_angle(Vec3::NEG_Z, 0.5);
        assert!((bank_angle(right) - 0.5).abs() < 1e-5);
        let left = Quat::from_axis_angle(Vec3::NEG_Z, -0.5);
        assert!((bank_angle(left) + 0.5).abs() < 1e-5);
        let vertical = Quat::from_axis_angle(Vec3::X, FRAC_PI_2);
        assert_eq!(bank_angle(vertical), 0.0);
    }

    #[test]
    fn test_level_flight_realigns_velocity() {
        let rig = Rig::new();
        let mut state = FlightState::level(Vec3::new(0.0, 2000.0, 0.0), Vec3::NEG_Z, 200.0);
        state.velocity += Vec3::X * 30.0;
        for _ in 0..300 {
            rig.dynamics().integrate(&mut state, ControlInputs::NEUTRAL, DT);
        }
        let sideslip = state.velocity - state.forward() * state.forward_speed();
        assert!(sideslip.length() < 1.0);
    }
}
