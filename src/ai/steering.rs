//! Aim-point steering
//!
//! Converts a world-space aim point into pitch and roll commands. The aim
//! direction is expressed in the aircraft's body frame: its vertical
//! component drives pitch, its lateral component picks a bank angle and
//! roll closes the gap to that bank.

use glam::Vec3;

use crate::core::config::HandlingConfig;
use crate::flight::{ControlInputs, FlightState};

/// Aim points closer than this produce no steering.
const MIN_AIM_DISTANCE: f32 = 1.0;

/// Proportional pursuit of an aim point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AimSteering {
    pub pitch_gain: f32,
    pub roll_gain: f32,
    /// Bank limit in radians
    pub max_bank: f32,
}

impl AimSteering {
    #[must_use]
    pub fn from_config(handling: &HandlingConfig) -> Self {
        Self {
            pitch_gain: handling.pitch_gain,
            roll_gain: handling.roll_gain,
            max_bank: handling.max_bank.to_radians(),
        }
    }

    /// Aim direction in the body frame (+X right, +Y up, -Z nose).
    #[must_use]
    pub fn local_direction(state: &FlightState, aim: Vec3) -> Option<Vec3> {
        let offset = aim - state.position;
        if offset.length_squared() < MIN_AIM_DISTANCE * MIN_AIM_DISTANCE {
            return None;
        }
        Some(state.rotation.inverse() * offset.normalize())
    }

    /// Bank angle that turns the nose onto `local`.
    ///
    /// An aim point behind the aircraft yields the full bank limit toward
    /// its side.
    #[must_use]
    pub fn desired_bank(&self, local: Vec3) -> f32 {
        if local.z > 0.0 {
            return if local.x < 0.0 { -self.max_bank } else { self.max_bank };
        }
        (local.x * self.max_bank).clamp(-self.max_bank, self.max_bank)
    }

    /// Pitch and roll toward `aim`. Throttle is left neutral.
    #[must_use]
    pub fn steer(&self, state: &FlightState, aim: Vec3) -> ControlInputs {
        let Some(local) = Self::local_direction(state, aim) else {
            return ControlInputs::NEUTRAL;
        };
        let pitch = (local.y * self.pitch_gain).clamp(-1.0, 1.0);
        let bank_error = self.desired_bank(local) - state.bank_angle();
        let roll = (bank_error * self.roll_gain).clamp(-1.0, 1.0);
        ControlInputs::new(pitch, roll, 0.0)
    }
}

impl Default for AimSteering {
    fn default() -> Self {
        Self::from_config(&HandlingConfig::default())
    }
}
