//! Mach-referenced throttle regulator
//!
//! A PID loop on Mach error with a clamped integral term, plus hard
//! overrides when the aircraft leaves the permitted Mach band.

use serde::{Deserialize, Serialize};

use crate::core::config::{MachConfig, SpeedConfig};

/// Hysteresis around the Mach band before the hard overrides engage.
const MACH_OVERRIDE_MARGIN: f32 = 0.05;

/// Which reference speed the current behavior asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeedTarget {
    #[default]
    Cruise,
    Combat,
    /// 90% of combat Mach, used by cautious pilots
    ReducedCombat,
}

impl SpeedTarget {
    #[must_use]
    pub fn mach(self, config: &MachConfig) -> f32 {
        let mach = match self {
            SpeedTarget::Cruise => config.cruise_mach,
            SpeedTarget::Combat => config.combat_mach,
            SpeedTarget::ReducedCombat => config.combat_mach * 0.9,
        };
        mach.max(config.mach_min).min(config.mach_max)
    }
}

/// Output of one regulator update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedCommand {
    /// Throttle input in `[-1, 1]`
    pub throttle_input: f32,
    pub desired_mach: f32,
    pub current_mach: f32,
    /// Desired airspeed, kept clear of the stall.
    ///
    /// Not consumed by the regulator itself; collaborators read it through
    /// `PilotController::speed_command` as the stall-margin reference.
    pub reference_speed: f32,
}

/// Integral/derivative memory of the regulator.
#[derive(Debug, Clone, Default)]
pub struct MachController {
    integral: f32,
    last_error: Option<f32>,
}

impl MachController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated integral term, always within the anti-windup bound
    #[must_use]
    pub fn integral(&self) -> f32 {
        self.integral
    }

    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.last_error = None;
    }

    pub fn update(
        &mut self,
        forward_speed: f32,
        target: SpeedTarget,
        mach: &MachConfig,
        speed: &SpeedConfig,
        dt: f32,
    ) -> SpeedCommand {
        let speed_of_sound = mach.speed_of_sound.max(1e-3);
        let desired_mach = target.mach(mach);
        let current_mach = forward_speed.max(0.0) / speed_of_sound;

        let error = desired_mach - current_mach;
        let dt = dt.max(mach.min_dt);
        let limit = mach.integral_limit.abs();
        self.integral = (self.integral + error * dt).clamp(-limit, limit);
        let derivative = self
            .last_error
            .map_or(0.0, |last| (error - last) / dt);
        self.last_error = Some(error);

        let raw = mach.kp * error + mach.ki * self.integral + mach.kd * derivative;

        let throttle_input = if current_mach < mach.mach_min - MACH_OVERRIDE_MARGIN {
            1.0
        } else if current_mach > mach.mach_max + MACH_OVERRIDE_MARGIN {
            -1.0
        } else {
            (raw / mach.output_scale.max(1e-3)).clamp(-1.0, 1.0)
        };

        let reference_speed = (desired_mach * speed_of_sound)
            .min(speed.max_speed)
            .max(speed.stall_threshold * 1.2);

        SpeedCommand {
            throttle_input,
            desired_mach,
            current_mach,
            reference_speed,
        }
    }
}
