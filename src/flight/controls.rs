//! Smoothed pitch/roll/throttle commands

use serde::{Deserialize, Serialize};

/// Pilot stick and throttle inputs, each in `[-1, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInputs {
    /// Positive pulls the nose up
    pub pitch: f32,
    /// Positive banks right
    pub roll: f32,
    /// Engine setting as a fraction of max throttle, below -0.5 brakes
    pub throttle: f32,
}

impl ControlInputs {
    pub const NEUTRAL: Self = Self {
        pitch: 0.0,
        roll: 0.0,
        throttle: 0.0,
    };

    #[must_use]
    pub fn new(pitch: f32, roll: f32, throttle: f32) -> Self {
        Self {
            pitch,
            roll,
            throttle,
        }
        .clamped()
    }

    /// Clamp every axis into `[-1, 1]`
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            pitch: self.pitch.clamp(-1.0, 1.0),
            roll: self.roll.clamp(-1.0, 1.0),
            throttle: self.throttle.clamp(-1.0, 1.0),
        }
    }

    /// Move every axis toward `target` by the critically-damped factor
    /// `1 - exp(-rate * dt)`.
    pub fn smooth_toward(&mut self, target: ControlInputs, rate: f32, dt: f32) {
        let target = target.clamped();
        let alpha = approach_factor(rate, dt);
        self.pitch += (target.pitch - self.pitch) * alpha;
        self.roll += (target.roll - self.roll) * alpha;
        self.throttle += (target.throttle - self.throttle) * alpha;
    }

    /// Zero out axes whose magnitude lies inside the dead zone
    #[must_use]
    pub fn with_dead_zone(self, dead_zone: f32) -> Self {
        Self {
            pitch: apply_dead_zone(self.pitch, dead_zone),
            roll: apply_dead_zone(self.roll, dead_zone),
            throttle: apply_dead_zone(self.throttle, dead_zone),
        }
    }
}

/// Fraction of the remaining gap closed in one step of exponential smoothing.
#[must_use]
pub fn approach_factor(rate: f32, dt: f32) -> f32 {
    1.0 - (-rate.max(0.0) * dt.max(0.0)).exp()
}

/// Exponentially approach `target` from `current`.
#[must_use]
pub fn smooth(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * approach_factor(rate, dt)
}

#[must_use]
pub fn apply_dead_zone(value: f32, dead_zone: f32) -> f32 {
    if value.abs() <= dead_zone { 0.0 } else { value }
}

/// Position of `value` between `a` and `b`, clamped to `[0, 1]`.
///
/// Works for descending ranges (`a > b`), returns 0 when the range is empty.
#[must_use]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if (b - a).abs() < f32::EPSILON {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothing_never_overshoots() {
        let mut inputs = ControlInputs::NEUTRAL;
        let target = ControlInputs::new(1.0, -1.0, 0.5);
        let mut last = 0.0;
        for _ in 0..200 {
            inputs.smooth_toward(target, 5.0, 0.02);
            assert!(inputs.pitch >= last && inputs.pitch <= 1.0);
            last = inputs.pitch;
        }
        assert!((inputs.pitch - 1.0).abs() < 1e-3);
        assert!((inputs.roll + 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_dead_zone() {
        let inputs = ControlInputs::new(0.02, -0.3, -0.04).with_dead_zone(0.05);
        assert_eq!(inputs.pitch, 0.0);
        assert_eq!(inputs.roll, -0.3);
        assert_eq!(inputs.throttle, 0.0);
    }

    #[test]
    fn test_inverse_lerp_descending_range() {
        assert_eq!(inverse_lerp(200.0, 100.0, 100.0), 1.0);
        assert_eq!(inverse_lerp(200.0, 100.0, 250.0), 0.0);
        assert!((inverse_lerp(200.0, 100.0, 150.0) - 0.5).abs() < 1e-6);
        assert_eq!(inverse_lerp(5.0, 5.0, 5.0), 0.0);
    }
}
