//! Operating volume and altitude floor

use glam::Vec3;

use crate::core::config::BoundsConfig;

/// Axis-aligned box spanned by four footprint corners and an altitude band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingVolume {
    pub min: Vec3,
    pub max: Vec3,
    pub edge_margin: f32,
    pub outward_speed_limit: f32,
}

impl BoundingVolume {
    /// Build from the corners of a rectangular footprint.
    ///
    /// Only the X/Z extents of the corners are used, the vertical range comes
    /// from the altitude band.
    #[must_use]
    pub fn from_corners(corners: &[Vec3; 4], altitude_min: f32, altitude_max: f32) -> Self {
        let (lo, hi) = corners.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), c| (lo.min(*c), hi.max(*c)),
        );
        Self {
            min: Vec3::new(lo.x, altitude_min.min(altitude_max), lo.z),
            max: Vec3::new(hi.x, altitude_max.max(altitude_min), hi.z),
            edge_margin: 100.0,
            outward_speed_limit: 10.0,
        }
    }

    #[must_use]
    pub fn from_config(config: &BoundsConfig) -> Self {
        Self {
            edge_margin: config.edge_margin.max(0.0),
            outward_speed_limit: config.outward_speed_limit.abs(),
            ..Self::from_corners(&config.corners, config.altitude_min, config.altitude_max)
        }
    }

    #[must_use]
    pub fn contains(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }

    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }
}

/// Keeps an aircraft inside its volume and above the absolute floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryEnforcer {
    pub volume: Option<BoundingVolume>,
    pub altitude_floor: f32,
}

impl BoundaryEnforcer {
    #[must_use]
    pub fn new(volume: Option<BoundingVolume>, altitude_floor: f32) -> Self {
        Self {
            volume,
            altitude_floor,
        }
    }

    /// Clamp position and velocity in place. Returns true if anything changed.
    pub fn enforce(&self, position: &mut Vec3, velocity: &mut Vec3) -> bool {
        let before = (*position, *velocity);

        if let Some(volume) = &self.volume {
            for axis in 0..3 {
                let (lo, hi) = (volume.min[axis], volume.max[axis]);
                position[axis] = position[axis].clamp(lo, hi);

                let limit = volume.outward_speed_limit;
                if position[axis] >= hi - volume.edge_margin && velocity[axis] > limit {
                    velocity[axis] = limit;
                }
                if position[axis] <= lo + volume.edge_margin && velocity[axis] < -limit {
                    velocity[axis] = -limit;
                }
            }
        }

        if position.y <= self.altitude_floor {
            position.y = self.altitude_floor;
            velocity.y = velocity.y.max(0.0);
        }

        before != (*position, *velocity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> BoundingVolume {
        BoundingVolume::from_corners(
            &[
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1000.0, 0.0, 0.0),
                Vec3::new(1000.0, 0.0, 1000.0),
                Vec3::new(0.0, 0.0, 1000.0),
            ],
            500.0,
            1500.0,
        )
    }

    #[test]
    fn test_position_clamped_and_outward_velocity_limited() {
        let enforcer = BoundaryEnforcer::new(Some(square()), 30.0);
        let mut position = Vec3::new(1050.0, 1000.0, 500.0);
        let mut velocity = Vec3::new(250.0, 0.0, -40.0);

        assert!(enforcer.enforce(&mut position, &mut velocity));
        assert_eq!(position.x, 1000.0);
        assert!(velocity.x <= 10.0);
        // Interior axis untouched
        assert_eq!(velocity.z, -40.0);
    }

    #[test]
    fn test_inward_velocity_kept_at_edge() {
        let enforcer = BoundaryEnforcer::new(Some(square()), 30.0);
        let mut position = Vec3::new(1000.0, 1000.0, 500.0);
        let mut velocity = Vec3::new(-200.0, 0.0, 0.0);
        enforcer.enforce(&mut position, &mut velocity);
        assert_eq!(velocity.x, -200.0);
    }

    #[test]
    fn test_altitude_band_enforced() {
        let enforcer = BoundaryEnforcer::new(Some(square()), 30.0);
        let mut position = Vec3::new(500.0, 200.0, 500.0);
        let mut velocity = Vec3::new(0.0, -80.0, 0.0);
        enforcer.enforce(&mut position, &mut velocity);
        assert_eq!(position.y, 500.0);
        assert!(velocity.y >= -10.0);
    }

    #[test]
    fn test_floor_without_volume() {
        let enforcer = BoundaryEnforcer::new(None, 30.0);
        let mut position = Vec3::new(9999.0, 10.0, -9999.0);
        let mut velocity = Vec3::new(100.0, -50.0, 0.0);
        enforcer.enforce(&mut position, &mut velocity);
        assert_eq!(position, Vec3::new(9999.0, 30.0, -9999.0));
        assert_eq!(velocity, Vec3::new(100.0, 0.0, 0.0));

        let mut free = Vec3::new(0.0, 800.0, 0.0);
        let mut v = Vec3::new(0.0, -50.0, 0.0);
        assert!(!enforcer.enforce(&mut free, &mut v));
    }
}
