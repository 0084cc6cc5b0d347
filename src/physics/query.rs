//! Ray queries against terrain and obstacles

use glam::Vec3;

/// Which geometry a ray may hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RayFilter {
    /// Ground surfaces only.
    Terrain,
    /// Ground surfaces and free-standing obstacles.
    TerrainAndObstacles,
}

/// First intersection along a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin
    pub distance: f32,
    /// The point of intersection
    pub point: Vec3,
    /// Surface normal at the intersection
    pub normal: Vec3,
}

/// Synchronous ray-intersection query supplied by the world.
pub trait WorldQuery {
    /// Cast a ray; `direction` need not be normalized.
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32, filter: RayFilter)
    -> Option<RayHit>;
}

/// Infinite horizontal ground plane, handy for headless runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatGround {
    pub height: f32,
}

impl FlatGround {
    #[must_use]
    pub fn new(height: f32) -> Self {
        Self { height }
    }
}

impl WorldQuery for FlatGround {
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        _filter: RayFilter,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        if direction.y >= -1e-6 || origin.y < self.height {
            return None;
        }
        let distance = (origin.y - self.height) / -direction.y;
        (distance <= max_distance).then(|| RayHit {
            distance,
            point: origin + direction * distance,
            normal: Vec3::Y,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_ground_straight_down() {
        let ground = FlatGround::new(10.0);
        let hit = ground
            .cast(Vec3::new(5.0, 110.0, 0.0), Vec3::NEG_Y, 1000.0, RayFilter::Terrain)
            .unwrap();
        assert!((hit.distance - 100.0).abs() < 1e-4);
        assert!((hit.point.y - 10.0).abs() < 1e-4);
        assert_eq!(hit.normal, Vec3::Y);
    }

    #[test]
    fn test_flat_ground_out_of_range() {
        let ground = FlatGround::new(0.0);
        assert!(ground
            .cast(Vec3::new(0.0, 500.0, 0.0), Vec3::NEG_Y, 100.0, RayFilter::Terrain)
            .is_none());
        assert!(ground
            .cast(Vec3::new(0.0, 500.0, 0.0), Vec3::X, 10_000.0, RayFilter::Terrain)
            .is_none());
    }
}
