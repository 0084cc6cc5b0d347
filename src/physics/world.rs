//! Static terrain and obstacle geometry using rapier3d

use std::sync::atomic::{AtomicBool, Ordering};

use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, Translation3, UnitQuaternion};
use rapier3d::prelude::*;

use super::query::{RayFilter, RayHit, WorldQuery};

/// Handle to a rigid body in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigidBodyHandle(pub rapier3d::dynamics::RigidBodyHandle);

/// Handle to a collider in the physics world
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColliderHandle(pub rapier3d::geometry::ColliderHandle);

const TERRAIN_GROUP: Group = Group::GROUP_1;
const OBSTACLE_GROUP: Group = Group::GROUP_2;

/// Convert glam Quat to rapier3d UnitQuaternion
fn quat_to_rapier(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

fn filter_groups(filter: RayFilter) -> InteractionGroups {
    let mask = match filter {
        RayFilter::Terrain => TERRAIN_GROUP,
        RayFilter::TerrainAndObstacles => TERRAIN_GROUP | OBSTACLE_GROUP,
    };
    InteractionGroups::new(Group::ALL, mask)
}

/// Physics world holding the ground and obstacles aircraft must avoid.
///
/// Aircraft themselves are not rigid bodies here: their motion is integrated
/// by the flight model, this world only answers ray queries.
pub struct Physics {
    /// Gravity vector
    pub gravity: Vec3,
    /// Physics pipeline
    pipeline: PhysicsPipeline,
    /// Island manager
    island_manager: IslandManager,
    /// Broad phase
    broad_phase: DefaultBroadPhase,
    /// Narrow phase
    narrow_phase: NarrowPhase,
    /// Rigid body set
    rigid_body_set: RigidBodySet,
    /// Collider set
    collider_set: ColliderSet,
    /// Impulse joint set
    impulse_joint_set: ImpulseJointSet,
    /// Multibody joint set
    multibody_joint_set: MultibodyJointSet,
    /// CCD solver
    ccd_solver: CCDSolver,
    /// Query pipeline for raycasting
    query_pipeline: QueryPipeline,
    /// Integration parameters
    integration_parameters: IntegrationParameters,
    /// Set when geometry changed since the query pipeline was last rebuilt
    dirty: bool,
    /// Latched once a query ran against stale geometry, cleared on refresh
    stale_warned: AtomicBool,
}

impl Physics {
    /// Create an empty world
    pub fn new() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            dirty: false,
            stale_warned: AtomicBool::new(false),
        }
    }

    /// Step the physics pipeline, which also rebuilds the query structures
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;

        self.pipeline.step(
            &vector![self.gravity.x, self.gravity.y, self.gravity.z],
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.dirty = false;
        self.stale_warned.store(false, Ordering::Relaxed);
    }

    /// Make newly added geometry visible to ray queries.
    ///
    /// Only static bodies live in this world so stepping moves nothing.
    pub fn refresh_queries(&mut self) {
        if self.dirty {
            self.step(self.integration_parameters.dt);
        }
    }

    /// Whether geometry was added or removed without a refresh
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.dirty
    }

    fn create_static_body(&mut self, position: Vec3, rotation: Quat) -> RigidBodyHandle {
        let isometry = Isometry::from_parts(
            Translation3::new(position.x, position.y, position.z),
            quat_to_rapier(rotation),
        );
        let body = RigidBodyBuilder::fixed().position(isometry).build();

        RigidBodyHandle(self.rigid_body_set.insert(body))
    }

    fn attach(&mut self, body: RigidBodyHandle, collider: Collider) -> ColliderHandle {
        self.dirty = true;
        ColliderHandle(self.collider_set.insert_with_parent(
            collider,
            body.0,
            &mut self.rigid_body_set,
        ))
    }

    /// Add a box of ground whose top face is the terrain surface
    pub fn add_terrain_slab(&mut self, center: Vec3, half_extents: Vec3) -> RigidBodyHandle {
        let body = self.create_static_body(center, Quat::IDENTITY);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .collision_groups(InteractionGroups::new(TERRAIN_GROUP, Group::ALL))
            .build();
        self.attach(body, collider);
        body
    }

    /// Add a box obstacle such as a tower or mesa
    pub fn add_obstacle_box(
        &mut self,
        center: Vec3,
        rotation: Quat,
        half_extents: Vec3,
    ) -> RigidBodyHandle {
        let body = self.create_static_body(center, rotation);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .collision_groups(InteractionGroups::new(OBSTACLE_GROUP, Group::ALL))
            .build();
        self.attach(body, collider);
        body
    }

    /// Add a spherical obstacle such as a balloon barrage or a hill top
    pub fn add_obstacle_sphere(&mut self, center: Vec3, radius: f32) -> RigidBodyHandle {
        let body = self.create_static_body(center, Quat::IDENTITY);
        let collider = ColliderBuilder::ball(radius)
            .collision_groups(InteractionGroups::new(OBSTACLE_GROUP, Group::ALL))
            .build();
        self.attach(body, collider);
        body
    }

    /// Cast a ray and return the first hit with its surface normal
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: RayFilter,
    ) -> Option<RayHit> {
        let direction = direction.try_normalize()?;
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![direction.x, direction.y, direction.z],
        );

        self.query_pipeline
            .cast_ray_and_get_normal(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_distance,
                true,
                QueryFilter::default().groups(filter_groups(filter)),
            )
            .map(|(_, intersection)| {
                let distance = intersection.time_of_impact;
                let point = ray.point_at(distance);
                let normal = intersection.normal;
                RayHit {
                    distance,
                    point: Vec3::new(point.x, point.y, point.z),
                    normal: Vec3::new(normal.x, normal.y, normal.z),
                }
            })
    }

    /// Remove a rigid body and its colliders
    pub fn remove_body(&mut self, body: RigidBodyHandle) {
        self.rigid_body_set.remove(
            body.0,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        self.dirty = true;
    }
}

impl Default for Physics {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldQuery for Physics {
    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: RayFilter,
    ) -> Option<RayHit> {
        if self.dirty && !self.stale_warned.swap(true, Ordering::Relaxed) {
            log::warn!("ray cast against stale geometry, call refresh_queries() after edits");
        }
        self.raycast(origin, direction, max_distance, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground_world() -> Physics {
        let mut physics = Physics::new();
        physics.add_terrain_slab(Vec3::new(0.0, -5.0, 0.0), Vec3::new(5000.0, 5.0, 5000.0));
        physics.add_obstacle_box(
            Vec3::new(0.0, 300.0, -1000.0),
            Quat::IDENTITY,
            Vec3::new(200.0, 300.0, 50.0),
        );
        physics.refresh_queries();
        physics
    }

    #[test]
    fn test_ground_ray_reports_distance_and_normal() {
        let physics = ground_world();
        let hit = physics
            .cast(Vec3::new(100.0, 400.0, 100.0), Vec3::NEG_Y, 1000.0, RayFilter::Terrain)
            .expect("ground below");
        assert!((hit.distance - 400.0).abs() < 0.1);
        assert!(hit.normal.y > 0.99);
    }

    #[test]
    fn test_obstacles_respect_filter() {
        let physics = ground_world();
        let origin = Vec3::new(0.0, 300.0, 0.0);

        let hit = physics
            .cast(origin, Vec3::NEG_Z, 2000.0, RayFilter::TerrainAndObstacles)
            .expect("obstacle ahead");
        assert!((hit.distance - 950.0).abs() < 0.1);
        assert!(hit.normal.z > 0.99);

        assert!(physics
            .cast(origin, Vec3::NEG_Z, 2000.0, RayFilter::Terrain)
            .is_none());
    }

    #[test]
    fn test_removed_body_no_longer_hit() {
        let mut physics = Physics::new();
        let slab =
            physics.add_terrain_slab(Vec3::new(0.0, -5.0, 0.0), Vec3::new(100.0, 5.0, 100.0));
        physics.refresh_queries();
        physics.remove_body(slab);
        assert!(physics.needs_refresh());
        physics.refresh_queries();
        assert!(physics
            .cast(Vec3::new(0.0, 50.0, 0.0), Vec3::NEG_Y, 100.0, RayFilter::Terrain)
            .is_none());
    }

    #[test]
    fn test_stale_warning_is_latched_until_refresh() {
        let mut physics = ground_world();
        physics.add_obstacle_sphere(Vec3::new(0.0, 500.0, 0.0), 50.0);
        assert!(physics.needs_refresh());

        for _ in 0..3 {
            physics.cast(Vec3::new(0.0, 100.0, 0.0), Vec3::NEG_Y, 500.0, RayFilter::Terrain);
        }
        assert!(physics.stale_warned.load(Ordering::Relaxed));

        physics.refresh_queries();
        assert!(!physics.needs_refresh());
        assert!(!physics.stale_warned.load(Ordering::Relaxed));
    }
}
