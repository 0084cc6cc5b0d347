//! Fixed-timestep simulation driver
//!
//! Owns the entity world, the static world geometry and one
//! [`PilotController`] per AI aircraft. Each physics step every pilot reads
//! the same snapshot of contacts, runs whichever periodic tasks are due and
//! integrates its flight model; the world's `Transform` and `Velocity`
//! components are then updated so the next step sees fresh positions.

use glam::{Quat, Vec3};
use hecs::Entity;
use rustc_hash::FxHashMap;

use super::events::{EventQueue, FlightEvent};
use super::scenario::{AircraftSpawn, ObstacleShape, Scenario, SimulationConfig};
use crate::ai::{PilotController, PilotSnapshot};
use crate::ecs::{Allegiance, EntityDirectory, Name, Transform, Velocity, World};
use crate::flight::FlightState;
use crate::physics::{Physics, WorldQuery};

/// Depth of the ground slab below its surface.
const GROUND_THICKNESS: f32 = 50.0;

/// Headless simulation of AI aircraft.
pub struct Simulation {
    world: World,
    physics: Physics,
    /// Whether pilots get a world query or fall back to altitude checks
    terrain_query: bool,
    pilots: FxHashMap<Entity, PilotController>,
    /// Update order, the order pilots were spawned in
    order: Vec<Entity>,
    events: EventQueue,
    config: SimulationConfig,
    accumulator: f32,
    time: f32,
    steps: u64,
}

impl Simulation {
    /// Create an empty simulation without terrain.
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        let mut config = config;
        if config.fixed_dt <= 0.0 {
            log::warn!("fixed_dt {} is not positive, using 1/50 s", config.fixed_dt);
            config.fixed_dt = SimulationConfig::default().fixed_dt;
        }
        config.max_steps_per_advance = config.max_steps_per_advance.max(1);

        Self {
            world: World::new(),
            physics: Physics::new(),
            terrain_query: false,
            pilots: FxHashMap::default(),
            order: Vec::new(),
            events: EventQueue::new(),
            config,
            accumulator: 0.0,
            time: 0.0,
            steps: 0,
        }
    }

    /// Build terrain, obstacles and aircraft from a scenario.
    #[must_use]
    pub fn from_scenario(scenario: &Scenario) -> Self {
        let mut sim = Self::new(scenario.simulation.clone());
        let terrain = &scenario.terrain;

        if let Some(height) = terrain.ground_height {
            sim.physics.add_terrain_slab(
                Vec3::new(0.0, height - GROUND_THICKNESS, 0.0),
                Vec3::new(
                    terrain.ground_size.x * 0.5,
                    GROUND_THICKNESS,
                    terrain.ground_size.y * 0.5,
                ),
            );
        }
        for obstacle in &terrain.obstacles {
            match obstacle.shape {
                ObstacleShape::Box { half_extents, yaw } => {
                    sim.physics.add_obstacle_box(
                        obstacle.center,
                        Quat::from_rotation_y(yaw.to_radians()),
                        half_extents,
                    );
                }
                ObstacleShape::Sphere { radius } => {
                    sim.physics.add_obstacle_sphere(obstacle.center, radius);
                }
            }
        }
        sim.set_terrain_query(terrain.has_geometry());

        for spawn in &scenario.aircraft {
            sim.spawn_aircraft(spawn);
        }
        log::info!(
            "scenario '{}': {} aircraft, {} obstacles",
            scenario.name,
            scenario.aircraft.len(),
            terrain.obstacles.len()
        );
        sim
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Spawn an AI-flown aircraft.
    pub fn spawn_aircraft(&mut self, spawn: &AircraftSpawn) -> Entity {
        let flight = FlightState::level(spawn.position, spawn.heading, spawn.speed);
        let entity = self.world.spawn((
            Name::new(spawn.name.clone()),
            flight.transform(),
            Velocity::linear(flight.velocity),
            Allegiance::aircraft(spawn.faction),
        ));
        let pilot = PilotController::new(entity, spawn.faction, flight, spawn.pilot.clone());
        self.pilots.insert(entity, pilot);
        self.order.push(entity);
        log::debug!("spawned {} ({:?}) as {entity:?}", spawn.name, spawn.faction);
        entity
    }

    /// Spawn an entity without a pilot, such as a ground unit or a target
    /// drone. Pass `velocity: None` for an entity with no simulated body.
    pub fn spawn_contact(
        &mut self,
        name: &str,
        allegiance: Allegiance,
        transform: Transform,
        velocity: Option<Vec3>,
    ) -> Entity {
        match velocity {
            Some(velocity) => self.world.spawn((
                Name::new(name),
                transform,
                allegiance,
                Velocity::linear(velocity),
            )),
            None => self.world.spawn((Name::new(name), transform, allegiance)),
        }
    }

    /// Remove an entity. Its pilot, if any, stops running immediately.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        let existed = self.world.despawn(entity).is_ok();
        if self.pilots.remove(&entity).is_some() {
            self.order.retain(|e| *e != entity);
            self.events.push(FlightEvent::Removed { entity });
            log::debug!("pilot {entity:?} removed");
        }
        existed
    }

    #[must_use]
    pub fn pilot(&self, entity: Entity) -> Option<&PilotController> {
        self.pilots.get(&entity)
    }

    pub fn pilot_mut(&mut self, entity: Entity) -> Option<&mut PilotController> {
        self.pilots.get_mut(&entity)
    }

    /// Pilots in update order.
    pub fn pilots(&self) -> impl Iterator<Item = &PilotController> {
        self.order.iter().filter_map(|e| self.pilots.get(e))
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<PilotSnapshot> {
        self.pilots().map(PilotController::snapshot).collect()
    }

    /// Name of an entity, if it has one.
    #[must_use]
    pub fn name(&self, entity: Entity) -> Option<String> {
        self.world.get::<Name>(entity).ok().map(|n| n.0.clone())
    }

    // ------------------------------------------------------------------
    // World access
    // ------------------------------------------------------------------

    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    #[must_use]
    pub fn physics(&self) -> &Physics {
        &self.physics
    }

    /// Mutable geometry. Changes become visible on the next `advance`.
    pub fn physics_mut(&mut self) -> &mut Physics {
        &mut self.physics
    }

    /// Enable or disable terrain queries for every pilot.
    pub fn set_terrain_query(&mut self, enabled: bool) {
        self.terrain_query = enabled;
    }

    /// Events from the last `advance`.
    #[must_use]
    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventQueue {
        &mut self.events
    }

    /// Simulated seconds elapsed.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Accumulate `frame_dt` and run as many whole physics steps as fit.
    ///
    /// Returns the number of steps run. Time beyond the per-call step limit
    /// is dropped rather than carried into the next call.
    pub fn advance(&mut self, frame_dt: f32) -> u32 {
        self.physics.refresh_queries();

        let dt = self.config.fixed_dt;
        self.accumulator += frame_dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= dt && steps < self.config.max_steps_per_advance {
            self.step(dt);
            self.accumulator -= dt;
            steps += 1;
        }
        if self.accumulator >= dt {
            log::warn!(
                "simulation falling behind, dropping {:.3}s",
                self.accumulator - self.accumulator % dt
            );
            self.accumulator %= dt;
        }

        self.events.swap();
        steps
    }

    /// Run exactly one physics step of `dt` seconds.
    fn step(&mut self, dt: f32) {
        let contacts = self.world.contacts();
        let query: Option<&dyn WorldQuery> = if self.terrain_query {
            Some(&self.physics)
        } else {
            None
        };

        for entity in &self.order {
            let Some(pilot) = self.pilots.get_mut(entity) else {
                continue;
            };
            pilot.update(dt, &contacts, query);
            for event in pilot.take_events() {
                self.events.push(event);
            }

            let flight = pilot.flight();
            if let Ok((transform, velocity)) = self
                .world
                .inner
                .query_one_mut::<(&mut Transform, &mut Velocity)>(*entity)
            {
                *transform = flight.transform();
                velocity.linear = flight.velocity;
            }
        }

        self.time += dt;
        self.steps += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::BehaviorState;
    use crate::core::config::PilotConfig;
    use crate::ecs::Faction;

    fn spawn(name: &str, faction: Faction, position: Vec3, heading: Vec3) -> AircraftSpawn {
        AircraftSpawn {
            name: name.to_string(),
            faction,
            position,
            heading,
            speed: 200.0,
            pilot: PilotConfig::default(),
        }
    }

    fn run(sim: &mut Simulation, seconds: f32) {
        let frames = (seconds / 0.02).round() as usize;
        for _ in 0..frames {
            sim.advance(0.02);
        }
    }

    #[test]
    fn test_advance_runs_whole_steps() {
        let mut sim = Simulation::new(SimulationConfig::default());
        assert_eq!(sim.advance(0.05), 2);
        assert_eq!(sim.advance(0.005), 0);
        assert_eq!(sim.advance(0.01), 1);
        assert_eq!(sim.step_count(), 3);
    }

    #[test]
    fn test_advance_caps_steps() {
        let mut sim = Simulation::new(SimulationConfig::default());
        assert_eq!(sim.advance(10.0), 8);
        assert_eq!(sim.advance(0.0), 0);
    }

    #[test]
    fn test_world_follows_pilot() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let blue = sim.spawn_aircraft(&spawn(
            "Blue",
            Faction::Blue,
            Vec3::new(0.0, 1000.0, 0.0),
            Vec3::NEG_Z,
        ));
        run(&mut sim, 1.0);

        let contact = sim.world().contact(blue);
        let pilot = sim.pilot(blue).map(|p| p.flight().position);
        assert!(contact.is_some());
        assert_eq!(contact.map(|c| c.position), pilot);
        assert!(contact.is_some_and(|c| c.position.z < -100.0));
    }

    #[test]
    fn test_hostiles_engage_each_other() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let blue = sim.spawn_aircraft(&spawn(
            "Blue",
            Faction::Blue,
            Vec3::new(0.0, 1000.0, 0.0),
            Vec3::NEG_Z,
        ));
        let red = sim.spawn_aircraft(&spawn(
            "Red",
            Faction::Red,
            Vec3::new(0.0, 1000.0, -2000.0),
            Vec3::Z,
        ));
        sim.advance(0.02);

        assert_eq!(sim.pilot(blue).and_then(|p| p.current_target()), Some(red));
        assert_eq!(sim.pilot(red).and_then(|p| p.current_target()), Some(blue));
        assert!(sim.events().iter().any(|e| matches!(
            e,
            FlightEvent::StateChanged {
                to: BehaviorState::Engage,
                ..
            }
        )));
    }

    #[test]
    fn test_despawn_stops_pilot_and_clears_targets() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let blue = sim.spawn_aircraft(&spawn(
            "Blue",
            Faction::Blue,
            Vec3::new(0.0, 1000.0, 0.0),
            Vec3::NEG_Z,
        ));
        let red = sim.spawn_aircraft(&spawn(
            "Red",
            Faction::Red,
            Vec3::new(0.0, 1000.0, -2000.0),
            Vec3::Z,
        ));
        sim.advance(0.02);
        assert!(sim.despawn(red));
        assert!(sim.pilot(red).is_none());
        assert!(!sim.despawn(red));

        // Next sweep or decision drops the dead target.
        run(&mut sim, 0.6);
        let pilot = sim.pilot(blue);
        assert!(pilot.is_some_and(|p| !p.has_target()));
        assert!(pilot.is_some_and(|p| p.state() == BehaviorState::Patrol));
    }

    #[test]
    fn test_names_resolve() {
        let mut sim = Simulation::new(SimulationConfig::default());
        let e = sim.spawn_aircraft(&spawn("Viper", Faction::Blue, Vec3::Y * 900.0, Vec3::X));
        assert_eq!(sim.name(e).as_deref(), Some("Viper"));
    }

    #[test]
    fn test_duel_scenario_builds_geometry() {
        let sim = Simulation::from_scenario(&Scenario::default_duel());
        assert_eq!(sim.pilots().count(), 2);
        assert!(sim.physics().needs_refresh());
    }
}
