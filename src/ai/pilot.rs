//! Per-aircraft pilot controller
//!
//! Owns the full control state of one AI aircraft and exposes the three
//! periodic tasks the driver calls:
//!
//! - [`PilotController::detection_tick`] sweeps the sensor and updates the
//!   target reference.
//! - [`PilotController::decision_tick`] re-evaluates the behavior state and
//!   recomputes the navigation target as one unit.
//! - [`PilotController::physics_step`] steers toward the navigation target,
//!   regulates speed, runs terrain avoidance and integrates the flight model.
//!
//! [`PilotController::update`] runs all three, detection and decision on
//! their own interval counters.

use glam::Vec3;
use hecs::Entity;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::fsm::{BehaviorContext, BehaviorMachine, BehaviorState};
use super::navigation::{NavigationPlanner, NavigationTarget};
use super::steering::AimSteering;
use super::targeting::{SensorOrigin, TargetChange, TargetSelector};
use crate::core::config::PilotConfig;
use crate::core::events::FlightEvent;
use crate::core::interval::Interval;
use crate::ecs::{EntityDirectory, Faction};
use crate::flight::{
    AvoidanceOutput, BoundaryEnforcer, BoundingVolume, ControlInputs, FlightDynamics,
    FlightReport, FlightState, MachController, ProbeState, SpeedCommand, TerrainAvoidance,
};
use crate::physics::WorldQuery;

/// Read-only summary of a pilot, for logging and observers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PilotSnapshot {
    pub entity: Entity,
    pub state: BehaviorState,
    pub target: Option<Entity>,
    pub aim_point: Vec3,
    pub position: Vec3,
    pub velocity: Vec3,
    pub speed: f32,
    pub mach: f32,
    /// Engine setting in `[0, max_throttle]`
    pub throttle: f32,
    /// Smoothed stick inputs as flown this step
    pub inputs: ControlInputs,
    pub avoiding: bool,
    pub agl: Option<f32>,
}

/// Decision and control core of one AI aircraft.
#[derive(Debug)]
pub struct PilotController {
    entity: Entity,
    faction: Faction,
    config: PilotConfig,

    flight: FlightState,
    boundary: BoundaryEnforcer,
    inputs: ControlInputs,
    commanded: ControlInputs,

    selector: TargetSelector,
    behavior: BehaviorMachine,
    planner: NavigationPlanner,
    navigation: NavigationTarget,
    steering: AimSteering,

    mach: MachController,
    last_speed: Option<SpeedCommand>,
    avoidance: TerrainAvoidance,
    last_avoidance: Option<AvoidanceOutput>,

    detection: Interval,
    decision: Interval,
    clock: f32,
    events: Vec<FlightEvent>,
}

impl PilotController {
    /// Create a pilot for `entity` flying `flight`.
    ///
    /// Configuration problems are logged once here and repaired; they never
    /// prevent the pilot from flying.
    pub fn new(
        entity: Entity,
        faction: Faction,
        mut flight: FlightState,
        config: PilotConfig,
    ) -> Self {
        for warning in config.validate() {
            log::warn!("pilot {entity:?}: {warning}");
        }
        let config = config.sanitized();
        flight.throttle = flight.throttle.clamp(0.0, config.speed.max_throttle);

        let boundary = BoundaryEnforcer::new(
            config.bounds.as_ref().map(BoundingVolume::from_config),
            config.altitude_floor,
        );
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut planner = NavigationPlanner::from_config(&config.patrol, rng);
        let navigation = planner.plan(BehaviorState::Patrol, flight.position, None, &config, 0.0);

        Self {
            entity,
            faction,
            flight,
            boundary,
            inputs: ControlInputs::NEUTRAL,
            commanded: ControlInputs::NEUTRAL,
            selector: TargetSelector::new(),
            behavior: BehaviorMachine::new(),
            planner,
            navigation,
            steering: AimSteering::from_config(&config.handling),
            mach: MachController::new(),
            last_speed: None,
            avoidance: TerrainAvoidance::new(),
            last_avoidance: None,
            detection: Interval::immediate(config.sensor.detection_interval),
            decision: Interval::immediate(config.sensor.decision_interval),
            clock: 0.0,
            events: Vec::new(),
            config,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    #[must_use]
    pub fn entity(&self) -> Entity {
        self.entity
    }

    #[must_use]
    pub fn faction(&self) -> Faction {
        self.faction
    }

    /// The repaired configuration the pilot actually flies with.
    #[must_use]
    pub fn config(&self) -> &PilotConfig {
        &self.config
    }

    #[must_use]
    pub fn has_target(&self) -> bool {
        self.selector.has_target()
    }

    #[must_use]
    pub fn current_target(&self) -> Option<Entity> {
        self.selector.current()
    }

    #[must_use]
    pub fn state(&self) -> BehaviorState {
        self.behavior.state()
    }

    #[must_use]
    pub fn navigation(&self) -> &NavigationTarget {
        &self.navigation
    }

    #[must_use]
    pub fn flight(&self) -> &FlightState {
        &self.flight
    }

    /// Mutable flight state, for placing the aircraft from outside.
    pub fn flight_mut(&mut self) -> &mut FlightState {
        &mut self.flight
    }

    /// Smoothed inputs flown on the last physics step.
    #[must_use]
    pub fn inputs(&self) -> ControlInputs {
        self.inputs
    }

    /// Inputs committed on the last physics step, before smoothing.
    #[must_use]
    pub fn commanded(&self) -> ControlInputs {
        self.commanded
    }

    #[must_use]
    pub fn speed_command(&self) -> Option<&SpeedCommand> {
        self.last_speed.as_ref()
    }

    #[must_use]
    pub fn avoidance(&self) -> Option<&AvoidanceOutput> {
        self.last_avoidance.as_ref()
    }

    #[must_use]
    pub fn mach_integral(&self) -> f32 {
        self.mach.integral()
    }

    #[must_use]
    pub fn waypoint_cursor(&self) -> usize {
        self.planner.waypoints().cursor()
    }

    #[must_use]
    pub fn waypoints(&self) -> &[Vec3] {
        self.planner.waypoints().points()
    }

    /// Simulated seconds flown.
    #[must_use]
    pub fn clock(&self) -> f32 {
        self.clock
    }

    #[must_use]
    pub fn snapshot(&self) -> PilotSnapshot {
        PilotSnapshot {
            entity: self.entity,
            state: self.behavior.state(),
            target: self.selector.current(),
            aim_point: self.navigation.aim_point,
            position: self.flight.position,
            velocity: self.flight.velocity,
            speed: self.flight.speed(),
            mach: self.flight.forward_speed().max(0.0) / self.config.mach.speed_of_sound,
            throttle: self.flight.throttle,
            inputs: self.inputs,
            avoiding: self.avoidance.is_avoiding(),
            agl: self.last_avoidance.and_then(|a| a.agl),
        }
    }

    /// Take the events produced since the last call.
    pub fn take_events(&mut self) -> Vec<FlightEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Periodic tasks
    // ------------------------------------------------------------------

    fn sensor_origin(&self) -> SensorOrigin {
        SensorOrigin {
            entity: Some(self.entity),
            faction: self.faction,
            position: self.flight.position,
            forward: self.flight.forward(),
            range: self.config.sensor.range,
        }
    }

    /// Sweep the sensor and adopt the best hostile contact.
    pub fn detection_tick(&mut self, directory: &dyn EntityDirectory) {
        let origin = self.sensor_origin();
        let change = self.selector.update(directory, &origin);
        self.record_target_change(change);
    }

    /// Re-evaluate behavior and recompute the navigation target.
    ///
    /// A target that was destroyed or left sensor range since the last
    /// detection is dropped before anything uses it.
    pub fn decision_tick(&mut self, directory: &dyn EntityDirectory) {
        let origin = self.sensor_origin();
        let (target, change) = self.selector.validate(directory, &origin);
        self.record_target_change(change);

        let position = self.flight.position;
        let ctx = BehaviorContext {
            target_distance: target.map(|t| t.position.distance(position)),
            policy: self.config.policy,
            min_engagement_range: self.config.engagement.min_engagement_range,
        };
        if let Some(transition) = self.behavior.evaluate(&ctx) {
            self.events.push(FlightEvent::StateChanged {
                entity: self.entity,
                from: transition.from,
                to: transition.to,
            });
        }

        self.navigation = self.planner.plan(
            self.behavior.state(),
            position,
            target.as_ref(),
            &self.config,
            self.clock,
        );
    }

    /// Send the pilot back to its patrol centre until the next decision.
    pub fn force_return(&mut self) {
        if let Some(transition) = self.behavior.force_return() {
            self.events.push(FlightEvent::StateChanged {
                entity: self.entity,
                from: transition.from,
                to: transition.to,
            });
        }
        self.navigation = self.planner.plan(
            BehaviorState::Return,
            self.flight.position,
            None,
            &self.config,
            self.clock,
        );
    }

    /// Advance control and flight by one fixed step.
    pub fn physics_step(&mut self, dt: f32, query: Option<&dyn WorldQuery>) -> FlightReport {
        let dt = dt.max(0.0);
        self.clock += dt;
        self.behavior.tick(dt);

        let mut command = self.steering.steer(&self.flight, self.navigation.aim_point);

        let speed = self.mach.update(
            self.flight.forward_speed(),
            self.behavior.speed_target(),
            &self.config.mach,
            &self.config.speed,
            dt,
        );
        command.throttle = speed.throttle_input;

        let probe = ProbeState {
            position: self.flight.position,
            forward: self.flight.forward(),
            right: self.flight.right(),
            speed: self.flight.speed(),
        };
        let was_avoiding = self.avoidance.is_avoiding();
        let avoidance = self.avoidance.evaluate(&probe, query, &self.config.terrain, dt);
        match (was_avoiding, avoidance.avoiding) {
            (false, true) => {
                log::debug!(
                    "pilot {:?}: avoidance engaged, priority {:.2}",
                    self.entity,
                    avoidance.priority
                );
                self.events.push(FlightEvent::AvoidanceStarted {
                    entity: self.entity,
                    priority: avoidance.priority,
                    agl: avoidance.agl,
                });
            }
            (true, false) => self.events.push(FlightEvent::AvoidanceCleared {
                entity: self.entity,
            }),
            _ => {}
        }

        self.commanded = avoidance.apply(command, self.config.terrain.override_priority);
        self.inputs
            .smooth_toward(self.commanded, self.config.controls.smoothing_rate, dt);

        let dynamics = FlightDynamics {
            speed: &self.config.speed,
            handling: &self.config.handling,
            boundary: &self.boundary,
            skill_level: self.config.skill_level,
            dead_zone: self.config.controls.dead_zone,
        };
        let report = dynamics.integrate(&mut self.flight, self.inputs, dt);

        self.last_speed = Some(speed);
        self.last_avoidance = Some(avoidance);
        report
    }

    /// Run whichever periodic tasks are due, then one physics step.
    pub fn update(
        &mut self,
        dt: f32,
        directory: &dyn EntityDirectory,
        query: Option<&dyn WorldQuery>,
    ) -> FlightReport {
        if self.detection.tick(dt) {
            self.detection_tick(directory);
        }
        if self.decision.tick(dt) {
            self.decision_tick(directory);
        }
        self.physics_step(dt, query)
    }

    fn record_target_change(&mut self, change: TargetChange) {
        let entity = self.entity;
        match change {
            TargetChange::Unchanged => {}
            TargetChange::Acquired(target) => {
                self.events.push(FlightEvent::TargetAcquired { entity, target });
            }
            TargetChange::Lost(target) => {
                self.events.push(FlightEvent::TargetLost { entity, target });
            }
            TargetChange::Switched { from, to } => {
                self.events.push(FlightEvent::TargetLost {
                    entity,
                    target: from,
                });
                self.events.push(FlightEvent::TargetAcquired { entity, target: to });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::EngagementPolicy;
    use crate::ecs::{Allegiance, Contact};
    use glam::Quat;
    use crate::physics::FlatGround;

    fn spawn(n: usize) -> Vec<Entity> {
        let mut world = hecs::World::new();
        (0..n).map(|_| world.spawn(())).collect()
    }

    fn bandit(entity: Entity, position: Vec3) -> Contact {
        Contact {
            entity,
            position,
            velocity: Some(Vec3::new(0.0, 0.0, -200.0)),
            rotation: Quat::IDENTITY,
            allegiance: Allegiance::aircraft(Faction::Red),
        }
    }

    fn pilot(entity: Entity, config: PilotConfig) -> PilotController {
        let flight = FlightState::level(Vec3::new(0.0, 1000.0, 0.0), Vec3::NEG_Z, 200.0);
        PilotController::new(entity, Faction::Blue, flight, config)
    }

    #[test]
    fn test_detection_then_decision_engages() {
        let e = spawn(2);
        let mut pilot = pilot(e[0], PilotConfig::default());
        let contacts = vec![bandit(e[1], Vec3::new(0.0, 1000.0, -1000.0))];

        pilot.detection_tick(&contacts);
        assert_eq!(pilot.current_target(), Some(e[1]));
        assert_eq!(pilot.state(), BehaviorState::Patrol);

        pilot.decision_tick(&contacts);
        assert_eq!(pilot.state(), BehaviorState::Engage);
        assert_eq!(pilot.navigation().target, Some(e[1]));

        let events = pilot.take_events();
        assert!(events.contains(&FlightEvent::TargetAcquired {
            entity: e[0],
            target: e[1]
        }));
        assert!(events.contains(&FlightEvent::StateChanged {
            entity: e[0],
            from: BehaviorState::Patrol,
            to: BehaviorState::Engage
        }));
        assert!(pilot.take_events().is_empty());
    }

    #[test]
    fn test_destroyed_target_falls_back_to_patrol() {
        let e = spawn(2);
        let mut pilot = pilot(e[0], PilotConfig::default());
        let mut contacts = vec![bandit(e[1], Vec3::new(0.0, 1000.0, -1000.0))];
        pilot.detection_tick(&contacts);
        pilot.decision_tick(&contacts);

        contacts.clear();
        pilot.decision_tick(&contacts);
        assert!(!pilot.has_target());
        assert_eq!(pilot.state(), BehaviorState::Patrol);
        assert_eq!(pilot.navigation().target, None);
    }

    #[test]
    fn test_update_runs_ticks_on_first_call() {
        let e = spawn(2);
        let mut pilot = pilot(e[0], PilotConfig::default());
        let contacts = vec![bandit(e[1], Vec3::new(0.0, 1000.0, -1000.0))];
        pilot.update(0.02, &contacts, None);
        assert_eq!(pilot.state(), BehaviorState::Engage);
    }

    #[test]
    fn test_hard_deck_forces_climb_and_full_throttle() {
        let e = spawn(1);
        let config = PilotConfig::default();
        let mut pilot = PilotController::new(
            e[0],
            Faction::Blue,
            FlightState::level(Vec3::new(0.0, 100.0, 0.0), Vec3::NEG_Z, 200.0),
            config.clone(),
        );
        let ground = FlatGround::new(0.0);

        pilot.physics_step(0.02, Some(&ground));
        let avoidance = pilot.avoidance().copied();
        assert!(avoidance.is_some_and(|a| a.avoiding));
        assert_eq!(pilot.commanded().throttle, 1.0);

        // Hold the aircraft at half the hard deck so the threat stays constant.
        let mut last = pilot.commanded().pitch;
        for _ in 0..60 {
            pilot.flight_mut().position.y = 100.0;
            pilot.physics_step(0.02, Some(&ground));
            let pitch = pilot.commanded().pitch;
            assert!(pitch >= last - 1e-6);
            last = pitch;
        }
        assert!(last > 0.9 * config.terrain.emergency_climb);
        let events = pilot.take_events();
        assert!(matches!(events[0], FlightEvent::AvoidanceStarted { .. }));
    }

    #[test]
    fn test_force_return_aims_home() {
        let e = spawn(1);
        let mut pilot = pilot(e[0], PilotConfig::default());
        pilot.force_return();
        assert_eq!(pilot.state(), BehaviorState::Return);
        assert_eq!(pilot.navigation().aim_point, pilot.config().patrol.center);
    }

    #[test]
    fn test_invalid_config_is_repaired() {
        let e = spawn(1);
        let config = PilotConfig {
            skill_level: 3.0,
            policy: EngagementPolicy::Defensive,
            ..Default::default()
        };
        let pilot = pilot(e[0], config);
        assert_eq!(pilot.config().skill_level, 1.0);
    }

    #[test]
    fn test_straight_leg_settles_at_cruise_mach() {
        let e = spawn(1);
        let mut config = PilotConfig::default();
        config.patrol.center = Vec3::new(0.0, 1000.0, -200_000.0);
        config.patrol.size = glam::Vec2::ZERO;
        config.patrol.altitude_min = 1000.0;
        config.patrol.altitude_max = 1000.0;
        config.patrol.waypoint_count = 1;
        let cruise = config.mach.cruise_mach;
        let max_throttle = config.speed.max_throttle;
        let mut pilot = pilot(e[0], config);
        let contacts: Vec<Contact> = Vec::new();

        for _ in 0..6000 {
            pilot.update(0.02, &contacts, None);
        }
        let (mut lowest, mut highest) = (f32::MAX, f32::MIN);
        for _ in 0..3000 {
            pilot.update(0.02, &contacts, None);
            let snapshot = pilot.snapshot();
            assert!((snapshot.mach - cruise).abs() < 0.02, "mach {}", snapshot.mach);
            assert!(snapshot.throttle > 0.0 && snapshot.throttle < max_throttle);
            lowest = lowest.min(snapshot.mach);
            highest = highest.max(snapshot.mach);
        }
        assert!(highest - lowest < 0.01, "mach swung {lowest}..{highest}");
        assert!((pilot.flight().position.y - 1000.0).abs() < 1.0);
    }

    #[test]
    fn test_speed_command_publishes_stall_margin_reference() {
        let e = spawn(1);
        let mut config = PilotConfig::default();
        config.mach.cruise_mach = 0.2;
        config.mach.mach_min = 0.1;
        let stall_margin = config.speed.stall_threshold * 1.2;
        let mut pilot = pilot(e[0], config);
        assert!(pilot.speed_command().is_none());

        let contacts: Vec<Contact> = Vec::new();
        pilot.update(0.02, &contacts, None);
        let command = pilot.speed_command().copied();
        assert!(command.is_some_and(|c| (c.reference_speed - stall_margin).abs() < 1e-3));
    }

    #[test]
    fn test_spawn_throttle_respects_max_throttle() {
        let e = spawn(1);
        let mut config = PilotConfig::default();
        config.speed.max_throttle = 0.3;
        let pilot = pilot(e[0], config);
        assert_eq!(pilot.flight().throttle, 0.3);
        assert_eq!(pilot.snapshot().throttle, 0.3);
    }

    #[test]
    fn test_non_finite_config_still_flies() {
        let e = spawn(1);
        let mut config: PilotConfig = ron::from_str("(skill_level: NaN)").unwrap();
        config.sensor.range = f32::INFINITY;
        config.mach.kp = f32::NAN;
        let mut pilot = pilot(e[0], config);
        assert_eq!(pilot.config().skill_level, PilotConfig::default().skill_level);

        let contacts: Vec<Contact> = Vec::new();
        for _ in 0..50 {
            pilot.update(0.02, &contacts, None);
        }
        assert!(pilot.flight().position.is_finite());
        assert!(pilot.flight().velocity.is_finite());
    }

    #[test]
    fn test_throttle_and_speed_stay_bounded() {
        let e = spawn(2);
        let config = PilotConfig::default();
        let mut pilot = pilot(e[0], config.clone());
        let contacts = vec![bandit(e[1], Vec3::new(0.0, 1000.0, -3000.0))];
        let ground = FlatGround::new(0.0);
        for _ in 0..1500 {
            pilot.update(0.02, &contacts, Some(&ground));
            let flight = pilot.flight();
            assert!(flight.throttle >= 0.0 && flight.throttle <= config.speed.max_throttle);
            assert!(flight.speed() <= config.speed.max_speed + 1e-3);
            assert!(pilot.mach_integral().abs() <= config.mach.integral_limit + 1e-6);
        }
    }
}
