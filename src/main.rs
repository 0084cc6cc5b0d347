//! Headless engagement demo
//!
//! Runs the scenario given as the first argument (RON or JSON), or a
//! built-in duel, and logs what every pilot does. Set `RUST_LOG=info` to
//! see behavior changes.

use wingman::prelude::*;

/// Frame length the demo feeds the driver with.
const FRAME_DT: f32 = 1.0 / 60.0;
/// How often a status line is logged.
const REPORT_PERIOD: f32 = 5.0;

fn describe(sim: &Simulation, event: &FlightEvent) -> String {
    let name = |e: wingman::hecs::Entity| sim.name(e).unwrap_or_else(|| format!("{e:?}"));
    match *event {
        FlightEvent::StateChanged { entity, from, to } => {
            format!("{} {} -> {}", name(entity), from, to)
        }
        FlightEvent::TargetAcquired { entity, target } => {
            format!("{} locked {}", name(entity), name(target))
        }
        FlightEvent::TargetLost { entity, target } => {
            format!("{} lost {}", name(entity), name(target))
        }
        FlightEvent::AvoidanceStarted { entity, priority, agl } => match agl {
            Some(agl) => format!(
                "{} avoiding terrain (priority {priority:.2}, {agl:.0} m AGL)",
                name(entity)
            ),
            None => format!("{} avoiding terrain (priority {priority:.2})", name(entity)),
        },
        FlightEvent::AvoidanceCleared { entity } => format!("{} clear of terrain", name(entity)),
        FlightEvent::Removed { entity } => format!("{} removed", name(entity)),
        _ => format!("{event:?}"),
    }
}

fn report(sim: &Simulation) {
    for snapshot in sim.snapshots() {
        let name = sim
            .name(snapshot.entity)
            .unwrap_or_else(|| format!("{:?}", snapshot.entity));
        log::info!(
            "t={:>5.1}s {:<10} {:<7} pos=({:>7.0},{:>6.0},{:>7.0}) M{:.2} thr={:.2}{}",
            sim.time(),
            name,
            snapshot.state.name(),
            snapshot.position.x,
            snapshot.position.y,
            snapshot.position.z,
            snapshot.mach,
            snapshot.throttle,
            if snapshot.avoiding { " AVOID" } else { "" }
        );
    }
}

fn main() {
    env_logger::init();

    let scenario = match std::env::args().nth(1) {
        Some(path) => match Scenario::load(&path) {
            Ok(scenario) => scenario,
            Err(e) => {
                eprintln!("Failed to load scenario {path}: {e}");
                std::process::exit(1);
            }
        },
        None => Scenario::default_duel(),
    };

    log::info!(
        "Running '{}' for {:.0}s",
        scenario.name,
        scenario.simulation.duration
    );
    let mut sim = Simulation::from_scenario(&scenario);

    let mut next_report = 0.0;
    while sim.time() < scenario.simulation.duration {
        sim.advance(FRAME_DT);
        for event in sim.events().iter() {
            log::info!("{}", describe(&sim, event));
        }
        if sim.time() >= next_report {
            report(&sim);
            next_report += REPORT_PERIOD;
        }
    }

    report(&sim);
    log::info!("Finished after {} steps", sim.step_count());
}
