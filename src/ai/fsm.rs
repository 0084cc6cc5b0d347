//! Behavior state machine for AI pilots
//!
//! The pilot's tactical state is a pure function of whether it holds a
//! target, how far away that target is, and its engagement policy. The
//! machine keeps the current state so that changes can be reported and
//! logged, and exposes the speed reference each state flies at.
//!
//! | Target | Policy     | Distance         | State  | Speed          |
//! |--------|------------|------------------|--------|----------------|
//! | none   | any        |                  | Patrol | cruise         |
//! | some   | Aggressive | any              | Engage | combat         |
//! | some   | Defensive  | < min engagement | Evade  | reduced combat |
//! | some   | Defensive  | otherwise        | Engage | reduced combat |
//! | some   | Escort     | any              | Engage | cruise         |
//!
//! `Return` is never chosen by the table. It can only be entered through
//! [`BehaviorMachine::force_return`] and is left again on the next
//! evaluation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::flight::SpeedTarget;

// ============================================================================
// States
// ============================================================================

/// Tactical state of a pilot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BehaviorState {
    #[default]
    Patrol,
    Engage,
    Evade,
    Return,
}

impl BehaviorState {
    /// State name for debugging and logging.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BehaviorState::Patrol => "Patrol",
            BehaviorState::Engage => "Engage",
            BehaviorState::Evade => "Evade",
            BehaviorState::Return => "Return",
        }
    }
}

impl fmt::Display for BehaviorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a pilot behaves once it holds a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EngagementPolicy {
    /// Chase and hold a firing position behind the target
    #[default]
    Aggressive,
    /// Keep at standoff distance, break away when the target closes in
    Defensive,
    /// Fly formation on the target's flank
    Escort,
}

// ============================================================================
// Decision table
// ============================================================================

/// Inputs to one behavior evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BehaviorContext {
    /// Distance to the current target, `None` without one
    pub target_distance: Option<f32>,
    pub policy: EngagementPolicy,
    pub min_engagement_range: f32,
}

/// State and speed reference chosen for a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub state: BehaviorState,
    pub speed: SpeedTarget,
}

/// Evaluate the decision table.
#[must_use]
pub fn decide(ctx: &BehaviorContext) -> Decision {
    let Some(distance) = ctx.target_distance else {
        return Decision {
            state: BehaviorState::Patrol,
            speed: SpeedTarget::Cruise,
        };
    };

    match ctx.policy {
        EngagementPolicy::Aggressive => Decision {
            state: BehaviorState::Engage,
            speed: SpeedTarget::Combat,
        },
        EngagementPolicy::Defensive if distance < ctx.min_engagement_range => Decision {
            state: BehaviorState::Evade,
            speed: SpeedTarget::ReducedCombat,
        },
        EngagementPolicy::Defensive => Decision {
            state: BehaviorState::Engage,
            speed: SpeedTarget::ReducedCombat,
        },
        EngagementPolicy::Escort => Decision {
            state: BehaviorState::Engage,
            speed: SpeedTarget::Cruise,
        },
    }
}

// ============================================================================
// State Machine
// ============================================================================

/// A change of state produced by the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: BehaviorState,
    pub to: BehaviorState,
}

/// Holds the current behavior state and its speed reference.
#[derive(Debug, Clone, Default)]
pub struct BehaviorMachine {
    current: BehaviorState,
    speed: SpeedTarget,
    /// Time spent in the current state (seconds)
    time_in_state: f32,
}

impl BehaviorMachine {
    /// Create a machine in `Patrol` at cruise speed.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    #[inline]
    pub fn state(&self) -> BehaviorState {
        self.current
    }

    #[must_use]
    #[inline]
    pub fn speed_target(&self) -> SpeedTarget {
        self.speed
    }

    #[must_use]
    #[inline]
    pub fn time_in_state(&self) -> f32 {
        self.time_in_state
    }

    #[must_use]
    #[inline]
    pub fn is_in_state(&self, state: BehaviorState) -> bool {
        self.current == state
    }

    /// Advance the state clock.
    pub fn tick(&mut self, dt: f32) {
        self.time_in_state += dt.max(0.0);
    }

    /// Re-evaluate the decision table, returning the transition if the state
    /// changed.
    pub fn evaluate(&mut self, ctx: &BehaviorContext) -> Option<Transition> {
        let decision = decide(ctx);
        self.speed = decision.speed;
        self.enter(decision.state)
    }

    /// Send the pilot back to its patrol centre at cruise speed.
    pub fn force_return(&mut self) -> Option<Transition> {
        self.speed = SpeedTarget::Cruise;
        self.enter(BehaviorState::Return)
    }

    fn enter(&mut self, next: BehaviorState) -> Option<Transition> {
        if next == self.current {
            return None;
        }
        let transition = Transition {
            from: self.current,
            to: next,
        };
        log::info!(
            "behavior {} -> {} after {:.1}s",
            transition.from,
            transition.to,
            self.time_in_state
        );
        self.current = next;
        self.time_in_state = 0.0;
        Some(transition)
    }
}

// ============================================================================
// Tests
// ============================================================================
