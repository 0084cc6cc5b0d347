//! Pilot decision making
//!
//! Target selection, behavior states, aim-point planning and steering, tied
//! together per aircraft by [`PilotController`].

mod fsm;
mod navigation;
mod pilot;
mod steering;
mod targeting;

pub use fsm::{
    BehaviorContext, BehaviorMachine, BehaviorState, Decision, EngagementPolicy, Transition,
    decide,
};
pub use navigation::{
    NavigationPlanner, NavigationTarget, WaypointOrdering, WaypointSet, evasion_point, jink_sign,
    predict_position, pursuit_point,
};
pub use pilot::{PilotController, PilotSnapshot};
pub use steering::AimSteering;
pub use targeting::{SensorOrigin, TargetCandidate, TargetChange, TargetSelector, scan, score};
