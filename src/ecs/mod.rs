//! Entity Component System module
//!
//! Built on top of the hecs ECS library

mod components;
mod directory;
mod world;

pub use components::{
    Allegiance, EntityKind, Faction, Name, Transform, Velocity, look_rotation,
};
pub use directory::{Contact, EntityDirectory};
pub use world::World;
