//! World geometry queries
//!
//! Terrain and obstacles are built on top of rapier3d

mod query;
mod world;

pub use query::{FlatGround, RayFilter, RayHit, WorldQuery};
pub use world::{ColliderHandle, Physics, RigidBodyHandle};
