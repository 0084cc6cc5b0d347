//! Read-only view of the other flight entities in the simulation.

use glam::{Quat, Vec3};
use hecs::Entity;

use super::components::Allegiance;

/// Snapshot of another entity as seen by a sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub entity: Entity,
    pub position: Vec3,
    /// `None` when the entity has no simulated body to read a velocity from.
    pub velocity: Option<Vec3>,
    /// Attitude of the entity, identity faces -Z with +Y up.
    pub rotation: Quat,
    pub allegiance: Allegiance,
}

impl Contact {
    /// Nose direction of the entity.
    #[must_use]
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    /// Right wing axis, banked with the entity.
    #[must_use]
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Direction of travel, falling back to the nose direction when slow.
    #[must_use]
    pub fn heading(&self) -> Vec3 {
        self.velocity
            .and_then(|v| v.try_normalize())
            .unwrap_or_else(|| self.forward())
    }
}

/// Registry of flight entities consumed by target selection.
///
/// Implementations must return contacts in a stable order so scoring ties
/// resolve deterministically.
pub trait EntityDirectory {
    /// Every entity that could be sensed.
    fn contacts(&self) -> Vec<Contact>;

    /// Look up one entity, `None` if it was destroyed or never existed.
    fn contact(&self, entity: Entity) -> Option<Contact>;
}

impl EntityDirectory for [Contact] {
    fn contacts(&self) -> Vec<Contact> {
        self.to_vec()
    }

    fn contact(&self, entity: Entity) -> Option<Contact> {
        self.iter().find(|c| c.entity == entity).copied()
    }
}

impl EntityDirectory for Vec<Contact> {
    fn contacts(&self) -> Vec<Contact> {
        self.clone()
    }

    fn contact(&self, entity: Entity) -> Option<Contact> {
        self.as_slice().contact(entity)
    }
}
