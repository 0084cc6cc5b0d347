//! World wrapper around hecs

use hecs::Entity;

use super::components::{Allegiance, Transform, Velocity};
use super::directory::{Contact, EntityDirectory};

/// Simulation world containing all entities and components
pub struct World {
    /// The underlying hecs world
    pub inner: hecs::World,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
        }
    }

    /// Spawn an entity with the given components
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    /// Despawn an entity
    pub fn despawn(&mut self, entity: Entity) -> Result<(), hecs::NoSuchEntity> {
        self.inner.despawn(entity)
    }

    /// Get a reference to a component
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<'_, T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Get a mutable reference to a component
    pub fn get_mut<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<hecs::RefMut<'_, T>, hecs::ComponentError> {
        self.inner.get::<&mut T>(entity)
    }

    /// Check if an entity exists
    pub fn contains(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Get the number of entities
    pub fn len(&self) -> u32 {
        self.inner.len()
    }

    /// Check if the world is empty
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Query for entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<'_, Q> {
        self.inner.query::<Q>()
    }

    fn contact_for(
        entity: Entity,
        transform: &Transform,
        velocity: Option<&Velocity>,
        allegiance: &Allegiance,
    ) -> Contact {
        Contact {
            entity,
            position: transform.position,
            velocity: velocity.map(|v| v.linear),
            rotation: transform.rotation,
            allegiance: *allegiance,
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityDirectory for World {
    fn contacts(&self) -> Vec<Contact> {
        let mut query = self
            .inner
            .query::<(&Transform, Option<&Velocity>, &Allegiance)>();
        let mut contacts: Vec<Contact> = query
            .iter()
            .map(|(entity, (transform, velocity, allegiance))| {
                Self::contact_for(entity, transform, velocity, allegiance)
            })
            .collect();
        // hecs iterates by archetype; sort so scans are reproducible
        contacts.sort_by_key(|c| c.entity.id());
        contacts
    }

    fn contact(&self, entity: Entity) -> Option<Contact> {
        let mut query = self
            .inner
            .query_one::<(&Transform, Option<&Velocity>, &Allegiance)>(entity)
            .ok()?;
        query
            .get()
            .map(|(transform, velocity, allegiance)| {
                Self::contact_for(entity, transform, velocity, allegiance)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::{EntityKind, Faction};
    use glam::Vec3;

    #[test]
    fn test_contacts_report_missing_body() {
        let mut world = World::new();
        let plane = world.spawn((
            Transform::from_position(Vec3::new(0.0, 100.0, 0.0)),
            Velocity::linear(Vec3::X * 50.0),
            Allegiance::aircraft(Faction::Red),
        ));
        let bunker = world.spawn((
            Transform::from_position(Vec3::ZERO),
            Allegiance {
                faction: Faction::Red,
                kind: EntityKind::GroundUnit,
            },
        ));

        let contacts = world.contacts();
        assert_eq!(contacts.len(), 2);
        assert_eq!(world.contact(plane).and_then(|c| c.velocity), Some(Vec3::X * 50.0));
        assert_eq!(world.contact(bunker).map(|c| c.velocity), Some(None));
    }

    #[test]
    fn test_despawned_entity_has_no_contact() {
        let mut world = World::new();
        let plane = world.spawn((
            Transform::default(),
            Velocity::default(),
            Allegiance::aircraft(Faction::Blue),
        ));
        world.despawn(plane).unwrap();
        assert!(world.contact(plane).is_none());
        assert!(world.is_empty());
    }
}
