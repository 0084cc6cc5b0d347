//! Sensor sweep and target selection
//!
//! Every hostile contact within sensor range is scored by how far off the
//! nose it sits and how far away it is; the lowest score wins. There is no
//! field-of-view cutoff, so a contact directly behind is still a candidate.

use glam::Vec3;
use hecs::Entity;
use smallvec::SmallVec;

use crate::ecs::{Contact, EntityDirectory, Faction};

/// Weight of the angle-off term (per radian).
pub const ANGLE_WEIGHT: f32 = 2.0;
/// Weight of the distance term (per metre).
pub const DISTANCE_WEIGHT: f32 = 0.001;

/// Selection score, lower is better.
#[must_use]
#[inline]
pub fn score(angle_off: f32, distance: f32) -> f32 {
    angle_off * ANGLE_WEIGHT + distance * DISTANCE_WEIGHT
}

/// A hostile contact that passed the sensor filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetCandidate {
    pub entity: Entity,
    pub position: Vec3,
    pub distance: f32,
    /// Angle between the observer's nose and the line of sight (radians)
    pub angle_off: f32,
    pub score: f32,
}

/// Observer side of a sensor sweep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorOrigin {
    /// The observer itself, skipped during the sweep
    pub entity: Option<Entity>,
    pub faction: Faction,
    pub position: Vec3,
    pub forward: Vec3,
    pub range: f32,
}

impl SensorOrigin {
    /// Score `contact`, or `None` if it is not an eligible target.
    #[must_use]
    pub fn evaluate(&self, contact: &Contact) -> Option<TargetCandidate> {
        if Some(contact.entity) == self.entity {
            return None;
        }
        // Entities without a simulated body cannot be tracked.
        contact.velocity?;
        if !contact.allegiance.is_target_for(self.faction) {
            return None;
        }

        let offset = contact.position - self.position;
        let distance = offset.length();
        if distance > self.range {
            return None;
        }

        let angle_off = match offset.try_normalize() {
            Some(direction) => self.forward.angle_between(direction),
            None => 0.0,
        };
        Some(TargetCandidate {
            entity: contact.entity,
            position: contact.position,
            distance,
            angle_off,
            score: score(angle_off, distance),
        })
    }
}

/// Pick the best candidate among `contacts`. Ties keep the earlier contact.
#[must_use]
pub fn scan(contacts: &[Contact], origin: &SensorOrigin) -> Option<TargetCandidate> {
    let candidates: SmallVec<[TargetCandidate; 8]> =
        contacts.iter().filter_map(|c| origin.evaluate(c)).collect();

    let mut best: Option<TargetCandidate> = None;
    for candidate in &candidates {
        if best.is_none_or(|b| candidate.score < b.score) {
            best = Some(*candidate);
        }
    }

    log::trace!(
        "sensor sweep: {} contacts, {} candidates",
        contacts.len(),
        candidates.len()
    );
    best
}

/// Outcome of a selector update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetChange {
    Unchanged,
    Acquired(Entity),
    Switched { from: Entity, to: Entity },
    Lost(Entity),
}

/// Holds the pilot's current target reference.
#[derive(Debug, Clone, Default)]
pub struct TargetSelector {
    current: Option<Entity>,
}

impl TargetSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    #[inline]
    pub fn current(&self) -> Option<Entity> {
        self.current
    }

    #[must_use]
    #[inline]
    pub fn has_target(&self) -> bool {
        self.current.is_some()
    }

    /// Run a sweep over `directory` and adopt its winner.
    pub fn update(&mut self, directory: &dyn EntityDirectory, origin: &SensorOrigin) -> TargetChange {
        let best = scan(&directory.contacts(), origin).map(|c| c.entity);
        self.set(best)
    }

    /// Drop the target if it no longer exists or has left sensor range.
    ///
    /// Returns the live contact when the target is still valid.
    pub fn validate(
        &mut self,
        directory: &dyn EntityDirectory,
        origin: &SensorOrigin,
    ) -> (Option<Contact>, TargetChange) {
        let Some(entity) = self.current else {
            return (None, TargetChange::Unchanged);
        };
        match directory.contact(entity) {
            Some(contact) if contact.position.distance(origin.position) <= origin.range => {
                (Some(contact), TargetChange::Unchanged)
            }
            _ => (None, self.set(None)),
        }
    }

    fn set(&mut self, next: Option<Entity>) -> TargetChange {
        let change = match (self.current, next) {
            (None, None) => TargetChange::Unchanged,
            (Some(a), Some(b)) if a == b => TargetChange::Unchanged,
            (None, Some(to)) => TargetChange::Acquired(to),
            (Some(from), None) => TargetChange::Lost(from),
            (Some(from), Some(to)) => TargetChange::Switched { from, to },
        };
        match change {
            TargetChange::Acquired(to) => log::debug!("target acquired: {to:?}"),
            TargetChange::Switched { from, to } => log::debug!("target switched: {from:?} -> {to:?}"),
            TargetChange::Lost(from) => log::debug!("target lost: {from:?}"),
            TargetChange::Unchanged => {}
        }
        self.current = next;
        change
    }
}
