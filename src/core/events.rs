//! Pilot events
//!
//! Behavior changes, target changes and terrain-avoidance episodes are
//! pushed here by the simulation so callers can observe what each pilot is
//! doing without polling its internals.

use std::collections::VecDeque;

use hecs::Entity;

use crate::ai::BehaviorState;

// ============================================================================
// Event Types
// ============================================================================

/// Something observable happened to a pilot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[non_exhaustive]
pub enum FlightEvent {
    /// The behavior machine changed state.
    StateChanged {
        entity: Entity,
        from: BehaviorState,
        to: BehaviorState,
    },

    /// A target was selected (also sent for the new target on a switch).
    TargetAcquired { entity: Entity, target: Entity },

    /// The target was dropped: destroyed, out of range or replaced.
    TargetLost { entity: Entity, target: Entity },

    /// Terrain or obstacle avoidance took over.
    AvoidanceStarted {
        entity: Entity,
        priority: f32,
        /// Ground clearance at the moment avoidance started, if measured
        agl: Option<f32>,
    },

    /// Avoidance released control back to navigation.
    AvoidanceCleared { entity: Entity },

    /// The pilot was torn down.
    Removed { entity: Entity },
}

impl FlightEvent {
    /// The pilot the event concerns.
    #[must_use]
    pub fn entity(&self) -> Entity {
        match *self {
            FlightEvent::StateChanged { entity, .. }
            | FlightEvent::TargetAcquired { entity, .. }
            | FlightEvent::TargetLost { entity, .. }
            | FlightEvent::AvoidanceStarted { entity, .. }
            | FlightEvent::AvoidanceCleared { entity }
            | FlightEvent::Removed { entity } => entity,
        }
    }
}

// ============================================================================
// Event Queue
// ============================================================================

/// Double-buffered queue of pilot events.
///
/// Events pushed while a step runs become readable only once the step has
/// finished, so observers never see a half-finished step.
///
/// # Example
///
/// ```ignore
/// let mut queue = EventQueue::new();
///
/// // Step N: a pilot changes state
/// queue.push(FlightEvent::StateChanged { entity, from, to });
///
/// // Step finished: observers read it (after swap)
/// queue.swap();
/// for event in queue.iter() {
///     report(event);
/// }
/// ```
#[derive(Debug)]
pub struct EventQueue {
    /// Events being written during the current advance
    pending: VecDeque<FlightEvent>,
    /// Events from the last finished advance, ready for reading
    processing: VecDeque<FlightEvent>,
}

impl EventQueue {
    /// Default initial capacity for event queues.
    const DEFAULT_CAPACITY: usize = 64;

    /// Create a new event queue with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a new event queue with specified initial capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: VecDeque::with_capacity(capacity),
            processing: VecDeque::with_capacity(capacity),
        }
    }

    /// Push an event to be read after the next swap.
    #[inline]
    pub fn push(&mut self, event: FlightEvent) {
        self.pending.push_back(event);
    }

    /// Swap the pending and processing queues.
    ///
    /// The simulation calls this at the end of every `advance`. After
    /// swapping:
    /// - `iter()` returns events from the advance that just finished
    /// - `push()` writes to the new pending queue
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.pending, &mut self.processing);
        self.pending.clear();
    }

    /// Iterate over events from the last finished advance.
    ///
    /// Returns an iterator over references to events. The events remain
    /// in the queue until the next `swap()` call.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FlightEvent> {
        self.processing.iter()
    }

    /// Drain all events from the last finished advance.
    ///
    /// Similar to `iter()` but takes ownership of the events.
    #[inline]
    pub fn drain(&mut self) -> impl Iterator<Item = FlightEvent> + '_ {
        self.processing.drain(..)
    }

    /// Check if there are any pending events to process.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processing.is_empty()
    }

    /// Get the number of events ready for processing.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.processing.len()
    }

    /// Get the number of events pending for the next swap.
    #[must_use]
    #[inline]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Clear all events (both pending and processing).
    pub fn clear(&mut self) {
        self.pending.clear();
        self.processing.clear();
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_entity() -> Entity {
        let mut world = hecs::World::new();
        world.spawn(())
    }

    fn state_change(entity: Entity) -> FlightEvent {
        FlightEvent::StateChanged {
            entity,
            from: BehaviorState::Patrol,
            to: BehaviorState::Engage,
        }
    }

    #[test]
    fn test_event_queue_push_and_swap() {
        let mut queue = EventQueue::new();
        let entity = test_entity();

        queue.push(state_change(entity));
        assert!(queue.is_empty(), "Events should not be visible before swap");

        queue.swap();
        assert_eq!(queue.len(), 1);
        let events: Vec<_> = queue.iter().collect();
        assert!(matches!(
            events[0],
            FlightEvent::StateChanged { to: BehaviorState::Engage, .. }
        ));
    }

    #[test]
    fn test_event_queue_double_buffer_isolation() {
        let mut queue = EventQueue::new();
        let entity = test_entity();

        queue.push(state_change(entity));
        queue.swap();
        queue.push(FlightEvent::AvoidanceCleared { entity });

        let events: Vec<_> = queue.iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], FlightEvent::StateChanged { .. }));

        queue.swap();
        let events: Vec<_> = queue.iter().collect();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], FlightEvent::AvoidanceCleared { .. }));
    }

    #[test]
    fn test_event_queue_drain_and_clear() {
        let mut queue = EventQueue::new();
        let entity = test_entity();

        queue.push(state_change(entity));
        queue.push(FlightEvent::Removed { entity });
        queue.swap();
        let events: Vec<_> = queue.drain().collect();
        assert_eq!(events.len(), 2);
        assert!(queue.is_empty());

        queue.push(FlightEvent::Removed { entity });
        queue.clear();
        assert_eq!(queue.pending_count(), 0);
    }

    #[test]
    fn test_event_entity_accessor() {
        let pilot = test_entity();
        let bandit = test_entity();
        let event = FlightEvent::TargetAcquired {
            entity: pilot,
            target: bandit,
        };
        assert_eq!(event.entity(), pilot);
    }
}
