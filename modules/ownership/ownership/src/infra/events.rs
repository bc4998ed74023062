//! Event publishers for ownership domain events.

use ownership_sdk::OwnershipEvent;
use parking_lot::Mutex;
use tracing::info;

use crate::domain::ports::EventPublisher;

/// Writes every event to the `ownership::events` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventPublisher;

impl EventPublisher<OwnershipEvent> for TracingEventPublisher {
    fn publish(&self, event: &OwnershipEvent) {
        match event {
            OwnershipEvent::Created { resource, record } => info!(
                target: "ownership::events",
                event = event.name(),
                resource = %resource,
                owner = %record.owner,
                role = ?record.role,
            ),
            OwnershipEvent::Updated { resource, delta } => info!(
                target: "ownership::events",
                event = event.name(),
                resource = %resource,
                owner = ?delta.owner.as_ref().map(ToString::to_string),
                role = ?delta.role,
            ),
            OwnershipEvent::Deleted { resource, removed } => info!(
                target: "ownership::events",
                event = event.name(),
                resource = %resource,
                removed = ?removed.as_ref().map(ToString::to_string),
            ),
            OwnershipEvent::Transferred { resource, from, to } => info!(
                target: "ownership::events",
                event = event.name(),
                resource = %resource,
                from = %from,
                to = %to,
            ),
        }
    }
}

/// Keeps published events in memory until drained.
#[derive(Debug, Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<OwnershipEvent>>,
}

impl RecordingEventPublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events published so far, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<OwnershipEvent> {
        self.events.lock().clone()
    }

    /// Remove and return the events published so far.
    pub fn drain(&self) -> Vec<OwnershipEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(OwnershipEvent::name).collect()
    }
}

impl EventPublisher<OwnershipEvent> for RecordingEventPublisher {
    fn publish(&self, event: &OwnershipEvent) {
        self.events.lock().push(event.clone());
    }
}
