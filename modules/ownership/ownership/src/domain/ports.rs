//! Output ports of the ownership domain.

/// Output port for publishing domain events.
pub trait EventPublisher<E>: Send + Sync + 'static {
    fn publish(&self, event: &E);
}
