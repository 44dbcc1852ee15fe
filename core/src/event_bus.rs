//! Domain event publication.
//!
//! Every committed chain transaction publishes the domain events it produced
//! (`EventCreated`, `TicketPurchased`, ...) so off-chain indexers and
//! scripts can follow along without reading chain state.
//!
//! # Key Principles
//!
//! - **Publish after commit**: events are published by the runtime once the
//!   transaction has been applied, never from inside a reducer
//! - **Best effort**: a failed publish is logged; chain state is already final
//!
//! # Implementations
//!
//! - `InMemoryEventBus` in `tickbridge-testing` - captures events for assertions
//! - `TracingEventBus` in `tickbridge-runtime` - writes events to the log

use thiserror::Error;

/// Errors that can occur while publishing a domain event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventBusError {
    /// The subscriber side is gone
    #[error("event bus closed")]
    Closed,

    /// Publishing failed for another reason
    #[error("publish failed: {0}")]
    PublishFailed(String),
}

/// Sink for domain events emitted by a chain.
pub trait EventBus<E>: Send + Sync {
    /// Publish one event
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError`] if the event could not be delivered to the sink.
    fn publish(&self, event: &E) -> Result<(), EventBusError>;
}
