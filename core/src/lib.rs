//! # Tickbridge Core
//!
//! Chain primitives and the reducer abstractions that every Tickbridge chain
//! state machine is built on.
//!
//! ## Core Concepts
//!
//! - **State**: everything one chain knows (events, tickets, treasury, nonces)
//! - **Action**: all inputs to a chain (commands, inbound messages, domain events)
//! - **Reducer**: `(State, Action, Environment) → Result<Effects, Error>`
//! - **Effect**: description of work to do after the transaction commits
//!   (publish a domain event, relay an envelope to another chain)
//! - **Environment**: injected dependencies (clock, transport, event bus)
//!
//! A reducer either fails without touching state, or mutates state and returns
//! effects. The runtime executes one reduce at a time per chain, which is what
//! makes check-then-mutate sequences atomic.
//!
//! ## Example
//!
//! ```ignore
//! use tickbridge_core::{effect::Effect, reducer::Reducer, SmallVec};
//!
//! impl Reducer for ChainReducer {
//!     type State = ChainState;
//!     type Action = ChainAction;
//!     type Environment = ChainEnvironment;
//!     type Error = TicketingError;
//!
//!     fn reduce(
//!         &self,
//!         state: &mut ChainState,
//!         action: ChainAction,
//!         env: &ChainEnvironment,
//!     ) -> Result<SmallVec<[Effect<ChainAction>; 4]>, TicketingError> {
//!         // validate, apply events, describe effects
//!         Ok(SmallVec::new())
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

/// Chain selectors, account addresses and native amounts
pub mod chain;

/// Payload encoding for cross-chain messages
pub mod codec;

/// Domain event publication seam
pub mod event_bus;

/// Cross-chain envelope and message identifiers
pub mod message;

/// Outbound message transport seam
pub mod transport;

/// Reducer module - the core trait for chain business logic
///
/// Reducers are pure functions: `(State, Action, Environment) → Result<Effects, Error>`.
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The chain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    /// - `Error`: The rejection type returned when an action is refused
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Why an action was refused
        type Error;

        /// Reduce an action into state changes and effects
        ///
        /// This is a pure function that:
        /// 1. Validates the action against the current state
        /// 2. Updates state in place (only if validation passed)
        /// 3. Returns effect descriptions to be executed
        ///
        /// # Errors
        ///
        /// Returns `Self::Error` when the action is refused. Implementations
        /// must leave `state` untouched in that case.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects describe work to be performed by the runtime once a transaction
/// has committed. They are values (not execution) and carry the handles they
/// need, so the runtime stays generic over the domain.
pub mod effect {
    use crate::event_bus::EventBus;
    use crate::message::Envelope;
    use crate::transport::Transport;
    use std::sync::Arc;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type whose event variants can be published
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Publish a domain event for external indexers
        Publish {
            /// Bus to publish on
            bus: Arc<dyn EventBus<Action>>,
            /// The event (an event variant of the action type)
            event: Action,
        },

        /// Hand an envelope to the cross-chain transport (fire-and-forget)
        Relay {
            /// Transport to submit to
            transport: Arc<dyn Transport>,
            /// The outbound envelope, fee already paid
            envelope: Envelope,
        },
    }

    // Manual Debug implementation since the trait objects don't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Publish { event, .. } => {
                    f.debug_struct("Effect::Publish").field("event", event).finish()
                },
                Effect::Relay { envelope, .. } => f
                    .debug_struct("Effect::Relay")
                    .field("envelope", envelope)
                    .finish(),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Build a publish effect
        #[must_use]
        pub fn publish(bus: &Arc<dyn EventBus<Action>>, event: Action) -> Self {
            Effect::Publish {
                bus: Arc::clone(bus),
                event,
            }
        }

        /// Build a relay effect
        #[must_use]
        pub fn relay(transport: &Arc<dyn Transport>, envelope: Envelope) -> Self {
            Effect::Relay {
                transport: Arc::clone(transport),
                envelope,
            }
        }

        /// Short label used for logging and metrics
        #[must_use]
        pub const fn kind(&self) -> &'static str {
            match self {
                Effect::None => "none",
                Effect::Publish { .. } => "publish",
                Effect::Relay { .. } => "relay",
            }
        }

        /// The published event, if this is a publish effect
        #[must_use]
        pub const fn as_published(&self) -> Option<&Action> {
            match self {
                Effect::Publish { event, .. } => Some(event),
                _ => None,
            }
        }

        /// The relayed envelope, if this is a relay effect
        #[must_use]
        pub const fn as_relayed(&self) -> Option<&Envelope> {
            match self {
                Effect::Relay { envelope, .. } => Some(envelope),
                _ => None,
            }
        }
    }
}

/// Environment module - dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall-clock time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::effect::Effect;

    #[test]
    fn effect_kind_labels() {
        let none: Effect<()> = Effect::None;
        assert_eq!(none.kind(), "none");
        assert!(none.as_published().is_none());
        assert!(none.as_relayed().is_none());
    }
}
