//! # Tickbridge Runtime
//!
//! Runtime pieces that turn a pure chain reducer into a running chain.
//!
//! ## Core Components
//!
//! - **Store**: owns one chain's state and executes transactions strictly
//!   serially (one write lock around every reduce)
//! - **`LocalRelay`**: an in-process [`Transport`](tickbridge_core::transport::Transport)
//!   with at-least-once, possibly reordered delivery
//! - **`TracingEventBus`**: publishes domain events to the log
//!
//! ## Example
//!
//! ```ignore
//! use tickbridge_runtime::Store;
//!
//! let store = Store::new(initial_state, ChainReducer::new(), environment);
//!
//! // Run a transaction; Ok carries the domain events it published
//! let published = store.send(ChainAction::FundTreasury { from, amount }).await?;
//!
//! // Read state
//! let balance = store.state(|s| s.treasury.balance()).await;
//! ```

use std::fmt::{Debug, Display};
use std::marker::PhantomData;
use std::sync::Arc;
use tickbridge_core::event_bus::{EventBus, EventBusError};
use tickbridge_core::{effect::Effect, reducer::Reducer};
use tokio::sync::RwLock;

/// Runtime metric names and registration
pub mod metrics;

/// In-process relay between chain stores
pub mod relay;

pub use relay::{DeliveryOrder, FlushReport, Inbox, LocalRelay};

/// Serial transaction executor for one chain
///
/// The Store manages:
/// 1. State (behind a `RwLock`; every transaction holds the write lock)
/// 2. Reducer (business logic)
/// 3. Environment (injected dependencies)
/// 4. Effect execution, after the transaction has committed
pub struct Store<R>
where
    R: Reducer,
{
    state: Arc<RwLock<R::State>>,
    reducer: R,
    environment: R::Environment,
}

impl<R> Store<R>
where
    R: Reducer + Send + Sync,
    R::State: Send + Sync,
    R::Action: Debug + Send,
    R::Environment: Send + Sync,
    R::Error: Display,
{
    /// Create a new store with initial state, reducer, and environment
    #[must_use]
    pub fn new(initial_state: R::State, reducer: R, environment: R::Environment) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial_state)),
            reducer,
            environment,
        }
    }

    /// Run one transaction
    ///
    /// The reduce happens under the write lock, so no two transactions on
    /// this chain ever interleave. Effects run after the lock is released.
    ///
    /// # Returns
    ///
    /// The domain events the transaction published, in order.
    ///
    /// # Errors
    ///
    /// Returns the reducer's error if the action was refused. State is
    /// unchanged and no effect runs in that case.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: R::Action) -> Result<Vec<R::Action>, R::Error> {
        let effects = {
            let mut state = self.state.write().await;
            match self.reducer.reduce(&mut state, action, &self.environment) {
                Ok(effects) => {
                    metrics::record_action("committed");
                    effects
                },
                Err(error) => {
                    metrics::record_action("rejected");
                    tracing::debug!(%error, "transaction rejected");
                    return Err(error);
                },
            }
        };

        Ok(Self::execute_effects(effects))
    }

    fn execute_effects(effects: impl IntoIterator<Item = Effect<R::Action>>) -> Vec<R::Action> {
        let mut published = Vec::new();

        for effect in effects {
            metrics::record_effect(effect.kind());
            match effect {
                Effect::None => {},
                Effect::Publish { bus, event } => {
                    if let Err(error) = bus.publish(&event) {
                        tracing::warn!(%error, ?event, "failed to publish domain event");
                    }
                    published.push(event);
                },
                Effect::Relay {
                    transport,
                    envelope,
                } => {
                    let id = envelope.id();
                    let kind = envelope.kind;
                    match transport.submit(envelope) {
                        Ok(()) => tracing::debug!(message_id = %id, %kind, "envelope handed to transport"),
                        Err(error) => {
                            tracing::error!(message_id = %id, %kind, %error, "transport refused envelope");
                        },
                    }
                },
            }
        }

        published
    }

    /// Read state with a closure
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&R::State) -> T,
    {
        let state = self.state.read().await;
        f(&*state)
    }

    /// The injected environment
    #[must_use]
    pub const fn environment(&self) -> &R::Environment {
        &self.environment
    }
}

/// Event bus that writes each domain event to the `tracing` log
pub struct TracingEventBus<E> {
    chain: String,
    _event: PhantomData<fn(&E)>,
}

impl<E> TracingEventBus<E> {
    /// Create a bus that tags every event with `chain`
    #[must_use]
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            _event: PhantomData,
        }
    }
}

impl<E: Debug> EventBus<E> for TracingEventBus<E> {
    fn publish(&self, event: &E) -> Result<(), EventBusError> {
        tracing::info!(chain = %self.chain, ?event, "domain event");
        Ok(())
    }
}
