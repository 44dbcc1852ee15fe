//! # Tickbridge Testing
//!
//! Testing utilities and helpers for Tickbridge chains.
//!
//! This crate provides:
//! - Mock implementations of the environment seams (clock, transport, event bus)
//! - A Given-When-Then builder for reducers
//! - Property-based testing strategies for chain primitives
//!
//! ## Example
//!
//! ```ignore
//! use tickbridge_testing::{mocks::RecordingTransport, test_clock};
//!
//! #[tokio::test]
//! async fn create_event_mirrors_to_peer() {
//!     let transport = Arc::new(RecordingTransport::new());
//!     let node = ChainNode::new(config, test_clock(), transport.clone(), bus);
//!
//!     node.create_event(owner, "Concert", Amount::milli_ether(10), 100, None).await?;
//!
//!     assert_eq!(transport.envelopes().len(), 1);
//! }
//! ```

use chrono::{DateTime, Utc};
use tickbridge_core::environment::Clock;

/// Reducer test builder and effect assertions
pub mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Mutex, PoisonError};
    use tickbridge_core::event_bus::{EventBus, EventBusError};
    use tickbridge_core::message::Envelope;
    use tickbridge_core::transport::{RelayError, Transport};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use tickbridge_testing::mocks::FixedClock;
    /// use tickbridge_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Transport that records every submitted envelope and delivers nothing
    ///
    /// Useful for asserting what a chain sent without wiring up a relay.
    #[derive(Debug, Default)]
    pub struct RecordingTransport {
        submitted: Mutex<Vec<Envelope>>,
    }

    impl RecordingTransport {
        /// Create an empty recorder
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of everything submitted so far, in order
        #[must_use]
        pub fn envelopes(&self) -> Vec<Envelope> {
            self.submitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Remove and return everything submitted so far
        #[must_use]
        pub fn drain(&self) -> Vec<Envelope> {
            std::mem::take(&mut *self.submitted.lock().unwrap_or_else(PoisonError::into_inner))
        }
    }

    impl Transport for RecordingTransport {
        fn submit(&self, envelope: Envelope) -> Result<(), RelayError> {
            self.submitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(envelope);
            Ok(())
        }
    }

    /// Event bus that keeps published events in memory
    #[derive(Debug)]
    pub struct InMemoryEventBus<E> {
        events: Mutex<Vec<E>>,
    }

    impl<E> Default for InMemoryEventBus<E> {
        fn default() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    impl<E: Clone> InMemoryEventBus<E> {
        /// Create an empty bus
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Snapshot of published events, in order
        #[must_use]
        pub fn events(&self) -> Vec<E> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl<E: Clone + Send> EventBus<E> for InMemoryEventBus<E> {
        fn publish(&self, event: &E) -> Result<(), EventBusError> {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
            Ok(())
        }
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use tickbridge_core::chain::{Address, Amount, ChainSelector};

    /// One of the well-known testnet selectors
    pub fn known_chain() -> impl Strategy<Value = ChainSelector> {
        prop_oneof![
            Just(ChainSelector::SEPOLIA),
            Just(ChainSelector::FUJI),
            Just(ChainSelector::AMOY),
        ]
    }

    /// Any selector, known or not
    pub fn any_chain() -> impl Strategy<Value = ChainSelector> {
        prop_oneof![known_chain(), any::<u64>().prop_map(ChainSelector::new)]
    }

    /// A non-zero account address
    pub fn account() -> impl Strategy<Value = Address> {
        (1..=u64::MAX).prop_map(Address::from_low_u64)
    }

    /// A small account pool, so generated buyers collide often
    pub fn pooled_account(pool: u64) -> impl Strategy<Value = Address> {
        (1..=pool.max(1)).prop_map(Address::from_low_u64)
    }

    /// Amount between `0.001` and `max_milli / 1000` of the native currency
    pub fn milli_amount(max_milli: u128) -> impl Strategy<Value = Amount> {
        (1..=max_milli.max(1)).prop_map(Amount::milli_ether)
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, InMemoryEventBus, RecordingTransport, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use tickbridge_core::chain::{Address, Amount, ChainSelector};
    use tickbridge_core::event_bus::EventBus;
    use tickbridge_core::message::{Envelope, PayloadKind};
    use tickbridge_core::transport::Transport;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn recording_transport_keeps_submission_order() {
        let transport = RecordingTransport::new();
        for nonce in [1, 2] {
            let submitted = transport.submit(Envelope {
                source: ChainSelector::SEPOLIA,
                dest: ChainSelector::FUJI,
                sender: Address::from_low_u64(1),
                receiver: Address::from_low_u64(1),
                kind: PayloadKind::EventMirror,
                payload: vec![],
                nonce,
                fee_paid: Amount::ZERO,
            });
            assert!(submitted.is_ok());
        }

        let nonces: Vec<u64> = transport.drain().iter().map(|e| e.nonce).collect();
        assert_eq!(nonces, vec![1, 2]);
        assert!(transport.envelopes().is_empty());
    }

    #[test]
    fn in_memory_bus_captures_events() {
        let bus = InMemoryEventBus::<u32>::new();
        assert!(bus.publish(&7).is_ok());
        assert_eq!(bus.events(), vec![7]);
    }
}
