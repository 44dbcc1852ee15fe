//! In-process relay between chain stores.
//!
//! [`LocalRelay`] stands in for the external messaging network. Submitted
//! envelopes are queued; [`LocalRelay::flush_with`] delivers them in FIFO,
//! reversed or shuffled order and can deliver every envelope more than once,
//! which is exactly the misbehaviour receivers have to tolerate.

use crate::metrics;
use async_trait::async_trait;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tickbridge_core::chain::ChainSelector;
use tickbridge_core::message::Envelope;
use tickbridge_core::transport::{RelayError, Transport};

/// Upper bound on delivery rounds per flush (a round delivers everything
/// queued at its start; deliveries may queue follow-up messages)
const MAX_FLUSH_ROUNDS: usize = 1_000;

/// Receiving end of a chain
#[async_trait]
pub trait Inbox: Send + Sync {
    /// Apply one inbound envelope
    ///
    /// # Errors
    ///
    /// Returns an error if the receiving chain refused the envelope.
    async fn deliver(&self, envelope: Envelope) -> anyhow::Result<()>;
}

/// Order in which a flush round delivers queued envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryOrder {
    /// Submission order
    #[default]
    Fifo,
    /// Reverse submission order
    Reverse,
    /// Deterministic shuffle
    Shuffled {
        /// RNG seed
        seed: u64,
    },
}

/// Outcome of a flush
#[derive(Debug, Default)]
pub struct FlushReport {
    /// Successful deliveries (duplicates counted individually)
    pub delivered: usize,
    /// Deliveries the receiving chain refused, with its reason
    pub failed: Vec<(Envelope, String)>,
    /// Envelopes whose destination has no registered inbox
    pub unroutable: Vec<Envelope>,
}

impl FlushReport {
    /// True when every delivery was applied
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.unroutable.is_empty()
    }
}

/// Queue-backed transport connecting chains in one process
#[derive(Default)]
pub struct LocalRelay {
    pending: Mutex<VecDeque<Envelope>>,
    inboxes: RwLock<HashMap<ChainSelector, Arc<dyn Inbox>>>,
    closed: AtomicBool,
}

impl LocalRelay {
    /// Create an empty relay
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route envelopes addressed to `chain` to `inbox`
    pub fn register(&self, chain: ChainSelector, inbox: Arc<dyn Inbox>) {
        self.inboxes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chain, inbox);
    }

    /// Number of queued envelopes
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.lock_pending().len()
    }

    /// Remove and return everything queued, in submission order
    #[must_use]
    pub fn take_pending(&self) -> Vec<Envelope> {
        self.lock_pending().drain(..).collect()
    }

    /// Put an envelope (back) on the queue, e.g. to simulate a redelivery
    pub fn inject(&self, envelope: Envelope) {
        self.lock_pending().push_back(envelope);
    }

    /// Stop accepting new envelopes
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Deliver one envelope to its destination inbox
    ///
    /// # Errors
    ///
    /// Returns an error if no inbox is registered for the destination or the
    /// destination refused the envelope.
    pub async fn deliver(&self, envelope: Envelope) -> anyhow::Result<()> {
        let inbox = self.inbox_for(envelope.dest).ok_or_else(|| {
            anyhow::anyhow!("no inbox registered for chain {}", envelope.dest)
        })?;
        inbox.deliver(envelope).await
    }

    /// Deliver everything queued, in submission order, exactly once each
    pub async fn flush(&self) -> FlushReport {
        self.flush_with(DeliveryOrder::Fifo, 1).await
    }

    /// Deliver everything queued, including envelopes queued by the
    /// deliveries themselves
    ///
    /// Each envelope is delivered `copies` times (at least once).
    pub async fn flush_with(&self, order: DeliveryOrder, copies: usize) -> FlushReport {
        let mut report = FlushReport::default();
        let copies = copies.max(1);

        for round in 0..MAX_FLUSH_ROUNDS {
            let mut batch = self.take_pending();
            if batch.is_empty() {
                return report;
            }

            match order {
                DeliveryOrder::Fifo => {},
                DeliveryOrder::Reverse => batch.reverse(),
                DeliveryOrder::Shuffled { seed } => {
                    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(round as u64));
                    batch.shuffle(&mut rng);
                },
            }

            for envelope in batch {
                self.deliver_copies(envelope, copies, &mut report).await;
            }
        }

        tracing::warn!(
            rounds = MAX_FLUSH_ROUNDS,
            remaining = self.pending_len(),
            "relay flush stopped before the queue drained"
        );
        report
    }

    async fn deliver_copies(&self, envelope: Envelope, copies: usize, report: &mut FlushReport) {
        let Some(inbox) = self.inbox_for(envelope.dest) else {
            metrics::record_delivery("unroutable");
            tracing::warn!(message_id = %envelope.id(), "no inbox for destination, dropping");
            report.unroutable.push(envelope);
            return;
        };

        for _ in 0..copies {
            match inbox.deliver(envelope.clone()).await {
                Ok(()) => {
                    metrics::record_delivery("applied");
                    report.delivered += 1;
                },
                Err(error) => {
                    metrics::record_delivery("failed");
                    tracing::warn!(message_id = %envelope.id(), %error, "delivery refused");
                    report.failed.push((envelope.clone(), error.to_string()));
                },
            }
        }
    }

    fn inbox_for(&self, chain: ChainSelector) -> Option<Arc<dyn Inbox>> {
        self.inboxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&chain)
            .cloned()
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, VecDeque<Envelope>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for LocalRelay {
    fn submit(&self, envelope: Envelope) -> Result<(), RelayError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RelayError::Closed(envelope.id()));
        }
        if self.inbox_for(envelope.dest).is_none() {
            return Err(RelayError::NoRoute(envelope.id()));
        }
        self.lock_pending().push_back(envelope);
        Ok(())
    }
}
