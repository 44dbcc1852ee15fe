//! Cross-chain envelope and message identifiers.
//!
//! An [`Envelope`] is the unit the transport carries. It is created once at
//! send time; the transport may deliver it zero, one or many times, in any
//! order relative to other envelopes. Receivers de-duplicate on
//! `(source, nonce)`.

use crate::chain::{Address, Amount, ChainSelector};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an envelope's payload bytes encode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PayloadKind {
    /// Replica of an event created on its origin chain
    EventMirror,
    /// Sale on the mint chain, reported back to the origin chain
    TicketSoldNotice,
    /// Purchase made on a non-mint chain, forwarded to the mint chain
    PurchaseIntent,
}

impl PayloadKind {
    /// Stable label for logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EventMirror => "event_mirror",
            Self::TicketSoldNotice => "ticket_sold_notice",
            Self::PurchaseIntent => "purchase_intent",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque identifier returned by a send
///
/// Unique because nonces are monotonic per `(source, dest)` pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId {
    /// Sending chain
    pub source: ChainSelector,
    /// Receiving chain
    pub dest: ChainSelector,
    /// Per-pair sequence number
    pub nonce: u64,
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.source.value(),
            self.dest.value(),
            self.nonce
        )
    }
}

/// A message in flight between two chains
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Chain the message was sent from
    pub source: ChainSelector,
    /// Chain the message is addressed to
    pub dest: ChainSelector,
    /// Contract that sent the message (checked against the trusted sender)
    pub sender: Address,
    /// Contract the message is addressed to on `dest`
    pub receiver: Address,
    /// How to decode `payload`
    pub kind: PayloadKind,
    /// Encoded payload
    pub payload: Vec<u8>,
    /// Per `(source, dest)` sequence number, used for de-duplication
    pub nonce: u64,
    /// Fee debited from the sender's treasury for this message
    pub fee_paid: Amount,
}

impl Envelope {
    /// Identifier of this message
    #[must_use]
    pub const fn id(&self) -> MessageId {
        MessageId {
            source: self.source,
            dest: self.dest,
            nonce: self.nonce,
        }
    }
}
