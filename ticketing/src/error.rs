//! Error taxonomy for chain operations.
//!
//! Every refusal is a distinct variant so callers can branch on cause.
//! Duplicate deliveries and duplicate mirrors are not errors; they are
//! absorbed as no-ops.

use crate::types::EventId;
use thiserror::Error;
use tickbridge_core::chain::{Address, Amount, ChainSelector};
use tickbridge_core::codec::CodecError;

/// Malformed arguments
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Ticket price must be positive
    #[error("ticket price must be greater than zero")]
    ZeroPrice,

    /// Capacity must be positive
    #[error("total tickets must be greater than zero")]
    ZeroCapacity,

    /// Event name must not be blank
    #[error("event name must not be empty")]
    EmptyName,

    /// Tier label not recognized
    #[error("unknown ticket tier: {0:?}")]
    UnknownTier(String),
}

/// The operation does not fit the current state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// No event with this id on this chain
    #[error("event {0} not found")]
    EventNotFound(EventId),

    /// Event exists but is deactivated
    #[error("event {0} is not active")]
    EventNotActive(EventId),

    /// Event is at capacity
    #[error("event {0} is sold out")]
    EventSoldOut(EventId),

    /// Buyer already holds a ticket for this event
    #[error("{buyer} already holds a ticket for event {event_id}")]
    DuplicateTicket {
        /// Event
        event_id: EventId,
        /// Buyer
        buyer: Address,
    },
}

/// Not enough funds
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FundingError {
    /// Caller did not pay enough
    #[error("insufficient payment: required {required}, provided {provided}")]
    InsufficientPayment {
        /// Amount required
        required: Amount,
        /// Amount supplied
        provided: Amount,
    },

    /// Treasury cannot cover an outbound message fee
    #[error("insufficient treasury balance: required {required}, available {available}")]
    InsufficientTreasuryBalance {
        /// Fee to pay
        required: Amount,
        /// Funds available to pay it
        available: Amount,
    },
}

/// Cross-chain message refused
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Chain is not on the allowlist
    #[error("chain {0} is not supported")]
    UnsupportedChain(ChainSelector),

    /// Sender is not the trusted address configured for its chain
    #[error("untrusted sender {sender} for chain {chain}")]
    UntrustedSender {
        /// Source chain
        chain: ChainSelector,
        /// Claimed sender
        sender: Address,
    },

    /// Envelope addressed to a different chain
    #[error("message for chain {actual} delivered to chain {expected}")]
    MisroutedMessage {
        /// This chain
        expected: ChainSelector,
        /// The envelope's destination
        actual: ChainSelector,
    },

    /// Payload bytes do not decode as the declared kind
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

impl From<CodecError> for TransportError {
    fn from(error: CodecError) -> Self {
        Self::MalformedPayload(error.to_string())
    }
}

/// Caller lacks the required role
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// Owner-only operation
    #[error("{0} is not the owner")]
    NotOwner(Address),

    /// Owner-or-organizer operation
    #[error("{caller} is neither the owner nor the organizer of event {event_id}")]
    NotOrganizer {
        /// Caller
        caller: Address,
        /// Event
        event_id: EventId,
    },
}

/// Class of a [`TicketingError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// [`ValidationError`]
    Validation,
    /// [`StateError`]
    State,
    /// [`FundingError`]
    Funding,
    /// [`TransportError`]
    Transport,
    /// [`AuthorizationError`]
    Authorization,
}

/// Any refusal of a chain operation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TicketingError {
    /// Malformed arguments
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// State precondition failed
    #[error(transparent)]
    State(#[from] StateError),

    /// Not enough funds
    #[error(transparent)]
    Funding(#[from] FundingError),

    /// Cross-chain message refused
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Caller lacks the required role
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),
}

impl TicketingError {
    /// Error class
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::State(_) => ErrorKind::State,
            Self::Funding(_) => ErrorKind::Funding,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Authorization(_) => ErrorKind::Authorization,
        }
    }

    /// Short label for logs and metrics
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::State(_) => "state",
            Self::Funding(_) => "funding",
            Self::Transport(_) => "transport",
            Self::Authorization(_) => "authorization",
        }
    }
}

impl From<CodecError> for TicketingError {
    fn from(error: CodecError) -> Self {
        Self::Transport(error.into())
    }
}

/// Result alias for chain operations
pub type Result<T> = std::result::Result<T, TicketingError>;
