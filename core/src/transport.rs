//! Outbound message transport.
//!
//! The transport is the external relay between chains. From the sender's
//! side it is fire-and-forget: `submit` only hands the envelope over. The
//! transport may later deliver it zero, one or several times and in any
//! order; retries are its own business.

use crate::message::{Envelope, MessageId};
use thiserror::Error;

/// Errors a transport can report at submission time.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// The relay is shut down
    #[error("relay closed, message {0} not accepted")]
    Closed(MessageId),

    /// No route to the destination chain
    #[error("no route for message {0}")]
    NoRoute(MessageId),
}

/// Hands outbound envelopes to the cross-chain relay.
pub trait Transport: Send + Sync {
    /// Submit an envelope whose fee has already been paid
    ///
    /// # Errors
    ///
    /// Returns [`RelayError`] if the relay refuses the envelope outright.
    fn submit(&self, envelope: Envelope) -> Result<(), RelayError>;
}
