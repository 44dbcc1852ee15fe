//! Domain types for cross-chain ticketing.
//!
//! Identifiers, ticket tiers, and the `Event` and `Ticket` records owned by
//! the registry and the issuer.

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tickbridge_core::chain::{Address, Amount, ChainSelector};

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of an event: the chain that created it plus that chain's
/// sequence number, carried unchanged into every mirror
///
/// Every chain numbers its own events from 1, so the sequence alone is only
/// unique per origin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId {
    origin: ChainSelector,
    sequence: u64,
}

impl EventId {
    /// Creates the `EventId` numbered `sequence` on `origin`
    #[must_use]
    pub const fn new(origin: ChainSelector, sequence: u64) -> Self {
        Self { origin, sequence }
    }

    /// Chain that created the event
    #[must_use]
    pub const fn origin(self) -> ChainSelector {
        self.origin
    }

    /// Number assigned by the origin chain, starting at 1
    #[must_use]
    pub const fn sequence(self) -> u64 {
        self.sequence
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin.network_name() {
            Some(name) => write!(f, "{name}#{}", self.sequence),
            None => write!(f, "{}#{}", self.origin.value(), self.sequence),
        }
    }
}

/// Identifier of a ticket, unique on its mint chain
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TicketId(u64);

impl TicketId {
    /// Creates a `TicketId` from its raw value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Tier
// ============================================================================

/// Ticket tier label
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tier {
    /// General admission
    #[default]
    General,
    /// VIP
    Vip,
}

impl Tier {
    /// Label as written by callers
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "General",
            Self::Vip => "VIP",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label.eq_ignore_ascii_case("general") {
            Ok(Self::General)
        } else if label.eq_ignore_ascii_case("vip") {
            Ok(Self::Vip)
        } else {
            Err(ValidationError::UnknownTier(s.to_string()))
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// An event as known on one chain
///
/// On the origin chain this is the authoritative record; on every other
/// chain it is a mirror, written only by inbound messages. Presence is the
/// registry entry itself: a lookup either finds an `Event` or reports
/// not-found, there is no default-valued placeholder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event id; its origin is always `origin_chain`
    pub id: EventId,
    /// Account that created the event
    pub organizer: Address,
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Price of one ticket
    pub ticket_price: Amount,
    /// Capacity
    pub total_tickets: u32,
    /// Tickets sold so far, as known on this chain
    pub sold_tickets: u32,
    /// Whether tickets can be bought on this chain
    pub is_active: bool,
    /// Chain that created the event and assigned its id
    pub origin_chain: ChainSelector,
    /// Chain holding canonical ticket ownership
    pub mint_chain: ChainSelector,
    /// Creation time on the origin chain (millisecond precision)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Tickets still available
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.total_tickets.saturating_sub(self.sold_tickets)
    }

    /// True when no ticket is left
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.sold_tickets >= self.total_tickets
    }
}

/// Arguments of event creation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Display name
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Price of one ticket
    pub ticket_price: Amount,
    /// Capacity
    pub total_tickets: u32,
    /// Mint chain; the chain's configured default when `None`
    pub mint_chain: Option<ChainSelector>,
}

impl NewEvent {
    /// Event minted on the chain's default mint chain
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        ticket_price: Amount,
        total_tickets: u32,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ticket_price,
            total_tickets,
            mint_chain: None,
        }
    }

    /// Mint tickets on `chain`
    #[must_use]
    pub fn minted_on(mut self, chain: ChainSelector) -> Self {
        self.mint_chain = Some(chain);
        self
    }
}

/// A minted ticket
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Ticket id
    pub id: TicketId,
    /// Event the ticket admits to
    pub event_id: EventId,
    /// Current holder
    pub owner: Address,
    /// Tier label
    pub tier: Tier,
    /// Chain the ticket was minted on
    pub mint_chain: ChainSelector,
    /// Mint time
    pub purchased_at: DateTime<Utc>,
}
