//! Ticket minting and ownership.
//!
//! Tickets only exist on an event's mint chain. The issuer enforces one
//! ticket per `(event, buyer)` pair and answers ownership queries.

use crate::error::{FundingError, StateError, TicketingError};
use crate::types::{Event, EventId, Ticket, TicketId};
use std::collections::{BTreeMap, HashMap, HashSet};
use tickbridge_core::chain::{Address, Amount};

/// Tickets minted on one chain
#[derive(Clone, Debug, Default)]
pub struct TicketIssuer {
    tickets: BTreeMap<TicketId, Ticket>,
    holders: HashSet<(EventId, Address)>,
    by_owner: HashMap<Address, Vec<TicketId>>,
    last_id: u64,
}

impl TicketIssuer {
    /// Empty issuer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next minted ticket will get
    #[must_use]
    pub const fn next_id(&self) -> TicketId {
        TicketId::new(self.last_id.saturating_add(1))
    }

    /// Whether `buyer` holds a ticket for `event_id`
    #[must_use]
    pub fn has_ticket_for_event(&self, event_id: EventId, buyer: Address) -> bool {
        self.holders.contains(&(event_id, buyer))
    }

    /// Checks a purchase must pass wherever it is made, in order: active,
    /// not sold out, paid enough
    ///
    /// # Errors
    ///
    /// [`StateError::EventNotActive`], [`StateError::EventSoldOut`] or
    /// [`FundingError::InsufficientPayment`].
    pub fn check_sale_terms(event: &Event, payment: Amount) -> Result<(), TicketingError> {
        if !event.is_active {
            return Err(StateError::EventNotActive(event.id).into());
        }
        if event.is_sold_out() {
            return Err(StateError::EventSoldOut(event.id).into());
        }
        if payment < event.ticket_price {
            return Err(FundingError::InsufficientPayment {
                required: event.ticket_price,
                provided: payment,
            }
            .into());
        }
        Ok(())
    }

    /// Full check for minting a ticket here: sale terms, then one ticket
    /// per buyer
    ///
    /// # Errors
    ///
    /// Anything [`Self::check_sale_terms`] returns, then
    /// [`StateError::DuplicateTicket`].
    pub fn check_purchase(
        &self,
        event: &Event,
        buyer: Address,
        payment: Amount,
    ) -> Result<(), TicketingError> {
        Self::check_sale_terms(event, payment)?;
        if self.has_ticket_for_event(event.id, buyer) {
            return Err(StateError::DuplicateTicket {
                event_id: event.id,
                buyer,
            }
            .into());
        }
        Ok(())
    }

    /// Record a minted ticket
    pub fn mint(&mut self, ticket: Ticket) {
        self.last_id = self.last_id.max(ticket.id.value());
        self.holders.insert((ticket.event_id, ticket.owner));
        self.by_owner.entry(ticket.owner).or_default().push(ticket.id);
        self.tickets.insert(ticket.id, ticket);
    }

    /// Lookup
    #[must_use]
    pub fn get(&self, id: TicketId) -> Option<&Ticket> {
        self.tickets.get(&id)
    }

    /// Holder of ticket `id`
    #[must_use]
    pub fn owner_of(&self, id: TicketId) -> Option<Address> {
        self.get(id).map(|ticket| ticket.owner)
    }

    /// Number of tickets held by `owner`
    #[must_use]
    pub fn balance_of(&self, owner: Address) -> usize {
        self.by_owner.get(&owner).map_or(0, Vec::len)
    }

    /// Tickets held by `owner`, in mint order
    #[must_use]
    pub fn tickets_of(&self, owner: Address) -> Vec<Ticket> {
        self.by_owner
            .get(&owner)
            .into_iter()
            .flatten()
            .filter_map(|id| self.tickets.get(id))
            .cloned()
            .collect()
    }

    /// Events `owner` holds tickets for, in mint order
    #[must_use]
    pub fn events_of(&self, owner: Address) -> Vec<EventId> {
        self.tickets_of(owner)
            .into_iter()
            .map(|ticket| ticket.event_id)
            .collect()
    }

    /// Tickets minted on this chain
    #[must_use]
    pub fn total_minted(&self) -> u64 {
        u64::try_from(self.tickets.len()).unwrap_or(u64::MAX)
    }
}
