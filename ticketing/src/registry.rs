//! Event metadata and sale counters.
//!
//! The registry is the only writer of [`Event`] records on a chain. Events
//! are keyed by their full [`EventId`], origin included, so a mirror can never
//! shadow an event created elsewhere. Locally created events are numbered
//! from a counter starting at 1; mirrors keep the id their origin assigned
//! and leave the local counter alone.

use crate::error::{AuthorizationError, StateError, TicketingError, ValidationError};
use crate::types::{Event, EventId};
use std::collections::BTreeMap;
use tickbridge_core::chain::{Address, Amount, ChainSelector};

/// Events known on one chain
#[derive(Clone, Debug)]
pub struct EventRegistry {
    chain: ChainSelector,
    events: BTreeMap<EventId, Event>,
    last_sequence: u64,
}

impl EventRegistry {
    /// Empty registry of `chain`
    #[must_use]
    pub const fn new(chain: ChainSelector) -> Self {
        Self {
            chain,
            events: BTreeMap::new(),
            last_sequence: 0,
        }
    }

    /// Id the next locally created event will get
    #[must_use]
    pub const fn next_id(&self) -> EventId {
        EventId::new(self.chain, self.last_sequence.saturating_add(1))
    }

    /// Check creation arguments
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found: blank name, zero price,
    /// zero capacity.
    pub fn validate_new(name: &str, price: Amount, total_tickets: u32) -> Result<(), ValidationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if price.is_zero() {
            return Err(ValidationError::ZeroPrice);
        }
        if total_tickets == 0 {
            return Err(ValidationError::ZeroCapacity);
        }
        Ok(())
    }

    /// Lookup
    #[must_use]
    pub fn get(&self, id: EventId) -> Option<&Event> {
        self.events.get(&id)
    }

    /// Lookup that fails with `EventNotFound`
    ///
    /// # Errors
    ///
    /// Returns [`StateError::EventNotFound`] if no such event is known here.
    pub fn get_event(&self, id: EventId) -> Result<&Event, StateError> {
        self.get(id).ok_or(StateError::EventNotFound(id))
    }

    /// All known events, ordered by origin then sequence
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Number of known events
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True when no event is known
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Whether event `id` is known here
    #[must_use]
    pub fn contains(&self, id: EventId) -> bool {
        self.events.contains_key(&id)
    }

    /// Store a record, locally created or mirrored
    pub fn insert(&mut self, event: Event) {
        if event.id.origin() == self.chain {
            self.last_sequence = self.last_sequence.max(event.id.sequence());
        }
        self.events.insert(event.id, event);
    }

    /// Check that `caller` may deactivate event `id`
    ///
    /// # Errors
    ///
    /// - [`StateError::EventNotFound`] if the event is unknown
    /// - [`AuthorizationError::NotOrganizer`] unless `caller` is the owner or
    ///   the event's organizer
    pub fn ensure_can_deactivate(
        &self,
        id: EventId,
        caller: Address,
        owner: Address,
    ) -> Result<(), TicketingError> {
        let event = self.get_event(id)?;
        if caller != owner && caller != event.organizer {
            return Err(AuthorizationError::NotOrganizer {
                caller,
                event_id: id,
            }
            .into());
        }
        Ok(())
    }

    /// Stop sales of event `id` on this chain
    pub fn deactivate(&mut self, id: EventId) {
        if let Some(event) = self.events.get_mut(&id) {
            event.is_active = false;
        }
    }

    /// Sold count after one more sale of event `id`
    ///
    /// # Errors
    ///
    /// - [`StateError::EventNotFound`] if the event is unknown
    /// - [`StateError::EventSoldOut`] if it is already at capacity
    pub fn next_sale_count(&self, id: EventId) -> Result<u32, StateError> {
        let event = self.get_event(id)?;
        if event.is_sold_out() {
            return Err(StateError::EventSoldOut(id));
        }
        Ok(event.sold_tickets + 1)
    }

    /// Sold count after applying one remote sale notice, clamped at capacity
    ///
    /// `None` if the event is unknown here.
    #[must_use]
    pub fn noticed_sale_count(&self, id: EventId) -> Option<u32> {
        self.get(id)
            .map(|event| event.sold_tickets.saturating_add(1).min(event.total_tickets))
    }

    /// Store a sold count computed by [`Self::next_sale_count`] or
    /// [`Self::noticed_sale_count`]
    pub fn set_sold_tickets(&mut self, id: EventId, sold_tickets: u32) {
        if let Some(event) = self.events.get_mut(&id) {
            event.sold_tickets = sold_tickets.min(event.total_tickets);
        }
    }
}
