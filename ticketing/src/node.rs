//! Typed façade over one chain's store.
//!
//! [`ChainNode`] is what callers (the demo, tests, a wallet adapter) talk to.
//! Every mutating method runs exactly one transaction through
//! [`Store::send`]; reads take the store's read lock.

use crate::chain::{ChainAction, ChainEnvironment, ChainReducer, ChainState};
use crate::config::ChainConfig;
use crate::error::{Result, TicketingError};
use crate::messenger::Payload;
use crate::types::{Event, EventId, NewEvent, Ticket, TicketId, Tier};
use async_trait::async_trait;
use tickbridge_core::chain::{Address, Amount, ChainSelector};
use tickbridge_core::message::{Envelope, MessageId};
use tickbridge_runtime::{Inbox, Store};

/// Outcome of a purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purchase {
    /// Minted here
    Minted(TicketId),
    /// Handed to the mint chain
    Forwarded(MessageId),
}

/// One running chain
pub struct ChainNode {
    chain: ChainSelector,
    store: Store<ChainReducer>,
}

impl ChainNode {
    /// Start a chain from its configuration
    #[must_use]
    pub fn new(config: &ChainConfig, environment: ChainEnvironment) -> Self {
        Self {
            chain: config.chain,
            store: Store::new(ChainState::new(config), ChainReducer::new(), environment),
        }
    }

    /// Run one action
    ///
    /// # Errors
    ///
    /// Whatever the chain refused the action with.
    pub async fn send(&self, action: ChainAction) -> Result<Vec<ChainAction>> {
        self.store.send(action).await
    }

    // ========== Commands ==========

    /// Create an event here and mirror it to every supported chain
    ///
    /// `funding` must cover [`Self::estimate_event_creation_fees`]; any
    /// surplus stays in the treasury.
    ///
    /// # Errors
    ///
    /// Validation errors first, then an unsupported mint chain, then
    /// insufficient funding.
    pub async fn create_event(
        &self,
        organizer: Address,
        details: NewEvent,
        funding: Amount,
    ) -> Result<EventId> {
        let published = self
            .send(ChainAction::CreateEvent {
                organizer,
                details,
                funding,
            })
            .await?;
        published
            .iter()
            .find_map(|event| match event {
                ChainAction::EventCreated { event } => Some(event.id),
                _ => None,
            })
            .ok_or_else(|| unexpected_outcome("EventCreated"))
    }

    /// Stop sales of an event on this chain
    ///
    /// # Errors
    ///
    /// `EventNotFound`, or `NotOrganizer` unless the caller is the owner or
    /// the organizer.
    pub async fn deactivate_event(&self, caller: Address, event_id: EventId) -> Result<()> {
        self.send(ChainAction::DeactivateEvent { caller, event_id })
            .await
            .map(drop)
    }

    /// Buy a ticket
    ///
    /// # Errors
    ///
    /// State, funding or transport errors of the purchase; nothing is minted
    /// or forwarded in that case.
    pub async fn buy_ticket(
        &self,
        event_id: EventId,
        buyer: Address,
        tier: Tier,
        payment: Amount,
    ) -> Result<Purchase> {
        let published = self
            .send(ChainAction::BuyTicket {
                event_id,
                buyer,
                tier,
                payment,
            })
            .await?;
        published
            .iter()
            .find_map(|event| match event {
                ChainAction::TicketPurchased { ticket_id, .. } => Some(Purchase::Minted(*ticket_id)),
                ChainAction::PurchaseForwarded { message_id, .. } => {
                    Some(Purchase::Forwarded(*message_id))
                },
                _ => None,
            })
            .ok_or_else(|| unexpected_outcome("TicketPurchased or PurchaseForwarded"))
    }

    /// Tier-less purchase; buys a [`Tier::General`] ticket
    ///
    /// # Errors
    ///
    /// Same as [`Self::buy_ticket`].
    pub async fn buy_ticket_legacy(
        &self,
        event_id: EventId,
        buyer: Address,
        payment: Amount,
    ) -> Result<Purchase> {
        self.buy_ticket(event_id, buyer, Tier::General, payment).await
    }

    /// Add or remove a supported counterparty (owner only)
    ///
    /// # Errors
    ///
    /// `NotOwner`.
    pub async fn set_supported_chain(
        &self,
        caller: Address,
        chain: ChainSelector,
        enabled: bool,
    ) -> Result<()> {
        self.send(ChainAction::SetSupportedChain {
            caller,
            chain,
            enabled,
        })
        .await
        .map(drop)
    }

    /// Configure the trusted sender of `chain` (owner only)
    ///
    /// # Errors
    ///
    /// `NotOwner`.
    pub async fn set_trusted_sender(
        &self,
        caller: Address,
        chain: ChainSelector,
        sender: Address,
    ) -> Result<()> {
        self.send(ChainAction::SetTrustedSender {
            caller,
            chain,
            sender,
        })
        .await
        .map(drop)
    }

    /// Pay into the treasury
    ///
    /// # Errors
    ///
    /// Never refused; the `Result` mirrors every other command.
    pub async fn fund(&self, from: Address, amount: Amount) -> Result<()> {
        self.send(ChainAction::FundTreasury { from, amount })
            .await
            .map(drop)
    }

    /// Drain the treasury to the owner; returns the amount withdrawn
    ///
    /// # Errors
    ///
    /// `NotOwner`.
    pub async fn withdraw_fees(&self, caller: Address) -> Result<Amount> {
        let published = self.send(ChainAction::WithdrawFees { caller }).await?;
        Ok(published
            .iter()
            .find_map(|event| match event {
                ChainAction::FeesWithdrawn { amount, .. } => Some(*amount),
                _ => None,
            })
            .unwrap_or(Amount::ZERO))
    }

    /// Apply one inbound envelope
    ///
    /// Redeliveries of an applied message succeed without changing anything.
    ///
    /// # Errors
    ///
    /// Transport errors from authentication and decoding, or whatever the
    /// dispatched operation refused with. The message is not recorded as
    /// applied in that case.
    pub async fn receive(&self, envelope: Envelope) -> Result<()> {
        self.send(ChainAction::Receive { envelope }).await.map(drop)
    }

    // ========== Reads ==========

    /// Event `id` as known here
    ///
    /// # Errors
    ///
    /// `EventNotFound`.
    pub async fn get_event(&self, id: EventId) -> Result<Event> {
        self.store
            .state(|state| state.registry.get_event(id).cloned())
            .await
            .map_err(Into::into)
    }

    /// All events known here, by id
    pub async fn events(&self) -> Vec<Event> {
        self.store
            .state(|state| state.registry.events().cloned().collect())
            .await
    }

    /// Whether `buyer` holds a ticket for `event_id` on this chain
    pub async fn has_ticket_for_event(&self, event_id: EventId, buyer: Address) -> bool {
        self.store
            .state(|state| state.issuer.has_ticket_for_event(event_id, buyer))
            .await
    }

    /// Events `buyer` holds tickets for on this chain
    pub async fn get_user_tickets(&self, buyer: Address) -> Vec<EventId> {
        self.store.state(|state| state.issuer.events_of(buyer)).await
    }

    /// Tickets minted on this chain
    pub async fn get_total_tickets(&self) -> u64 {
        self.store.state(|state| state.issuer.total_minted()).await
    }

    /// Number of tickets `owner` holds on this chain
    pub async fn balance_of(&self, owner: Address) -> usize {
        self.store.state(|state| state.issuer.balance_of(owner)).await
    }

    /// Tickets `owner` holds on this chain
    pub async fn tickets_of(&self, owner: Address) -> Vec<Ticket> {
        self.store.state(|state| state.issuer.tickets_of(owner)).await
    }

    /// Holder of ticket `id`
    pub async fn owner_of(&self, id: TicketId) -> Option<Address> {
        self.store.state(|state| state.issuer.owner_of(id)).await
    }

    /// Treasury balance
    pub async fn treasury_balance(&self) -> Amount {
        self.store.state(|state| state.treasury.balance()).await
    }

    /// Owner account
    pub async fn owner(&self) -> Address {
        self.store.state(|state| state.owner).await
    }

    /// This chain
    #[must_use]
    pub const fn get_current_chain_selector(&self) -> ChainSelector {
        self.chain
    }

    /// Whether `chain` is allowlisted
    pub async fn is_chain_supported(&self, chain: ChainSelector) -> bool {
        self.store
            .state(|state| state.allowlist.is_supported(chain))
            .await
    }

    /// Last nonce sent to `dest`
    pub async fn last_nonce(&self, dest: ChainSelector) -> u64 {
        self.store
            .state(|state| state.messenger.last_nonce(dest))
            .await
    }

    /// Fee of sending `payload` to `dest`
    ///
    /// # Errors
    ///
    /// `MalformedPayload` if the payload cannot be encoded.
    pub async fn estimate_fee(&self, dest: ChainSelector, payload: &Payload) -> Result<Amount> {
        self.store
            .state(|state| state.messenger.estimate_payload_fee(dest, payload))
            .await
            .map_err(Into::into)
    }

    /// Funding `create_event` needs right now for these arguments
    ///
    /// # Errors
    ///
    /// `MalformedPayload` if the mirror would exceed the payload size limit.
    pub async fn estimate_event_creation_fees(
        &self,
        name: &str,
        description: &str,
        ticket_price: Amount,
        total_tickets: u32,
    ) -> Result<Amount> {
        self.store
            .state(|state| {
                state.estimate_event_creation_fees(name, description, ticket_price, total_tickets)
            })
            .await
    }
}

#[async_trait]
impl Inbox for ChainNode {
    async fn deliver(&self, envelope: Envelope) -> anyhow::Result<()> {
        self.receive(envelope).await?;
        Ok(())
    }
}

fn unexpected_outcome(expected: &str) -> TicketingError {
    tracing::error!(expected, "transaction committed without its expected event");
    crate::error::TransportError::MalformedPayload(format!("transaction did not publish {expected}"))
        .into()
}
