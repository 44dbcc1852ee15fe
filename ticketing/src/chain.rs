//! The chain state machine.
//!
//! One [`ChainReducer`] composes the allowlist, treasury, messenger, registry
//! and issuer of a single chain. Every command is validated completely
//! against the current state first; only then are its domain events applied
//! and its effects (event publication, outbound envelopes) returned. A
//! refused command therefore never leaves a partial mutation behind.
//!
//! # Action flow
//!
//! ```text
//! command ──validate──▶ Transaction { events, envelopes }
//!                              │
//!                  apply_event │ per event
//!                              ▼
//!              Effect::Publish per event, Effect::Relay per envelope
//! ```

use crate::allowlist::ChainAllowlist;
use crate::config::ChainConfig;
use crate::error::{AuthorizationError, FundingError, TicketingError, TransportError};
use crate::issuer::TicketIssuer;
use crate::messenger::{
    CrossChainMessenger, Delivery, EventMirror, Outbox, Payload, PurchaseIntent, TicketSoldNotice,
};
use crate::metrics;
use crate::registry::EventRegistry;
use crate::treasury::FeeTreasury;
use crate::types::{Event, EventId, NewEvent, Ticket, TicketId, Tier};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tickbridge_core::chain::{Address, Amount, ChainSelector};
use tickbridge_core::effect::Effect;
use tickbridge_core::environment::Clock;
use tickbridge_core::event_bus::EventBus;
use tickbridge_core::message::{Envelope, MessageId, PayloadKind};
use tickbridge_core::reducer::Reducer;
use tickbridge_core::transport::Transport;
use tickbridge_core::SmallVec;

// ============================================================================
// State
// ============================================================================

/// Everything one chain knows
#[derive(Clone, Debug)]
pub struct ChainState {
    /// This chain
    pub chain: ChainSelector,
    /// Owner account
    pub owner: Address,
    /// Mint chain for events created without one
    pub default_mint_chain: ChainSelector,
    /// Supported counterparties
    pub allowlist: ChainAllowlist,
    /// Fee funds
    pub treasury: FeeTreasury,
    /// Nonces, trusted senders, seen messages
    pub messenger: CrossChainMessenger,
    /// Events
    pub registry: EventRegistry,
    /// Tickets
    pub issuer: TicketIssuer,
}

impl ChainState {
    /// Fresh chain: empty allowlist, empty treasury, no events
    #[must_use]
    pub fn new(config: &ChainConfig) -> Self {
        Self {
            chain: config.chain,
            owner: config.owner,
            default_mint_chain: config.default_mint_chain,
            allowlist: ChainAllowlist::new(),
            treasury: FeeTreasury::new(),
            messenger: CrossChainMessenger::new(config.chain, config.contract, config.fees.clone()),
            registry: EventRegistry::new(config.chain),
            issuer: TicketIssuer::new(),
        }
    }

    /// Fail with `NotOwner` unless `caller` is the owner
    ///
    /// # Errors
    ///
    /// Returns [`AuthorizationError::NotOwner`].
    pub fn ensure_owner(&self, caller: Address) -> Result<(), AuthorizationError> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(AuthorizationError::NotOwner(caller))
        }
    }

    /// Chains an event created here is mirrored to: every allowlisted chain
    /// but this one, ascending
    #[must_use]
    pub fn mirror_destinations(&self) -> Vec<ChainSelector> {
        self.allowlist
            .supported()
            .filter(|chain| *chain != self.chain)
            .collect()
    }

    /// Summed fee of mirroring `payload` to every mirror destination
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MalformedPayload`] if the payload cannot be
    /// encoded.
    pub fn mirror_fees(&self, payload: &Payload) -> Result<Amount, TicketingError> {
        let bytes = payload.encode()?;
        Ok(self
            .mirror_destinations()
            .into_iter()
            .map(|dest| self.messenger.estimate_fee(dest, &bytes))
            .sum())
    }

    /// Funding `create_event` would require for these arguments right now
    ///
    /// The mirror payload has a fixed-width layout apart from the two
    /// strings, so the estimate is exact for the same name and description.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MalformedPayload`] if the payload would
    /// exceed the size limit.
    pub fn estimate_event_creation_fees(
        &self,
        name: &str,
        description: &str,
        ticket_price: Amount,
        total_tickets: u32,
    ) -> Result<Amount, TicketingError> {
        let prototype = Event {
            id: self.registry.next_id(),
            organizer: Address::ZERO,
            name: name.to_string(),
            description: description.to_string(),
            ticket_price,
            total_tickets,
            sold_tickets: 0,
            is_active: true,
            origin_chain: self.chain,
            mint_chain: self.default_mint_chain,
            created_at: DateTime::<Utc>::default(),
        };
        self.mirror_fees(&Payload::EventMirror(EventMirror { event: prototype }))
    }
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Everything that can happen on a chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainAction {
    // Commands
    /// Create an event here and mirror it to every supported chain
    CreateEvent {
        /// Creator, recorded as organizer
        organizer: Address,
        /// Event arguments
        details: NewEvent,
        /// Funds sent along to pay the mirror fees
        funding: Amount,
    },

    /// Stop sales of an event on this chain
    DeactivateEvent {
        /// Owner or organizer
        caller: Address,
        /// Event
        event_id: EventId,
    },

    /// Buy a ticket: minted here on the mint chain, forwarded otherwise
    BuyTicket {
        /// Event
        event_id: EventId,
        /// Buyer
        buyer: Address,
        /// Tier
        tier: Tier,
        /// Amount paid
        payment: Amount,
    },

    /// Owner adds or removes a counterparty chain
    SetSupportedChain {
        /// Owner
        caller: Address,
        /// Chain
        chain: ChainSelector,
        /// New membership
        enabled: bool,
    },

    /// Owner configures the trusted sender of a chain
    SetTrustedSender {
        /// Owner
        caller: Address,
        /// Chain
        chain: ChainSelector,
        /// The one address accepted as sender from `chain`
        sender: Address,
    },

    /// Plain value transfer into the treasury
    FundTreasury {
        /// Payer
        from: Address,
        /// Amount
        amount: Amount,
    },

    /// Owner drains the treasury
    WithdrawFees {
        /// Owner
        caller: Address,
    },

    /// Inbound envelope from the transport
    Receive {
        /// The envelope as delivered
        envelope: Envelope,
    },

    // Events
    /// Funds credited to the treasury
    TreasuryFunded {
        /// Payer
        from: Address,
        /// Amount
        amount: Amount,
    },

    /// Ticket payment credited to the treasury
    PaymentReceived {
        /// Event paid for
        event_id: EventId,
        /// Payer
        buyer: Address,
        /// Amount
        amount: Amount,
    },

    /// Event created on this chain (its origin)
    EventCreated {
        /// The new record
        event: Event,
    },

    /// Mirror of an event from its origin chain applied
    EventMirrored {
        /// The mirrored record; `event.origin_chain` is where it came from
        event: Event,
    },

    /// Event deactivated on this chain
    EventDeactivated {
        /// Event
        event_id: EventId,
        /// Who deactivated it
        by: Address,
    },

    /// Ticket minted on this chain
    TicketPurchased {
        /// Event
        event_id: EventId,
        /// New ticket
        ticket_id: TicketId,
        /// Holder
        buyer: Address,
        /// Tier
        tier: Tier,
        /// Mint time
        purchased_at: DateTime<Utc>,
    },

    /// Sold count of an event changed (local sale or remote notice)
    SaleRecorded {
        /// Event
        event_id: EventId,
        /// New sold count
        sold_tickets: u32,
    },

    /// Purchase handed to the mint chain
    PurchaseForwarded {
        /// Event
        event_id: EventId,
        /// Buyer
        buyer: Address,
        /// Tier
        tier: Tier,
        /// Where the ticket will be minted
        mint_chain: ChainSelector,
        /// Carrying message
        message_id: MessageId,
    },

    /// Outbound message paid for and handed to the transport
    MessageSent {
        /// Identifier
        message_id: MessageId,
        /// Payload kind
        kind: PayloadKind,
        /// Fee debited from the treasury
        fee: Amount,
    },

    /// Inbound message applied
    MessageReceived {
        /// Identifier
        message_id: MessageId,
        /// Payload kind
        kind: PayloadKind,
    },

    /// Allowlist membership changed
    ChainSupportUpdated {
        /// Chain
        selector: ChainSelector,
        /// New membership
        enabled: bool,
    },

    /// Trusted sender configured
    TrustedSenderUpdated {
        /// Chain
        chain: ChainSelector,
        /// Accepted sender
        sender: Address,
    },

    /// Treasury drained to the owner
    FeesWithdrawn {
        /// Recipient
        to: Address,
        /// Amount withdrawn
        amount: Amount,
    },
}

impl ChainAction {
    /// True for commands, false for domain events
    #[must_use]
    pub const fn is_command(&self) -> bool {
        matches!(
            self,
            Self::CreateEvent { .. }
                | Self::DeactivateEvent { .. }
                | Self::BuyTicket { .. }
                | Self::SetSupportedChain { .. }
                | Self::SetTrustedSender { .. }
                | Self::FundTreasury { .. }
                | Self::WithdrawFees { .. }
                | Self::Receive { .. }
        )
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies injected into the chain reducer
#[derive(Clone)]
pub struct ChainEnvironment {
    /// Clock for creation and mint timestamps
    pub clock: Arc<dyn Clock>,
    /// Outbound message transport
    pub transport: Arc<dyn Transport>,
    /// Domain event sink
    pub event_bus: Arc<dyn EventBus<ChainAction>>,
}

impl ChainEnvironment {
    /// Creates a new `ChainEnvironment`
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        transport: Arc<dyn Transport>,
        event_bus: Arc<dyn EventBus<ChainAction>>,
    ) -> Self {
        Self {
            clock,
            transport,
            event_bus,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Validated outcome of a command, not yet applied
#[derive(Debug, Default)]
struct Transaction {
    events: Vec<ChainAction>,
    envelopes: Vec<Envelope>,
}

impl Transaction {
    fn from_events(events: Vec<ChainAction>) -> Self {
        Self {
            events,
            envelopes: Vec::new(),
        }
    }

    /// `events`, then one `MessageSent` per planned envelope
    fn with_outbox(mut events: Vec<ChainAction>, outbox: Outbox<'_>) -> Self {
        let envelopes = outbox.into_envelopes();
        events.extend(envelopes.iter().map(|envelope| ChainAction::MessageSent {
            message_id: envelope.id(),
            kind: envelope.kind,
            fee: envelope.fee_paid,
        }));
        Self { events, envelopes }
    }
}

/// Reducer for one chain
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainReducer;

impl ChainReducer {
    /// Creates a new `ChainReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    // ========== Commands ==========

    fn create_event(
        state: &ChainState,
        env: &ChainEnvironment,
        organizer: Address,
        details: NewEvent,
        funding: Amount,
    ) -> Result<Transaction, TicketingError> {
        let NewEvent {
            name,
            description,
            ticket_price,
            total_tickets,
            mint_chain,
        } = details;
        EventRegistry::validate_new(&name, ticket_price, total_tickets)?;

        let mint_chain = mint_chain.unwrap_or(state.default_mint_chain);
        if mint_chain != state.chain {
            state.allowlist.ensure_supported(mint_chain)?;
        }

        let event = Event {
            id: state.registry.next_id(),
            organizer,
            name,
            description,
            ticket_price,
            total_tickets,
            sold_tickets: 0,
            is_active: true,
            origin_chain: state.chain,
            mint_chain,
            created_at: env.clock.now().trunc_subsecs(3),
        };
        let payload = Payload::EventMirror(EventMirror {
            event: event.clone(),
        });

        let required = state.mirror_fees(&payload)?;
        if funding < required {
            return Err(FundingError::InsufficientPayment {
                required,
                provided: funding,
            }
            .into());
        }

        let mut outbox = state
            .messenger
            .outbox(&state.allowlist, state.treasury.balance().saturating_add(funding));
        for dest in state.mirror_destinations() {
            outbox.send(dest, &payload)?;
        }

        let mut events = Vec::with_capacity(2);
        if !funding.is_zero() {
            events.push(ChainAction::TreasuryFunded {
                from: organizer,
                amount: funding,
            });
        }
        events.push(ChainAction::EventCreated { event });
        Ok(Transaction::with_outbox(events, outbox))
    }

    fn buy_ticket(
        state: &ChainState,
        env: &ChainEnvironment,
        event_id: EventId,
        buyer: Address,
        tier: Tier,
        payment: Amount,
    ) -> Result<Transaction, TicketingError> {
        let event = state.registry.get_event(event_id)?;
        if event.mint_chain == state.chain {
            Self::mint_ticket(state, env, event, buyer, tier, payment, payment)
        } else {
            Self::forward_purchase(state, event, buyer, tier, payment)
        }
    }

    /// Mint on this chain; `credited` is the part of `payment` that lands in
    /// this chain's treasury (zero for purchases forwarded from elsewhere)
    fn mint_ticket(
        state: &ChainState,
        env: &ChainEnvironment,
        event: &Event,
        buyer: Address,
        tier: Tier,
        payment: Amount,
        credited: Amount,
    ) -> Result<Transaction, TicketingError> {
        state.issuer.check_purchase(event, buyer, payment)?;
        let sold_tickets = state.registry.next_sale_count(event.id)?;
        let ticket_id = state.issuer.next_id();

        let mut outbox = state
            .messenger
            .outbox(&state.allowlist, state.treasury.balance().saturating_add(credited));
        if event.origin_chain != state.chain {
            let notice = Payload::TicketSoldNotice(TicketSoldNotice {
                event_id: event.id,
                ticket_id,
                buyer,
            });
            outbox.send(event.origin_chain, &notice)?;
        }

        let mut events = Vec::with_capacity(4);
        if !credited.is_zero() {
            events.push(ChainAction::PaymentReceived {
                event_id: event.id,
                buyer,
                amount: credited,
            });
        }
        events.push(ChainAction::TicketPurchased {
            event_id: event.id,
            ticket_id,
            buyer,
            tier,
            purchased_at: env.clock.now(),
        });
        events.push(ChainAction::SaleRecorded {
            event_id: event.id,
            sold_tickets,
        });
        Ok(Transaction::with_outbox(events, outbox))
    }

    /// Hand the purchase to the mint chain
    ///
    /// The intent's fee is paid from the payment surplus when that covers
    /// it, otherwise from the treasury as it stood before this purchase.
    fn forward_purchase(
        state: &ChainState,
        event: &Event,
        buyer: Address,
        tier: Tier,
        payment: Amount,
    ) -> Result<Transaction, TicketingError> {
        TicketIssuer::check_sale_terms(event, payment)?;

        let surplus = payment.saturating_sub(event.ticket_price);
        let available = surplus.max(state.treasury.balance());
        let mut outbox = state.messenger.outbox(&state.allowlist, available);
        let intent = Payload::PurchaseIntent(PurchaseIntent {
            event_id: event.id,
            buyer,
            tier,
            payment,
        });
        let message_id = outbox.send(event.mint_chain, &intent)?;

        let events = vec![
            ChainAction::PaymentReceived {
                event_id: event.id,
                buyer,
                amount: payment,
            },
            ChainAction::PurchaseForwarded {
                event_id: event.id,
                buyer,
                tier,
                mint_chain: event.mint_chain,
                message_id,
            },
        ];
        Ok(Transaction::with_outbox(events, outbox))
    }

    fn withdraw_fees(state: &ChainState, caller: Address) -> Result<Transaction, TicketingError> {
        state.ensure_owner(caller)?;
        let amount = state.treasury.balance();
        if amount.is_zero() {
            return Ok(Transaction::default());
        }
        Ok(Transaction::from_events(vec![ChainAction::FeesWithdrawn {
            to: caller,
            amount,
        }]))
    }

    // ========== Inbound messages ==========

    fn receive(
        state: &ChainState,
        env: &ChainEnvironment,
        envelope: &Envelope,
    ) -> Result<Transaction, TicketingError> {
        let message_id = envelope.id();
        match state.messenger.authenticate(&state.allowlist, envelope) {
            Ok(Delivery::Fresh) => {},
            Ok(Delivery::Duplicate) => {
                tracing::debug!(%message_id, kind = %envelope.kind, "duplicate delivery ignored");
                metrics::record_duplicate_message();
                return Ok(Transaction::default());
            },
            Err(error) => {
                tracing::warn!(%message_id, %error, "inbound message rejected");
                return Err(error.into());
            },
        }

        let mut transaction = Self::dispatch(state, env, envelope).inspect_err(|error| {
            tracing::warn!(%message_id, %error, "inbound payload could not be applied");
        })?;
        transaction.events.insert(
            0,
            ChainAction::MessageReceived {
                message_id,
                kind: envelope.kind,
            },
        );
        Ok(transaction)
    }

    fn dispatch(
        state: &ChainState,
        env: &ChainEnvironment,
        envelope: &Envelope,
    ) -> Result<Transaction, TicketingError> {
        match Payload::decode(envelope.kind, &envelope.payload)? {
            Payload::EventMirror(EventMirror { event }) => {
                Self::apply_mirror(state, envelope.source, event)
            },
            Payload::TicketSoldNotice(notice) => Self::apply_sold_notice(state, &notice),
            Payload::PurchaseIntent(intent) => Self::apply_purchase_intent(state, env, &intent),
        }
    }

    fn apply_mirror(
        state: &ChainState,
        source: ChainSelector,
        event: Event,
    ) -> Result<Transaction, TicketingError> {
        if event.origin_chain != source || event.id.origin() != source {
            return Err(TransportError::MalformedPayload(format!(
                "mirror of event {} claims origin {} but was sent by {source}",
                event.id, event.origin_chain
            ))
            .into());
        }

        if state.registry.contains(event.id) {
            tracing::debug!(event_id = %event.id, "mirror already applied");
            return Ok(Transaction::default());
        }
        Ok(Transaction::from_events(vec![ChainAction::EventMirrored { event }]))
    }

    fn apply_sold_notice(
        state: &ChainState,
        notice: &TicketSoldNotice,
    ) -> Result<Transaction, TicketingError> {
        if notice.event_id.origin() != state.chain {
            return Err(TransportError::MalformedPayload(format!(
                "sale notice for event {} which did not originate here",
                notice.event_id
            ))
            .into());
        }
        match state.registry.noticed_sale_count(notice.event_id) {
            Some(sold_tickets) => Ok(Transaction::from_events(vec![ChainAction::SaleRecorded {
                event_id: notice.event_id,
                sold_tickets,
            }])),
            None => {
                tracing::warn!(event_id = %notice.event_id, "sale notice for unknown event dropped");
                Ok(Transaction::default())
            },
        }
    }

    fn apply_purchase_intent(
        state: &ChainState,
        env: &ChainEnvironment,
        intent: &PurchaseIntent,
    ) -> Result<Transaction, TicketingError> {
        let event = state.registry.get_event(intent.event_id)?;
        if event.mint_chain != state.chain {
            return Err(TransportError::MalformedPayload(format!(
                "purchase intent for event {} which is minted on {}",
                event.id, event.mint_chain
            ))
            .into());
        }
        Self::mint_ticket(
            state,
            env,
            event,
            intent.buyer,
            intent.tier,
            intent.payment,
            Amount::ZERO,
        )
    }

    // ========== Events ==========

    /// Apply one domain event to state
    fn apply_event(state: &mut ChainState, action: &ChainAction) {
        match action {
            ChainAction::TreasuryFunded { amount, .. } | ChainAction::PaymentReceived { amount, .. } => {
                state.treasury.credit(*amount);
            },
            ChainAction::EventCreated { event } | ChainAction::EventMirrored { event } => {
                state.registry.insert(event.clone());
            },
            ChainAction::EventDeactivated { event_id, .. } => state.registry.deactivate(*event_id),
            ChainAction::TicketPurchased {
                event_id,
                ticket_id,
                buyer,
                tier,
                purchased_at,
            } => state.issuer.mint(Ticket {
                id: *ticket_id,
                event_id: *event_id,
                owner: *buyer,
                tier: *tier,
                mint_chain: state.chain,
                purchased_at: *purchased_at,
            }),
            ChainAction::SaleRecorded {
                event_id,
                sold_tickets,
            } => state.registry.set_sold_tickets(*event_id, *sold_tickets),
            ChainAction::MessageSent {
                message_id, fee, ..
            } => {
                state.messenger.record_sent(*message_id);
                if let Err(error) = state.treasury.debit(*fee) {
                    tracing::error!(%message_id, %error, "message fee exceeded treasury balance");
                }
            },
            ChainAction::MessageReceived { message_id, .. } => {
                state.messenger.mark_seen(message_id.source, message_id.nonce);
            },
            ChainAction::ChainSupportUpdated { selector, enabled } => {
                state.allowlist.set_supported(*selector, *enabled);
            },
            ChainAction::TrustedSenderUpdated { chain, sender } => {
                state.messenger.set_trusted_sender(*chain, *sender);
            },
            ChainAction::FeesWithdrawn { amount, .. } => {
                if let Err(error) = state.treasury.debit(*amount) {
                    tracing::error!(%error, "withdrawal exceeded treasury balance");
                }
            },
            // PurchaseForwarded changes nothing beyond its MessageSent;
            // commands are not events
            ChainAction::PurchaseForwarded { .. }
            | ChainAction::CreateEvent { .. }
            | ChainAction::DeactivateEvent { .. }
            | ChainAction::BuyTicket { .. }
            | ChainAction::SetSupportedChain { .. }
            | ChainAction::SetTrustedSender { .. }
            | ChainAction::FundTreasury { .. }
            | ChainAction::WithdrawFees { .. }
            | ChainAction::Receive { .. } => {},
        }
    }

    /// Log and count a committed event
    fn observe(chain: ChainSelector, action: &ChainAction) {
        match action {
            ChainAction::EventCreated { event } => {
                metrics::record_event_created();
                tracing::info!(
                    %chain,
                    event_id = %event.id,
                    mint_chain = %event.mint_chain,
                    "event created"
                );
            },
            ChainAction::EventMirrored { event } => {
                metrics::record_event_mirrored();
                tracing::info!(%chain, event_id = %event.id, origin = %event.origin_chain, "event mirrored");
            },
            ChainAction::TicketPurchased {
                event_id,
                ticket_id,
                buyer,
                tier,
                ..
            } => {
                metrics::record_ticket_sold();
                tracing::info!(%chain, %event_id, %ticket_id, %buyer, %tier, "ticket minted");
            },
            ChainAction::PurchaseForwarded {
                event_id,
                mint_chain,
                message_id,
                ..
            } => {
                tracing::info!(%chain, %event_id, %mint_chain, %message_id, "purchase forwarded");
            },
            ChainAction::EventDeactivated { event_id, by } => {
                tracing::info!(%chain, %event_id, %by, "event deactivated");
            },
            ChainAction::MessageSent {
                message_id,
                kind,
                fee,
            } => {
                metrics::record_message_sent(*kind);
                tracing::debug!(%message_id, %kind, %fee, "message fee paid");
            },
            ChainAction::MessageReceived { kind, .. } => metrics::record_message_received(*kind),
            ChainAction::ChainSupportUpdated { selector, enabled } => {
                tracing::info!(%chain, %selector, enabled, "chain support updated");
            },
            ChainAction::TrustedSenderUpdated { chain: peer, sender } => {
                tracing::info!(%chain, %peer, %sender, "trusted sender updated");
            },
            ChainAction::FeesWithdrawn { to, amount } => {
                metrics::record_fees_withdrawn();
                tracing::info!(%chain, %to, %amount, "fees withdrawn");
            },
            _ => {},
        }
    }

    fn commit(
        state: &mut ChainState,
        env: &ChainEnvironment,
        transaction: Transaction,
    ) -> SmallVec<[Effect<ChainAction>; 4]> {
        let mut effects = SmallVec::new();
        for event in transaction.events {
            Self::apply_event(state, &event);
            Self::observe(state.chain, &event);
            effects.push(Effect::publish(&env.event_bus, event));
        }
        for envelope in transaction.envelopes {
            effects.push(Effect::relay(&env.transport, envelope));
        }
        effects
    }
}

impl Reducer for ChainReducer {
    type State = ChainState;
    type Action = ChainAction;
    type Environment = ChainEnvironment;
    type Error = TicketingError;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Result<SmallVec<[Effect<Self::Action>; 4]>, Self::Error> {
        let outcome: Result<Transaction, TicketingError> = match action {
            // ========== Commands ==========
            ChainAction::CreateEvent {
                organizer,
                details,
                funding,
            } => Self::create_event(state, env, organizer, details, funding),

            ChainAction::DeactivateEvent { caller, event_id } => state
                .registry
                .ensure_can_deactivate(event_id, caller, state.owner)
                .map(|()| {
                    Transaction::from_events(vec![ChainAction::EventDeactivated {
                        event_id,
                        by: caller,
                    }])
                }),

            ChainAction::BuyTicket {
                event_id,
                buyer,
                tier,
                payment,
            } => Self::buy_ticket(state, env, event_id, buyer, tier, payment),

            ChainAction::SetSupportedChain {
                caller,
                chain,
                enabled,
            } => state.ensure_owner(caller).map_err(Into::into).map(|()| {
                Transaction::from_events(vec![ChainAction::ChainSupportUpdated {
                    selector: chain,
                    enabled,
                }])
            }),

            ChainAction::SetTrustedSender {
                caller,
                chain,
                sender,
            } => state.ensure_owner(caller).map_err(Into::into).map(|()| {
                Transaction::from_events(vec![ChainAction::TrustedSenderUpdated { chain, sender }])
            }),

            ChainAction::FundTreasury { from, amount } => Ok(Transaction::from_events(vec![
                ChainAction::TreasuryFunded { from, amount },
            ])),

            ChainAction::WithdrawFees { caller } => Self::withdraw_fees(state, caller),

            ChainAction::Receive { envelope } => Self::receive(state, env, &envelope),

            // ========== Events (replay) ==========
            event => {
                Self::apply_event(state, &event);
                return Ok(SmallVec::new());
            },
        };

        match outcome {
            Ok(transaction) => Ok(Self::commit(state, env, transaction)),
            Err(error) => {
                metrics::record_rejection(error.label());
                Err(error)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::error::{StateError, ValidationError};
    use tickbridge_testing::assertions::{
        assert_effects_count, assert_no_effects, assert_published, assert_relayed_count, relayed,
    };
    use tickbridge_testing::{InMemoryEventBus, RecordingTransport, ReducerTest, test_clock};

    const HERE: ChainSelector = ChainSelector::SEPOLIA;
    const PEER: ChainSelector = ChainSelector::FUJI;

    fn owner() -> Address {
        Address::from_low_u64(1)
    }

    fn organizer() -> Address {
        Address::from_low_u64(0x0a)
    }

    fn buyer() -> Address {
        Address::from_low_u64(0xb0)
    }

    fn config() -> ChainConfig {
        ChainConfig::new(HERE, owner())
    }

    fn env() -> ChainEnvironment {
        ChainEnvironment::new(
            Arc::new(test_clock()),
            Arc::new(RecordingTransport::new()),
            Arc::new(InMemoryEventBus::<ChainAction>::new()),
        )
    }

    fn connected_state() -> ChainState {
        let mut state = ChainState::new(&config());
        state.allowlist.set_supported(PEER, true);
        state.messenger.set_trusted_sender(PEER, crate::config::derived_contract(PEER));
        state
    }

    fn meetup() -> NewEvent {
        NewEvent::new("Meetup", "desc", Amount::milli_ether(10), 100)
    }

    fn from_peer(payload: &Payload, nonce: u64) -> Envelope {
        Envelope {
            source: PEER,
            dest: HERE,
            sender: crate::config::derived_contract(PEER),
            receiver: crate::config::derived_contract(HERE),
            kind: payload.kind(),
            payload: payload.encode().unwrap(),
            nonce,
            fee_paid: Amount::ZERO,
        }
    }

    fn peer_event(sequence: u64, name: &str) -> Event {
        Event {
            id: EventId::new(PEER, sequence),
            organizer: organizer(),
            name: name.to_string(),
            description: "desc".to_string(),
            ticket_price: Amount::milli_ether(5),
            total_tickets: 10,
            sold_tickets: 0,
            is_active: true,
            origin_chain: PEER,
            mint_chain: HERE,
            created_at: DateTime::<Utc>::default(),
        }
    }

    fn apply(state: &mut ChainState, action: ChainAction) {
        ChainReducer::new().reduce(state, action, &env()).unwrap();
    }

    #[test]
    fn create_event_assigns_id_and_mirrors_to_peer() {
        let state = connected_state();
        let fee = state
            .estimate_event_creation_fees("Meetup", "desc", Amount::milli_ether(10), 100)
            .unwrap();

        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(ChainAction::CreateEvent {
                organizer: organizer(),
                details: meetup(),
                funding: fee,
            })
            .then_state(move |state| {
                let event = state.registry.get(EventId::new(HERE, 1)).unwrap();
                assert!(event.is_active);
                assert_eq!(event.sold_tickets, 0);
                assert_eq!(event.origin_chain, HERE);
                assert_eq!(state.treasury.balance(), Amount::ZERO);
                assert_eq!(state.messenger.last_nonce(PEER), 1);
            })
            .then_effects(move |effects| {
                assert_relayed_count(effects, PayloadKind::EventMirror, 1);
                assert_eq!(relayed(effects)[0].fee_paid, fee);
                assert_published(effects, |e| {
                    matches!(e, ChainAction::EventCreated { event } if event.id == EventId::new(HERE, 1))
                });
            })
            .run();
    }

    #[test]
    fn create_event_without_enough_funding_changes_nothing() {
        let state = connected_state();
        let fee = state
            .estimate_event_creation_fees("Meetup", "desc", Amount::milli_ether(10), 100)
            .unwrap();
        let short = fee.saturating_sub(Amount::new(1));

        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(ChainAction::CreateEvent {
                organizer: organizer(),
                details: meetup(),
                funding: short,
            })
            .then_error(move |error| {
                assert_eq!(
                    *error,
                    TicketingError::from(FundingError::InsufficientPayment {
                        required: fee,
                        provided: short,
                    })
                );
            })
            .then_state(|state| {
                assert!(state.registry.is_empty());
                assert_eq!(state.treasury.balance(), Amount::ZERO);
                assert_eq!(state.messenger.last_nonce(PEER), 0);
            })
            .run();
    }

    #[test]
    fn create_event_rejects_zero_price() {
        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(connected_state())
            .when_action(ChainAction::CreateEvent {
                organizer: organizer(),
                details: NewEvent::new("Meetup", "desc", Amount::ZERO, 100),
                funding: Amount::ether(1),
            })
            .then_error(|error| {
                assert_eq!(*error, TicketingError::from(ValidationError::ZeroPrice));
            })
            .run();
    }

    #[test]
    fn create_event_on_unsupported_mint_chain_is_refused() {
        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(connected_state())
            .when_action(ChainAction::CreateEvent {
                organizer: organizer(),
                details: meetup().minted_on(ChainSelector::AMOY),
                funding: Amount::ether(1),
            })
            .then_error(|error| {
                assert_eq!(*error, TicketingError::from(TransportError::UnsupportedChain(ChainSelector::AMOY)));
            })
            .run();
    }

    #[test]
    fn local_purchase_mints_and_records_sale() {
        let mut state = ChainState::new(&config());
        apply(
            &mut state,
            ChainAction::CreateEvent {
                organizer: organizer(),
                details: meetup(),
                funding: Amount::ZERO,
            },
        );

        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(ChainAction::BuyTicket {
                event_id: EventId::new(HERE, 1),
                buyer: buyer(),
                tier: Tier::Vip,
                payment: Amount::milli_ether(10),
            })
            .then_state(|state| {
                assert!(state.issuer.has_ticket_for_event(EventId::new(HERE, 1), buyer()));
                assert_eq!(state.registry.get(EventId::new(HERE, 1)).unwrap().sold_tickets, 1);
                assert_eq!(state.treasury.balance(), Amount::milli_ether(10));
            })
            .then_effects(|effects| {
                assert_effects_count(effects, 3);
                assert_relayed_count(effects, PayloadKind::TicketSoldNotice, 0);
            })
            .run();
    }

    #[test]
    fn second_purchase_by_same_buyer_is_a_duplicate() {
        let mut state = ChainState::new(&config());
        apply(
            &mut state,
            ChainAction::CreateEvent {
                organizer: organizer(),
                details: meetup(),
                funding: Amount::ZERO,
            },
        );
        let buy = ChainAction::BuyTicket {
            event_id: EventId::new(HERE, 1),
            buyer: buyer(),
            tier: Tier::Vip,
            payment: Amount::milli_ether(10),
        };
        apply(&mut state, buy.clone());

        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(buy)
            .then_error(|error| {
                assert_eq!(
                    *error,
                    TicketingError::from(StateError::DuplicateTicket {
                        event_id: EventId::new(HERE, 1),
                        buyer: buyer()
                    })
                );
            })
            .then_state(|state| {
                assert_eq!(state.issuer.total_minted(), 1);
                assert_eq!(state.registry.get(EventId::new(HERE, 1)).unwrap().sold_tickets, 1);
            })
            .run();
    }

    #[test]
    fn purchase_of_unknown_event_is_not_found() {
        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(ChainState::new(&config()))
            .when_action(ChainAction::BuyTicket {
                event_id: EventId::new(HERE, 42),
                buyer: buyer(),
                tier: Tier::General,
                payment: Amount::ether(1),
            })
            .then_error(|error| {
                assert_eq!(*error, TicketingError::from(StateError::EventNotFound(EventId::new(HERE, 42))));
            })
            .run();
    }

    #[test]
    fn withdraw_requires_owner_and_drains() {
        let mut state = ChainState::new(&config());
        apply(
            &mut state,
            ChainAction::FundTreasury {
                from: buyer(),
                amount: Amount::ether(1),
            },
        );

        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(state.clone())
            .when_action(ChainAction::WithdrawFees { caller: buyer() })
            .then_error(|error| {
                assert_eq!(*error, TicketingError::from(AuthorizationError::NotOwner(buyer())));
            })
            .then_state(|state| assert_eq!(state.treasury.balance(), Amount::ether(1)))
            .run();

        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(ChainAction::WithdrawFees { caller: owner() })
            .then_state(|state| assert_eq!(state.treasury.balance(), Amount::ZERO))
            .then_effects(|effects| {
                assert_published(effects, |e| {
                    matches!(e, ChainAction::FeesWithdrawn { amount, .. } if *amount == Amount::ether(1))
                });
            })
            .run();
    }

    #[test]
    fn withdraw_from_empty_treasury_is_a_no_op() {
        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(ChainState::new(&config()))
            .when_action(ChainAction::WithdrawFees { caller: owner() })
            .then_effects(|effects| assert_no_effects(effects))
            .run();
    }

    #[test]
    fn inbound_from_unlisted_chain_changes_nothing() {
        let mut state = ChainState::new(&config());
        state.messenger.set_trusted_sender(PEER, crate::config::derived_contract(PEER));

        let envelope = Envelope {
            source: PEER,
            dest: HERE,
            sender: crate::config::derived_contract(PEER),
            receiver: crate::config::derived_contract(HERE),
            kind: PayloadKind::TicketSoldNotice,
            payload: Payload::TicketSoldNotice(TicketSoldNotice {
                event_id: EventId::new(HERE, 1),
                ticket_id: TicketId::new(1),
                buyer: buyer(),
            })
            .encode()
            .unwrap(),
            nonce: 1,
            fee_paid: Amount::ZERO,
        };

        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(ChainAction::Receive { envelope })
            .then_error(|error| {
                assert_eq!(*error, TicketingError::from(TransportError::UnsupportedChain(PEER)));
            })
            .then_state(|state| assert!(!state.messenger.has_seen(PEER, 1)))
            .run();
    }

    #[test]
    fn mirror_sharing_a_local_sequence_is_kept_apart() {
        let mut state = connected_state();
        let fee = state
            .estimate_event_creation_fees("Meetup", "desc", Amount::milli_ether(10), 100)
            .unwrap();
        apply(
            &mut state,
            ChainAction::CreateEvent {
                organizer: organizer(),
                details: meetup(),
                funding: fee,
            },
        );
        let mirror = Payload::EventMirror(EventMirror {
            event: peer_event(1, "Gala"),
        });

        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(ChainAction::Receive {
                envelope: from_peer(&mirror, 1),
            })
            .then_state(|state| {
                assert_eq!(state.registry.len(), 2);
                assert_eq!(state.registry.get(EventId::new(HERE, 1)).unwrap().name, "Meetup");
                assert_eq!(state.registry.get(EventId::new(PEER, 1)).unwrap().name, "Gala");
                assert_eq!(state.registry.next_id(), EventId::new(HERE, 2));
            })
            .then_effects(|effects| {
                assert_published(effects, |e| {
                    matches!(e, ChainAction::EventMirrored { event } if event.id == EventId::new(PEER, 1))
                });
            })
            .run();
    }

    #[test]
    fn mirror_with_foreign_id_is_malformed() {
        let mut event = peer_event(1, "Gala");
        event.id = EventId::new(ChainSelector::AMOY, 1);
        let mirror = Payload::EventMirror(EventMirror { event });

        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(connected_state())
            .when_action(ChainAction::Receive {
                envelope: from_peer(&mirror, 1),
            })
            .then_error(|error| {
                assert!(matches!(
                    error,
                    TicketingError::Transport(TransportError::MalformedPayload(_))
                ));
            })
            .then_state(|state| {
                assert!(state.registry.is_empty());
                assert!(!state.messenger.has_seen(PEER, 1));
            })
            .run();
    }

    #[test]
    fn sale_notice_for_an_event_created_elsewhere_is_malformed() {
        let mut state = connected_state();
        apply(
            &mut state,
            ChainAction::EventMirrored {
                event: peer_event(1, "Gala"),
            },
        );
        let notice = Payload::TicketSoldNotice(TicketSoldNotice {
            event_id: EventId::new(PEER, 1),
            ticket_id: TicketId::new(1),
            buyer: buyer(),
        });

        ReducerTest::new(ChainReducer::new())
            .with_env(env())
            .given_state(state)
            .when_action(ChainAction::Receive {
                envelope: from_peer(&notice, 1),
            })
            .then_error(|error| {
                assert!(matches!(
                    error,
                    TicketingError::Transport(TransportError::MalformedPayload(_))
                ));
            })
            .then_state(|state| {
                assert_eq!(state.registry.get(EventId::new(PEER, 1)).unwrap().sold_tickets, 0);
            })
            .run();
    }

    #[test]
    fn replayed_events_rebuild_state_without_effects() {
        let mut state = ChainState::new(&config());
        let effects = ChainReducer::new()
            .reduce(
                &mut state,
                ChainAction::ChainSupportUpdated {
                    selector: PEER,
                    enabled: true,
                },
                &env(),
            )
            .unwrap();

        assert!(effects.is_empty());
        assert!(state.allowlist.is_supported(PEER));
    }
}
