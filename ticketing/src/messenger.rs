//! Cross-chain messaging: fees, payloads, sending and authenticated receipt.
//!
//! Outbound, an [`Outbox`] plans the sends of one transaction: it checks the
//! allowlist and the funds available, prices every payload and assigns
//! nonces, without touching state. The reducer commits the plan by applying
//! `MessageSent` events.
//!
//! Inbound, [`CrossChainMessenger::authenticate`] runs the checks every
//! envelope must pass before its payload is dispatched (destination, trusted
//! sender, allowlist) and reports redeliveries, keyed on `(source, nonce)`.

use crate::allowlist::ChainAllowlist;
use crate::error::{TicketingError, TransportError};
use crate::treasury::FeeTreasury;
use crate::types::{Event, EventId, TicketId, Tier};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tickbridge_core::chain::{Address, Amount, ChainSelector};
use tickbridge_core::codec::{self, CodecError};
use tickbridge_core::message::{Envelope, MessageId, PayloadKind};

// ============================================================================
// Fees
// ============================================================================

/// Outbound fee schedule: `base + per_byte × payload_len + premium(dest)`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    /// Flat protocol cost per message
    pub base: Amount,
    /// Cost per payload byte
    pub per_byte: Amount,
    /// Premium for destinations without a specific one
    pub default_premium: Amount,
    /// Per-destination premiums
    #[serde(default)]
    pub premiums: BTreeMap<ChainSelector, Amount>,
}

impl FeeSchedule {
    /// Schedule with no per-destination premiums
    #[must_use]
    pub const fn new(base: Amount, per_byte: Amount, default_premium: Amount) -> Self {
        Self {
            base,
            per_byte,
            default_premium,
            premiums: BTreeMap::new(),
        }
    }

    /// Set the premium charged for messages to `dest`
    #[must_use]
    pub fn with_premium(mut self, dest: ChainSelector, premium: Amount) -> Self {
        self.premiums.insert(dest, premium);
        self
    }

    /// Premium for `dest`
    #[must_use]
    pub fn premium(&self, dest: ChainSelector) -> Amount {
        self.premiums
            .get(&dest)
            .copied()
            .unwrap_or(self.default_premium)
    }

    /// Fee for a payload of `payload_len` bytes sent to `dest`
    #[must_use]
    pub fn estimate(&self, dest: ChainSelector, payload_len: usize) -> Amount {
        let len = u128::try_from(payload_len).unwrap_or(u128::MAX);
        let per_byte = Amount::new(self.per_byte.units().saturating_mul(len));
        self.base
            .saturating_add(per_byte)
            .saturating_add(self.premium(dest))
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Replica of an event, sent by its origin chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMirror {
    /// The event as recorded on the origin chain
    pub event: Event,
}

/// A sale on the mint chain, reported to the event's origin chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSoldNotice {
    /// Event sold
    pub event_id: EventId,
    /// Ticket minted
    pub ticket_id: TicketId,
    /// Buyer
    pub buyer: Address,
}

/// A purchase made on a non-mint chain, forwarded to the mint chain
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseIntent {
    /// Event to buy a ticket for
    pub event_id: EventId,
    /// Buyer
    pub buyer: Address,
    /// Requested tier
    pub tier: Tier,
    /// Amount paid on the forwarding chain
    pub payment: Amount,
}

/// Decoded payload of an envelope
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// See [`EventMirror`]
    EventMirror(EventMirror),
    /// See [`TicketSoldNotice`]
    TicketSoldNotice(TicketSoldNotice),
    /// See [`PurchaseIntent`]
    PurchaseIntent(PurchaseIntent),
}

impl Payload {
    /// Kind carried in the envelope
    #[must_use]
    pub const fn kind(&self) -> PayloadKind {
        match self {
            Self::EventMirror(_) => PayloadKind::EventMirror,
            Self::TicketSoldNotice(_) => PayloadKind::TicketSoldNotice,
            Self::PurchaseIntent(_) => PayloadKind::PurchaseIntent,
        }
    }

    /// Encode to wire bytes
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if the payload exceeds the size limit.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::EventMirror(p) => codec::encode(p),
            Self::TicketSoldNotice(p) => codec::encode(p),
            Self::PurchaseIntent(p) => codec::encode(p),
        }
    }

    /// Decode wire bytes declared as `kind`
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MalformedPayload`] if the bytes are not a
    /// valid payload of that kind.
    pub fn decode(kind: PayloadKind, bytes: &[u8]) -> Result<Self, TransportError> {
        Ok(match kind {
            PayloadKind::EventMirror => Self::EventMirror(codec::decode(bytes)?),
            PayloadKind::TicketSoldNotice => Self::TicketSoldNotice(codec::decode(bytes)?),
            PayloadKind::PurchaseIntent => Self::PurchaseIntent(codec::decode(bytes)?),
        })
    }
}

// ============================================================================
// Messenger
// ============================================================================

/// Outcome of authenticating an inbound envelope
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// First delivery; dispatch the payload
    Fresh,
    /// `(source, nonce)` already applied; nothing to do
    Duplicate,
}

/// Messaging state of one chain
#[derive(Clone, Debug)]
pub struct CrossChainMessenger {
    chain: ChainSelector,
    contract: Address,
    fees: FeeSchedule,
    trusted_senders: BTreeMap<ChainSelector, Address>,
    last_nonce: BTreeMap<ChainSelector, u64>,
    seen: HashMap<ChainSelector, HashSet<u64>>,
}

impl CrossChainMessenger {
    /// Messenger for `chain`, stamping `contract` as the sender of outbound
    /// envelopes
    #[must_use]
    pub fn new(chain: ChainSelector, contract: Address, fees: FeeSchedule) -> Self {
        Self {
            chain,
            contract,
            fees,
            trusted_senders: BTreeMap::new(),
            last_nonce: BTreeMap::new(),
            seen: HashMap::new(),
        }
    }

    /// This chain
    #[must_use]
    pub const fn chain(&self) -> ChainSelector {
        self.chain
    }

    /// This chain's contract address
    #[must_use]
    pub const fn contract(&self) -> Address {
        self.contract
    }

    /// Fee schedule
    #[must_use]
    pub const fn fees(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Fee for sending `payload` bytes to `dest`
    #[must_use]
    pub fn estimate_fee(&self, dest: ChainSelector, payload: &[u8]) -> Amount {
        self.fees.estimate(dest, payload.len())
    }

    /// Fee for sending `payload` to `dest`
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the payload cannot be encoded.
    pub fn estimate_payload_fee(
        &self,
        dest: ChainSelector,
        payload: &Payload,
    ) -> Result<Amount, CodecError> {
        Ok(self.estimate_fee(dest, &payload.encode()?))
    }

    /// The one address accepted as sender of messages from `chain`
    #[must_use]
    pub fn trusted_sender(&self, chain: ChainSelector) -> Option<Address> {
        self.trusted_senders.get(&chain).copied()
    }

    /// Configure the trusted sender for `chain`
    pub fn set_trusted_sender(&mut self, chain: ChainSelector, sender: Address) {
        self.trusted_senders.insert(chain, sender);
    }

    /// Last nonce used towards `dest` (0 before the first send)
    #[must_use]
    pub fn last_nonce(&self, dest: ChainSelector) -> u64 {
        self.last_nonce.get(&dest).copied().unwrap_or(0)
    }

    /// Start planning the sends of one transaction
    ///
    /// `available` is what the treasury will hold once the transaction's
    /// inbound funds are credited.
    #[must_use]
    pub fn outbox<'a>(&'a self, allowlist: &'a ChainAllowlist, available: Amount) -> Outbox<'a> {
        Outbox {
            messenger: self,
            allowlist,
            available,
            reserved: BTreeMap::new(),
            envelopes: Vec::new(),
        }
    }

    /// Commit a planned send's nonce
    pub fn record_sent(&mut self, id: MessageId) {
        let last = self.last_nonce.entry(id.dest).or_insert(0);
        *last = (*last).max(id.nonce);
    }

    /// Check an inbound envelope before dispatch
    ///
    /// # Errors
    ///
    /// - [`TransportError::MisroutedMessage`] if addressed to another chain
    /// - [`TransportError::UntrustedSender`] unless the sender is the trusted
    ///   address configured for the source chain
    /// - [`TransportError::UnsupportedChain`] if the source is not allowlisted
    pub fn authenticate(
        &self,
        allowlist: &ChainAllowlist,
        envelope: &Envelope,
    ) -> Result<Delivery, TransportError> {
        if envelope.dest != self.chain {
            return Err(TransportError::MisroutedMessage {
                expected: self.chain,
                actual: envelope.dest,
            });
        }
        if self.trusted_sender(envelope.source) != Some(envelope.sender) {
            return Err(TransportError::UntrustedSender {
                chain: envelope.source,
                sender: envelope.sender,
            });
        }
        allowlist.ensure_supported(envelope.source)?;

        if self.has_seen(envelope.source, envelope.nonce) {
            Ok(Delivery::Duplicate)
        } else {
            Ok(Delivery::Fresh)
        }
    }

    /// Whether `(source, nonce)` has been applied
    #[must_use]
    pub fn has_seen(&self, source: ChainSelector, nonce: u64) -> bool {
        self.seen
            .get(&source)
            .is_some_and(|nonces| nonces.contains(&nonce))
    }

    /// Record `(source, nonce)` as applied
    pub fn mark_seen(&mut self, source: ChainSelector, nonce: u64) {
        self.seen.entry(source).or_default().insert(nonce);
    }
}

/// Sends planned within one transaction
///
/// Every planned send has passed the allowlist and funding checks against
/// the running balance, so committing the whole plan cannot fail halfway.
#[derive(Debug)]
pub struct Outbox<'a> {
    messenger: &'a CrossChainMessenger,
    allowlist: &'a ChainAllowlist,
    available: Amount,
    reserved: BTreeMap<ChainSelector, u64>,
    envelopes: Vec<Envelope>,
}

impl Outbox<'_> {
    /// Plan a send of `payload` to `dest`
    ///
    /// # Errors
    ///
    /// - [`TransportError::UnsupportedChain`] if `dest` is this chain or not
    ///   allowlisted
    /// - [`crate::error::FundingError::InsufficientTreasuryBalance`] if the
    ///   funds left cannot cover the fee
    /// - [`TransportError::MalformedPayload`] if the payload cannot be encoded
    pub fn send(&mut self, dest: ChainSelector, payload: &Payload) -> Result<MessageId, TicketingError> {
        if dest == self.messenger.chain {
            return Err(TransportError::UnsupportedChain(dest).into());
        }
        self.allowlist.ensure_supported(dest)?;

        let bytes = payload.encode()?;
        let fee = self.messenger.estimate_fee(dest, &bytes);
        FeeTreasury::ensure_covers(self.available, fee)?;

        let nonce = self
            .reserved
            .get(&dest)
            .copied()
            .unwrap_or_else(|| self.messenger.last_nonce(dest))
            + 1;
        self.reserved.insert(dest, nonce);
        self.available = self.available.saturating_sub(fee);

        let envelope = Envelope {
            source: self.messenger.chain,
            dest,
            sender: self.messenger.contract,
            receiver: self.messenger.trusted_sender(dest).unwrap_or(Address::ZERO),
            kind: payload.kind(),
            payload: bytes,
            nonce,
            fee_paid: fee,
        };
        let id = envelope.id();
        self.envelopes.push(envelope);
        Ok(id)
    }

    /// Planned envelopes, in planning order
    #[must_use]
    pub fn into_envelopes(self) -> Vec<Envelope> {
        self.envelopes
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::error::FundingError;

    const HERE: ChainSelector = ChainSelector::SEPOLIA;
    const PEER: ChainSelector = ChainSelector::FUJI;

    fn messenger() -> CrossChainMessenger {
        let fees = FeeSchedule::new(Amount::new(1_000), Amount::new(10), Amount::ZERO)
            .with_premium(PEER, Amount::new(500));
        let mut messenger = CrossChainMessenger::new(HERE, Address::from_low_u64(0xa), fees);
        messenger.set_trusted_sender(PEER, Address::from_low_u64(0xb));
        messenger
    }

    fn allowlist() -> ChainAllowlist {
        let mut allowlist = ChainAllowlist::new();
        allowlist.set_supported(PEER, true);
        allowlist
    }

    fn notice() -> Payload {
        Payload::TicketSoldNotice(TicketSoldNotice {
            event_id: EventId::new(PEER, 1),
            ticket_id: TicketId::new(1),
            buyer: Address::from_low_u64(9),
        })
    }

    fn inbound(nonce: u64) -> Envelope {
        Envelope {
            source: PEER,
            dest: HERE,
            sender: Address::from_low_u64(0xb),
            receiver: Address::from_low_u64(0xa),
            kind: PayloadKind::TicketSoldNotice,
            payload: notice().encode().unwrap(),
            nonce,
            fee_paid: Amount::ZERO,
        }
    }

    #[test]
    fn fee_is_base_plus_bytes_plus_premium() {
        let messenger = messenger();
        assert_eq!(messenger.estimate_fee(PEER, &[0; 4]), Amount::new(1_000 + 40 + 500));
        assert_eq!(
            messenger.estimate_fee(ChainSelector::AMOY, &[]),
            Amount::new(1_000)
        );
    }

    #[test]
    fn outbox_assigns_consecutive_nonces_and_tracks_funds() {
        let messenger = messenger();
        let allowlist = allowlist();
        let fee = messenger.estimate_payload_fee(PEER, &notice()).unwrap();

        let mut outbox = messenger.outbox(&allowlist, fee.saturating_add(fee));
        assert_eq!(outbox.send(PEER, &notice()).unwrap().nonce, 1);
        assert_eq!(outbox.send(PEER, &notice()).unwrap().nonce, 2);
        assert_eq!(
            outbox.send(PEER, &notice()),
            Err(FundingError::InsufficientTreasuryBalance {
                required: fee,
                available: Amount::ZERO,
            }
            .into())
        );
        let planned: Amount = outbox.into_envelopes().iter().map(|e| e.fee_paid).sum();
        assert_eq!(planned, fee.saturating_add(fee));
    }

    #[test]
    fn outbox_refuses_unsupported_and_own_chain() {
        let messenger = messenger();
        let allowlist = allowlist();
        let mut outbox = messenger.outbox(&allowlist, Amount::ether(1));

        assert_eq!(
            outbox.send(ChainSelector::AMOY, &notice()),
            Err(TransportError::UnsupportedChain(ChainSelector::AMOY).into())
        );
        assert_eq!(
            outbox.send(HERE, &notice()),
            Err(TransportError::UnsupportedChain(HERE).into())
        );
        assert!(outbox.into_envelopes().is_empty());
    }

    #[test]
    fn authenticate_checks_sender_then_allowlist_then_nonce() {
        let mut messenger = messenger();
        let mut allowlist = allowlist();

        let mut forged = inbound(1);
        forged.sender = Address::from_low_u64(0xbad);
        assert!(matches!(
            messenger.authenticate(&allowlist, &forged),
            Err(TransportError::UntrustedSender { .. })
        ));

        assert_eq!(messenger.authenticate(&allowlist, &inbound(1)), Ok(Delivery::Fresh));
        messenger.mark_seen(PEER, 1);
        assert_eq!(
            messenger.authenticate(&allowlist, &inbound(1)),
            Ok(Delivery::Duplicate)
        );

        allowlist.set_supported(PEER, false);
        assert_eq!(
            messenger.authenticate(&allowlist, &inbound(2)),
            Err(TransportError::UnsupportedChain(PEER))
        );
    }

    #[test]
    fn misrouted_envelopes_are_refused() {
        let messenger = messenger();
        let mut envelope = inbound(1);
        envelope.dest = ChainSelector::AMOY;
        assert_eq!(
            messenger.authenticate(&allowlist(), &envelope),
            Err(TransportError::MisroutedMessage {
                expected: HERE,
                actual: ChainSelector::AMOY,
            })
        );
    }

    #[test]
    fn payload_bytes_must_match_declared_kind() {
        let bytes = notice().encode().unwrap();
        assert!(matches!(
            Payload::decode(PayloadKind::EventMirror, &bytes),
            Err(TransportError::MalformedPayload(_))
        ));
        assert_eq!(
            Payload::decode(PayloadKind::TicketSoldNotice, &bytes).unwrap(),
            notice()
        );
    }
}
