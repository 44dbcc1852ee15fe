//! Business metrics for cross-chain ticketing.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `tickbridge_events_created_total` - Events created on this chain
//! - `tickbridge_events_mirrored_total` - Mirrors applied from other chains
//! - `tickbridge_tickets_sold_total` - Tickets minted
//! - `tickbridge_messages_sent_total{kind}` - Outbound messages by payload kind
//! - `tickbridge_messages_received_total{kind}` - Inbound messages applied
//! - `tickbridge_messages_duplicate_total` - Redeliveries absorbed
//! - `tickbridge_fees_withdrawn_total` - Withdrawals by the owner
//! - `tickbridge_operations_rejected_total{class}` - Refused operations by error class

use metrics::describe_counter;
use tickbridge_core::message::PayloadKind;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "tickbridge_events_created_total",
        "Total number of events created on this chain"
    );
    describe_counter!(
        "tickbridge_events_mirrored_total",
        "Total number of event mirrors applied from other chains"
    );
    describe_counter!("tickbridge_tickets_sold_total", "Total number of tickets minted");
    describe_counter!(
        "tickbridge_messages_sent_total",
        "Outbound cross-chain messages by payload kind"
    );
    describe_counter!(
        "tickbridge_messages_received_total",
        "Inbound cross-chain messages applied, by payload kind"
    );
    describe_counter!(
        "tickbridge_messages_duplicate_total",
        "Inbound redeliveries absorbed as no-ops"
    );
    describe_counter!(
        "tickbridge_fees_withdrawn_total",
        "Total number of fee withdrawals"
    );
    describe_counter!(
        "tickbridge_operations_rejected_total",
        "Refused chain operations by error class"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record an event created.
pub fn record_event_created() {
    metrics::counter!("tickbridge_events_created_total").increment(1);
}

/// Record a mirror applied.
pub fn record_event_mirrored() {
    metrics::counter!("tickbridge_events_mirrored_total").increment(1);
}

/// Record a ticket minted.
pub fn record_ticket_sold() {
    metrics::counter!("tickbridge_tickets_sold_total").increment(1);
}

/// Record an outbound message.
pub fn record_message_sent(kind: PayloadKind) {
    metrics::counter!("tickbridge_messages_sent_total", "kind" => kind.as_str()).increment(1);
}

/// Record an inbound message applied.
pub fn record_message_received(kind: PayloadKind) {
    metrics::counter!("tickbridge_messages_received_total", "kind" => kind.as_str()).increment(1);
}

/// Record a redelivery absorbed.
pub fn record_duplicate_message() {
    metrics::counter!("tickbridge_messages_duplicate_total").increment(1);
}

/// Record a fee withdrawal.
pub fn record_fees_withdrawn() {
    metrics::counter!("tickbridge_fees_withdrawn_total").increment(1);
}

/// Record a refused operation.
///
/// # Arguments
///
/// * `class` - Error class label (e.g. "state", "funding")
pub fn record_rejection(class: &'static str) {
    metrics::counter!("tickbridge_operations_rejected_total", "class" => class).increment(1);
}
