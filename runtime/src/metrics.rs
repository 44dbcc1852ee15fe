//! Runtime metrics.
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! host installs a recorder (the demo binary installs the Prometheus one).
//!
//! ## Counters
//! - `tickbridge_store_actions_total{outcome}` - transactions by outcome (committed, rejected)
//! - `tickbridge_store_effects_total{kind}` - executed effects by kind
//! - `tickbridge_relay_deliveries_total{outcome}` - relay deliveries by outcome

use ::metrics::{counter, describe_counter};

/// Transactions run by a store
pub const STORE_ACTIONS_TOTAL: &str = "tickbridge_store_actions_total";
/// Effects executed by a store
pub const STORE_EFFECTS_TOTAL: &str = "tickbridge_store_effects_total";
/// Envelopes delivered by the local relay
pub const RELAY_DELIVERIES_TOTAL: &str = "tickbridge_relay_deliveries_total";

/// Register descriptions for all runtime metrics.
///
/// Call once at startup, after installing a recorder.
pub fn register_runtime_metrics() {
    describe_counter!(
        STORE_ACTIONS_TOTAL,
        "Chain transactions by outcome (committed, rejected)"
    );
    describe_counter!(STORE_EFFECTS_TOTAL, "Effects executed after commit, by kind");
    describe_counter!(
        RELAY_DELIVERIES_TOTAL,
        "Relay deliveries by outcome (applied, failed, unroutable)"
    );
}

pub(crate) fn record_action(outcome: &'static str) {
    counter!(STORE_ACTIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_effect(kind: &'static str) {
    counter!(STORE_EFFECTS_TOTAL, "kind" => kind).increment(1);
}

pub(crate) fn record_delivery(outcome: &'static str) {
    counter!(RELAY_DELIVERIES_TOTAL, "outcome" => outcome).increment(1);
}
