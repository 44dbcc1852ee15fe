//! Shared fixtures: several chains wired together through a `LocalRelay`.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::Arc;
use tickbridge::config::ChainConfig;
use tickbridge::{ChainAction, ChainEnvironment, ChainNode, EventId, NewEvent};
use tickbridge_core::chain::{Address, Amount, ChainSelector};
use tickbridge_runtime::LocalRelay;
use tickbridge_testing::{InMemoryEventBus, test_clock};

pub const OWNER: Address = Address::new([
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1,
]);

pub fn organizer() -> Address {
    Address::from_low_u64(0x0a)
}

pub fn alice() -> Address {
    Address::from_low_u64(0xa1)
}

pub fn bob() -> Address {
    Address::from_low_u64(0xb0)
}

pub fn price() -> Amount {
    Amount::milli_ether(10)
}

struct Chain {
    config: ChainConfig,
    node: Arc<ChainNode>,
    events: Arc<InMemoryEventBus<ChainAction>>,
}

/// Chains that all support and trust each other
pub struct Network {
    pub relay: Arc<LocalRelay>,
    chains: BTreeMap<ChainSelector, Chain>,
}

impl Network {
    pub async fn connected(selectors: &[ChainSelector]) -> Self {
        let relay = Arc::new(LocalRelay::new());
        let mut chains = BTreeMap::new();

        for &selector in selectors {
            let config = ChainConfig::new(selector, OWNER);
            let events = Arc::new(InMemoryEventBus::<ChainAction>::new());
            let environment = ChainEnvironment::new(
                Arc::new(test_clock()),
                relay.clone(),
                events.clone(),
            );
            let node = Arc::new(ChainNode::new(&config, environment));
            relay.register(selector, node.clone());
            chains.insert(selector, Chain { config, node, events });
        }

        for local in chains.values() {
            for remote in chains.values() {
                if local.config.chain == remote.config.chain {
                    continue;
                }
                local
                    .node
                    .set_supported_chain(OWNER, remote.config.chain, true)
                    .await
                    .unwrap();
                local
                    .node
                    .set_trusted_sender(OWNER, remote.config.chain, remote.config.contract)
                    .await
                    .unwrap();
            }
        }

        Self { relay, chains }
    }

    pub fn node(&self, chain: ChainSelector) -> &ChainNode {
        &self.chains.get(&chain).expect("chain is part of the network").node
    }

    pub fn config(&self, chain: ChainSelector) -> &ChainConfig {
        &self.chains.get(&chain).expect("chain is part of the network").config
    }

    /// Domain events published by `chain` so far
    pub fn published(&self, chain: ChainSelector) -> Vec<ChainAction> {
        self.chains
            .get(&chain)
            .expect("chain is part of the network")
            .events
            .events()
    }

    /// Create an event on `origin`, paying exactly the estimated mirror fees
    pub async fn create_funded_event(&self, origin: ChainSelector, details: NewEvent) -> EventId {
        let node = self.node(origin);
        let funding = node
            .estimate_event_creation_fees(
                &details.name,
                &details.description,
                details.ticket_price,
                details.total_tickets,
            )
            .await
            .unwrap();
        node.create_event(organizer(), details, funding).await.unwrap()
    }
}

pub fn meetup(total_tickets: u32) -> NewEvent {
    NewEvent::new("Rust Meetup", "Ownership, borrowing and pizza", price(), total_tickets)
}
