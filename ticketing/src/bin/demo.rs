//! Two-chain walkthrough over the in-process relay.
//!
//! Runs Sepolia and Fuji coordinators side by side, creates two events on
//! Sepolia (one minted there, one on Fuji), buys tickets locally and across
//! chains, and finally prints the collected Prometheus metrics.
//!
//! ```bash
//! RUST_LOG=tickbridge=debug cargo run --bin tickbridge-demo
//! ```

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tickbridge::config::ChainConfig;
use tickbridge::{ChainAction, ChainEnvironment, ChainNode, NewEvent, Purchase, Tier};
use tickbridge_core::chain::{Address, Amount, ChainSelector};
use tickbridge_core::environment::SystemClock;
use tickbridge_runtime::{LocalRelay, TracingEventBus};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tickbridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    tickbridge_runtime::metrics::register_runtime_metrics();
    tickbridge::metrics::register_business_metrics();

    let relay = Arc::new(LocalRelay::new());
    let sepolia_config = ChainConfig::from_env();
    let sepolia_config = if sepolia_config.chain == ChainSelector::LOCALHOST {
        ChainConfig::new(ChainSelector::SEPOLIA, sepolia_config.owner).with_fees(sepolia_config.fees)
    } else {
        sepolia_config
    };
    let fuji_config = ChainConfig::new(ChainSelector::FUJI, Address::from_low_u64(2))
        .with_fees(sepolia_config.fees.clone());

    let sepolia = Arc::new(start_chain(&sepolia_config, &relay));
    let fuji = Arc::new(start_chain(&fuji_config, &relay));
    relay.register(sepolia_config.chain, sepolia.clone());
    relay.register(fuji_config.chain, fuji.clone());

    connect(&sepolia, &sepolia_config, &fuji_config).await?;
    connect(&fuji, &fuji_config, &sepolia_config).await?;
    tracing::info!(
        sepolia = %sepolia_config.chain,
        fuji = %fuji_config.chain,
        "chains connected"
    );

    let organizer = Address::from_low_u64(0x0a);
    let alice = Address::from_low_u64(0xa1);
    let bob = Address::from_low_u64(0xb0);

    // Event minted on Sepolia, mirrored to Fuji
    let price = Amount::milli_ether(10);
    let funding = sepolia
        .estimate_event_creation_fees("RustConf", "Ferris and friends", price, 100)
        .await?;
    let rustconf = sepolia
        .create_event(
            organizer,
            NewEvent::new("RustConf", "Ferris and friends", price, 100),
            funding,
        )
        .await?;
    tracing::info!(event_id = %rustconf, %funding, "event created on Sepolia");

    // Event created on Sepolia whose tickets live on Fuji
    let funding = sepolia
        .estimate_event_creation_fees("Bridge Night", "Cross-chain meetup", price, 2)
        .await?;
    let bridge_night = sepolia
        .create_event(
            organizer,
            NewEvent::new("Bridge Night", "Cross-chain meetup", price, 2).minted_on(fuji_config.chain),
            funding,
        )
        .await?;

    report(relay.flush().await);

    // Local mint on Sepolia
    let Purchase::Minted(ticket) = sepolia.buy_ticket(rustconf, alice, Tier::Vip, price).await? else {
        anyhow::bail!("purchase on the mint chain was forwarded");
    };
    let holder = sepolia.owner_of(ticket).await;
    tracing::info!(%ticket, ?holder, "minted on Sepolia");

    // Bought on Fuji, minted on Sepolia; the surplus pays the intent fee
    let purchase = fuji
        .buy_ticket(rustconf, bob, Tier::General, price.saturating_add(Amount::milli_ether(1)))
        .await?;
    tracing::info!(?purchase, "bought on Fuji");
    report(relay.flush().await);

    // Minted on Fuji, which notifies Sepolia
    fuji.fund(bob, Amount::milli_ether(1)).await?;
    fuji.buy_ticket_legacy(bridge_night, bob, price).await?;
    report(relay.flush().await);

    let sold = sepolia.get_event(bridge_night).await?.sold_tickets;
    let sepolia_tickets = sepolia.get_total_tickets().await;
    let fuji_tickets = fuji.get_total_tickets().await;
    tracing::info!(
        sepolia_tickets,
        fuji_tickets,
        bridge_night_sold_on_origin = sold,
        "ticket totals"
    );

    let owner = sepolia.owner().await;
    let withdrawn = sepolia.withdraw_fees(owner).await?;
    tracing::info!(%withdrawn, "Sepolia fees withdrawn");

    println!("{}", prometheus.render());
    Ok(())
}

fn start_chain(config: &ChainConfig, relay: &Arc<LocalRelay>) -> ChainNode {
    let environment = ChainEnvironment::new(
        Arc::new(SystemClock),
        relay.clone(),
        Arc::new(TracingEventBus::<ChainAction>::new(config.chain.to_string())),
    );
    ChainNode::new(config, environment)
}

async fn connect(node: &ChainNode, local: &ChainConfig, remote: &ChainConfig) -> anyhow::Result<()> {
    node.set_supported_chain(local.owner, remote.chain, true).await?;
    node.set_trusted_sender(local.owner, remote.chain, remote.contract)
        .await?;
    Ok(())
}

fn report(flush: tickbridge_runtime::FlushReport) {
    if flush.is_clean() {
        tracing::info!(delivered = flush.delivered, "relay flushed");
    } else {
        for (envelope, reason) in &flush.failed {
            tracing::warn!(message_id = %envelope.id(), %reason, "delivery refused");
        }
        for envelope in &flush.unroutable {
            tracing::warn!(message_id = %envelope.id(), "delivery unroutable");
        }
    }
}
