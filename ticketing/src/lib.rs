//! Tickbridge - cross-chain NFT ticketing coordinator
//!
//! One coordinator instance runs per chain. Events are created on an origin
//! chain and mirrored to every supported chain; tickets are minted only on
//! the event's mint chain, and purchases made elsewhere are forwarded there.
//! Chains talk exclusively through fee-paid, authenticated, de-duplicated
//! messages.
//!
//! # Architecture
//!
//! ```text
//!          Sepolia                                  Fuji
//! ┌───────────────────────┐              ┌───────────────────────┐
//! │ ChainNode             │              │ ChainNode             │
//! │  └ Store<ChainReducer>│              │  └ Store<ChainReducer>│
//! │     ├ ChainAllowlist  │  EventMirror │     ├ ChainAllowlist  │
//! │     ├ FeeTreasury     │ ───────────▶ │     ├ FeeTreasury     │
//! │     ├ Messenger       │ PurchaseIntent     ├ Messenger       │
//! │     ├ EventRegistry   │ ◀─────────── │     ├ EventRegistry   │
//! │     └ TicketIssuer    │ TicketSold   │     └ TicketIssuer    │
//! └───────────────────────┘   Notice     └───────────────────────┘
//!              ▲                                     ▲
//!              └──────────── Transport ──────────────┘
//!                 (at-least-once, unordered)
//! ```
//!
//! # Guarantees
//!
//! - A refused operation changes nothing (all checks precede all mutations).
//! - A message is applied at most once per `(source, nonce)`.
//! - `sold_tickets <= total_tickets` on every chain.
//! - At most one ticket per `(event, buyer)` on the mint chain.
//! - The treasury balance never goes negative.
//!
//! # Usage
//!
//! See [`node::ChainNode`] for the operations and [`chain`] for the reducer
//! and its tests.

#![forbid(unsafe_code)]

pub mod allowlist;
pub mod chain;
pub mod config;
pub mod error;
pub mod issuer;
pub mod messenger;
pub mod metrics;
pub mod node;
pub mod registry;
pub mod treasury;
pub mod types;

pub use chain::{ChainAction, ChainEnvironment, ChainReducer, ChainState};
pub use config::ChainConfig;
pub use error::{ErrorKind, TicketingError};
pub use messenger::{FeeSchedule, Payload};
pub use node::{ChainNode, Purchase};
pub use types::{Event, EventId, NewEvent, Ticket, TicketId, Tier};
