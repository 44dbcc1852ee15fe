//! Configuration management for one chain.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::messenger::FeeSchedule;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use tickbridge_core::chain::{Address, Amount, ChainSelector};

/// Default base protocol cost per message (0.0001 native units)
pub const DEFAULT_FEE_BASE: u128 = 100_000_000_000_000;
/// Default cost per payload byte
pub const DEFAULT_FEE_PER_BYTE: u128 = 1_000_000_000;

/// Configuration of one chain's coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// The chain this coordinator runs on
    pub chain: ChainSelector,
    /// Owner account (allowlist, trusted senders, withdrawals)
    pub owner: Address,
    /// This chain's contract address, stamped as sender on outbound envelopes
    pub contract: Address,
    /// Mint chain used when event creation does not name one
    pub default_mint_chain: ChainSelector,
    /// Outbound fee schedule
    pub fees: FeeSchedule,
}

impl ChainConfig {
    /// Configuration with defaults for `chain` and `owner`
    #[must_use]
    pub fn new(chain: ChainSelector, owner: Address) -> Self {
        Self {
            chain,
            owner,
            contract: derived_contract(chain),
            default_mint_chain: chain,
            fees: FeeSchedule::new(
                Amount::new(DEFAULT_FEE_BASE),
                Amount::new(DEFAULT_FEE_PER_BYTE),
                Amount::ZERO,
            ),
        }
    }

    /// Use `mint_chain` when event creation does not name one
    #[must_use]
    pub fn with_default_mint_chain(mut self, mint_chain: ChainSelector) -> Self {
        self.default_mint_chain = mint_chain;
        self
    }

    /// Replace the fee schedule
    #[must_use]
    pub fn with_fees(mut self, fees: FeeSchedule) -> Self {
        self.fees = fees;
        self
    }

    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from a key lookup
    ///
    /// Unset or unparsable values fall back to their defaults.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `TICKBRIDGE_CHAIN` | `localhost` |
    /// | `TICKBRIDGE_OWNER` | `0x…01` |
    /// | `TICKBRIDGE_CONTRACT` | derived from the chain selector |
    /// | `TICKBRIDGE_DEFAULT_MINT_CHAIN` | this chain |
    /// | `TICKBRIDGE_FEE_BASE` | [`DEFAULT_FEE_BASE`] |
    /// | `TICKBRIDGE_FEE_PER_BYTE` | [`DEFAULT_FEE_PER_BYTE`] |
    /// | `TICKBRIDGE_FEE_PREMIUM` | `0` |
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let chain = parse_or(&lookup, "TICKBRIDGE_CHAIN", ChainSelector::LOCALHOST);
        let owner = parse_or(&lookup, "TICKBRIDGE_OWNER", Address::from_low_u64(1));

        Self {
            chain,
            owner,
            contract: parse_or(&lookup, "TICKBRIDGE_CONTRACT", derived_contract(chain)),
            default_mint_chain: parse_or(&lookup, "TICKBRIDGE_DEFAULT_MINT_CHAIN", chain),
            fees: FeeSchedule::new(
                Amount::new(parse_or(&lookup, "TICKBRIDGE_FEE_BASE", DEFAULT_FEE_BASE)),
                Amount::new(parse_or(&lookup, "TICKBRIDGE_FEE_PER_BYTE", DEFAULT_FEE_PER_BYTE)),
                Amount::new(parse_or(&lookup, "TICKBRIDGE_FEE_PREMIUM", 0)),
            ),
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    raw.trim().replace('_', "").parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
        default
    })
}

/// Contract address used when none is configured: `0xcc` followed by the
/// selector in the low bytes
#[must_use]
pub fn derived_contract(chain: ChainSelector) -> Address {
    let mut bytes = *Address::from_low_u64(chain.value()).as_bytes();
    bytes[0] = 0xcc;
    Address::new(bytes)
}
