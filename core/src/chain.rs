//! Chain selectors, account addresses and native amounts.
//!
//! These are the value objects every message and state record is keyed on.
//! Selectors are opaque 64-bit identifiers assigned by the messaging
//! protocol; the known testnet selectors are the ones the deployment
//! scripts use.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Chain selector
// ============================================================================

/// Opaque identifier of a ledger within the messaging protocol
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainSelector(u64);

impl ChainSelector {
    /// Ethereum Sepolia
    pub const SEPOLIA: Self = Self(16_015_286_601_757_825_753);
    /// Avalanche Fuji
    pub const FUJI: Self = Self(14_767_482_510_784_806_043);
    /// Polygon Amoy
    pub const AMOY: Self = Self(16_281_711_391_670_634_445);
    /// Local development chain
    pub const LOCALHOST: Self = Self(0);

    /// Creates a selector from its raw value
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw selector value
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Looks up a well-known network by name
    #[must_use]
    pub fn from_network_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "sepolia" | "ethereum" => Some(Self::SEPOLIA),
            "fuji" | "avalanche" => Some(Self::FUJI),
            "amoy" | "polygon" => Some(Self::AMOY),
            "localhost" | "hardhat" => Some(Self::LOCALHOST),
            _ => None,
        }
    }

    /// Name of the network, if this is a well-known selector
    #[must_use]
    pub const fn network_name(self) -> Option<&'static str> {
        match self {
            Self::SEPOLIA => Some("sepolia"),
            Self::FUJI => Some("fuji"),
            Self::AMOY => Some("amoy"),
            Self::LOCALHOST => Some("localhost"),
            _ => None,
        }
    }
}

impl fmt::Display for ChainSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.network_name() {
            Some(name) => write!(f, "{name}({})", self.0),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Error parsing a chain selector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid chain selector '{0}': expected a network name or an unsigned 64-bit integer")]
pub struct ParseChainSelectorError(String);

impl FromStr for ChainSelector {
    type Err = ParseChainSelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(known) = Self::from_network_name(s) {
            return Ok(known);
        }
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseChainSelectorError(s.to_string()))
    }
}

// ============================================================================
// Address
// ============================================================================

/// 20-byte account or contract address
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Address([u8; 20]);

impl Address {
    /// The zero address
    pub const ZERO: Self = Self([0; 20]);

    /// Creates an address from raw bytes
    #[must_use]
    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an address whose low 8 bytes hold `value` (big-endian)
    ///
    /// Handy for deterministic test accounts and derived contract addresses.
    #[must_use]
    pub fn from_low_u64(value: u64) -> Self {
        let mut bytes = [0u8; 20];
        bytes[12..].copy_from_slice(&value.to_be_bytes());
        Self(bytes)
    }

    /// Returns the raw bytes
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Checks for the zero address
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == [0; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// Error parsing a hex address
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseAddressError {
    /// Wrong number of hex digits
    #[error("address must be 40 hex digits, got {0}")]
    InvalidLength(usize),

    /// A character outside `[0-9a-fA-F]`
    #[error("invalid hex digit '{0}' in address")]
    InvalidDigit(char),
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if let Some(bad) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ParseAddressError::InvalidDigit(bad));
        }
        if hex.len() != 40 {
            return Err(ParseAddressError::InvalidLength(hex.len()));
        }

        let mut bytes = [0u8; 20];
        for (slot, pair) in bytes.iter_mut().zip(hex.as_bytes().chunks_exact(2)) {
            *slot = (hex_value(pair[0]) << 4) | hex_value(pair[1]);
        }
        Ok(Self(bytes))
    }
}

// Caller has already checked the digit is ASCII hex.
const fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

// ============================================================================
// Amount
// ============================================================================

/// Native currency amount in the smallest unit (wei-like)
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Amount(u128);

impl Amount {
    /// Zero
    pub const ZERO: Self = Self(0);

    const UNITS_PER_ETHER: u128 = 1_000_000_000_000_000_000;

    /// Creates an amount from smallest units
    #[must_use]
    pub const fn new(units: u128) -> Self {
        Self(units)
    }

    /// Whole units of the native currency
    #[must_use]
    pub const fn ether(whole: u128) -> Self {
        Self(whole * Self::UNITS_PER_ETHER)
    }

    /// Thousandths of the native currency (`milli_ether(10)` is `0.01`)
    #[must_use]
    pub const fn milli_ether(milli: u128) -> Self {
        Self(milli * (Self::UNITS_PER_ETHER / 1_000))
    }

    /// Returns the amount in smallest units
    #[must_use]
    pub const fn units(self) -> u128 {
        self.0
    }

    /// Checks if this amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Addition that returns `None` on overflow
    #[must_use]
    pub const fn checked_add(self, other: Self) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Subtraction that returns `None` when `other > self`
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    /// Addition clamped at the maximum representable amount
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtraction clamped at zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / Self::UNITS_PER_ETHER;
        let frac = self.0 % Self::UNITS_PER_ETHER;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:018}");
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}
