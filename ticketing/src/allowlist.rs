//! Owner-controlled set of counterparty chains.
//!
//! Consulted before every send and every receive: a chain that is not
//! currently supported can neither be a destination nor a source.

use crate::error::TransportError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tickbridge_core::chain::ChainSelector;

/// Supported counterparty chains
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainAllowlist {
    supported: BTreeSet<ChainSelector>,
}

impl ChainAllowlist {
    /// Empty allowlist
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `chain` is currently supported
    #[must_use]
    pub fn is_supported(&self, chain: ChainSelector) -> bool {
        self.supported.contains(&chain)
    }

    /// Fail with `UnsupportedChain` unless `chain` is supported
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::UnsupportedChain`] for chains not on the list.
    pub fn ensure_supported(&self, chain: ChainSelector) -> Result<(), TransportError> {
        if self.is_supported(chain) {
            Ok(())
        } else {
            Err(TransportError::UnsupportedChain(chain))
        }
    }

    /// Flip membership; returns whether anything changed
    pub fn set_supported(&mut self, chain: ChainSelector, enabled: bool) -> bool {
        if enabled {
            self.supported.insert(chain)
        } else {
            self.supported.remove(&chain)
        }
    }

    /// Supported chains in ascending selector order
    pub fn supported(&self) -> impl Iterator<Item = ChainSelector> + '_ {
        self.supported.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_flips_and_orders_ascending() {
        let mut allowlist = ChainAllowlist::new();
        assert!(allowlist.set_supported(ChainSelector::AMOY, true));
        assert!(allowlist.set_supported(ChainSelector::FUJI, true));
        assert!(!allowlist.set_supported(ChainSelector::FUJI, true));

        let chains: Vec<_> = allowlist.supported().collect();
        assert_eq!(chains, vec![ChainSelector::FUJI, ChainSelector::AMOY]);

        assert!(allowlist.set_supported(ChainSelector::FUJI, false));
        assert_eq!(
            allowlist.ensure_supported(ChainSelector::FUJI),
            Err(TransportError::UnsupportedChain(ChainSelector::FUJI))
        );
        assert!(allowlist.ensure_supported(ChainSelector::AMOY).is_ok());
    }
}
