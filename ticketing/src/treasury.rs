//! Native funds used to pay outbound message fees.

use crate::error::FundingError;
use serde::{Deserialize, Serialize};
use tickbridge_core::chain::Amount;

/// Fee treasury of one chain
///
/// The balance never goes negative: every debit is checked first, and a
/// failed check leaves the balance unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeTreasury {
    balance: Amount,
}

impl FeeTreasury {
    /// Empty treasury
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance
    #[must_use]
    pub const fn balance(&self) -> Amount {
        self.balance
    }

    /// Unconditional inbound transfer
    pub fn credit(&mut self, amount: Amount) {
        self.balance = self.balance.saturating_add(amount);
    }

    /// Check that `fee` could be paid out of `available`
    ///
    /// # Errors
    ///
    /// Returns [`FundingError::InsufficientTreasuryBalance`] when it cannot.
    pub const fn ensure_covers(available: Amount, fee: Amount) -> Result<(), FundingError> {
        if available.units() < fee.units() {
            Err(FundingError::InsufficientTreasuryBalance {
                required: fee,
                available,
            })
        } else {
            Ok(())
        }
    }

    /// Pay `fee` out of the balance
    ///
    /// # Errors
    ///
    /// Returns [`FundingError::InsufficientTreasuryBalance`] if the balance is
    /// below `fee`; the balance is unchanged in that case.
    pub fn debit(&mut self, fee: Amount) -> Result<(), FundingError> {
        Self::ensure_covers(self.balance, fee)?;
        self.balance = self.balance.saturating_sub(fee);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_below_balance_fails_without_change() {
        let mut treasury = FeeTreasury::new();
        treasury.credit(Amount::new(50));

        assert_eq!(
            treasury.debit(Amount::new(51)),
            Err(FundingError::InsufficientTreasuryBalance {
                required: Amount::new(51),
                available: Amount::new(50),
            })
        );
        assert_eq!(treasury.balance(), Amount::new(50));

        assert!(treasury.debit(Amount::new(50)).is_ok());
        assert_eq!(treasury.balance(), Amount::ZERO);
    }
}
