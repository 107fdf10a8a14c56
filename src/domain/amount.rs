//! Amount type
//!
//! Domain primitive for currency amounts. Amounts are whole units and are
//! validated at construction time, so a non-positive amount cannot reach the
//! ledger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount represents a validated, strictly positive number of currency units.
///
/// # Invariants
/// - Value is always positive (> 0)
///
/// # Example
/// ```
/// use currency_ledger::domain::Amount;
///
/// let amount = Amount::new(50).unwrap();
/// assert_eq!(amount.value(), 50);
/// assert!(Amount::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Amount(i64);

/// Errors that can occur when creating an Amount
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("Amount must be positive (got {0})")]
    NotPositive(i64),
}

impl Amount {
    /// Create a new Amount with validation.
    ///
    /// # Errors
    /// - `AmountError::NotPositive` if value <= 0
    pub fn new(value: i64) -> Result<Self, AmountError> {
        if value <= 0 {
            return Err(AmountError::NotPositive(value));
        }
        Ok(Self(value))
    }

    /// Get the underlying number of units.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Amount {
    type Error = AmountError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Amount::new(value)
    }
}

impl From<Amount> for i64 {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_amount() {
        let amount = Amount::new(75).unwrap();
        assert_eq!(amount.value(), 75);
        assert_eq!(amount.to_string(), "75");
    }

    #[test]
    fn test_zero_and_negative_rejected() {
        assert_eq!(Amount::new(0), Err(AmountError::NotPositive(0)));
        assert_eq!(Amount::new(-10), Err(AmountError::NotPositive(-10)));
    }

    #[test]
    fn test_serde_validates() {
        let amount: Amount = serde_json::from_str("10").unwrap();
        assert_eq!(amount.value(), 10);

        let result: Result<Amount, _> = serde_json::from_str("-1");
        assert!(result.is_err());
    }
}
