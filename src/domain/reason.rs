//! Reason codes reported back to requesting services

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of rejection reasons carried in `error_message`.
///
/// These are expected outcomes, not failures of this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    InvalidCost,
    UserNotFound,
    InvalidCurrency,
    InsufficientFunds,
    TransactionNotFound,
}

/// Value of `error_message` when a request succeeded.
pub const NO_ERROR: &str = "null";

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::InvalidCost => "invalid_cost",
            ReasonCode::UserNotFound => "user_not_found",
            ReasonCode::InvalidCurrency => "invalid_currency",
            ReasonCode::InsufficientFunds => "insufficient_funds",
            ReasonCode::TransactionNotFound => "transaction_not_found",
        }
    }

    /// Render an optional reason the way the response payload expects it.
    pub fn message(reason: Option<ReasonCode>) -> String {
        reason.map_or(NO_ERROR, |r| r.as_str()).to_string()
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_code_strings() {
        assert_eq!(ReasonCode::InvalidCost.to_string(), "invalid_cost");
        assert_eq!(
            serde_json::to_string(&ReasonCode::TransactionNotFound).unwrap(),
            "\"transaction_not_found\""
        );
    }

    #[test]
    fn test_message_uses_null_literal_on_success() {
        assert_eq!(ReasonCode::message(None), "null");
        assert_eq!(
            ReasonCode::message(Some(ReasonCode::UserNotFound)),
            "user_not_found"
        );
    }
}
