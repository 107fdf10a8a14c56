//! Command definitions
//!
//! Commands carry the raw, not yet validated request values; handlers turn
//! them into domain types and report expected rejections as a
//! [`ReasonCode`] inside the result rather than as an error.

use crate::domain::{CurrencyType, ReasonCode, TransactionId};

/// Fixed price of declaring a guild war, in guild rage
pub const GUILD_WAR_COST: i64 = 10;

// =========================================================================
// Reservation
// =========================================================================

/// Command to reserve (debit) currency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveCommand {
    /// Namespaced id, e.g. `shop:<id>`
    pub transaction_id: TransactionId,
    pub user_id: i64,
    /// Currency name as received; matched case-insensitively
    pub currency_type: String,
    pub amount: i64,
}

impl ReserveCommand {
    pub fn new(
        transaction_id: TransactionId,
        user_id: i64,
        currency_type: impl Into<String>,
        amount: i64,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            currency_type: currency_type.into(),
            amount,
        }
    }

    /// Shop purchase: the caller's id is namespaced with `shop:`
    pub fn shop(transaction_id: &str, user_id: i64, cost: i64, currency_type: &str) -> Self {
        Self::new(TransactionId::shop(transaction_id), user_id, currency_type, cost)
    }

    /// Guild war declaration: fixed cost in guild rage
    pub fn guild_war(correlation_id: &str, owner_id: i64) -> Self {
        Self::new(
            TransactionId::guild(correlation_id),
            owner_id,
            CurrencyType::GuildRage.as_str(),
            GUILD_WAR_COST,
        )
    }
}

// =========================================================================
// Compensation
// =========================================================================

/// Command to compensate (credit back) a reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensateCommand {
    pub transaction_id: TransactionId,
    pub user_id: i64,
    /// Informational only; the recorded currency is credited
    pub currency_type: String,
    /// Validated, then only compared; the recorded amount is credited
    pub amount: i64,
}

impl CompensateCommand {
    pub fn new(
        transaction_id: TransactionId,
        user_id: i64,
        currency_type: impl Into<String>,
        amount: i64,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            currency_type: currency_type.into(),
            amount,
        }
    }

    pub fn shop(transaction_id: &str, user_id: i64, cost: i64, currency_type: &str) -> Self {
        Self::new(TransactionId::shop(transaction_id), user_id, currency_type, cost)
    }

    pub fn guild_war(correlation_id: &str, owner_id: i64) -> Self {
        Self::new(
            TransactionId::guild(correlation_id),
            owner_id,
            CurrencyType::GuildRage.as_str(),
            GUILD_WAR_COST,
        )
    }
}

// =========================================================================
// Results
// =========================================================================

/// Balance after a settled mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub currency: CurrencyType,
    pub balance_after: i64,
}

/// Result of a reservation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReserveResult {
    pub transaction_id: TransactionId,
    pub user_id: i64,
    pub success: bool,
    pub reason: Option<ReasonCode>,
    /// Set only when this call moved the balance
    pub balance_change: Option<BalanceChange>,
    /// The outcome was read back from an earlier delivery
    pub replayed: bool,
}

impl ReserveResult {
    pub fn reserved(transaction_id: TransactionId, user_id: i64, change: BalanceChange) -> Self {
        Self {
            transaction_id,
            user_id,
            success: true,
            reason: None,
            balance_change: Some(change),
            replayed: false,
        }
    }

    pub fn rejected(transaction_id: TransactionId, user_id: i64, reason: ReasonCode) -> Self {
        Self {
            transaction_id,
            user_id,
            success: false,
            reason: Some(reason),
            balance_change: None,
            replayed: false,
        }
    }

    pub fn replayed(
        transaction_id: TransactionId,
        user_id: i64,
        success: bool,
        reason: Option<ReasonCode>,
    ) -> Self {
        Self {
            transaction_id,
            user_id,
            success,
            reason,
            balance_change: None,
            replayed: true,
        }
    }
}

/// Result of a compensation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensateResult {
    pub transaction_id: TransactionId,
    pub user_id: i64,
    pub success: bool,
    pub reason: Option<ReasonCode>,
    pub balance_change: Option<BalanceChange>,
}

impl CompensateResult {
    pub fn compensated(transaction_id: TransactionId, user_id: i64, change: BalanceChange) -> Self {
        Self {
            transaction_id,
            user_id,
            success: true,
            reason: None,
            balance_change: Some(change),
        }
    }

    pub fn rejected(transaction_id: TransactionId, user_id: i64, reason: ReasonCode) -> Self {
        Self {
            transaction_id,
            user_id,
            success: false,
            reason: Some(reason),
            balance_change: None,
        }
    }
}
