//! Currencies and per-user balances

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{Amount, DomainError};

/// Currency namespaces held on a balance row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrencyType {
    Gold,
    GuildRage,
}

impl CurrencyType {
    /// Stored and wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyType::Gold => "GOLD",
            CurrencyType::GuildRage => "GUILD_RAGE",
        }
    }

    /// Column of the `balance` table holding this currency
    pub fn column(&self) -> &'static str {
        match self {
            CurrencyType::Gold => "gold",
            CurrencyType::GuildRage => "guild_rage",
        }
    }
}

impl fmt::Display for CurrencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses case-insensitively, so `"gold"` and `"GOLD"` are the same currency.
impl FromStr for CurrencyType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GOLD" => Ok(CurrencyType::Gold),
            "GUILD_RAGE" => Ok(CurrencyType::GuildRage),
            _ => Err(DomainError::UnknownCurrency(s.to_string())),
        }
    }
}

/// One balance row: every currency a user holds.
///
/// # Invariants
/// - No currency column ever goes negative
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub user_id: i64,
    pub gold: i64,
    pub guild_rage: i64,
}

impl Balance {
    pub fn new(user_id: i64, gold: i64, guild_rage: i64) -> Self {
        Self {
            user_id,
            gold,
            guild_rage,
        }
    }

    /// Current units held in `currency`
    pub fn get(&self, currency: CurrencyType) -> i64 {
        match currency {
            CurrencyType::Gold => self.gold,
            CurrencyType::GuildRage => self.guild_rage,
        }
    }

    fn slot_mut(&mut self, currency: CurrencyType) -> &mut i64 {
        match currency {
            CurrencyType::Gold => &mut self.gold,
            CurrencyType::GuildRage => &mut self.guild_rage,
        }
    }

    /// Debit `amount` if the balance covers it and return the new value.
    ///
    /// # Errors
    /// - `DomainError::InsufficientFunds` if the balance would go negative
    pub fn debit_if_sufficient(
        &mut self,
        currency: CurrencyType,
        amount: Amount,
    ) -> Result<i64, DomainError> {
        let available = self.get(currency);
        if available < amount.value() {
            return Err(DomainError::insufficient_funds(amount.value(), available));
        }
        let slot = self.slot_mut(currency);
        *slot -= amount.value();
        Ok(*slot)
    }

    /// Credit `amount` and return the new value.
    ///
    /// # Errors
    /// - `DomainError::BalanceOverflow` if the column would overflow
    pub fn credit(&mut self, currency: CurrencyType, amount: Amount) -> Result<i64, DomainError> {
        let slot = self.slot_mut(currency);
        *slot = slot
            .checked_add(amount.value())
            .ok_or(DomainError::BalanceOverflow(currency))?;
        Ok(*slot)
    }
}
