//! Domain module
//!
//! Core domain types and business rules.

pub mod amount;
pub mod context;
pub mod currency;
pub mod error;
pub mod reason;
pub mod transaction;

pub use amount::{Amount, AmountError};
pub use context::MessageContext;
pub use currency::{Balance, CurrencyType};
pub use error::DomainError;
pub use reason::{ReasonCode, NO_ERROR};
pub use transaction::{LedgerTransaction, TransactionId, TransactionOrigin, TransactionStatus};
