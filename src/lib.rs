//! Currency Ledger Library
//!
//! Reservation/compensation engine for per-user currency balances, driven
//! by request events on a message bus. Re-exports modules for integration
//! testing and the binary.

pub mod config;
pub mod db;
pub mod dispatcher;
pub mod domain;
pub mod handlers;
pub mod ledger;
pub mod messaging;
mod error;

pub use config::Config;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use domain::{Amount, Balance, CurrencyType, DomainError, ReasonCode, TransactionStatus};
pub use error::{AppError, AppResult};
