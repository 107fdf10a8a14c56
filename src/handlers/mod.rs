//! Command Handlers module
//!
//! Handlers for the two legs of the currency saga. Each one validates a
//! command, runs a single ledger unit of work, and returns a result carrying
//! either success or a wire reason code.

mod commands;
mod compensate_handler;
mod guild_handler;
mod reserve_handler;


pub use commands::*;
pub use compensate_handler::CompensateHandler;
pub use guild_handler::{is_compensable_war_status, GuildWarHandler, COMPENSABLE_WAR_STATUSES};
pub use reserve_handler::ReserveHandler;
