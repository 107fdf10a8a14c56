//! Guild War Handler
//!
//! Guild wars cost a fixed amount of guild rage. Declaring one is a
//! reservation under `guild:<correlation_id>`; a war that ends up declined,
//! canceled or expired is compensated. Any other war status is ignored.

use super::commands::{CompensateCommand, CompensateResult, ReserveCommand, ReserveResult};
use super::{CompensateHandler, ReserveHandler};
use crate::error::AppResult;

/// War statuses that give the reserved guild rage back
pub const COMPENSABLE_WAR_STATUSES: [&str; 3] = ["declined", "canceled", "expired"];

/// Whether a reported war status releases the reservation
pub fn is_compensable_war_status(status: &str) -> bool {
    COMPENSABLE_WAR_STATUSES
        .iter()
        .any(|s| s.eq_ignore_ascii_case(status.trim()))
}

/// Handler for guild war reservations
#[derive(Clone)]
pub struct GuildWarHandler {
    reserve: ReserveHandler,
    compensate: CompensateHandler,
}

impl GuildWarHandler {
    pub fn new(reserve: ReserveHandler, compensate: CompensateHandler) -> Self {
        Self {
            reserve,
            compensate,
        }
    }

    /// Reserve the war cost from the guild owner
    pub async fn declare(&self, correlation_id: &str, owner_id: i64) -> AppResult<ReserveResult> {
        self.reserve
            .execute(ReserveCommand::guild_war(correlation_id, owner_id))
            .await
    }

    /// Compensate the war cost when `status` releases it.
    ///
    /// Returns `None`, without touching the ledger, for any other status.
    pub async fn settle(
        &self,
        correlation_id: &str,
        owner_id: i64,
        status: &str,
    ) -> AppResult<Option<CompensateResult>> {
        if !is_compensable_war_status(status) {
            tracing::info!(correlation_id, owner_id, status, "War status needs no compensation");
            return Ok(None);
        }

        let result = self
            .compensate
            .execute(CompensateCommand::guild_war(correlation_id, owner_id))
            .await?;

        Ok(Some(result))
    }
}
