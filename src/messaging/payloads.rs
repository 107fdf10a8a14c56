//! Wire payloads
//!
//! JSON shapes exchanged with the shop, guild and scoreboard services, plus
//! the tagged inbound/outbound event enums the dispatcher works with.

use serde::{Deserialize, Serialize};

use crate::domain::{CurrencyType, ReasonCode};

use super::topics::{RequestKind, ResponseKind, Topics};

// =========================================================================
// Inbound
// =========================================================================

/// Shop reserve or compensate request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopBalanceRequest {
    pub transaction_id: String,
    pub user_id: i64,
    pub cost: i64,
    pub currency_type: String,
}

/// Guild asks to debit guild rage for a war declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildWarDeclareRequest {
    pub initiator_guild_id: i64,
    pub initiator_owner_id: i64,
    pub correlation_id: String,
}

/// Guild reports the fate of a declared war
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildWarCompensateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initiator_guild_id: Option<i64>,
    pub initiator_owner_id: i64,
    pub correlation_id: String,
    pub status: String,
}

/// Why an inbound payload could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Empty payload")]
    Empty,

    #[error("Payload is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("Broker error delivered as payload: {0}")]
    BrokerError(String),

    #[error("Invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Prefix of error strings some brokers deliver in place of a payload.
const BROKER_ERROR_PREFIX: &str = "Subscribed topic not available";

/// A decoded inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    ReserveShop(ShopBalanceRequest),
    CompensateShop(ShopBalanceRequest),
    DeclareGuildWar(GuildWarDeclareRequest),
    CompensateGuildWar(GuildWarCompensateRequest),
}

impl InboundEvent {
    /// Decode a raw payload for a classified topic.
    ///
    /// # Errors
    /// - `DecodeError` when the payload is empty, not UTF-8, a broker error
    ///   string, or JSON that does not match the request shape
    pub fn decode(kind: RequestKind, payload: Option<&[u8]>) -> Result<Self, DecodeError> {
        let bytes = payload.filter(|p| !p.is_empty()).ok_or(DecodeError::Empty)?;
        let text = std::str::from_utf8(bytes)?;

        if text.starts_with(BROKER_ERROR_PREFIX) {
            return Err(DecodeError::BrokerError(text.to_string()));
        }

        Ok(match kind {
            RequestKind::ReserveShop => InboundEvent::ReserveShop(serde_json::from_str(text)?),
            RequestKind::CompensateShop => InboundEvent::CompensateShop(serde_json::from_str(text)?),
            RequestKind::DeclareGuildWar => {
                InboundEvent::DeclareGuildWar(serde_json::from_str(text)?)
            }
            RequestKind::CompensateGuildWar => {
                InboundEvent::CompensateGuildWar(serde_json::from_str(text)?)
            }
        })
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            InboundEvent::ReserveShop(_) => RequestKind::ReserveShop,
            InboundEvent::CompensateShop(_) => RequestKind::CompensateShop,
            InboundEvent::DeclareGuildWar(_) => RequestKind::DeclareGuildWar,
            InboundEvent::CompensateGuildWar(_) => RequestKind::CompensateGuildWar,
        }
    }
}

// =========================================================================
// Outbound
// =========================================================================

/// Reply to a shop reserve or compensate request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopBalanceResponse {
    /// Echoes the caller's id, without the `shop:` namespace
    pub transaction_id: String,
    pub user_id: i64,
    pub success: bool,
    /// Reason code, or the literal `"null"` on success
    pub error_message: String,
}

impl ShopBalanceResponse {
    pub fn new(
        transaction_id: impl Into<String>,
        user_id: i64,
        success: bool,
        reason: Option<ReasonCode>,
    ) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            user_id,
            success,
            error_message: ReasonCode::message(reason),
        }
    }
}

/// Reply to a guild war declaration. The guild service only reads `success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildWarDeclareResponse {
    pub initiator_guild_id: i64,
    pub initiator_owner_id: i64,
    pub correlation_id: String,
    pub success: bool,
}

/// Best-effort telemetry for the scoreboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyChangeFact {
    pub user_id: i64,
    pub gold: i64,
}

impl CurrencyChangeFact {
    /// Only gold movements are reported.
    pub fn for_change(user_id: i64, currency: CurrencyType, balance_after: i64) -> Option<Self> {
        (currency == CurrencyType::Gold).then_some(Self {
            user_id,
            gold: balance_after,
        })
    }
}

/// An event this service publishes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    ShopReserveResponse(ShopBalanceResponse),
    ShopCompensateResponse(ShopBalanceResponse),
    GuildWarDeclareResponse(GuildWarDeclareResponse),
    CurrencyChanged(CurrencyChangeFact),
}

impl OutboundEvent {
    pub fn response_kind(&self) -> ResponseKind {
        match self {
            OutboundEvent::ShopReserveResponse(_) => ResponseKind::ShopReserve,
            OutboundEvent::ShopCompensateResponse(_) => ResponseKind::ShopCompensate,
            OutboundEvent::GuildWarDeclareResponse(_) => ResponseKind::GuildWarDeclare,
            OutboundEvent::CurrencyChanged(_) => ResponseKind::CurrencyChanged,
        }
    }

    pub fn topic<'a>(&self, topics: &'a Topics) -> &'a str {
        topics.outbound(self.response_kind())
    }

    /// Downstream service, for logs
    pub fn target_service(&self) -> &'static str {
        match self {
            OutboundEvent::ShopReserveResponse(_) | OutboundEvent::ShopCompensateResponse(_) => {
                "shop"
            }
            OutboundEvent::GuildWarDeclareResponse(_) => "guild",
            OutboundEvent::CurrencyChanged(_) => "scoreboard",
        }
    }

    /// Partition key; keeps every event of one user in order.
    pub fn key(&self) -> String {
        let user_id = match self {
            OutboundEvent::ShopReserveResponse(r) | OutboundEvent::ShopCompensateResponse(r) => {
                r.user_id
            }
            OutboundEvent::GuildWarDeclareResponse(r) => r.initiator_owner_id,
            OutboundEvent::CurrencyChanged(f) => f.user_id,
        };
        user_id.to_string()
    }

    /// # Errors
    /// - `serde_json::Error` if serialization fails
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            OutboundEvent::ShopReserveResponse(r) | OutboundEvent::ShopCompensateResponse(r) => {
                serde_json::to_vec(r)
            }
            OutboundEvent::GuildWarDeclareResponse(r) => serde_json::to_vec(r),
            OutboundEvent::CurrencyChanged(f) => serde_json::to_vec(f),
        }
    }
}
