//! Topic names
//!
//! Every topic this service reads or writes embeds the service name
//! (`<core>`), e.g. `shop.balance.reserve.request.auth`. Names are derived
//! once at startup and classification is a lookup, never string parsing.

use std::fmt;

/// Closed set of inbound request kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    ReserveShop,
    CompensateShop,
    DeclareGuildWar,
    CompensateGuildWar,
}

impl RequestKind {
    pub const ALL: [RequestKind; 4] = [
        RequestKind::ReserveShop,
        RequestKind::CompensateShop,
        RequestKind::DeclareGuildWar,
        RequestKind::CompensateGuildWar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::ReserveShop => "reserve_shop",
            RequestKind::CompensateShop => "compensate_shop",
            RequestKind::DeclareGuildWar => "declare_guild_war",
            RequestKind::CompensateGuildWar => "compensate_guild_war",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound topic selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKind {
    ShopReserve,
    ShopCompensate,
    GuildWarDeclare,
    CurrencyChanged,
}

/// Resolved topic names for one service instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    service: String,
    reserve_shop: String,
    compensate_shop: String,
    declare_guild_war: String,
    compensate_guild_war: String,
    shop_reserve_response: String,
    shop_compensate_response: String,
    guild_war_declare_response: String,
    currency_changed: String,
}

impl Topics {
    /// Derive all topic names.
    ///
    /// `telemetry_prefix` optionally namespaces the telemetry topic by
    /// environment (`prod.auth.fact.currency-change.1`).
    pub fn new(service: &str, telemetry_prefix: Option<&str>, telemetry_version: u32) -> Self {
        let fact = format!("{service}.fact.currency-change.{telemetry_version}");
        let currency_changed = match telemetry_prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}.{fact}"),
            _ => fact,
        };

        Self {
            service: service.to_string(),
            reserve_shop: format!("shop.balance.reserve.request.{service}"),
            compensate_shop: format!("shop.balance.compensate.request.{service}"),
            declare_guild_war: format!("guild.war.declare.request.{service}"),
            compensate_guild_war: format!("guild.war.compensate.request.{service}"),
            shop_reserve_response: format!("{service}.balance.reserve.response.shop"),
            shop_compensate_response: format!("{service}.balance.compensate.response.shop"),
            guild_war_declare_response: format!("{service}.war.declare.response.guild"),
            currency_changed,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn inbound(&self, kind: RequestKind) -> &str {
        match kind {
            RequestKind::ReserveShop => &self.reserve_shop,
            RequestKind::CompensateShop => &self.compensate_shop,
            RequestKind::DeclareGuildWar => &self.declare_guild_war,
            RequestKind::CompensateGuildWar => &self.compensate_guild_war,
        }
    }

    pub fn outbound(&self, kind: ResponseKind) -> &str {
        match kind {
            ResponseKind::ShopReserve => &self.shop_reserve_response,
            ResponseKind::ShopCompensate => &self.shop_compensate_response,
            ResponseKind::GuildWarDeclare => &self.guild_war_declare_response,
            ResponseKind::CurrencyChanged => &self.currency_changed,
        }
    }

    /// Topics the consumer subscribes to
    pub fn subscriptions(&self) -> Vec<&str> {
        RequestKind::ALL.iter().map(|k| self.inbound(*k)).collect()
    }

    /// Map an inbound topic to its request kind. Unknown topics yield `None`.
    pub fn classify(&self, topic: &str) -> Option<RequestKind> {
        RequestKind::ALL
            .into_iter()
            .find(|kind| self.inbound(*kind) == topic)
    }
}
