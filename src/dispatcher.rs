//! Message Dispatcher
//!
//! Turns one inbound message into at most a handful of outbound events:
//! classify the topic, decode the payload, run the matching handler, then
//! publish the reply and any telemetry. Messages are processed strictly one
//! at a time; nothing here ever propagates an error out of the loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;

use crate::domain::MessageContext;
use crate::error::AppResult;
use crate::handlers::{
    BalanceChange, CompensateCommand, CompensateHandler, GuildWarHandler, ReserveCommand,
    ReserveHandler,
};
use crate::ledger::LedgerStore;
use crate::messaging::payloads::{
    CurrencyChangeFact, GuildWarDeclareResponse, ShopBalanceResponse,
};
use crate::messaging::{
    EventEmitter, InboundEvent, InboundMessage, MessageSource, OutboundEvent, RequestKind,
};

/// Pause after a failed broker receive before polling again
const RECEIVE_ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// What became of one inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Handled; `published` outbound events were accepted by the broker
    Handled { kind: RequestKind, published: usize },
    /// Topic is not one this service consumes
    UnknownTopic,
    /// Payload could not be decoded
    Malformed,
    /// Handler failed; nothing was published
    Failed,
}

/// Routes inbound messages to handlers and replies through the emitter
#[derive(Clone)]
pub struct Dispatcher {
    reserve: ReserveHandler,
    compensate: CompensateHandler,
    guild: GuildWarHandler,
    emitter: EventEmitter,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn LedgerStore>, emitter: EventEmitter) -> Self {
        let reserve = ReserveHandler::new(store.clone());
        let compensate = CompensateHandler::new(store);
        let guild = GuildWarHandler::new(reserve.clone(), compensate.clone());

        Self {
            reserve,
            compensate,
            guild,
            emitter,
        }
    }

    /// Process one message end to end. Never fails; every error is logged.
    pub async fn dispatch(&self, message: &InboundMessage) -> DispatchOutcome {
        let mut context = MessageContext::new(message.topic.clone());
        if let (Some(partition), Some(offset)) = (message.partition, message.offset) {
            context = context.with_position(partition, offset);
        }

        let span = tracing::info_span!(
            "message",
            message_id = %context.message_id,
            topic = %context.topic,
            partition = context.partition,
            offset = context.offset,
        );

        self.dispatch_in_span(message).instrument(span).await
    }

    async fn dispatch_in_span(&self, message: &InboundMessage) -> DispatchOutcome {
        let Some(kind) = self.emitter.topics().classify(&message.topic) else {
            tracing::warn!("Message on unknown topic ignored");
            return DispatchOutcome::UnknownTopic;
        };

        tracing::info!(%kind, "Message received");

        let events = match self.process(kind, message).await {
            Ok(events) => events,
            Err(e) if e.is_malformed_input() => {
                tracing::warn!(%kind, error = %e, "Malformed message dropped");
                return DispatchOutcome::Malformed;
            }
            Err(e) => {
                tracing::error!(
                    %kind,
                    error = %e,
                    error_code = e.error_code(),
                    "Message processing failed, no response sent"
                );
                return DispatchOutcome::Failed;
            }
        };

        let mut published = 0;
        for event in &events {
            if self.emitter.emit(event).await {
                published += 1;
            }
        }

        DispatchOutcome::Handled { kind, published }
    }

    /// Decode and handle a classified message, returning the events to publish.
    ///
    /// # Errors
    /// - `AppError::Malformed` if the payload cannot be decoded
    /// - any handler error; the ledger is left untouched in that case
    pub async fn process(
        &self,
        kind: RequestKind,
        message: &InboundMessage,
    ) -> AppResult<Vec<OutboundEvent>> {
        let mut events = Vec::new();

        match InboundEvent::decode(kind, message.payload())? {
            InboundEvent::ReserveShop(request) => {
                let result = self
                    .reserve
                    .execute(ReserveCommand::shop(
                        &request.transaction_id,
                        request.user_id,
                        request.cost,
                        &request.currency_type,
                    ))
                    .await?;

                events.extend(currency_fact(request.user_id, result.balance_change));
                events.push(OutboundEvent::ShopReserveResponse(ShopBalanceResponse::new(
                    request.transaction_id,
                    request.user_id,
                    result.success,
                    result.reason,
                )));
            }
            InboundEvent::CompensateShop(request) => {
                let result = self
                    .compensate
                    .execute(CompensateCommand::shop(
                        &request.transaction_id,
                        request.user_id,
                        request.cost,
                        &request.currency_type,
                    ))
                    .await?;

                events.extend(currency_fact(request.user_id, result.balance_change));
                events.push(OutboundEvent::ShopCompensateResponse(ShopBalanceResponse::new(
                    request.transaction_id,
                    request.user_id,
                    result.success,
                    result.reason,
                )));
            }
            InboundEvent::DeclareGuildWar(request) => {
                let result = self
                    .guild
                    .declare(&request.correlation_id, request.initiator_owner_id)
                    .await?;

                events.push(OutboundEvent::GuildWarDeclareResponse(GuildWarDeclareResponse {
                    initiator_guild_id: request.initiator_guild_id,
                    initiator_owner_id: request.initiator_owner_id,
                    correlation_id: request.correlation_id,
                    success: result.success,
                }));
            }
            InboundEvent::CompensateGuildWar(request) => {
                // The guild service expects no reply to a settlement
                let result = self
                    .guild
                    .settle(
                        &request.correlation_id,
                        request.initiator_owner_id,
                        &request.status,
                    )
                    .await?;

                if let Some(result) = result {
                    tracing::info!(
                        correlation_id = %request.correlation_id,
                        owner_id = request.initiator_owner_id,
                        success = result.success,
                        reason = ?result.reason,
                        "Guild war settled"
                    );
                }
            }
        }

        Ok(events)
    }

    /// Consume until `shutdown` resolves.
    ///
    /// Each message is dispatched and acknowledged before the next poll.
    pub async fn run<S, F>(&self, source: &mut S, shutdown: F)
    where
        S: MessageSource,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("Dispatcher started");

        loop {
            let next = tokio::select! {
                _ = &mut shutdown => break,
                next = source.next_message() => next,
            };

            match next {
                Ok(Some(message)) => {
                    let outcome = self.dispatch_and_ack(source, &message).await;
                    tracing::debug!(?outcome, "Message settled");
                }
                Ok(None) => tokio::task::yield_now().await,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive message");
                    tokio::time::sleep(RECEIVE_ERROR_BACKOFF).await;
                }
            }
        }

        tracing::info!("Dispatcher stopped");
    }

    /// Dispatch every queued message until the source reports an empty poll.
    ///
    /// Returns the outcome of each message in order.
    pub async fn drain<S: MessageSource>(&self, source: &mut S) -> Vec<DispatchOutcome> {
        let mut outcomes = Vec::new();

        loop {
            match source.next_message().await {
                Ok(Some(message)) => {
                    outcomes.push(self.dispatch_and_ack(source, &message).await);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to receive message");
                    break;
                }
            }
        }

        outcomes
    }

    async fn dispatch_and_ack<S: MessageSource>(
        &self,
        source: &mut S,
        message: &InboundMessage,
    ) -> DispatchOutcome {
        let outcome = self.dispatch(message).await;

        // Commit even when the message was dropped, so it is not redelivered forever
        if let Err(e) = source.ack(message).await {
            tracing::warn!(
                topic = %message.topic,
                error = %e,
                "Failed to commit offset (message may be redelivered)"
            );
        }

        outcome
    }
}

/// Telemetry for a settled gold movement
fn currency_fact(user_id: i64, change: Option<BalanceChange>) -> Option<OutboundEvent> {
    change
        .and_then(|c| CurrencyChangeFact::for_change(user_id, c.currency, c.balance_after))
        .map(OutboundEvent::CurrencyChanged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Balance, CurrencyType};
    use crate::ledger::InMemoryLedgerStore;
    use crate::messaging::{InMemoryPublisher, ResponseKind, Topics};

    fn dispatcher(store: &InMemoryLedgerStore) -> (Dispatcher, InMemoryPublisher, Topics) {
        let publisher = InMemoryPublisher::new();
        let topics = Topics::new("auth", None, 1);
        let emitter = EventEmitter::new(Arc::new(publisher.clone()), topics.clone());
        (
            Dispatcher::new(Arc::new(store.clone()), emitter),
            publisher,
            topics,
        )
    }

    #[test]
    fn test_currency_fact_only_for_gold_changes() {
        let gold = BalanceChange {
            currency: CurrencyType::Gold,
            balance_after: 5,
        };
        let rage = BalanceChange {
            currency: CurrencyType::GuildRage,
            balance_after: 5,
        };

        assert!(matches!(
            currency_fact(1, Some(gold)),
            Some(OutboundEvent::CurrencyChanged(CurrencyChangeFact { user_id: 1, gold: 5 }))
        ));
        assert!(currency_fact(1, Some(rage)).is_none());
        assert!(currency_fact(1, None).is_none());
    }

    #[tokio::test]
    async fn test_unknown_topic_is_ignored() {
        let store = InMemoryLedgerStore::new();
        let (dispatcher, publisher, _) = dispatcher(&store);

        let outcome = dispatcher
            .dispatch(&InboundMessage::new("payments.request", b"{}".to_vec()))
            .await;

        assert_eq!(outcome, DispatchOutcome::UnknownTopic);
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped() {
        let store = InMemoryLedgerStore::new();
        store.insert_balance(Balance::new(1, 100, 0)).await;
        let (dispatcher, publisher, topics) = dispatcher(&store);
        let topic = topics.inbound(RequestKind::ReserveShop);

        let missing_cost = InboundMessage::new(
            topic,
            br#"{"transaction_id":"tx1","user_id":1,"currency_type":"GOLD"}"#.to_vec(),
        );
        let empty = InboundMessage {
            payload: None,
            ..InboundMessage::new(topic, Vec::new())
        };

        assert_eq!(dispatcher.dispatch(&missing_cost).await, DispatchOutcome::Malformed);
        assert_eq!(dispatcher.dispatch(&empty).await, DispatchOutcome::Malformed);
        assert!(publisher.published().is_empty());
        assert!(store.transactions().await.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_publishes_nothing() {
        let store = InMemoryLedgerStore::new();
        store.insert_balance(Balance::new(1, 100, 0)).await;
        store.set_unavailable(true);
        let (dispatcher, publisher, topics) = dispatcher(&store);

        let outcome = dispatcher
            .dispatch(&InboundMessage::new(
                topics.inbound(RequestKind::ReserveShop),
                br#"{"transaction_id":"tx1","user_id":1,"cost":5,"currency_type":"GOLD"}"#.to_vec(),
            ))
            .await;

        assert_eq!(outcome, DispatchOutcome::Failed);
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let store = InMemoryLedgerStore::new();
        let (dispatcher, _, _) = dispatcher(&store);
        let mut source = crate::messaging::InMemorySource::default();

        dispatcher.run(&mut source, async {}).await;

        assert!(source.acked().is_empty());
    }

    #[tokio::test]
    async fn test_run_settles_queued_message_before_shutdown() {
        let store = InMemoryLedgerStore::new();
        store.insert_balance(Balance::new(1, 100, 0)).await;
        let (dispatcher, publisher, topics) = dispatcher(&store);
        let mut source = crate::messaging::InMemorySource::new([InboundMessage::new(
            topics.inbound(RequestKind::ReserveShop),
            br#"{"transaction_id":"tx1","user_id":1,"cost":40,"currency_type":"GOLD"}"#.to_vec(),
        )]);

        // Stop once the reply has gone out
        let replies = publisher.clone();
        let reply_topic = topics.outbound(ResponseKind::ShopReserve).to_string();
        let shutdown = async move {
            while replies.published_to(&reply_topic).is_empty() {
                tokio::task::yield_now().await;
            }
        };

        tokio::time::timeout(Duration::from_secs(5), dispatcher.run(&mut source, shutdown))
            .await
            .expect("dispatcher did not stop");

        assert!(source.is_drained());
        assert_eq!(source.acked().len(), 1);

        let reply: serde_json::Value = publisher
            .published_to(topics.outbound(ResponseKind::ShopReserve))[0]
            .json()
            .unwrap();
        assert_eq!(reply["success"], serde_json::json!(true));
        assert_eq!(
            store.get_balance(1).await.unwrap().map(|b| b.gold),
            Some(60)
        );
    }
}
