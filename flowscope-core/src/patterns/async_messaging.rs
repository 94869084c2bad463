use crate::config::MAX_KAFKA_LAG_MS;
use crate::error::{FlowscopeError, FlowscopeResult};
use crate::event_log::LogKind;
use crate::models::{
    FlowKind, LedgerTable, PatternId, QueueStatus, QueuedEvent, RowTone, ServiceKind,
    ServiceStatus, Topology,
};
use crate::playback::{Scenario, ScenarioInfo, Step, StepContext};

use super::{
    ControlInfo, ControlKind, Indicator, PatternControl, PatternDefinition, PatternState,
    ViewState,
};

type Ctx = StepContext<AsyncMessagingState>;

/// Lag the consumer-lag scenario uses when the slider is lower.
const BURST_LAG_MS: u64 = 2_000;

static SCENARIOS: [ScenarioInfo; 3] = [
    ScenarioInfo {
        id: "happy-path",
        name: "Happy Path",
        description: "The order is accepted at once and the email goes out asynchronously.",
    },
    ScenarioInfo {
        id: "consumer-lag",
        name: "Consumer Lag",
        description: "A burst of orders outpaces the consumer, which later catches up.",
    },
    ScenarioInfo {
        id: "kafka-down",
        name: "Kafka Down",
        description: "The broker is unavailable and the producer has to retry.",
    },
];

static CONTROLS: [ControlInfo; 2] = [
    ControlInfo {
        kind: ControlKind::ToggleDependency,
        label: "Kafka",
        description: "Take the broker down or bring it back",
    },
    ControlInfo {
        kind: ControlKind::Lag,
        label: "Consumer lag",
        description: "Delay before the consumer picks up an event (0-5s)",
    },
];

#[derive(Debug, Clone)]
pub struct AsyncMessagingState {
    view: ViewState,
    pub kafka_enabled: bool,
    pub kafka_lag_ms: u64,
    pub queue: Vec<QueuedEvent>,
    next_offset: u64,
}

impl Default for AsyncMessagingState {
    fn default() -> Self {
        Self {
            view: ViewState::default(),
            kafka_enabled: true,
            kafka_lag_ms: 0,
            queue: Vec::new(),
            next_offset: 0,
        }
    }
}

impl AsyncMessagingState {
    fn publish(&mut self, event: &str, status: QueueStatus) -> u64 {
        let offset = self.next_offset;
        self.next_offset += 1;
        self.queue.push(QueuedEvent {
            offset,
            event: event.to_string(),
            status,
        });
        offset
    }

    fn set_event_status(&mut self, offset: u64, status: QueueStatus) {
        if let Some(event) = self.queue.iter_mut().find(|e| e.offset == offset) {
            event.status = status;
        }
    }

    fn pending(&self) -> Vec<u64> {
        self.queue
            .iter()
            .filter(|e| e.status == QueueStatus::Queued)
            .map(|e| e.offset)
            .collect()
    }
}

impl PatternState for AsyncMessagingState {
    fn view(&self) -> &ViewState {
        &self.view
    }

    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    fn reset_for_scenario(&mut self, name: &str) {
        self.view.start_scenario(name);
        self.queue.clear();
        self.next_offset = 0;
        if !self.kafka_enabled {
            self.view.set_status("kafka", ServiceStatus::Down);
        }
    }

    fn ledger(&self) -> Option<LedgerTable> {
        let mut table = LedgerTable::new("Topic: orders", &["Offset", "Event", "Status"]);
        for event in &self.queue {
            let tone = match event.status {
                QueueStatus::Consumed => RowTone::Good,
                QueueStatus::Queued => RowTone::Neutral,
                QueueStatus::Retrying => RowTone::Warn,
            };
            table.push(
                vec![
                    event.offset.to_string(),
                    event.event.clone(),
                    event.status.to_string(),
                ],
                tone,
            );
        }
        Some(table)
    }

    fn indicators(&self) -> Vec<Indicator> {
        let pending = self.pending().len();
        vec![
            Indicator::new(
                "Kafka",
                if self.kafka_enabled { "up" } else { "down" },
                if self.kafka_enabled { RowTone::Good } else { RowTone::Bad },
            ),
            Indicator::new(
                "Consumer lag",
                format!("{}ms", self.kafka_lag_ms),
                if self.kafka_lag_ms > 0 { RowTone::Warn } else { RowTone::Good },
            ),
            Indicator::new(
                "Backlog",
                pending,
                if pending > 0 { RowTone::Warn } else { RowTone::Neutral },
            ),
        ]
    }

    fn apply_control(&mut self, control: PatternControl) -> FlowscopeResult<()> {
        match control {
            PatternControl::ToggleDependency => {
                self.kafka_enabled = !self.kafka_enabled;
                let status = if self.kafka_enabled {
                    ServiceStatus::Healthy
                } else {
                    ServiceStatus::Down
                };
                self.view.set_status("kafka", status);
            }
            PatternControl::SetLag(ms) => {
                if ms > MAX_KAFKA_LAG_MS {
                    return Err(FlowscopeError::InvalidControlValue(format!(
                        "consumer lag {}ms exceeds {}ms",
                        ms, MAX_KAFKA_LAG_MS
                    )));
                }
                self.kafka_lag_ms = ms;
            }
        }
        Ok(())
    }
}

pub struct AsyncMessagingPattern;

impl PatternDefinition for AsyncMessagingPattern {
    type State = AsyncMessagingState;

    fn id(&self) -> PatternId {
        PatternId::AsyncMessaging
    }

    fn topology(&self) -> Topology {
        Topology::new()
            .with_node("client", "Client", ServiceKind::Client, 8.0, 20.0)
            .with_node("orders", "Order Service", ServiceKind::Service, 25.0, 60.0)
            .with_node("kafka", "Kafka", ServiceKind::Broker, 55.0, 60.0)
            .with_node("notifier", "Notification Service", ServiceKind::Worker, 88.0, 60.0)
    }

    fn scenarios(&self) -> &'static [ScenarioInfo] {
        &SCENARIOS
    }

    fn build(&self, scenario_id: &str) -> Option<Scenario<AsyncMessagingState>> {
        match scenario_id {
            "happy-path" => Some(happy_path()),
            "consumer-lag" => Some(consumer_lag()),
            "kafka-down" => Some(kafka_down()),
            _ => None,
        }
    }

    fn controls(&self) -> &'static [ControlInfo] {
        &CONTROLS
    }
}

fn place_order() -> Step<AsyncMessagingState> {
    Step::new(
        "A client places an order. The Order Service replies without waiting for anyone downstream.",
        1500,
        |ctx: Ctx| async move {
            ctx.log("Client: POST /orders", LogKind::Request).await;
            ctx.send("client", "orders", FlowKind::Http, "POST /orders").await;
            ctx.delay(600).await;
            ctx.log("Order Service: 202 Accepted", LogKind::Success).await;
            Ok(())
        },
    )
}

/// Sends one OrderPlaced to the broker. A refused publish is kept in the
/// topic view as `Retrying` and its offset comes back as the error.
async fn produce(ctx: &Ctx) -> Result<u64, u64> {
    if !ctx.read(|s| s.kafka_enabled).await {
        ctx.send_result("orders", "kafka", FlowKind::Event, "OrderPlaced", false)
            .await;
        let offset = ctx
            .update(|s| s.publish("OrderPlaced", QueueStatus::Retrying))
            .await;
        ctx.log("Kafka: broker unavailable", LogKind::Error).await;
        return Err(offset);
    }
    ctx.send("orders", "kafka", FlowKind::Event, "OrderPlaced").await;
    Ok(ctx
        .update(|s| s.publish("OrderPlaced", QueueStatus::Queued))
        .await)
}

fn publish_order() -> Step<AsyncMessagingState> {
    Step::new(
        "The Order Service publishes OrderPlaced to Kafka and moves on.",
        1500,
        |ctx: Ctx| async move {
            match produce(&ctx).await {
                Ok(offset) => {
                    ctx.log(
                        format!("Order Service: published OrderPlaced (offset {})", offset),
                        LogKind::Info,
                    )
                    .await
                }
                Err(_) => {
                    ctx.log("Order Service: publish failed, retrying in 2s", LogKind::Warning)
                        .await
                }
            }
            ctx.delay(700).await;
            Ok(())
        },
    )
}

fn consume_next() -> Step<AsyncMessagingState> {
    Step::new(
        "The Notification Service polls the topic and receives the event.",
        1500,
        |ctx: Ctx| async move {
            let (enabled, lag, pending) = ctx
                .read(|s| (s.kafka_enabled, s.kafka_lag_ms, s.pending()))
                .await;
            if !enabled {
                ctx.clear_flows().await;
                ctx.log(
                    "Notification Service: broker unreachable, nothing consumed",
                    LogKind::Warning,
                )
                .await;
                ctx.delay(500).await;
                return Ok(());
            }
            if lag > 0 {
                ctx.log(
                    format!("Notification Service: consumer lag {}ms", lag),
                    LogKind::Warning,
                )
                .await;
                ctx.delay(lag).await;
            }
            for offset in pending {
                ctx.send("kafka", "notifier", FlowKind::Event, "OrderPlaced")
                    .await;
                ctx.update(|s| s.set_event_status(offset, QueueStatus::Consumed))
                    .await;
                ctx.log(
                    format!("Notification Service: consumed offset {}", offset),
                    LogKind::Info,
                )
                .await;
                ctx.delay(500).await;
            }
            Ok(())
        },
    )
}

fn commit() -> Step<AsyncMessagingState> {
    Step::new(
        "The consumer finishes its work and commits the offset.",
        1000,
        |ctx: Ctx| async move {
            ctx.clear_flows().await;
            let consumed = ctx
                .read(|s| s.queue.iter().any(|e| e.status == QueueStatus::Consumed))
                .await;
            if !consumed {
                ctx.log("Kafka: no offset to commit", LogKind::Warning).await;
                ctx.delay(400).await;
                return Ok(());
            }
            ctx.log("Notification Service: confirmation email sent", LogKind::Success)
                .await;
            ctx.log("Kafka: consumer offset committed", LogKind::Info).await;
            ctx.delay(400).await;
            Ok(())
        },
    )
}

fn happy_path() -> Scenario<AsyncMessagingState> {
    Scenario::new(
        "Happy Path",
        vec![place_order(), publish_order(), consume_next(), commit()],
    )
}

fn consumer_lag() -> Scenario<AsyncMessagingState> {
    Scenario::new(
        "Consumer Lag",
        vec![
            place_order(),
            Step::new(
                "A burst: three orders are published back to back.",
                1500,
                |ctx: Ctx| async move {
                    for n in 1..=3 {
                        match produce(&ctx).await {
                            Ok(offset) => {
                                ctx.log(
                                    format!(
                                        "Order Service: published OrderPlaced #{} (offset {})",
                                        n, offset
                                    ),
                                    LogKind::Info,
                                )
                                .await
                            }
                            Err(offset) => {
                                ctx.log(
                                    format!(
                                        "Order Service: OrderPlaced #{} (offset {}) waiting to retry",
                                        n, offset
                                    ),
                                    LogKind::Warning,
                                )
                                .await
                            }
                        }
                        ctx.delay(250).await;
                    }
                    Ok(())
                },
            ),
            Step::new(
                "The consumer falls behind. Events pile up on the topic, the producer is unaffected.",
                2000,
                |ctx: Ctx| async move {
                    let (lag, backlog) = ctx
                        .read(|s| (s.kafka_lag_ms.max(BURST_LAG_MS), s.pending().len()))
                        .await;
                    ctx.set_status("notifier", ServiceStatus::Degraded).await;
                    ctx.log(
                        format!(
                            "Notification Service: consumer lag {}ms ({} events behind)",
                            lag, backlog
                        ),
                        LogKind::Warning,
                    )
                    .await;
                    ctx.delay(lag).await;
                    Ok(())
                },
            ),
            Step::new(
                "It catches up, processing the backlog in offset order.",
                1500,
                |ctx: Ctx| async move {
                    let pending = ctx.read(|s| s.pending()).await;
                    for offset in pending {
                        ctx.send("kafka", "notifier", FlowKind::Event, "OrderPlaced")
                            .await;
                        ctx.update(|s| s.set_event_status(offset, QueueStatus::Consumed))
                            .await;
                        ctx.log(
                            format!("Notification Service: consumed offset {}", offset),
                            LogKind::Info,
                        )
                        .await;
                        ctx.delay(300).await;
                    }
                    Ok(())
                },
            ),
            Step::new(
                "Lag is back to zero. Nothing was lost, only delayed.",
                1000,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    ctx.set_status("notifier", ServiceStatus::Healthy).await;
                    ctx.log("Notification Service: caught up, lag 0ms", LogKind::Success)
                        .await;
                    ctx.delay(400).await;
                    Ok(())
                },
            ),
        ],
    )
}

fn kafka_down() -> Scenario<AsyncMessagingState> {
    Scenario::new(
        "Kafka Down",
        vec![
            place_order(),
            Step::new(
                "Kafka is down: the publish call fails.",
                1500,
                |ctx: Ctx| async move {
                    ctx.update(|s| s.kafka_enabled = false).await;
                    ctx.set_status("kafka", ServiceStatus::Down).await;
                    let _ = produce(&ctx).await;
                    ctx.delay(600).await;
                    Ok(())
                },
            ),
            Step::new(
                "The producer retries with backoff. The order exists but its event does not yet.",
                2000,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    ctx.log("Order Service: publish failed, retrying in 2s", LogKind::Warning)
                        .await;
                    ctx.log(
                        "Order Service: order saved but event not published (dual write)",
                        LogKind::Warning,
                    )
                    .await;
                    ctx.delay(1000).await;
                    Ok(())
                },
            ),
            Step::new(
                "Kafka comes back and the retry goes through.",
                1500,
                |ctx: Ctx| async move {
                    ctx.update(|s| s.kafka_enabled = true).await;
                    ctx.set_status("kafka", ServiceStatus::Healthy).await;
                    ctx.log("Kafka service restored", LogKind::Success).await;
                    ctx.send("orders", "kafka", FlowKind::Event, "OrderPlaced").await;
                    let offset = ctx
                        .update(|s| {
                            let offset = s
                                .queue
                                .iter()
                                .find(|e| e.status == QueueStatus::Retrying)
                                .map(|e| e.offset);
                            if let Some(offset) = offset {
                                s.set_event_status(offset, QueueStatus::Queued);
                            }
                            offset
                        })
                        .await;
                    if let Some(offset) = offset {
                        ctx.log(
                            format!("Order Service: published OrderPlaced on retry (offset {})", offset),
                            LogKind::Info,
                        )
                        .await;
                    }
                    ctx.delay(600).await;
                    Ok(())
                },
            ),
            consume_next(),
            commit(),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{ActivityKind, PatternController, PatternSession};
    use crate::timing::Pacer;

    fn session() -> PatternSession<AsyncMessagingPattern> {
        PatternSession::new(AsyncMessagingPattern, Pacer::instant())
    }

    #[tokio::test]
    async fn test_happy_path_consumes_event() {
        let session = session();
        session.run_to_completion("happy-path").await.unwrap();

        let queue = session.with_state(|s| s.queue.clone()).await;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].status, QueueStatus::Consumed);
    }

    #[tokio::test]
    async fn test_consumer_lag_drains_backlog_in_order() {
        let session = session();
        session.run_to_completion("consumer-lag").await.unwrap();

        let snapshot = session.snapshot().await;
        let consumed: Vec<_> = snapshot
            .timeline
            .iter()
            .filter_map(|a| match &a.kind {
                ActivityKind::Log { message, .. }
                    if message.starts_with("Notification Service: consumed") =>
                {
                    Some(message.clone())
                }
                _ => None,
            })
            .collect();
        assert_eq!(
            consumed,
            vec![
                "Notification Service: consumed offset 0",
                "Notification Service: consumed offset 1",
                "Notification Service: consumed offset 2",
            ]
        );
        assert_eq!(snapshot.statuses["notifier"], ServiceStatus::Healthy);
    }

    #[tokio::test]
    async fn test_kafka_down_retries_then_delivers() {
        let session = session();
        session.run_to_completion("kafka-down").await.unwrap();

        let queue = session.with_state(|s| s.queue.clone()).await;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].status, QueueStatus::Consumed);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.statuses["kafka"], ServiceStatus::Healthy);
    }

    #[tokio::test]
    async fn test_happy_path_with_kafka_disabled_keeps_event_retrying() {
        let session = session();
        session
            .apply_control(PatternControl::ToggleDependency)
            .await
            .unwrap();
        session.run_to_completion("happy-path").await.unwrap();

        let queue = session.with_state(|s| s.queue.clone()).await;
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].status, QueueStatus::Retrying);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.statuses["kafka"], ServiceStatus::Down);
        assert_eq!(snapshot.ledger.unwrap().rows[0].cells[2], "retrying");
        let logs: Vec<_> = snapshot.logs.iter().map(|l| l.message.as_str()).collect();
        assert!(logs.contains(&"Kafka: broker unavailable"));
        assert!(!logs.iter().any(|m| m.starts_with("Notification Service: consumed")));
        assert!(!logs.contains(&"Notification Service: confirmation email sent"));
    }

    #[tokio::test]
    async fn test_kafka_down_flag_tracks_outage() {
        let session = session();
        session.load_scenario("kafka-down").await.unwrap();
        session.next_step().await.unwrap();
        session.next_step().await.unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.indicators[0].value, "down");

        session.play().await.unwrap();
        assert!(session.with_state(|s| s.kafka_enabled).await);
    }

    #[tokio::test]
    async fn test_lag_control_is_validated_and_kept() {
        let session = session();
        session.apply_control(PatternControl::SetLag(1500)).await.unwrap();

        let err = session
            .apply_control(PatternControl::SetLag(6000))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "E3004");

        session.load_scenario("happy-path").await.unwrap();
        let lag = session.with_state(|s| s.kafka_lag_ms).await;
        assert_eq!(lag, 1500);
    }
}
