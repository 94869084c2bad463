use serde_json::json;

use crate::error::FlowscopeResult;
use crate::event_log::LogKind;
use crate::models::{
    FlowKind, LedgerTable, OutboxEntry, OutboxStatus, PatternId, RowTone, ServiceKind,
    ServiceStatus, Topology,
};
use crate::playback::{Scenario, ScenarioInfo, Step, StepContext};

use super::{
    ControlInfo, ControlKind, Indicator, PatternControl, PatternDefinition, PatternState,
    ViewState,
};

type Ctx = StepContext<OutboxState>;

static SCENARIOS: [ScenarioInfo; 3] = [
    ScenarioInfo {
        id: "happy-path",
        name: "Happy Path",
        description: "Order and event commit together; the relay publishes the event.",
    },
    ScenarioInfo {
        id: "kafka-down",
        name: "Kafka Down",
        description: "The broker is down, yet the order succeeds and the event waits in the outbox.",
    },
    ScenarioInfo {
        id: "relay-crash",
        name: "Relay Crash",
        description: "The relay dies after publishing; the restart publishes a duplicate.",
    },
];

static CONTROLS: [ControlInfo; 1] = [ControlInfo {
    kind: ControlKind::ToggleDependency,
    label: "Kafka",
    description: "Take the broker down or bring it back",
}];

#[derive(Debug, Clone)]
pub struct OutboxState {
    view: ViewState,
    pub kafka_enabled: bool,
    pub outbox: Vec<OutboxEntry>,
    pub relay_attempts: u32,
}

impl Default for OutboxState {
    fn default() -> Self {
        Self {
            view: ViewState::default(),
            kafka_enabled: true,
            outbox: Vec::new(),
            relay_attempts: 0,
        }
    }
}

impl OutboxState {
    fn entry_mut(&mut self) -> Option<&mut OutboxEntry> {
        self.outbox.last_mut()
    }

    fn pending_count(&self) -> usize {
        self.outbox.iter().filter(|e| !e.is_published()).count()
    }
}

impl PatternState for OutboxState {
    fn view(&self) -> &ViewState {
        &self.view
    }

    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    fn reset_for_scenario(&mut self, name: &str) {
        self.view.start_scenario(name);
        self.outbox.clear();
        self.relay_attempts = 0;
        if !self.kafka_enabled {
            self.view.set_status("kafka", ServiceStatus::Down);
        }
    }

    fn ledger(&self) -> Option<LedgerTable> {
        let mut table =
            LedgerTable::new("Outbox", &["Id", "Event", "Status", "Created", "Published"]);
        for entry in &self.outbox {
            let tone = match entry.status {
                OutboxStatus::Pending => RowTone::Warn,
                OutboxStatus::Publishing => RowTone::Neutral,
                OutboxStatus::Published => RowTone::Good,
            };
            table.push(
                vec![
                    entry.id.to_string()[..8].to_string(),
                    entry.event_type.clone(),
                    entry.status.to_string(),
                    entry.created_at.format("%H:%M:%S").to_string(),
                    entry
                        .published_at
                        .map(|t| t.format("%H:%M:%S").to_string())
                        .unwrap_or_else(|| "-".to_string()),
                ],
                tone,
            );
        }
        Some(table)
    }

    fn indicators(&self) -> Vec<Indicator> {
        let pending = self.pending_count();
        vec![
            Indicator::new(
                "Kafka",
                if self.kafka_enabled { "up" } else { "down" },
                if self.kafka_enabled { RowTone::Good } else { RowTone::Bad },
            ),
            Indicator::new(
                "Pending",
                pending,
                if pending > 0 { RowTone::Warn } else { RowTone::Good },
            ),
            Indicator::new("Relay attempts", self.relay_attempts, RowTone::Neutral),
        ]
    }

    fn apply_control(&mut self, control: PatternControl) -> FlowscopeResult<()> {
        if control == PatternControl::ToggleDependency {
            self.kafka_enabled = !self.kafka_enabled;
            let status = if self.kafka_enabled {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Down
            };
            self.view.set_status("kafka", status);
        }
        Ok(())
    }
}

pub struct OutboxPattern;

impl PatternDefinition for OutboxPattern {
    type State = OutboxState;

    fn id(&self) -> PatternId {
        PatternId::Outbox
    }

    fn topology(&self) -> Topology {
        Topology::new()
            .with_node("client", "Client", ServiceKind::Client, 8.0, 20.0)
            .with_node("orders", "Order Service", ServiceKind::Service, 30.0, 45.0)
            .with_node("postgres", "Postgres", ServiceKind::Database, 30.0, 85.0)
            .with_node("relay", "Outbox Relay", ServiceKind::Worker, 62.0, 85.0)
            .with_node("kafka", "Kafka", ServiceKind::Broker, 62.0, 45.0)
            .with_node("shipping", "Shipping Service", ServiceKind::Service, 90.0, 45.0)
    }

    fn scenarios(&self) -> &'static [ScenarioInfo] {
        &SCENARIOS
    }

    fn build(&self, scenario_id: &str) -> Option<Scenario<OutboxState>> {
        match scenario_id {
            "happy-path" => Some(happy_path()),
            "kafka-down" => Some(kafka_down()),
            "relay-crash" => Some(relay_crash()),
            _ => None,
        }
    }

    fn controls(&self) -> &'static [ControlInfo] {
        &CONTROLS
    }
}

fn place_order() -> Step<OutboxState> {
    Step::new(
        "A client submits an order to the Order Service.",
        1200,
        |ctx: Ctx| async move {
            ctx.log("Client: POST /orders", LogKind::Request).await;
            ctx.send("client", "orders", FlowKind::Http, "POST /orders").await;
            ctx.delay(600).await;
            Ok(())
        },
    )
}

fn local_transaction() -> Step<OutboxState> {
    Step::new(
        "One local transaction writes the order row and the outbox row together.",
        1500,
        |ctx: Ctx| async move {
            ctx.send("orders", "postgres", FlowKind::Db, "INSERT order + outbox")
                .await;
            ctx.update(|s| {
                s.outbox.push(OutboxEntry::new(
                    "OrderCreated",
                    json!({ "order_id": 1042, "total": 99.5 }),
                ))
            })
            .await;
            ctx.log(
                "Postgres: BEGIN; INSERT orders; INSERT outbox; COMMIT",
                LogKind::Info,
            )
            .await;
            ctx.delay(700).await;
            Ok(())
        },
    )
}

fn respond_created() -> Step<OutboxState> {
    Step::new(
        "The service answers right away. It never waited on the broker.",
        1200,
        |ctx: Ctx| async move {
            ctx.send_result("orders", "client", FlowKind::Http, "201 Created", true)
                .await;
            ctx.log("Order Service: 201 Created", LogKind::Success).await;
            ctx.delay(500).await;
            Ok(())
        },
    )
}

fn relay_poll() -> Step<OutboxState> {
    Step::new(
        "The relay polls the outbox table for unpublished rows.",
        1200,
        |ctx: Ctx| async move {
            ctx.send("postgres", "relay", FlowKind::Db, "SELECT pending")
                .await;
            let pending = ctx
                .update(|s| {
                    s.relay_attempts += 1;
                    s.pending_count()
                })
                .await;
            ctx.log(
                format!("Outbox Relay: {} pending entry found", pending),
                LogKind::Info,
            )
            .await;
            ctx.delay(500).await;
            Ok(())
        },
    )
}

/// A failed publish: the broker refuses the event and the row goes back to
/// pending, waiting for the next relay pass.
async fn publish_refused(ctx: &Ctx, label: &str) {
    ctx.send_result("relay", "kafka", FlowKind::Event, label, false)
        .await;
    ctx.log("Kafka: broker unavailable", LogKind::Error).await;
    ctx.update(|s| {
        if let Some(entry) = s.entry_mut() {
            entry.mark_pending();
        }
    })
    .await;
    ctx.log("Outbox Relay: publish failed, entry stays pending", LogKind::Warning)
        .await;
}

fn relay_publish() -> Step<OutboxState> {
    Step::new(
        "The relay publishes the event and marks the row as published.",
        1500,
        |ctx: Ctx| async move {
            ctx.update(|s| {
                if let Some(entry) = s.entry_mut() {
                    entry.mark_publishing();
                }
            })
            .await;
            if !ctx.read(|s| s.kafka_enabled).await {
                publish_refused(&ctx, "OrderCreated").await;
                ctx.delay(600).await;
                return Ok(());
            }
            ctx.send("relay", "kafka", FlowKind::Event, "OrderCreated").await;
            ctx.delay(600).await;
            ctx.update(|s| {
                if let Some(entry) = s.entry_mut() {
                    entry.mark_published();
                }
            })
            .await;
            ctx.log("Outbox Relay: OrderCreated published", LogKind::Success)
                .await;
            Ok(())
        },
    )
}

fn deliver(message: &'static str, kind: LogKind) -> Step<OutboxState> {
    Step::new(
        "Shipping consumes the event. Delivery is at-least-once, so consumers must be idempotent.",
        1200,
        move |ctx: Ctx| async move {
            let published = ctx
                .read(|s| s.outbox.last().is_some_and(OutboxEntry::is_published))
                .await;
            if !published {
                ctx.clear_flows().await;
                ctx.log(
                    "Shipping Service: nothing received yet, OrderCreated waits in the outbox",
                    LogKind::Info,
                )
                .await;
                ctx.delay(600).await;
                return Ok(());
            }
            ctx.send("kafka", "shipping", FlowKind::Event, "OrderCreated").await;
            ctx.log(message, kind).await;
            ctx.delay(600).await;
            ctx.clear_flows().await;
            Ok(())
        },
    )
}

fn happy_path() -> Scenario<OutboxState> {
    Scenario::new(
        "Happy Path",
        vec![
            place_order(),
            local_transaction(),
            respond_created(),
            relay_poll(),
            relay_publish(),
            deliver("Shipping Service: OrderCreated received", LogKind::Success),
        ],
    )
}

fn kafka_down() -> Scenario<OutboxState> {
    Scenario::new(
        "Kafka Down",
        vec![
            place_order(),
            local_transaction(),
            respond_created(),
            relay_poll(),
            Step::new(
                "The relay tries to publish, but Kafka is down. The row stays pending.",
                1500,
                |ctx: Ctx| async move {
                    ctx.update(|s| {
                        s.kafka_enabled = false;
                        if let Some(entry) = s.entry_mut() {
                            entry.mark_publishing();
                        }
                    })
                    .await;
                    ctx.set_status("kafka", ServiceStatus::Down).await;
                    publish_refused(&ctx, "OrderCreated").await;
                    ctx.delay(600).await;
                    Ok(())
                },
            ),
            Step::new(
                "Nothing is lost: the event sits in Postgres while the relay backs off.",
                1500,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    let attempts = ctx
                        .update(|s| {
                            s.relay_attempts += 1;
                            s.relay_attempts
                        })
                        .await;
                    ctx.log(
                        format!("Outbox Relay: retry {} scheduled with backoff", attempts),
                        LogKind::Info,
                    )
                    .await;
                    ctx.delay(1000).await;
                    Ok(())
                },
            ),
            Step::new(
                "Kafka recovers.",
                1000,
                |ctx: Ctx| async move {
                    ctx.update(|s| s.kafka_enabled = true).await;
                    ctx.set_status("kafka", ServiceStatus::Healthy).await;
                    ctx.log("Kafka service restored", LogKind::Success).await;
                    ctx.delay(400).await;
                    Ok(())
                },
            ),
            relay_publish(),
            deliver("Shipping Service: OrderCreated received", LogKind::Success),
        ],
    )
}

fn relay_crash() -> Scenario<OutboxState> {
    Scenario::new(
        "Relay Crash",
        vec![
            place_order(),
            local_transaction(),
            respond_created(),
            relay_poll(),
            Step::new(
                "The relay publishes the event to Kafka.",
                1200,
                |ctx: Ctx| async move {
                    ctx.update(|s| {
                        if let Some(entry) = s.entry_mut() {
                            entry.mark_publishing();
                        }
                    })
                    .await;
                    if !ctx.read(|s| s.kafka_enabled).await {
                        publish_refused(&ctx, "OrderCreated").await;
                        ctx.delay(600).await;
                        return Ok(());
                    }
                    ctx.send("relay", "kafka", FlowKind::Event, "OrderCreated").await;
                    ctx.log("Outbox Relay: OrderCreated sent to Kafka", LogKind::Info)
                        .await;
                    ctx.delay(600).await;
                    Ok(())
                },
            ),
            Step::new(
                "The relay crashes before it can mark the row as published.",
                1500,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    ctx.set_status("relay", ServiceStatus::Down).await;
                    ctx.log(
                        "Outbox Relay: crashed before UPDATE outbox SET status = 'published'",
                        LogKind::Error,
                    )
                    .await;
                    ctx.delay(800).await;
                    Ok(())
                },
            ),
            Step::new(
                "A new relay instance starts and sees the row as unpublished.",
                1200,
                |ctx: Ctx| async move {
                    ctx.set_status("relay", ServiceStatus::Healthy).await;
                    ctx.send("postgres", "relay", FlowKind::Db, "SELECT pending")
                        .await;
                    ctx.update(|s| {
                        s.relay_attempts += 1;
                        if let Some(entry) = s.entry_mut() {
                            entry.mark_pending();
                        }
                    })
                    .await;
                    ctx.log("Outbox Relay: restarted, 1 entry still pending", LogKind::Warning)
                        .await;
                    ctx.delay(500).await;
                    Ok(())
                },
            ),
            Step::new(
                "It publishes again, so Kafka now holds the event twice.",
                1500,
                |ctx: Ctx| async move {
                    ctx.update(|s| {
                        if let Some(entry) = s.entry_mut() {
                            entry.mark_publishing();
                        }
                    })
                    .await;
                    if !ctx.read(|s| s.kafka_enabled).await {
                        publish_refused(&ctx, "OrderCreated (again)").await;
                        ctx.delay(600).await;
                        return Ok(());
                    }
                    ctx.send("relay", "kafka", FlowKind::Event, "OrderCreated (again)")
                        .await;
                    ctx.delay(600).await;
                    ctx.update(|s| {
                        if let Some(entry) = s.entry_mut() {
                            entry.mark_published();
                        }
                    })
                    .await;
                    ctx.log("Kafka: duplicate OrderCreated (at-least-once)", LogKind::Warning)
                        .await;
                    Ok(())
                },
            ),
            deliver(
                "Shipping Service: duplicate event ignored (idempotent consumer)",
                LogKind::Success,
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{PatternController, PatternSession};
    use crate::playback::StepOutcome;
    use crate::timing::Pacer;

    #[tokio::test]
    async fn test_happy_path_publishes_entry() {
        let session = PatternSession::new(OutboxPattern, Pacer::instant());
        session.run_to_completion("happy-path").await.unwrap();

        let outbox = session.with_state(|s| s.outbox.clone()).await;
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].status, OutboxStatus::Published);
        assert_eq!(outbox[0].payload["order_id"], 1042);
    }

    #[tokio::test]
    async fn test_relay_crash_publishes_twice_but_ends_published() {
        let session = PatternSession::new(OutboxPattern, Pacer::instant());
        session.run_to_completion("relay-crash").await.unwrap();

        let (outbox, attempts) = session
            .with_state(|s| (s.outbox.clone(), s.relay_attempts))
            .await;
        assert!(outbox[0].is_published());
        assert_eq!(attempts, 2);

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.statuses["relay"], ServiceStatus::Healthy);
        let ledger = snapshot.ledger.unwrap();
        assert_eq!(ledger.rows[0].cells[2], "published");
    }

    #[tokio::test]
    async fn test_happy_path_with_kafka_disabled_leaves_entry_pending() {
        let session = PatternSession::new(OutboxPattern, Pacer::instant());
        session
            .apply_control(PatternControl::ToggleDependency)
            .await
            .unwrap();
        session.run_to_completion("happy-path").await.unwrap();

        let outbox = session.with_state(|s| s.outbox.clone()).await;
        assert_eq!(outbox[0].status, OutboxStatus::Pending);
        assert!(outbox[0].published_at.is_none());

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.indicators[1].value, "1");
        assert_eq!(snapshot.ledger.unwrap().rows[0].cells[4], "-");
        let logs: Vec<_> = snapshot.logs.iter().map(|l| l.message.as_str()).collect();
        assert!(logs.contains(&"Outbox Relay: publish failed, entry stays pending"));
        assert!(!logs.contains(&"Outbox Relay: OrderCreated published"));
        assert!(!logs.contains(&"Shipping Service: OrderCreated received"));
    }

    #[tokio::test]
    async fn test_kafka_down_indicator_follows_outage() {
        let session = PatternSession::new(OutboxPattern, Pacer::instant());
        session.load_scenario("kafka-down").await.unwrap();
        for _ in 0..5 {
            assert_eq!(session.next_step().await.unwrap(), StepOutcome::Advanced);
        }

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.statuses["kafka"], ServiceStatus::Down);
        assert_eq!(snapshot.indicators[0].value, "down");
        assert!(!session.with_state(|s| s.kafka_enabled).await);

        session.play().await.unwrap();

        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.statuses["kafka"], ServiceStatus::Healthy);
        assert_eq!(snapshot.indicators[0].value, "up");
        assert!(session.with_state(|s| s.outbox[0].is_published()).await);
    }

    #[tokio::test]
    async fn test_reload_clears_outbox() {
        let session = PatternSession::new(OutboxPattern, Pacer::instant());
        session.run_to_completion("happy-path").await.unwrap();
        session.load_scenario("kafka-down").await.unwrap();

        let (outbox, logs) = session
            .with_state(|s| (s.outbox.len(), s.view().logs().len()))
            .await;
        assert_eq!(outbox, 0);
        assert_eq!(logs, 0);
    }
}
