use crate::error::FlowscopeResult;
use crate::event_log::LogKind;
use crate::models::{
    Delivery, DeliveryStatus, FlowKind, LedgerTable, PatternId, RowTone, ServiceKind,
    ServiceStatus, Topology,
};
use crate::playback::{Scenario, ScenarioInfo, Step, StepContext};

use super::{
    ControlInfo, ControlKind, Indicator, PatternControl, PatternDefinition, PatternState,
    ViewState,
};

type Ctx = StepContext<PubSubState>;

const SUBSCRIBERS: [(&str, &str); 3] = [
    ("search", "Search Indexer"),
    ("email", "Email Service"),
    ("analytics", "Analytics"),
];

static SCENARIOS: [ScenarioInfo; 3] = [
    ScenarioInfo {
        id: "fan-out",
        name: "Fan-out",
        description: "One message reaches every subscriber independently.",
    },
    ScenarioInfo {
        id: "subscriber-offline",
        name: "Subscriber Offline",
        description: "A durable subscription holds messages until the subscriber returns.",
    },
    ScenarioInfo {
        id: "filtered",
        name: "Filtered",
        description: "Subscription filters decide which subscribers get a message.",
    },
];

static CONTROLS: [ControlInfo; 1] = [ControlInfo {
    kind: ControlKind::ToggleDependency,
    label: "Email Service",
    description: "Take the email subscriber offline or back online",
}];

#[derive(Debug, Clone)]
pub struct PubSubState {
    view: ViewState,
    pub email_online: bool,
    pub deliveries: Vec<Delivery>,
}

impl Default for PubSubState {
    fn default() -> Self {
        Self {
            view: ViewState::default(),
            email_online: true,
            deliveries: Vec::new(),
        }
    }
}

impl PubSubState {
    fn deliver(&mut self, message: &str, subscriber: &str, status: DeliveryStatus) {
        if let Some(existing) = self
            .deliveries
            .iter_mut()
            .find(|d| d.message == message && d.subscriber == subscriber)
        {
            existing.status = status;
            return;
        }
        self.deliveries.push(Delivery {
            message: message.to_string(),
            subscriber: subscriber.to_string(),
            status,
        });
    }

    fn pending_for(&self, subscriber: &str) -> Vec<String> {
        self.deliveries
            .iter()
            .filter(|d| d.subscriber == subscriber && d.status == DeliveryStatus::Pending)
            .map(|d| d.message.clone())
            .collect()
    }
}

impl PatternState for PubSubState {
    fn view(&self) -> &ViewState {
        &self.view
    }

    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    fn reset_for_scenario(&mut self, name: &str) {
        self.view.start_scenario(name);
        self.deliveries.clear();
        if !self.email_online {
            self.view.set_status("email", ServiceStatus::Down);
        }
    }

    fn ledger(&self) -> Option<LedgerTable> {
        let mut table = LedgerTable::new("Deliveries", &["Message", "Subscriber", "Status"]);
        for delivery in &self.deliveries {
            let tone = match delivery.status {
                DeliveryStatus::Delivered => RowTone::Good,
                DeliveryStatus::Pending => RowTone::Warn,
                DeliveryStatus::Filtered => RowTone::Neutral,
            };
            table.push(
                vec![
                    delivery.message.clone(),
                    delivery.subscriber.clone(),
                    delivery.status.to_string(),
                ],
                tone,
            );
        }
        Some(table)
    }

    fn indicators(&self) -> Vec<Indicator> {
        let delivered = self
            .deliveries
            .iter()
            .filter(|d| d.status == DeliveryStatus::Delivered)
            .count();
        vec![
            Indicator::new(
                "Email Service",
                if self.email_online { "online" } else { "offline" },
                if self.email_online { RowTone::Good } else { RowTone::Bad },
            ),
            Indicator::new("Delivered", delivered, RowTone::Neutral),
        ]
    }

    fn apply_control(&mut self, control: PatternControl) -> FlowscopeResult<()> {
        if control == PatternControl::ToggleDependency {
            self.email_online = !self.email_online;
            let status = if self.email_online {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Down
            };
            self.view.set_status("email", status);
        }
        Ok(())
    }
}

pub struct PubSubPattern;

impl PatternDefinition for PubSubPattern {
    type State = PubSubState;

    fn id(&self) -> PatternId {
        PatternId::PubSub
    }

    fn topology(&self) -> Topology {
        let mut topology = Topology::new()
            .with_node("catalog", "Catalog Service", ServiceKind::Service, 10.0, 50.0)
            .with_node("topic", "Topic: price-updates", ServiceKind::Broker, 45.0, 50.0);
        for (i, (id, label)) in SUBSCRIBERS.iter().enumerate() {
            topology = topology.with_node(*id, *label, ServiceKind::Worker, 85.0, 15.0 + 35.0 * i as f64);
        }
        topology
    }

    fn scenarios(&self) -> &'static [ScenarioInfo] {
        &SCENARIOS
    }

    fn build(&self, scenario_id: &str) -> Option<Scenario<PubSubState>> {
        match scenario_id {
            "fan-out" => Some(fan_out()),
            "subscriber-offline" => Some(subscriber_offline()),
            "filtered" => Some(filtered()),
            _ => None,
        }
    }

    fn controls(&self) -> &'static [ControlInfo] {
        &CONTROLS
    }
}

fn label(subscriber: &str) -> &'static str {
    SUBSCRIBERS
        .iter()
        .find(|(id, _)| *id == subscriber)
        .map(|(_, label)| *label)
        .unwrap_or("Subscriber")
}

fn publish(message: &'static str) -> Step<PubSubState> {
    Step::new(
        "The Catalog Service publishes a price update to the topic. It does not know who listens.",
        1200,
        move |ctx: Ctx| async move {
            ctx.send("catalog", "topic", FlowKind::Event, message).await;
            ctx.log(format!("Catalog Service: publish {}", message), LogKind::Request)
                .await;
            ctx.delay(600).await;
            Ok(())
        },
    )
}

/// Delivers `message` to every subscriber that is online and whose filter
/// accepts it. Offline subscribers get a pending delivery.
async fn broadcast(ctx: &Ctx, message: &str, email_filter_matches: bool) {
    let email_online = ctx.read(|s| s.email_online && s.view().status("email") != ServiceStatus::Down).await;

    let mut targets = Vec::new();
    for (id, _) in SUBSCRIBERS {
        if id == "email" && !email_filter_matches {
            ctx.update(|s| s.deliver(message, id, DeliveryStatus::Filtered))
                .await;
            ctx.log(
                "Topic: Email Service filter (discount >= 10%) did not match",
                LogKind::Info,
            )
            .await;
            continue;
        }
        if id == "email" && !email_online {
            ctx.update(|s| s.deliver(message, id, DeliveryStatus::Pending))
                .await;
            ctx.log("Topic: holding message for Email Service", LogKind::Warning)
                .await;
            continue;
        }
        targets.push(id);
    }

    let hops: Vec<_> = targets
        .iter()
        .map(|id| ("topic", *id, FlowKind::Event, message))
        .collect();
    ctx.send_all(&hops).await;
    ctx.delay(600).await;

    for id in targets {
        ctx.update(|s| s.deliver(message, id, DeliveryStatus::Delivered))
            .await;
        ctx.log(format!("{}: received {}", label(id), message), LogKind::Success)
            .await;
    }
}

fn fan_out_step(message: &'static str, email_filter_matches: bool) -> Step<PubSubState> {
    Step::new(
        "The topic fans the message out to its subscribers.",
        1500,
        move |ctx: Ctx| async move {
            broadcast(&ctx, message, email_filter_matches).await;
            Ok(())
        },
    )
}

fn fan_out() -> Scenario<PubSubState> {
    Scenario::new(
        "Fan-out",
        vec![
            publish("PriceChanged(sku-9, $19.99)"),
            fan_out_step("PriceChanged(sku-9, $19.99)", true),
            Step::new(
                "Each subscriber reacts on its own. Adding a fourth needs no change to the publisher.",
                1200,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    ctx.log("Search Indexer: sku-9 reindexed", LogKind::Info).await;
                    ctx.log("Email Service: 120 watchers notified", LogKind::Info)
                        .await;
                    ctx.log("Analytics: price event stored", LogKind::Info).await;
                    ctx.delay(500).await;
                    Ok(())
                },
            ),
        ],
    )
}

fn subscriber_offline() -> Scenario<PubSubState> {
    Scenario::new(
        "Subscriber Offline",
        vec![
            publish("PriceChanged(sku-9, $19.99)"),
            Step::new(
                "The Email Service is offline for a deploy.",
                1000,
                |ctx: Ctx| async move {
                    ctx.set_status("email", ServiceStatus::Down).await;
                    ctx.log("Email Service: offline", LogKind::Warning).await;
                    ctx.delay(400).await;
                    Ok(())
                },
            ),
            fan_out_step("PriceChanged(sku-9, $19.99)", true),
            Step::new(
                "It comes back and its durable subscription replays what it missed.",
                1500,
                |ctx: Ctx| async move {
                    ctx.update(|s| s.email_online = true).await;
                    ctx.set_status("email", ServiceStatus::Healthy).await;
                    ctx.log("Email Service: back online", LogKind::Success).await;

                    let pending = ctx.read(|s| s.pending_for("email")).await;
                    for message in pending {
                        ctx.send("topic", "email", FlowKind::Event, &message).await;
                        ctx.delay(500).await;
                        ctx.update(|s| s.deliver(&message, "email", DeliveryStatus::Delivered))
                            .await;
                        ctx.log(
                            format!("Email Service: received {} (replayed)", message),
                            LogKind::Success,
                        )
                        .await;
                    }
                    Ok(())
                },
            ),
            Step::new(
                "Every subscriber ended up with the message; none blocked the others.",
                800,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    ctx.delay(300).await;
                    Ok(())
                },
            ),
        ],
    )
}

fn filtered() -> Scenario<PubSubState> {
    Scenario::new(
        "Filtered",
        vec![
            publish("PriceChanged(sku-9, -5%)"),
            Step::new(
                "Subscriptions carry filters. The Email Service only wants discounts of 10% or more.",
                1500,
                |ctx: Ctx| async move {
                    broadcast(&ctx, "PriceChanged(sku-9, -5%)", false).await;
                    Ok(())
                },
            ),
            publish("PriceChanged(sku-9, -25%)"),
            fan_out_step("PriceChanged(sku-9, -25%)", true),
            Step::new(
                "Filtering happens in the broker, so subscribers never see what they don't want.",
                800,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    ctx.delay(300).await;
                    Ok(())
                },
            ),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{PatternController, PatternSession};
    use crate::timing::Pacer;

    fn statuses(state: &PubSubState, subscriber: &str) -> Vec<DeliveryStatus> {
        state
            .deliveries
            .iter()
            .filter(|d| d.subscriber == subscriber)
            .map(|d| d.status)
            .collect()
    }

    #[tokio::test]
    async fn test_fan_out_reaches_everyone() {
        let session = PatternSession::new(PubSubPattern, Pacer::instant());
        session.run_to_completion("fan-out").await.unwrap();

        let state = session.with_state(|s| s.clone()).await;
        assert_eq!(state.deliveries.len(), 3);
        assert!(state
            .deliveries
            .iter()
            .all(|d| d.status == DeliveryStatus::Delivered));
    }

    #[tokio::test]
    async fn test_offline_subscriber_gets_replay() {
        let session = PatternSession::new(PubSubPattern, Pacer::instant());
        session.load_scenario("subscriber-offline").await.unwrap();
        for _ in 0..3 {
            session.next_step().await.unwrap();
        }

        let pending = session.with_state(|s| statuses(s, "email")).await;
        assert_eq!(pending, vec![DeliveryStatus::Pending]);

        session.next_step().await.unwrap();
        let delivered = session.with_state(|s| statuses(s, "email")).await;
        assert_eq!(delivered, vec![DeliveryStatus::Delivered]);
    }

    #[tokio::test]
    async fn test_filter_skips_email_for_small_discount() {
        let session = PatternSession::new(PubSubPattern, Pacer::instant());
        session.run_to_completion("filtered").await.unwrap();

        let state = session.with_state(|s| s.clone()).await;
        assert_eq!(
            statuses(&state, "email"),
            vec![DeliveryStatus::Filtered, DeliveryStatus::Delivered]
        );
        assert_eq!(
            statuses(&state, "search"),
            vec![DeliveryStatus::Delivered, DeliveryStatus::Delivered]
        );
    }
}
