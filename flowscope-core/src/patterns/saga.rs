use serde::Serialize;

use crate::event_log::LogKind;
use crate::models::{
    FlowKind, LedgerTable, PatternId, RowTone, SagaTxStatus, ServiceKind, ServiceStatus,
    Topology, TransactionLogEntry,
};
use crate::playback::{Scenario, ScenarioInfo, Step, StepContext};

use super::{Indicator, PatternDefinition, PatternState, ViewState};

type Ctx = StepContext<SagaState>;

static SCENARIOS: [ScenarioInfo; 3] = [
    ScenarioInfo {
        id: "happy-path",
        name: "Happy Path",
        description: "Order, payment and inventory all succeed and the order is approved.",
    },
    ScenarioInfo {
        id: "payment-fails",
        name: "Payment Fails",
        description: "The card is declined and the order is cancelled by compensation.",
    },
    ScenarioInfo {
        id: "out-of-stock",
        name: "Out of Stock",
        description: "Inventory fails last, so the payment is refunded and the order cancelled.",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SagaStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Compensating,
    Compensated,
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SagaStatus::Idle => write!(f, "idle"),
            SagaStatus::Running => write!(f, "running"),
            SagaStatus::Completed => write!(f, "completed"),
            SagaStatus::Compensating => write!(f, "compensating"),
            SagaStatus::Compensated => write!(f, "compensated"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SagaState {
    view: ViewState,
    pub transactions: Vec<TransactionLogEntry>,
    pub saga_status: SagaStatus,
}

impl SagaState {
    fn record(&mut self, step: &str, action: &str, status: SagaTxStatus) {
        self.transactions
            .push(TransactionLogEntry::new(step, action, status));
    }
}

impl PatternState for SagaState {
    fn view(&self) -> &ViewState {
        &self.view
    }

    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    fn reset_for_scenario(&mut self, name: &str) {
        self.view.start_scenario(name);
        self.transactions.clear();
        self.saga_status = SagaStatus::Idle;
    }

    fn ledger(&self) -> Option<LedgerTable> {
        let mut table = LedgerTable::new("Transaction log", &["Step", "Action", "Status", "Time"]);
        for tx in &self.transactions {
            let tone = match tx.status {
                SagaTxStatus::Success => RowTone::Good,
                SagaTxStatus::Error => RowTone::Bad,
                SagaTxStatus::Compensating => RowTone::Warn,
            };
            table.push(
                vec![
                    tx.step.clone(),
                    tx.action.clone(),
                    tx.status.to_string(),
                    tx.timestamp.format("%H:%M:%S").to_string(),
                ],
                tone,
            );
        }
        Some(table)
    }

    fn indicators(&self) -> Vec<Indicator> {
        let tone = match self.saga_status {
            SagaStatus::Completed => RowTone::Good,
            SagaStatus::Compensating | SagaStatus::Compensated => RowTone::Warn,
            SagaStatus::Idle | SagaStatus::Running => RowTone::Neutral,
        };
        vec![Indicator::new("Saga", self.saga_status, tone)]
    }
}

pub struct SagaPattern;

impl PatternDefinition for SagaPattern {
    type State = SagaState;

    fn id(&self) -> PatternId {
        PatternId::Saga
    }

    fn topology(&self) -> Topology {
        Topology::new()
            .with_node("client", "Client", ServiceKind::Client, 8.0, 50.0)
            .with_node("orchestrator", "Orchestrator", ServiceKind::Service, 35.0, 50.0)
            .with_node("orders", "Order Service", ServiceKind::Service, 72.0, 15.0)
            .with_node("payment", "Payment Service", ServiceKind::Service, 88.0, 50.0)
            .with_node("inventory", "Inventory Service", ServiceKind::Service, 72.0, 85.0)
    }

    fn scenarios(&self) -> &'static [ScenarioInfo] {
        &SCENARIOS
    }

    fn build(&self, scenario_id: &str) -> Option<Scenario<SagaState>> {
        match scenario_id {
            "happy-path" => Some(happy_path()),
            "payment-fails" => Some(payment_fails()),
            "out-of-stock" => Some(out_of_stock()),
            _ => None,
        }
    }
}

fn start_saga() -> Step<SagaState> {
    Step::new(
        "The client places an order and the orchestrator starts a new saga.",
        1200,
        |ctx: Ctx| async move {
            ctx.log("Client: POST /orders", LogKind::Request).await;
            ctx.send("client", "orchestrator", FlowKind::Http, "POST /orders")
                .await;
            ctx.update(|s| s.saga_status = SagaStatus::Running).await;
            ctx.delay(600).await;
            ctx.log("Orchestrator: saga started for order 1042", LogKind::Info)
                .await;
            Ok(())
        },
    )
}

fn create_order() -> Step<SagaState> {
    Step::new(
        "Step 1: create the order in PENDING state.",
        1200,
        |ctx: Ctx| async move {
            ctx.send("orchestrator", "orders", FlowKind::Http, "CreateOrder")
                .await;
            ctx.delay(500).await;
            ctx.update(|s| s.record("Order", "create order (PENDING)", SagaTxStatus::Success))
                .await;
            ctx.log("Order Service: order 1042 created (PENDING)", LogKind::Success)
                .await;
            Ok(())
        },
    )
}

fn charge_payment() -> Step<SagaState> {
    Step::new(
        "Step 2: charge the customer.",
        1200,
        |ctx: Ctx| async move {
            ctx.send("orchestrator", "payment", FlowKind::Http, "ChargePayment")
                .await;
            ctx.delay(500).await;
            ctx.update(|s| s.record("Payment", "charge $99.50", SagaTxStatus::Success))
                .await;
            ctx.log("Payment Service: $99.50 charged", LogKind::Success).await;
            Ok(())
        },
    )
}

fn begin_compensation(completed: usize) -> Step<SagaState> {
    Step::new(
        "The orchestrator undoes the completed steps in reverse order.",
        1200,
        move |ctx: Ctx| async move {
            ctx.clear_flows().await;
            ctx.update(|s| s.saga_status = SagaStatus::Compensating).await;
            ctx.log(
                format!("Orchestrator: compensating {} completed step(s)", completed),
                LogKind::Warning,
            )
            .await;
            ctx.delay(500).await;
            Ok(())
        },
    )
}

fn cancel_order() -> Step<SagaState> {
    Step::new(
        "Compensation: cancel the order.",
        1200,
        |ctx: Ctx| async move {
            ctx.send("orchestrator", "orders", FlowKind::Http, "CancelOrder")
                .await;
            ctx.delay(500).await;
            ctx.update(|s| s.record("Order", "cancel order", SagaTxStatus::Compensating))
                .await;
            ctx.log("Order Service: order 1042 CANCELLED", LogKind::Warning)
                .await;
            Ok(())
        },
    )
}

fn finish_compensated(reason: &'static str) -> Step<SagaState> {
    Step::new(
        "The saga ends consistent: every completed step has been undone.",
        1200,
        move |ctx: Ctx| async move {
            ctx.send_result("orchestrator", "client", FlowKind::Http, reason, false)
                .await;
            ctx.update(|s| s.saga_status = SagaStatus::Compensated).await;
            ctx.log(format!("Client: 409 Conflict ({})", reason), LogKind::Error)
                .await;
            ctx.log("Orchestrator: saga compensated", LogKind::Info).await;
            ctx.delay(600).await;
            ctx.clear_flows().await;
            Ok(())
        },
    )
}

fn happy_path() -> Scenario<SagaState> {
    Scenario::new(
        "Happy Path",
        vec![
            start_saga(),
            create_order(),
            charge_payment(),
            Step::new(
                "Step 3: reserve the items in inventory.",
                1200,
                |ctx: Ctx| async move {
                    ctx.send("orchestrator", "inventory", FlowKind::Http, "ReserveStock")
                        .await;
                    ctx.delay(500).await;
                    ctx.update(|s| s.record("Inventory", "reserve 2 items", SagaTxStatus::Success))
                        .await;
                    ctx.log("Inventory Service: 2 items reserved", LogKind::Success)
                        .await;
                    Ok(())
                },
            ),
            Step::new(
                "Every step succeeded, so the orchestrator approves the order.",
                1200,
                |ctx: Ctx| async move {
                    ctx.send("orchestrator", "orders", FlowKind::Http, "ApproveOrder")
                        .await;
                    ctx.delay(500).await;
                    ctx.update(|s| {
                        s.record("Order", "approve order", SagaTxStatus::Success);
                        s.saga_status = SagaStatus::Completed;
                    })
                    .await;
                    ctx.log("Orchestrator: saga completed, order APPROVED", LogKind::Success)
                        .await;
                    Ok(())
                },
            ),
            Step::new(
                "The client gets its confirmation.",
                1000,
                |ctx: Ctx| async move {
                    ctx.send_result("orchestrator", "client", FlowKind::Http, "201 Created", true)
                        .await;
                    ctx.log("Client: 201 Created", LogKind::Success).await;
                    ctx.delay(600).await;
                    ctx.clear_flows().await;
                    Ok(())
                },
            ),
        ],
    )
}

fn payment_fails() -> Scenario<SagaState> {
    Scenario::new(
        "Payment Fails",
        vec![
            start_saga(),
            create_order(),
            Step::new(
                "Step 2 fails: the payment is declined.",
                1500,
                |ctx: Ctx| async move {
                    ctx.set_status("payment", ServiceStatus::Degraded).await;
                    ctx.send_result("orchestrator", "payment", FlowKind::Http, "ChargePayment", false)
                        .await;
                    ctx.delay(500).await;
                    ctx.update(|s| s.record("Payment", "charge $99.50", SagaTxStatus::Error))
                        .await;
                    ctx.log("Payment Service: card declined", LogKind::Error).await;
                    ctx.set_status("payment", ServiceStatus::Healthy).await;
                    Ok(())
                },
            ),
            begin_compensation(1),
            cancel_order(),
            finish_compensated("payment declined"),
        ],
    )
}

fn out_of_stock() -> Scenario<SagaState> {
    Scenario::new(
        "Out of Stock",
        vec![
            start_saga(),
            create_order(),
            charge_payment(),
            Step::new(
                "Step 3 fails: there is not enough stock.",
                1500,
                |ctx: Ctx| async move {
                    ctx.send_result("orchestrator", "inventory", FlowKind::Http, "ReserveStock", false)
                        .await;
                    ctx.delay(500).await;
                    ctx.update(|s| s.record("Inventory", "reserve 2 items", SagaTxStatus::Error))
                        .await;
                    ctx.log("Inventory Service: out of stock", LogKind::Error).await;
                    Ok(())
                },
            ),
            begin_compensation(2),
            Step::new(
                "Compensation: refund the payment.",
                1200,
                |ctx: Ctx| async move {
                    ctx.send("orchestrator", "payment", FlowKind::Http, "RefundPayment")
                        .await;
                    ctx.delay(500).await;
                    ctx.update(|s| s.record("Payment", "refund $99.50", SagaTxStatus::Compensating))
                        .await;
                    ctx.log("Payment Service: $99.50 refunded", LogKind::Warning)
                        .await;
                    Ok(())
                },
            ),
            cancel_order(),
            finish_compensated("out of stock"),
        ],
    )
}
