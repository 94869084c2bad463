use crate::error::FlowscopeResult;
use crate::event_log::LogKind;
use crate::models::{
    BreakerCall, BreakerState, CallOutcome, FlowKind, LedgerTable, PatternId, RowTone,
    ServiceKind, ServiceStatus, Topology,
};
use crate::playback::{Scenario, ScenarioInfo, Step, StepContext};

use super::{
    ControlInfo, ControlKind, Indicator, PatternControl, PatternDefinition, PatternState,
    ViewState,
};

type Ctx = StepContext<CircuitBreakerState>;

/// Consecutive failures that trip the breaker.
pub const FAILURE_THRESHOLD: u32 = 3;

const DOWNSTREAM: &str = "recommendations";

static SCENARIOS: [ScenarioInfo; 3] = [
    ScenarioInfo {
        id: "healthy",
        name: "Healthy",
        description: "Calls pass through a closed breaker.",
    },
    ScenarioInfo {
        id: "trip-open",
        name: "Trip Open",
        description: "Repeated timeouts trip the breaker; calls then fail fast to a fallback.",
    },
    ScenarioInfo {
        id: "half-open-recovery",
        name: "Half-Open Recovery",
        description: "After the reset timeout a trial call succeeds and closes the breaker.",
    },
];

static CONTROLS: [ControlInfo; 1] = [ControlInfo {
    kind: ControlKind::ToggleDependency,
    label: "Recommendation Service",
    description: "Make the downstream fail or recover",
}];

#[derive(Debug, Clone)]
pub struct CircuitBreakerState {
    view: ViewState,
    pub downstream_enabled: bool,
    pub breaker: BreakerState,
    pub failure_count: u32,
    pub calls: Vec<BreakerCall>,
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self {
            view: ViewState::default(),
            downstream_enabled: true,
            breaker: BreakerState::Closed,
            failure_count: 0,
            calls: Vec::new(),
        }
    }
}

impl CircuitBreakerState {
    /// What a call would do right now, given the breaker and the downstream.
    pub fn outcome_for(&self, downstream_ok: bool) -> CallOutcome {
        if self.breaker == BreakerState::Open {
            CallOutcome::Rejected
        } else if downstream_ok && self.downstream_enabled {
            CallOutcome::Success
        } else {
            CallOutcome::Failure
        }
    }

    /// Records a call and applies the breaker transition it causes.
    pub fn record(&mut self, outcome: CallOutcome) -> BreakerState {
        match (self.breaker, outcome) {
            (BreakerState::Closed, CallOutcome::Success) => self.failure_count = 0,
            (BreakerState::Closed, CallOutcome::Failure) => {
                self.failure_count += 1;
                if self.failure_count >= FAILURE_THRESHOLD {
                    self.breaker = BreakerState::Open;
                }
            }
            (BreakerState::HalfOpen, CallOutcome::Success) => {
                self.breaker = BreakerState::Closed;
                self.failure_count = 0;
            }
            (BreakerState::HalfOpen, CallOutcome::Failure) => {
                self.breaker = BreakerState::Open;
            }
            _ => {}
        }

        self.calls.push(BreakerCall {
            attempt: self.calls.len() as u32 + 1,
            outcome,
            state: self.breaker,
        });
        self.breaker
    }
}

impl PatternState for CircuitBreakerState {
    fn view(&self) -> &ViewState {
        &self.view
    }

    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    fn reset_for_scenario(&mut self, name: &str) {
        self.view.start_scenario(name);
        self.breaker = BreakerState::Closed;
        self.failure_count = 0;
        self.calls.clear();
        if !self.downstream_enabled {
            self.view.set_status(DOWNSTREAM, ServiceStatus::Down);
        }
    }

    fn ledger(&self) -> Option<LedgerTable> {
        let mut table = LedgerTable::new("Calls", &["#", "Outcome", "Breaker"]);
        for call in &self.calls {
            let tone = match call.outcome {
                CallOutcome::Success => RowTone::Good,
                CallOutcome::Failure => RowTone::Bad,
                CallOutcome::Rejected => RowTone::Warn,
            };
            table.push(
                vec![
                    call.attempt.to_string(),
                    call.outcome.to_string(),
                    call.state.to_string(),
                ],
                tone,
            );
        }
        Some(table)
    }

    fn indicators(&self) -> Vec<Indicator> {
        vec![
            Indicator::new(
                "Breaker",
                self.breaker,
                match self.breaker {
                    BreakerState::Closed => RowTone::Good,
                    BreakerState::HalfOpen => RowTone::Warn,
                    BreakerState::Open => RowTone::Bad,
                },
            ),
            Indicator::new(
                "Failures",
                format!("{}/{}", self.failure_count, FAILURE_THRESHOLD),
                if self.failure_count > 0 { RowTone::Warn } else { RowTone::Neutral },
            ),
            Indicator::new(
                "Downstream",
                if self.downstream_enabled { "up" } else { "down" },
                if self.downstream_enabled { RowTone::Good } else { RowTone::Bad },
            ),
        ]
    }

    fn apply_control(&mut self, control: PatternControl) -> FlowscopeResult<()> {
        if control == PatternControl::ToggleDependency {
            self.downstream_enabled = !self.downstream_enabled;
            let status = if self.downstream_enabled {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Down
            };
            self.view.set_status(DOWNSTREAM, status);
        }
        Ok(())
    }
}

pub struct CircuitBreakerPattern;

impl PatternDefinition for CircuitBreakerPattern {
    type State = CircuitBreakerState;

    fn id(&self) -> PatternId {
        PatternId::CircuitBreaker
    }

    fn topology(&self) -> Topology {
        Topology::new()
            .with_node("client", "Client", ServiceKind::Client, 8.0, 50.0)
            .with_node("checkout", "Checkout Service", ServiceKind::Service, 32.0, 50.0)
            .with_node("breaker", "Circuit Breaker", ServiceKind::Gateway, 58.0, 50.0)
            .with_node(DOWNSTREAM, "Recommendation Service", ServiceKind::Service, 88.0, 50.0)
            .with_node("fallback", "Fallback Cache", ServiceKind::Cache, 58.0, 85.0)
    }

    fn scenarios(&self) -> &'static [ScenarioInfo] {
        &SCENARIOS
    }

    fn build(&self, scenario_id: &str) -> Option<Scenario<CircuitBreakerState>> {
        match scenario_id {
            "healthy" => Some(healthy()),
            "trip-open" => Some(trip_open()),
            "half-open-recovery" => Some(half_open_recovery()),
            _ => None,
        }
    }

    fn controls(&self) -> &'static [ControlInfo] {
        &CONTROLS
    }
}

/// A call through the breaker. `downstream_ok` is whether the downstream
/// would answer in time; the breaker state and the dependency toggle decide
/// what actually happens.
fn call(explanation: &'static str, downstream_ok: bool) -> Step<CircuitBreakerState> {
    Step::new(explanation, 1500, move |ctx: Ctx| async move {
        ctx.send("checkout", "breaker", FlowKind::Http, "GET /recommendations")
            .await;
        ctx.delay(300).await;

        let outcome = ctx.read(|s| s.outcome_for(downstream_ok)).await;
        match outcome {
            CallOutcome::Success => {
                ctx.set_status(DOWNSTREAM, ServiceStatus::Healthy).await;
                ctx.send_result("breaker", DOWNSTREAM, FlowKind::Http, "200 OK", true)
                    .await;
                ctx.delay(400).await;
                let state = ctx.update(|s| s.record(outcome)).await;
                ctx.log("Recommendation Service: 200 OK (45ms)", LogKind::Success)
                    .await;
                if state == BreakerState::Closed {
                    ctx.log("Breaker: CLOSED, failure count reset", LogKind::Info)
                        .await;
                }
            }
            CallOutcome::Failure => {
                ctx.set_status(DOWNSTREAM, ServiceStatus::Down).await;
                ctx.send_result("breaker", DOWNSTREAM, FlowKind::Http, "timeout", false)
                    .await;
                ctx.delay(600).await;
                let (state, failures) = ctx
                    .update(|s| (s.record(outcome), s.failure_count))
                    .await;
                ctx.log("Recommendation Service: timeout after 2s", LogKind::Error)
                    .await;
                if state == BreakerState::Open {
                    ctx.log(
                        format!("Breaker: OPEN after {} consecutive failures", failures),
                        LogKind::Error,
                    )
                    .await;
                } else {
                    ctx.log(
                        format!("Breaker: {}/{} failures", failures, FAILURE_THRESHOLD),
                        LogKind::Warning,
                    )
                    .await;
                }
            }
            CallOutcome::Rejected => {
                ctx.update(|s| s.record(outcome)).await;
                ctx.log("Breaker: OPEN, call rejected without waiting", LogKind::Warning)
                    .await;
                ctx.send_result("breaker", "fallback", FlowKind::Cache, "cached recs", true)
                    .await;
                ctx.delay(300).await;
                ctx.log("Checkout Service: serving cached recommendations", LogKind::Info)
                    .await;
            }
        }
        Ok(())
    })
}

fn healthy() -> Scenario<CircuitBreakerState> {
    Scenario::new(
        "Healthy",
        vec![
            call(
                "Checkout calls the Recommendation Service through a closed breaker.",
                true,
            ),
            call("Another call: the breaker only counts, it does not interfere.", true),
            Step::new(
                "No failures, so the breaker stays closed and adds almost no overhead.",
                1000,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    let failures = ctx.read(|s| s.failure_count).await;
                    ctx.log(
                        format!("Breaker: closed ({}/{} failures)", failures, FAILURE_THRESHOLD),
                        LogKind::Info,
                    )
                    .await;
                    ctx.delay(400).await;
                    Ok(())
                },
            ),
        ],
    )
}

fn trip_open() -> Scenario<CircuitBreakerState> {
    Scenario::new(
        "Trip Open",
        vec![
            call("A normal call succeeds.", true),
            call("The Recommendation Service starts timing out: failure 1.", false),
            call("Failure 2. Each timeout holds a checkout thread for 2 seconds.", false),
            call("Failure 3 reaches the threshold and the breaker trips open.", false),
            call(
                "While open, calls fail fast and checkout serves a cached fallback.",
                false,
            ),
            Step::new(
                "Users still get a page, and the failing service gets room to recover.",
                1000,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    ctx.log("Breaker: open for 30s before the next trial", LogKind::Info)
                        .await;
                    ctx.delay(400).await;
                    Ok(())
                },
            ),
        ],
    )
}

fn half_open_recovery() -> Scenario<CircuitBreakerState> {
    Scenario::new(
        "Half-Open Recovery",
        vec![
            Step::new(
                "The breaker is open after repeated failures.",
                1200,
                |ctx: Ctx| async move {
                    ctx.update(|s| {
                        s.breaker = BreakerState::Open;
                        s.failure_count = FAILURE_THRESHOLD;
                    })
                    .await;
                    ctx.set_status(DOWNSTREAM, ServiceStatus::Down).await;
                    ctx.log(
                        format!("Breaker: OPEN ({0}/{0} failures)", FAILURE_THRESHOLD),
                        LogKind::Error,
                    )
                    .await;
                    ctx.delay(500).await;
                    Ok(())
                },
            ),
            call("Calls are rejected immediately and served from the fallback.", true),
            Step::new(
                "The reset timeout expires: the breaker goes half-open and allows one trial call.",
                1500,
                |ctx: Ctx| async move {
                    ctx.clear_flows().await;
                    ctx.update(|s| s.breaker = BreakerState::HalfOpen).await;
                    ctx.log("Breaker: HALF-OPEN, allowing a trial request", LogKind::Warning)
                        .await;
                    ctx.delay(600).await;
                    Ok(())
                },
            ),
            call(
                "The downstream has recovered, the trial succeeds and the breaker closes.",
                true,
            ),
            call("Normal traffic resumes.", true),
        ],
    )
}
