//! Pattern state containers, scenario scripts and the controller the
//! presentation layer drives.
//!
//! Each pattern module supplies a [`PatternDefinition`]: a topology, a list of
//! scenarios and a state type implementing [`PatternState`]. A
//! [`PatternSession`] owns one state instance plus its playback engine and is
//! exposed to the UI as an `Arc<dyn PatternController>`.

pub mod async_messaging;
pub mod circuit_breaker;
pub mod outbox;
pub mod pub_sub;
pub mod registry;
pub mod request_response;
pub mod saga;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{FlowscopeError, FlowscopeResult};
use crate::event_log::{LogEntry, LogKind, LogRecorder};
use crate::models::{
    FlowKind, LedgerTable, MessageFlow, PatternId, PatternInfo, RowTone, ServiceStatus, Topology,
};
use crate::playback::{
    PlaybackEngine, PlaybackSnapshot, Scenario, ScenarioInfo, StepContext, StepOutcome,
};
use crate::timing::{Pacer, SpeedControl};

pub use registry::{catalog, create_session, find, search};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityKind {
    ScenarioStarted {
        name: String,
    },
    Log {
        message: String,
        kind: LogKind,
    },
    StatusChange {
        service: String,
        from: ServiceStatus,
        to: ServiceStatus,
    },
}

/// One line of the per-run activity journal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Activity {
    pub seq: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: ActivityKind,
}

/// View state every pattern shares: the log panel, tokens in flight, service
/// health and the activity timeline.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    logs: LogRecorder,
    flows: Vec<MessageFlow>,
    statuses: HashMap<String, ServiceStatus>,
    timeline: Vec<Activity>,
    next_seq: u64,
    scenario: Option<String>,
}

impl ViewState {
    pub fn log(&mut self, message: impl Into<String>, kind: LogKind) -> LogEntry {
        let entry = self.logs.add(message, kind);
        self.record(ActivityKind::Log {
            message: entry.message.clone(),
            kind,
        });
        entry
    }

    pub fn logs(&self) -> &LogRecorder {
        &self.logs
    }

    pub fn flows(&self) -> &[MessageFlow] {
        &self.flows
    }

    pub fn set_flows(&mut self, flows: Vec<MessageFlow>) {
        self.flows = flows;
    }

    pub fn clear_flows(&mut self) {
        self.flows.clear();
    }

    /// Sets a service's health. Only actual transitions reach the timeline.
    pub fn set_status(&mut self, service: &str, status: ServiceStatus) -> bool {
        let from = self.status(service);
        if from == status {
            return false;
        }
        self.statuses.insert(service.to_string(), status);
        self.record(ActivityKind::StatusChange {
            service: service.to_string(),
            from,
            to: status,
        });
        true
    }

    pub fn status(&self, service: &str) -> ServiceStatus {
        self.statuses.get(service).copied().unwrap_or_default()
    }

    pub fn timeline(&self) -> &[Activity] {
        &self.timeline
    }

    pub fn scenario(&self) -> Option<&str> {
        self.scenario.as_deref()
    }

    /// Clears everything from the previous run and marks the new one.
    pub fn start_scenario(&mut self, name: &str) {
        self.logs.clear();
        self.flows.clear();
        self.statuses.clear();
        self.timeline.clear();
        self.scenario = Some(name.to_string());
        self.record(ActivityKind::ScenarioStarted {
            name: name.to_string(),
        });
    }

    fn record(&mut self, kind: ActivityKind) {
        self.next_seq += 1;
        self.timeline.push(Activity {
            seq: self.next_seq,
            at: Utc::now(),
            kind,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Indicator {
    pub label: String,
    pub value: String,
    pub tone: RowTone,
}

impl Indicator {
    pub fn new(label: impl Into<String>, value: impl ToString, tone: RowTone) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
            tone,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "control", content = "value", rename_all = "snake_case")]
pub enum PatternControl {
    /// Flip the pattern's dependency between up and down.
    ToggleDependency,
    /// Consumer lag in milliseconds.
    SetLag(u64),
}

impl PatternControl {
    pub fn kind(&self) -> ControlKind {
        match self {
            PatternControl::ToggleDependency => ControlKind::ToggleDependency,
            PatternControl::SetLag(_) => ControlKind::Lag,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    ToggleDependency,
    Lag,
}

impl std::fmt::Display for ControlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlKind::ToggleDependency => write!(f, "toggle-dependency"),
            ControlKind::Lag => write!(f, "lag"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlInfo {
    pub kind: ControlKind,
    pub label: &'static str,
    pub description: &'static str,
}

/// Mutable state owned by one pattern instance.
///
/// Ledgers and the view are cleared by [`reset_for_scenario`] before every
/// run; settings changed through [`apply_control`] are kept.
///
/// [`reset_for_scenario`]: PatternState::reset_for_scenario
/// [`apply_control`]: PatternState::apply_control
pub trait PatternState: Default + Send + Sync + 'static {
    fn view(&self) -> &ViewState;

    fn view_mut(&mut self) -> &mut ViewState;

    fn reset_for_scenario(&mut self, name: &str) {
        self.view_mut().start_scenario(name);
    }

    fn ledger(&self) -> Option<LedgerTable> {
        None
    }

    fn indicators(&self) -> Vec<Indicator> {
        Vec::new()
    }

    /// Only called with controls the pattern lists in its definition.
    fn apply_control(&mut self, _control: PatternControl) -> FlowscopeResult<()> {
        Ok(())
    }
}

impl<S: PatternState> StepContext<S> {
    pub async fn log(&self, message: impl Into<String>, kind: LogKind) {
        let message = message.into();
        self.update(move |s| {
            s.view_mut().log(message, kind);
        })
        .await;
    }

    /// Replaces the tokens in flight with a single hop.
    pub async fn send(&self, from: &str, to: &str, kind: FlowKind, label: &str) {
        let flow = self.flow(from, to, kind, label);
        self.update(move |s| s.view_mut().set_flows(vec![flow])).await;
    }

    /// Like [`send`](Self::send), with the hop already marked as succeeded
    /// or failed.
    pub async fn send_result(&self, from: &str, to: &str, kind: FlowKind, label: &str, ok: bool) {
        let flow = self.flow(from, to, kind, label).with_success(ok);
        self.update(move |s| s.view_mut().set_flows(vec![flow])).await;
    }

    /// Replaces the tokens in flight with several parallel hops.
    pub async fn send_all(&self, hops: &[(&str, &str, FlowKind, &str)]) {
        let flows: Vec<_> = hops
            .iter()
            .map(|(from, to, kind, label)| self.flow(from, to, *kind, label))
            .collect();
        self.update(move |s| s.view_mut().set_flows(flows)).await;
    }

    pub async fn clear_flows(&self) {
        self.update(|s| s.view_mut().clear_flows()).await;
    }

    pub async fn set_status(&self, service: &str, status: ServiceStatus) {
        self.update(|s| {
            s.view_mut().set_status(service, status);
        })
        .await;
    }
}

/// Static description of a pattern: where its services sit, which scenarios
/// it can build and which controls it accepts.
pub trait PatternDefinition: Send + Sync + 'static {
    type State: PatternState;

    fn id(&self) -> PatternId;

    fn topology(&self) -> Topology;

    fn scenarios(&self) -> &'static [ScenarioInfo];

    fn build(&self, scenario_id: &str) -> Option<Scenario<Self::State>>;

    fn controls(&self) -> &'static [ControlInfo] {
        &[]
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternSnapshot {
    pub pattern: PatternId,
    pub playback: PlaybackSnapshot,
    pub logs: Vec<LogEntry>,
    pub flows: Vec<MessageFlow>,
    pub statuses: BTreeMap<String, ServiceStatus>,
    pub timeline: Vec<Activity>,
    pub ledger: Option<LedgerTable>,
    pub indicators: Vec<Indicator>,
}

/// Object-safe handle over one running pattern instance.
#[async_trait]
pub trait PatternController: Send + Sync {
    fn info(&self) -> &'static PatternInfo;

    fn scenarios(&self) -> &'static [ScenarioInfo];

    fn controls(&self) -> &'static [ControlInfo];

    fn topology(&self) -> &Topology;

    fn speed(&self) -> &SpeedControl;

    /// Builds and loads a scenario by id. `Ok(false)` when it has no steps.
    async fn load_scenario(&self, scenario_id: &str) -> FlowscopeResult<bool>;

    async fn next_step(&self) -> FlowscopeResult<StepOutcome>;

    fn previous_step(&self) -> bool;

    fn toggle_autoplay(&self) -> bool;

    async fn apply_control(&self, control: PatternControl) -> FlowscopeResult<()>;

    fn playback(&self) -> PlaybackSnapshot;

    async fn snapshot(&self) -> PatternSnapshot;

    fn shutdown(&self);

    /// Loads a scenario and steps through it until the end. Returns the
    /// number of steps executed.
    async fn run_to_completion(&self, scenario_id: &str) -> FlowscopeResult<usize> {
        self.load_scenario(scenario_id).await?;
        self.play().await
    }

    /// Steps the loaded scenario from the cursor to its end and returns the
    /// number of steps executed.
    async fn play(&self) -> FlowscopeResult<usize> {
        let mut executed = 0;
        loop {
            match self.next_step().await? {
                StepOutcome::Advanced => executed += 1,
                StepOutcome::Busy => tokio::task::yield_now().await,
                StepOutcome::Complete | StepOutcome::NotLoaded | StepOutcome::Superseded => {
                    break
                }
            }
        }
        Ok(executed)
    }
}

/// One live pattern instance: its state, topology and playback engine.
pub struct PatternSession<P: PatternDefinition> {
    definition: P,
    info: &'static PatternInfo,
    engine: PlaybackEngine<P::State>,
}

impl<P: PatternDefinition> PatternSession<P> {
    pub fn new(definition: P, pacer: Pacer) -> Self {
        let info = registry::info(definition.id());
        let topology = Arc::new(definition.topology());
        let state = Arc::new(RwLock::new(P::State::default()));
        let ctx = StepContext::new(state, pacer, topology);
        let engine = PlaybackEngine::new(ctx, |state: &mut P::State, name: &str| {
            state.reset_for_scenario(name);
        });

        debug!(pattern = %info.id, "Pattern session created");

        Self {
            definition,
            info,
            engine,
        }
    }

    pub fn engine(&self) -> &PlaybackEngine<P::State> {
        &self.engine
    }

    pub async fn with_state<R>(&self, f: impl FnOnce(&P::State) -> R) -> R {
        self.engine.context().read(f).await
    }
}

impl<P: PatternDefinition> Drop for PatternSession<P> {
    fn drop(&mut self) {
        self.engine.shutdown();
    }
}

#[async_trait]
impl<P: PatternDefinition> PatternController for PatternSession<P> {
    fn info(&self) -> &'static PatternInfo {
        self.info
    }

    fn scenarios(&self) -> &'static [ScenarioInfo] {
        self.definition.scenarios()
    }

    fn controls(&self) -> &'static [ControlInfo] {
        self.definition.controls()
    }

    fn topology(&self) -> &Topology {
        self.engine.context().topology()
    }

    fn speed(&self) -> &SpeedControl {
        self.engine.context().pacer().speed()
    }

    async fn load_scenario(&self, scenario_id: &str) -> FlowscopeResult<bool> {
        let scenario = self
            .definition
            .build(scenario_id)
            .ok_or_else(|| FlowscopeError::scenario_not_found(self.info.id.slug(), scenario_id))?;
        Ok(self.engine.load_scenario(scenario).await)
    }

    async fn next_step(&self) -> FlowscopeResult<StepOutcome> {
        self.engine.go_to_next_step().await
    }

    fn previous_step(&self) -> bool {
        self.engine.go_to_previous_step()
    }

    fn toggle_autoplay(&self) -> bool {
        self.engine.toggle_auto_play()
    }

    async fn apply_control(&self, control: PatternControl) -> FlowscopeResult<()> {
        if !self
            .definition
            .controls()
            .iter()
            .any(|c| c.kind == control.kind())
        {
            return Err(FlowscopeError::unsupported_control(
                self.info.id.slug(),
                control.kind().to_string(),
            ));
        }

        self.engine
            .context()
            .update(|state| state.apply_control(control))
            .await?;
        info!(pattern = %self.info.id, control = ?control, "Control applied");
        Ok(())
    }

    fn playback(&self) -> PlaybackSnapshot {
        self.engine.snapshot()
    }

    async fn snapshot(&self) -> PatternSnapshot {
        let playback = self.engine.snapshot();
        let topology = self.engine.context().topology();

        self.engine
            .context()
            .read(|state| {
                let view = state.view();
                PatternSnapshot {
                    pattern: self.info.id,
                    playback,
                    logs: view.logs().to_vec(),
                    flows: view.flows().to_vec(),
                    statuses: topology
                        .nodes
                        .iter()
                        .map(|n| (n.id.clone(), view.status(&n.id)))
                        .collect(),
                    timeline: view.timeline().to_vec(),
                    ledger: state.ledger(),
                    indicators: state.indicators(),
                }
            })
            .await
    }

    fn shutdown(&self) {
        self.engine.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_state_records_status_transitions_once() {
        let mut view = ViewState::default();
        view.start_scenario("Kafka Down");

        assert!(view.set_status("kafka", ServiceStatus::Down));
        assert!(!view.set_status("kafka", ServiceStatus::Down));
        assert!(view.set_status("kafka", ServiceStatus::Healthy));

        let changes = view
            .timeline()
            .iter()
            .filter(|a| matches!(a.kind, ActivityKind::StatusChange { .. }))
            .count();
        assert_eq!(changes, 2);
    }

    #[test]
    fn test_view_state_start_clears_previous_run() {
        let mut view = ViewState::default();
        view.start_scenario("First");
        view.log("hello", LogKind::Info);
        view.set_status("redis", ServiceStatus::Down);

        view.start_scenario("Second");
        assert!(view.logs().is_empty());
        assert!(view.flows().is_empty());
        assert_eq!(view.status("redis"), ServiceStatus::Healthy);
        assert_eq!(view.scenario(), Some("Second"));
        assert_eq!(view.timeline().len(), 1);
        assert!(matches!(
            view.timeline()[0].kind,
            ActivityKind::ScenarioStarted { .. }
        ));
    }

    #[test]
    fn test_timeline_is_not_capped() {
        let mut view = ViewState::default();
        for i in 0..25 {
            view.log(format!("entry {}", i), LogKind::Info);
        }
        assert_eq!(view.logs().len(), 10);
        assert_eq!(view.timeline().len(), 25);

        let seqs: Vec<_> = view.timeline().iter().map(|a| a.seq).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_control_serialization() {
        let json = serde_json::to_string(&PatternControl::SetLag(1500)).unwrap();
        assert_eq!(json, r#"{"control":"set_lag","value":1500}"#);
        assert_eq!(PatternControl::SetLag(0).kind(), ControlKind::Lag);
    }
}
