use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::FlowscopeResult;
use crate::models::{FlowKind, MessageFlow, Topology};
use crate::timing::Pacer;

pub type StepAction<S> =
    Arc<dyn Fn(StepContext<S>) -> BoxFuture<'static, FlowscopeResult<()>> + Send + Sync>;

/// Everything a step action is allowed to touch, passed in explicitly.
pub struct StepContext<S> {
    state: Arc<RwLock<S>>,
    pacer: Pacer,
    topology: Arc<Topology>,
}

impl<S> Clone for StepContext<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            pacer: self.pacer.clone(),
            topology: Arc::clone(&self.topology),
        }
    }
}

impl<S: Send + Sync + 'static> StepContext<S> {
    pub fn new(state: Arc<RwLock<S>>, pacer: Pacer, topology: Arc<Topology>) -> Self {
        Self {
            state,
            pacer,
            topology,
        }
    }

    pub fn state(&self) -> &Arc<RwLock<S>> {
        &self.state
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Mutates the pattern state under the write lock.
    pub async fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        let mut state = self.state.write().await;
        f(&mut state)
    }

    pub async fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.state.read().await;
        f(&state)
    }

    /// Waits `ms` scaled by the current speed.
    pub async fn delay(&self, ms: u64) {
        self.pacer.delay(ms).await;
    }

    /// Builds a token travelling between two services of this topology.
    pub fn flow(&self, from: &str, to: &str, kind: FlowKind, label: &str) -> MessageFlow {
        let path = (self.topology.position(from), self.topology.position(to));
        MessageFlow::new(from, to, kind, label, path)
    }
}

/// One narrated unit of a scenario.
pub struct Step<S> {
    explanation: String,
    duration_ms: u64,
    action: StepAction<S>,
}

impl<S> Clone for Step<S> {
    fn clone(&self) -> Self {
        Self {
            explanation: self.explanation.clone(),
            duration_ms: self.duration_ms,
            action: Arc::clone(&self.action),
        }
    }
}

impl<S> fmt::Debug for Step<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("explanation", &self.explanation)
            .field("duration_ms", &self.duration_ms)
            .finish_non_exhaustive()
    }
}

impl<S: Send + Sync + 'static> Step<S> {
    pub fn new<F, Fut>(explanation: impl Into<String>, duration_ms: u64, action: F) -> Self
    where
        F: Fn(StepContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FlowscopeResult<()>> + Send + 'static,
    {
        let action: StepAction<S> = Arc::new(
            move |ctx: StepContext<S>| -> BoxFuture<'static, FlowscopeResult<()>> {
                Box::pin(action(ctx))
            },
        );

        Self {
            explanation: explanation.into(),
            duration_ms,
            action,
        }
    }

    /// A step that only narrates and touches no state.
    pub fn narration(explanation: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(explanation, duration_ms, |_ctx: StepContext<S>| async {
            Ok(())
        })
    }

    pub fn run(&self, ctx: StepContext<S>) -> BoxFuture<'static, FlowscopeResult<()>> {
        (self.action)(ctx)
    }
}

impl<S> Step<S> {
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// A named, ordered list of steps.
pub struct Scenario<S> {
    pub name: String,
    pub steps: Vec<Step<S>>,
}

impl<S> Clone for Scenario<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            steps: self.steps.clone(),
        }
    }
}

impl<S> fmt::Debug for Scenario<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .finish()
    }
}

impl<S> Scenario<S> {
    pub fn new(name: impl Into<String>, steps: Vec<Step<S>>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&Step<S>> {
        self.steps.get(index)
    }

    /// Sum of the nominal step durations at 1x.
    pub fn nominal_duration_ms(&self) -> u64 {
        self.steps.iter().map(|s| s.duration_ms).sum()
    }
}

/// Catalog entry for a scenario a pattern can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScenarioInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}
