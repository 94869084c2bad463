use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::error::{FlowscopeError, FlowscopeResult};

use super::step::{Scenario, StepContext};

/// How often autoplay retries while a manual step holds the engine.
const BUSY_POLL: Duration = Duration::from_millis(50);

/// Scheduler turns a reload grants an aborted step to release the engine.
const RELEASE_YIELDS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// A step ran and the cursor moved forward.
    Advanced,
    /// Another step is still executing.
    Busy,
    /// The cursor is already at the end.
    Complete,
    NotLoaded,
    /// A new scenario was loaded (or the engine shut down) while the step ran.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackPhase {
    Idle,
    Ready,
    Executing,
    Complete,
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Idle => write!(f, "idle"),
            PlaybackPhase::Ready => write!(f, "ready"),
            PlaybackPhase::Executing => write!(f, "executing"),
            PlaybackPhase::Complete => write!(f, "complete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackSnapshot {
    pub scenario: Option<String>,
    /// 1-based position for display, 0 when nothing is loaded.
    pub current_step: usize,
    pub total_steps: usize,
    /// Narration of the step under the cursor, empty once complete.
    pub explanation: String,
    pub is_running: bool,
    pub is_autoplaying: bool,
    pub phase: PlaybackPhase,
    pub speed: f64,
}

type ScenarioStartHook<S> = Arc<dyn Fn(&mut S, &str) + Send + Sync>;

struct Loaded<S> {
    scenario: Arc<Scenario<S>>,
    index: usize,
    generation: u64,
}

struct AutoplayTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct EngineShared<S> {
    ctx: StepContext<S>,
    on_scenario_start: ScenarioStartHook<S>,
    loaded: Mutex<Option<Loaded<S>>>,
    running: AtomicBool,
    autoplaying: AtomicBool,
    autoplay_epoch: AtomicU64,
    generation: AtomicU64,
    in_flight: Mutex<Option<AbortHandle>>,
    autoplay: Mutex<Option<AutoplayTask>>,
}

/// Holds the single-flight flag for the lifetime of one step.
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RunningGuard(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Sequences the steps of one loaded scenario.
///
/// Clones share the same cursor. Steps run one at a time on a spawned task;
/// autoplay is a second task that drives the same single-flight path and is
/// cancelled by toggling it off, loading another scenario or [`shutdown`].
///
/// [`shutdown`]: PlaybackEngine::shutdown
pub struct PlaybackEngine<S> {
    shared: Arc<EngineShared<S>>,
}

impl<S> Clone for PlaybackEngine<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: Send + Sync + 'static> PlaybackEngine<S> {
    pub fn new<F>(ctx: StepContext<S>, on_scenario_start: F) -> Self
    where
        F: Fn(&mut S, &str) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(EngineShared {
                ctx,
                on_scenario_start: Arc::new(on_scenario_start),
                loaded: Mutex::new(None),
                running: AtomicBool::new(false),
                autoplaying: AtomicBool::new(false),
                autoplay_epoch: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                autoplay: Mutex::new(None),
            }),
        }
    }

    pub fn context(&self) -> &StepContext<S> {
        &self.shared.ctx
    }

    /// Replaces the loaded scenario and rewinds to its first step.
    ///
    /// Returns `false` and changes nothing when the scenario has no steps.
    /// A step of the previous scenario is aborted and has released the
    /// single-flight flag by the time this returns, so the next
    /// [`go_to_next_step`] is not answered with [`StepOutcome::Busy`].
    ///
    /// [`go_to_next_step`]: PlaybackEngine::go_to_next_step
    pub async fn load_scenario(&self, scenario: Scenario<S>) -> bool {
        if scenario.is_empty() {
            debug!(scenario = %scenario.name, "Ignoring empty scenario");
            return false;
        }

        self.stop_autoplay();

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(step) = lock(&self.shared.in_flight).take() {
            debug!("Aborting step of the previous scenario");
            step.abort();
        }
        self.wait_for_release().await;

        {
            let mut state = self.shared.ctx.state().write().await;
            (self.shared.on_scenario_start)(&mut state, &scenario.name);
        }

        info!(
            scenario = %scenario.name,
            steps = scenario.len(),
            "Scenario loaded"
        );

        *lock(&self.shared.loaded) = Some(Loaded {
            scenario: Arc::new(scenario),
            index: 0,
            generation,
        });

        true
    }

    /// Lets the task that drove an aborted step observe the cancellation and
    /// drop its [`RunningGuard`].
    async fn wait_for_release(&self) {
        for _ in 0..RELEASE_YIELDS {
            if !self.shared.running.load(Ordering::SeqCst) {
                return;
            }
            tokio::task::yield_now().await;
        }
        if self.shared.running.load(Ordering::SeqCst) {
            warn!("Previous step still holds the engine after reload");
        }
    }

    /// Runs the step under the cursor, then moves the cursor forward.
    ///
    /// A call made while another step executes returns [`StepOutcome::Busy`]
    /// without side effects. A failing step leaves the cursor where it was
    /// and stops autoplay.
    pub async fn go_to_next_step(&self) -> FlowscopeResult<StepOutcome> {
        let result = self.advance(None).await.map(|(outcome, _)| outcome);
        if result.is_err() {
            self.stop_autoplay();
        }
        result
    }

    async fn advance(&self, expected_generation: Option<u64>) -> FlowscopeResult<(StepOutcome, u64)> {
        let Some(_running) = RunningGuard::acquire(&self.shared.running) else {
            return Ok((StepOutcome::Busy, 0));
        };

        let (scenario, index, generation) = {
            let loaded = lock(&self.shared.loaded);
            let Some(loaded) = loaded.as_ref() else {
                return Ok((StepOutcome::NotLoaded, 0));
            };
            if expected_generation.is_some_and(|g| g != loaded.generation) {
                return Ok((StepOutcome::Superseded, 0));
            }
            if loaded.index >= loaded.scenario.len() {
                return Ok((StepOutcome::Complete, 0));
            }
            (Arc::clone(&loaded.scenario), loaded.index, loaded.generation)
        };

        let Some(step) = scenario.step(index) else {
            return Ok((StepOutcome::Complete, 0));
        };

        debug!(
            scenario = %scenario.name,
            step = index + 1,
            total = scenario.len(),
            "Executing step"
        );

        let handle = tokio::spawn(step.run(self.shared.ctx.clone()));
        {
            let mut in_flight = lock(&self.shared.in_flight);
            // A reload that raced past the cursor read must still stop this step.
            if self.shared.generation.load(Ordering::SeqCst) != generation {
                handle.abort();
            } else {
                *in_flight = Some(handle.abort_handle());
            }
        }

        let result = handle.await;

        {
            let mut in_flight = lock(&self.shared.in_flight);
            if self.shared.generation.load(Ordering::SeqCst) == generation {
                in_flight.take();
            }
        }

        match result {
            Ok(Ok(())) => {
                let mut loaded = lock(&self.shared.loaded);
                match loaded.as_mut() {
                    Some(l) if l.generation == generation && l.index == index => {
                        l.index += 1;
                        Ok((StepOutcome::Advanced, step.duration_ms()))
                    }
                    _ => Ok((StepOutcome::Superseded, 0)),
                }
            }
            Ok(Err(e)) => {
                warn!(
                    scenario = %scenario.name,
                    step = index + 1,
                    error = %e,
                    "Step action failed"
                );
                Err(FlowscopeError::StepFailed {
                    scenario: scenario.name.clone(),
                    step: index + 1,
                    message: e.to_string(),
                })
            }
            Err(join_error) if join_error.is_cancelled() => Ok((StepOutcome::Superseded, 0)),
            Err(_) => {
                error!(scenario = %scenario.name, step = index + 1, "Step action panicked");
                Err(FlowscopeError::StepPanicked {
                    scenario: scenario.name.clone(),
                    step: index + 1,
                })
            }
        }
    }

    /// Moves the cursor back one step without undoing anything the step did.
    ///
    /// Refused while a step is executing.
    pub fn go_to_previous_step(&self) -> bool {
        let mut loaded = lock(&self.shared.loaded);
        if self.shared.running.load(Ordering::SeqCst) {
            return false;
        }
        match loaded.as_mut() {
            Some(l) if l.index > 0 => {
                l.index -= 1;
                true
            }
            _ => false,
        }
    }

    /// Starts or stops autoplay and returns whether it is now on.
    ///
    /// Turning it on does nothing when no scenario is loaded or the scenario
    /// is already complete. Turning it off lets an executing step finish.
    pub fn toggle_auto_play(&self) -> bool {
        if self.shared.autoplaying.load(Ordering::SeqCst) {
            self.stop_autoplay();
            return false;
        }

        let generation = {
            let loaded = lock(&self.shared.loaded);
            match loaded.as_ref() {
                Some(l) if l.index < l.scenario.len() => l.generation,
                _ => return false,
            }
        };

        let mut slot = lock(&self.shared.autoplay);
        let epoch = self.shared.autoplay_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.autoplaying.store(true, Ordering::SeqCst);

        let (stop_tx, stop_rx) = oneshot::channel();
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            engine.autoplay_loop(generation, epoch, stop_rx).await;
        });

        if let Some(previous) = slot.replace(AutoplayTask {
            stop: stop_tx,
            handle,
        }) {
            let _ = previous.stop.send(());
        }

        debug!(epoch, "Autoplay started");
        true
    }

    async fn autoplay_loop(self, generation: u64, epoch: u64, mut stop: oneshot::Receiver<()>) {
        loop {
            if self.shared.autoplay_epoch.load(Ordering::SeqCst) != epoch {
                return;
            }

            let wait = match self.advance(Some(generation)).await {
                Ok((StepOutcome::Advanced, duration_ms)) => {
                    if self.is_complete() {
                        break;
                    }
                    self.shared.ctx.pacer().scaled(duration_ms)
                }
                Ok((StepOutcome::Busy, _)) => BUSY_POLL,
                Ok(_) => break,
                Err(e) => {
                    e.log();
                    break;
                }
            };

            tokio::select! {
                _ = &mut stop => return,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        let mut slot = lock(&self.shared.autoplay);
        if self.shared.autoplay_epoch.load(Ordering::SeqCst) == epoch {
            self.shared.autoplaying.store(false, Ordering::SeqCst);
            slot.take();
            debug!(epoch, "Autoplay finished");
        }
    }

    fn stop_autoplay(&self) {
        let task = {
            let mut slot = lock(&self.shared.autoplay);
            self.shared.autoplay_epoch.fetch_add(1, Ordering::SeqCst);
            self.shared.autoplaying.store(false, Ordering::SeqCst);
            slot.take()
        };
        if let Some(task) = task {
            let _ = task.stop.send(());
        }
    }

    /// Cancels autoplay and any executing step. Used when the pattern view is
    /// discarded.
    pub fn shutdown(&self) {
        let task = {
            let mut slot = lock(&self.shared.autoplay);
            self.shared.autoplay_epoch.fetch_add(1, Ordering::SeqCst);
            self.shared.autoplaying.store(false, Ordering::SeqCst);
            slot.take()
        };
        if let Some(task) = task {
            task.handle.abort();
        }

        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(step) = lock(&self.shared.in_flight).take() {
            step.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    pub fn is_autoplaying(&self) -> bool {
        self.shared.autoplaying.load(Ordering::SeqCst)
    }

    pub fn is_complete(&self) -> bool {
        lock(&self.shared.loaded)
            .as_ref()
            .is_some_and(|l| l.index >= l.scenario.len())
    }

    pub fn current_index(&self) -> Option<usize> {
        lock(&self.shared.loaded).as_ref().map(|l| l.index)
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.snapshot().phase
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        let is_running = self.is_running();
        let is_autoplaying = self.is_autoplaying();
        let speed = self.shared.ctx.pacer().speed().get();
        let loaded = lock(&self.shared.loaded);

        let Some(loaded) = loaded.as_ref() else {
            return PlaybackSnapshot {
                scenario: None,
                current_step: 0,
                total_steps: 0,
                explanation: String::new(),
                is_running,
                is_autoplaying,
                phase: PlaybackPhase::Idle,
                speed,
            };
        };

        let total_steps = loaded.scenario.len();
        let complete = loaded.index >= total_steps;
        let phase = if is_running {
            PlaybackPhase::Executing
        } else if complete {
            PlaybackPhase::Complete
        } else {
            PlaybackPhase::Ready
        };

        PlaybackSnapshot {
            scenario: Some(loaded.scenario.name.clone()),
            current_step: (loaded.index + 1).min(total_steps),
            total_steps,
            explanation: loaded
                .scenario
                .step(loaded.index)
                .map(|s| s.explanation().to_string())
                .unwrap_or_default(),
            is_running,
            is_autoplaying,
            phase,
            speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Topology;
    use crate::playback::Step;
    use crate::timing::Pacer;
    use tokio::sync::RwLock;

    #[derive(Default)]
    struct Tape {
        marks: Vec<String>,
        starts: Vec<String>,
    }

    type Ctx = StepContext<Tape>;

    fn engine(pacer: Pacer) -> PlaybackEngine<Tape> {
        let ctx = StepContext::new(
            Arc::new(RwLock::new(Tape::default())),
            pacer,
            Arc::new(Topology::new()),
        );
        PlaybackEngine::new(ctx, |tape: &mut Tape, name: &str| {
            tape.marks.clear();
            tape.starts.push(name.to_string());
        })
    }

    fn marking(name: &str, count: usize) -> Scenario<Tape> {
        let steps = (0..count)
            .map(|i| {
                Step::new(format!("step {}", i + 1), 100, move |ctx: Ctx| async move {
                    ctx.update(|t| t.marks.push(format!("m{}", i + 1))).await;
                    Ok(())
                })
            })
            .collect();
        Scenario::new(name, steps)
    }

    #[tokio::test]
    async fn test_idle_snapshot() {
        let engine = engine(Pacer::instant());
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.phase, PlaybackPhase::Idle);
        assert_eq!(snapshot.current_step, 0);
        assert_eq!(snapshot.total_steps, 0);
        assert_eq!(
            engine.go_to_next_step().await.unwrap(),
            StepOutcome::NotLoaded
        );
        assert!(!engine.toggle_auto_play());
    }

    #[tokio::test]
    async fn test_load_resets_cursor_and_calls_hook() {
        let engine = engine(Pacer::instant());
        assert!(engine.load_scenario(marking("First", 3)).await);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.scenario.as_deref(), Some("First"));
        assert_eq!(snapshot.current_step, 1);
        assert_eq!(snapshot.total_steps, 3);
        assert_eq!(snapshot.explanation, "step 1");
        assert_eq!(snapshot.phase, PlaybackPhase::Ready);

        let starts = engine.context().read(|t| t.starts.clone()).await;
        assert_eq!(starts, vec!["First"]);
    }

    #[tokio::test]
    async fn test_empty_scenario_is_ignored() {
        let engine = engine(Pacer::instant());
        engine.load_scenario(marking("Real", 2)).await;
        engine.go_to_next_step().await.unwrap();

        assert!(!engine.load_scenario(Scenario::new("Empty", vec![])).await);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.scenario.as_deref(), Some("Real"));
        assert_eq!(snapshot.current_step, 2);
        let starts = engine.context().read(|t| t.starts.len()).await;
        assert_eq!(starts, 1);
    }

    #[tokio::test]
    async fn test_steps_run_in_order_until_complete() {
        let engine = engine(Pacer::instant());
        engine.load_scenario(marking("Order", 3)).await;

        for _ in 0..3 {
            assert_eq!(engine.go_to_next_step().await.unwrap(), StepOutcome::Advanced);
        }
        assert_eq!(engine.go_to_next_step().await.unwrap(), StepOutcome::Complete);

        let marks = engine.context().read(|t| t.marks.clone()).await;
        assert_eq!(marks, vec!["m1", "m2", "m3"]);

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.phase, PlaybackPhase::Complete);
        assert_eq!(snapshot.current_step, 3);
        assert!(snapshot.explanation.is_empty());
    }

    #[tokio::test]
    async fn test_previous_step_is_pointer_only() {
        let engine = engine(Pacer::instant());
        engine.load_scenario(marking("Rewind", 2)).await;
        assert!(!engine.go_to_previous_step());

        engine.go_to_next_step().await.unwrap();
        engine.go_to_next_step().await.unwrap();
        assert!(engine.go_to_previous_step());

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.phase, PlaybackPhase::Ready);
        assert_eq!(snapshot.current_step, 2);

        let marks = engine.context().read(|t| t.marks.len()).await;
        assert_eq!(marks, 2);
    }

    #[tokio::test]
    async fn test_failing_step_keeps_cursor() {
        let engine = engine(Pacer::instant());
        let scenario = Scenario::new(
            "Broken",
            vec![
                Step::narration("fine", 10),
                Step::new("boom", 10, |_ctx: Ctx| async {
                    Err(FlowscopeError::action("broker exploded"))
                }),
            ],
        );
        engine.load_scenario(scenario).await;
        engine.go_to_next_step().await.unwrap();

        let err = engine.go_to_next_step().await.unwrap_err();
        assert_eq!(err.error_code(), "E1002");
        assert!(err.to_string().contains("broker exploded"));

        let snapshot = engine.snapshot();
        assert!(!snapshot.is_running);
        assert_eq!(snapshot.current_step, 2);
        assert_eq!(snapshot.phase, PlaybackPhase::Ready);
    }

    #[tokio::test]
    async fn test_panicking_step_is_reported() {
        let engine = engine(Pacer::instant());
        let scenario = Scenario::new(
            "Panics",
            vec![Step::new("panic", 10, |_ctx: Ctx| async {
                panic!("step blew up");
            })],
        );
        engine.load_scenario(scenario).await;

        let err = engine.go_to_next_step().await.unwrap_err();
        assert_eq!(err.error_code(), "E1003");
        assert!(!engine.is_running());
        assert_eq!(engine.current_index(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_autoplay_runs_to_completion() {
        let engine = engine(Pacer::default());
        engine.load_scenario(marking("Auto", 3)).await;

        assert!(engine.toggle_auto_play());
        assert!(engine.is_autoplaying());

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(engine.is_complete());
        assert!(!engine.is_autoplaying());
        let marks = engine.context().read(|t| t.marks.len()).await;
        assert_eq!(marks, 3);

        assert!(!engine.toggle_auto_play());
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_off_stops_progress() {
        let engine = engine(Pacer::default());
        let scenario = Scenario::new(
            "Slow",
            (0..4).map(|i| Step::narration(format!("s{}", i), 1_000)).collect(),
        );
        engine.load_scenario(scenario).await;

        engine.toggle_auto_play();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(engine.current_index(), Some(1));

        assert!(!engine.toggle_auto_play());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(engine.current_index(), Some(1));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_autoplay() {
        let engine = engine(Pacer::default());
        engine.load_scenario(marking("Stop", 5)).await;
        engine.toggle_auto_play();
        engine.shutdown();

        assert!(!engine.is_autoplaying());
        tokio::task::yield_now().await;
        assert!(!engine.is_running());
    }
}
