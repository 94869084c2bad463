use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use flowscope_core::{
    catalog, create_session, find, ControlKind, FlowscopeConfig, FlowscopeResult, Pacer,
    PatternControl, PatternController, PatternId, PatternSnapshot, SpeedControl, StepOutcome,
    MAX_KAFKA_LAG_MS,
};
use futures::StreamExt;
use ratatui::{backend::Backend, Terminal};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::events::{Action, CommandPalette, EventHandler, InputMode, Keybinds};
use crate::theme::{Theme, ThemeLoader, ThemeManager};
use crate::ui::layout::MainLayout;
use crate::ui::widgets::ToastManager;

/// Kafka lag change per `[` / `]` press.
pub const LAG_STEP_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Catalog,
    Pattern,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Catalog => "Catalog",
            View::Pattern => "Pattern",
        }
    }
}

/// Result of a step run off the UI task.
#[derive(Debug)]
pub struct StepReport {
    pub pattern: PatternId,
    pub result: FlowscopeResult<StepOutcome>,
}

pub struct App {
    pub should_quit: bool,
    pub current_view: View,
    pub config: FlowscopeConfig,
    pub theme_manager: ThemeManager,
    pub theme_loader: ThemeLoader,
    pub event_handler: EventHandler,
    pub keybinds: Keybinds,
    pub command_palette: CommandPalette,
    pub toast_manager: ToastManager,
    pub catalog_selected: usize,
    pub session: Option<Arc<dyn PatternController>>,
    pub snapshot: Option<PatternSnapshot>,
    pub speed: SpeedControl,
    pub kafka_lag_ms: u64,
    pub status_message: Option<String>,
    pub show_help_modal: bool,
    pub help_modal_scroll: usize,
    pub animation_tick: u64,
    step_tx: mpsc::UnboundedSender<StepReport>,
    step_rx: mpsc::UnboundedReceiver<StepReport>,
}

impl App {
    pub fn new(config: FlowscopeConfig) -> Result<Self> {
        Self::with_parts(config, ThemeLoader::new(), Keybinds::load_or_default())
    }

    pub fn with_parts(
        config: FlowscopeConfig,
        theme_loader: ThemeLoader,
        keybinds: Keybinds,
    ) -> Result<Self> {
        let theme_manager = theme_loader.initialize_theme_manager(&config.tui.theme);
        let speed = SpeedControl::new(config.playback.speed)?;
        let (step_tx, step_rx) = mpsc::unbounded_channel();

        Ok(Self {
            should_quit: false,
            current_view: View::Catalog,
            theme_manager,
            theme_loader,
            event_handler: EventHandler::new(),
            keybinds,
            command_palette: CommandPalette::new(),
            toast_manager: ToastManager::new(),
            catalog_selected: 0,
            session: None,
            snapshot: None,
            speed,
            kafka_lag_ms: config.patterns.kafka_lag_ms,
            status_message: Some("Pick a pattern with Enter. '?' for help, ':' to search.".into()),
            show_help_modal: false,
            help_modal_scroll: 0,
            animation_tick: 0,
            step_tx,
            step_rx,
            config,
        })
    }

    pub fn current_theme(&self) -> &dyn Theme {
        self.theme_manager.current_theme()
    }

    pub fn session(&self) -> Option<&Arc<dyn PatternController>> {
        self.session.as_ref()
    }

    /// Opens `tui.start_pattern` if one is configured.
    pub async fn start(&mut self) {
        let Some(slug) = self.config.tui.start_pattern.clone() else {
            return;
        };
        match find(&slug) {
            Ok(info) => self.open_pattern(info.id).await,
            Err(e) => {
                e.log();
                self.toast_manager.warning(e.to_string());
            }
        }
    }

    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        let mut events = EventStream::new();
        let mut ticker = tokio::time::interval(Duration::from_millis(self.config.tui.tick_rate_ms));

        self.start().await;

        loop {
            terminal.draw(|frame| MainLayout::render(frame, self))?;

            tokio::select! {
                _ = ticker.tick() => self.on_tick().await,
                Some(report) = self.step_rx.recv() => self.on_step_report(report),
                event = events.next() => match event {
                    Some(Ok(event)) => self.handle_event(event).await,
                    Some(Err(e)) => return Err(e.into()),
                    None => self.should_quit = true,
                },
            }

            if self.should_quit {
                break;
            }
        }

        self.close_session();
        Ok(())
    }

    async fn on_tick(&mut self) {
        self.animation_tick = self.animation_tick.wrapping_add(1);
        self.toast_manager.cleanup();
        self.refresh_snapshot().await;
    }

    pub async fn refresh_snapshot(&mut self) {
        self.snapshot = match &self.session {
            Some(session) => Some(session.snapshot().await),
            None => None,
        };
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                self.handle_key_event(key.code, key.modifiers).await;
            }
            Event::Resize(width, height) => {
                debug!(width, height, "Terminal resized");
            }
            _ => {}
        }
    }

    pub async fn handle_key_event(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if self.command_palette.is_open() {
            self.handle_command_palette_key(key, modifiers).await;
            return;
        }

        if self.show_help_modal {
            self.handle_help_modal_key(key);
            return;
        }

        if let Some(action) = self.keybinds.get(key, modifiers).cloned() {
            self.execute_action(action).await;
        }
    }

    fn handle_help_modal_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') => {
                self.show_help_modal = false;
                self.help_modal_scroll = 0;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.help_modal_scroll = self.help_modal_scroll.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.help_modal_scroll += 1;
            }
            _ => {}
        }
    }

    async fn handle_command_palette_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        match key {
            KeyCode::Esc => {
                self.command_palette.close();
                self.event_handler.set_input_mode(InputMode::Normal);
            }
            KeyCode::Enter => {
                let action = self.command_palette.execute();
                self.event_handler.set_input_mode(InputMode::Normal);
                match action {
                    Some(action) => self.execute_action(action).await,
                    None => self.status_message = Some("No matching command".into()),
                }
            }
            KeyCode::Backspace => self.command_palette.delete_char(),
            KeyCode::Left => self.command_palette.move_cursor_left(),
            KeyCode::Right => self.command_palette.move_cursor_right(),
            KeyCode::Up if modifiers.contains(KeyModifiers::CONTROL) => {
                self.command_palette.history_prev()
            }
            KeyCode::Down if modifiers.contains(KeyModifiers::CONTROL) => {
                self.command_palette.history_next()
            }
            KeyCode::Up | KeyCode::BackTab => self.command_palette.select_prev(),
            KeyCode::Down | KeyCode::Tab => self.command_palette.select_next(),
            KeyCode::Char('u') if modifiers.contains(KeyModifiers::CONTROL) => {
                self.command_palette.clear_input()
            }
            KeyCode::Char(c) => self.command_palette.insert_char(c),
            _ => {}
        }
    }

    pub async fn execute_action(&mut self, action: Action) {
        if action.needs_pattern() && self.session.is_none() {
            self.status_message = Some("Open a pattern first (Enter or ':')".into());
            return;
        }

        match action {
            Action::Quit => self.should_quit = true,
            Action::Back => self.handle_back(),
            Action::Help => {
                self.show_help_modal = true;
                self.help_modal_scroll = 0;
            }
            Action::ToggleTheme => self.cycle_theme(),
            Action::OpenCommandPalette => {
                self.command_palette.open();
                self.event_handler.set_input_mode(InputMode::Command);
            }
            Action::Up => {
                if self.current_view == View::Catalog {
                    self.catalog_selected = self.catalog_selected.saturating_sub(1);
                }
            }
            Action::Down => {
                if self.current_view == View::Catalog {
                    let last = catalog().len().saturating_sub(1);
                    self.catalog_selected = (self.catalog_selected + 1).min(last);
                }
            }
            Action::Select => {
                if self.current_view == View::Catalog {
                    if let Some(info) = catalog().get(self.catalog_selected) {
                        self.open_pattern(info.id).await;
                    }
                }
            }
            Action::NextStep => self.next_step(),
            Action::PrevStep => self.previous_step(),
            Action::ToggleAutoplay => self.toggle_autoplay(),
            Action::SpeedUp => self.change_speed(true),
            Action::SpeedDown => self.change_speed(false),
            Action::TriggerScenario(index) => self.trigger_scenario(index).await,
            Action::ToggleDependency => self.toggle_dependency().await,
            Action::LagUp => self.adjust_lag(LAG_STEP_MS as i64).await,
            Action::LagDown => self.adjust_lag(-(LAG_STEP_MS as i64)).await,
            Action::OpenPattern(id) => self.open_pattern(id).await,
            Action::ShowCatalog => self.close_pattern(),
            Action::None => {}
        }
    }

    fn handle_back(&mut self) {
        match self.current_view {
            View::Pattern => self.close_pattern(),
            View::Catalog => self.status_message = Some("Press q to quit".into()),
        }
    }

    /// Replaces the current session with a fresh one for `id`. The old
    /// session is shut down so its autoplay task cannot touch the new view.
    pub async fn open_pattern(&mut self, id: PatternId) {
        self.close_session();

        let session = create_session(id, Pacer::new(self.speed.clone()));
        let supports_lag = session.controls().iter().any(|c| c.kind == ControlKind::Lag);

        if supports_lag && self.kafka_lag_ms > 0 {
            if let Err(e) = session
                .apply_control(PatternControl::SetLag(self.kafka_lag_ms))
                .await
            {
                e.log();
                self.toast_manager.error(e.to_string());
            }
        }

        let info = session.info();
        info!(pattern = %id, "Opened pattern");

        if let Some(index) = catalog().iter().position(|p| p.id == id) {
            self.catalog_selected = index;
        }
        self.status_message = Some(format!(
            "{} {}: press 1-{} to pick a scenario",
            info.icon,
            info.name,
            session.scenarios().len()
        ));
        self.session = Some(session);
        self.current_view = View::Pattern;
        self.refresh_snapshot().await;
    }

    pub fn close_pattern(&mut self) {
        self.close_session();
        self.current_view = View::Catalog;
        self.status_message = None;
    }

    fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown();
        }
        self.snapshot = None;
    }

    pub async fn trigger_scenario(&mut self, index: usize) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let Some(scenario) = session.scenarios().get(index) else {
            self.status_message = Some(format!("No scenario {}", index + 1));
            return;
        };

        match session.load_scenario(scenario.id).await {
            Ok(true) => {
                self.toast_manager.info(format!("▶ {}", scenario.name));
                self.status_message = Some(scenario.description.to_string());
                if self.config.playback.autoplay_on_load {
                    session.toggle_autoplay();
                }
            }
            Ok(false) => self
                .toast_manager
                .warning(format!("{} has no steps", scenario.name)),
            Err(e) => {
                e.log();
                self.toast_manager.error(e.to_string());
            }
        }
        self.refresh_snapshot().await;
    }

    /// Runs the next step on its own task; the outcome arrives as a
    /// [`StepReport`].
    pub fn next_step(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        if session.playback().is_running {
            self.status_message = Some("Step still running".into());
            return;
        }

        let pattern = session.info().id;
        let tx = self.step_tx.clone();
        tokio::spawn(async move {
            let result = session.next_step().await;
            let _ = tx.send(StepReport { pattern, result });
        });
    }

    pub fn on_step_report(&mut self, report: StepReport) {
        let current = self.session.as_ref().map(|s| s.info().id);
        if current != Some(report.pattern) {
            debug!(pattern = %report.pattern, "Dropping step report from a closed pattern");
            return;
        }

        match report.result {
            Ok(StepOutcome::Complete) => self.toast_manager.success("Scenario complete"),
            Ok(StepOutcome::NotLoaded) => {
                self.status_message = Some("Pick a scenario first (1-9)".into())
            }
            Ok(StepOutcome::Advanced | StepOutcome::Busy | StepOutcome::Superseded) => {}
            Err(e) => {
                e.log();
                self.toast_manager.error(e.to_string());
            }
        }
    }

    fn previous_step(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if !session.previous_step() {
            self.status_message = Some("Already at the first step".into());
        }
    }

    fn toggle_autoplay(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if session.playback().scenario.is_none() {
            self.status_message = Some("Pick a scenario first (1-9)".into());
            return;
        }
        let playing = session.toggle_autoplay();
        self.status_message = Some(if playing { "Autoplay on" } else { "Autoplay paused" }.into());
    }

    pub fn change_speed(&mut self, faster: bool) {
        let speed = if faster {
            self.speed.faster()
        } else {
            self.speed.slower()
        };
        debug!(speed, "Playback speed changed");
        self.status_message = Some(format!("Speed {}", self.speed.label()));
    }

    async fn toggle_dependency(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        match session.apply_control(PatternControl::ToggleDependency).await {
            Ok(()) => {
                if let Some(control) = session
                    .controls()
                    .iter()
                    .find(|c| c.kind == ControlKind::ToggleDependency)
                {
                    self.status_message = Some(format!("Toggled {}", control.label));
                }
            }
            Err(e) => {
                warn!("{}", e);
                self.toast_manager.warning(e.to_string());
            }
        }
        self.refresh_snapshot().await;
    }

    pub async fn adjust_lag(&mut self, delta_ms: i64) {
        let Some(session) = self.session.clone() else {
            return;
        };
        if !session.controls().iter().any(|c| c.kind == ControlKind::Lag) {
            self.toast_manager
                .warning(format!("{} has no consumer lag", session.info().name));
            return;
        }

        let lag = (self.kafka_lag_ms as i64 + delta_ms).clamp(0, MAX_KAFKA_LAG_MS as i64) as u64;
        match session.apply_control(PatternControl::SetLag(lag)).await {
            Ok(()) => {
                self.kafka_lag_ms = lag;
                self.status_message = Some(format!("Consumer lag {}ms", lag));
            }
            Err(e) => {
                e.log();
                self.toast_manager.error(e.to_string());
            }
        }
        self.refresh_snapshot().await;
    }

    fn cycle_theme(&mut self) {
        self.theme_manager.cycle_theme();
        let name = self.theme_manager.current_theme_name();
        if let Err(e) = self.theme_loader.save_theme_name(name) {
            warn!("Failed to save theme: {:#}", e);
        }
        self.toast_manager.info(format!("Theme: {}", name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowscope_core::{LogKind, PlaybackPhase, MAX_SPEED};
    use tempfile::TempDir;

    fn test_app(dir: &TempDir) -> App {
        let loader = ThemeLoader::with_path(dir.path().join("theme.toml"));
        App::with_parts(FlowscopeConfig::default(), loader, Keybinds::new()).unwrap()
    }

    async fn press(app: &mut App, c: char) {
        app.handle_key_event(KeyCode::Char(c), KeyModifiers::NONE)
            .await;
    }

    async fn drain_step(app: &mut App) {
        let report = app.step_rx.recv().await.unwrap();
        app.on_step_report(report);
        app.refresh_snapshot().await;
    }

    #[tokio::test]
    async fn test_starts_in_catalog() {
        let dir = TempDir::new().unwrap();
        let app = test_app(&dir);

        assert_eq!(app.current_view, View::Catalog);
        assert!(app.session().is_none());
        assert_eq!(app.current_theme().name(), "Tokyo Night");
    }

    #[tokio::test]
    async fn test_catalog_navigation_and_open() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        app.handle_key_event(KeyCode::Up, KeyModifiers::NONE).await;
        assert_eq!(app.catalog_selected, 0);

        for _ in 0..20 {
            app.handle_key_event(KeyCode::Down, KeyModifiers::NONE).await;
        }
        assert_eq!(app.catalog_selected, catalog().len() - 1);

        app.handle_key_event(KeyCode::Enter, KeyModifiers::NONE).await;
        assert_eq!(app.current_view, View::Pattern);
        assert_eq!(
            app.session().unwrap().info().id,
            catalog()[catalog().len() - 1].id
        );

        app.handle_key_event(KeyCode::Esc, KeyModifiers::NONE).await;
        assert_eq!(app.current_view, View::Catalog);
        assert!(app.session().is_none());
        assert!(app.snapshot.is_none());
    }

    #[tokio::test]
    async fn test_playback_keys_need_pattern() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        press(&mut app, 'n').await;
        assert!(app.status_message.unwrap().contains("Open a pattern"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_scenario_then_step() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.open_pattern(PatternId::RequestResponse).await;

        press(&mut app, '1').await;
        let playback = app.snapshot.as_ref().unwrap().playback.clone();
        assert_eq!(playback.phase, PlaybackPhase::Ready);
        assert_eq!(playback.current_step, 1);

        press(&mut app, 'n').await;
        drain_step(&mut app).await;

        let snapshot = app.snapshot.as_ref().unwrap();
        assert_eq!(snapshot.playback.current_step, 2);
        assert!(snapshot.logs.iter().any(|l| l.kind == LogKind::Request));
    }

    #[tokio::test]
    async fn test_unknown_scenario_index() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.open_pattern(PatternId::Saga).await;

        press(&mut app, '9').await;
        assert_eq!(app.status_message.as_deref(), Some("No scenario 9"));
        assert!(app.snapshot.as_ref().unwrap().playback.scenario.is_none());
    }

    #[tokio::test]
    async fn test_lag_is_clamped() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.open_pattern(PatternId::AsyncMessaging).await;

        for _ in 0..15 {
            press(&mut app, ']').await;
        }
        assert_eq!(app.kafka_lag_ms, MAX_KAFKA_LAG_MS);

        for _ in 0..15 {
            press(&mut app, '[').await;
        }
        assert_eq!(app.kafka_lag_ms, 0);
    }

    #[tokio::test]
    async fn test_lag_survives_pattern_switch() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.open_pattern(PatternId::AsyncMessaging).await;
        press(&mut app, ']').await;
        press(&mut app, ']').await;

        app.open_pattern(PatternId::Saga).await;
        app.open_pattern(PatternId::AsyncMessaging).await;

        let snapshot = app.snapshot.as_ref().unwrap();
        let lag = snapshot
            .indicators
            .iter()
            .find(|i| i.label == "Consumer lag")
            .unwrap();
        assert_eq!(lag.value, "1000ms");
    }

    #[tokio::test]
    async fn test_controls_on_pattern_without_them() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.open_pattern(PatternId::Saga).await;

        press(&mut app, ']').await;
        press(&mut app, 'x').await;

        assert_eq!(app.kafka_lag_ms, 0);
        assert_eq!(app.toast_manager.count(), 2);
    }

    #[tokio::test]
    async fn test_speed_keys_clamp() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        for _ in 0..20 {
            press(&mut app, '+').await;
        }
        assert_eq!(app.speed.get(), MAX_SPEED);
        assert_eq!(app.status_message.as_deref(), Some("Speed 3.00x"));

        app.open_pattern(PatternId::Outbox).await;
        assert_eq!(app.session().unwrap().speed().get(), MAX_SPEED);
    }

    #[tokio::test]
    async fn test_help_modal_captures_keys() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        press(&mut app, '?').await;
        assert!(app.show_help_modal);

        press(&mut app, 'q').await;
        assert!(!app.show_help_modal);
        assert!(!app.should_quit);

        press(&mut app, 'q').await;
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_command_palette_opens_pattern() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        press(&mut app, ':').await;
        assert!(app.command_palette.is_open());

        for c in "pub-sub".chars() {
            press(&mut app, c).await;
        }
        app.handle_key_event(KeyCode::Enter, KeyModifiers::NONE)
            .await;

        assert!(!app.command_palette.is_open());
        assert_eq!(app.session().unwrap().info().id, PatternId::PubSub);
    }

    #[tokio::test]
    async fn test_theme_cycle_persists() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);

        press(&mut app, 't').await;
        let name = app.current_theme().name();
        assert_ne!(name, "Tokyo Night");

        let reloaded = test_app(&dir);
        assert_eq!(reloaded.current_theme().name(), name);
    }

    #[tokio::test]
    async fn test_stale_step_report_ignored() {
        let dir = TempDir::new().unwrap();
        let mut app = test_app(&dir);
        app.open_pattern(PatternId::Saga).await;

        app.on_step_report(StepReport {
            pattern: PatternId::Outbox,
            result: Ok(StepOutcome::Complete),
        });
        assert!(app.toast_manager.is_empty());
    }
}
