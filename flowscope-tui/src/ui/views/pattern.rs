use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::Span,
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::theme::ThemedStyles;
use crate::ui::utils::hop_duration_ms;
use crate::ui::widgets::{
    ControlsPanel, Diagram, LedgerView, LogViewer, StepProgress, TimelineView,
};

pub struct PatternView;

impl PatternView {
    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let theme = app.current_theme();
        let styles = ThemedStyles::new(theme);

        let (Some(session), Some(snapshot)) = (app.session(), app.snapshot.as_ref()) else {
            frame.render_widget(
                Paragraph::new(Span::styled("Loading pattern…", styles.dimmed()))
                    .block(Block::default().borders(Borders::ALL).border_style(styles.border())),
                area,
            );
            return;
        };

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(14), Constraint::Length(12)])
            .split(area);

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(rows[0]);

        let side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(8), Constraint::Min(6)])
            .split(top[1]);

        let info = session.info();
        Diagram {
            topology: session.topology(),
            statuses: &snapshot.statuses,
            flows: &snapshot.flows,
            hop_ms: hop_duration_ms(app.config.tui.hop_animation_ms, app.speed.get()),
            title: format!(" {} {} ", info.icon, info.name),
        }
        .render(frame, top[0], theme);

        StepProgress::render(frame, side[0], &snapshot.playback, theme, app.animation_tick);

        ControlsPanel {
            scenarios: session.scenarios(),
            current_scenario: snapshot.playback.scenario.as_deref(),
            controls: session.controls(),
            indicators: &snapshot.indicators,
            statuses: &snapshot.statuses,
            keybinds: &app.keybinds,
            kafka_lag_ms: app.kafka_lag_ms,
        }
        .render(frame, side[1], theme);

        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(40),
                Constraint::Percentage(35),
                Constraint::Percentage(25),
            ])
            .split(rows[1]);

        LogViewer::render(frame, bottom[0], &snapshot.logs, theme);
        LedgerView::render(frame, bottom[1], snapshot.ledger.as_ref(), theme);
        TimelineView::render(frame, bottom[2], &snapshot.timeline, theme);
    }
}
