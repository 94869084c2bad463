use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, View};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct Header;

impl Header {
    /// View, pattern and scenario, joined for the breadcrumb.
    pub fn breadcrumb(app: &App) -> Vec<String> {
        let mut parts = vec![app.current_view.name().to_string()];
        if app.current_view == View::Pattern {
            if let Some(session) = app.session() {
                parts.push(session.info().name.to_string());
            }
            if let Some(scenario) = app
                .snapshot
                .as_ref()
                .and_then(|s| s.playback.scenario.clone())
            {
                parts.push(scenario);
            }
        }
        parts
    }

    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let theme = app.current_theme();

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(22),
                Constraint::Min(20),
                Constraint::Length(34),
            ])
            .split(area);

        let logo = Paragraph::new(Line::from(vec![
            Span::styled("◈ ", Style::default().fg(theme.accent())),
            Span::styled(
                "Flowscope ",
                Style::default()
                    .fg(theme.foreground())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("v{}", VERSION),
                Style::default().fg(theme.foreground_dim()),
            ),
        ]))
        .block(Block::default().borders(Borders::NONE))
        .style(Style::default().bg(theme.background()));
        frame.render_widget(logo, chunks[0]);

        let crumbs = Self::breadcrumb(app);
        let last = crumbs.len() - 1;
        let mut spans = Vec::new();
        for (i, crumb) in crumbs.into_iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled(" › ", Style::default().fg(theme.border())));
            }
            let style = if i == last {
                Style::default()
                    .fg(theme.accent())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.foreground_dim())
            };
            spans.push(Span::styled(crumb, style));
        }
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.background())),
            chunks[1],
        );

        let status = Paragraph::new(Line::from(vec![
            Span::styled(
                format!(" {} ", app.speed.label()),
                Style::default()
                    .fg(theme.background())
                    .bg(theme.accent_secondary())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {} ", theme.name()),
                Style::default().fg(theme.foreground_dim()),
            ),
            Span::styled(
                chrono::Local::now().format("%H:%M:%S").to_string(),
                Style::default().fg(theme.foreground_dim()),
            ),
        ]))
        .alignment(Alignment::Right)
        .style(Style::default().bg(theme.background()));
        frame.render_widget(status, chunks[2]);
    }
}
