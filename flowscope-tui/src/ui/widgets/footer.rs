use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, View};
use crate::events::Action;

pub struct Footer;

impl Footer {
    /// Hints for the current view, labelled with whatever keys are bound.
    pub fn hints(app: &App) -> Vec<(String, &'static str)> {
        let actions: &[(Action, &'static str)] = match app.current_view {
            View::Catalog => &[
                (Action::Select, "Open"),
                (Action::Down, "Move"),
                (Action::OpenCommandPalette, "Switch"),
                (Action::ToggleTheme, "Theme"),
                (Action::Help, "Help"),
                (Action::Quit, "Quit"),
            ],
            View::Pattern => &[
                (Action::NextStep, "Next"),
                (Action::PrevStep, "Prev"),
                (Action::ToggleAutoplay, "Auto"),
                (Action::SpeedUp, "Faster"),
                (Action::SpeedDown, "Slower"),
                (Action::OpenCommandPalette, "Switch"),
                (Action::Back, "Back"),
                (Action::Help, "Help"),
            ],
        };

        let mut hints: Vec<(String, &'static str)> = actions
            .iter()
            .filter_map(|(action, label)| app.keybinds.hint(action).map(|key| (key, *label)))
            .collect();
        if app.current_view == View::Pattern {
            hints.insert(0, ("1-9".to_string(), "Scenario"));
        }
        hints
    }

    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let theme = app.current_theme();

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(72), Constraint::Percentage(28)])
            .split(area);

        let spans: Vec<Span> = Self::hints(app)
            .into_iter()
            .flat_map(|(key, desc)| {
                [
                    Span::styled(
                        format!(" {key}"),
                        Style::default()
                            .fg(theme.accent())
                            .add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!(":{desc} "),
                        Style::default().fg(theme.foreground_dim()),
                    ),
                ]
            })
            .collect();
        frame.render_widget(
            Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.surface())),
            chunks[0],
        );

        let status = app.status_message.as_deref().unwrap_or("Ready");
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!("{status} "),
                Style::default().fg(theme.foreground_dim()),
            ))
            .alignment(Alignment::Right)
            .style(Style::default().bg(theme.surface())),
            chunks[1],
        );
    }
}
