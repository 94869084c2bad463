use flowscope_core::{FlowKind, LogKind, RowTone, ServiceStatus};
use ratatui::style::{Modifier, Style};

use super::Theme;

pub struct ThemedStyles<'a> {
    theme: &'a dyn Theme,
}

impl<'a> ThemedStyles<'a> {
    pub fn new(theme: &'a dyn Theme) -> Self {
        Self { theme }
    }

    pub fn base(&self) -> Style {
        Style::default()
            .bg(self.theme.background())
            .fg(self.theme.foreground())
    }

    pub fn surface(&self) -> Style {
        Style::default()
            .bg(self.theme.surface())
            .fg(self.theme.foreground())
    }

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.theme.accent())
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.theme.border())
    }

    pub fn border_focused(&self) -> Style {
        Style::default().fg(self.theme.accent())
    }

    pub fn selection(&self) -> Style {
        Style::default()
            .bg(self.theme.selection())
            .fg(self.theme.foreground())
            .add_modifier(Modifier::BOLD)
    }

    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.theme.foreground_dim())
    }

    pub fn accent(&self) -> Style {
        Style::default().fg(self.theme.accent())
    }

    pub fn keybind(&self) -> Style {
        Style::default()
            .fg(self.theme.accent())
            .add_modifier(Modifier::BOLD)
    }

    pub fn table_header(&self) -> Style {
        Style::default()
            .fg(self.theme.accent_secondary())
            .add_modifier(Modifier::BOLD)
    }

    pub fn badge(&self) -> Style {
        Style::default()
            .bg(self.theme.accent())
            .fg(self.theme.background())
            .add_modifier(Modifier::BOLD)
    }

    pub fn log(&self, kind: LogKind) -> Style {
        let style = Style::default().fg(self.theme.log_color(kind));
        match kind {
            LogKind::Error => style.add_modifier(Modifier::BOLD),
            _ => style,
        }
    }

    pub fn status(&self, status: ServiceStatus) -> Style {
        Style::default().fg(self.theme.status_color(status))
    }

    pub fn tone(&self, tone: RowTone) -> Style {
        Style::default().fg(self.theme.tone_color(tone))
    }

    pub fn flow(&self, kind: FlowKind) -> Style {
        Style::default()
            .fg(self.theme.flow_color(kind))
            .add_modifier(Modifier::BOLD)
    }
}
