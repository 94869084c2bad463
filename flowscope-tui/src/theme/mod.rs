mod loader;
mod palettes;
mod styles;

pub use loader::{ThemeConfig, ThemeLoader};
pub use palettes::{hex_to_color, ColorPalette, PaletteTheme};
pub use styles::ThemedStyles;

use flowscope_core::{FlowKind, LogKind, RowTone, ServiceStatus};
use ratatui::style::Color;

pub trait Theme: Send + Sync {
    fn name(&self) -> &'static str;

    fn palette(&self) -> &ColorPalette;

    fn background(&self) -> Color {
        self.palette().background
    }
    fn foreground(&self) -> Color {
        self.palette().foreground
    }
    fn foreground_dim(&self) -> Color {
        self.palette().foreground_dim
    }

    fn surface(&self) -> Color {
        self.palette().surface
    }
    fn border(&self) -> Color {
        self.palette().border
    }
    fn selection(&self) -> Color {
        self.palette().selection
    }

    fn accent(&self) -> Color {
        self.palette().accent
    }
    fn accent_secondary(&self) -> Color {
        self.palette().accent_secondary
    }

    fn success(&self) -> Color {
        self.palette().success
    }
    fn warning(&self) -> Color {
        self.palette().warning
    }
    fn error(&self) -> Color {
        self.palette().error
    }
    fn info(&self) -> Color {
        self.palette().info
    }

    fn flow_color(&self, kind: FlowKind) -> Color {
        match kind {
            FlowKind::Http => self.info(),
            FlowKind::Event => self.accent_secondary(),
            FlowKind::Cache => self.warning(),
            FlowKind::Db => self.success(),
        }
    }

    fn status_color(&self, status: ServiceStatus) -> Color {
        match status {
            ServiceStatus::Healthy => self.success(),
            ServiceStatus::Degraded => self.warning(),
            ServiceStatus::Down => self.error(),
        }
    }

    fn log_color(&self, kind: LogKind) -> Color {
        match kind {
            LogKind::Info => self.foreground(),
            LogKind::Success => self.success(),
            LogKind::Error => self.error(),
            LogKind::Warning => self.warning(),
            LogKind::Request => self.info(),
        }
    }

    fn tone_color(&self, tone: RowTone) -> Color {
        match tone {
            RowTone::Neutral => self.foreground(),
            RowTone::Good => self.success(),
            RowTone::Warn => self.warning(),
            RowTone::Bad => self.error(),
        }
    }
}

pub struct ThemeManager {
    themes: Vec<Box<dyn Theme>>,
    current_index: usize,
}

impl ThemeManager {
    pub fn new() -> Self {
        let themes: Vec<Box<dyn Theme>> = palettes::ALL
            .into_iter()
            .map(|t| Box::new(t) as Box<dyn Theme>)
            .collect();

        Self {
            themes,
            current_index: 0,
        }
    }

    pub fn current_theme(&self) -> &dyn Theme {
        self.themes[self.current_index].as_ref()
    }

    pub fn cycle_theme(&mut self) {
        self.current_index = (self.current_index + 1) % self.themes.len();
    }

    pub fn set_theme_by_name(&mut self, name: &str) -> bool {
        match self
            .themes
            .iter()
            .position(|t| t.name().eq_ignore_ascii_case(name.trim()))
        {
            Some(index) => {
                self.current_index = index;
                true
            }
            None => false,
        }
    }

    pub fn available_themes(&self) -> Vec<&'static str> {
        self.themes.iter().map(|t| t.name()).collect()
    }

    pub fn current_theme_name(&self) -> &'static str {
        self.current_theme().name()
    }
}

impl Default for ThemeManager {
    fn default() -> Self {
        Self::new()
    }
}
