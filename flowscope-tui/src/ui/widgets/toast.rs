use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::theme::Theme;
use crate::ui::utils::truncate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            ToastLevel::Info => "ℹ",
            ToastLevel::Success => "✓",
            ToastLevel::Warning => "⚠",
            ToastLevel::Error => "✗",
        }
    }

    fn duration(&self) -> Duration {
        match self {
            ToastLevel::Error => Duration::from_secs(6),
            ToastLevel::Warning => Duration::from_secs(4),
            _ => Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub created_at: Instant,
    pub duration: Duration,
}

impl Toast {
    pub fn new(message: impl Into<String>, level: ToastLevel) -> Self {
        Self {
            message: message.into(),
            level,
            created_at: Instant::now(),
            duration: level.duration(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }
}

#[derive(Debug)]
pub struct ToastManager {
    toasts: Vec<Toast>,
    max_visible: usize,
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastManager {
    pub fn new() -> Self {
        Self {
            toasts: Vec::new(),
            max_visible: 4,
        }
    }

    pub fn push(&mut self, toast: Toast) {
        tracing::debug!(level = ?toast.level, "{}", toast.message);
        self.toasts.push(toast);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Toast::new(message, ToastLevel::Info));
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Toast::new(message, ToastLevel::Success));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Toast::new(message, ToastLevel::Warning));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Toast::new(message, ToastLevel::Error));
    }

    pub fn cleanup(&mut self) {
        self.toasts.retain(|t| !t.is_expired());
    }

    pub fn visible_toasts(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter().rev().take(self.max_visible)
    }

    pub fn count(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }

    /// Stacks the newest toasts in the top-right corner, below the header.
    pub fn render(&self, frame: &mut Frame, screen: Rect, theme: &dyn Theme) {
        let width = 48u16.min(screen.width.saturating_sub(4));
        let height = 3u16;
        let x = screen.width.saturating_sub(width + 2);
        let mut y = 4u16;

        for toast in self.visible_toasts() {
            if y + height > screen.height {
                break;
            }
            let area = Rect::new(x, y, width, height);
            let color = match toast.level {
                ToastLevel::Info => theme.info(),
                ToastLevel::Success => theme.success(),
                ToastLevel::Warning => theme.warning(),
                ToastLevel::Error => theme.error(),
            };

            let text_width = width.saturating_sub(6) as usize;
            let line = Line::from(vec![
                Span::styled(format!("{} ", toast.level.icon()), Style::default().fg(color)),
                Span::styled(
                    truncate(&toast.message, text_width),
                    Style::default().fg(theme.foreground()),
                ),
            ]);

            frame.render_widget(Clear, area);
            frame.render_widget(
                Paragraph::new(line).block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(color))
                        .style(Style::default().bg(theme.surface())),
                ),
                area,
            );
            y += height;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_visible_order() {
        let mut manager = ToastManager::new();
        for i in 0..6 {
            manager.info(format!("toast {}", i));
        }

        let visible: Vec<_> = manager.visible_toasts().map(|t| t.message.clone()).collect();
        assert_eq!(visible.len(), 4);
        assert_eq!(visible[0], "toast 5");
        assert_eq!(manager.count(), 6);
    }

    #[test]
    fn test_cleanup_removes_expired() {
        let mut manager = ToastManager::new();
        manager.push(Toast::new("gone", ToastLevel::Info).with_duration(Duration::ZERO));
        manager.error("stays");

        manager.cleanup();
        assert_eq!(manager.count(), 1);
        assert_eq!(manager.visible_toasts().next().unwrap().level, ToastLevel::Error);
    }
}
