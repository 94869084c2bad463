use flowscope_core::LogEntry;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::theme::{Theme, ThemedStyles};

pub struct LogViewer;

impl LogViewer {
    /// Newest entries at the bottom; older ones scroll off the top.
    pub fn render(frame: &mut Frame, area: Rect, logs: &[LogEntry], theme: &dyn Theme) {
        let styles = ThemedStyles::new(theme);
        let block = Block::default()
            .title(format!(" Logs ({}) ", logs.len()))
            .borders(Borders::ALL)
            .border_style(styles.border());

        let visible = area.height.saturating_sub(2) as usize;
        let start = logs.len().saturating_sub(visible);

        let items: Vec<ListItem> = logs[start..]
            .iter()
            .map(|entry| {
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{} ", entry.timestamp), styles.dimmed()),
                    Span::styled(format!("{} ", entry.kind.icon()), styles.log(entry.kind)),
                    Span::styled(entry.message.clone(), styles.log(entry.kind)),
                ]))
            })
            .collect();

        if items.is_empty() {
            frame.render_widget(
                List::new(vec![ListItem::new(Span::styled(
                    "No activity yet",
                    Style::default().fg(theme.foreground_dim()),
                ))])
                .block(block),
                area,
            );
            return;
        }

        frame.render_widget(List::new(items).block(block), area);
    }
}
