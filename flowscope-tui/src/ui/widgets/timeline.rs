use flowscope_core::{Activity, ActivityKind};
use ratatui::{
    layout::Rect,
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

use crate::theme::{Theme, ThemedStyles};

pub struct TimelineView;

impl TimelineView {
    pub fn describe(activity: &Activity) -> String {
        match &activity.kind {
            ActivityKind::ScenarioStarted { name } => format!("▶ {}", name),
            ActivityKind::Log { message, kind } => format!("{} {}", kind.icon(), message),
            ActivityKind::StatusChange { service, from, to } => {
                format!("⇅ {}: {} → {}", service, from, to)
            }
        }
    }

    pub fn render(frame: &mut Frame, area: Rect, timeline: &[Activity], theme: &dyn Theme) {
        let styles = ThemedStyles::new(theme);
        let block = Block::default()
            .title(format!(" Timeline ({}) ", timeline.len()))
            .borders(Borders::ALL)
            .border_style(styles.border());

        let visible = area.height.saturating_sub(2) as usize;
        let start = timeline.len().saturating_sub(visible);

        let items: Vec<ListItem> = timeline[start..]
            .iter()
            .map(|activity| {
                let style = match &activity.kind {
                    ActivityKind::ScenarioStarted { .. } => {
                        styles.accent().add_modifier(Modifier::BOLD)
                    }
                    ActivityKind::Log { kind, .. } => styles.log(*kind),
                    ActivityKind::StatusChange { to, .. } => styles.status(*to),
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:>3} ", activity.seq), styles.dimmed()),
                    Span::styled(Self::describe(activity), style),
                ]))
            })
            .collect();

        frame.render_widget(List::new(items).block(block), area);
    }
}
