use flowscope_core::{catalog, PatternInfo};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::theme::ThemedStyles;

pub struct CatalogView;

impl CatalogView {
    pub fn selected(app: &App) -> Option<&'static PatternInfo> {
        catalog().get(app.catalog_selected)
    }

    pub fn render(frame: &mut Frame, area: Rect, app: &App) {
        let theme = app.current_theme();
        let styles = ThemedStyles::new(theme);

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(area);

        let items: Vec<ListItem> = catalog()
            .iter()
            .map(|p| {
                ListItem::new(Line::from(vec![
                    Span::raw(format!(" {} ", p.icon)),
                    Span::styled(p.name, styles.base().add_modifier(Modifier::BOLD)),
                    Span::styled(format!("  {}", p.difficulty), styles.dimmed()),
                ]))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title(format!(" Patterns ({}) ", catalog().len()))
                    .borders(Borders::ALL)
                    .border_style(styles.border_focused()),
            )
            .highlight_style(styles.selection())
            .highlight_symbol("▸");
        let mut state = ListState::default().with_selected(Some(app.catalog_selected));
        frame.render_stateful_widget(list, chunks[0], &mut state);

        let detail_block = Block::default()
            .title(" Details ")
            .borders(Borders::ALL)
            .border_style(styles.border());

        let Some(pattern) = Self::selected(app) else {
            frame.render_widget(detail_block, chunks[1]);
            return;
        };

        let tags: Vec<Span> = pattern
            .tags
            .iter()
            .flat_map(|t| [Span::styled(format!(" {} ", t), styles.badge()), Span::raw(" ")])
            .collect();

        let lines = vec![
            Line::from(Span::styled(
                format!("{} {}", pattern.icon, pattern.name),
                styles.title(),
            )),
            Line::from(Span::styled(
                format!("{} · {}", pattern.category, pattern.difficulty),
                styles.dimmed(),
            )),
            Line::from(""),
            Line::from(Span::styled(pattern.description, styles.base())),
            Line::from(""),
            Line::from(tags),
            Line::from(""),
            Line::from(vec![
                Span::styled("Enter", styles.keybind()),
                Span::styled(" to open, then ", styles.dimmed()),
                Span::styled("1-9", styles.keybind()),
                Span::styled(" to run a scenario", styles.dimmed()),
            ]),
        ];

        frame.render_widget(
            Paragraph::new(lines)
                .block(detail_block)
                .wrap(Wrap { trim: true }),
            chunks[1],
        );
    }
}
