use ratatui::{
    layout::{Constraint, Direction, Layout, Margin},
    style::Style,
    widgets::Block,
    Frame,
};

use crate::app::{App, View};
use crate::ui::views::{CatalogView, PatternView};
use crate::ui::widgets::{CommandPaletteOverlay, Footer, Header, HelpModal};

pub struct MainLayout;

impl MainLayout {
    pub fn render(frame: &mut Frame, app: &App) {
        let theme = app.current_theme();
        let size = frame.area();

        frame.render_widget(
            Block::default().style(
                Style::default()
                    .bg(theme.background())
                    .fg(theme.foreground()),
            ),
            size,
        );

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(1),
            ])
            .split(size);

        Header::render(frame, chunks[0].inner(Margin::new(1, 1)), app);

        let content_area = chunks[1].inner(Margin::new(1, 0));
        match app.current_view {
            View::Catalog => CatalogView::render(frame, content_area, app),
            View::Pattern => PatternView::render(frame, content_area, app),
        }

        Footer::render(frame, chunks[2], app);

        app.toast_manager.render(frame, size, theme);

        if app.show_help_modal {
            let visible = size.height.saturating_sub(8) as usize;
            HelpModal::create(&app.keybinds, theme)
                .with_scroll(app.help_modal_scroll, visible)
                .render(frame, size, theme);
        }

        if app.command_palette.is_open() {
            CommandPaletteOverlay::render(frame, size, &app.command_palette, theme);
        }
    }
}
