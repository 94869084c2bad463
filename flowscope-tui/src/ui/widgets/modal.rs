use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::events::{CommandKind, CommandPalette, Keybinds};
use crate::theme::Theme;
use crate::ui::utils::{centered_rect, highlight_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalSize {
    Small,
    Medium,
    Large,
}

impl ModalSize {
    pub fn dimensions(&self) -> (u16, u16) {
        match self {
            ModalSize::Small => (40, 30),
            ModalSize::Medium => (60, 50),
            ModalSize::Large => (80, 70),
        }
    }
}

pub struct Modal {
    title: String,
    content: Vec<Line<'static>>,
    size: ModalSize,
    footer_hints: Vec<(String, String)>,
    scroll_offset: usize,
}

impl Modal {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: Vec::new(),
            size: ModalSize::Medium,
            footer_hints: Vec::new(),
            scroll_offset: 0,
        }
    }

    pub fn with_size(mut self, size: ModalSize) -> Self {
        self.size = size;
        self
    }

    pub fn add_line(mut self, line: Line<'static>) -> Self {
        self.content.push(line);
        self
    }

    pub fn add_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(Line::from(text.into()));
        self
    }

    pub fn add_keybind(
        mut self,
        key: impl Into<String>,
        desc: impl Into<String>,
        theme: &dyn Theme,
    ) -> Self {
        self.content.push(Line::from(vec![
            Span::styled(
                format!("  {:<18}", key.into()),
                Style::default()
                    .fg(theme.accent())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(desc.into(), Style::default().fg(theme.foreground())),
        ]));
        self
    }

    pub fn with_footer_hint(mut self, key: impl Into<String>, desc: impl Into<String>) -> Self {
        self.footer_hints.push((key.into(), desc.into()));
        self
    }

    /// Scrolls to `offset`, clamped so the last page stays full.
    pub fn with_scroll(mut self, offset: usize, visible: usize) -> Self {
        let max_offset = self.content.len().saturating_sub(visible);
        self.scroll_offset = offset.min(max_offset);
        self
    }

    pub fn line_count(&self) -> usize {
        self.content.len()
    }

    pub fn calculate_area(&self, screen: Rect) -> Rect {
        let (width_percent, height_percent) = self.size.dimensions();
        let width = (screen.width as u32 * width_percent as u32 / 100) as u16;
        let height = (screen.height as u32 * height_percent as u32 / 100) as u16;
        centered_rect(width.max(30), height.max(10), screen)
    }

    pub fn render(&self, frame: &mut Frame, screen: Rect, theme: &dyn Theme) {
        let area = self.calculate_area(screen);
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(format!(" {} ", self.title))
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(
                Style::default()
                    .fg(theme.accent())
                    .add_modifier(Modifier::BOLD),
            )
            .style(Style::default().bg(theme.surface()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let footer_height = if self.footer_hints.is_empty() { 0 } else { 2 };
        let content_height = inner.height.saturating_sub(footer_height);
        let content_area = Rect::new(inner.x, inner.y, inner.width, content_height);

        let end = (self.scroll_offset + content_height as usize).min(self.content.len());
        let start = self.scroll_offset.min(end);
        frame.render_widget(
            Paragraph::new(self.content[start..end].to_vec())
                .style(Style::default().bg(theme.surface()))
                .wrap(Wrap { trim: false }),
            content_area,
        );

        if self.content.len() > content_height as usize {
            let indicator = format!(
                " {}/{} ",
                self.scroll_offset + 1,
                self.content.len().saturating_sub(content_height as usize) + 1
            );
            frame.render_widget(
                Paragraph::new(Span::styled(
                    indicator,
                    Style::default().fg(theme.foreground_dim()),
                ))
                .alignment(Alignment::Right),
                Rect::new(
                    content_area.x,
                    content_area.y + content_area.height.saturating_sub(1),
                    content_area.width,
                    1,
                ),
            );
        }

        if footer_height > 0 {
            let footer_y = inner.y + content_height;
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "─".repeat(inner.width as usize),
                    Style::default().fg(theme.border()),
                )),
                Rect::new(inner.x, footer_y, inner.width, 1),
            );

            let hints: Vec<Span> = self
                .footer_hints
                .iter()
                .flat_map(|(key, desc)| {
                    [
                        Span::styled(
                            format!(" {} ", key),
                            Style::default()
                                .fg(theme.accent())
                                .add_modifier(Modifier::BOLD),
                        ),
                        Span::styled(
                            format!("{} ", desc),
                            Style::default().fg(theme.foreground_dim()),
                        ),
                    ]
                })
                .collect();
            frame.render_widget(
                Paragraph::new(Line::from(hints)).alignment(Alignment::Center),
                Rect::new(inner.x, footer_y + 1, inner.width, 1),
            );
        }
    }
}

pub struct HelpModal;

impl HelpModal {
    /// Lists the live bindings, so remapped keys show up here too.
    pub fn create(keybinds: &Keybinds, theme: &dyn Theme) -> Modal {
        let section = |title: &str| {
            Line::from(Span::styled(
                format!("  {}", title),
                Style::default()
                    .fg(theme.accent_secondary())
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            ))
        };

        let mut modal = Modal::new("Keyboard Shortcuts")
            .with_size(ModalSize::Large)
            .add_text("")
            .add_line(section("Keys"))
            .add_text("");
        for (keys, desc) in keybinds.all_bindings() {
            modal = modal.add_keybind(keys, desc, theme);
        }

        modal
            .add_text("")
            .add_line(section("Reading the diagram"))
            .add_text("")
            .add_keybind("●", "Message in flight, colored by kind", theme)
            .add_keybind("✗", "Failed request", theme)
            .add_keybind("box color", "Service health", theme)
            .with_footer_hint("Esc", "Close")
            .with_footer_hint("j/k", "Scroll")
    }
}

pub struct CommandPaletteOverlay;

impl CommandPaletteOverlay {
    pub fn render(frame: &mut Frame, screen: Rect, palette: &CommandPalette, theme: &dyn Theme) {
        let area = centered_rect(64, 18, screen);
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" Command Palette ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.accent()))
            .style(Style::default().bg(theme.surface()));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let input_area = Rect::new(inner.x, inner.y, inner.width, 1);
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(": ", Style::default().fg(theme.accent())),
                Span::styled(
                    palette.input().to_string(),
                    Style::default().fg(theme.foreground()),
                ),
            ])),
            input_area,
        );
        frame.set_cursor_position((
            input_area.x + 2 + palette.cursor_position() as u16,
            input_area.y,
        ));

        let list_area = Rect::new(
            inner.x,
            inner.y + 2,
            inner.width,
            inner.height.saturating_sub(2),
        );
        let commands = palette.filtered_commands();
        if commands.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    "No matching commands",
                    Style::default().fg(theme.foreground_dim()),
                )),
                list_area,
            );
            return;
        }

        let base = Style::default().fg(theme.foreground());
        let items: Vec<ListItem> = commands
            .iter()
            .map(|cmd| {
                let tag = match cmd.kind {
                    CommandKind::Pattern => "pattern",
                    CommandKind::Command => "command",
                };
                let mut spans = highlight_text(&cmd.name, palette.input(), base, theme);
                spans.push(Span::styled(
                    format!("  {}", cmd.description),
                    Style::default().fg(theme.foreground_dim()),
                ));
                spans.push(Span::styled(
                    format!("  [{}]", tag),
                    Style::default().fg(theme.accent_secondary()),
                ));
                ListItem::new(Line::from(spans))
            })
            .collect();

        let mut state = ListState::default().with_selected(Some(palette.selected_index()));
        frame.render_stateful_widget(
            List::new(items).highlight_style(
                Style::default()
                    .bg(theme.selection())
                    .add_modifier(Modifier::BOLD),
            ),
            list_area,
            &mut state,
        );
    }
}
